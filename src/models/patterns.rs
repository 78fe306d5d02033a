use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::task::TaskCategory;

pub const NEUTRAL_SCORE: f64 = 0.5;

/// Derived productivity profile. Hour keys are local hours `0..24`; every hour
/// is always present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserWorkPatterns {
    pub preferred_times: BTreeMap<u32, f64>,
    pub task_durations: BTreeMap<String, f64>,
    pub completion_rates: BTreeMap<u32, f64>,
    pub break_patterns: BTreeMap<u32, bool>,
}

impl UserWorkPatterns {
    /// Uniform scores, no break hours, and `default_minutes` for every category.
    pub fn neutral(default_minutes: i64) -> Self {
        Self {
            preferred_times: (0..24).map(|hour| (hour, NEUTRAL_SCORE)).collect(),
            task_durations: TaskCategory::ALL
                .iter()
                .map(|category| (category.as_str().to_string(), default_minutes as f64))
                .collect(),
            completion_rates: (0..24).map(|hour| (hour, NEUTRAL_SCORE)).collect(),
            break_patterns: (0..24).map(|hour| (hour, false)).collect(),
        }
    }

    pub fn preferred_score(&self, hour: u32) -> f64 {
        self.preferred_times
            .get(&hour)
            .copied()
            .unwrap_or(NEUTRAL_SCORE)
    }

    pub fn is_break_hour(&self, hour: u32) -> bool {
        self.break_patterns.get(&hour).copied().unwrap_or(false)
    }

    pub fn average_duration(&self, key: &str) -> Option<f64> {
        self.task_durations.get(key).copied()
    }
}
