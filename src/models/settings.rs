use serde::{Deserialize, Serialize};

use crate::models::task::TaskPriority;

pub const DEFAULT_WORKDAY_START_MINUTE: u32 = 9 * 60;
pub const DEFAULT_WORKDAY_END_MINUTE: u32 = 17 * 60;
pub const DEFAULT_MIN_GAP_MINUTES: i64 = 15;
pub const DEFAULT_DAILY_CAP_HOURS: f64 = 8.0;
pub const DEFAULT_LOOKAHEAD_DAYS: u32 = 14;
pub const MAX_LOOKAHEAD_DAYS: u32 = 366;
pub const DEFAULT_SLOT_GRANULARITY_MINUTES: i64 = 30;
pub const DEFAULT_TASK_MINUTES: i64 = 60;
pub const DEFAULT_MIN_TASK_MINUTES: i64 = 15;

/// Cognitive load multiplier applied to raw block hours before the daily cap
/// comparison.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LoadFactors {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl Default for LoadFactors {
    fn default() -> Self {
        Self {
            high: 1.5,
            medium: 1.2,
            low: 1.0,
        }
    }
}

impl LoadFactors {
    pub fn for_priority(&self, priority: Option<TaskPriority>) -> f64 {
        match priority {
            Some(TaskPriority::High) => self.high,
            Some(TaskPriority::Medium) => self.medium,
            Some(TaskPriority::Low) => self.low,
            None => 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulerSettings {
    pub workday_start_minute: u32,
    pub workday_end_minute: u32,
    pub min_gap_minutes: i64,
    pub daily_cap_hours: f64,
    pub load_factors: LoadFactors,
    pub lookahead_days: u32,
    pub slot_granularity_minutes: i64,
    pub default_task_minutes: i64,
    pub min_task_minutes: i64,
    /// IANA zone name; the system zone is used when absent.
    pub timezone: Option<String>,
    pub default_break_hours: Vec<u32>,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            workday_start_minute: DEFAULT_WORKDAY_START_MINUTE,
            workday_end_minute: DEFAULT_WORKDAY_END_MINUTE,
            min_gap_minutes: DEFAULT_MIN_GAP_MINUTES,
            daily_cap_hours: DEFAULT_DAILY_CAP_HOURS,
            load_factors: LoadFactors::default(),
            lookahead_days: DEFAULT_LOOKAHEAD_DAYS,
            slot_granularity_minutes: DEFAULT_SLOT_GRANULARITY_MINUTES,
            default_task_minutes: DEFAULT_TASK_MINUTES,
            min_task_minutes: DEFAULT_MIN_TASK_MINUTES,
            timezone: None,
            default_break_hours: vec![12],
        }
    }
}
