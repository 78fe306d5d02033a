use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::patterns::UserWorkPatterns;

/// A time interval assigned to one task. `start_date < end_date` holds for
/// every block the engine keeps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledBlock {
    pub task_id: String,
    pub start_date: DateTime<FixedOffset>,
    pub end_date: DateTime<FixedOffset>,
    #[serde(default)]
    pub estimated_duration: Option<i64>,
    #[serde(default)]
    pub actual_duration: Option<i64>,
    #[serde(default)]
    pub productivity_score: Option<f64>,
}

impl ScheduledBlock {
    pub fn new(
        task_id: impl Into<String>,
        start_date: DateTime<FixedOffset>,
        end_date: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            start_date,
            end_date,
            estimated_duration: None,
            actual_duration: None,
            productivity_score: None,
        }
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end_date - self.start_date).num_minutes()
    }

    pub fn duration_hours(&self) -> f64 {
        (self.end_date - self.start_date).num_seconds() as f64 / 3600.0
    }

    pub fn overlaps(&self, other: &ScheduledBlock) -> bool {
        self.start_date < other.end_date && other.start_date < self.end_date
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ConflictKind {
    Overlap,
    DayOverload,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleConflict {
    pub kind: ConflictKind,
    pub task_ids: Vec<String>,
    pub reason: String,
    pub suggestion: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub weighted_hours: Option<f64>,
}

impl ScheduleConflict {
    pub fn involves(&self, task_id: &str) -> bool {
        self.task_ids.iter().any(|id| id == task_id)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub start_date: DateTime<FixedOffset>,
    pub end_date: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TaskScheduleState {
    Unscheduled,
    Scheduled,
    ScheduledWithConflict,
    Completed,
}

/// Non-fatal problem found while ingesting tasks or blocks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDiagnostic {
    #[serde(default)]
    pub task_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSnapshot {
    pub scheduled_blocks: Vec<ScheduledBlock>,
    pub conflicts: Vec<ScheduleConflict>,
    pub work_patterns: UserWorkPatterns,
    pub diagnostics: Vec<ScheduleDiagnostic>,
}
