use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;

use crate::models::schedule::{ConflictKind, ScheduleConflict, ScheduledBlock};
use crate::models::settings::LoadFactors;
use crate::models::task::TaskIndex;
use crate::services::schedule_utils::WorkZone;

const OVERLAP_REASON: &str = "Time block overlap detected";
const OVERLAP_SUGGESTION: &str =
    "Consider rescheduling one of these tasks to a different time slot";
const OVERLOAD_SUGGESTION: &str = "Consider spreading these tasks across multiple days";

/// The rules shared by conflict reporting and the engine's pre-commit check.
#[derive(Debug, Clone, Copy)]
pub struct WorkloadLimits {
    pub daily_cap_hours: f64,
    pub load_factors: LoadFactors,
}

/// Reports pairwise overlaps (in list order) followed by one overload per
/// local calendar day whose priority-weighted hours exceed the cap.
///
/// Overlap detection is quadratic in the number of blocks, which is fine for a
/// single user's schedule.
pub fn detect_conflicts(
    blocks: &[ScheduledBlock],
    tasks: &TaskIndex,
    limits: &WorkloadLimits,
    zone: &WorkZone,
) -> Vec<ScheduleConflict> {
    let mut conflicts = Vec::new();

    for (i, first) in blocks.iter().enumerate() {
        for second in &blocks[i + 1..] {
            if first.overlaps(second) {
                conflicts.push(ScheduleConflict {
                    kind: ConflictKind::Overlap,
                    task_ids: vec![first.task_id.clone(), second.task_id.clone()],
                    reason: OVERLAP_REASON.to_string(),
                    suggestion: OVERLAP_SUGGESTION.to_string(),
                    date: None,
                    weighted_hours: None,
                });
            }
        }
    }

    for (day, hours) in weighted_hours_by_day(blocks, tasks, &limits.load_factors, zone) {
        if hours > limits.daily_cap_hours {
            let task_ids = blocks
                .iter()
                .filter(|block| zone.local_date(block.start_date) == day)
                .map(|block| block.task_id.clone())
                .collect();
            conflicts.push(ScheduleConflict {
                kind: ConflictKind::DayOverload,
                task_ids,
                reason: format!(
                    "Workload of {hours:.1} weighted hours exceeds {:.1} hours on {day}",
                    limits.daily_cap_hours
                ),
                suggestion: OVERLOAD_SUGGESTION.to_string(),
                date: Some(day),
                weighted_hours: Some(hours),
            });
        }
    }

    debug!(
        target: "app::schedule::conflicts",
        blocks = blocks.len(),
        conflicts = conflicts.len(),
        "conflict detection finished"
    );

    conflicts
}

/// Priority-weighted hours per local day of each block's start.
pub fn weighted_hours_by_day(
    blocks: &[ScheduledBlock],
    tasks: &TaskIndex,
    load_factors: &LoadFactors,
    zone: &WorkZone,
) -> BTreeMap<NaiveDate, f64> {
    let mut totals = BTreeMap::new();
    for block in blocks {
        let factor = load_factors.for_priority(tasks.priority_of(&block.task_id));
        *totals.entry(zone.local_date(block.start_date)).or_insert(0.0) +=
            block.duration_hours() * factor;
    }
    totals
}
