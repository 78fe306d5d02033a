use std::collections::HashSet;

use chrono::{DateTime, FixedOffset, Utc};
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::models::patterns::UserWorkPatterns;
use crate::models::schedule::{
    ScheduleConflict, ScheduleDiagnostic, ScheduleSnapshot, ScheduledBlock, TaskScheduleState,
    TimeSlot,
};
use crate::models::settings::SchedulerSettings;
use crate::models::task::{TaskIndex, TaskRecord};
use crate::services::conflict_detector::{self, WorkloadLimits};
use crate::services::schedule_utils::{self, WorkZone};
use crate::services::settings_service;
use crate::services::work_pattern_analyzer::{
    self, SlotContext, TaskSimilarity, WorkPatternAnalyzer,
};

/// Longest estimate or recorded session accepted: one full day.
const MAX_ESTIMATE_MINUTES: i64 = 24 * 60;

/// Owns the block list for the current task set. Every mutation recomputes
/// work patterns and conflicts before returning, so readers never see values
/// derived from a stale block list.
pub struct SchedulingEngine {
    zone: WorkZone,
    limits: WorkloadLimits,
    analyzer: WorkPatternAnalyzer,
    planning_start: Option<DateTime<FixedOffset>>,
    tasks: Vec<TaskRecord>,
    index: TaskIndex,
    blocks: Vec<ScheduledBlock>,
    conflicts: Vec<ScheduleConflict>,
    work_patterns: UserWorkPatterns,
    task_diagnostics: Vec<ScheduleDiagnostic>,
    block_diagnostics: Vec<ScheduleDiagnostic>,
}

impl SchedulingEngine {
    pub fn new(settings: SchedulerSettings) -> AppResult<Self> {
        settings_service::validate_settings(&settings)?;
        let zone = WorkZone::from_setting(settings.timezone.as_deref())?;
        let limits = WorkloadLimits {
            daily_cap_hours: settings.daily_cap_hours,
            load_factors: settings.load_factors,
        };
        let work_patterns = UserWorkPatterns::neutral(settings.default_task_minutes);
        let analyzer = WorkPatternAnalyzer::new(settings, zone);

        let mut engine = Self {
            zone,
            limits,
            analyzer,
            planning_start: None,
            tasks: Vec::new(),
            index: TaskIndex::new(),
            blocks: Vec::new(),
            conflicts: Vec::new(),
            work_patterns,
            task_diagnostics: Vec::new(),
            block_diagnostics: Vec::new(),
        };
        engine.recompute();
        Ok(engine)
    }

    pub fn with_similarity(mut self, similarity: Box<dyn TaskSimilarity>) -> Self {
        self.analyzer = self.analyzer.with_similarity(similarity);
        self.recompute();
        self
    }

    /// Earliest instant slot searches may use; defaults to now.
    pub fn with_planning_start(mut self, start: DateTime<FixedOffset>) -> Self {
        self.planning_start = Some(start);
        self
    }

    pub fn set_planning_start(&mut self, start: Option<DateTime<FixedOffset>>) {
        self.planning_start = start;
    }

    /// Replaces the task set. Ids are trimmed; invalid records are skipped and
    /// reported through `diagnostics`.
    pub fn sync_tasks(&mut self, tasks: Vec<TaskRecord>) {
        let (valid, diagnostics) = validate_tasks(tasks);
        self.index = valid.iter().cloned().collect();
        self.tasks = valid;
        self.task_diagnostics = diagnostics;
        self.recompute();
    }

    /// Seeds the block list from the caller's persistence. Blocks with an
    /// empty task id, a non-positive interval or a task that already has a
    /// block are skipped.
    pub fn restore_blocks(&mut self, blocks: Vec<ScheduledBlock>) {
        let mut accepted: Vec<ScheduledBlock> = Vec::with_capacity(blocks.len());
        let mut diagnostics = Vec::new();
        let mut seen = HashSet::new();

        for block in blocks {
            let task_id = block.task_id.trim().to_string();
            if task_id.is_empty() {
                diagnostics.push(diagnostic(None, "scheduled block has no task id"));
                continue;
            }
            if let Err(err) = schedule_utils::ensure_window(block.start_date, block.end_date) {
                diagnostics.push(diagnostic(Some(&task_id), err.to_string()));
                continue;
            }
            if !seen.insert(task_id.clone()) {
                diagnostics.push(diagnostic(
                    Some(&task_id),
                    "task already has a scheduled block",
                ));
                continue;
            }
            accepted.push(ScheduledBlock { task_id, ..block });
        }

        for entry in &diagnostics {
            warn!(
                target: "app::schedule::engine",
                task_id = entry.task_id.as_deref().unwrap_or("-"),
                message = %entry.message,
                "skipping scheduled block"
            );
        }

        self.blocks = accepted;
        self.block_diagnostics = diagnostics;
        self.recompute();
    }

    /// Conflicts `blocks` would have under the current task set. Usable for
    /// what-if checks without touching the engine's own list.
    pub fn detect_conflicts(&self, blocks: &[ScheduledBlock]) -> Vec<ScheduleConflict> {
        conflict_detector::detect_conflicts(blocks, &self.index, &self.limits, &self.zone)
    }

    /// Previews the slot `auto_schedule_task` would ask for.
    pub fn suggest_time_slot(&self, task: &TaskRecord) -> Option<TimeSlot> {
        let current = self.index.get(task.id.trim())?;
        let context = SlotContext {
            tasks: &self.index,
            not_before: self.planning_anchor(),
        };
        self.analyzer
            .suggest_time_slot(current, &self.work_patterns, &self.blocks, &context)
    }

    /// Asks the analyzer for a slot, then re-checks the whole list with the same
    /// conflict rules used for reporting. Commits only when no conflict names
    /// the task; otherwise nothing changes.
    pub fn auto_schedule_task(&mut self, task: &TaskRecord) -> Option<ScheduledBlock> {
        let Some(current) = self.index.get(task.id.trim()).cloned() else {
            debug!(
                target: "app::schedule::engine",
                task_id = %task.id,
                "task is not part of the current set"
            );
            return None;
        };

        if current.completed {
            debug!(target: "app::schedule::engine", task_id = %current.id, "task already completed");
            return None;
        }

        if self.block_for(&current.id).is_some() {
            debug!(target: "app::schedule::engine", task_id = %current.id, "task already scheduled");
            return None;
        }

        let Some(slot) = self.suggest_time_slot(&current) else {
            info!(
                target: "app::schedule::engine",
                task_id = %current.id,
                "no capacity found, scheduling deferred"
            );
            return None;
        };

        let block = ScheduledBlock {
            task_id: current.id.clone(),
            start_date: slot.start_date,
            end_date: slot.end_date,
            estimated_duration: Some(
                self.analyzer
                    .estimate_minutes(&current, &self.work_patterns),
            ),
            actual_duration: None,
            productivity_score: None,
        };

        let mut candidate = self.blocks.clone();
        candidate.push(block.clone());
        let introduced = self
            .detect_conflicts(&candidate)
            .into_iter()
            .filter(|conflict| conflict.involves(&block.task_id))
            .count();
        if introduced > 0 {
            warn!(
                target: "app::schedule::engine",
                task_id = %block.task_id,
                introduced,
                "suggested slot rejected by conflict check"
            );
            return None;
        }

        self.blocks = candidate;
        self.recompute();
        info!(
            target: "app::schedule::engine",
            task_id = %block.task_id,
            start = %block.start_date,
            end = %block.end_date,
            "task scheduled"
        );
        Some(block)
    }

    /// Removes the task's block, if any.
    pub fn unschedule(&mut self, task_id: &str) -> Option<ScheduledBlock> {
        let task_id = task_id.trim();
        let position = self
            .blocks
            .iter()
            .position(|block| block.task_id == task_id)?;
        let removed = self.blocks.remove(position);
        self.recompute();
        info!(target: "app::schedule::engine", task_id, "task unscheduled");
        Some(removed)
    }

    /// Records how a scheduled session actually went.
    pub fn record_block_outcome(
        &mut self,
        task_id: &str,
        actual_minutes: Option<i64>,
        productivity_score: Option<f64>,
    ) -> AppResult<ScheduledBlock> {
        let task_id = task_id.trim();
        if let Some(minutes) = actual_minutes {
            if !(1..=MAX_ESTIMATE_MINUTES).contains(&minutes) {
                return Err(AppError::validation(format!(
                    "actual duration must be between 1 and {MAX_ESTIMATE_MINUTES} minutes"
                )));
            }
        }
        if let Some(score) = productivity_score {
            if !score.is_finite() || !(0.0..=1.0).contains(&score) {
                return Err(AppError::validation(
                    "productivity score must be between 0 and 1",
                ));
            }
        }

        let block = self
            .blocks
            .iter_mut()
            .find(|block| block.task_id == task_id)
            .ok_or_else(AppError::not_found)?;
        if actual_minutes.is_some() {
            block.actual_duration = actual_minutes;
        }
        if productivity_score.is_some() {
            block.productivity_score = productivity_score;
        }
        let updated = block.clone();

        self.recompute();
        Ok(updated)
    }

    pub fn task_state(&self, task_id: &str) -> TaskScheduleState {
        let task_id = task_id.trim();
        if self.index.is_completed(task_id) {
            return TaskScheduleState::Completed;
        }
        if self.block_for(task_id).is_none() {
            return TaskScheduleState::Unscheduled;
        }
        if self
            .conflicts
            .iter()
            .any(|conflict| conflict.involves(task_id))
        {
            TaskScheduleState::ScheduledWithConflict
        } else {
            TaskScheduleState::Scheduled
        }
    }

    pub fn block_for(&self, task_id: &str) -> Option<&ScheduledBlock> {
        let task_id = task_id.trim();
        self.blocks.iter().find(|block| block.task_id == task_id)
    }

    pub fn tasks(&self) -> &[TaskRecord] {
        &self.tasks
    }

    pub fn scheduled_blocks(&self) -> &[ScheduledBlock] {
        &self.blocks
    }

    pub fn conflicts(&self) -> &[ScheduleConflict] {
        &self.conflicts
    }

    pub fn work_patterns(&self) -> &UserWorkPatterns {
        &self.work_patterns
    }

    pub fn diagnostics(&self) -> Vec<ScheduleDiagnostic> {
        self.task_diagnostics
            .iter()
            .chain(self.block_diagnostics.iter())
            .cloned()
            .collect()
    }

    pub fn snapshot(&self) -> ScheduleSnapshot {
        ScheduleSnapshot {
            scheduled_blocks: self.blocks.clone(),
            conflicts: self.conflicts.clone(),
            work_patterns: self.work_patterns.clone(),
            diagnostics: self.diagnostics(),
        }
    }

    fn planning_anchor(&self) -> DateTime<FixedOffset> {
        self.planning_start
            .unwrap_or_else(|| Utc::now().fixed_offset())
    }

    fn recompute(&mut self) {
        let completed: Vec<TaskRecord> = self
            .tasks
            .iter()
            .filter(|task| task.completed)
            .cloned()
            .collect();
        self.work_patterns = self
            .analyzer
            .analyze_work_patterns(&completed, &self.blocks);
        self.conflicts = self.detect_conflicts(&self.blocks);

        debug!(
            target: "app::schedule::engine",
            tasks = self.tasks.len(),
            blocks = self.blocks.len(),
            conflicts = self.conflicts.len(),
            peak_hours = ?work_pattern_analyzer::top_hours(&self.work_patterns, 3),
            "schedule recomputed"
        );
    }
}

/// Splits the set into records usable for scheduling and diagnostics for the
/// rest. The first record with a given id wins.
pub fn validate_tasks(tasks: Vec<TaskRecord>) -> (Vec<TaskRecord>, Vec<ScheduleDiagnostic>) {
    let mut valid = Vec::with_capacity(tasks.len());
    let mut diagnostics = Vec::new();
    let mut seen = HashSet::new();

    for mut task in tasks {
        let task_id = task.id.trim().to_string();
        if task_id.is_empty() {
            diagnostics.push(diagnostic(None, format!("task \"{}\" has no id", task.title)));
            continue;
        }
        if seen.contains(&task_id) {
            diagnostics.push(diagnostic(Some(&task_id), "duplicate task id"));
            continue;
        }
        if let Err(err) = validate_task_dates(&task).and_then(|_| validate_estimate(&task)) {
            diagnostics.push(diagnostic(Some(&task_id), err.to_string()));
            continue;
        }
        seen.insert(task_id.clone());
        task.id = task_id;
        valid.push(task);
    }

    for entry in &diagnostics {
        warn!(
            target: "app::schedule::engine",
            task_id = entry.task_id.as_deref().unwrap_or("-"),
            message = %entry.message,
            "skipping task"
        );
    }

    (valid, diagnostics)
}

fn validate_task_dates(task: &TaskRecord) -> AppResult<()> {
    let created_at = schedule_utils::parse_datetime(&task.created_at)?;
    let due_date = schedule_utils::parse_optional_datetime(task.due_date.as_ref())?;
    let last_update = schedule_utils::parse_optional_datetime(task.last_update.as_ref())?;

    if due_date.is_some_and(|due| due < created_at) {
        return Err(AppError::validation("due date is before creation"));
    }
    if last_update.is_some_and(|updated| updated < created_at) {
        return Err(AppError::validation("last update is before creation"));
    }
    Ok(())
}

fn validate_estimate(task: &TaskRecord) -> AppResult<()> {
    match task.estimated_minutes {
        Some(minutes) if !(0..=MAX_ESTIMATE_MINUTES).contains(&minutes) => {
            Err(AppError::validation(format!(
                "estimated duration of {minutes} minutes is outside 0..={MAX_ESTIMATE_MINUTES}"
            )))
        }
        _ => Ok(()),
    }
}

fn diagnostic(task_id: Option<&str>, message: impl Into<String>) -> ScheduleDiagnostic {
    ScheduleDiagnostic {
        task_id: task_id.map(str::to_string),
        message: message.into(),
    }
}
