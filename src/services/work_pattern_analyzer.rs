use std::collections::HashMap;

use chrono::{DateTime, Days, Duration, FixedOffset, NaiveDateTime, NaiveTime, Timelike};
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::models::patterns::{UserWorkPatterns, NEUTRAL_SCORE};
use crate::models::schedule::{ScheduledBlock, TimeSlot};
use crate::models::settings::SchedulerSettings;
use crate::models::task::{TaskIndex, TaskRecord};
use crate::services::conflict_detector::weighted_hours_by_day;
use crate::services::schedule_utils::{self, WorkZone};

/// Weight of the neutral prior blended into every hour's productivity score.
const PRIOR_WEIGHT: f64 = 2.0;
const BREAK_MIN_SAMPLES: usize = 3;
const BREAK_COMPLETION_THRESHOLD: f64 = 0.3;
const BREAK_HOUR_PENALTY: f64 = 0.25;
const SCORE_EPSILON: f64 = 1e-9;

/// Groups tasks whose historical durations are averaged together.
pub trait TaskSimilarity: Send + Sync {
    fn key(&self, task: &TaskRecord) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CategorySimilarity;

impl TaskSimilarity for CategorySimilarity {
    fn key(&self, task: &TaskRecord) -> String {
        task.category.as_str().to_string()
    }
}

/// Inputs to a slot search that come from the engine rather than the task.
pub struct SlotContext<'a> {
    pub tasks: &'a TaskIndex,
    pub not_before: DateTime<FixedOffset>,
}

pub struct WorkPatternAnalyzer {
    settings: SchedulerSettings,
    zone: WorkZone,
    similarity: Box<dyn TaskSimilarity>,
}

impl WorkPatternAnalyzer {
    pub fn new(settings: SchedulerSettings, zone: WorkZone) -> Self {
        Self {
            settings,
            zone,
            similarity: Box::new(CategorySimilarity),
        }
    }

    pub fn with_similarity(mut self, similarity: Box<dyn TaskSimilarity>) -> Self {
        self.similarity = similarity;
        self
    }

    pub fn similarity_key(&self, task: &TaskRecord) -> String {
        self.similarity.key(task)
    }

    /// Derives the productivity profile. Never fails: any problem in the
    /// history yields the neutral profile.
    pub fn analyze_work_patterns(
        &self,
        completed_tasks: &[TaskRecord],
        blocks: &[ScheduledBlock],
    ) -> UserWorkPatterns {
        match self.try_analyze(completed_tasks, blocks) {
            Ok(patterns) => patterns,
            Err(err) => {
                warn!(
                    target: "app::schedule::patterns",
                    error = %err,
                    "work pattern analysis failed, using neutral profile"
                );
                UserWorkPatterns::neutral(self.settings.default_task_minutes)
            }
        }
    }

    fn try_analyze(
        &self,
        completed_tasks: &[TaskRecord],
        blocks: &[ScheduledBlock],
    ) -> AppResult<UserWorkPatterns> {
        let completed: HashMap<&str, &TaskRecord> = completed_tasks
            .iter()
            .filter(|task| task.completed)
            .map(|task| (task.id.as_str(), task))
            .collect();

        let mut samples: Vec<Vec<f64>> = vec![Vec::new(); 24];
        let mut block_counts = [0usize; 24];
        let mut completed_counts = [0usize; 24];
        let mut durations: HashMap<String, Vec<f64>> = HashMap::new();

        for block in blocks {
            if block.end_date <= block.start_date {
                continue;
            }
            let hour = self.zone.local_hour(block.start_date) as usize;
            block_counts[hour] += 1;

            let task = completed.get(block.task_id.as_str());
            if task.is_some() {
                completed_counts[hour] += 1;
            }

            if task.is_some() || block.productivity_score.is_some() {
                let sample = match block.productivity_score {
                    Some(score) if !score.is_finite() => {
                        return Err(AppError::validation(format!(
                            "non-finite productivity score on block for task {}",
                            block.task_id
                        )));
                    }
                    Some(score) => score.clamp(0.0, 1.0),
                    None => 1.0,
                };
                samples[hour].push(sample);
            }

            if let Some(task) = task {
                let minutes = block
                    .actual_duration
                    .filter(|minutes| *minutes > 0)
                    .unwrap_or_else(|| block.duration_minutes());
                durations
                    .entry(self.similarity.key(task))
                    .or_default()
                    .push(minutes as f64);
            }
        }

        for task in completed.values() {
            let finished_at = task
                .last_update
                .as_deref()
                .and_then(|raw| schedule_utils::parse_datetime(raw).ok());
            if let Some(finished_at) = finished_at {
                samples[self.zone.local_hour(finished_at) as usize].push(1.0);
            }
        }

        let mut patterns = UserWorkPatterns::neutral(self.settings.default_task_minutes);

        for hour in 0..24u32 {
            let idx = hour as usize;
            let hour_samples = &samples[idx];
            let sum: f64 = hour_samples.iter().sum();
            let score =
                (sum + NEUTRAL_SCORE * PRIOR_WEIGHT) / (hour_samples.len() as f64 + PRIOR_WEIGHT);
            patterns.preferred_times.insert(hour, ensure_finite(score)?);

            let rate = if block_counts[idx] == 0 {
                NEUTRAL_SCORE
            } else {
                completed_counts[idx] as f64 / block_counts[idx] as f64
            };
            patterns.completion_rates.insert(hour, ensure_finite(rate)?);

            let avoided = block_counts[idx] >= BREAK_MIN_SAMPLES && rate < BREAK_COMPLETION_THRESHOLD;
            let default_break = self.settings.default_break_hours.contains(&hour)
                && score <= NEUTRAL_SCORE + SCORE_EPSILON;
            patterns.break_patterns.insert(hour, avoided || default_break);
        }

        for (key, values) in durations {
            let average = values.iter().sum::<f64>() / values.len() as f64;
            patterns.task_durations.insert(key, ensure_finite(average)?);
        }

        debug!(
            target: "app::schedule::patterns",
            completed = completed.len(),
            blocks = blocks.len(),
            "work patterns recomputed"
        );

        Ok(patterns)
    }

    /// Planned minutes for `task`: its own estimate, else the historical average
    /// for similar tasks, else the default, scaled by open subtasks.
    pub fn estimate_minutes(&self, task: &TaskRecord, patterns: &UserWorkPatterns) -> i64 {
        let base = task
            .estimated_minutes
            .filter(|minutes| *minutes > 0)
            .map(|minutes| minutes as f64)
            .or_else(|| patterns.average_duration(&self.similarity.key(task)))
            .filter(|minutes| minutes.is_finite() && *minutes > 0.0)
            .unwrap_or(self.settings.default_task_minutes as f64);

        let scaled = (base * task.remaining_fraction()).round() as i64;
        scaled.max(self.settings.min_task_minutes)
    }

    /// Finds a slot inside working hours that keeps the minimum gap to every
    /// existing block and the day under its weighted cap. Days are scanned in
    /// order up to the look-ahead horizon; on the first day with room the
    /// best-scoring candidate wins, ties going to the earliest.
    pub fn suggest_time_slot(
        &self,
        task: &TaskRecord,
        patterns: &UserWorkPatterns,
        existing_blocks: &[ScheduledBlock],
        context: &SlotContext<'_>,
    ) -> Option<TimeSlot> {
        let settings = &self.settings;
        let duration_minutes = self.estimate_minutes(task, patterns);
        let window_minutes =
            i64::from(settings.workday_end_minute) - i64::from(settings.workday_start_minute);
        if duration_minutes > window_minutes {
            debug!(
                target: "app::schedule::patterns",
                task_id = %task.id,
                duration_minutes,
                window_minutes,
                "task does not fit into the working window"
            );
            return None;
        }
        let duration = Duration::try_minutes(duration_minutes)?;
        let step = Duration::try_minutes(settings.slot_granularity_minutes.max(1))?;

        let candidate_load = duration_minutes as f64 / 60.0
            * settings.load_factors.for_priority(Some(task.priority));
        if candidate_load > settings.daily_cap_hours {
            debug!(
                target: "app::schedule::patterns",
                task_id = %task.id,
                candidate_load,
                "task exceeds the daily cap on its own"
            );
            return None;
        }

        let day_loads = weighted_hours_by_day(
            existing_blocks,
            context.tasks,
            &settings.load_factors,
            &self.zone,
        );
        let anchor = self.zone.local(context.not_before);
        let start_offset = Duration::minutes(i64::from(settings.workday_start_minute));
        let end_offset = Duration::minutes(i64::from(settings.workday_end_minute));

        for offset in 0..settings.lookahead_days {
            let Some(day) = anchor.date().checked_add_days(Days::new(u64::from(offset))) else {
                break;
            };
            let existing_load = day_loads.get(&day).copied().unwrap_or(0.0);
            if existing_load + candidate_load > settings.daily_cap_hours {
                continue;
            }

            let midnight = day.and_time(NaiveTime::MIN);
            let (Some(window_start), Some(window_end)) = (
                midnight.checked_add_signed(start_offset),
                midnight.checked_add_signed(end_offset),
            ) else {
                break;
            };

            let mut cursor = schedule_utils::align_up(
                window_start.max(anchor),
                settings.slot_granularity_minutes,
            );
            let mut best: Option<(f64, TimeSlot)> = None;

            while let Some(cursor_end) = cursor
                .checked_add_signed(duration)
                .filter(|end| *end <= window_end)
            {
                if let Some(slot) = self.resolve_slot(cursor, cursor_end) {
                    let clear = existing_blocks.iter().all(|block| {
                        !schedule_utils::within_gap(
                            slot.start_date,
                            slot.end_date,
                            block.start_date,
                            block.end_date,
                            settings.min_gap_minutes,
                        )
                    });
                    if clear {
                        let score = score_slot(patterns, cursor, cursor_end);
                        let better = best
                            .as_ref()
                            .map_or(true, |(best_score, _)| score > *best_score + SCORE_EPSILON);
                        if better {
                            best = Some((score, slot));
                        }
                    }
                }
                match cursor.checked_add_signed(step) {
                    Some(next) => cursor = next,
                    None => break,
                }
            }

            if let Some((score, slot)) = best {
                debug!(
                    target: "app::schedule::patterns",
                    task_id = %task.id,
                    start = %slot.start_date,
                    end = %slot.end_date,
                    score,
                    "time slot suggested"
                );
                return Some(slot);
            }
        }

        debug!(
            target: "app::schedule::patterns",
            task_id = %task.id,
            lookahead_days = settings.lookahead_days,
            "no time slot within the look-ahead horizon"
        );
        None
    }

    fn resolve_slot(&self, start: NaiveDateTime, end: NaiveDateTime) -> Option<TimeSlot> {
        let start_date = self.zone.at_local(start)?;
        let end_date = self.zone.at_local(end)?;
        if end_date <= start_date {
            return None;
        }
        Some(TimeSlot {
            start_date,
            end_date,
        })
    }
}

/// Mean productivity over the local hours the slot touches, less a penalty per
/// preferred break hour.
fn score_slot(patterns: &UserWorkPatterns, start: NaiveDateTime, end: NaiveDateTime) -> f64 {
    let mut hours = Vec::new();
    let mut cursor = start.date().and_hms_opt(start.hour(), 0, 0).unwrap_or(start);
    while cursor < end {
        hours.push(cursor.hour());
        cursor += Duration::hours(1);
    }
    if hours.is_empty() {
        return NEUTRAL_SCORE;
    }

    let mean = hours
        .iter()
        .map(|hour| patterns.preferred_score(*hour))
        .sum::<f64>()
        / hours.len() as f64;
    let breaks = hours
        .iter()
        .filter(|hour| patterns.is_break_hour(**hour))
        .count();
    mean - BREAK_HOUR_PENALTY * breaks as f64
}

fn ensure_finite(value: f64) -> AppResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(AppError::validation("work pattern value is not finite"))
    }
}

/// Hours ranked by preferred score, best first; ties go to the earlier hour.
pub fn top_hours(patterns: &UserWorkPatterns, count: usize) -> Vec<u32> {
    let mut ranked: Vec<(u32, f64)> = patterns
        .preferred_times
        .iter()
        .map(|(hour, score)| (*hour, *score))
        .collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    ranked.into_iter().take(count).map(|(hour, _)| hour).collect()
}
