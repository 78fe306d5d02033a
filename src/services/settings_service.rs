use std::path::Path;

use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::settings::{LoadFactors, SchedulerSettings, MAX_LOOKAHEAD_DAYS};
use crate::services::schedule_utils::WorkZone;

const MINUTES_PER_DAY: u32 = 24 * 60;

#[derive(Debug, Default, Clone)]
pub struct SettingsUpdateInput {
    pub workday_start_minute: Option<u32>,
    pub workday_end_minute: Option<u32>,
    pub min_gap_minutes: Option<i64>,
    pub daily_cap_hours: Option<f64>,
    pub load_factors: Option<LoadFactors>,
    pub lookahead_days: Option<u32>,
    pub slot_granularity_minutes: Option<i64>,
    pub default_task_minutes: Option<i64>,
    pub min_task_minutes: Option<i64>,
    pub timezone: Option<Option<String>>,
    pub default_break_hours: Option<Vec<u32>>,
}

/// Reads settings from a `.yaml`/`.yml` or JSON file and validates them.
/// Missing fields take their defaults.
pub fn load_settings(path: impl AsRef<Path>) -> AppResult<SchedulerSettings> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)?;
    let is_yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    );

    let settings: SchedulerSettings = if is_yaml {
        serde_yaml::from_str(&raw)?
    } else {
        serde_json::from_str(&raw)?
    };

    validate_settings(&settings)?;
    info!(
        target: "app::settings",
        path = %path.display(),
        "scheduler settings loaded"
    );
    Ok(settings)
}

pub fn validate_settings(settings: &SchedulerSettings) -> AppResult<()> {
    ensure_valid_minute(settings.workday_start_minute)?;
    ensure_valid_minute(settings.workday_end_minute)?;
    if settings.workday_start_minute >= settings.workday_end_minute {
        return Err(AppError::config(
            "working hours are invalid: start must be before end",
        ));
    }

    if !(0..=i64::from(MINUTES_PER_DAY)).contains(&settings.min_gap_minutes) {
        return Err(AppError::config("minimum gap must be between 0 and 1440 minutes"));
    }

    if !settings.daily_cap_hours.is_finite() || settings.daily_cap_hours <= 0.0 {
        return Err(AppError::config("daily cap must be a positive number of hours"));
    }

    let factors = settings.load_factors;
    for (name, value) in [
        ("high", factors.high),
        ("medium", factors.medium),
        ("low", factors.low),
    ] {
        if !value.is_finite() || value < 1.0 {
            return Err(AppError::config(format!(
                "load factor for {name} priority must be at least 1.0"
            )));
        }
    }

    if settings.lookahead_days == 0 || settings.lookahead_days > MAX_LOOKAHEAD_DAYS {
        return Err(AppError::config(format!(
            "look-ahead horizon must cover between 1 and {MAX_LOOKAHEAD_DAYS} days"
        )));
    }

    if !(1..=i64::from(MINUTES_PER_DAY)).contains(&settings.slot_granularity_minutes) {
        return Err(AppError::config(
            "slot granularity must be between 1 and 1440 minutes",
        ));
    }

    if settings.default_task_minutes <= 0 || settings.min_task_minutes <= 0 {
        return Err(AppError::config("task durations must be positive"));
    }

    if let Some(hour) = settings.default_break_hours.iter().find(|hour| **hour > 23) {
        return Err(AppError::config(format!("break hour {hour} is not an hour of day")));
    }

    WorkZone::from_setting(settings.timezone.as_deref())?;
    Ok(())
}

/// Applies a partial update and re-validates; `current` is untouched on error.
pub fn apply_update(
    current: &SchedulerSettings,
    input: SettingsUpdateInput,
) -> AppResult<SchedulerSettings> {
    let mut next = current.clone();

    if let Some(start) = input.workday_start_minute {
        next.workday_start_minute = start;
    }
    if let Some(end) = input.workday_end_minute {
        next.workday_end_minute = end;
    }
    if let Some(gap) = input.min_gap_minutes {
        next.min_gap_minutes = gap;
    }
    if let Some(cap) = input.daily_cap_hours {
        next.daily_cap_hours = cap;
    }
    if let Some(factors) = input.load_factors {
        next.load_factors = factors;
    }
    if let Some(days) = input.lookahead_days {
        next.lookahead_days = days;
    }
    if let Some(step) = input.slot_granularity_minutes {
        next.slot_granularity_minutes = step;
    }
    if let Some(minutes) = input.default_task_minutes {
        next.default_task_minutes = minutes;
    }
    if let Some(minutes) = input.min_task_minutes {
        next.min_task_minutes = minutes;
    }
    if let Some(timezone) = input.timezone {
        next.timezone = timezone.map(|name| name.trim().to_string());
    }
    if let Some(hours) = input.default_break_hours {
        next.default_break_hours = hours;
    }

    validate_settings(&next)?;
    Ok(next)
}

fn ensure_valid_minute(value: u32) -> AppResult<()> {
    if value > MINUTES_PER_DAY {
        Err(AppError::config("minute of day must be between 0 and 1440"))
    } else {
        Ok(())
    }
}
