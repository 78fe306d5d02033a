use std::str::FromStr;

use chrono::{
    DateTime, Duration, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone,
    Timelike,
};
use chrono_tz::Tz;
use serde_json::json;

use crate::error::{AppError, AppResult};

pub fn parse_datetime(value: &str) -> AppResult<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value).map_err(|err| {
        AppError::validation_with_details(
            "invalid datetime",
            json!({"value": value, "error": err.to_string()}),
        )
    })
}

pub fn parse_optional_datetime(value: Option<&String>) -> AppResult<Option<DateTime<FixedOffset>>> {
    match value {
        Some(raw) => Ok(Some(parse_datetime(raw)?)),
        None => Ok(None),
    }
}

pub fn ensure_window(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> AppResult<()> {
    if end <= start {
        Err(AppError::validation("window end must be after its start"))
    } else {
        Ok(())
    }
}

/// `true` when the intervals are closer than `gap_minutes`; with a zero gap this
/// is the half-open overlap test, so touching intervals are apart.
pub fn within_gap(
    a_start: DateTime<FixedOffset>,
    a_end: DateTime<FixedOffset>,
    b_start: DateTime<FixedOffset>,
    b_end: DateTime<FixedOffset>,
    gap_minutes: i64,
) -> bool {
    let gap = Duration::minutes(gap_minutes.max(0));
    a_start < b_end + gap && b_start < a_end + gap
}

/// Rounds `dt` up to the next multiple of `step_minutes` past local midnight.
pub fn align_up(dt: NaiveDateTime, step_minutes: i64) -> NaiveDateTime {
    let step = step_minutes.max(1);
    let minute_of_day = minutes_from_midnight(dt.time());
    let has_remainder = dt.second() > 0 || dt.nanosecond() > 0 || minute_of_day % step != 0;
    if !has_remainder {
        return dt;
    }
    let aligned = (minute_of_day / step + 1) * step;
    dt.date().and_time(NaiveTime::MIN) + Duration::minutes(aligned)
}

pub fn minutes_from_midnight(time: NaiveTime) -> i64 {
    (time.hour() as i64) * 60 + (time.minute() as i64)
}

/// The zone whose wall clock defines working hours, calendar days and hour
/// buckets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WorkZone {
    System,
    Named(Tz),
}

impl WorkZone {
    pub fn from_setting(timezone: Option<&str>) -> AppResult<Self> {
        match timezone {
            Some(name) => Tz::from_str(name)
                .map(WorkZone::Named)
                .map_err(|_| AppError::config(format!("unknown timezone: {name}"))),
            None => Ok(WorkZone::System),
        }
    }

    pub fn local(&self, dt: DateTime<FixedOffset>) -> NaiveDateTime {
        match self {
            WorkZone::System => dt.with_timezone(&Local).naive_local(),
            WorkZone::Named(tz) => dt.with_timezone(tz).naive_local(),
        }
    }

    pub fn local_date(&self, dt: DateTime<FixedOffset>) -> NaiveDate {
        self.local(dt).date()
    }

    pub fn local_hour(&self, dt: DateTime<FixedOffset>) -> u32 {
        self.local(dt).hour()
    }

    /// Resolves a wall-clock time; ambiguous times take the earlier instant and
    /// times skipped by a DST jump yield `None`.
    pub fn at_local(&self, naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self {
            WorkZone::System => Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&dt.offset().fix())),
            WorkZone::Named(tz) => tz
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&dt.offset().fix())),
        }
    }
}
