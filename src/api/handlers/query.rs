use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use serde::Deserialize;

use crate::db::TimeWindow;
use crate::errors::AppError;

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Query string shared by the list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
    pub hours: Option<i64>,
    pub start_date: Option<String>,
    pub start_time: Option<String>,
    pub end_date: Option<String>,
    pub end_time: Option<String>,
}

impl ListParams {
    /// Resolve the time filter.
    ///
    /// `hours` wins when present. Otherwise an explicit range is used only
    /// when all four date/time parts are given; anything less means no
    /// filter at all.
    pub fn window(&self, now: DateTime<Utc>) -> Result<TimeWindow, AppError> {
        if let Some(hours) = self.hours {
            let start = TimeDelta::try_hours(hours)
                .and_then(|span| now.checked_sub_signed(span))
                .ok_or_else(|| AppError::BadRequest(format!("hours out of range: {hours}")))?;
            return Ok(TimeWindow::between(start, now));
        }

        match (
            non_empty(&self.start_date),
            non_empty(&self.start_time),
            non_empty(&self.end_date),
            non_empty(&self.end_time),
        ) {
            (Some(sd), Some(st), Some(ed), Some(et)) => Ok(TimeWindow::between(
                parse_datetime(sd, st)?,
                parse_datetime(ed, et)?,
            )),
            _ => Ok(TimeWindow::UNBOUNDED),
        }
    }

    /// Row cap; absent or zero means no cap.
    pub fn limit(&self) -> Result<Option<i64>, AppError> {
        match self.limit {
            None | Some(0) => Ok(None),
            Some(n) if n < 0 => Err(AppError::BadRequest(format!(
                "limit must not be negative, got {n}"
            ))),
            Some(n) => Ok(Some(n)),
        }
    }
}

/// Parse `"{date}T{time}"`. Offsets are honoured; naive values are UTC.
pub fn parse_datetime(date: &str, time: &str) -> Result<DateTime<Utc>, AppError> {
    let literal = format!("{}T{}", date.trim(), time.trim());

    if let Ok(dt) = DateTime::parse_from_rfc3339(&literal) {
        return Ok(dt.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&literal, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| AppError::BadRequest(format!("Invalid date/time: {literal}")))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
