use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A start or due value: either a whole day or a specific instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskDate {
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
}

impl TaskDate {
    /// Point in time used for the `start <= due` check. A bare date counts
    /// as midnight UTC of that day.
    pub fn instant(&self) -> NaiveDateTime {
        match self {
            TaskDate::DateTime(dt) => dt.naive_utc(),
            TaskDate::Date(d) => d.and_time(chrono::NaiveTime::MIN),
        }
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            TaskDate::DateTime(dt) => dt.date_naive(),
            TaskDate::Date(d) => *d,
        }
    }

    pub fn has_time(&self) -> bool {
        matches!(self, TaskDate::DateTime(_))
    }
}

/// True when `start` lies after `due`. Either side missing never violates.
pub fn is_misordered(start: Option<&TaskDate>, due: Option<&TaskDate>) -> bool {
    match (start, due) {
        (Some(s), Some(d)) => s.instant() > d.instant(),
        _ => false,
    }
}

/// Render a date the way the search language expects it.
pub fn filter_date(d: NaiveDate) -> String {
    d.format("%m/%d/%Y").to_string()
}

impl From<NaiveDate> for TaskDate {
    fn from(d: NaiveDate) -> Self {
        TaskDate::Date(d)
    }
}

impl From<DateTime<Utc>> for TaskDate {
    fn from(dt: DateTime<Utc>) -> Self {
        TaskDate::DateTime(dt)
    }
}

impl fmt::Display for TaskDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskDate::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            TaskDate::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl FromStr for TaskDate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(TaskDate::Date(d));
        }
        DateTime::parse_from_rfc3339(s)
            .map(|dt| TaskDate::DateTime(dt.with_timezone(&Utc)))
            .map_err(|_| Error::InvalidDate(s.to_string()))
    }
}
