use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use crate::error::ConfigError;

/// Identifies one aggregation window for one category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BucketKey {
    pub category: String,
    pub time_bucket: String,
}

impl BucketKey {
    pub fn new(category: impl Into<String>, time_bucket: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            time_bucket: time_bucket.into(),
        }
    }
}

// "sports:2024-01-01 10:00"
impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category, self.time_bucket)
    }
}

/// Width of a time bucket, aligned to the Unix epoch in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketGranularity {
    secs: i64,
}

impl BucketGranularity {
    pub const MINUTE: BucketGranularity = BucketGranularity { secs: 60 };

    pub fn from_duration(width: Duration) -> Result<Self, ConfigError> {
        let secs = width.as_secs();
        if secs == 0 {
            return Err(ConfigError::Zero("bucket granularity"));
        }
        Ok(Self {
            secs: i64::try_from(secs).unwrap_or(i64::MAX),
        })
    }

    pub fn truncate(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let secs = ts.timestamp();
        DateTime::<Utc>::from_timestamp(secs - secs.rem_euclid(self.secs), 0).unwrap_or(ts)
    }

    // Minute-aligned widths drop the seconds field
    pub fn label(&self, ts: DateTime<Utc>) -> String {
        let start = self.truncate(ts);
        if self.secs % 60 == 0 {
            start.format("%Y-%m-%d %H:%M").to_string()
        } else {
            start.format("%Y-%m-%d %H:%M:%S").to_string()
        }
    }

    pub fn key(&self, category: &str, ts: DateTime<Utc>) -> BucketKey {
        BucketKey::new(category, self.label(ts))
    }
}

impl Default for BucketGranularity {
    fn default() -> Self {
        Self::MINUTE
    }
}
