//! Timeframe windowing for trend comparison.
//!
//! A timeframe selects two adjacent, equal-length periods: the current one
//! ending at "now" and the previous one directly before it. Records are
//! partitioned into those two periods so the caller can compute a trend.

use crate::models::Timestamped;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const SECS_PER_DAY: i64 = 24 * 60 * 60;

/// Selectable trend-comparison window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    /// Everything, no previous period
    AllTime,
    #[default]
    #[serde(rename = "last_24h")]
    Last24h,
    #[serde(rename = "last_7d")]
    Last7d,
    #[serde(rename = "last_30d")]
    Last30d,
    #[serde(rename = "last_90d")]
    Last90d,
}

impl Timeframe {
    /// All selectable timeframes, in display order.
    pub const ALL: [Timeframe; 5] = [
        Timeframe::AllTime,
        Timeframe::Last24h,
        Timeframe::Last7d,
        Timeframe::Last30d,
        Timeframe::Last90d,
    ];

    /// Length of one period in seconds, or `None` for [`Timeframe::AllTime`].
    pub fn period_secs(self) -> Option<i64> {
        match self {
            Timeframe::AllTime => None,
            Timeframe::Last24h => Some(SECS_PER_DAY),
            Timeframe::Last7d => Some(7 * SECS_PER_DAY),
            Timeframe::Last30d => Some(30 * SECS_PER_DAY),
            Timeframe::Last90d => Some(90 * SECS_PER_DAY),
        }
    }

    /// Length of one period as a duration.
    pub fn period_duration(self) -> Option<Duration> {
        self.period_secs().map(Duration::seconds)
    }

    /// Wire name, e.g. `last_24h`.
    pub fn as_str(self) -> &'static str {
        match self {
            Timeframe::AllTime => "all_time",
            Timeframe::Last24h => "last_24h",
            Timeframe::Last7d => "last_7d",
            Timeframe::Last30d => "last_30d",
            Timeframe::Last90d => "last_90d",
        }
    }

    /// Human readable label.
    pub fn label(self) -> &'static str {
        match self {
            Timeframe::AllTime => "All time",
            Timeframe::Last24h => "Last 24 hours",
            Timeframe::Last7d => "Last 7 days",
            Timeframe::Last30d => "Last 30 days",
            Timeframe::Last90d => "Last 90 days",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = TimeframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        if normalized == "custom" {
            return Err(TimeframeError::Unsupported(normalized));
        }
        Timeframe::ALL
            .into_iter()
            .find(|tf| tf.as_str() == normalized)
            .ok_or(TimeframeError::Unknown(normalized))
    }
}

/// Timeframe parsing errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeframeError {
    /// Not a timeframe name at all
    Unknown(String),
    /// A known option that cannot be selected
    Unsupported(String),
}

impl fmt::Display for TimeframeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeframeError::Unknown(s) => write!(
                f,
                "Unknown timeframe '{s}' (expected one of: all_time, last_24h, last_7d, last_30d, last_90d)"
            ),
            TimeframeError::Unsupported(s) => write!(f, "Timeframe '{s}' is not supported"),
        }
    }
}

impl std::error::Error for TimeframeError {}

/// Boundaries of the two comparison periods, in epoch seconds.
///
/// The current period is `[current_start, end]`, the previous one is
/// `[previous_start, current_start)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowBounds {
    pub previous_start: i64,
    pub current_start: i64,
    pub end: i64,
}

impl WindowBounds {
    /// Bounds for `timeframe` ending at `now`, or `None` for all-time.
    pub fn new(timeframe: Timeframe, now: i64) -> Option<Self> {
        let period = timeframe.period_secs()?;
        Some(Self {
            previous_start: now.saturating_sub(period.saturating_mul(2)),
            current_start: now.saturating_sub(period),
            end: now,
        })
    }

    pub fn in_current(&self, timestamp: i64) -> bool {
        timestamp >= self.current_start && timestamp <= self.end
    }

    pub fn in_previous(&self, timestamp: i64) -> bool {
        timestamp >= self.previous_start && timestamp < self.current_start
    }
}

/// Records split into the current and previous comparison periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowResult<T> {
    pub current: Vec<T>,
    pub previous: Vec<T>,
}

impl<T> WindowResult<T> {
    /// True when neither period holds any record.
    pub fn is_empty(&self) -> bool {
        self.current.is_empty() && self.previous.is_empty()
    }

    /// Whether a previous period exists to compare against.
    pub fn has_previous(&self) -> bool {
        !self.previous.is_empty()
    }
}

/// Partition `records` into the current and previous periods of `timeframe`.
///
/// For [`Timeframe::AllTime`] every record is current and there is no previous
/// period. Input order is preserved within each period; records outside both
/// periods (too old, or in the future) are dropped.
pub fn compute_window<T>(records: &[T], timeframe: Timeframe, now: i64) -> WindowResult<T>
where
    T: Timestamped + Clone,
{
    let Some(bounds) = WindowBounds::new(timeframe, now) else {
        return WindowResult {
            current: records.to_vec(),
            previous: Vec::new(),
        };
    };

    let mut current = Vec::new();
    let mut previous = Vec::new();

    for record in records {
        let ts = record.timestamp();
        if bounds.in_current(ts) {
            current.push(record.clone());
        } else if bounds.in_previous(ts) {
            previous.push(record.clone());
        }
    }

    tracing::debug!(
        timeframe = %timeframe,
        total = records.len(),
        current = current.len(),
        previous = previous.len(),
        "Partitioned records into comparison periods"
    );

    WindowResult { current, previous }
}
