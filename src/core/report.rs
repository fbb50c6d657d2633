//! Dashboard snapshot builder.
//!
//! A snapshot bundles everything the dashboard shows for one timeframe: the
//! comparison window, the period statistics, the ore-site histogram and the
//! acquisition history of the current period.

use crate::core::histogram::{compute_histogram, Bin};
use crate::core::stats::{compute_statistics, DashboardStatistics};
use crate::core::windowing::{compute_window, Timeframe, WindowBounds};
use crate::models::Acquisition;
use chrono::{Offset, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name used in snapshots to identify the producer.
pub const PRODUCER_NAME: &str = "acquisition-dashboard";

/// One row of the acquisition history table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub timestamp: i64,
    pub ore_sites: u64,
    /// Local time, e.g. `2023-11-14 23:13:20 (UTC+1)`
    pub time: String,
}

/// Everything the dashboard renders for one timeframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub report_id: String,
    pub producer: String,
    pub generated_at_utc: String,
    pub timeframe: Timeframe,
    /// Comparison bounds, absent for all-time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<WindowBounds>,
    pub statistics: DashboardStatistics,
    pub histogram: Vec<Bin>,
    /// Current period, newest first
    pub history: Vec<HistoryRow>,
}

impl DashboardSnapshot {
    /// True when the current period has no acquisitions.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

/// Builds dashboard snapshots for a fixed display timezone.
pub struct DashboardBuilder {
    instance_id: String,
    timezone: Tz,
}

impl DashboardBuilder {
    /// Builder rendering local times in UTC.
    pub fn new() -> Self {
        Self::with_timezone(Tz::UTC)
    }

    pub fn with_timezone(timezone: Tz) -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
            timezone,
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Window `records` by `timeframe` at `now` and derive the full snapshot.
    pub fn build(
        &self,
        records: &[Acquisition],
        timeframe: Timeframe,
        now: i64,
    ) -> DashboardSnapshot {
        let window = compute_window(records, timeframe, now);
        let statistics = compute_statistics(&window);

        let ore_sites: Vec<u64> = window.current.iter().map(|a| a.ore_sites).collect();
        let histogram = compute_histogram(&ore_sites);

        let mut current = window.current;
        current.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        let history = current
            .iter()
            .map(|a| HistoryRow {
                timestamp: a.timestamp,
                ore_sites: a.ore_sites,
                time: format_local_time(a.timestamp, self.timezone),
            })
            .collect();

        DashboardSnapshot {
            report_id: format!("{}-{}", &self.instance_id[..8], now),
            producer: PRODUCER_NAME.to_string(),
            generated_at_utc: Utc::now().to_rfc3339(),
            timeframe,
            bounds: WindowBounds::new(timeframe, now),
            statistics,
            histogram,
            history,
        }
    }

    /// Build a snapshot and serialize it to pretty JSON.
    pub fn build_json(&self, records: &[Acquisition], timeframe: Timeframe, now: i64) -> String {
        let snapshot = self.build(records, timeframe, now);
        serde_json::to_string_pretty(&snapshot).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Default for DashboardBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Format an epoch timestamp as local time with its UTC offset in hours.
pub fn format_local_time(timestamp: i64, timezone: Tz) -> String {
    let Some(local) = timezone.timestamp_opt(timestamp, 0).single() else {
        return timestamp.to_string();
    };

    let offset_secs = local.offset().fix().local_minus_utc();
    let hours = offset_secs as f64 / 3600.0;
    let offset = if offset_secs % 3600 == 0 {
        format!("{:+}", offset_secs / 3600)
    } else {
        format!("{hours:+}")
    };

    format!("{} (UTC{offset})", local.format("%Y-%m-%d %H:%M:%S"))
}
