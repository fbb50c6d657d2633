//! Period statistics and trend comparison.
//!
//! Every metric is computed for the current period and, when one exists, for
//! the previous period, so the dashboard can show an up/down trend.

use crate::core::windowing::WindowResult;
use crate::models::Acquisition;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Direction of change relative to the previous period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    /// At or above the previous period
    Up,
    /// Below the previous period
    Down,
    /// No previous period to compare against
    Neutral,
}

impl Trend {
    /// Compare `current` against an optional `previous` value.
    ///
    /// Equal values count as [`Trend::Up`].
    pub fn between<T: PartialOrd>(current: &T, previous: Option<&T>) -> Self {
        match previous {
            None => Trend::Neutral,
            Some(prev) if prev > current => Trend::Down,
            Some(_) => Trend::Up,
        }
    }

    /// Arrow glyph for terminal output.
    pub fn arrow(self) -> &'static str {
        match self {
            Trend::Up => "\u{2191}",
            Trend::Down => "\u{2193}",
            Trend::Neutral => " ",
        }
    }
}

/// A metric for the current period alongside the previous period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison<T> {
    pub current: T,
    /// Only set when the previous period has records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<T>,
    pub trend: Trend,
}

impl<T: PartialOrd> Comparison<T> {
    pub fn new(current: T, previous: Option<T>) -> Self {
        let trend = Trend::between(&current, previous.as_ref());
        Self {
            current,
            previous,
            trend,
        }
    }
}

/// Aggregates for one period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub acquisitions: usize,
    pub ore_sites: u64,
    /// Mean ore sites per acquisition, `None` for an empty period
    pub average_ore_sites: Option<f64>,
}

/// Compute the aggregates of a single period.
pub fn summarize(records: &[Acquisition]) -> PeriodSummary {
    PeriodSummary {
        acquisitions: records.len(),
        ore_sites: total_ore_sites(records),
        average_ore_sites: average_ore_sites(records),
    }
}

/// Sum of ore sites.
pub fn total_ore_sites(records: &[Acquisition]) -> u64 {
    records.iter().map(|a| a.ore_sites).sum()
}

/// Mean ore sites per acquisition, `None` when there are no records.
pub fn average_ore_sites(records: &[Acquisition]) -> Option<f64> {
    if records.is_empty() {
        return None;
    }
    Some(records.iter().map(|a| a.ore_sites as f64).mean())
}

/// Dashboard statistics with trends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStatistics {
    pub total_acquisitions: Comparison<usize>,
    pub total_ore_sites: Comparison<u64>,
    /// Absent when the current period is empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_ore_sites: Option<Comparison<f64>>,
}

/// Compute all dashboard statistics for a windowed record set.
pub fn compute_statistics(window: &WindowResult<Acquisition>) -> DashboardStatistics {
    let current = summarize(&window.current);
    let previous = window.has_previous().then(|| summarize(&window.previous));

    let average_ore_sites = current
        .average_ore_sites
        .map(|avg| Comparison::new(avg, previous.and_then(|p| p.average_ore_sites)));

    DashboardStatistics {
        total_acquisitions: Comparison::new(current.acquisitions, previous.map(|p| p.acquisitions)),
        total_ore_sites: Comparison::new(current.ore_sites, previous.map(|p| p.ore_sites)),
        average_ore_sites,
    }
}
