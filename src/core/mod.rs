//! Analytics core of the acquisition dashboard.
//!
//! This module contains:
//! - Timeframe windowing into current and previous comparison periods
//! - Histogram binning of ore-site counts
//! - Period statistics with trends
//! - Dashboard snapshot building for export

pub mod histogram;
pub mod report;
pub mod stats;
pub mod windowing;

// Re-export commonly used types
pub use histogram::{compute_bins, compute_histogram, Bin, BinnedValues};
pub use report::{format_local_time, DashboardBuilder, DashboardSnapshot, HistoryRow, PRODUCER_NAME};
pub use stats::{compute_statistics, summarize, Comparison, DashboardStatistics, PeriodSummary, Trend};
pub use windowing::{compute_window, Timeframe, TimeframeError, WindowBounds, WindowResult};
