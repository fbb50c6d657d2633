//! Acquisition Dashboard - analytics for ore-site acquisitions.
//!
//! This library derives the statistics an acquisitions dashboard shows:
//! current vs. previous period trends and the distribution of ore sites.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Acquisition Dashboard                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │  REST API   │──▶│  Windowing  │──▶│ Statistics  │       │
//! │  │  (records)  │   │ (timeframe) │   │  (trends)   │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │         │                 │                  │              │
//! │         ▼                 ▼                  ▼              │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │   Session   │   │  Histogram  │──▶│  Dashboard  │       │
//! │  │   Context   │   │   (bins)    │   │  Snapshot   │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Windowing and histogram binning are pure functions of their inputs; "now"
//! is always passed in explicitly.
//!
//! # Example
//!
//! ```
//! use acquisition_dashboard::{compute_bins, compute_window, Acquisition, Timeframe};
//!
//! let now = 1_700_000_000;
//! let records = vec![Acquisition::new(now - 10, 1), Acquisition::new(now - 90_000, 2)];
//!
//! let window = compute_window(&records, Timeframe::Last24h, now);
//! assert_eq!(window.current.len(), 1);
//! assert_eq!(window.previous.len(), 1);
//!
//! let binned = compute_bins(&[5, 5, 5]);
//! assert_eq!(binned.bins, vec![3]);
//! assert_eq!(binned.labels, vec!["5".to_string()]);
//! ```

pub mod config;
pub mod core;
pub mod models;
pub mod session;

#[cfg(feature = "api")]
pub mod api;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use crate::core::{
    compute_bins, compute_histogram, compute_statistics, compute_window, Bin, BinnedValues,
    DashboardBuilder, DashboardSnapshot, DashboardStatistics, Timeframe, Trend, WindowResult,
};
pub use models::{Acquisition, Timestamped, TokenResponse, User, UserUpdate};
pub use session::{AuthContext, MemorySessionStore, SessionError, SessionStore};

#[cfg(feature = "api")]
pub use api::{ApiClient, ApiConfig, ApiError, BlockingApiClient};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shown wherever a period has nothing to display.
pub const NO_DATA_MESSAGE: &str = "No data available to display.";
