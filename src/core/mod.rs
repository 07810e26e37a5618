//! Core module - configuration and shared utilities

pub mod config;
pub mod logging;
pub mod natural;
pub mod timestamp;

pub use config::{AnalyzerConfig, ColumnLabels};
pub use natural::natural_cmp;
pub use timestamp::parse_capture_timestamp;
