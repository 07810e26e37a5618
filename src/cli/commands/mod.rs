//! CLI command implementations

pub mod utils;

pub mod completions;
pub mod config;
pub mod records;
pub mod report;
pub mod stats;
pub mod tolerance;
