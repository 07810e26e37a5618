//! CMM Analyzer
//!
//! Reads dimensional-inspection reports exported by coordinate-measuring
//! instruments, re-judges every measurement against its tolerance and computes
//! process capability, yield-driven tolerance suggestions and 2D positional
//! statistics.
//!
//! The pipeline: [`ingest`] turns CSV and PDF reports into judged
//! [`entities::MeasurementItem`]s, [`entities::build_groups`] classifies and
//! groups them, and [`stats::analyze`] produces the statistic rows.

pub mod cli;
pub mod core;
pub mod entities;
pub mod ingest;
pub mod stats;
