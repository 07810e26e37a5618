//! Measurement entity types
//!
//! - [`MeasurementItem`] - one judged measurement from one report
//! - [`Classification`] - how an item's label aggregates (1D / 2D / array)
//! - [`MeasurementGroup`] - the aggregation unit statistics are computed over

pub mod classify;
pub mod group;
pub mod record;

pub use classify::{classify_label, Axis, Classification, MeasurementType, Role, SummaryTag};
pub use group::{build_groups, ClassificationConflict, GroupMembers, GroupSet, MatchedPair, MeasurementGroup};
pub use record::{judge, Judgement, MeasurementItem, OriginalJudgement, RawRecord, RecordError};
