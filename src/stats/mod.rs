//! Statistics - capability, tolerance inversion, radial and array analysis

pub mod array;
pub mod capability;
pub mod descriptive;
pub mod engine;
pub mod radial;
pub mod tolerance;

pub use array::{array_statistics, ArrayStatistics};
pub use capability::{cpk, cpu, CapabilityEstimate, CapabilityTier, DEFAULT_MIN_SAMPLES};
pub use descriptive::{describe, mean, sample_std, Summary};
pub use engine::{
    analyze, tolerance_detail, Analysis, AnalysisOptions, ArraySummary, FilePeakValley, RadialStats, RowKind,
    RunSummary, StatisticRow, ToleranceDetail,
};
pub use radial::{
    judge_radial, radial_capability, radial_deviation, radial_tolerance, rayleigh_tolerance, RayleighSuggestion,
    RayleighTier,
};
pub use tolerance::{
    compare_with_spec, inverse_normal_cdf, is_probability, tolerance_for_yield, two_sided_z, SpecComparison, ToleranceSuggestion,
    ToleranceTier, STANDARD_YIELDS,
};
