//! Project-label classification grammar
//!
//! A measured item's label decides how it aggregates:
//!
//! - `Hole[X座標]` / `Hole[Y座標]`: one axis of a 2D coordinate pair
//! - `Flatness[3]`: one indexed point of an array
//! - `Flatness[平均]`, `Flatness[Max]`: a summary entry of an array
//! - anything else: a plain scalar

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// How a measured item is aggregated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementType {
    Scalar,
    CoordinatePair,
    ArrayPoint,
}

impl fmt::Display for MeasurementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasurementType::Scalar => write!(f, "1D"),
            MeasurementType::CoordinatePair => write!(f, "2D"),
            MeasurementType::ArrayPoint => write!(f, "array"),
        }
    }
}

/// Axis of a coordinate-pair member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    /// Literal tag used in labels
    pub fn tag(self) -> &'static str {
        match self {
            Axis::X => "X座標",
            Axis::Y => "Y座標",
        }
    }
}

/// Kind of array summary entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryTag {
    Average,
    Maximum,
    Minimum,
}

impl SummaryTag {
    fn parse(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "平均" | "avg" => Some(SummaryTag::Average),
            "最大" | "max" => Some(SummaryTag::Maximum),
            "最小" | "min" => Some(SummaryTag::Minimum),
            _ => None,
        }
    }
}

/// Role of a member within its group
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The whole label is the identifier
    Whole,
    Axis(Axis),
    /// Indexed point; `literal` is the index as written, e.g. `01`
    Index { index: u64, literal: String },
    /// Summary entry; `literal` is the tag as written in the label
    Summary { tag: SummaryTag, literal: String },
}

/// Result of classifying one label
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Classification {
    pub kind: MeasurementType,
    /// Label with the bracketed suffix stripped
    pub group_id: String,
    pub role: Role,
}

impl Classification {
    /// Reconstruct the label this classification was derived from
    pub fn label(&self) -> String {
        match &self.role {
            Role::Whole => self.group_id.clone(),
            Role::Axis(axis) => format!("{}[{}]", self.group_id, axis.tag()),
            Role::Index { literal, .. } => format!("{}[{}]", self.group_id, literal),
            Role::Summary { literal, .. } => format!("{}[{}]", self.group_id, literal),
        }
    }
}

fn coordinate_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(.+?)\[(X座標|Y座標)\]$").expect("valid coordinate pattern"))
}

fn index_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(.+?)\[(\d+)\]$").expect("valid index pattern"))
}

fn summary_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        RegexBuilder::new(r"^(.+?)\[(平均|最大|最小|Max|Min|Avg)\]$")
            .case_insensitive(true)
            .build()
            .expect("valid summary pattern")
    })
}

/// Classify a project label. Pure; never fails.
pub fn classify_label(label: &str) -> Classification {
    if let Some(caps) = coordinate_pattern().captures(label) {
        let axis = if &caps[2] == "X座標" { Axis::X } else { Axis::Y };
        return Classification {
            kind: MeasurementType::CoordinatePair,
            group_id: caps[1].to_string(),
            role: Role::Axis(axis),
        };
    }

    if let Some(caps) = index_pattern().captures(label) {
        // Zero-padded indices share the point of their numeric value; indices
        // beyond u64 leave the label a scalar
        if let Ok(index) = caps[2].parse::<u64>() {
            return Classification {
                kind: MeasurementType::ArrayPoint,
                group_id: caps[1].to_string(),
                role: Role::Index {
                    index,
                    literal: caps[2].to_string(),
                },
            };
        }
    } else if let Some(caps) = summary_pattern().captures(label) {
        if let Some(tag) = SummaryTag::parse(&caps[2]) {
            return Classification {
                kind: MeasurementType::ArrayPoint,
                group_id: caps[1].to_string(),
                role: Role::Summary {
                    tag,
                    literal: caps[2].to_string(),
                },
            };
        }
    }

    Classification {
        kind: MeasurementType::Scalar,
        group_id: label.to_string(),
        role: Role::Whole,
    }
}
