//! Configuration management with layered hierarchy
//!
//! The effective [`AnalyzerConfig`] is assembled once at startup and then passed
//! by reference into every component. Nothing in the library reads global state.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::stats::is_probability;

/// Directory name that marks a project-level configuration
pub const PROJECT_DIR: &str = ".cmma";

/// Field labels of the instrument's export format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnLabels {
    /// Item number column
    pub no: String,
    /// Measurement item (project) label column
    pub project: String,
    /// Measured value column
    pub measured: String,
    /// Design (nominal) value column
    pub design: String,
    /// Upper tolerance column
    pub upper: String,
    /// Lower tolerance column
    pub lower: String,
    /// Unit column
    pub unit: String,
    /// Original judgement column, in lookup order (text export variant first)
    pub original_judgement: Vec<String>,
    /// Marker of the line carrying the capture timestamp
    pub timestamp_marker: String,
    /// Lines of a paginated document containing any of these are never records
    pub document_skip_markers: Vec<String>,
}

impl Default for ColumnLabels {
    fn default() -> Self {
        Self {
            no: "No".to_string(),
            project: "測量專案".to_string(),
            measured: "實測值".to_string(),
            design: "設計值".to_string(),
            upper: "上限公差".to_string(),
            lower: "下限公差".to_string(),
            unit: "單位".to_string(),
            original_judgement: vec!["判斷".to_string(), "判断".to_string()],
            timestamp_marker: "測量日期及時間".to_string(),
            document_skip_markers: vec![
                "測量專案".to_string(),
                "部件報告".to_string(),
                "測量結果".to_string(),
            ],
        }
    }
}

impl ColumnLabels {
    /// The three tokens that must appear together on a header line
    pub fn header_tokens(&self) -> [&str; 3] {
        [&self.no, &self.measured, &self.design]
    }
}

/// Analyzer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Target yield used for tolerance suggestions (0.0 - 1.0)
    pub target_yield: f64,

    /// Sample count from which a statistic is considered reliable
    pub min_reliable_samples: usize,

    /// Number of leading lines searched for the header row
    pub header_scan_lines: usize,

    /// Number of leading lines searched for the capture timestamp
    pub timestamp_scan_lines: usize,

    /// Vertical distance within which document tokens share a text line
    pub row_tolerance: f64,

    /// Candidate encodings for text reports, tried in order
    pub encodings: Vec<String>,

    /// Merge X/Y coordinate members into one radial statistic row
    pub merge_pairs: bool,

    /// Append log output to this file instead of stderr
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    /// Export field labels
    pub labels: ColumnLabels,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            target_yield: 0.90,
            min_reliable_samples: 30,
            header_scan_lines: 60,
            timestamp_scan_lines: 20,
            row_tolerance: 3.0,
            encodings: vec![
                "utf-8".to_string(),
                "big5".to_string(),
                "shift_jis".to_string(),
            ],
            merge_pairs: true,
            log_file: None,
            labels: ColumnLabels::default(),
        }
    }
}

/// Partial configuration as read from one YAML layer
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigLayer {
    target_yield: Option<f64>,
    min_reliable_samples: Option<usize>,
    header_scan_lines: Option<usize>,
    timestamp_scan_lines: Option<usize>,
    row_tolerance: Option<f64>,
    encodings: Option<Vec<String>>,
    merge_pairs: Option<bool>,
    log_file: Option<PathBuf>,
    labels: Option<ColumnLabels>,
}

impl AnalyzerConfig {
    /// Load configuration from all sources, merging in priority order.
    ///
    /// Layers or values that cannot be used are skipped and described in the
    /// returned messages. Nothing is logged here; logging is set up from the
    /// loaded configuration.
    pub fn load() -> (Self, Vec<String>) {
        let mut config = AnalyzerConfig::default();
        let mut warnings = Vec::new();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/cmma/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            config.merge_file(&global_path, &mut warnings);
        }

        // 3. Project config (.cmma/config.yaml)
        if let Some(project_path) = Self::project_config_path() {
            config.merge_file(&project_path, &mut warnings);
        }

        // 4. Environment variables
        if let Ok(value) = std::env::var("CMMA_TARGET_YIELD") {
            match value.trim().parse::<f64>() {
                Ok(y) if is_probability(y) => config.target_yield = y,
                Ok(_) => warnings.push(format!(
                    "ignoring CMMA_TARGET_YIELD={value:?}: yield must lie between 0 and 1 (exclusive)"
                )),
                Err(_) => warnings.push(format!("ignoring CMMA_TARGET_YIELD={value:?}: not a number")),
            }
        }
        if let Ok(path) = std::env::var("CMMA_LOG_FILE") {
            if !path.is_empty() {
                config.log_file = Some(PathBuf::from(path));
            }
        }

        (config, warnings)
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "cmma")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Find `.cmma/config.yaml` by walking up from the current directory
    pub fn project_config_path() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        Self::project_config_path_from(&current)
    }

    /// Find `.cmma/config.yaml` by walking up from `start`
    pub fn project_config_path_from(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(PROJECT_DIR).join("config.yaml"))
            .find(|candidate| candidate.is_file())
    }

    fn merge_file(&mut self, path: &Path, warnings: &mut Vec<String>) {
        if !path.exists() {
            return;
        }
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warnings.push(format!("cannot read config {}: {e}", path.display()));
                return;
            }
        };
        match serde_yml::from_str::<ConfigLayer>(&contents) {
            Ok(layer) => self.merge(layer, &path.display().to_string(), warnings),
            Err(e) => warnings.push(format!("ignoring malformed config {}: {e}", path.display())),
        }
    }

    /// Merge another layer into this one (other takes precedence)
    fn merge(&mut self, other: ConfigLayer, origin: &str, warnings: &mut Vec<String>) {
        match other.target_yield {
            Some(v) if is_probability(v) => self.target_yield = v,
            Some(v) => warnings.push(format!(
                "ignoring target_yield {v} in {origin}: yield must lie between 0 and 1 (exclusive)"
            )),
            None => {}
        }
        if let Some(v) = other.min_reliable_samples {
            self.min_reliable_samples = v;
        }
        if let Some(v) = other.header_scan_lines {
            self.header_scan_lines = v;
        }
        if let Some(v) = other.timestamp_scan_lines {
            self.timestamp_scan_lines = v;
        }
        if let Some(v) = other.row_tolerance {
            self.row_tolerance = v;
        }
        if let Some(v) = other.encodings {
            self.encodings = v;
        }
        if let Some(v) = other.merge_pairs {
            self.merge_pairs = v;
        }
        if other.log_file.is_some() {
            self.log_file = other.log_file;
        }
        if let Some(v) = other.labels {
            self.labels = v;
        }
    }

    /// Parse a YAML document and merge it over the defaults.
    ///
    /// Values out of range are reported as warnings and keep their defaults.
    pub fn from_yaml(contents: &str) -> Result<(Self, Vec<String>), serde_yml::Error> {
        let layer: ConfigLayer = serde_yml::from_str(contents)?;
        let mut config = AnalyzerConfig::default();
        let mut warnings = Vec::new();
        config.merge(layer, "document", &mut warnings);
        Ok((config, warnings))
    }

    /// Configuration keys understood by the YAML layers
    pub fn keys() -> &'static [(&'static str, &'static str)] {
        &[
            ("target_yield", "Target yield for tolerance suggestions (default 0.90)"),
            ("min_reliable_samples", "Sample count considered reliable (default 30)"),
            ("header_scan_lines", "Lines searched for the header row (default 60)"),
            ("timestamp_scan_lines", "Lines searched for the capture time (default 20)"),
            ("row_tolerance", "Vertical clustering tolerance for PDF text (default 3.0)"),
            ("encodings", "Encodings tried for text reports, in order"),
            ("merge_pairs", "Merge X/Y coordinates into radial rows (default true)"),
            ("log_file", "Append logs to this file instead of stderr"),
            ("labels", "Export field labels (no, project, measured, ...)"),
        ]
    }
}
