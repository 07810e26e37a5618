//! Report ingestion
//!
//! Two source kinds feed the same record schema:
//!
//! - tabular text exports (`.csv`), located with [`header::locate_header`]
//!   and read by [`tabular`]
//! - paginated documents (`.pdf`), read by [`pdf`] and parsed by [`document`]
//!
//! [`load_file`] dispatches on the extension and normalizes every raw record
//! into a judged [`MeasurementItem`]. [`worker`] runs that over a batch.

pub mod discover;
pub mod document;
pub mod header;
pub mod pdf;
pub mod tabular;
pub mod worker;

use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::AnalyzerConfig;
use crate::entities::{MeasurementItem, RawRecord};

pub use discover::{discover_reports, Discovery, DuplicateStrategy};
pub use header::{locate_header, HeaderLocation};
pub use worker::{load_batch, spawn_loader, LoadEvent, LoadOutcome, LoaderHandle};

/// Errors while reading one report. The batch loader logs these and moves on.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("cannot read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("permission denied reading {path:?}")]
    Permission { path: PathBuf },

    #[error("{path:?} is not valid {encoding}")]
    Decode { path: PathBuf, encoding: &'static str },

    #[error("no header row found in {path:?}")]
    HeaderNotFound { path: PathBuf },

    #[error("{path:?} lacks required column(s): {}", .missing.join(", "))]
    MissingColumns { path: PathBuf, missing: Vec<String> },

    #[error("unreadable document {path:?}: {message}")]
    Document { path: PathBuf, message: String },

    #[error("malformed table in {path:?}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("no measurement records in {path:?}")]
    NoRecords { path: PathBuf },

    #[error("unsupported report type {path:?} (expected .csv or .pdf)")]
    Unsupported { path: PathBuf },
}

/// Kind of report, decided by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Tabular text export
    Tabular,
    /// Paginated document
    Document,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(SourceKind::Tabular),
            "pdf" => Some(SourceKind::Document),
            _ => None,
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Tabular => write!(f, "csv"),
            SourceKind::Document => write!(f, "pdf"),
        }
    }
}

/// Raw records of one source plus its capture time
#[derive(Debug, Clone, Default)]
pub struct SourceRecords {
    pub records: Vec<RawRecord>,
    pub captured_at: Option<NaiveDateTime>,
}

/// The judged records of one report
#[derive(Debug, Clone)]
pub struct RecordBatch {
    /// File name, used as the source identity of every item
    pub source: String,
    pub kind: SourceKind,
    pub captured_at: Option<NaiveDateTime>,
    pub items: Vec<MeasurementItem>,
    /// Rows dropped during normalization
    pub dropped: usize,
}

/// Display name of a report: its file name
pub fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub(crate) fn read_bytes(path: &Path) -> Result<Vec<u8>, IngestError> {
    std::fs::read(path).map_err(|e| io_error(path, e))
}

pub(crate) fn io_error(path: &Path, error: std::io::Error) -> IngestError {
    if error.kind() == ErrorKind::PermissionDenied {
        IngestError::Permission {
            path: path.to_path_buf(),
        }
    } else {
        IngestError::Io {
            path: path.to_path_buf(),
            source: error,
        }
    }
}

/// Source identities for a batch of reports.
///
/// The file name when it is unique within `paths`, otherwise the full path,
/// so same-named reports from different directories stay distinct.
pub fn source_names(paths: &[PathBuf]) -> Vec<String> {
    let mut name_counts: HashMap<String, usize> = HashMap::new();
    for path in paths {
        *name_counts.entry(source_name(path)).or_default() += 1;
    }
    paths
        .iter()
        .map(|path| {
            let name = source_name(path);
            if name_counts.get(&name).copied().unwrap_or(0) > 1 {
                path.display().to_string()
            } else {
                name
            }
        })
        .collect()
}

/// Read, normalize and judge one report under the given source identity
pub fn load_file(path: &Path, source: &str, config: &AnalyzerConfig) -> Result<RecordBatch, IngestError> {
    let kind = SourceKind::from_path(path).ok_or_else(|| IngestError::Unsupported {
        path: path.to_path_buf(),
    })?;

    let raw = match kind {
        SourceKind::Tabular => tabular::read_tabular(path, config)?,
        SourceKind::Document => {
            pdf::read_document(path, config)?.ok_or_else(|| IngestError::NoRecords {
                path: path.to_path_buf(),
            })?
        }
    };

    let batch = normalize(raw, source, kind);
    if batch.items.is_empty() {
        return Err(IngestError::NoRecords {
            path: path.to_path_buf(),
        });
    }

    tracing::info!(
        file = %batch.source,
        %kind,
        items = batch.items.len(),
        dropped = batch.dropped,
        "loaded report"
    );
    Ok(batch)
}

/// Turn raw records into judged items, dropping malformed rows
pub fn normalize(raw: SourceRecords, source: &str, kind: SourceKind) -> RecordBatch {
    let mut items = Vec::with_capacity(raw.records.len());
    let mut dropped = 0;

    for record in raw.records {
        match MeasurementItem::from_raw(record, source, raw.captured_at) {
            Ok(item) => items.push(item),
            Err(e) => {
                tracing::debug!(file = %source, error = %e, "dropped row");
                dropped += 1;
            }
        }
    }

    RecordBatch {
        source: source.to_string(),
        kind,
        captured_at: raw.captured_at,
        items,
        dropped,
    }
}
