//! Tabular text report reader

use csv::{ReaderBuilder, StringRecord};
use std::collections::HashMap;
use std::path::Path;

use super::header::{decode_strict, locate_header_in};
use super::{read_bytes, IngestError, SourceRecords};
use crate::core::{AnalyzerConfig, ColumnLabels};
use crate::entities::record::parse_number;
use crate::entities::{OriginalJudgement, RawRecord};

/// Read the raw records of a tabular report
pub fn read_tabular(path: &Path, config: &AnalyzerConfig) -> Result<SourceRecords, IngestError> {
    let bytes = read_bytes(path)?;
    parse_tabular(&bytes, path, config)
}

/// Parse an in-memory tabular report; `path` is only used for error context
pub fn parse_tabular(bytes: &[u8], path: &Path, config: &AnalyzerConfig) -> Result<SourceRecords, IngestError> {
    let location = locate_header_in(bytes, config).ok_or_else(|| IngestError::HeaderNotFound {
        path: path.to_path_buf(),
    })?;

    let text = decode_strict(bytes, location.encoding).ok_or_else(|| IngestError::Decode {
        path: path.to_path_buf(),
        encoding: location.encoding.name(),
    })?;

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(skip_lines(&text, location.line_index).as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| IngestError::Csv {
            path: path.to_path_buf(),
            source: e,
        })?
        .clone();
    let columns = ColumnMap::resolve(&headers, &config.labels).map_err(|missing| IngestError::MissingColumns {
        path: path.to_path_buf(),
        missing,
    })?;

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result.map_err(|e| IngestError::Csv {
            path: path.to_path_buf(),
            source: e,
        })?;
        if row.len() > headers.len() {
            tracing::debug!(line = ?row.position().map(|p| p.line()), "row wider than header skipped");
            continue;
        }
        records.push(columns.map(&row));
    }

    Ok(SourceRecords {
        records,
        captured_at: location.captured_at,
    })
}

/// Text starting at line `n` (zero-based)
fn skip_lines(text: &str, n: usize) -> &str {
    if n == 0 {
        return text;
    }
    match text.match_indices('\n').nth(n - 1) {
        Some((offset, _)) => &text[offset + 1..],
        None => "",
    }
}

/// Column indices of one report's header
#[derive(Debug, Clone, PartialEq)]
struct ColumnMap {
    no: usize,
    measured: usize,
    design: usize,
    project: Option<usize>,
    upper: Option<usize>,
    lower: Option<usize>,
    unit: Option<usize>,
    original: Option<usize>,
}

impl ColumnMap {
    /// Map labels to indices; the error lists missing required labels
    fn resolve(headers: &StringRecord, labels: &ColumnLabels) -> Result<Self, Vec<String>> {
        let mut names: HashMap<&str, usize> = HashMap::new();
        for (i, header) in headers.iter().enumerate() {
            names.entry(header.trim()).or_insert(i);
        }
        let find = |label: &str| names.get(label).copied();

        // Some exports decorate the number column (e.g. "No."); accept a short
        // column containing the label when no exact match exists
        let no = find(&labels.no).or_else(|| {
            headers
                .iter()
                .map(str::trim)
                .position(|h| h.contains(labels.no.as_str()) && h.chars().count() < 10)
        });

        let measured = find(&labels.measured);
        let design = find(&labels.design);

        let mut missing = Vec::new();
        for (index, label) in [(no, &labels.no), (measured, &labels.measured), (design, &labels.design)] {
            if index.is_none() {
                missing.push(label.clone());
            }
        }

        match (no, measured, design) {
            (Some(no), Some(measured), Some(design)) => Ok(Self {
                no,
                measured,
                design,
                project: find(&labels.project),
                upper: find(&labels.upper),
                lower: find(&labels.lower),
                unit: find(&labels.unit),
                original: labels.original_judgement.iter().find_map(|label| find(label.as_str())),
            }),
            _ => Err(missing),
        }
    }

    fn map(&self, row: &StringRecord) -> RawRecord {
        let cell = |index: usize| row.get(index).map(str::trim).unwrap_or("");
        let optional = |index: Option<usize>| index.map(cell).filter(|s| !s.is_empty());

        // An absent tolerance column means zero; a blank cell means missing
        let tolerance = |index: Option<usize>| match index {
            Some(i) => parse_number(cell(i)),
            None => Some(0.0),
        };

        RawRecord {
            no: cell(self.no).to_string(),
            project: optional(self.project).unwrap_or_default().to_string(),
            measured: parse_number(cell(self.measured)),
            design: parse_number(cell(self.design)),
            upper: tolerance(self.upper),
            lower: tolerance(self.lower),
            unit: optional(self.unit).map(str::to_string),
            original: optional(self.original).and_then(OriginalJudgement::parse),
        }
    }
}
