//! Encoding-fallback header discovery for tabular text reports
//!
//! Instrument exports put a free-form preamble (part name, operator, capture
//! time) in front of the data table, and the file encoding depends on the
//! locale of the machine that wrote it. The locator decodes only a bounded
//! prefix of the file with each candidate encoding until one of them yields a
//! line carrying all header tokens.

use chrono::NaiveDateTime;
use encoding_rs::{Encoding, BIG5, UTF_8};

use super::{read_bytes, IngestError};
use crate::core::timestamp::parse_capture_timestamp;
use crate::core::AnalyzerConfig;
use std::path::Path;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Where the data table of a text report starts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeaderLocation {
    /// Zero-based line index of the header row
    pub line_index: usize,
    /// Encoding the prefix was decoded with
    pub encoding: &'static Encoding,
    /// Capture timestamp from the preamble, if present and parseable
    pub captured_at: Option<NaiveDateTime>,
}

/// Resolve an encoding label. `cp950` is the Windows superset of Big5 and is
/// decoded as Big5.
pub fn resolve_encoding(label: &str) -> Option<&'static Encoding> {
    match label.trim().to_ascii_lowercase().as_str() {
        "cp950" | "ms950" => Some(BIG5),
        "utf-8-sig" | "utf8-sig" => Some(UTF_8),
        other => Encoding::for_label(other.as_bytes()),
    }
}

/// Strip a UTF-8 byte-order mark
pub(crate) fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

/// The first `max_lines` lines of `bytes`, line terminators included.
///
/// Splitting on `\n` before decoding is safe for every supported encoding: the
/// byte never occurs inside a Big5 or Shift_JIS multi-byte sequence.
fn line_prefix(bytes: &[u8], max_lines: usize) -> &[u8] {
    if max_lines == 0 {
        return &[];
    }
    match bytes
        .iter()
        .enumerate()
        .filter(|(_, b)| **b == b'\n')
        .nth(max_lines - 1)
    {
        Some((end, _)) => &bytes[..=end],
        None => bytes,
    }
}

/// Strictly decode `bytes`; malformed input is `None`
pub(crate) fn decode_strict(bytes: &[u8], encoding: &'static Encoding) -> Option<String> {
    let bytes = if encoding == UTF_8 { strip_bom(bytes) } else { bytes };
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
}

/// Locate the header row of a text report on disk
pub fn locate_header(path: &Path, config: &AnalyzerConfig) -> Result<Option<HeaderLocation>, IngestError> {
    let bytes = read_bytes(path)?;
    Ok(locate_header_in(&bytes, config))
}

/// Locate the header row in an in-memory report
pub fn locate_header_in(bytes: &[u8], config: &AnalyzerConfig) -> Option<HeaderLocation> {
    let prefix = line_prefix(bytes, config.header_scan_lines);
    let tokens = config.labels.header_tokens();

    for label in &config.encodings {
        let Some(encoding) = resolve_encoding(label) else {
            tracing::warn!(encoding = %label, "unknown encoding label in configuration");
            continue;
        };
        let Some(text) = decode_strict(prefix, encoding) else {
            tracing::trace!(encoding = encoding.name(), "prefix does not decode");
            continue;
        };

        let lines: Vec<&str> = text.lines().collect();
        let captured_at = find_timestamp(&lines, config);

        if let Some(line_index) = lines
            .iter()
            .position(|line| tokens.iter().all(|token| line.contains(token)))
        {
            return Some(HeaderLocation {
                line_index,
                encoding,
                captured_at,
            });
        }
    }

    None
}

/// The timestamp is the second comma-separated field of the marker line
fn find_timestamp(lines: &[&str], config: &AnalyzerConfig) -> Option<NaiveDateTime> {
    let marker = config.labels.timestamp_marker.as_str();
    let line = lines
        .iter()
        .take(config.timestamp_scan_lines)
        .find(|line| line.contains(marker))?;
    let field = line.split(',').nth(1)?;
    parse_capture_timestamp(field.trim().trim_matches('"'))
}
