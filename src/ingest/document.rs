//! Position-clustering text reconstruction for paginated reports
//!
//! Document pages only carry positioned text fragments; table rows have to be
//! rebuilt from their vertical positions before the fixed record grammar can
//! be applied. The extractor here works on plain [`TextToken`]s so it does not
//! depend on any particular document backend.

use chrono::NaiveDateTime;
use regex::Regex;

use super::SourceRecords;
use crate::core::timestamp::{embedded_timestamp_pattern, parse_capture_timestamp};
use crate::core::{AnalyzerConfig, ColumnLabels};
use crate::entities::{OriginalJudgement, RawRecord};

/// One positioned text fragment of a page
#[derive(Debug, Clone, PartialEq)]
pub struct TextToken {
    /// Left edge
    pub x: f64,
    /// Distance of the top edge from the top of the page
    pub top: f64,
    pub text: String,
}

impl TextToken {
    pub fn new(x: f64, top: f64, text: impl Into<String>) -> Self {
        Self {
            x,
            top,
            text: text.into(),
        }
    }
}

/// The tokens of one page
#[derive(Debug, Clone, Default)]
pub struct PageText {
    pub width: f64,
    pub height: f64,
    pub tokens: Vec<TextToken>,
}

struct Row<'a> {
    anchor: f64,
    tokens: Vec<&'a TextToken>,
}

/// Rebuild the text lines of a page.
///
/// Tokens outside the page box are dropped. A token joins the first row, in
/// creation order, whose anchor is within `y_tolerance` of its `top`;
/// otherwise it opens a new row anchored at its own `top`.
pub fn cluster_lines(tokens: &[TextToken], page_width: f64, page_height: f64, y_tolerance: f64) -> Vec<String> {
    let mut rows: Vec<Row<'_>> = Vec::new();

    let inside = tokens
        .iter()
        .filter(|t| (0.0..=page_width).contains(&t.x) && (0.0..=page_height).contains(&t.top));

    for token in inside {
        match rows.iter_mut().find(|row| (token.top - row.anchor).abs() <= y_tolerance) {
            Some(row) => row.tokens.push(token),
            None => rows.push(Row {
                anchor: token.top,
                tokens: vec![token],
            }),
        }
    }

    rows.sort_by(|a, b| a.anchor.total_cmp(&b.anchor));
    rows.into_iter()
        .map(|mut row| {
            row.tokens.sort_by(|a, b| a.x.total_cmp(&b.x));
            row.tokens
                .iter()
                .map(|t| t.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

/// One record line of a document
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRow {
    pub no: String,
    pub project: String,
    pub measured: f64,
    pub unit: String,
    pub design: f64,
    pub upper: f64,
    pub lower: f64,
    pub judgement: OriginalJudgement,
}

impl From<DocumentRow> for RawRecord {
    fn from(row: DocumentRow) -> Self {
        RawRecord {
            no: row.no,
            project: row.project,
            measured: Some(row.measured),
            design: Some(row.design),
            upper: Some(row.upper),
            lower: Some(row.lower),
            unit: Some(row.unit),
            original: Some(row.judgement),
        }
    }
}

/// The fixed record line grammar:
/// `No label measured unit design upper lower judgement`
pub struct RecordGrammar {
    pattern: Regex,
    skip_markers: Vec<String>,
}

const NUMBER: &str = r"[-+]?\d+(?:\.\d+)?";

impl RecordGrammar {
    pub fn new(labels: &ColumnLabels) -> Self {
        let pattern = format!(
            r"^\s*(?P<no>\d+)\s+(?P<proj>[^\r\n]+?)\s+(?P<val>{n})\s+(?P<unit>mm|um|μm)\s+(?P<design>{n})\s+(?P<up>{n})\s+(?P<low>{n})\s+(?P<judge>OK|NG|---|Warning)",
            n = NUMBER
        );
        Self {
            pattern: Regex::new(&pattern).expect("valid record grammar"),
            skip_markers: labels.document_skip_markers.clone(),
        }
    }

    /// Parse one reconstructed line. Title lines and anything else that does
    /// not match are `None`.
    pub fn parse_line(&self, line: &str) -> Option<DocumentRow> {
        if self.skip_markers.iter().any(|m| line.contains(m.as_str())) {
            return None;
        }
        let caps = self.pattern.captures(line)?;
        let number = |name: &str| caps.name(name)?.as_str().trim_start_matches('+').parse::<f64>().ok();

        Some(DocumentRow {
            no: caps["no"].to_string(),
            project: caps["proj"].trim().to_string(),
            measured: number("val")?,
            unit: caps["unit"].to_string(),
            design: number("design")?,
            upper: number("up")?,
            lower: number("low")?,
            judgement: OriginalJudgement::parse(&caps["judge"])?,
        })
    }
}

/// Find the capture timestamp among the lines of the first page
pub fn find_timestamp(lines: &[String], marker: &str) -> Option<NaiveDateTime> {
    let line = lines.iter().find(|line| line.contains(marker))?;
    let found = embedded_timestamp_pattern().find(line)?;
    parse_capture_timestamp(found.as_str())
}

/// Cluster every page and parse its record lines. `None` when no line matches.
pub fn extract_records(pages: &[PageText], config: &AnalyzerConfig) -> Option<SourceRecords> {
    let grammar = RecordGrammar::new(&config.labels);
    let mut records = Vec::new();
    let mut captured_at = None;

    for (index, page) in pages.iter().enumerate() {
        let lines = cluster_lines(&page.tokens, page.width, page.height, config.row_tolerance);
        if index == 0 {
            captured_at = find_timestamp(&lines, &config.labels.timestamp_marker);
        }
        records.extend(lines.iter().filter_map(|line| grammar.parse_line(line)).map(RawRecord::from));
    }

    if records.is_empty() {
        return None;
    }
    Some(SourceRecords { records, captured_at })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn grammar() -> RecordGrammar {
        RecordGrammar::new(&ColumnLabels::default())
    }

    #[test]
    fn test_tokens_within_tolerance_share_a_row() {
        let tokens = vec![
            TextToken::new(50.0, 100.0, "B"),
            TextToken::new(10.0, 102.5, "A"),
            TextToken::new(10.0, 120.0, "C"),
        ];
        assert_eq!(cluster_lines(&tokens, 600.0, 800.0, 3.0), vec!["A B", "C"]);
    }

    #[test]
    fn test_rows_sorted_by_anchor() {
        let tokens = vec![
            TextToken::new(10.0, 300.0, "last"),
            TextToken::new(10.0, 10.0, "first"),
            TextToken::new(10.0, 150.0, "middle"),
        ];
        assert_eq!(cluster_lines(&tokens, 600.0, 800.0, 3.0), vec!["first", "middle", "last"]);
    }

    #[test]
    fn test_first_matching_row_wins() {
        // 104 is within 3 of both anchors; it joins the row created first
        let tokens = vec![
            TextToken::new(0.0, 102.0, "a"),
            TextToken::new(0.0, 106.0, "b"),
            TextToken::new(5.0, 104.0, "c"),
        ];
        assert_eq!(cluster_lines(&tokens, 600.0, 800.0, 3.0), vec!["a c", "b"]);
    }

    #[test]
    fn test_tokens_outside_page_are_dropped() {
        let tokens = vec![
            TextToken::new(-1.0, 10.0, "left"),
            TextToken::new(700.0, 10.0, "right"),
            TextToken::new(10.0, 900.0, "below"),
            TextToken::new(10.0, 10.0, "kept"),
        ];
        assert_eq!(cluster_lines(&tokens, 600.0, 800.0, 3.0), vec!["kept"]);
    }

    #[test]
    fn test_parse_record_line() {
        let row = grammar()
            .parse_line("12 Hole Pos [X座標] 10.012 mm 10.000 0.050 -0.050 OK")
            .unwrap();
        assert_eq!(row.no, "12");
        assert_eq!(row.project, "Hole Pos [X座標]");
        assert_eq!(row.measured, 10.012);
        assert_eq!(row.unit, "mm");
        assert_eq!(row.upper, 0.05);
        assert_eq!(row.lower, -0.05);
        assert_eq!(row.judgement, OriginalJudgement::Ok);
    }

    #[test]
    fn test_parse_warning_and_micrometres() {
        let row = grammar().parse_line("3 Flatness 4.5 um 0 8 0 Warning").unwrap();
        assert_eq!(row.unit, "um");
        assert_eq!(row.judgement, OriginalJudgement::Warning);
    }

    #[test]
    fn test_skip_markers_and_noise() {
        let g = grammar();
        assert!(g.parse_line("No 測量專案 實測值 單位 設計值 上限公差 下限公差 判斷").is_none());
        assert!(g.parse_line("1 測量結果 1.0 mm 1.0 0.1 -0.1 OK").is_none());
        assert!(g.parse_line("Page 1 of 3").is_none());
        assert!(g.parse_line("1 Length 1.0 in 1.0 0.1 -0.1 OK").is_none());
    }

    #[test]
    fn test_extract_records_reads_timestamp_from_first_page() {
        let page = PageText {
            width: 600.0,
            height: 800.0,
            tokens: vec![
                TextToken::new(10.0, 20.0, "測量日期及時間"),
                TextToken::new(120.0, 21.0, "2023/01/01 下午 01:23:45"),
                TextToken::new(10.0, 60.0, "1"),
                TextToken::new(30.0, 60.0, "Length"),
                TextToken::new(100.0, 61.0, "10.05"),
                TextToken::new(140.0, 60.0, "mm"),
                TextToken::new(170.0, 60.0, "10"),
                TextToken::new(200.0, 60.0, "0.1"),
                TextToken::new(230.0, 60.0, "-0.1"),
                TextToken::new(260.0, 60.0, "OK"),
            ],
        };
        let records = extract_records(&[page], &AnalyzerConfig::default()).unwrap();
        assert_eq!(records.records.len(), 1);
        assert_eq!(records.records[0].measured, Some(10.05));
        assert_eq!(records.captured_at.unwrap().hour(), 13);
    }

    #[test]
    fn test_extract_records_without_rows_is_none() {
        let page = PageText {
            width: 600.0,
            height: 800.0,
            tokens: vec![TextToken::new(10.0, 20.0, "部件報告")],
        };
        assert!(extract_records(&[page], &AnalyzerConfig::default()).is_none());
    }
}
