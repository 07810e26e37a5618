//! Paginated report adapter on top of `oxidize-pdf`

use oxidize_pdf::parser::{ParseError, PdfDocument, PdfReader};
use oxidize_pdf::text::{ExtractionOptions, TextExtractor};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use super::document::{extract_records, PageText, TextToken};
use super::{io_error, IngestError, SourceRecords};
use crate::core::AnalyzerConfig;

/// Read the raw records of a paginated report. `Ok(None)` when the document
/// parses but no line matches the record grammar.
pub fn read_document(path: &Path, config: &AnalyzerConfig) -> Result<Option<SourceRecords>, IngestError> {
    let file = File::open(path).map_err(|e| io_error(path, e))?;
    let pages = read_pages(BufReader::new(file)).map_err(|e| match e {
        ParseError::Io(io) => io_error(path, io),
        other => IngestError::Document {
            path: path.to_path_buf(),
            message: other.to_string(),
        },
    })?;

    tracing::debug!(file = %path.display(), pages = pages.len(), "extracted document text");
    Ok(extract_records(&pages, config))
}

/// Positioned text of every page, with `top` measured from the top edge
fn read_pages<R: Read + Seek>(source: R) -> Result<Vec<PageText>, ParseError> {
    let reader = PdfReader::new(source)?;
    let document = PdfDocument::new(reader);
    let mut extractor = TextExtractor::with_options(ExtractionOptions {
        preserve_layout: true,
        ..Default::default()
    });

    let page_count = document.page_count()?;
    let mut pages = Vec::with_capacity(page_count as usize);
    for index in 0..page_count {
        let page = document.get_page(index)?;
        let (width, height) = (page.width(), page.height());
        let extracted = extractor.extract_from_page(&document, index)?;

        // Fragment y is the baseline in bottom-up page space
        let tokens = extracted
            .fragments
            .into_iter()
            .filter(|f| !f.text.trim().is_empty())
            .map(|f| TextToken::new(f.x, height - (f.y + f.height), f.text.trim()))
            .collect();

        pages.push(PageText { width, height, tokens });
    }
    Ok(pages)
}
