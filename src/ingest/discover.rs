//! Expansion of command-line inputs into report files

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use super::{io_error, IngestError, SourceKind};
use crate::core::natural_cmp;

/// What to do when a text export and a document share a file stem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateStrategy {
    /// Keep the text export (exact values, no layout reconstruction)
    #[default]
    #[value(name = "csv")]
    PreferCsv,
    /// Keep the document
    #[value(name = "pdf")]
    PreferPdf,
    /// Keep both
    All,
}

impl std::fmt::Display for DuplicateStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DuplicateStrategy::PreferCsv => write!(f, "csv"),
            DuplicateStrategy::PreferPdf => write!(f, "pdf"),
            DuplicateStrategy::All => write!(f, "all"),
        }
    }
}

/// Result of expanding the command-line inputs
#[derive(Debug, Default)]
pub struct Discovery {
    /// Reports to load, in order
    pub reports: Vec<PathBuf>,
    /// Inputs that could not be read; the rest of the batch still loads
    pub unreadable: Vec<(PathBuf, IngestError)>,
}

/// Expand files and directories into the ordered list of reports to load.
///
/// Files are kept as given. Directories contribute their `.csv` and `.pdf`
/// files in natural name order, descending into subdirectories only with
/// `recursive`. The duplicate strategy is applied to reports sharing a
/// directory and stem. An input that cannot be read is recorded and skipped.
pub fn discover_reports(inputs: &[PathBuf], recursive: bool, strategy: DuplicateStrategy) -> Discovery {
    let mut found = Vec::new();
    let mut seen = HashSet::new();
    let mut unreadable = Vec::new();

    for input in inputs {
        let meta = match std::fs::metadata(input) {
            Ok(meta) => meta,
            Err(e) => {
                let error = io_error(input, e);
                tracing::warn!(path = %input.display(), error = %error, "skipped input");
                unreadable.push((input.clone(), error));
                continue;
            }
        };
        let candidates = if meta.is_dir() {
            scan_dir(input, recursive)
        } else {
            vec![input.clone()]
        };
        for path in candidates {
            if seen.insert(path.clone()) {
                found.push(path);
            }
        }
    }

    Discovery {
        reports: apply_strategy(found, strategy),
        unreadable,
    }
}

fn scan_dir(dir: &Path, recursive: bool) -> Vec<PathBuf> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| SourceKind::from_path(e.path()).is_some())
        .map(|e| e.into_path())
        .collect();

    files.sort_by(|a, b| natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()));
    files
}

fn apply_strategy(paths: Vec<PathBuf>, strategy: DuplicateStrategy) -> Vec<PathBuf> {
    let drop_kind = match strategy {
        DuplicateStrategy::PreferCsv => SourceKind::Document,
        DuplicateStrategy::PreferPdf => SourceKind::Tabular,
        DuplicateStrategy::All => return paths,
    };

    let stem_key = |path: &Path| (path.parent().map(Path::to_path_buf), path.file_stem().map(|s| s.to_os_string()));

    let mut kinds: HashMap<_, HashSet<SourceKind>> = HashMap::new();
    for path in &paths {
        if let Some(kind) = SourceKind::from_path(path) {
            kinds.entry(stem_key(path)).or_default().insert(kind);
        }
    }

    paths
        .into_iter()
        .filter(|path| {
            let Some(kind) = SourceKind::from_path(path) else {
                return true;
            };
            let shared = kinds.get(&stem_key(path)).is_some_and(|k| k.len() > 1);
            if shared && kind == drop_kind {
                tracing::info!(file = %path.display(), %strategy, "skipped duplicate report");
                return false;
            }
            true
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    fn setup() -> tempfile::TempDir {
        let tmp = tempdir().unwrap();
        for name in ["r10.csv", "r2.csv", "r2.pdf", "r3.pdf", "notes.txt"] {
            fs::write(tmp.path().join(name), "").unwrap();
        }
        fs::create_dir(tmp.path().join("nested")).unwrap();
        fs::write(tmp.path().join("nested/r4.csv"), "").unwrap();
        tmp
    }

    #[test]
    fn test_directory_prefers_csv_by_default() {
        let tmp = setup();
        let found = discover_reports(&[tmp.path().to_path_buf()], false, DuplicateStrategy::default()).reports;
        assert_eq!(names(&found), vec!["r2.csv", "r3.pdf", "r10.csv"]);
    }

    #[test]
    fn test_prefer_pdf_and_all() {
        let tmp = setup();
        let dir = [tmp.path().to_path_buf()];
        assert_eq!(
            names(&discover_reports(&dir, false, DuplicateStrategy::PreferPdf).reports),
            vec!["r2.pdf", "r3.pdf", "r10.csv"]
        );
        assert_eq!(
            names(&discover_reports(&dir, false, DuplicateStrategy::All).reports),
            vec!["r2.csv", "r2.pdf", "r3.pdf", "r10.csv"]
        );
    }

    #[test]
    fn test_recursive_includes_nested() {
        let tmp = setup();
        let found = discover_reports(&[tmp.path().to_path_buf()], true, DuplicateStrategy::All).reports;
        assert!(names(&found).contains(&"r4.csv".to_string()));
    }

    #[test]
    fn test_files_kept_once() {
        let tmp = setup();
        let file = tmp.path().join("r3.pdf");
        let found = discover_reports(&[file.clone(), file], false, DuplicateStrategy::default()).reports;
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_missing_input_is_skipped() {
        let tmp = setup();
        let missing = tmp.path().join("nope.csv");
        let found = discover_reports(
            &[missing.clone(), tmp.path().join("r3.pdf")],
            false,
            DuplicateStrategy::default(),
        );
        assert_eq!(names(&found.reports), vec!["r3.pdf"]);
        assert_eq!(found.unreadable.len(), 1);
        assert_eq!(found.unreadable[0].0, missing);
        assert!(matches!(found.unreadable[0].1, IngestError::Io { .. }));
    }
}
