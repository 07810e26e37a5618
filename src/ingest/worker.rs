//! Background batch loading
//!
//! Reports are loaded one at a time on a dedicated thread. The caller sees a
//! progress event per file and exactly one terminal event carrying every
//! batch read so far, also after cancellation.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

use super::{load_file, source_names, RecordBatch};
use crate::core::AnalyzerConfig;
use crate::entities::MeasurementItem;

/// Event sent by the loader
#[derive(Debug)]
pub enum LoadEvent {
    /// About to process file `index` (1-based) of `total`
    Progress {
        index: usize,
        total: usize,
        file_name: String,
        status: String,
    },
    /// Terminal event
    Finished(LoadOutcome),
}

/// A report that could not be loaded
#[derive(Debug, Clone)]
pub struct LoadFailure {
    pub file_name: String,
    pub error: String,
}

/// Everything a batch load produced
#[derive(Debug, Clone, Default)]
pub struct LoadOutcome {
    pub batches: Vec<RecordBatch>,
    /// Source identities of the files that contributed at least one record
    pub loaded_files: BTreeSet<String>,
    pub failures: Vec<LoadFailure>,
    pub cancelled: bool,
}

impl LoadOutcome {
    /// All judged items in load order
    pub fn items(&self) -> impl Iterator<Item = &MeasurementItem> {
        self.batches.iter().flat_map(|b| b.items.iter())
    }

    /// Owned copy of all items, for the statistics engine
    pub fn into_items(self) -> Vec<MeasurementItem> {
        self.batches.into_iter().flat_map(|b| b.items).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.iter().all(|b| b.items.is_empty())
    }
}

/// Status line shown while a file is processed
fn status_line(path: &Path, file_name: &str) -> String {
    match std::fs::metadata(path) {
        Ok(meta) => format!("Processing: {} ({:.1}KB)", file_name, meta.len() as f64 / 1024.0),
        Err(_) => format!("Processing: {}", file_name),
    }
}

/// Load `paths` in order on the current thread.
///
/// `cancel` is checked before every file. Per-file failures are logged and
/// recorded; they never stop the batch.
pub fn load_batch(
    paths: &[PathBuf],
    config: &AnalyzerConfig,
    cancel: &AtomicBool,
    mut on_progress: impl FnMut(LoadEvent),
) -> LoadOutcome {
    let mut outcome = LoadOutcome::default();
    let total = paths.len();
    let sources = source_names(paths);

    for (i, (path, file_name)) in paths.iter().zip(sources).enumerate() {
        if cancel.load(Ordering::SeqCst) {
            tracing::info!(processed = i, total, "load cancelled");
            outcome.cancelled = true;
            break;
        }

        on_progress(LoadEvent::Progress {
            index: i + 1,
            total,
            status: status_line(path, &file_name),
            file_name: file_name.clone(),
        });

        match load_file(path, &file_name, config) {
            Ok(batch) => {
                outcome.loaded_files.insert(batch.source.clone());
                outcome.batches.push(batch);
            }
            Err(e) => {
                tracing::warn!(file = %file_name, error = %e, "skipped report");
                outcome.failures.push(LoadFailure {
                    file_name,
                    error: e.to_string(),
                });
            }
        }
    }

    outcome
}

/// Handle to a loader thread
pub struct LoaderHandle {
    pub events: mpsc::Receiver<LoadEvent>,
    cancel: Arc<AtomicBool>,
    thread: thread::JoinHandle<()>,
}

impl LoaderHandle {
    /// Ask the loader to stop at the next file boundary
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Drain events until the terminal one, forwarding progress.
    ///
    /// `None` when the loader thread died without finishing.
    pub fn wait(self, mut on_progress: impl FnMut(&LoadEvent)) -> Option<LoadOutcome> {
        let mut finished = None;
        for event in self.events.iter() {
            match event {
                LoadEvent::Finished(outcome) => {
                    finished = Some(outcome);
                    break;
                }
                progress => on_progress(&progress),
            }
        }
        if self.thread.join().is_err() {
            tracing::error!("loader thread panicked");
        }
        finished
    }
}

/// Start loading `paths` on a background thread
pub fn spawn_loader(paths: Vec<PathBuf>, config: AnalyzerConfig) -> LoaderHandle {
    let (sender, receiver) = mpsc::channel();
    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_clone = Arc::clone(&cancel);

    let thread = thread::spawn(move || {
        let progress_sender = sender.clone();
        let outcome = load_batch(&paths, &config, &cancel_clone, |event| {
            // A dropped receiver only means nobody is listening anymore
            let _ = progress_sender.send(event);
        });
        let _ = sender.send(LoadEvent::Finished(outcome));
    });

    LoaderHandle {
        events: receiver,
        cancel,
        thread,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const REPORT: &str = "No,測量專案,實測值,設計值,上限公差,下限公差\n1,Length,10.05,10,0.1,-0.1\n";

    fn write_reports(dir: &Path, names: &[&str]) -> Vec<PathBuf> {
        names
            .iter()
            .map(|name| {
                let path = dir.join(name);
                fs::write(&path, REPORT).unwrap();
                path
            })
            .collect()
    }

    #[test]
    fn test_load_batch_reports_progress_and_skips_failures() {
        let tmp = tempdir().unwrap();
        let mut paths = write_reports(tmp.path(), &["a.csv", "b.csv"]);
        let broken = tmp.path().join("broken.csv");
        fs::write(&broken, "nothing here\n").unwrap();
        paths.insert(1, broken);

        let mut statuses = Vec::new();
        let outcome = load_batch(&paths, &AnalyzerConfig::default(), &AtomicBool::new(false), |event| {
            if let LoadEvent::Progress { index, total, status, .. } = event {
                statuses.push((index, total, status));
            }
        });

        assert_eq!(statuses.len(), 3);
        assert_eq!(statuses[0].0, 1);
        assert_eq!(statuses[2].1, 3);
        assert!(statuses[0].2.starts_with("Processing: a.csv ("));
        assert!(statuses[0].2.ends_with("KB)"));

        assert_eq!(outcome.batches.len(), 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].file_name, "broken.csv");
        assert_eq!(
            outcome.loaded_files.iter().cloned().collect::<Vec<_>>(),
            vec!["a.csv".to_string(), "b.csv".to_string()]
        );
        assert!(!outcome.cancelled);
    }

    #[test]
    fn test_cancel_before_start_yields_empty_outcome() {
        let tmp = tempdir().unwrap();
        let paths = write_reports(tmp.path(), &["a.csv"]);
        let outcome = load_batch(&paths, &AnalyzerConfig::default(), &AtomicBool::new(true), |_| {});
        assert!(outcome.cancelled);
        assert!(outcome.batches.is_empty());
    }

    #[test]
    fn test_cancel_mid_batch_keeps_accumulated_batches() {
        let tmp = tempdir().unwrap();
        let paths = write_reports(tmp.path(), &["a.csv", "b.csv", "c.csv"]);
        let cancel = AtomicBool::new(false);
        let outcome = load_batch(&paths, &AnalyzerConfig::default(), &cancel, |event| {
            if let LoadEvent::Progress { index: 2, .. } = event {
                cancel.store(true, Ordering::SeqCst);
            }
        });
        // b.csv was already announced, so it still completes
        assert!(outcome.cancelled);
        assert_eq!(outcome.batches.len(), 2);
    }

    #[test]
    fn test_same_named_reports_in_different_directories_stay_distinct() {
        use crate::ingest::{discover_reports, DuplicateStrategy};
        use crate::stats::{analyze, AnalysisOptions, RowKind};

        let tmp = tempdir().unwrap();
        let report = "No,測量專案,實測值,設計值,上限公差,下限公差\n\
                      1,L,10.5,10,0.1,-0.1\n\
                      2,P[X座標],10.01,10,0.05,-0.05\n\
                      3,P[Y座標],20.01,20,0.05,-0.05\n";
        for lot in ["lot1", "lot2"] {
            fs::create_dir(tmp.path().join(lot)).unwrap();
            fs::write(tmp.path().join(lot).join("part.csv"), report).unwrap();
        }

        let discovery = discover_reports(&[tmp.path().to_path_buf()], true, DuplicateStrategy::default());
        assert_eq!(discovery.reports.len(), 2);
        let outcome = load_batch(&discovery.reports, &AnalyzerConfig::default(), &AtomicBool::new(false), |_| {});
        assert_eq!(outcome.loaded_files.len(), 2);

        let items = outcome.items().cloned().collect::<Vec<_>>();
        let analysis = analyze(&items, &outcome.loaded_files, &AnalysisOptions::default());
        let scalar = analysis.rows.iter().find(|r| r.kind == RowKind::Scalar).unwrap();
        assert_eq!(scalar.fail_count, 2);
        assert_eq!(scalar.fail_rate, 100.0);
        let radial = analysis.rows.iter().find(|r| r.kind == RowKind::Radial).unwrap();
        assert_eq!(radial.count, 2);
    }

    #[test]
    fn test_spawned_loader_sends_terminal_event() {
        let tmp = tempdir().unwrap();
        let paths = write_reports(tmp.path(), &["a.csv", "b.csv"]);
        let handle = spawn_loader(paths, AnalyzerConfig::default());

        let mut progress = 0;
        let outcome = handle.wait(|_| progress += 1).unwrap();
        assert_eq!(progress, 2);
        assert_eq!(outcome.loaded_files.len(), 2);
        assert_eq!(outcome.items().count(), 2);
    }

    #[test]
    fn test_cancelled_loader_stops_early() {
        let tmp = tempdir().unwrap();
        let names: Vec<String> = (0..200).map(|i| format!("r{i}.csv")).collect();
        let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let paths = write_reports(tmp.path(), &name_refs);
        let handle = spawn_loader(paths, AnalyzerConfig::default());

        let first = handle.events.recv().unwrap();
        assert!(matches!(first, LoadEvent::Progress { index: 1, .. }));
        handle.cancel();

        let outcome = handle.wait(|_| {}).unwrap();
        assert!(outcome.cancelled);
        assert!(!outcome.batches.is_empty());
        assert!(outcome.batches.len() < 200);
    }
}
