//! Record keeping: settle worked-on tasks, journal them, archive finished ones.
//!
//! The pass is split in two. [`partition`] is a pure walk over the document
//! lines that decides where each task group goes. [`RecordKeeper`] does the
//! I/O around it in a fixed order: journal, archive, then the document itself,
//! so the live file is only rewritten once both logs hold their entries.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Settings;
use crate::grammar::{
    convert_active_to_touched, is_active, is_completed, is_task_detail, is_touched,
};
use crate::history::{format_timestamp, prepend_entries, DocumentStore, HistoryError, HistoryPaths};

#[derive(Debug, Error)]
pub enum RecordKeepError {
    #[error("File '{0}' does not exist")]
    NotFound(PathBuf),
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: HistoryError,
    },
    #[error("Failed to write journal entries to '{path}': {source}")]
    Journal {
        path: PathBuf,
        #[source]
        source: HistoryError,
    },
    #[error("Failed to write archive entries to '{path}': {source}; '{document}' was left unchanged")]
    Archive {
        path: PathBuf,
        document: PathBuf,
        #[source]
        source: HistoryError,
    },
    #[error("History file '{history}' would overwrite the task document '{document}'")]
    HistoryCollision { document: PathBuf, history: PathBuf },
    #[error("Journal and archive were updated but '{path}' could not be rewritten: {source}")]
    SourceWrite {
        path: PathBuf,
        #[source]
        source: HistoryError,
    },
}

/// Where a top-level line and its trailing detail lines end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    /// Touched or active. Completed ones leave the document for the archive too.
    Journal { completed: bool },
    Archive,
    Keep,
}

impl Route {
    fn of(line: &str) -> Route {
        if is_touched(line) || is_active(line) {
            Route::Journal {
                completed: is_completed(line),
            }
        } else if is_completed(line) {
            Route::Archive
        } else {
            Route::Keep
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    pub kept: Vec<String>,
    pub journal: Vec<String>,
    pub archive: Vec<String>,
}

/// Index one past the run of detail lines starting at `start`.
fn details_end<S: AsRef<str>>(lines: &[S], start: usize) -> usize {
    lines[start..]
        .iter()
        .position(|line| !is_task_detail(line.as_ref()))
        .map(|offset| start + offset)
        .unwrap_or(lines.len())
}

fn stamped(timestamp: &str, line: &str) -> String {
    format!("{timestamp} {line}")
}

impl Partition {
    /// Route the group starting at `index` and return where the next group starts.
    fn step<S: AsRef<str>>(&mut self, lines: &[S], index: usize, timestamp: &str) -> usize {
        let line = lines[index].as_ref();
        let route = Route::of(line);
        let end = match route {
            Route::Keep => {
                self.kept.push(line.to_string());
                return index + 1;
            }
            Route::Journal { completed } => {
                self.journal.push(stamped(timestamp, line));
                if completed {
                    self.archive.push(stamped(timestamp, line));
                } else {
                    self.kept.push(convert_active_to_touched(line));
                }
                let end = details_end(lines, index + 1);
                for detail in &lines[index + 1..end] {
                    let detail = detail.as_ref();
                    self.journal.push(detail.to_string());
                    if !completed {
                        self.kept.push(detail.to_string());
                    }
                }
                end
            }
            Route::Archive => {
                self.archive.push(stamped(timestamp, line));
                let end = details_end(lines, index + 1);
                for detail in &lines[index + 1..end] {
                    self.archive.push(stamped(timestamp, detail.as_ref()));
                }
                end
            }
        };
        debug!(line = index + 1, ?route, details = end - index - 1, "routed task group");
        end
    }
}

/// Split document lines into kept, journaled and archived groups.
pub fn partition<S: AsRef<str>>(lines: &[S], timestamp: &str) -> Partition {
    let mut out = Partition::default();
    let mut index = 0;
    while index < lines.len() {
        index = out.step(lines, index, timestamp);
    }
    out
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordKeepReport {
    pub document: PathBuf,
    pub journal_path: PathBuf,
    pub archive_path: PathBuf,
    pub journal_entries: usize,
    pub archive_entries: usize,
    pub kept_lines: usize,
}

pub struct RecordKeeper<S> {
    store: S,
    journal_suffix: String,
    archive_suffix: String,
}

impl<S: DocumentStore> RecordKeeper<S> {
    pub fn new(store: S, settings: &Settings) -> Self {
        Self {
            store,
            journal_suffix: settings.journal_suffix.clone(),
            archive_suffix: settings.archive_suffix.clone(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn history_paths(&self, document: &Path) -> HistoryPaths {
        HistoryPaths::derive(document, &self.journal_suffix, &self.archive_suffix)
    }

    pub fn run(&self, document: &Path) -> Result<RecordKeepReport, RecordKeepError> {
        self.run_at(document, Utc::now())
    }

    pub fn run_at(
        &self,
        document: &Path,
        now: DateTime<Utc>,
    ) -> Result<RecordKeepReport, RecordKeepError> {
        let paths = self.history_paths(document);
        for history in [&paths.journal, &paths.archive] {
            if history.as_path() == document {
                return Err(RecordKeepError::HistoryCollision {
                    document: document.to_path_buf(),
                    history: history.clone(),
                });
            }
        }

        let content = self
            .store
            .read_text(document)
            .map_err(|source| RecordKeepError::Read {
                path: document.to_path_buf(),
                source,
            })?
            .ok_or_else(|| RecordKeepError::NotFound(document.to_path_buf()))?;

        let lines: Vec<&str> = content.split('\n').collect();
        let partition = partition(&lines, &format_timestamp(now));

        prepend_entries(&self.store, &paths.journal, &partition.journal).map_err(|source| {
            RecordKeepError::Journal {
                path: paths.journal.clone(),
                source,
            }
        })?;
        prepend_entries(&self.store, &paths.archive, &partition.archive).map_err(|source| {
            RecordKeepError::Archive {
                path: paths.archive.clone(),
                document: document.to_path_buf(),
                source,
            }
        })?;
        self.store
            .write_text(document, &partition.kept.join("\n"))
            .map_err(|source| RecordKeepError::SourceWrite {
                path: document.to_path_buf(),
                source,
            })?;

        info!(
            document = %document.display(),
            journaled = partition.journal.len(),
            archived = partition.archive.len(),
            "record keeping complete"
        );
        Ok(RecordKeepReport {
            document: document.to_path_buf(),
            journal_path: paths.journal,
            archive_path: paths.archive,
            journal_entries: partition.journal.len(),
            archive_entries: partition.archive.len(),
            kept_lines: partition.kept.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::collections::HashMap;

    const TS: &str = "[2024-01-02 03:04:05 UTC]";

    fn lines(text: &str) -> Vec<&str> {
        text.split('\n').collect()
    }

    #[test]
    fn scenario_settles_journals_and_archives() {
        let doc = lines("- [W] 1 worked\n  - 1 sub detail\n- [x] 2 completed\n- [ ] 3 open");
        let out = partition(&doc, TS);
        assert_eq!(
            out.journal,
            vec![format!("{TS} - [W] 1 worked"), "  - 1 sub detail".to_string()]
        );
        assert_eq!(out.archive, vec![format!("{TS} - [x] 2 completed")]);
        assert_eq!(
            out.kept,
            vec!["- [w] 1 worked", "  - 1 sub detail", "- [ ] 3 open"]
        );
    }

    #[test]
    fn touched_and_completed_goes_to_both_logs() {
        let doc = lines("- [X] 8 done today\n  - note\n- [ ] next");
        let out = partition(&doc, TS);
        assert_eq!(
            out.journal,
            vec![format!("{TS} - [X] 8 done today"), "  - note".to_string()]
        );
        assert_eq!(out.archive, vec![format!("{TS} - [X] 8 done today")]);
        assert_eq!(out.kept, vec!["- [ ] next"]);
    }

    #[test]
    fn details_follow_a_touched_parent_in_order() {
        let doc = lines("- [B] blocked\n  - first\n\t- second\nplain after");
        let out = partition(&doc, TS);
        assert_eq!(
            out.kept,
            vec!["- [b] blocked", "  - first", "\t- second", "plain after"]
        );
        assert_eq!(out.journal.len(), 3);
        assert!(out.archive.is_empty());
    }

    #[test]
    fn completed_details_are_archived_with_timestamp() {
        let doc = lines("- [x] shipped\n  - changelog\n  - [ ] leftover\n## Next");
        let out = partition(&doc, TS);
        assert_eq!(
            out.archive,
            vec![
                format!("{TS} - [x] shipped"),
                format!("{TS}   - changelog"),
                format!("{TS}   - [ ] leftover"),
            ]
        );
        assert!(out.journal.is_empty());
        assert_eq!(out.kept, vec!["## Next"]);
    }

    #[test]
    fn active_open_task_keeps_marker() {
        let doc = lines("- [ ] !! A1 call bank\n- [w] !! B2 review");
        let out = partition(&doc, TS);
        assert_eq!(out.kept, vec!["- [ ] !! A1 call bank", "- [w] !! B2 review"]);
        assert_eq!(out.journal.len(), 2);
    }

    #[test]
    fn completed_active_task_is_journaled_and_archived() {
        let doc = lines("- [x] !! done\n  - note\n- [ ] next");
        let out = partition(&doc, TS);
        assert_eq!(
            out.journal,
            vec![format!("{TS} - [x] !! done"), "  - note".to_string()]
        );
        assert_eq!(out.archive, vec![format!("{TS} - [x] !! done")]);
        assert_eq!(out.kept, vec!["- [ ] next"]);
    }

    #[test]
    fn untouched_lines_pass_through() {
        let doc = lines("# Title\n\n- [ ] open\n  - detail of open\n- bullet\n  - sub bullet\n");
        let out = partition(&doc, TS);
        assert_eq!(out.kept, doc);
        assert!(out.journal.is_empty());
        assert!(out.archive.is_empty());
    }

    #[test]
    fn indented_subtasks_ride_along_unchanged() {
        let doc = lines("- [W] parent\n  - [x] child done\n  - [W] child worked\n- [b] sibling");
        let out = partition(&doc, TS);
        assert_eq!(
            out.kept,
            vec!["- [w] parent", "  - [x] child done", "  - [W] child worked", "- [b] sibling"]
        );
        assert!(out.archive.is_empty());
    }

    #[test]
    fn settled_output_is_stable_on_rerun() {
        let doc = lines("- [W] one\n  - d\n- [x] two\n- [ ] three");
        let first = partition(&doc, TS);
        let second = partition(&first.kept, TS);
        assert_eq!(second.kept, first.kept);
        assert!(second.journal.is_empty());
        assert!(second.archive.is_empty());
    }

    #[derive(Default)]
    struct MemoryStore {
        files: RefCell<HashMap<PathBuf, String>>,
        fail_suffix: Option<&'static str>,
    }

    impl MemoryStore {
        fn with(path: &str, text: &str) -> Self {
            let store = Self::default();
            store
                .files
                .borrow_mut()
                .insert(PathBuf::from(path), text.to_string());
            store
        }

        fn get(&self, path: &str) -> Option<String> {
            self.files.borrow().get(Path::new(path)).cloned()
        }
    }

    impl DocumentStore for MemoryStore {
        fn read_text(&self, path: &Path) -> Result<Option<String>, HistoryError> {
            Ok(self.files.borrow().get(path).cloned())
        }

        fn write_text(&self, path: &Path, text: &str) -> Result<(), HistoryError> {
            if let Some(suffix) = self.fail_suffix {
                if path.to_string_lossy().ends_with(suffix) {
                    return Err(HistoryError::Write {
                        path: path.to_path_buf(),
                        source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                    });
                }
            }
            self.files
                .borrow_mut()
                .insert(path.to_path_buf(), text.to_string());
            Ok(())
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        use chrono::TimeZone;
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
    }

    #[test]
    fn run_writes_history_then_document() {
        let store = MemoryStore::with("/t/todo.md", "- [W] a\n- [x] b\n");
        store
            .files
            .borrow_mut()
            .insert(PathBuf::from("/t/todo.xarchive.md"), "OLD\n".to_string());
        let keeper = RecordKeeper::new(store, &Settings::default());

        let report = keeper.run_at(Path::new("/t/todo.md"), fixed_now()).expect("run");
        assert_eq!(report.journal_entries, 1);
        assert_eq!(report.archive_entries, 1);
        assert_eq!(report.kept_lines, 2);

        let store = keeper.store();
        assert_eq!(store.get("/t/todo.md").as_deref(), Some("- [w] a\n"));
        assert_eq!(
            store.get("/t/todo.xjournal.md").as_deref(),
            Some(format!("{TS} - [W] a\n").as_str())
        );
        assert_eq!(
            store.get("/t/todo.xarchive.md").as_deref(),
            Some(format!("{TS} - [x] b\nOLD\n").as_str())
        );
    }

    #[test]
    fn nothing_to_record_leaves_history_absent() {
        let keeper = RecordKeeper::new(
            MemoryStore::with("/t/todo.md", "- [ ] a"),
            &Settings::default(),
        );
        keeper.run_at(Path::new("/t/todo.md"), fixed_now()).expect("run");
        assert!(keeper.store().get("/t/todo.xjournal.md").is_none());
        assert!(keeper.store().get("/t/todo.xarchive.md").is_none());
    }

    #[test]
    fn archive_failure_keeps_document_untouched() {
        let mut store = MemoryStore::with("/t/todo.md", "- [W] a\n- [x] b");
        store.fail_suffix = Some(".xarchive.md");
        let keeper = RecordKeeper::new(store, &Settings::default());

        let err = keeper
            .run_at(Path::new("/t/todo.md"), fixed_now())
            .expect_err("archive fails");
        assert!(matches!(err, RecordKeepError::Archive { .. }));
        assert_eq!(
            keeper.store().get("/t/todo.md").as_deref(),
            Some("- [W] a\n- [x] b")
        );
        assert!(keeper.store().get("/t/todo.xjournal.md").is_some());
    }

    #[test]
    fn journal_failure_stops_before_archive() {
        let mut store = MemoryStore::with("/t/todo.md", "- [W] a\n- [x] b");
        store.fail_suffix = Some(".xjournal.md");
        let keeper = RecordKeeper::new(store, &Settings::default());

        let err = keeper
            .run_at(Path::new("/t/todo.md"), fixed_now())
            .expect_err("journal fails");
        assert!(matches!(err, RecordKeepError::Journal { .. }));
        assert!(keeper.store().get("/t/todo.xarchive.md").is_none());
    }

    #[test]
    fn source_failure_is_reported_distinctly() {
        let mut store = MemoryStore::with("/t/todo.md", "- [x] b");
        store.fail_suffix = Some("todo.md");
        let keeper = RecordKeeper::new(store, &Settings::default());

        let err = keeper
            .run_at(Path::new("/t/todo.md"), fixed_now())
            .expect_err("source fails");
        assert!(matches!(err, RecordKeepError::SourceWrite { .. }));
        assert!(err.to_string().contains("Journal and archive were updated"));
        assert!(keeper.store().get("/t/todo.xarchive.md").is_some());
    }

    #[test]
    fn missing_document_is_not_found() {
        let keeper = RecordKeeper::new(MemoryStore::default(), &Settings::default());
        let err = keeper
            .run_at(Path::new("/t/missing.md"), fixed_now())
            .expect_err("missing");
        assert!(matches!(err, RecordKeepError::NotFound(_)));
        assert!(keeper.store().files.borrow().is_empty());
    }

    #[test]
    fn custom_suffixes_drive_history_paths() {
        let settings = Settings {
            journal_suffix: ".log.md".to_string(),
            archive_suffix: ".done.md".to_string(),
            ..Settings::default()
        };
        let keeper = RecordKeeper::new(MemoryStore::default(), &settings);
        let paths = keeper.history_paths(Path::new("/t/todo.md"));
        assert_eq!(paths.journal, PathBuf::from("/t/todo.log.md"));
        assert_eq!(paths.archive, PathBuf::from("/t/todo.done.md"));
    }

    #[test]
    fn history_path_equal_to_document_is_refused_before_writing() {
        let original = "- [X] done today\n  - only record of this note\n- [ ] open\n";
        let settings = Settings {
            journal_suffix: ".md".to_string(),
            ..Settings::default()
        };
        let keeper = RecordKeeper::new(MemoryStore::with("/t/todo.md", original), &settings);

        let err = keeper
            .run_at(Path::new("/t/todo.md"), fixed_now())
            .expect_err("journal path is the document");
        match err {
            RecordKeepError::HistoryCollision { document, history } => {
                assert_eq!(document, PathBuf::from("/t/todo.md"));
                assert_eq!(history, PathBuf::from("/t/todo.md"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let store = keeper.store();
        assert_eq!(store.get("/t/todo.md").as_deref(), Some(original));
        assert_eq!(store.files.borrow().len(), 1);
    }
}
