use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

use crate::classify::{self, MediaCategory};
use crate::error::Error;
use crate::hasher::{self, Fingerprint};
use crate::naming;
use crate::progress::ProgressReporter;
use crate::scanner;
use crate::storage::{DuplicateIndex, IndexEntry, IndexError};
use crate::transfer;

#[derive(Debug, Clone)]
pub struct ProcessorOptions {
    /// Attempts per index operation while the store reports contention.
    pub lock_retry_attempts: u32,
    pub lock_retry_delay: Duration,
    /// Minimum time between two progress status lines.
    pub status_interval: Duration,
    /// Pause after a move before checking that the source is gone.
    pub settle_delay: Duration,
    pub verify_poll_attempts: u32,
    pub verify_poll_interval: Duration,
    /// Destination subfolder for files sitting directly in the source root.
    pub root_bucket: String,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            lock_retry_attempts: 5,
            lock_retry_delay: Duration::from_secs(1),
            status_interval: Duration::from_secs(10),
            settle_delay: Duration::from_millis(200),
            verify_poll_attempts: 30,
            verify_poll_interval: Duration::from_secs(1),
            root_bucket: "root".to_string(),
        }
    }
}

/// Counters for a single run. Owned by the run and handed back when it ends.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessingStats {
    /// Every regular file seen by the walk, supported or not.
    pub files_visited: usize,
    /// Files with a supported extension.
    pub files_processed: usize,
    pub files_moved: usize,
    pub duplicates_deleted: usize,
    pub files_verified: usize,
    /// Hash, delete, naming or move failed; the source file is untouched.
    pub files_failed: usize,
    /// Abandoned because the index stayed locked.
    pub files_skipped: usize,
    /// Moved, but the index insert did not go through.
    pub files_unindexed: usize,
    pub verify_timeouts: usize,
}

/// Where a visited file ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Unsupported,
    Duplicate,
    Moved,
    Skipped,
    Failed,
}

/// Per-file facts gathered once the file has been hashed.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub source_path: PathBuf,
    pub relative_path: PathBuf,
    pub extension: String,
    pub category: MediaCategory,
    pub fingerprint: Fingerprint,
    pub size_bytes: u64,
}

#[derive(Debug, PartialEq, Eq)]
struct StatusLine {
    subfolder: String,
    verified: usize,
    remaining: usize,
}

/// Moves one file into place. Must leave `from` intact whenever it fails.
pub type MoveFn = fn(&Path, &Path) -> io::Result<()>;

struct RunState {
    stats: ProcessingStats,
    total_files: usize,
    last_status: Instant,
}

/// Walks a source tree and moves every new media file into the destination
/// tree, deleting byte-identical duplicates of files already indexed.
pub struct FolderProcessor<'a, I: DuplicateIndex + ?Sized> {
    index: &'a I,
    destination: PathBuf,
    options: ProcessorOptions,
    mover: MoveFn,
}

impl<'a, I: DuplicateIndex + ?Sized> FolderProcessor<'a, I> {
    pub fn new(index: &'a I, destination: &Path, options: ProcessorOptions) -> Self {
        Self {
            index,
            destination: destination.to_path_buf(),
            options,
            mover: transfer::move_file,
        }
    }

    /// Replace the function used to move files into the destination tree.
    pub fn with_mover(mut self, mover: MoveFn) -> Self {
        self.mover = mover;
        self
    }

    /// Process every file under `source`, then remove whatever directories the
    /// run emptied. Per-file failures are logged and counted; only conditions
    /// the host cannot recover from (disk full) end the run early.
    pub fn run(
        &self,
        source: &Path,
        reporter: &dyn ProgressReporter,
    ) -> Result<ProcessingStats, Error> {
        info!("Processing folder: {}", source.display());

        let mut state = RunState {
            stats: ProcessingStats::default(),
            total_files: scanner::count_files(source),
            last_status: Instant::now(),
        };
        debug!("{} files found under {}", state.total_files, source.display());
        reporter.on_run_start(source, state.total_files);

        for path in scanner::walk_files(source) {
            state.stats.files_visited += 1;
            let outcome = self.process_file(source, &path, &mut state, reporter)?;
            trace!("{} -> {:?}", path.display(), outcome);
            reporter.on_file_visited(state.stats.files_visited, state.total_files);
        }

        match scanner::remove_emptied_tree(source) {
            Ok(()) => info!("Source folder deleted: {}", source.display()),
            Err(e) => warn!("Error deleting source folder: {}", e),
        }

        log_folder_statistics(source, &state.stats);
        reporter.on_run_complete(&state.stats);
        info!("Processing finished for folder: {}", source.display());

        Ok(state.stats)
    }

    fn process_file(
        &self,
        source: &Path,
        path: &Path,
        state: &mut RunState,
        reporter: &dyn ProgressReporter,
    ) -> Result<FileOutcome, Error> {
        let Some((extension, category)) = classify::normalized_extension(path)
            .and_then(|ext| classify::category_for(&ext).map(|category| (ext, category)))
        else {
            return Ok(FileOutcome::Unsupported);
        };
        state.stats.files_processed += 1;

        let record = match hash_record(source, path, extension, category) {
            Ok(record) => record,
            Err(e) => {
                error!("Error hashing {}: {}", path.display(), e);
                return Ok(fail(state, reporter, path, &e.to_string()));
            }
        };

        let existing = match self.with_retry(|| self.index.lookup(&record.fingerprint)) {
            Ok(existing) => existing,
            Err(e) => return Ok(self.abandon(state, reporter, path, e)),
        };

        if let Some(entry) = existing {
            return Ok(self.delete_duplicate(state, reporter, &record, &entry));
        }

        let target = match naming::next_destination(
            &self.destination,
            &record.relative_path,
            record.category,
            &record.extension,
            &self.options.root_bucket,
        ) {
            Ok(target) => target,
            Err(e) if is_fatal(&e) => return Err(e.into()),
            Err(e) => {
                error!("Error preparing destination for {}: {}", path.display(), e);
                return Ok(fail(state, reporter, path, &e.to_string()));
            }
        };

        if let Err(e) = (self.mover)(path, &target) {
            if is_fatal(&e) {
                return Err(e.into());
            }
            error!(
                "Error moving {} to {}: {}",
                path.display(),
                target.display(),
                e
            );
            return Ok(fail(state, reporter, path, &e.to_string()));
        }
        reporter.on_file_moved(path, &target);

        let size_bytes = fs::metadata(&target)
            .map(|m| m.len())
            .unwrap_or_else(|e| {
                warn!("Could not stat {} after move: {}", target.display(), e);
                record.size_bytes
            });
        let entry = IndexEntry::new(record.fingerprint, size_bytes, &record.extension);
        match self.with_retry(|| self.index.insert(&entry)) {
            Ok(true) => {}
            Ok(false) => debug!("{} was indexed concurrently", record.fingerprint),
            Err(e) => {
                error!(
                    "{} moved to {} but could not be indexed: {}",
                    path.display(),
                    target.display(),
                    e
                );
                state.stats.files_unindexed += 1;
            }
        }

        if !self.wait_until_gone(path) {
            warn!(
                "{} still visible after move to {}",
                path.display(),
                target.display()
            );
            state.stats.verify_timeouts += 1;
        }
        state.stats.files_verified += 1;
        state.stats.files_moved += 1;

        self.log_processing_status(source, &record.relative_path, state);
        Ok(FileOutcome::Moved)
    }

    fn delete_duplicate(
        &self,
        state: &mut RunState,
        reporter: &dyn ProgressReporter,
        record: &FileRecord,
        entry: &IndexEntry,
    ) -> FileOutcome {
        let path = &record.source_path;
        if let Err(e) = fs::remove_file(path) {
            error!("Error deleting duplicate {}: {}", path.display(), e);
            return fail(state, reporter, path, &e.to_string());
        }

        info!(
            "Duplicate file deleted: {} ({}, {:.2} MB already indexed)",
            path.display(),
            entry.fingerprint,
            entry.size_mb
        );
        state.stats.duplicates_deleted += 1;
        reporter.on_duplicate_deleted(path);
        FileOutcome::Duplicate
    }

    fn abandon(
        &self,
        state: &mut RunState,
        reporter: &dyn ProgressReporter,
        path: &Path,
        e: IndexError,
    ) -> FileOutcome {
        if e.is_contention() {
            error!(
                "Failed after {} attempts. Skipping file {}: {}",
                self.options.lock_retry_attempts,
                path.display(),
                e
            );
            state.stats.files_skipped += 1;
            reporter.on_file_failed(path, &e.to_string());
            FileOutcome::Skipped
        } else {
            error!("Index lookup failed for {}: {}", path.display(), e);
            fail(state, reporter, path, &e.to_string())
        }
    }

    /// Run an index operation, retrying while the store reports contention.
    fn with_retry<T>(
        &self,
        mut op: impl FnMut() -> Result<T, IndexError>,
    ) -> Result<T, IndexError> {
        let attempts = self.options.lock_retry_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Err(e) if e.is_contention() && attempt < attempts => {
                    warn!("Index is locked. Retrying... ({}/{}) {}", attempt, attempts, e);
                    pause(self.options.lock_retry_delay);
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Poll until `path` disappears, bounded by `verify_poll_attempts`.
    fn wait_until_gone(&self, path: &Path) -> bool {
        pause(self.options.settle_delay);
        for _ in 0..self.options.verify_poll_attempts {
            if !path.exists() {
                return true;
            }
            pause(self.options.verify_poll_interval);
        }
        !path.exists()
    }

    fn log_processing_status(&self, source: &Path, relative_path: &Path, state: &mut RunState) {
        let Some(status) = self.due_status(relative_path, state) else {
            return;
        };
        info!(
            "Processing folder: {} - {} files verified, {} files remaining.",
            source.join(&status.subfolder).display(),
            status.verified,
            status.remaining
        );
        state.last_status = Instant::now();
    }

    /// The status line owed after a verified file, if `status_interval` has
    /// passed since the last one.
    fn due_status(&self, relative_path: &Path, state: &RunState) -> Option<StatusLine> {
        if state.last_status.elapsed() < self.options.status_interval {
            return None;
        }

        let verified = state.stats.files_verified;
        Some(StatusLine {
            subfolder: naming::top_subfolder(relative_path)
                .unwrap_or_else(|| self.options.root_bucket.clone()),
            verified,
            remaining: state.total_files.saturating_sub(verified),
        })
    }
}

fn hash_record(
    source: &Path,
    path: &Path,
    extension: String,
    category: MediaCategory,
) -> io::Result<FileRecord> {
    let size_bytes = fs::metadata(path)?.len();
    let fingerprint = hasher::hash_file(path)?;
    Ok(FileRecord {
        source_path: path.to_path_buf(),
        relative_path: path.strip_prefix(source).unwrap_or(path).to_path_buf(),
        extension,
        category,
        fingerprint,
        size_bytes,
    })
}

fn fail(
    state: &mut RunState,
    reporter: &dyn ProgressReporter,
    path: &Path,
    reason: &str,
) -> FileOutcome {
    state.stats.files_failed += 1;
    reporter.on_file_failed(path, reason);
    FileOutcome::Failed
}

fn is_fatal(e: &io::Error) -> bool {
    matches!(e.kind(), ErrorKind::StorageFull | ErrorKind::OutOfMemory)
}

fn pause(duration: Duration) {
    if !duration.is_zero() {
        thread::sleep(duration);
    }
}

fn log_folder_statistics(source: &Path, stats: &ProcessingStats) {
    info!("Statistics for folder: {}", source.display());
    info!("Total number of files: {}", stats.files_processed);
    info!("Files moved: {}", stats.files_moved);
    info!("Duplicates deleted: {}", stats.duplicates_deleted);
    if stats.files_failed + stats.files_skipped + stats.files_unindexed > 0 {
        warn!(
            "Failed: {}, skipped (index locked): {}, moved but not indexed: {}",
            stats.files_failed, stats.files_skipped, stats.files_unindexed
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::SilentReporter;
    use crate::storage::HashIndex;
    use std::cell::Cell;
    use tempfile::tempdir;

    fn fast_options() -> ProcessorOptions {
        ProcessorOptions {
            lock_retry_delay: Duration::ZERO,
            settle_delay: Duration::ZERO,
            verify_poll_interval: Duration::ZERO,
            ..ProcessorOptions::default()
        }
    }

    fn busy() -> IndexError {
        IndexError::Contention(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        ))
    }

    #[test]
    fn test_with_retry_recovers_from_contention() {
        let index = HashIndex::open_in_memory().unwrap();
        let processor = FolderProcessor::new(&index, Path::new("/unused"), fast_options());

        let calls = Cell::new(0);
        let result = processor.with_retry(|| {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(busy())
            } else {
                Ok(42)
            }
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_with_retry_gives_up_after_limit() {
        let index = HashIndex::open_in_memory().unwrap();
        let processor = FolderProcessor::new(&index, Path::new("/unused"), fast_options());

        let calls = Cell::new(0);
        let result: Result<(), IndexError> = processor.with_retry(|| {
            calls.set(calls.get() + 1);
            Err(busy())
        });
        assert!(result.unwrap_err().is_contention());
        assert_eq!(calls.get(), 5);
    }

    #[test]
    fn test_with_retry_does_not_retry_store_errors() {
        let index = HashIndex::open_in_memory().unwrap();
        let processor = FolderProcessor::new(&index, Path::new("/unused"), fast_options());

        let calls = Cell::new(0);
        let result: Result<(), IndexError> = processor.with_retry(|| {
            calls.set(calls.get() + 1);
            Err(IndexError::Store(rusqlite::Error::QueryReturnedNoRows))
        });
        assert!(!result.unwrap_err().is_contention());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_wait_until_gone() {
        let tmp = tempdir().unwrap();
        let index = HashIndex::open_in_memory().unwrap();
        let processor = FolderProcessor::new(&index, tmp.path(), fast_options());

        let present = tmp.path().join("still_here.jpg");
        fs::write(&present, b"x").unwrap();
        assert!(!processor.wait_until_gone(&present));
        assert!(processor.wait_until_gone(&tmp.path().join("gone.jpg")));
    }

    fn run_state(total_files: usize, verified: usize) -> RunState {
        RunState {
            stats: ProcessingStats {
                files_verified: verified,
                ..ProcessingStats::default()
            },
            total_files,
            last_status: Instant::now(),
        }
    }

    #[test]
    fn test_status_due_once_interval_elapsed() {
        let index = HashIndex::open_in_memory().unwrap();
        let options = ProcessorOptions {
            status_interval: Duration::ZERO,
            ..fast_options()
        };
        let processor = FolderProcessor::new(&index, Path::new("/unused"), options);

        let status = processor.due_status(Path::new("Album/2020/a.jpg"), &run_state(10, 3));
        assert_eq!(
            status,
            Some(StatusLine {
                subfolder: "Album".to_string(),
                verified: 3,
                remaining: 7,
            })
        );

        let status = processor.due_status(Path::new("loose.jpg"), &run_state(2, 5));
        assert_eq!(
            status,
            Some(StatusLine {
                subfolder: "root".to_string(),
                verified: 5,
                remaining: 0,
            })
        );
    }

    #[test]
    fn test_status_not_due_within_interval() {
        let index = HashIndex::open_in_memory().unwrap();
        let options = ProcessorOptions {
            status_interval: Duration::from_secs(3600),
            ..fast_options()
        };
        let processor = FolderProcessor::new(&index, Path::new("/unused"), options);

        assert_eq!(
            processor.due_status(Path::new("Album/a.jpg"), &run_state(10, 3)),
            None
        );
    }

    #[test]
    fn test_status_timer_resets_after_logging() {
        let index = HashIndex::open_in_memory().unwrap();
        let options = ProcessorOptions {
            status_interval: Duration::from_millis(50),
            ..fast_options()
        };
        let processor = FolderProcessor::new(&index, Path::new("/unused"), options);

        let mut state = run_state(10, 3);
        thread::sleep(Duration::from_millis(60));
        assert!(processor.due_status(Path::new("Album/a.jpg"), &state).is_some());

        processor.log_processing_status(Path::new("/inbox"), Path::new("Album/a.jpg"), &mut state);
        assert!(processor.due_status(Path::new("Album/a.jpg"), &state).is_none());
    }

    fn copy_but_keep_source(from: &Path, to: &Path) -> io::Result<()> {
        transfer::copy_then_remove_with(from, to, |_| {
            Err(io::Error::new(ErrorKind::PermissionDenied, "source directory is read-only"))
        })
    }

    #[test]
    fn test_move_failing_after_copy_leaves_source_only() {
        let tmp = tempdir().unwrap();
        let source = tmp.path().join("inbox");
        let destination = tmp.path().join("library");
        fs::create_dir_all(source.join("Album")).unwrap();
        fs::write(source.join("Album/a.jpg"), b"stuck photo").unwrap();

        let index = HashIndex::open_in_memory().unwrap();
        let processor = FolderProcessor::new(&index, &destination, fast_options())
            .with_mover(copy_but_keep_source);
        let stats = processor.run(&source, &SilentReporter).unwrap();

        assert_eq!(stats.files_failed, 1);
        assert_eq!(stats.files_moved, 0);
        assert_eq!(fs::read(source.join("Album/a.jpg")).unwrap(), b"stuck photo");
        assert!(!destination.join("Album/photos/Album 000001.jpg").exists());
        assert!(index
            .lookup(&hasher::hash_data(b"stuck photo"))
            .unwrap()
            .is_none());

        // A later run with a working mover picks the file up again under the same name
        let stats = FolderProcessor::new(&index, &destination, fast_options())
            .run(&source, &SilentReporter)
            .unwrap();
        assert_eq!(stats.files_moved, 1);
        assert_eq!(
            fs::read(destination.join("Album/photos/Album 000001.jpg")).unwrap(),
            b"stuck photo"
        );
    }

    #[test]
    fn test_root_level_file_uses_root_bucket() {
        let tmp = tempdir().unwrap();
        let source = tmp.path().join("inbox");
        let destination = tmp.path().join("library");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("loose.JPG"), b"loose").unwrap();

        let index = HashIndex::open_in_memory().unwrap();
        let processor = FolderProcessor::new(&index, &destination, fast_options());
        let stats = processor.run(&source, &SilentReporter).unwrap();

        assert_eq!(stats.files_moved, 1);
        assert!(destination.join("root/photos/root 000001.jpg").is_file());
    }
}
