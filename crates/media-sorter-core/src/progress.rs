use std::path::Path;

use crate::processor::ProcessingStats;

/// Trait for reporting run progress.
///
/// The CLI implements it with an indicatif bar. Status lines are logged by the
/// processor itself, so all methods default to no-ops.
pub trait ProgressReporter: Send + Sync {
    fn on_run_start(&self, _source: &Path, _total_files: usize) {}
    /// Called once per visited file, supported or not.
    fn on_file_visited(&self, _visited: usize, _total_files: usize) {}
    fn on_duplicate_deleted(&self, _path: &Path) {}
    fn on_file_moved(&self, _from: &Path, _to: &Path) {}
    fn on_file_failed(&self, _path: &Path, _reason: &str) {}
    fn on_run_complete(&self, _stats: &ProcessingStats) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
