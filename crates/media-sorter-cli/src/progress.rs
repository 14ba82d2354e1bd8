use indicatif::{ProgressBar, ProgressStyle};
use media_sorter_core::{ProcessingStats, ProgressReporter};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// CLI progress reporter: one bar over every file found in the source tree.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn finish_bar(&self) {
        let mut guard = self.bar.lock().unwrap();
        if let Some(pb) = guard.take() {
            pb.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_run_start(&self, _source: &Path, total_files: usize) {
        let pb = ProgressBar::new(total_files as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "  {spinner:.cyan} Sorting [{bar:30.cyan/dim}] {pos}/{len} files ({eta} remaining) {msg}",
            )
            .unwrap()
            .progress_chars("━╸─")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        pb.enable_steady_tick(Duration::from_millis(80));

        let mut guard = self.bar.lock().unwrap();
        if let Some(old) = guard.replace(pb) {
            old.finish_and_clear();
        }
    }

    fn on_file_visited(&self, visited: usize, total_files: usize) {
        let guard = self.bar.lock().unwrap();
        if let Some(pb) = guard.as_ref() {
            // The tree may have grown since it was counted
            if (visited as u64) > pb.length().unwrap_or(0) {
                pb.set_length(visited.max(total_files) as u64);
            }
            pb.set_position(visited as u64);
        }
    }

    fn on_file_moved(&self, _from: &Path, to: &Path) {
        let guard = self.bar.lock().unwrap();
        if let Some(pb) = guard.as_ref() {
            if let Some(name) = to.file_name() {
                pb.set_message(name.to_string_lossy().into_owned());
            }
        }
    }

    fn on_run_complete(&self, stats: &ProcessingStats) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Sort complete: {} files visited, {} media files processed",
            stats.files_visited, stats.files_processed
        );
    }
}
