use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::AppConfig;
use crate::error::Error;
use crate::processor::{FolderProcessor, ProcessingStats};
use crate::progress::ProgressReporter;
use crate::storage::HashIndex;

pub struct SortEngine {
    config: AppConfig,
}

#[derive(Debug)]
pub struct SortResult {
    pub stats: ProcessingStats,
    pub duration: Duration,
}

impl SortEngine {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Validate the configuration, open the index and process the source tree
    /// once.
    pub fn run(&self, reporter: &dyn ProgressReporter) -> Result<SortResult, Error> {
        self.config.validate()?;

        let index =
            HashIndex::open_with_journal(&self.config.index_path, self.config.index_journal_mode)
                .map_err(crate::IndexError::from)?;
        debug!("Opened duplicate index at {}", self.config.index_path);

        let start = Instant::now();
        let processor = FolderProcessor::new(
            &index,
            &self.config.destination(),
            self.config.processor_options(),
        );
        let stats = processor.run(&self.config.source(), reporter)?;

        Ok(SortResult {
            stats,
            duration: start.elapsed(),
        })
    }
}
