pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod naming;
pub mod processor;
pub mod progress;
pub mod scanner;
pub mod storage;
pub mod transfer;

pub use crate::config::AppConfig;
pub use engine::{SortEngine, SortResult};
pub use error::Error;
pub use processor::{FileOutcome, FileRecord, FolderProcessor, ProcessingStats, ProcessorOptions};
pub use progress::{ProgressReporter, SilentReporter};
pub use storage::{DuplicateIndex, HashIndex, IndexEntry, IndexError};
