use std::path::PathBuf;

use thiserror::Error;

use crate::storage::IndexError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Could not remove source tree {}: {remaining} entries left behind", path.display())]
    Cleanup { path: PathBuf, remaining: usize },
}
