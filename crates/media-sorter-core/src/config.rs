use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Error;
use crate::processor::ProcessorOptions;
use crate::storage::JournalMode;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub source_dir: String,
    pub destination_dir: String,
    pub index_path: String,

    #[serde(default = "default_lock_retry_attempts")]
    pub lock_retry_attempts: u32,
    #[serde(default = "default_lock_retry_delay_ms")]
    pub lock_retry_delay_ms: u64,
    #[serde(default = "default_status_interval_secs")]
    pub status_interval_secs: u64,
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_verify_poll_attempts")]
    pub verify_poll_attempts: u32,
    #[serde(default = "default_verify_poll_interval_ms")]
    pub verify_poll_interval_ms: u64,
    #[serde(default = "default_root_bucket")]
    pub root_bucket: String,
    /// `wal` (default) or `delete`; use `delete` for an index on a network share.
    #[serde(default)]
    pub index_journal_mode: JournalMode,
}

fn default_lock_retry_attempts() -> u32 {
    5
}

fn default_lock_retry_delay_ms() -> u64 {
    1000
}

fn default_status_interval_secs() -> u64 {
    10
}

fn default_settle_delay_ms() -> u64 {
    200
}

fn default_verify_poll_attempts() -> u32 {
    30
}

fn default_verify_poll_interval_ms() -> u64 {
    1000
}

fn default_root_bucket() -> String {
    "root".to_string()
}

/// Values supplied on the command line, applied on top of `Config.toml` and
/// `MEDIA_SORTER_*` environment variables.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub source_dir: Option<String>,
    pub destination_dir: Option<String>,
    pub index_path: Option<String>,
}

pub fn load_configuration_with(overrides: &ConfigOverrides) -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(Environment::with_prefix("MEDIA_SORTER").try_parsing(true))
        .set_override_option("source_dir", overrides.source_dir.clone())?
        .set_override_option("destination_dir", overrides.destination_dir.clone())?
        .set_override_option("index_path", overrides.index_path.clone())?
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

impl AppConfig {
    pub fn new(source_dir: &str, destination_dir: &str, index_path: &str) -> Self {
        Self {
            source_dir: source_dir.to_string(),
            destination_dir: destination_dir.to_string(),
            index_path: index_path.to_string(),
            lock_retry_attempts: default_lock_retry_attempts(),
            lock_retry_delay_ms: default_lock_retry_delay_ms(),
            status_interval_secs: default_status_interval_secs(),
            settle_delay_ms: default_settle_delay_ms(),
            verify_poll_attempts: default_verify_poll_attempts(),
            verify_poll_interval_ms: default_verify_poll_interval_ms(),
            root_bucket: default_root_bucket(),
            index_journal_mode: JournalMode::default(),
        }
    }

    pub fn source(&self) -> PathBuf {
        PathBuf::from(&self.source_dir)
    }

    pub fn destination(&self) -> PathBuf {
        PathBuf::from(&self.destination_dir)
    }

    pub fn processor_options(&self) -> ProcessorOptions {
        ProcessorOptions {
            lock_retry_attempts: self.lock_retry_attempts.max(1),
            lock_retry_delay: Duration::from_millis(self.lock_retry_delay_ms),
            status_interval: Duration::from_secs(self.status_interval_secs),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            verify_poll_attempts: self.verify_poll_attempts,
            verify_poll_interval: Duration::from_millis(self.verify_poll_interval_ms),
            root_bucket: self.root_bucket.clone(),
        }
    }

    /// Reject configurations the processor cannot run against safely.
    pub fn validate(&self) -> Result<(), Error> {
        let source = self.source();
        let destination = self.destination();

        if !source.is_dir() {
            return Err(Error::InvalidConfig(format!(
                "source directory {} does not exist",
                source.display()
            )));
        }
        if self.index_path.trim().is_empty() {
            return Err(Error::InvalidConfig("index path is empty".to_string()));
        }
        if self.root_bucket.trim().is_empty() {
            return Err(Error::InvalidConfig("root bucket name is empty".to_string()));
        }
        if overlapping(&source, &destination) {
            return Err(Error::InvalidConfig(format!(
                "source {} and destination {} overlap",
                source.display(),
                destination.display()
            )));
        }
        Ok(())
    }
}

/// True when either directory is the other or nested inside it.
pub fn overlapping(a: &Path, b: &Path) -> bool {
    let a = resolve(a);
    let b = resolve(b);
    a.starts_with(&b) || b.starts_with(&a)
}

/// Canonicalize the deepest existing ancestor and re-append the rest, so paths
/// that do not exist yet still compare against symlinked parents correctly.
fn resolve(path: &Path) -> PathBuf {
    let mut missing = Vec::new();
    let mut current = path;
    loop {
        if let Ok(canonical) = current.canonicalize() {
            return missing
                .iter()
                .rev()
                .fold(canonical, |acc: PathBuf, part| acc.join(part));
        }
        match (current.parent(), current.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                current = parent;
            }
            _ => return path.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_overlapping_nested() {
        assert!(overlapping(
            Path::new("/media/inbox"),
            Path::new("/media/inbox/sorted")
        ));
        assert!(overlapping(
            Path::new("/media/inbox/sorted"),
            Path::new("/media/inbox")
        ));
        assert!(overlapping(Path::new("/media/inbox"), Path::new("/media/inbox")));
    }

    #[test]
    fn test_overlapping_siblings() {
        assert!(!overlapping(
            Path::new("/media/inbox"),
            Path::new("/media/library")
        ));
        // Component-wise, not string prefix
        assert!(!overlapping(
            Path::new("/media/inbox"),
            Path::new("/media/inbox2")
        ));
    }

    #[test]
    fn test_validate() {
        let tmp = tempdir().unwrap();
        let source = tmp.path().join("inbox");
        let destination = tmp.path().join("library");
        std::fs::create_dir_all(&source).unwrap();

        let config = AppConfig::new(
            source.to_str().unwrap(),
            destination.to_str().unwrap(),
            "hashes.db",
        );
        assert!(config.validate().is_ok());

        let nested = AppConfig::new(
            source.to_str().unwrap(),
            source.join("out").to_str().unwrap(),
            "hashes.db",
        );
        assert!(matches!(nested.validate(), Err(Error::InvalidConfig(_))));

        let missing = AppConfig::new(
            tmp.path().join("nope").to_str().unwrap(),
            destination.to_str().unwrap(),
            "hashes.db",
        );
        assert!(matches!(missing.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_processor_options_defaults() {
        let options = AppConfig::new("a", "b", "c").processor_options();
        assert_eq!(options.lock_retry_attempts, 5);
        assert_eq!(options.lock_retry_delay, Duration::from_secs(1));
        assert_eq!(options.status_interval, Duration::from_secs(10));
        assert_eq!(options.verify_poll_attempts, 30);
        assert_eq!(options.root_bucket, "root");
    }

    #[test]
    fn test_journal_mode_from_toml() {
        let base = r#"
            source_dir = "a"
            destination_dir = "b"
            index_path = "c"
        "#;
        let parse = |toml: &str| {
            Config::builder()
                .add_source(ConfigFile::from_str(toml, config::FileFormat::Toml))
                .build()
                .unwrap()
                .try_deserialize::<AppConfig>()
        };

        assert_eq!(parse(base).unwrap().index_journal_mode, JournalMode::Wal);

        let share = format!("{base}\nindex_journal_mode = \"delete\"\n");
        assert_eq!(parse(&share).unwrap().index_journal_mode, JournalMode::Delete);

        let bogus = format!("{base}\nindex_journal_mode = \"memory\"\n");
        assert!(parse(&bogus).is_err());
    }
}
