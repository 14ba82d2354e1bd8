use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error};
use walkdir::{DirEntry, WalkDir};

use crate::error::Error;

/// Number of regular files under `root`, whatever their extension.
pub fn count_files(root: &Path) -> usize {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .count()
}

/// Regular files under `root`, depth-first, siblings in name order. Each
/// directory is listed completely before any of its files is yielded, so
/// moving or deleting yielded files does not disturb the walk. Unreadable
/// directories are logged and skipped. Symlinks are not followed.
pub fn walk_files(root: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry_result| match entry_result {
            Ok(entry) => Some(entry),
            Err(err) => {
                let path = err
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                error!("Error reading {}: {}", path, err);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(DirEntry::into_path)
}

/// Remove the directories of a processed source tree, deepest first.
///
/// Files are never deleted here: anything still present (unsupported types,
/// files that failed to move) keeps its directory alive and is reported
/// through `Error::Cleanup`.
pub fn remove_emptied_tree(root: &Path) -> Result<(), Error> {
    if !root.exists() {
        return Ok(());
    }

    let mut remaining = 0usize;
    for entry in WalkDir::new(root).contents_first(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                error!("Error reading source tree during cleanup: {}", err);
                remaining += 1;
                continue;
            }
        };

        if !entry.file_type().is_dir() {
            remaining += 1;
            continue;
        }

        match fs::remove_dir(entry.path()) {
            Ok(()) => debug!("Removed {}", entry.path().display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => debug!("Keeping {}: {}", entry.path().display(), e),
        }
    }

    if root.exists() {
        return Err(Error::Cleanup {
            path: root.to_path_buf(),
            remaining,
        });
    }
    Ok(())
}
