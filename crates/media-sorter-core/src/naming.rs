//! Destination layout: `<destination>/<top subfolder>/<category>/<top subfolder> NNNNNN.<ext>`.
//!
//! Sequence numbers come from the highest number already present in the
//! category folder, so gaps left by deleted files are never refilled. Two
//! processes naming into the same folder at the same moment can still pick the
//! same number; only a target that already exists on disk is skipped.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::trace;

use crate::classify::MediaCategory;

const SEQUENCE_WIDTH: usize = 6;

/// First normal component of a path relative to the source root, if the file
/// sits below at least one directory.
pub fn top_subfolder(relative_path: &Path) -> Option<String> {
    let parent = relative_path.parent()?;
    parent.components().find_map(|component| match component {
        Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
        _ => None,
    })
}

/// Sequence number of a name shaped like `<anything> 000042.<ext>`.
pub fn parse_sequence(file_name: &str) -> Option<u64> {
    let last_word = file_name.rsplit(' ').next()?;
    let digits = last_word.split('.').next()?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

pub fn sequenced_file_name(subfolder: &str, sequence: u64, extension: &str) -> String {
    format!(
        "{} {:0width$}.{}",
        subfolder,
        sequence,
        extension,
        width = SEQUENCE_WIDTH
    )
}

/// Highest sequence number in `folder`, 0 when nothing matches.
pub fn max_sequence(folder: &Path) -> io::Result<u64> {
    let mut max = 0;
    for entry in fs::read_dir(folder)? {
        let entry = entry?;
        if let Some(seq) = entry.file_name().to_str().and_then(parse_sequence) {
            max = max.max(seq);
        }
    }
    Ok(max)
}

/// Create the category folder for `relative_path` and return a path in it
/// that does not exist yet.
pub fn next_destination(
    destination_root: &Path,
    relative_path: &Path,
    category: MediaCategory,
    extension: &str,
    root_bucket: &str,
) -> io::Result<PathBuf> {
    let subfolder = top_subfolder(relative_path).unwrap_or_else(|| root_bucket.to_string());
    let folder = destination_root
        .join(&subfolder)
        .join(category.folder_name());
    fs::create_dir_all(&folder)?;

    let mut sequence = max_sequence(&folder)?;
    loop {
        sequence = sequence.checked_add(1).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::Other,
                format!("sequence numbers exhausted in {}", folder.display()),
            )
        })?;
        let candidate = folder.join(sequenced_file_name(&subfolder, sequence, extension));
        if !candidate.exists() {
            trace!("Next destination for {}: {}", relative_path.display(), candidate.display());
            return Ok(candidate);
        }
    }
}
