use crate::hasher::Fingerprint;

/// One row of the `hashes` table. Written once, after the file it describes
/// has landed in the destination tree; never updated.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub fingerprint: Fingerprint,
    pub size_mb: f64,
    pub extension: String,
}

impl IndexEntry {
    pub fn new(fingerprint: Fingerprint, size_bytes: u64, extension: &str) -> Self {
        Self {
            fingerprint,
            size_mb: bytes_to_mb(size_bytes),
            extension: extension.to_string(),
        }
    }
}

pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}
