use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use super::Fingerprint;

const CHUNK_SIZE: usize = 4096;

/// Stream a file through SHA-256 in fixed-size chunks, so memory use does not
/// depend on file size.
pub fn hash_file(file: &Path) -> io::Result<Fingerprint> {
    let mut f = File::open(file)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; CHUNK_SIZE];

    loop {
        let bytes_read = match f.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(finish(hasher))
}

pub fn hash_data(data: &[u8]) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(data);
    finish(hasher)
}

fn finish(hasher: Sha256) -> Fingerprint {
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hasher.finalize());
    Fingerprint::from_bytes(bytes)
}
