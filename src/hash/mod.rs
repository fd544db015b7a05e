// Content checksums (BLAKE3)

use std::fs::File;
use std::io::Read;
use std::path::Path;
use crate::constants::HASH_CHUNK_SIZE;
use crate::error::{Result, ShootError};

/// Hex BLAKE3 digest of the entire file, streamed in 1MB chunks
pub fn compute_full_hash(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .map_err(|e| ShootError::Hash(format!("Failed to open {}: {}", path.display(), e)))?;

    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer)
            .map_err(|e| ShootError::Hash(format!("Failed to read {}: {}", path.display(), e)))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize().to_hex().to_string())
}
