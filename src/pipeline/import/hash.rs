use std::path::Path;

use base64::Engine;
use sha2::{Digest, Sha256};

use super::ImportError;

/// SHA-256 of a byte buffer, base64-encoded.
pub fn hash_bytes(content: &[u8]) -> String {
    let hash = Sha256::digest(content);
    base64::engine::general_purpose::STANDARD.encode(hash)
}

/// SHA-256 content hash of a file on disk.
pub fn compute_content_hash(path: &Path) -> Result<String, ImportError> {
    let content = std::fs::read(path)?;
    Ok(hash_bytes(&content))
}
