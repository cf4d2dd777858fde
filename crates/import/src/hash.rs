use sha2::{Digest, Sha256};

/// SHA-256 of raw file bytes as lowercase hex.
///
/// This is the dedup key for statement uploads: two files with the same
/// content hash are the same statement regardless of file name.
pub fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
