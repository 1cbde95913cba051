use sha2::{Digest, Sha256};

/// SHA-256 of an in-memory byte slice.
pub fn sha256_bytes(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Lowercase hex (64 chars) of a raw digest.
pub fn to_hex(hash: &[u8; 32]) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}

/// Content fingerprint used to spot a statement file ingested twice.
pub fn content_hash(data: &[u8]) -> String {
    to_hex(&sha256_bytes(data))
}
