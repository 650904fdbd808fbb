//! Hash utilities for image fingerprints and compact identifiers.
//!
//! Uses BLAKE3. 32-byte digests identify images exactly; 64-bit values are
//! compact ids for members and deterministic stub scores.

use blake3::Hasher;

/// Hashes raw image bytes to a 32-byte BLAKE3 digest.
#[inline]
pub fn hash_image(bytes: &[u8]) -> [u8; 32] {
    *blake3::hash(bytes).as_bytes()
}

/// Lowercase hex rendering of a digest (for logs and audit records).
pub fn to_hex(digest: &[u8; 32]) -> String {
    blake3::Hash::from_bytes(*digest).to_hex().to_string()
}

/// Computes a 64-bit hash of the input data using BLAKE3, truncated from 256 bits.
///
/// Use this for compact ids. Not suitable for security.
#[inline]
pub fn hash_to_u64(data: &[u8]) -> u64 {
    let hash = blake3::hash(data);
    let bytes: [u8; 8] = hash.as_bytes()[0..8]
        .try_into()
        .expect("BLAKE3 always produces at least 8 bytes");
    u64::from_le_bytes(bytes)
}

/// Hashes a member identifier string to a compact 64-bit id.
#[inline]
pub fn hash_member_id(member: &str) -> u64 {
    hash_to_u64(member.as_bytes())
}

/// Hashes an `(image, phrase)` pair into a 64-bit value.
#[inline]
pub fn hash_image_phrase(image_digest: &[u8; 32], phrase: &str) -> u64 {
    let mut hasher = Hasher::new();
    hasher.update(image_digest);
    hasher.update(b"|");
    hasher.update(phrase.as_bytes());

    let hash = hasher.finalize();
    let bytes: [u8; 8] = hash.as_bytes()[0..8]
        .try_into()
        .expect("BLAKE3 always produces at least 8 bytes");
    u64::from_le_bytes(bytes)
}
