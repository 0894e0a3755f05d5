//! Object names: BLAKE3 over the compressed bytes.
//!
//! The digest is computed incrementally while the encoder emits output, so
//! naming an object never needs a second pass over it.  The accumulator must
//! see exactly the bytes that reached the sink, in order; any gap yields a
//! name that does not match the stored content.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::codec::CodecError;

/// Digest length in bytes.
pub const HASH_LEN: usize = blake3::OUT_LEN;

/// Content-addressed name of a compressed object.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentHash([u8; HASH_LEN]);

impl ContentHash {
    /// Hash a complete byte slice in one call.
    pub fn of(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 8 hex characters, for log lines.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    pub fn from_hex(s: &str) -> Result<Self, CodecError> {
        let bytes = hex::decode(s)
            .map_err(|e| CodecError::Config(format!("invalid digest hex: {e}")))?;
        let arr: [u8; HASH_LEN] = bytes.as_slice().try_into().map_err(|_| {
            CodecError::Config(format!(
                "digest must be {HASH_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.short_hex())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<[u8; HASH_LEN]> for ContentHash {
    fn from(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }
}

impl From<ContentHash> for [u8; HASH_LEN] {
    fn from(h: ContentHash) -> Self {
        h.0
    }
}

// ── DigestAccumulator ────────────────────────────────────────────────────────

/// Running hash over emitted bytes.  `finalize` consumes the accumulator,
/// so a digest can be produced only once per instance.
#[derive(Debug, Clone, Default)]
pub struct DigestAccumulator {
    hasher:  blake3::Hasher,
    fed:     u64,
}

impl DigestAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
        self.fed += bytes.len() as u64;
    }

    /// Total bytes folded in so far.
    pub fn bytes_fed(&self) -> u64 {
        self.fed
    }

    pub fn finalize(self) -> ContentHash {
        ContentHash(*self.hasher.finalize().as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incremental_matches_one_shot() {
        let data: Vec<u8> = (0u8..=255).cycle().take(10_000).collect();
        let mut acc = DigestAccumulator::new();
        for piece in data.chunks(333) {
            acc.update(piece);
        }
        assert_eq!(acc.bytes_fed(), data.len() as u64);
        assert_eq!(acc.finalize(), ContentHash::of(&data));
    }

    #[test]
    fn empty_updates_are_neutral() {
        let mut acc = DigestAccumulator::new();
        acc.update(b"");
        acc.update(b"abc");
        acc.update(b"");
        assert_eq!(acc.finalize(), ContentHash::of(b"abc"));
    }

    #[test]
    fn hex_roundtrip() {
        let h = ContentHash::of(b"object");
        let parsed = ContentHash::from_hex(&h.to_hex()).unwrap();
        assert_eq!(parsed, h);
        assert_eq!(h.to_string().len(), HASH_LEN * 2);
        assert!(h.to_hex().starts_with(&h.short_hex()));
    }

    #[test]
    fn from_hex_rejects_wrong_length() {
        assert!(matches!(ContentHash::from_hex("abcd"), Err(CodecError::Config(_))));
        assert!(ContentHash::from_hex("zz").is_err());
    }
}
