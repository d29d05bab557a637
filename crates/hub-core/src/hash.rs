//! BLAKE3-160 digest newtype.
//!
//! The trie and the message model both hash to 20 bytes (160 bits): BLAKE3's
//! native output is 32 bytes, so every hash here is the first 20 bytes of
//! the full BLAKE3 digest, wrapped in a fixed-size newtype rather than
//! passed around as a raw `Vec<u8>`.

use std::fmt;

use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::HubError;

/// Length in bytes of a BLAKE3-160 digest.
pub const HASH_LEN: usize = 20;

/// BLAKE3-160 digest of the empty byte string, the canonical `EMPTY_HASH`
/// stand-in for an absent child in a hash chain.
pub fn empty_hash() -> Hash20 {
    Hash20::hash(&[])
}

/// A 20-byte BLAKE3-160 digest.
///
/// Serializes as lowercase, unpadded 40-char hex at every wire/API boundary
///; binary on the node internally.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash20([u8; HASH_LEN]);

impl Hash20 {
    pub fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    pub fn into_bytes(self) -> [u8; HASH_LEN] {
        self.0
    }

    /// Hash arbitrary input, truncating the 32-byte BLAKE3 digest to 20 bytes.
    pub fn hash(input: &[u8]) -> Self {
        let full = blake3::hash(input);
        let mut out = [0u8; HASH_LEN];
        out.copy_from_slice(&full.as_bytes()[..HASH_LEN]);
        Self(out)
    }

    /// Hash the concatenation of child digests, in the order given by the caller.
    ///
    /// Callers are responsible for ascending-byte-order iteration; this
    /// function just concatenates and hashes.
    pub fn hash_children<'a>(children: impl Iterator<Item = &'a Hash20>) -> Self {
        let mut buf = Vec::with_capacity(HASH_LEN * 4);
        for child in children {
            buf.extend_from_slice(&child.0);
        }
        Self::hash(&buf)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> crate::error::Result<Self> {
        if s.len() != HASH_LEN * 2 {
            return Err(HubError::parse_failure(format!(
                "hash hex must be {} chars, got {}",
                HASH_LEN * 2,
                s.len()
            )));
        }
        let bytes = hex::decode(s)
            .map_err(|e| HubError::parse_failure(format!("invalid hash hex: {e}")))?;
        let mut out = [0u8; HASH_LEN];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }
}

impl fmt::Debug for Hash20 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash20({})", self.to_hex())
    }
}

impl fmt::Display for Hash20 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Hash20 {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash20 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_hash_matches_hash_of_empty_slice() {
        assert_eq!(empty_hash(), Hash20::hash(&[]));
    }

    #[test]
    fn hex_round_trips() {
        let h = Hash20::hash(b"hello");
        let hex = h.to_hex();
        assert_eq!(hex.len(), 40);
        assert_eq!(Hash20::from_hex(&hex).unwrap(), h);
    }

    #[test]
    fn hex_is_lowercase() {
        let h = Hash20::hash(b"Hello, World!");
        assert_eq!(h.to_hex(), h.to_hex().to_lowercase());
    }

    #[test]
    fn hash_children_is_order_sensitive() {
        let a = Hash20::hash(b"a");
        let b = Hash20::hash(b"b");
        let forward = Hash20::hash_children([&a, &b].into_iter());
        let backward = Hash20::hash_children([&b, &a].into_iter());
        assert_ne!(forward, backward);
    }
}
