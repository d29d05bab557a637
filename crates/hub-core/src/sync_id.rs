//! SyncId codec: the deterministic, time-ordered key
//! derived from a message, plus its round trip back to the store's
//! fid-partitioned primary key.

use std::fmt;

use serde::de::{Error as _, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{HubError, Result};
use crate::hash::{Hash20, HASH_LEN};
use crate::identifiers::{Fid, MsgType, Timestamp};

/// Fixed length of a SyncId. The trie's traversal bound check treats
/// exceeding this during a descent as a fatal programming error, never a
/// recoverable one.
pub const SYNC_ID_LEN: usize = 40;

/// Length of the ASCII decimal timestamp prefix (the compaction boundary
/// the trie never descends past byte-by-byte below).
pub const TIMESTAMP_PREFIX_LEN: usize = 10;

const FAMILY_PREFIX_OFFSET: usize = TIMESTAMP_PREFIX_LEN;
const FID_OFFSET: usize = FAMILY_PREFIX_OFFSET + 1;
const SET_POSTFIX_OFFSET: usize = FID_OFFSET + 4;
const HASH_OFFSET: usize = SET_POSTFIX_OFFSET + 1;
const RESERVED_OFFSET: usize = HASH_OFFSET + HASH_LEN;

/// The single store-family this core addresses: a constant byte identifying
/// the message family. A hub with more than one replicated family would
/// parameterize this; this core has exactly one.
pub const FAMILY_PREFIX: u8 = 1;

/// A message field set the core derives a [`SyncId`] from.
///
/// Opaque beyond these five values: the core does not interpret
/// payload, signature, or any other application-level content.
pub trait Message {
    fn fid(&self) -> Fid;
    fn msg_type(&self) -> MsgType;
    fn timestamp(&self) -> Timestamp;
    fn hash(&self) -> Hash20;

    /// Set-postfix this message belongs to, derived from message type with
    /// adds and removes grouped together. The grouping table is a property
    /// of the concrete message type, not something the sync core invents.
    fn set_postfix(&self) -> u8;
}

/// 40-byte time-prefixed key naming a message in the trie.
///
/// Byte layout: `[timestamp ascii (10) | family prefix (1) | fid be (4) |
/// set postfix (1) | hash (20) | reserved (4)]`. The reserved tail keeps the
/// struct at the 40-byte length the trie's traversal bound requires even
/// though the field-by-field breakdown above only accounts for 36; see
/// `DESIGN.md` for the resolution.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SyncId([u8; SYNC_ID_LEN]);

impl SyncId {
    pub fn as_bytes(&self) -> &[u8; SYNC_ID_LEN] {
        &self.0
    }

    pub fn into_bytes(self) -> [u8; SYNC_ID_LEN] {
        self.0
    }

    pub fn from_bytes(bytes: [u8; SYNC_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// encode(message) -> SyncId. Total: a zero/absent field is
    /// treated as 0, so this never fails. `u32`'s max decimal representation
    /// is 10 digits, so the zero-padded timestamp prefix always fits exactly.
    pub fn encode(message: &impl Message) -> Self {
        let mut bytes = [0u8; SYNC_ID_LEN];

        let ts = message.timestamp().as_u32();
        let ts_ascii = format!("{ts:0width$}", width = TIMESTAMP_PREFIX_LEN);
        debug_assert_eq!(ts_ascii.len(), TIMESTAMP_PREFIX_LEN);
        bytes[0..TIMESTAMP_PREFIX_LEN].copy_from_slice(ts_ascii.as_bytes());

        bytes[FAMILY_PREFIX_OFFSET] = FAMILY_PREFIX;

        let fid_be = message.fid().to_be_bytes();
        bytes[FID_OFFSET..FID_OFFSET + 4].copy_from_slice(&fid_be);

        bytes[SET_POSTFIX_OFFSET] = message.set_postfix();

        bytes[HASH_OFFSET..HASH_OFFSET + HASH_LEN].copy_from_slice(message.hash().as_bytes());

        // bytes[RESERVED_OFFSET..SYNC_ID_LEN] stays zero.
        let _ = RESERVED_OFFSET;

        Self(bytes)
    }

    pub fn timestamp_prefix(&self) -> &[u8] {
        &self.0[0..TIMESTAMP_PREFIX_LEN]
    }

    pub fn family_prefix(&self) -> u8 {
        self.0[FAMILY_PREFIX_OFFSET]
    }

    pub fn fid(&self) -> Fid {
        let mut fid_bytes = [0u8; 4];
        fid_bytes.copy_from_slice(&self.0[FID_OFFSET..FID_OFFSET + 4]);
        Fid::from_be_bytes(fid_bytes)
    }

    pub fn set_postfix(&self) -> u8 {
        self.0[SET_POSTFIX_OFFSET]
    }

    pub fn message_hash(&self) -> Hash20 {
        let mut hash_bytes = [0u8; HASH_LEN];
        hash_bytes.copy_from_slice(&self.0[HASH_OFFSET..HASH_OFFSET + HASH_LEN]);
        Hash20::from_bytes(hash_bytes)
    }

    /// decodeToPrimaryKey(syncId) -> store key. Re-expands the
    /// 10-digit ASCII timestamp back into a 4-byte big-endian integer and
    /// splices it between the set-postfix and the hash.
    pub fn decode_to_primary_key(&self) -> Result<PrimaryKey> {
        let ts_str = std::str::from_utf8(self.timestamp_prefix())
            .map_err(|e| HubError::parse_failure(format!("timestamp prefix not ASCII: {e}")))?;
        let timestamp: u32 = ts_str
            .parse()
            .map_err(|e| HubError::parse_failure(format!("invalid timestamp prefix: {e}")))?;

        Ok(PrimaryKey {
            family_prefix: self.family_prefix(),
            fid: self.fid(),
            set_postfix: self.set_postfix(),
            timestamp: Timestamp::new(timestamp),
            hash: self.message_hash(),
        })
    }
}

impl std::fmt::Debug for SyncId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncId")
            .field("timestamp_prefix", &String::from_utf8_lossy(self.timestamp_prefix()))
            .field("family_prefix", &self.family_prefix())
            .field("fid", &self.fid())
            .field("set_postfix", &self.set_postfix())
            .field("hash", &self.message_hash())
            .finish()
    }
}

/// Raw 40-byte binary on the wire, not the hex-string convention used for hashes.
impl Serialize for SyncId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

struct SyncIdVisitor;

impl<'de> Visitor<'de> for SyncIdVisitor {
    type Value = SyncId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SYNC_ID_LEN} raw bytes")
    }

    fn visit_bytes<E: serde::de::Error>(self, v: &[u8]) -> std::result::Result<SyncId, E> {
        let bytes: [u8; SYNC_ID_LEN] = v
            .try_into()
            .map_err(|_| E::custom(format!("expected {SYNC_ID_LEN} bytes, got {}", v.len())))?;
        Ok(SyncId(bytes))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<SyncId, A::Error> {
        let mut bytes = [0u8; SYNC_ID_LEN];
        for (i, slot) in bytes.iter_mut().enumerate() {
            *slot = seq
                .next_element()?
                .ok_or_else(|| A::Error::invalid_length(i, &self))?;
        }
        Ok(SyncId(bytes))
    }
}

impl<'de> Deserialize<'de> for SyncId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_bytes(SyncIdVisitor)
    }
}

/// The store's fid-partitioned primary key, as recovered by
/// [`SyncId::decode_to_primary_key`]. Layout: `[family-prefix | fid(4) |
/// set-postfix(1) | timestamp(4) | hash(20)]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKey {
    pub family_prefix: u8,
    pub fid: Fid,
    pub set_postfix: u8,
    pub timestamp: Timestamp,
    pub hash: Hash20,
}

impl PrimaryKey {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + 4 + 1 + 4 + HASH_LEN);
        out.push(self.family_prefix);
        out.extend_from_slice(&(self.fid.as_u64() as u32).to_be_bytes());
        out.push(self.set_postfix);
        out.extend_from_slice(&self.timestamp.as_u32().to_be_bytes());
        out.extend_from_slice(self.hash.as_bytes());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestMessage {
        fid: Fid,
        msg_type: MsgType,
        timestamp: Timestamp,
        hash: Hash20,
        set_postfix: u8,
    }

    impl Message for TestMessage {
        fn fid(&self) -> Fid {
            self.fid
        }
        fn msg_type(&self) -> MsgType {
            self.msg_type
        }
        fn timestamp(&self) -> Timestamp {
            self.timestamp
        }
        fn hash(&self) -> Hash20 {
            self.hash
        }
        fn set_postfix(&self) -> u8 {
            self.set_postfix
        }
    }

    fn msg(fid: u64, ts: u32, seed: &[u8]) -> TestMessage {
        TestMessage {
            fid: Fid::new(fid),
            msg_type: MsgType::new(1),
            timestamp: Timestamp::new(ts),
            hash: Hash20::hash(seed),
            set_postfix: 1,
        }
    }

    #[test]
    fn encode_produces_40_bytes_with_ascii_timestamp_prefix() {
        let id = SyncId::encode(&msg(7, 1665182332, b"m1"));
        assert_eq!(id.as_bytes().len(), SYNC_ID_LEN);
        assert_eq!(id.timestamp_prefix(), b"1665182332");
    }

    #[test]
    fn decode_to_primary_key_round_trips_timestamp_and_fid() {
        let m = msg(99, 1665182343, b"m2");
        let id = SyncId::encode(&m);
        let pk = id.decode_to_primary_key().unwrap();
        assert_eq!(pk.fid, m.fid);
        assert_eq!(pk.timestamp, m.timestamp);
        assert_eq!(pk.hash, m.hash);
        assert_eq!(pk.family_prefix, FAMILY_PREFIX);
    }

    #[test]
    fn fid_overflowing_four_bytes_truncates_rather_than_failing() {
        let m = msg(u64::from(u32::MAX) + 10, 1665182332, b"m3");
        let id = SyncId::encode(&m);
        assert_eq!(id.fid(), Fid::from_be_bytes(9u32.to_be_bytes()));
    }

    #[test]
    fn ordering_is_lexicographic_by_timestamp_prefix() {
        let a = SyncId::encode(&msg(1, 1665182332, b"a"));
        let b = SyncId::encode(&msg(1, 1665182343, b"b"));
        assert!(a < b);
    }
}
