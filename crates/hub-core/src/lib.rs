#![deny(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

//! Shared primitives for the sync core: identifiers, the error taxonomy,
//! the BLAKE3-160 digest newtype, and the SyncId codec.
//!
//! Downstream crates (`hub-trie`, `hub-sync`) depend on this crate rather
//! than on each other's internals, keeping the shared vocabulary in one
//! place instead of duplicated across layers.

pub mod error;
pub mod hash;
pub mod identifiers;
pub mod sync_id;

pub use error::{BadRequestKind, HubError, Result, UnavailableKind};
pub use hash::{empty_hash, Hash20, HASH_LEN};
pub use identifiers::{Fid, MsgType, PeerId, Timestamp};
pub use sync_id::{Message, PrimaryKey, SyncId, FAMILY_PREFIX, SYNC_ID_LEN, TIMESTAMP_PREFIX_LEN};
