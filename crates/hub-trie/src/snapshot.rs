//! Wire-facing shapes derived from a trie walk: `TrieSnapshot` for
//! divergence comparison and `NodeMetadata` for the
//! one-level-of-children RPC response.

use serde::{Deserialize, Serialize};

use hub_core::Hash20;

/// `(prefix, excludedHashes[], numMessages)` certificate of everything a
/// trie holds outside a given path.
///
/// `prefix` is authoritative: if the trie ran out of matching children
/// partway through the requested prefix, this is the prefix actually
/// walked, shorter than what the caller asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrieSnapshot {
    pub prefix: Vec<u8>,
    pub excluded_hashes: Vec<Hash20>,
    pub num_messages: u64,
}

/// One level of children below `prefix`, for RPC serialization
/// (`getTrieNodeMetadata`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMetadata {
    pub prefix: Vec<u8>,
    pub num_messages: u64,
    pub hash: Hash20,
    pub children: Vec<ChildMetadata>,
}

/// A single child entry in [`NodeMetadata`]. `children[i].children` is
/// always empty — only one level is returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildMetadata {
    pub prefix: Vec<u8>,
    pub num_messages: u64,
    pub hash: Hash20,
}
