#![deny(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

//! Merkle radix trie keyed by [`hub_core::SyncId`].

pub mod node;
pub mod snapshot;
pub mod trie;

pub use node::{TrieNode, COMPACTION_DEPTH};
pub use snapshot::{ChildMetadata, NodeMetadata, TrieSnapshot};
pub use trie::MerkleTrie;
