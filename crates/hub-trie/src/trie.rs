//! `MerkleTrie`: thin wrapper around the root [`TrieNode`].

use hub_core::{Hash20, Result, SyncId};

use crate::node::TrieNode;
use crate::snapshot::{ChildMetadata, NodeMetadata, TrieSnapshot};

/// Owns the root node and exposes the public insert/delete/exists/snapshot
/// surface the sync engine and the RPC façade call into.
#[derive(Debug, Clone, Default)]
pub struct MerkleTrie {
    root: TrieNode,
}

impl MerkleTrie {
    pub fn new() -> Self {
        Self {
            root: TrieNode::new(),
        }
    }

    /// `rootHash`: 40-char hex, or the empty string for an
    /// empty trie — deliberately distinct from the node's internal
    /// `EMPTY_HASH`; see `DESIGN.md` for the resolved open question.
    pub fn root_hash(&self) -> String {
        if self.root.items() == 0 {
            String::new()
        } else {
            self.root.hash().to_hex()
        }
    }

    pub fn items(&self) -> u64 {
        self.root.items()
    }

    pub fn insert(&mut self, key: &SyncId) -> Result<bool> {
        self.root.insert(key, 0)
    }

    pub fn delete(&mut self, key: &SyncId) -> Result<bool> {
        self.root.delete(key, 0)
    }

    pub fn exists(&self, key: &SyncId) -> Result<bool> {
        self.root.exists(key, 0)
    }

    pub fn get_all_values(&self) -> Vec<SyncId> {
        self.root.get_all_values()
    }

    /// Forces a full bottom-up hash recompute, for use after a bulk load
    /// that bypassed the normal per-insert path update.
    pub fn recalculate_hash(&mut self) {
        self.root.recalculate_hash();
    }

    /// `getSnapshot(prefix)`. Callers must treat the returned
    /// `TrieSnapshot::prefix` as authoritative, not the prefix they passed,
    /// since it may be truncated if the trie runs out of matching children.
    pub fn get_snapshot(&self, prefix: &[u8]) -> TrieSnapshot {
        self.root.get_snapshot(prefix, 0)
    }

    /// `getTrieNodeMetadata(prefix)`: one level of children,
    /// for RPC serialization (`GetSyncMetadataByPrefix`).
    pub fn get_trie_node_metadata(&self, prefix: &[u8]) -> Option<NodeMetadata> {
        let node = self.root.get_node(prefix)?;
        let children = node
            .children()
            .map(|(byte, child)| {
                let mut child_prefix = prefix.to_vec();
                child_prefix.push(byte);
                ChildMetadata {
                    prefix: child_prefix,
                    num_messages: child.items(),
                    hash: child.hash(),
                }
            })
            .collect();
        Some(NodeMetadata {
            prefix: prefix.to_vec(),
            num_messages: node.items(),
            hash: node.hash(),
            children,
        })
    }

    /// `getDivergencePrefix(prefix, peerExcludedHashes)`.
    pub fn get_divergence_prefix(&self, prefix: &[u8], peer_excluded_hashes: &[Hash20]) -> Vec<u8> {
        if peer_excluded_hashes.is_empty() {
            return Vec::new();
        }

        let local = self.get_snapshot(prefix);
        let compare_len = local.excluded_hashes.len().min(peer_excluded_hashes.len());

        for i in 0..compare_len {
            if local.excluded_hashes[i] != peer_excluded_hashes[i] {
                return local.prefix[..i.min(local.prefix.len())].to_vec();
            }
        }

        let shorter_len = local.excluded_hashes.len().min(peer_excluded_hashes.len());
        local.prefix[..shorter_len.min(local.prefix.len())].to_vec()
    }
}
