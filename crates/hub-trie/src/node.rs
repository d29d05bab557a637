//! `TrieNode`: a single node of the path-compressed Merkle radix trie
//!. Every mutation recomputes the hash on the direct path
//! only; siblings are untouched, so insert/delete cost is O(depth) rather
//! than O(size).

use std::collections::BTreeMap;

use hub_core::error::BadRequestKind;
use hub_core::{empty_hash, Hash20, HubError, Result, SyncId, SYNC_ID_LEN};

use crate::snapshot::TrieSnapshot;

/// Depth at which path compression becomes active. Bytes `[0, 10)` are the
/// ASCII timestamp prefix and are never compacted: two tries
/// must agree that structure above this depth is a plain per-byte radix
/// tree, or their hashes will never converge.
pub const COMPACTION_DEPTH: usize = 10;

fn key_exhausted(depth: usize) -> HubError {
    HubError::bad_request(
        BadRequestKind::InvalidParam,
        format!("trie traversal exceeded SyncId length at depth {depth}"),
    )
}

/// A node in the Merkle radix trie.
///
/// `children` is a `BTreeMap` rather than a hash map specifically so that
/// iteration during hashing is always in ascending byte order without an
/// extra sort step.
#[derive(Debug, Clone)]
pub struct TrieNode {
    hash: Hash20,
    items: u64,
    children: BTreeMap<u8, TrieNode>,
    key: Option<SyncId>,
}

impl Default for TrieNode {
    fn default() -> Self {
        Self::new()
    }
}

impl TrieNode {
    pub fn new() -> Self {
        Self {
            hash: empty_hash(),
            items: 0,
            children: BTreeMap::new(),
            key: None,
        }
    }

    pub fn hash(&self) -> Hash20 {
        self.hash
    }

    pub fn items(&self) -> u64 {
        self.items
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn key(&self) -> Option<&SyncId> {
        self.key.as_ref()
    }

    pub fn children(&self) -> impl Iterator<Item = (u8, &TrieNode)> {
        self.children.iter().map(|(b, n)| (*b, n))
    }

    /// insert(key, depth) -> bool. Keys are deep-copied
    /// (`SyncId` is `Copy`), never aliased to a caller buffer.
    pub fn insert(&mut self, key: &SyncId, depth: usize) -> Result<bool> {
        if depth >= COMPACTION_DEPTH && self.is_leaf() {
            match self.key {
                None => {
                    self.key = Some(*key);
                    self.items = 1;
                    self.refresh_hash();
                    return Ok(true);
                }
                Some(existing) if existing == *key => return Ok(false),
                Some(existing) => {
                    self.key = None;
                    if depth >= SYNC_ID_LEN {
                        return Err(key_exhausted(depth));
                    }
                    let byte = existing.as_bytes()[depth];
                    let mut child = TrieNode::new();
                    child.insert(&existing, depth + 1)?;
                    self.children.insert(byte, child);
                }
            }
        }

        if depth >= SYNC_ID_LEN {
            return Err(key_exhausted(depth));
        }
        let byte = key.as_bytes()[depth];
        let child = self.children.entry(byte).or_insert_with(TrieNode::new);
        let inserted = child.insert(key, depth + 1)?;
        if inserted {
            self.items += 1;
            self.refresh_hash();
        }
        Ok(inserted)
    }

    /// delete(key, depth) -> bool.
    pub fn delete(&mut self, key: &SyncId, depth: usize) -> Result<bool> {
        if self.is_leaf() {
            return Ok(match self.key {
                Some(existing) if existing == *key => {
                    self.key = None;
                    self.items = 0;
                    self.refresh_hash();
                    true
                }
                _ => false,
            });
        }

        if depth >= SYNC_ID_LEN {
            return Err(key_exhausted(depth));
        }
        let byte = key.as_bytes()[depth];
        let deleted = match self.children.get_mut(&byte) {
            Some(child) => child.delete(key, depth + 1)?,
            None => false,
        };
        if !deleted {
            return Ok(false);
        }

        self.items -= 1;
        if self.children.get(&byte).is_some_and(|c| c.items == 0) {
            self.children.remove(&byte);
        }
        if depth >= COMPACTION_DEPTH && self.children.len() == 1 {
            let only = self.children.values().next().expect("len checked above");
            if only.is_leaf() {
                if let Some(resident) = only.key {
                    self.key = Some(resident);
                    self.children.clear();
                }
            }
        }
        self.refresh_hash();
        Ok(true)
    }

    /// exists(key, depth) -> bool. Mirrors `insert`'s traversal without mutation.
    pub fn exists(&self, key: &SyncId, depth: usize) -> Result<bool> {
        if self.is_leaf() {
            return Ok(self.key == Some(*key));
        }
        if depth >= SYNC_ID_LEN {
            return Err(key_exhausted(depth));
        }
        let byte = key.as_bytes()[depth];
        match self.children.get(&byte) {
            Some(child) => child.exists(key, depth + 1),
            None => Ok(false),
        }
    }

    /// getNode(prefix) -> node?, descending byte-by-byte from this node.
    pub fn get_node(&self, prefix: &[u8]) -> Option<&TrieNode> {
        match prefix.split_first() {
            None => Some(self),
            Some((byte, rest)) => self.children.get(byte).and_then(|c| c.get_node(rest)),
        }
    }

    /// getAllValues() -> list<key>, all leaf keys below this node in trie order.
    pub fn get_all_values(&self) -> Vec<SyncId> {
        if self.is_leaf() {
            return self.key.into_iter().collect();
        }
        let mut out = Vec::new();
        for child in self.children.values() {
            out.extend(child.get_all_values());
        }
        out
    }

    /// getSnapshot(prefix, depth) -> TrieSnapshot.
    pub fn get_snapshot(&self, prefix: &[u8], depth: usize) -> TrieSnapshot {
        if depth >= prefix.len() {
            return TrieSnapshot {
                prefix: prefix.to_vec(),
                excluded_hashes: Vec::new(),
                num_messages: 0,
            };
        }

        let target = prefix[depth];
        let Some(child) = self.children.get(&target) else {
            return TrieSnapshot {
                prefix: prefix[..depth].to_vec(),
                excluded_hashes: Vec::new(),
                num_messages: 0,
            };
        };

        let excluded_hash = Hash20::hash_children(
            self.children
                .iter()
                .filter(|(byte, _)| **byte != target)
                .map(|(_, node)| &node.hash),
        );
        let excluded_items: u64 = self
            .children
            .iter()
            .filter(|(byte, _)| **byte != target)
            .map(|(_, node)| node.items)
            .sum();

        let mut result = child.get_snapshot(prefix, depth + 1);
        result.excluded_hashes.insert(0, excluded_hash);
        result.num_messages += excluded_items;
        result
    }

    /// recalculateHash(): full bottom-up recompute, used after bulk load
    /// rather than the incremental path-only update applied on
    /// every insert/delete.
    pub fn recalculate_hash(&mut self) {
        for child in self.children.values_mut() {
            child.recalculate_hash();
        }
        self.refresh_hash();
    }

    /// Recomputes this node's hash from its own state (leaf key, or its
    /// children's *already-correct* cached hashes). Callers on a mutation
    /// path call this after mutating, relying on children being up to date.
    fn refresh_hash(&mut self) {
        self.hash = if self.is_leaf() {
            match &self.key {
                Some(k) => Hash20::hash(k.as_bytes()),
                None => empty_hash(),
            }
        } else {
            Hash20::hash_children(self.children.values().map(|c| &c.hash))
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hub_core::identifiers::{Fid, MsgType, Timestamp};
    use hub_core::sync_id::Message;

    struct TestMessage {
        fid: u64,
        timestamp: u32,
        seed: &'static [u8],
    }

    impl Message for TestMessage {
        fn fid(&self) -> Fid {
            Fid::new(self.fid)
        }
        fn msg_type(&self) -> MsgType {
            MsgType::new(1)
        }
        fn timestamp(&self) -> Timestamp {
            Timestamp::new(self.timestamp)
        }
        fn hash(&self) -> Hash20 {
            Hash20::hash(self.seed)
        }
        fn set_postfix(&self) -> u8 {
            1
        }
    }

    fn id(fid: u64, ts: u32, seed: &'static [u8]) -> SyncId {
        SyncId::encode(&TestMessage {
            fid,
            timestamp: ts,
            seed,
        })
    }

    #[test]
    fn empty_node_hashes_to_empty_hash() {
        let node = TrieNode::new();
        assert_eq!(node.hash(), empty_hash());
        assert_eq!(node.items(), 0);
    }

    #[test]
    fn insert_then_exists() {
        let mut root = TrieNode::new();
        let key = id(1, 1665182332, b"a");
        assert!(root.insert(&key, 0).unwrap());
        assert!(root.exists(&key, 0).unwrap());
        assert_eq!(root.items(), 1);
    }

    #[test]
    fn insert_same_key_twice_is_idempotent() {
        let mut root = TrieNode::new();
        let key = id(1, 1665182332, b"a");
        assert!(root.insert(&key, 0).unwrap());
        let hash_once = root.hash();
        assert!(!root.insert(&key, 0).unwrap());
        assert_eq!(root.hash(), hash_once);
        assert_eq!(root.items(), 1);
    }

    #[test]
    fn delete_inverts_insert() {
        let mut root = TrieNode::new();
        let key = id(1, 1665182332, b"a");
        let empty_hash_before = root.hash();
        root.insert(&key, 0).unwrap();
        assert!(root.delete(&key, 0).unwrap());
        assert_eq!(root.hash(), empty_hash_before);
        assert_eq!(root.items(), 0);
    }

    #[test]
    fn delete_absent_is_no_op() {
        let mut root = TrieNode::new();
        let key = id(1, 1665182332, b"a");
        let hash_before = root.hash();
        assert!(!root.delete(&key, 0).unwrap());
        assert_eq!(root.hash(), hash_before);
    }

    #[test]
    fn scenario_two_messages_differing_in_ninth_digit() {
        let mut root = TrieNode::new();
        root.insert(&id(1, 1665182332, b"a"), 0).unwrap();
        root.insert(&id(2, 1665182343, b"b"), 0).unwrap();

        let prefix = b"16651823";
        let node = root.get_node(prefix).expect("prefix present");
        assert_eq!(node.items(), 2);
        let children: Vec<u8> = node.children().map(|(b, _)| b).collect();
        assert_eq!(children, vec![b'3', b'4']);
    }

    #[test]
    fn order_independence_of_insertion() {
        let keys = vec![
            id(1, 1665182332, b"a"),
            id(2, 1665182343, b"b"),
            id(3, 1665182345, b"c"),
            id(4, 1665182351, b"d"),
        ];

        let mut forward = TrieNode::new();
        for k in &keys {
            forward.insert(k, 0).unwrap();
        }

        let mut reversed = TrieNode::new();
        for k in keys.iter().rev() {
            reversed.insert(k, 0).unwrap();
        }

        assert_eq!(forward.hash(), reversed.hash());
        assert_eq!(forward.items(), reversed.items());
    }

    #[test]
    fn delete_half_symmetry() {
        let mut root = TrieNode::new();
        let keys: Vec<SyncId> = (0..20)
            .map(|i| id(i, 1665182332 + i as u32, Box::leak(i.to_string().into_boxed_str()).as_bytes()))
            .collect();
        for k in &keys {
            root.insert(k, 0).unwrap();
        }
        for k in &keys[..10] {
            assert!(root.delete(k, 0).unwrap());
        }
        for k in &keys[..10] {
            assert!(!root.exists(k, 0).unwrap());
        }
        for k in &keys[10..] {
            assert!(root.exists(k, 0).unwrap());
        }
        assert_eq!(root.items(), 10);
    }

    #[test]
    fn non_leaf_has_no_value() {
        let mut root = TrieNode::new();
        root.insert(&id(1, 1665182332, b"a"), 0).unwrap();
        root.insert(&id(2, 1665182343, b"b"), 0).unwrap();
        assert!(!root.is_leaf());
        assert_eq!(root.key(), None);
    }
}
