//! Wire request/response shapes for the RPC surface.
//!
//! The gRPC service itself is out of scope; these are the plain serde
//! types a transport would put on the wire, with an explicit schema
//! version so incompatible changes fail loudly instead of silently.

use serde::{Deserialize, Serialize};

use hub_core::{Hash20, SyncId};

/// Bumped whenever a wire shape in this module changes incompatibly.
pub const SYNC_WIRE_SCHEMA_VERSION: u16 = 1;

/// `GetInfo()` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetInfoResponse {
    pub schema_version: u16,
    pub version: String,
    pub is_synced: bool,
    pub nickname: String,
    pub root_hash: String,
}

impl GetInfoResponse {
    pub fn new(version: impl Into<String>, is_synced: bool, nickname: impl Into<String>, root_hash: String) -> Self {
        Self {
            schema_version: SYNC_WIRE_SCHEMA_VERSION,
            version: version.into(),
            is_synced,
            nickname: nickname.into(),
            root_hash,
        }
    }
}

/// `GetAllSyncIdsByPrefix(prefix) -> SyncIds`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetAllSyncIdsByPrefixRequest {
    pub prefix: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetAllSyncIdsByPrefixResponse {
    pub sync_ids: Vec<SyncId>,
}

/// `GetAllMessagesBySyncIds(syncIds) -> Messages`. The message
/// payload itself is opaque to the core; the wire type carries
/// only the pre-serialized bytes a message store would hand back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetAllMessagesBySyncIdsRequest {
    pub sync_ids: Vec<SyncId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetAllMessagesBySyncIdsResponse {
    pub messages: Vec<Vec<u8>>,
}

/// One child entry inside a [`TrieNodeMetadataResponse`]; `children` is
/// always empty here: the response carries one level of children, and
/// `children[i].children` is always empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildMetadataResponse {
    pub prefix: Vec<u8>,
    pub num_messages: u64,
    pub hash: Hash20,
}

/// `GetSyncMetadataByPrefix(prefix) -> TrieNodeMetadataResponse`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrieNodeMetadataResponse {
    pub prefix: Vec<u8>,
    pub num_messages: u64,
    pub hash: Hash20,
    pub children: Vec<ChildMetadataResponse>,
}

impl From<hub_trie::NodeMetadata> for TrieNodeMetadataResponse {
    fn from(metadata: hub_trie::NodeMetadata) -> Self {
        Self {
            prefix: metadata.prefix,
            num_messages: metadata.num_messages,
            hash: metadata.hash,
            children: metadata
                .children
                .into_iter()
                .map(|c| ChildMetadataResponse {
                    prefix: c.prefix,
                    num_messages: c.num_messages,
                    hash: c.hash,
                })
                .collect(),
        }
    }
}

/// `GetSyncSnapshotByPrefix(prefix) -> TrieNodeSnapshotResponse`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrieNodeSnapshotResponse {
    pub prefix: Vec<u8>,
    pub num_messages: u64,
    pub root_hash: String,
    pub excluded_hashes: Vec<Hash20>,
}

/// `Subscribe({eventTypes[]})` request. Empty `event_types` means all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub event_types: Vec<EventType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    MergeMessage,
    PruneMessage,
    RevokeMessage,
    MergeIdRegistryEvent,
    MergeNameRegistryEvent,
}

/// A frame on the `Subscribe` stream. The server emits a `Ready` frame once
/// listeners are attached, then one frame per store event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventResponse {
    Ready,
    MergeMessage { sync_id: SyncId, deleted: Vec<SyncId> },
    PruneMessage { sync_id: SyncId },
    RevokeMessage { sync_id: SyncId },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_metadata_converts_to_wire_response() {
        let metadata = hub_trie::NodeMetadata {
            prefix: b"16651823".to_vec(),
            num_messages: 2,
            hash: Hash20::hash(b"root"),
            children: vec![hub_trie::ChildMetadata {
                prefix: b"166518233".to_vec(),
                num_messages: 1,
                hash: Hash20::hash(b"child"),
            }],
        };
        let response: TrieNodeMetadataResponse = metadata.into();
        assert_eq!(response.children.len(), 1);
        assert!(response.children[0].prefix.ends_with(b"3"));
    }
}
