//! Reusable in-memory `LocalStore`/`PeerClient` mocks for engine tests.
//!
//! No network, no real persistence: `MemoryPeer` wraps a real [`MerkleTrie`]
//! as ground truth so the divergence walk exercises real trie semantics, and
//! `MemoryStore` is just enough of a `LocalStore` to drive the bootstrap,
//! event-listener, and recovery paths a `SyncEngine` test needs.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, Mutex};

use hub_core::{Fid, HubError, Message, Result, SyncId};
use hub_trie::{MerkleTrie, NodeMetadata};

use crate::peer::PeerClient;
use crate::store::{IdRegistryEvent, LocalStore, StoreEvent};

/// In-memory `LocalStore`. Rejects a merge for any fid not already in
/// `known_fids`, so recovery-path tests can observe `merge_id_registry_event`
/// unblocking a previously-failing merge.
pub struct MemoryStore<M: Message + Clone + Send + Sync + 'static> {
    pub messages: Mutex<HashMap<SyncId, M>>,
    pub known_fids: Mutex<HashSet<Fid>>,
    sender: broadcast::Sender<StoreEvent<M>>,
}

impl<M: Message + Clone + Send + Sync + 'static> MemoryStore<M> {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(64);
        Self {
            messages: Mutex::new(HashMap::new()),
            known_fids: Mutex::new(HashSet::new()),
            sender,
        }
    }

    /// Seeds `known_fids` so merges for this fid are accepted immediately,
    /// bypassing the registry-recovery path.
    pub async fn trust_fid(&self, fid: Fid) {
        self.known_fids.lock().await.insert(fid);
    }
}

impl<M: Message + Clone + Send + Sync + 'static> Default for MemoryStore<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<M: Message + Clone + Send + Sync + 'static> LocalStore for MemoryStore<M> {
    type Message = M;

    async fn for_each_message(&self, visit: &mut (dyn FnMut(&Self::Message) + Send)) -> Result<()> {
        let messages = self.messages.lock().await;
        for message in messages.values() {
            visit(message);
        }
        Ok(())
    }

    async fn merge_message(&self, message: Self::Message) -> Result<()> {
        if !self.known_fids.lock().await.contains(&message.fid()) {
            return Err(HubError::not_found(format!("unknown fid {}", message.fid())));
        }
        let sync_id = SyncId::encode(&message);
        self.messages.lock().await.insert(sync_id, message.clone());
        let _ = self.sender.send(StoreEvent::MergeMessage {
            message,
            deleted: Vec::new(),
        });
        Ok(())
    }

    async fn merge_id_registry_event(&self, event: IdRegistryEvent) -> Result<()> {
        self.known_fids.lock().await.insert(event.fid);
        let _ = self.sender.send(StoreEvent::MergeIdRegistryEvent { event });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent<Self::Message>> {
        self.sender.subscribe()
    }
}

/// In-memory `PeerClient`. `signer_messages` is keyed by fid directly rather
/// than inferred from an application-specific message-type convention, so
/// this mock stays agnostic to any particular `msg_type` scheme.
pub struct MemoryPeer<M: Message + Clone + Send + Sync + 'static> {
    trie: MerkleTrie,
    messages: HashMap<SyncId, M>,
    registry_events: HashMap<Fid, IdRegistryEvent>,
    signer_messages: HashMap<Fid, Vec<M>>,
}

impl<M: Message + Clone + Send + Sync + 'static> MemoryPeer<M> {
    pub fn new(messages: Vec<M>, registry_events: Vec<IdRegistryEvent>, signer_messages: Vec<M>) -> Self {
        let mut trie = MerkleTrie::new();
        let mut by_id = HashMap::new();
        for message in messages {
            let sync_id = SyncId::encode(&message);
            trie.insert(&sync_id).expect("mock message stays within SyncId bounds");
            by_id.insert(sync_id, message);
        }
        let mut by_fid: HashMap<Fid, Vec<M>> = HashMap::new();
        for message in signer_messages {
            by_fid.entry(message.fid()).or_default().push(message);
        }
        Self {
            trie,
            messages: by_id,
            registry_events: registry_events.into_iter().map(|e| (e.fid, e)).collect(),
            signer_messages: by_fid,
        }
    }
}

#[async_trait]
impl<M: Message + Clone + Send + Sync + 'static> PeerClient for MemoryPeer<M> {
    type Message = M;

    async fn get_metadata_by_prefix(&self, prefix: &[u8]) -> Result<NodeMetadata> {
        self.trie
            .get_trie_node_metadata(prefix)
            .ok_or_else(|| HubError::not_found("no node at prefix"))
    }

    async fn get_sync_ids_by_prefix(&self, prefix: &[u8]) -> Result<Vec<SyncId>> {
        Ok(self
            .trie
            .get_all_values()
            .into_iter()
            .filter(|id| id.as_bytes().starts_with(prefix))
            .collect())
    }

    async fn get_messages_by_sync_ids(&self, sync_ids: &[SyncId]) -> Result<Vec<Self::Message>> {
        Ok(sync_ids.iter().filter_map(|id| self.messages.get(id).cloned()).collect())
    }

    async fn get_id_registry_event_by_fid(&self, fid: Fid) -> Result<IdRegistryEvent> {
        self.registry_events
            .get(&fid)
            .cloned()
            .ok_or_else(|| HubError::not_found(format!("no registry event for fid {fid}")))
    }

    async fn get_all_signer_messages_by_fid(&self, fid: Fid) -> Result<Vec<Self::Message>> {
        Ok(self.signer_messages.get(&fid).cloned().unwrap_or_default())
    }
}

/// Convenience alias for tests that only need a store, not a shared handle.
pub fn memory_store<M: Message + Clone + Send + Sync + 'static>() -> Arc<MemoryStore<M>> {
    Arc::new(MemoryStore::new())
}
