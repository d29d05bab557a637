//! Abstract local capability: the message store the engine reads at
//! startup and writes merged messages back into, plus the event stream it
//! listens to for incremental updates.

use async_trait::async_trait;
use tokio::sync::broadcast;

use hub_core::{Fid, Result};

/// Opaque identity-registry event (`mergeIdRegistryEvent`).
/// The core never inspects `body`; it only routes it to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdRegistryEvent {
    pub fid: Fid,
    pub body: Vec<u8>,
}

impl IdRegistryEvent {
    pub fn new(fid: Fid, body: Vec<u8>) -> Self {
        Self { fid, body }
    }
}

/// One event from the store's listener stream. `MergeMessage.deleted`
/// carries any messages the
/// merge superseded, which the engine also removes from the trie.
#[derive(Debug, Clone)]
pub enum StoreEvent<M> {
    MergeMessage { message: M, deleted: Vec<M> },
    PruneMessage { message: M },
    RevokeMessage { message: M },
    MergeIdRegistryEvent { event: IdRegistryEvent },
    MergeNameRegistryEvent { event: IdRegistryEvent },
}

/// Abstract local store capability.
#[async_trait]
pub trait LocalStore: Send + Sync {
    type Message: hub_core::Message + Clone + Send + Sync + 'static;

    /// `forEachMessage(fn)`: iterate all stored messages, in whatever order
    /// the store holds them (the engine only needs to see each one once,
    /// during bootstrap).
    async fn for_each_message(&self, visit: &mut (dyn FnMut(&Self::Message) + Send)) -> Result<()>;

    /// `mergeMessage(m) -> Result<void>`.
    async fn merge_message(&self, message: Self::Message) -> Result<()>;

    /// `mergeMessages(list<m>) -> list<Result<void>>`.
    async fn merge_messages(&self, messages: Vec<Self::Message>) -> Vec<Result<()>> {
        let mut results = Vec::with_capacity(messages.len());
        for message in messages {
            results.push(self.merge_message(message).await);
        }
        results
    }

    /// `mergeIdRegistryEvent(e) -> Result<void>`.
    async fn merge_id_registry_event(&self, event: IdRegistryEvent) -> Result<()>;

    /// Subscribe to the store's `mergeMessage`/`pruneMessage`/`revokeMessage`
    /// event source. A `broadcast` channel mirrors the
    /// fan-out a real store would offer to multiple listeners.
    fn subscribe(&self) -> broadcast::Receiver<StoreEvent<Self::Message>>;
}
