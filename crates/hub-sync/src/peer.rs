//! Abstract remote capability: everything the engine needs from a peer,
//! uniform on `Result<T, HubError>` regardless of transport. A trait
//! boundary standing in for a collaborator the core does not own —
//! peer discovery and transport are out of scope here.

use async_trait::async_trait;

use hub_core::{Fid, Result, SyncId};
use hub_trie::NodeMetadata;

use crate::store::IdRegistryEvent;

/// Abstract remote peer capability.
///
/// Generic over the concrete message type so the core never needs to know
/// the application payload: opaque to the core except for a handful of
/// fields it needs to compute a `SyncId`.
#[async_trait]
pub trait PeerClient: Send + Sync {
    type Message: hub_core::Message + Clone + Send + Sync + 'static;

    /// `getMetadataByPrefix(prefix) -> NodeMetadata` (one level of children).
    async fn get_metadata_by_prefix(&self, prefix: &[u8]) -> Result<NodeMetadata>;

    /// `getSyncIdsByPrefix(prefix) -> list<SyncId>`.
    async fn get_sync_ids_by_prefix(&self, prefix: &[u8]) -> Result<Vec<SyncId>>;

    /// `getMessagesBySyncIds(list<SyncId>) -> list<Message>`.
    async fn get_messages_by_sync_ids(&self, sync_ids: &[SyncId]) -> Result<Vec<Self::Message>>;

    /// `getIdRegistryEventByFid(fid) -> IdRegistryEvent`.
    async fn get_id_registry_event_by_fid(&self, fid: Fid) -> Result<IdRegistryEvent>;

    /// `getAllSignerMessagesByFid(fid) -> list<Message>`.
    async fn get_all_signer_messages_by_fid(&self, fid: Fid) -> Result<Vec<Self::Message>>;
}
