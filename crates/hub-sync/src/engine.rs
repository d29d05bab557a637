//! `SyncEngine`: the stateful core that owns a [`MerkleTrie`] mirror of a
//! [`LocalStore`] and drives one round of divergence discovery against a
//! [`PeerClient`]. The engine itself never schedules rounds or retries a
//! failed one — that is the outer scheduler's job, kept deliberately
//! separate from the round's mechanics.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use tokio::sync::{broadcast, RwLock};

use hub_core::error::BadRequestKind;
use hub_core::{Hash20, HubError, Message, PeerId, Result};
use hub_trie::MerkleTrie;

use crate::events::{SyncEvent, SyncMetrics};
use crate::peer::PeerClient;
use crate::store::{LocalStore, StoreEvent};

/// Capacity of the `SyncEvent` broadcast channel. Generous relative to how
/// often rounds run; a slow/absent subscriber just lags and drops events,
/// it never blocks a round.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// How often `initialize` logs bootstrap progress.
const PROGRESS_LOG_INTERVAL: usize = 10_000;

/// Above this many messages under a prefix, the engine descends into
/// children instead of fetching SyncIds directly.
const HASHES_PER_FETCH: usize = 50;

/// Quantization step for `snapshotTimestamp`: both sides of
/// a sync round must land on the same prefix even if their clocks drift by
/// a few seconds.
const SYNC_THRESHOLD_SECONDS: u64 = 10;

fn is_recoverable_dependency_failure(err: &HubError) -> bool {
    matches!(
        err,
        HubError::NotFound { .. } | HubError::BadRequest { kind: BadRequestKind::ValidationFailure, .. }
    )
}

/// Clears `is_syncing` on every exit path out of [`SyncEngine::perform_sync`],
/// including early returns and panics unwound through `?`.
struct SyncGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Owns the in-memory trie mirror and drives sync rounds against peers.
///
/// Generic over the store so callers can plug in whatever backing
/// persistence they have; the trie itself is always the in-process
/// structure from `hub-trie`.
pub struct SyncEngine<S: LocalStore> {
    store: Arc<S>,
    trie: RwLock<MerkleTrie>,
    is_syncing: AtomicBool,
    events: broadcast::Sender<SyncEvent>,
}

impl<S: LocalStore> SyncEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            trie: RwLock::new(MerkleTrie::new()),
            is_syncing: AtomicBool::new(false),
            events,
        }
    }

    /// Subscribe to `SyncEvent`s emitted at the start and end of each round.
    /// Mirrors [`LocalStore::subscribe`]'s fan-out-to-many-listeners shape.
    pub fn subscribe_events(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// `initialize()`: walk every stored message once, encode
    /// it, and insert into the trie. Logs progress every
    /// [`PROGRESS_LOG_INTERVAL`] messages rather than per-insert, since a
    /// hub's full message set can run into the millions.
    pub async fn initialize(&self) -> Result<()> {
        let mut sync_ids = Vec::new();
        self.store
            .for_each_message(&mut |message: &S::Message| {
                sync_ids.push(hub_core::SyncId::encode(message));
            })
            .await?;

        let total = sync_ids.len();
        let mut trie = self.trie.write().await;
        for (inserted, sync_id) in sync_ids.iter().enumerate() {
            trie.insert(sync_id)?;
            if (inserted + 1) % PROGRESS_LOG_INTERVAL == 0 {
                tracing::debug!(inserted = inserted + 1, total, "trie bootstrap progress");
            }
        }
        tracing::debug!(total, "trie bootstrap complete");
        Ok(())
    }

    /// Applies one event from [`LocalStore::subscribe`] to the trie mirror.
    /// `MergeMessage.deleted` is removed alongside inserting the merged
    /// message, since a merge can supersede an existing entry for the same
    /// fid/type.
    pub async fn apply_store_event(&self, event: StoreEvent<S::Message>) -> Result<()> {
        let mut trie = self.trie.write().await;
        match event {
            StoreEvent::MergeMessage { message, deleted } => {
                trie.insert(&hub_core::SyncId::encode(&message))?;
                for victim in &deleted {
                    trie.delete(&hub_core::SyncId::encode(victim))?;
                }
            }
            StoreEvent::PruneMessage { message } | StoreEvent::RevokeMessage { message } => {
                trie.delete(&hub_core::SyncId::encode(&message))?;
            }
            StoreEvent::MergeIdRegistryEvent { .. } | StoreEvent::MergeNameRegistryEvent { .. } => {}
        }
        Ok(())
    }

    /// Drains a store event stream until it closes, applying each event to
    /// the trie. A lagged receiver only drops events (the trie will catch
    /// back up at the next bootstrap); it never kills the listener.
    pub async fn run_event_listener(&self, mut receiver: broadcast::Receiver<StoreEvent<S::Message>>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(err) = self.apply_store_event(event).await {
                        tracing::warn!(error = %err, "failed to apply store event to trie");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "store event listener lagged; dropping skipped events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    /// `snapshotTimestamp()`: current time, floored to a
    /// 10-second bucket so both peers in a round land on the same prefix.
    pub fn snapshot_timestamp(&self) -> u32 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        ((now / SYNC_THRESHOLD_SECONDS) * SYNC_THRESHOLD_SECONDS) as u32
    }

    /// The default divergence prefix: the 10-digit ASCII timestamp with its
    /// always-zero trailing digit dropped, leaving 9 bytes — the
    /// quantization in `snapshot_timestamp` guarantees that dropped digit
    /// is always `0`.
    pub fn default_snapshot_prefix(&self) -> Vec<u8> {
        let ts = self.snapshot_timestamp();
        let ascii = format!("{ts:0width$}", width = hub_core::TIMESTAMP_PREFIX_LEN);
        ascii.into_bytes()[..hub_core::TIMESTAMP_PREFIX_LEN - 1].to_vec()
    }

    /// `shouldSync(peerExcludedHashes)`: false while a round is
    /// already advisory-locked in, or when the local snapshot already
    /// matches the peer's.
    pub async fn should_sync(&self, peer_excluded_hashes: &[Hash20]) -> bool {
        if self.is_syncing.load(Ordering::SeqCst) {
            return false;
        }
        let prefix = self.default_snapshot_prefix();
        let local = self.trie.read().await.get_snapshot(&prefix);
        local.excluded_hashes.len() != peer_excluded_hashes.len()
            || local
                .excluded_hashes
                .iter()
                .zip(peer_excluded_hashes.iter())
                .any(|(a, b)| a != b)
    }

    /// `performSync(peerExcludedHashes, peer)`. Sets `is_syncing` for the
    /// duration of the round, advisory only: a preempted check-then-set can
    /// let a second round start concurrently, which is fine because rounds
    /// are idempotent, so the flag is not itself a mutex. Emits a
    /// [`SyncEvent`] on [`subscribe_events`](Self::subscribe_events) at the
    /// start of the round and again on every exit, successful or not.
    pub async fn perform_sync(
        &self,
        peer_excluded_hashes: &[Hash20],
        peer: &(dyn PeerClient<Message = S::Message> + Send + Sync),
        peer_id: &PeerId,
    ) -> Result<SyncMetrics> {
        self.is_syncing.store(true, Ordering::SeqCst);
        let _guard = SyncGuard { flag: &self.is_syncing };

        let started_at = Instant::now();
        tracing::debug!(peer = %peer_id, "sync round started");
        let _ = self.events.send(SyncEvent::started(peer_id.clone()));

        let result = self.perform_sync_inner(peer_excluded_hashes, peer).await;
        let duration_ms = started_at.elapsed().as_millis() as u64;
        let result = result.map(|metrics| SyncMetrics { duration_ms, ..metrics });

        match &result {
            Ok(metrics) => {
                tracing::debug!(
                    peer = %peer_id,
                    messages_fetched = metrics.messages_fetched,
                    messages_merged = metrics.messages_merged,
                    duration_ms,
                    "sync round completed"
                );
                let _ = self.events.send(SyncEvent::completed(peer_id.clone(), *metrics));
            }
            Err(err) => {
                tracing::warn!(peer = %peer_id, error = %err, "sync round failed");
                let _ = self.events.send(SyncEvent::failed(peer_id.clone(), err.to_string(), 0, false));
            }
        }

        result
    }

    async fn perform_sync_inner(
        &self,
        peer_excluded_hashes: &[Hash20],
        peer: &(dyn PeerClient<Message = S::Message> + Send + Sync),
    ) -> Result<SyncMetrics> {
        let prefix = self.default_snapshot_prefix();
        let divergence_prefix = {
            let trie = self.trie.read().await;
            trie.get_divergence_prefix(&prefix, peer_excluded_hashes)
        };

        let sync_ids = self.fetch_missing_hashes_by_prefix(&divergence_prefix, peer).await?;
        self.fetch_and_merge_messages(sync_ids, peer).await
    }

    /// `fetchMissingHashesByPrefix(prefix, peer)`: recursively
    /// narrow to prefixes where the peer's subtree hash differs from ours,
    /// stopping and fetching SyncIds directly once a subtree is small
    /// enough ([`HASHES_PER_FETCH`]).
    pub fn fetch_missing_hashes_by_prefix<'a>(
        &'a self,
        prefix: &'a [u8],
        peer: &'a (dyn PeerClient<Message = S::Message> + Send + Sync),
    ) -> Pin<Box<dyn Future<Output = Result<Vec<hub_core::SyncId>>> + Send + 'a>> {
        Box::pin(async move {
            let their_node = peer.get_metadata_by_prefix(prefix).await?;

            if their_node.num_messages as usize <= HASHES_PER_FETCH {
                return peer.get_sync_ids_by_prefix(prefix).await;
            }

            let our_node = {
                let trie = self.trie.read().await;
                trie.get_trie_node_metadata(prefix)
            };

            let mut missing = Vec::new();
            for child in &their_node.children {
                let our_hash = our_node
                    .as_ref()
                    .and_then(|n| n.children.iter().find(|c| c.prefix == child.prefix))
                    .map(|c| c.hash)
                    .unwrap_or_else(hub_core::empty_hash);

                if our_hash != child.hash {
                    let nested = self.fetch_missing_hashes_by_prefix(&child.prefix, peer).await?;
                    missing.extend(nested);
                }
            }
            Ok(missing)
        })
    }

    /// `fetchAndMergeMessages(syncIds, peer)`.
    pub async fn fetch_and_merge_messages(
        &self,
        sync_ids: Vec<hub_core::SyncId>,
        peer: &(dyn PeerClient<Message = S::Message> + Send + Sync),
    ) -> Result<SyncMetrics> {
        if sync_ids.is_empty() {
            return Ok(SyncMetrics::default());
        }

        let messages_fetched = sync_ids.len() as u64;
        let messages = peer.get_messages_by_sync_ids(&sync_ids).await?;
        let results = self.merge_messages(messages, peer).await;
        let messages_merged = results.iter().filter(|r| r.is_ok()).count() as u64;

        Ok(SyncMetrics {
            messages_fetched,
            messages_merged,
            duration_ms: 0,
        })
    }

    /// `mergeMessages(messages, peer) -> list<Result>`: merges
    /// in ascending timestamp order so a message's dependencies (signer
    /// registration, prior state) land before it whenever both are present
    /// in the same batch.
    pub async fn merge_messages(
        &self,
        mut messages: Vec<S::Message>,
        peer: &(dyn PeerClient<Message = S::Message> + Send + Sync),
    ) -> Vec<Result<()>> {
        messages.sort_by_key(|m| m.timestamp().as_u32());

        let mut results = Vec::with_capacity(messages.len());
        for message in messages {
            let first_attempt = self.store.merge_message(message.clone()).await;
            let outcome = match &first_attempt {
                Err(err) if is_recoverable_dependency_failure(err) => {
                    self.sync_user_and_retry_message(message, peer).await
                }
                _ => first_attempt,
            };
            results.push(outcome);
        }
        results
    }

    /// `syncUserAndRetryMessage(message, peer)`: recovery path for a
    /// message whose signer is unknown locally. Pulls
    /// the fid's identity-registry event and signer-add messages from the
    /// peer, merges them, then retries the original message once.
    async fn sync_user_and_retry_message(
        &self,
        message: S::Message,
        peer: &(dyn PeerClient<Message = S::Message> + Send + Sync),
    ) -> Result<()> {
        let fid = message.fid();

        let registry_event = peer
            .get_id_registry_event_by_fid(fid)
            .await
            .map_err(|_| HubError::network_failure(format!("fetching id registry event for fid {fid}")))?;
        self.store
            .merge_id_registry_event(registry_event)
            .await
            .map_err(|_| HubError::storage_failure(format!("merging id registry event for fid {fid}")))?;

        let signer_messages = peer
            .get_all_signer_messages_by_fid(fid)
            .await
            .map_err(|_| HubError::network_failure(format!("fetching signer messages for fid {fid}")))?;
        let signer_results = self.store.merge_messages(signer_messages).await;
        let any_signer_merged = signer_results.iter().any(Result::is_ok);

        if any_signer_merged {
            self.store.merge_message(message).await
        } else {
            Err(HubError::not_found(format!(
                "no signer merged for fid {fid}; cannot retry message"
            )))
        }
    }

    /// Read-only access to the trie mirror, for diagnostics and the
    /// `GetInfo`/`GetSyncMetadataByPrefix`/`GetSyncSnapshotByPrefix` RPC
    /// surface.
    pub async fn root_hash(&self) -> String {
        self.trie.read().await.root_hash()
    }

    pub async fn get_snapshot(&self, prefix: &[u8]) -> hub_trie::TrieSnapshot {
        self.trie.read().await.get_snapshot(prefix)
    }

    pub async fn get_trie_node_metadata(&self, prefix: &[u8]) -> Option<hub_trie::NodeMetadata> {
        self.trie.read().await.get_trie_node_metadata(prefix)
    }

    pub fn is_syncing(&self) -> bool {
        self.is_syncing.load(Ordering::SeqCst)
    }
}
