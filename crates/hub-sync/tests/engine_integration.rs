//! End-to-end exercise of `SyncEngine` against in-memory `LocalStore`/
//! `PeerClient` mocks: no network, no real persistence, just enough state
//! to drive the divergence walk and the recovery path for real.

use std::sync::Arc;

use hub_core::{Fid, Hash20, HubError, Message, MsgType, Timestamp};
use hub_sync::testutil::{MemoryPeer, MemoryStore};
use hub_sync::{IdRegistryEvent, SyncEngine};

const SIGNER_MSG_TYPE: MsgType = MsgType::new(0);
const REGULAR_MSG_TYPE: MsgType = MsgType::new(1);

#[derive(Debug, Clone, PartialEq, Eq)]
struct TestMessage {
    fid: Fid,
    msg_type: MsgType,
    timestamp: Timestamp,
    seed: &'static str,
}

impl Message for TestMessage {
    fn fid(&self) -> Fid {
        self.fid
    }
    fn msg_type(&self) -> MsgType {
        self.msg_type
    }
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
    fn hash(&self) -> Hash20 {
        Hash20::hash(self.seed.as_bytes())
    }
    fn set_postfix(&self) -> u8 {
        self.msg_type.0
    }
}

#[tokio::test]
async fn fetch_missing_hashes_and_merge_converges_with_peer() {
    let shared_prefix: u32 = 1_700_000_000;
    let fid = Fid::new(1);

    let peer_messages = vec![
        TestMessage {
            fid,
            msg_type: REGULAR_MSG_TYPE,
            timestamp: Timestamp::new(shared_prefix),
            seed: "a",
        },
        TestMessage {
            fid,
            msg_type: REGULAR_MSG_TYPE,
            timestamp: Timestamp::new(shared_prefix + 1),
            seed: "b",
        },
    ];
    let peer = MemoryPeer::new(peer_messages, Vec::new(), Vec::new());

    let store = Arc::new(MemoryStore::<TestMessage>::new());
    store.known_fids.lock().await.insert(fid);
    let engine = SyncEngine::new(Arc::clone(&store));
    engine.initialize().await.unwrap();

    let prefix = shared_prefix.to_string().into_bytes();
    let sync_ids = engine.fetch_missing_hashes_by_prefix(&prefix, &peer).await.unwrap();
    assert_eq!(sync_ids.len(), 2);

    let metrics = engine.fetch_and_merge_messages(sync_ids, &peer).await.unwrap();
    assert_eq!(metrics.messages_fetched, 2);
    assert_eq!(metrics.messages_merged, 2);
    assert_eq!(store.messages.lock().await.len(), 2);
}

#[tokio::test]
async fn fetch_missing_hashes_descends_past_large_subtrees() {
    let shared_prefix: u32 = 1_700_000_100;
    let fid = Fid::new(7);

    // More than HASHES_PER_FETCH siblings under the shared prefix forces the
    // walk to descend by child hash rather than fetching the whole subtree
    // in one `get_sync_ids_by_prefix` call.
    let peer_messages: Vec<TestMessage> = (0..60)
        .map(|i| TestMessage {
            fid,
            msg_type: REGULAR_MSG_TYPE,
            timestamp: Timestamp::new(shared_prefix),
            seed: Box::leak(i.to_string().into_boxed_str()),
        })
        .collect();
    let peer = MemoryPeer::new(peer_messages, Vec::new(), Vec::new());

    let store = Arc::new(MemoryStore::<TestMessage>::new());
    store.known_fids.lock().await.insert(fid);
    let engine = SyncEngine::new(Arc::clone(&store));
    engine.initialize().await.unwrap();

    let prefix = shared_prefix.to_string().into_bytes();
    let sync_ids = engine.fetch_missing_hashes_by_prefix(&prefix, &peer).await.unwrap();
    assert_eq!(sync_ids.len(), 60);

    let metrics = engine.fetch_and_merge_messages(sync_ids, &peer).await.unwrap();
    assert_eq!(metrics.messages_merged, 60);
}

#[tokio::test]
async fn unknown_signer_triggers_registry_and_signer_recovery_before_retry() {
    let fid = Fid::new(42);
    let ts: u32 = 1_700_000_200;

    let regular = TestMessage {
        fid,
        msg_type: REGULAR_MSG_TYPE,
        timestamp: Timestamp::new(ts),
        seed: "r",
    };
    let signer = TestMessage {
        fid,
        msg_type: SIGNER_MSG_TYPE,
        timestamp: Timestamp::new(ts - 10),
        seed: "s",
    };
    let registry_event = IdRegistryEvent::new(fid, vec![1, 2, 3]);
    let peer = MemoryPeer::new(Vec::new(), vec![registry_event], vec![signer]);

    // The local store has never seen this fid, so the first merge attempt
    // is expected to fail before recovery kicks in.
    let store = Arc::new(MemoryStore::<TestMessage>::new());
    let engine = SyncEngine::new(Arc::clone(&store));

    let results = engine.merge_messages(vec![regular], &peer).await;
    assert_eq!(results.len(), 1);
    assert!(results[0].is_ok(), "expected recovery to let the retry succeed: {:?}", results[0]);

    assert!(store.known_fids.lock().await.contains(&fid));
    assert!(store.messages.lock().await.values().any(|m| m.seed == "r"));
}

#[tokio::test]
async fn unknown_signer_without_peer_registry_event_stays_failed() {
    let fid = Fid::new(99);
    let regular = TestMessage {
        fid,
        msg_type: REGULAR_MSG_TYPE,
        timestamp: Timestamp::new(1_700_000_300),
        seed: "orphan",
    };
    // Peer has nothing for this fid either.
    let peer = MemoryPeer::new(Vec::new(), Vec::new(), Vec::new());

    let store = Arc::new(MemoryStore::<TestMessage>::new());
    let engine = SyncEngine::new(Arc::clone(&store));

    let results = engine.merge_messages(vec![regular], &peer).await;
    assert!(results[0].is_err());
    assert!(store.messages.lock().await.is_empty());
}

/// A store that always rejects a merge with `BadRequest{ValidationFailure}`
/// until the signer fid is marked trusted, modeling a signature-validation
/// failure rather than an outright-unknown fid — the other shape
/// `is_recoverable_dependency_failure` treats as recoverable.
struct ValidationGatedStore {
    inner: MemoryStore<TestMessage>,
}

#[async_trait::async_trait]
impl hub_sync::LocalStore for ValidationGatedStore {
    type Message = TestMessage;

    async fn for_each_message(
        &self,
        visit: &mut (dyn FnMut(&Self::Message) + Send),
    ) -> hub_core::Result<()> {
        self.inner.for_each_message(visit).await
    }

    async fn merge_message(&self, message: Self::Message) -> hub_core::Result<()> {
        if !self.inner.known_fids.lock().await.contains(&message.fid) {
            return Err(HubError::validation_failure(format!(
                "signer for fid {} not yet verified",
                message.fid
            )));
        }
        self.inner.merge_message(message).await
    }

    async fn merge_id_registry_event(&self, event: IdRegistryEvent) -> hub_core::Result<()> {
        self.inner.merge_id_registry_event(event).await
    }

    fn subscribe(&self) -> tokio::sync::broadcast::Receiver<hub_sync::StoreEvent<Self::Message>> {
        self.inner.subscribe()
    }
}

#[tokio::test]
async fn bad_request_validation_failure_also_triggers_recovery() {
    let fid = Fid::new(55);
    let ts: u32 = 1_700_000_400;

    let regular = TestMessage {
        fid,
        msg_type: REGULAR_MSG_TYPE,
        timestamp: Timestamp::new(ts),
        seed: "v",
    };
    let signer = TestMessage {
        fid,
        msg_type: SIGNER_MSG_TYPE,
        timestamp: Timestamp::new(ts - 10),
        seed: "signer-v",
    };
    let registry_event = IdRegistryEvent::new(fid, vec![9, 9, 9]);
    let peer = MemoryPeer::new(Vec::new(), vec![registry_event], vec![signer]);

    let store = Arc::new(ValidationGatedStore {
        inner: MemoryStore::new(),
    });
    let engine = SyncEngine::new(Arc::clone(&store));

    let results = engine.merge_messages(vec![regular], &peer).await;
    assert_eq!(results.len(), 1);
    assert!(
        results[0].is_ok(),
        "ValidationFailure should recover the same way NotFound does: {:?}",
        results[0]
    );
    assert!(store.inner.messages.lock().await.values().any(|m| m.seed == "v"));
}

#[test]
fn default_snapshot_prefix_is_nine_ascii_digits() {
    let store = Arc::new(MemoryStore::<TestMessage>::new());
    let engine = SyncEngine::new(store);
    let prefix = engine.default_snapshot_prefix();
    assert_eq!(prefix.len(), hub_core::TIMESTAMP_PREFIX_LEN - 1);
    assert!(prefix.iter().all(u8::is_ascii_digit));
}
