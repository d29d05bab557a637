//! Observability events emitted around a sync round.
//!
//! Purely additive instrumentation: the state machine itself is
//! `Idle -> Syncing -> Idle`; these events just let a caller log or alert
//! on what happened without the engine core depending on a particular
//! logging or metrics backend.

use serde::{Deserialize, Serialize};

use hub_core::PeerId;

/// Counters for one completed sync round (`performSync`). The
/// protocol is pull-only from the initiator's side — it fetches missing
/// SyncIds and messages from the peer and merges them locally — so there
/// is no "pushed" counterpart here, unlike a gossip-style broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMetrics {
    pub messages_fetched: u64,
    pub messages_merged: u64,
    pub duration_ms: u64,
}

/// Phase a sync round is in, for the event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SyncStatus {
    Started,
    Completed { metrics: SyncMetrics },
    Failed {
        error: String,
        retry_attempt: u32,
        will_retry: bool,
    },
}

/// An event emitted at the start and end of a round with a given peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncEvent {
    pub peer: PeerId,
    pub status: SyncStatus,
}

impl SyncEvent {
    pub fn started(peer: PeerId) -> Self {
        Self {
            peer,
            status: SyncStatus::Started,
        }
    }

    pub fn completed(peer: PeerId, metrics: SyncMetrics) -> Self {
        Self {
            peer,
            status: SyncStatus::Completed { metrics },
        }
    }

    pub fn failed(peer: PeerId, error: impl Into<String>, retry_attempt: u32, will_retry: bool) -> Self {
        Self {
            peer,
            status: SyncStatus::Failed {
                error: error.into(),
                retry_attempt,
                will_retry,
            },
        }
    }
}
