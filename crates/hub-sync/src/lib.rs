#![deny(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

//! Sync engine: the divergence walk over a [`hub_trie::MerkleTrie`] and the
//! effects boundary (`PeerClient`/`LocalStore`) it runs against.
//!
//! This crate never schedules rounds itself: a caller owns a `SyncEngine`,
//! decides when to call `should_sync`/`perform_sync`, and retries
//! `unavailable` failures on its own cadence rather than the engine
//! looping internally.

pub mod config;
pub mod engine;
pub mod events;
pub mod peer;
pub mod store;
#[cfg(feature = "test-util")]
pub mod testutil;
pub mod wire;

pub use config::{RetryConfig, SyncConfig};
pub use engine::SyncEngine;
pub use events::{SyncEvent, SyncMetrics, SyncStatus};
pub use peer::PeerClient;
pub use store::{IdRegistryEvent, LocalStore, StoreEvent};
