//! Live local copies of remote collections
//!
//! A [`SyncChannel`] holds one store subscription and republishes every snapshot
//! it receives as the complete, ordered list of entities for that collection.

mod channel;

pub use channel::{Snapshot, SyncChannel};

/// Freshness of a synced collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Subscribed, waiting for the first snapshot
    Connecting,
    /// Receiving snapshots
    Live,
    /// The store reported an error or the subscription ended; the last list is kept
    Stale,
    /// Shut down by the owner
    Closed,
}

impl SyncState {
    /// Whether the view should flag its data as possibly out of date
    pub fn is_stale(&self) -> bool {
        matches!(self, SyncState::Stale)
    }
}
