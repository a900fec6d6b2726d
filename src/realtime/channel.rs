//! The sync channel task and its published snapshots

use log::{debug, info, trace, warn};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::SyncState;
use crate::error::Error;
use crate::models::Entity;
use crate::store::{Document, DocumentStore, OrderBy, StoreEvent, Subscription};

/// One published version of a collection
#[derive(Debug)]
pub struct Snapshot<T> {
    /// Increases by one per received snapshot; 0 before the first
    pub version: u64,
    pub items: Arc<Vec<T>>,
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            version: self.version,
            items: self.items.clone(),
        }
    }
}

/// Keeps a local, ordered copy of one collection current.
///
/// Every store notification replaces the whole list; there is no merging of
/// partial changes. Dropping the channel stops the background task, `close`
/// additionally waits until the store subscription is released.
pub struct SyncChannel<T: Entity> {
    collection: String,
    items: watch::Receiver<Snapshot<T>>,
    state: watch::Receiver<SyncState>,
    state_tx: Arc<watch::Sender<SyncState>>,
    task: Option<JoinHandle<()>>,
}

impl<T: Entity> SyncChannel<T> {
    /// Subscribe to `collection` ordered by `order` and start syncing
    pub async fn open(
        store: &dyn DocumentStore,
        collection: &str,
        order: OrderBy,
    ) -> Result<Self, Error> {
        info!(
            "opening sync channel for {} ordered by {}.{}",
            collection,
            order.field,
            order.direction.as_str()
        );
        let subscription = store.subscribe(collection, order).await?;

        let (items_tx, items_rx) = watch::channel(Snapshot {
            version: 0,
            items: Arc::new(Vec::new()),
        });
        let (state_tx, state_rx) = watch::channel(SyncState::Connecting);
        let state_tx = Arc::new(state_tx);

        let task = tokio::spawn(run(
            collection.to_string(),
            subscription,
            items_tx,
            state_tx.clone(),
        ));

        Ok(Self {
            collection: collection.to_string(),
            items: items_rx,
            state: state_rx,
            state_tx,
            task: Some(task),
        })
    }

    /// Name of the synced collection
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The current list, newest first
    pub fn items(&self) -> Arc<Vec<T>> {
        self.items.borrow().items.clone()
    }

    /// The current list together with its version
    pub fn snapshot(&self) -> Snapshot<T> {
        self.items.borrow().clone()
    }

    /// Number of snapshots received so far
    pub fn version(&self) -> u64 {
        self.items.borrow().version
    }

    /// Current freshness of the list
    pub fn state(&self) -> SyncState {
        *self.state.borrow()
    }

    /// Receiver notified on every new snapshot
    pub fn watch(&self) -> watch::Receiver<Snapshot<T>> {
        self.items.clone()
    }

    /// Receiver notified on freshness changes
    pub fn watch_state(&self) -> watch::Receiver<SyncState> {
        self.state.clone()
    }

    /// Wait until the list satisfies `predicate` and return it
    pub async fn wait_until<F>(&self, mut predicate: F) -> Result<Arc<Vec<T>>, Error>
    where
        F: FnMut(&[T]) -> bool,
    {
        let mut rx = self.items.clone();
        let snapshot = rx
            .wait_for(|snapshot| predicate(&snapshot.items))
            .await
            .map_err(|_| Error::subscription(format!("{} channel closed", self.collection)))?;
        Ok(snapshot.items.clone())
    }

    /// Wait for the first snapshot
    pub async fn ready(&self) -> Result<Arc<Vec<T>>, Error> {
        let mut rx = self.items.clone();
        let snapshot = rx
            .wait_for(|snapshot| snapshot.version > 0)
            .await
            .map_err(|_| Error::subscription(format!("{} channel closed", self.collection)))?;
        Ok(snapshot.items.clone())
    }

    /// Stop syncing and release the store subscription
    pub async fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            // Resolves once the task future, and the subscription it owns, is dropped
            let _ = task.await;
            self.state_tx.send_replace(SyncState::Closed);
            info!("closed sync channel for {}", self.collection);
        }
    }
}

impl<T: Entity> Drop for SyncChannel<T> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl<T: Entity> std::fmt::Debug for SyncChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncChannel")
            .field("collection", &self.collection)
            .field("version", &self.version())
            .field("state", &self.state())
            .finish()
    }
}

async fn run<T: Entity>(
    collection: String,
    mut subscription: Subscription,
    items_tx: watch::Sender<Snapshot<T>>,
    state_tx: Arc<watch::Sender<SyncState>>,
) {
    let mut version = 0;

    loop {
        match subscription.next().await {
            Some(StoreEvent::Snapshot(docs)) => {
                version += 1;
                let items = to_entities::<T>(&collection, docs);
                debug!("{}: snapshot v{} with {} items", collection, version, items.len());
                items_tx.send_replace(Snapshot {
                    version,
                    items: Arc::new(items),
                });
                set_state(&collection, &state_tx, SyncState::Live);
            }
            Some(StoreEvent::Error(e)) => {
                warn!("{}: subscription error: {}", collection, e);
                set_state(&collection, &state_tx, SyncState::Stale);
            }
            None => {
                warn!("{}: subscription ended", collection);
                set_state(&collection, &state_tx, SyncState::Stale);
                break;
            }
        }
    }
}

fn set_state(collection: &str, state_tx: &watch::Sender<SyncState>, state: SyncState) {
    let changed = state_tx.send_if_modified(|current| {
        if *current == state {
            return false;
        }
        *current = state;
        true
    });
    if changed {
        info!("{}: sync state is now {:?}", collection, state);
    } else {
        trace!("{}: sync state already {:?}", collection, state);
    }
}

/// Map documents to entities, skipping any that do not fit the shape
fn to_entities<T: Entity>(collection: &str, docs: Vec<Document>) -> Vec<T> {
    docs.into_iter()
        .filter_map(|doc| {
            let id = doc.id.clone();
            match serde_json::from_value::<T>(doc.into_value()) {
                Ok(entity) => Some(entity),
                Err(e) => {
                    warn!("{}: skipping malformed document {}: {}", collection, id, e);
                    None
                }
            }
        })
        .collect()
}
