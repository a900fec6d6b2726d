//! In-process document store

use async_trait::async_trait;
use log::{debug, trace};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::{compare_on, Document, DocumentStore, OrderBy, StoreEvent, Subscription};
use crate::error::Error;

struct Entry {
    /// Insertion sequence, breaks ties between equal ordering keys
    seq: u64,
    doc: Document,
}

struct Listener {
    id: u64,
    order: OrderBy,
    tx: mpsc::UnboundedSender<StoreEvent>,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, Vec<Entry>>,
    listeners: HashMap<String, Vec<Listener>>,
    next_seq: u64,
    next_listener: u64,
    unavailable: bool,
    mutations: usize,
}

impl Inner {
    fn snapshot(&self, collection: &str, order: &OrderBy) -> Vec<Document> {
        let mut entries: Vec<&Entry> = self
            .collections
            .get(collection)
            .map(|entries| entries.iter().collect())
            .unwrap_or_default();

        entries.sort_by(|a, b| {
            compare_on(order, &a.doc, &b.doc).then_with(|| match order.direction {
                super::Direction::Ascending => a.seq.cmp(&b.seq),
                super::Direction::Descending => b.seq.cmp(&a.seq),
            })
        });

        entries.into_iter().map(|entry| entry.doc.clone()).collect()
    }

    /// Push a fresh snapshot to every listener of `collection`, pruning closed ones
    fn notify(&mut self, collection: &str) {
        let Some(listeners) = self.listeners.get(collection) else {
            return;
        };

        let mut closed = Vec::new();
        for listener in listeners {
            let snapshot = self.snapshot(collection, &listener.order);
            if listener.tx.send(StoreEvent::Snapshot(snapshot)).is_err() {
                closed.push(listener.id);
            }
        }

        if !closed.is_empty() {
            if let Some(listeners) = self.listeners.get_mut(collection) {
                listeners.retain(|listener| !closed.contains(&listener.id));
            }
        }
        trace!("notified listeners of {}", collection);
    }

    fn begin_mutation(&mut self) -> Result<(), Error> {
        self.mutations += 1;
        if self.unavailable {
            return Err(Error::store("store unavailable"));
        }
        Ok(())
    }
}

/// A document store that lives entirely in memory.
///
/// Every mutation pushes the full ordered snapshot to all subscribers of the
/// affected collection, the same contract a hosted realtime store offers.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of open subscriptions on a collection
    pub fn listener_count(&self, collection: &str) -> usize {
        self.lock()
            .listeners
            .get(collection)
            .map(|listeners| listeners.iter().filter(|l| !l.tx.is_closed()).count())
            .unwrap_or(0)
    }

    /// Current documents of a collection, in insertion order
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.lock()
            .collections
            .get(collection)
            .map(|entries| entries.iter().map(|entry| entry.doc.clone()).collect())
            .unwrap_or_default()
    }

    /// Number of create/update/delete calls received, failed ones included
    pub fn mutation_count(&self) -> usize {
        self.lock().mutations
    }

    /// Make every subsequent mutation fail with a store error (or recover)
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Report an error to every subscriber of `collection` without closing them
    pub fn fail_subscriptions(&self, collection: &str, message: &str) {
        let inner = self.lock();
        if let Some(listeners) = inner.listeners.get(collection) {
            for listener in listeners {
                let _ = listener.tx.send(StoreEvent::Error(Error::subscription(message)));
            }
        }
    }

    /// Drop every subscriber of `collection`, as if the connection was lost
    pub fn disconnect(&self, collection: &str) {
        self.lock().listeners.remove(collection);
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn subscribe(&self, collection: &str, order: OrderBy) -> Result<Subscription, Error> {
        let (tx, rx) = mpsc::unbounded_channel();

        let listener_id = {
            let mut inner = self.lock();
            let listener_id = inner.next_listener;
            inner.next_listener += 1;

            let snapshot = inner.snapshot(collection, &order);
            // The receiver is still in hand, so this send cannot fail
            let _ = tx.send(StoreEvent::Snapshot(snapshot));

            inner
                .listeners
                .entry(collection.to_string())
                .or_default()
                .push(Listener {
                    id: listener_id,
                    order,
                    tx,
                });
            listener_id
        };
        debug!("memory store: listener {} subscribed to {}", listener_id, collection);

        let inner = Arc::downgrade(&self.inner);
        let collection = collection.to_string();
        Ok(Subscription::new(rx, move || {
            if let Some(inner) = inner.upgrade() {
                let mut inner = inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                if let Some(listeners) = inner.listeners.get_mut(&collection) {
                    listeners.retain(|listener| listener.id != listener_id);
                }
                debug!("memory store: listener {} left {}", listener_id, collection);
            }
        }))
    }

    async fn create(&self, collection: &str, fields: Map<String, Value>) -> Result<String, Error> {
        let mut inner = self.lock();
        inner.begin_mutation()?;

        let id = Uuid::new_v4().to_string();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(Entry {
                seq,
                doc: Document::new(id.clone(), fields),
            });
        debug!("memory store: created {}/{}", collection, id);

        inner.notify(collection);
        Ok(id)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), Error> {
        let mut inner = self.lock();
        inner.begin_mutation()?;

        let entry = inner
            .collections
            .get_mut(collection)
            .and_then(|entries| entries.iter_mut().find(|entry| entry.doc.id == id))
            .ok_or_else(|| Error::store(format!("no document {} in {}", id, collection)))?;

        for (key, value) in fields {
            entry.doc.fields.insert(key, value);
        }
        debug!("memory store: updated {}/{}", collection, id);

        inner.notify(collection);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), Error> {
        let mut inner = self.lock();
        inner.begin_mutation()?;

        if let Some(entries) = inner.collections.get_mut(collection) {
            entries.retain(|entry| entry.doc.id != id);
        }
        debug!("memory store: deleted {}/{}", collection, id);

        inner.notify(collection);
        Ok(())
    }
}
