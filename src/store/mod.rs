//! Remote store adapters
//!
//! A [`DocumentStore`] is a document database holding named collections of keyed
//! records. It supports live subscriptions ordered by a field and per-record
//! create/update/delete. Two adapters are provided: [`MemoryStore`] keeps everything
//! in-process, [`RestStore`] talks to a PostgREST endpoint.

mod memory;
mod rest;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::error::Error;

pub use memory::MemoryStore;
pub use rest::RestStore;

/// A stored document: identifier plus its field map
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Identifier assigned by the store
    pub id: String,

    /// Document fields, without the identifier
    pub fields: Map<String, Value>,
}

impl Document {
    /// Create a document from an id and a field map
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Fields with the identifier merged in under `id`
    pub fn into_value(self) -> Value {
        let mut fields = self.fields;
        fields.insert("id".to_string(), Value::String(self.id));
        Value::Object(fields)
    }
}

/// Sort direction for subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    /// PostgREST spelling of the direction
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Ascending => "asc",
            Direction::Descending => "desc",
        }
    }
}

/// Ordering applied to a subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    /// Order by `field`, newest/largest first
    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: Direction::Descending,
        }
    }

    /// Order by `field`, oldest/smallest first
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: Direction::Ascending,
        }
    }
}

/// Event delivered on a subscription
#[derive(Debug)]
pub enum StoreEvent {
    /// The complete, ordered contents of the collection
    Snapshot(Vec<Document>),

    /// The adapter could not refresh the collection; the subscription stays open
    Error(Error),
}

/// A live subscription to one collection.
///
/// Dropping the subscription unregisters it from the store.
pub struct Subscription {
    events: mpsc::UnboundedReceiver<StoreEvent>,
    on_close: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Wrap an event receiver together with the adapter's unsubscribe hook
    pub fn new<F>(events: mpsc::UnboundedReceiver<StoreEvent>, on_close: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            events,
            on_close: Some(Box::new(on_close)),
        }
    }

    /// Wait for the next event; `None` once the store side has gone away
    pub async fn next(&mut self) -> Option<StoreEvent> {
        self.events.recv().await
    }

    /// Unregister from the store
    pub fn close(mut self) {
        self.unsubscribe();
    }

    fn unsubscribe(&mut self) {
        if let Some(on_close) = self.on_close.take() {
            on_close();
        }
        self.events.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("open", &self.on_close.is_some())
            .finish()
    }
}

/// Capability the client consumes: ordered live queries plus document CRUD
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Subscribe to a collection. The first event is the current snapshot.
    async fn subscribe(&self, collection: &str, order: OrderBy) -> Result<Subscription, Error>;

    /// Create a document and return its new identifier
    async fn create(&self, collection: &str, fields: Map<String, Value>) -> Result<String, Error>;

    /// Overwrite the given fields of an existing document
    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), Error>;

    /// Delete a document by identifier
    async fn delete(&self, collection: &str, id: &str) -> Result<(), Error>;
}

/// Serialize a record into a document field map
pub(crate) fn to_fields<T: serde::Serialize>(record: &T) -> Result<Map<String, Value>, Error> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::general(format!(
            "expected a JSON object for a document, got {}",
            other
        ))),
    }
}

/// Compare two documents on `order`, falling back to `Equal` for missing fields
pub(crate) fn compare_on(order: &OrderBy, a: &Document, b: &Document) -> std::cmp::Ordering {
    use std::cmp::Ordering;

    let ordering = match (a.fields.get(&order.field), b.fields.get(&order.field)) {
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or_default();
            let y = y.as_f64().unwrap_or_default();
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        _ => Ordering::Equal,
    };

    match order.direction {
        Direction::Ascending => ordering,
        Direction::Descending => ordering.reverse(),
    }
}
