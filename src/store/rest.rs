//! Document store backed by a PostgREST endpoint

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Client;
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use super::{Document, DocumentStore, OrderBy, StoreEvent, Subscription};
use crate::config::{ClientOptions, StoreConfig};
use crate::error::Error;
use crate::fetch::Fetch;

/// Lower bound for the polling period; `tokio::time::interval` rejects zero
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A [`DocumentStore`] speaking the PostgREST dialect over HTTP.
///
/// Collections map to tables under `/rest/v1/`. PostgREST has no push channel of
/// its own, so subscriptions poll the ordered table and emit a snapshot only when
/// the result differs from the previous one.
#[derive(Debug, Clone)]
pub struct RestStore {
    config: StoreConfig,
    client: Client,
    request_timeout: Option<Duration>,
    poll_interval: Duration,
}

impl RestStore {
    /// Create a new RestStore
    pub fn new(config: StoreConfig, options: &ClientOptions) -> Self {
        Self::with_client(config, options, Client::new())
    }

    /// Create a new RestStore sharing an existing HTTP client
    pub fn with_client(config: StoreConfig, options: &ClientOptions, client: Client) -> Self {
        Self {
            config,
            client,
            request_timeout: options.request_timeout,
            poll_interval: options.poll_interval.max(MIN_POLL_INTERVAL),
        }
    }

    /// Get the REST URL of a collection
    fn get_url(&self, collection: &str) -> String {
        format!("{}/rest/v1/{}", self.config.base_url(), collection)
    }

    /// Fetch the whole collection in the requested order
    pub async fn fetch_ordered(
        &self,
        collection: &str,
        order: &OrderBy,
    ) -> Result<Vec<Document>, Error> {
        let rows = Fetch::get(&self.client, &self.get_url(collection))
            .api_key(&self.config.api_key)
            .query("select", "*")
            .query("order", &format!("{}.{}", order.field, order.direction.as_str()))
            .timeout(self.request_timeout)
            .execute::<Vec<Value>>()
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| match row_to_document(row) {
                Ok(doc) => Some(doc),
                Err(e) => {
                    warn!("skipping row in {}: {}", collection, e);
                    None
                }
            })
            .collect())
    }
}

/// Split a PostgREST row into identifier and fields
fn row_to_document(row: Value) -> Result<Document, Error> {
    let Value::Object(mut fields) = row else {
        return Err(Error::store("row is not a JSON object"));
    };

    let id = match fields.remove("id") {
        Some(Value::String(id)) => id,
        Some(Value::Number(id)) => id.to_string(),
        Some(other) => return Err(Error::store(format!("unsupported id value: {}", other))),
        None => return Err(Error::store("row has no id column")),
    };

    Ok(Document::new(id, fields))
}

#[async_trait]
impl DocumentStore for RestStore {
    async fn subscribe(&self, collection: &str, order: OrderBy) -> Result<Subscription, Error> {
        let (tx, rx) = mpsc::unbounded_channel();
        let store = self.clone();
        let collection = collection.to_string();
        info!(
            "polling {} every {:?} ordered by {}.{}",
            collection,
            store.poll_interval,
            order.field,
            order.direction.as_str()
        );

        let handle = tokio::spawn(async move {
            let mut last: Option<Vec<Document>> = None;
            let mut ticker = tokio::time::interval(store.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let event = match store.fetch_ordered(&collection, &order).await {
                    Ok(docs) if last.as_ref() == Some(&docs) => continue,
                    Ok(docs) => {
                        debug!("{}: snapshot of {} documents", collection, docs.len());
                        last = Some(docs.clone());
                        StoreEvent::Snapshot(docs)
                    }
                    Err(e) => {
                        warn!("{}: refresh failed: {}", collection, e);
                        // the next good poll must publish, even if unchanged
                        last = None;
                        StoreEvent::Error(e)
                    }
                };
                if tx.send(event).is_err() {
                    debug!("{}: subscriber gone, stopping poll", collection);
                    break;
                }
            }
        });

        Ok(Subscription::new(rx, move || handle.abort()))
    }

    async fn create(&self, collection: &str, fields: Map<String, Value>) -> Result<String, Error> {
        let rows = Fetch::post(&self.client, &self.get_url(collection))
            .api_key(&self.config.api_key)
            .header("Prefer", "return=representation")
            .timeout(self.request_timeout)
            .json(&fields)?
            .execute::<Vec<Value>>()
            .await?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| Error::store(format!("insert into {} returned no rows", collection)))?;
        let doc = row_to_document(row)?;
        debug!("created {}/{}", collection, doc.id);
        Ok(doc.id)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), Error> {
        let rows = Fetch::patch(&self.client, &self.get_url(collection))
            .api_key(&self.config.api_key)
            .header("Prefer", "return=representation")
            .query("id", &format!("eq.{}", id))
            .timeout(self.request_timeout)
            .json(&fields)?
            .execute::<Vec<Value>>()
            .await?;
        if rows.is_empty() {
            return Err(Error::store(format!("no document {} in {}", id, collection)));
        }
        debug!("updated {}/{}", collection, id);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), Error> {
        Fetch::delete(&self.client, &self.get_url(collection))
            .api_key(&self.config.api_key)
            .query("id", &format!("eq.{}", id))
            .timeout(self.request_timeout)
            .execute_empty()
            .await?;
        debug!("deleted {}/{}", collection, id);
        Ok(())
    }
}
