//! statusblog client library
//!
//! The client core of a small personal blog with a status dashboard: visitors see
//! posts and a set of gauges, an admin holding the shared password can create,
//! edit and delete them. Everything persistent lives in a realtime document
//! store; this crate keeps live local copies of the `posts` and `gauges`
//! collections and drives the create/edit/delete flows against the store.

pub mod auth;
pub mod config;
pub mod error;
pub mod fetch;
pub mod gauges;
pub mod lifecycle;
pub mod models;
pub mod posts;
pub mod realtime;
pub mod store;

use log::info;
use std::sync::Arc;

use crate::auth::AdminSession;
use crate::config::{ClientOptions, StoreConfig};
use crate::error::Error;
use crate::gauges::{partition_by_side, GaugeColumns, GaugeManager};
use crate::models::{Gauge, Post};
use crate::posts::PostManager;
use crate::realtime::{SyncChannel, SyncState};
use crate::store::{DocumentStore, OrderBy, RestStore};

/// The main entry point: both synced collections plus their lifecycle managers
pub struct StatusBlog {
    /// Client options
    options: ClientOptions,
    /// The admin session shared by both managers
    session: AdminSession,
    /// Live copy of the posts collection
    posts: SyncChannel<Post>,
    /// Live copy of the gauges collection
    gauges: SyncChannel<Gauge>,
    post_manager: PostManager,
    gauge_manager: GaugeManager,
}

impl StatusBlog {
    /// Subscribe to both collections on `store` and build the managers
    ///
    /// # Example
    ///
    /// ```
    /// use std::sync::Arc;
    /// use statusblog::{StatusBlog, config::ClientOptions, store::MemoryStore};
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let options = ClientOptions::default().with_admin_password("secret");
    /// let blog = StatusBlog::connect(Arc::new(MemoryStore::new()), options).await.unwrap();
    /// assert!(blog.posts().ready().await.unwrap().is_empty());
    /// blog.shutdown().await;
    /// # }
    /// ```
    pub async fn connect(store: Arc<dyn DocumentStore>, options: ClientOptions) -> Result<Self, Error> {
        let order = OrderBy::desc(&options.order_field);
        let posts =
            SyncChannel::open(store.as_ref(), &options.posts_collection, order.clone()).await?;
        let gauges = SyncChannel::open(store.as_ref(), &options.gauges_collection, order).await?;

        let session = AdminSession::new(&options.admin_password);
        let post_manager = PostManager::new(store.clone(), session.clone(), &options);
        let gauge_manager = GaugeManager::new(store, session.clone(), &options);

        info!(
            "statusblog connected ({} / {})",
            options.posts_collection, options.gauges_collection
        );

        Ok(Self {
            options,
            session,
            posts,
            gauges,
            post_manager,
            gauge_manager,
        })
    }

    /// Connect to a PostgREST endpoint
    pub async fn connect_rest(config: StoreConfig, options: ClientOptions) -> Result<Self, Error> {
        let store = RestStore::new(config, &options);
        Self::connect(Arc::new(store), options).await
    }

    /// Get the client options
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Get the admin session
    pub fn session(&self) -> &AdminSession {
        &self.session
    }

    /// Live posts, newest first
    pub fn posts(&self) -> &SyncChannel<Post> {
        &self.posts
    }

    /// Live gauges, newest first
    pub fn gauges(&self) -> &SyncChannel<Gauge> {
        &self.gauges
    }

    /// Gauges split into the left and right columns, derived from the current list
    pub fn gauge_columns(&self) -> GaugeColumns {
        partition_by_side(&self.gauges.items())
    }

    pub fn post_manager(&mut self) -> &mut PostManager {
        &mut self.post_manager
    }

    pub fn gauge_manager(&mut self) -> &mut GaugeManager {
        &mut self.gauge_manager
    }

    /// Whether either list may be out of date
    pub fn is_stale(&self) -> bool {
        self.posts.state() == SyncState::Stale || self.gauges.state() == SyncState::Stale
    }

    /// Close both subscriptions
    pub async fn shutdown(mut self) {
        self.posts.close().await;
        self.gauges.close().await;
        self.session.logout();
        info!("statusblog shut down");
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::auth::AdminSession;
    pub use crate::config::{ClientOptions, StoreConfig};
    pub use crate::error::Error;
    pub use crate::gauges::{partition_by_side, GaugeColumns, GaugeForm};
    pub use crate::lifecycle::{LifecycleState, Notice, NoticeKind};
    pub use crate::models::{Gauge, GaugeType, Post, Side};
    pub use crate::realtime::SyncState;
    pub use crate::store::{DocumentStore, MemoryStore, RestStore};
    pub use crate::StatusBlog;
}
