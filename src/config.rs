//! Configuration options for the statusblog client

use std::time::Duration;
use url::Url;

use crate::error::Error;

/// Default upper bound for an attached image file, before base64 encoding.
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 700 * 1024;

/// Configuration options for the statusblog client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// The shared admin secret. An empty secret never matches.
    pub admin_password: String,

    /// Collection holding blog posts
    pub posts_collection: String,

    /// Collection holding dashboard gauges
    pub gauges_collection: String,

    /// Field both collections are ordered by (descending)
    pub order_field: String,

    /// The request timeout for remote store calls
    pub request_timeout: Option<Duration>,

    /// How often a polling subscription refreshes its snapshot
    pub poll_interval: Duration,

    /// Largest image file accepted by the post form
    pub max_image_bytes: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            admin_password: String::new(),
            posts_collection: "posts".to_string(),
            gauges_collection: "gauges".to_string(),
            order_field: "createdAt".to_string(),
            request_timeout: Some(Duration::from_secs(30)),
            poll_interval: Duration::from_secs(2),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

impl ClientOptions {
    /// Build options from `STATUSBLOG_*` environment variables, falling back to defaults.
    ///
    /// Recognised variables: `STATUSBLOG_ADMIN_PASSWORD`, `STATUSBLOG_POLL_INTERVAL_MS`,
    /// `STATUSBLOG_REQUEST_TIMEOUT_SECS`, `STATUSBLOG_MAX_IMAGE_BYTES`.
    pub fn from_env() -> Result<Self, Error> {
        let mut options = Self::default();

        if let Ok(password) = std::env::var("STATUSBLOG_ADMIN_PASSWORD") {
            options.admin_password = password;
        }
        if let Some(ms) = parse_env::<u64>("STATUSBLOG_POLL_INTERVAL_MS")? {
            options.poll_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_env::<u64>("STATUSBLOG_REQUEST_TIMEOUT_SECS")? {
            options.request_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(bytes) = parse_env::<usize>("STATUSBLOG_MAX_IMAGE_BYTES")? {
            options.max_image_bytes = bytes;
        }

        Ok(options)
    }

    /// Set the shared admin secret
    pub fn with_admin_password(mut self, value: &str) -> Self {
        self.admin_password = value.to_string();
        self
    }

    /// Set the posts collection name
    pub fn with_posts_collection(mut self, value: &str) -> Self {
        self.posts_collection = value.to_string();
        self
    }

    /// Set the gauges collection name
    pub fn with_gauges_collection(mut self, value: &str) -> Self {
        self.gauges_collection = value.to_string();
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the polling interval used by polling subscriptions
    pub fn with_poll_interval(mut self, value: Duration) -> Self {
        self.poll_interval = value;
        self
    }

    /// Set the largest accepted image file
    pub fn with_max_image_bytes(mut self, value: usize) -> Self {
        self.max_image_bytes = value;
        self
    }
}

/// Connection settings for a remote REST store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Base URL of the project, e.g. `https://example.supabase.co`
    pub url: Url,

    /// API key sent with every request
    pub api_key: String,
}

impl StoreConfig {
    /// Creates a new configuration, validating the URL.
    pub fn new(url: &str, api_key: &str) -> Result<Self, Error> {
        let url = Url::parse(url)?;
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(Error::config(format!("unsupported URL scheme: {}", other))),
        }
        if api_key.is_empty() {
            return Err(Error::config("api key cannot be empty"));
        }
        Ok(Self {
            url,
            api_key: api_key.to_string(),
        })
    }

    /// Reads `STATUSBLOG_URL` and `STATUSBLOG_KEY`.
    pub fn from_env() -> Result<Self, Error> {
        let url = std::env::var("STATUSBLOG_URL")
            .map_err(|_| Error::config("STATUSBLOG_URL environment variable not found"))?;
        let key = std::env::var("STATUSBLOG_KEY")
            .map_err(|_| Error::config("STATUSBLOG_KEY environment variable not found"))?;
        Self::new(&url, &key)
    }

    /// Base URL without a trailing slash
    pub(crate) fn base_url(&self) -> String {
        self.url.as_str().trim_end_matches('/').to_string()
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>, Error> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::config(format!("{} is not a valid number: {}", name, raw))),
        Err(_) => Ok(None),
    }
}
