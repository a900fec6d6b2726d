//! Error handling for the statusblog client

use std::fmt;
use thiserror::Error;

/// Unified error type for the statusblog client
#[derive(Error, Debug)]
pub enum Error {
    /// Network or HTTP related errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// File system errors (image intake)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A required field was empty or a value was unusable
    #[error("Validation error: {0}")]
    Validation(String),

    /// The admin password did not match
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// A gated action was attempted without an admin session
    #[error("Not authorized: admin session required")]
    Unauthorized,

    /// The remote store rejected or failed an operation
    #[error("Store error: {0}")]
    Store(String),

    /// Subscription errors
    #[error("Subscription error: {0}")]
    Subscription(String),

    /// Image intake errors
    #[error("Image error: {0}")]
    Image(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// General errors
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Create a new validation error
    pub fn validation<T: fmt::Display>(msg: T) -> Self {
        Error::Validation(msg.to_string())
    }

    /// Create a new authentication error
    pub fn authentication<T: fmt::Display>(msg: T) -> Self {
        Error::Authentication(msg.to_string())
    }

    /// Create a new store error
    pub fn store<T: fmt::Display>(msg: T) -> Self {
        Error::Store(msg.to_string())
    }

    /// Create a new subscription error
    pub fn subscription<T: fmt::Display>(msg: T) -> Self {
        Error::Subscription(msg.to_string())
    }

    /// Create a new image error
    pub fn image<T: fmt::Display>(msg: T) -> Self {
        Error::Image(msg.to_string())
    }

    /// Create a new configuration error
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }

    /// Create a new general error
    pub fn general<T: fmt::Display>(msg: T) -> Self {
        Error::General(msg.to_string())
    }

    /// Whether this error came from the remote side (network, store, decoding a response)
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::Json(_) | Error::Store(_) | Error::Subscription(_)
        )
    }
}
