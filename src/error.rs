//! Unified error handling for the adowork library.
//!
//! Every failure a client operation can produce falls into one of five
//! categories. The top-level [`AdoError`] forwards the inner message unchanged
//! so that callers (and end users) always see the literal upstream text.
//!
//! ## Error Categories
//!
//! - [`ConfigError`]: no organization/project configured, no PAT, or the
//!   local stores failed
//! - [`TransportError`]: the request never produced a response (network
//!   failure or timeout)
//! - [`ApiError`]: the server answered with a non-2xx status
//! - [`ValidationError`]: the response body did not match the expected shape
//! - [`DomainError`]: a payload parsed but breaks a work-item invariant
//!
//! ## Example
//!
//! ```rust
//! use adowork::error::{AdoError, ConfigError};
//!
//! let err: AdoError = ConfigError::PatNotConfigured.into();
//! assert_eq!(err.to_string(), "PAT not configured");
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// The main error type for the adowork library.
#[derive(Error, Debug)]
pub enum AdoError {
    /// Missing or unreadable local configuration/credentials.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The request did not complete.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server rejected the request.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The server response had an unexpected shape.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A work item violated an always-required invariant.
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Errors raised before any network call is made.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No organization URL / project name has been configured.
    #[error("Azure DevOps not configured")]
    NotConfigured,

    /// No Personal Access Token is stored.
    #[error("PAT not configured")]
    PatNotConfigured,

    /// Failed to read the configuration file.
    #[error("Failed to read config file at {path}: {message}")]
    FileRead {
        /// Path to the config file.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Failed to parse the configuration file.
    #[error("Failed to parse config file at {path}: {message}")]
    Parse {
        /// Path to the config file.
        path: PathBuf,
        /// Parse error message.
        message: String,
    },

    /// Failed to write the configuration file.
    #[error("Failed to write config file at {path}: {message}")]
    Write {
        /// Path to the config file.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// The home/config directory could not be determined.
    #[error("Could not determine the configuration directory")]
    NoConfigDir,

    /// The secret store failed.
    #[error("Secret store error: {0}")]
    SecretStore(String),
}

/// Errors from the HTTP exchange itself.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The request was aborted because it exceeded the timeout.
    #[error("Azure DevOps API request timed out after {}ms", .elapsed.as_millis())]
    Timeout {
        /// How long the request ran before it was aborted.
        elapsed: Duration,
    },

    /// A connection-level failure.
    #[error("Network error: {0}")]
    Network(String),

    /// The request body could not be serialized.
    #[error("Failed to encode request body: {0}")]
    Encode(String),

    /// The configured organization URL could not be turned into a request URL.
    #[error("Invalid Azure DevOps URL '{url}': {message}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// Parse error message.
        message: String,
    },
}

/// Errors returned by the Azure DevOps REST API.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Non-2xx response; the body is kept verbatim.
    #[error("Azure DevOps API error: {status} {body}")]
    RequestFailed {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },
}

/// A response body did not match the schema expected for its endpoint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid response from {endpoint}: {message} (line {line}, column {column})")]
pub struct ValidationError {
    /// Endpoint that produced the payload (e.g. `wit/wiql`).
    pub endpoint: String,
    /// Description of the mismatch, including field and expected shape.
    pub message: String,
    /// Line in the raw body where parsing stopped.
    pub line: usize,
    /// Column in the raw body where parsing stopped.
    pub column: usize,
}

/// Work-item invariants that the mapping layer enforces.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// One of title/type/state is absent.
    #[error("Work item {id} is missing required field {field}")]
    MissingField {
        /// Work item id.
        id: i64,
        /// Reference name of the missing field.
        field: &'static str,
    },
}

/// Type alias for Results using AdoError.
pub type AdoResult<T> = std::result::Result<T, AdoError>;
