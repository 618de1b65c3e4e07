//! # adowork
//!
//! A library for working with Azure DevOps work items over the REST API.
//! It provides:
//!
//! - WIQL query construction from structured filters
//! - Batched work item fetches that keep the query's order
//! - Validation of every response against a typed schema
//! - Parent/child hierarchy reads and edits
//! - Identity, iteration, area path and state lookups
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use adowork::AzureDevOpsClient;
//! use adowork::config::{AdoConfig, MemoryConfigStore};
//! use adowork::models::WorkItemListFilters;
//! use adowork::secret::MemorySecretStore;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AdoConfig::new("https://dev.azure.com/my-org", "my-project");
//! let client = AzureDevOpsClient::with_stores(
//!     Arc::new(MemoryConfigStore::new(Some(config))),
//!     Arc::new(MemorySecretStore::new(Some("my-pat".to_string()))),
//! )?;
//!
//! let items = client.list_work_items(&WorkItemListFilters::default()).await?;
//! println!("Found {} work items", items.len());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod secret;

// Re-export commonly used types for convenience
pub use api::AzureDevOpsClient;
pub use config::{AdoConfig, ConfigStore};
pub use error::{AdoError, AdoResult};
pub use secret::SecretStore;

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
