//! Azure DevOps REST API access.
//!
//! Layers, from the wire up:
//!
//! - [`transport`]: authenticated HTTP with a per-request timeout
//! - [`schema`]: typed shapes for every response, with validation errors
//! - [`wiql`]: query construction and escaping
//! - [`client`]: work item operations built on the layers above
//!
//! ## Example
//!
//! ```rust,no_run
//! use adowork::api::AzureDevOpsClient;
//! use adowork::config::FileConfigStore;
//! use adowork::secret::KeyringSecretStore;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = AzureDevOpsClient::with_stores(
//!     Arc::new(FileConfigStore::default_location()?),
//!     Arc::new(KeyringSecretStore::default()),
//! )?;
//!
//! let detail = client.get_work_item(42).await?;
//! println!("{} has parent {:?}", detail.summary.title, detail.parent_id);
//! # Ok(())
//! # }
//! ```

pub mod client;
mod credential;
mod mappers;
pub mod schema;
pub mod traits;
pub mod transport;
pub mod wiql;

// Re-export the client and its public items
pub use client::{AzureDevOpsClient, PatchOperation, filter_recent_iterations};
pub use credential::PatCredential;
pub use traits::{AdoRequest, AdoTransport, HttpMethod, RequestBody, Scope};
pub use transport::HttpTransport;
