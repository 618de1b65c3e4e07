//! HTTP implementation of [`AdoTransport`] on top of `reqwest`.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

use super::credential::PatCredential;
use super::traits::{AdoRequest, AdoTransport, HttpMethod, RequestBody, Scope};
use crate::config::{AdoConfig, ConfigStore};
use crate::error::{AdoResult, ApiError, ConfigError, TransportError};
use crate::secret::SecretStore;

/// Upper bound for one request, from send to fully read body.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Authenticated HTTP transport.
///
/// Configuration and the PAT are pulled from their stores on every request,
/// so changing either takes effect on the next call.
#[derive(Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    config_store: Arc<dyn ConfigStore>,
    secret_store: Arc<dyn SecretStore>,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(
        config_store: Arc<dyn ConfigStore>,
        secret_store: Arc<dyn SecretStore>,
    ) -> AdoResult<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(Self {
            http,
            config_store,
            secret_store,
            timeout: REQUEST_TIMEOUT,
        })
    }

    /// Overrides the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn config(&self) -> Result<AdoConfig, ConfigError> {
        self.config_store
            .load_config()?
            .ok_or(ConfigError::NotConfigured)
    }
}

/// Builds `{org}[/{project}]/_apis/{segments}?{query}&api-version=...`.
pub fn build_url(config: &AdoConfig, request: &AdoRequest) -> Result<Url, TransportError> {
    let invalid = |message: String| TransportError::InvalidUrl {
        url: config.organization_url.clone(),
        message,
    };

    let mut url = Url::parse(&config.organization_url).map_err(|e| invalid(e.to_string()))?;
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| invalid("URL cannot be a base".to_string()))?;
        path.pop_if_empty();
        if request.scope == Scope::Project {
            path.push(&config.project_name);
        }
        path.push("_apis");
        path.extend(&request.segments);
    }
    {
        let mut query = url.query_pairs_mut();
        for (key, value) in &request.query {
            query.append_pair(key, value);
        }
        query.append_pair("api-version", request.api_version);
    }
    Ok(url)
}

#[async_trait]
impl AdoTransport for HttpTransport {
    async fn send(&self, request: AdoRequest) -> AdoResult<String> {
        let config = self.config()?;
        let pat = self
            .secret_store
            .get_secret()
            .ok_or(ConfigError::PatNotConfigured)?;
        let credential = PatCredential::new(pat);
        let url = build_url(&config, &request)?;
        let endpoint = request.endpoint();

        let builder = match request.method {
            HttpMethod::Get => self.http.get(url.clone()),
            HttpMethod::Post => self.http.post(url.clone()),
            HttpMethod::Patch => self.http.patch(url.clone()),
        }
        .header(AUTHORIZATION, credential.authorization_header());

        let builder = match request.body {
            Some(RequestBody::Json(body)) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(body.to_string()),
            Some(RequestBody::JsonPatch(body)) => builder
                .header(CONTENT_TYPE, "application/json-patch+json")
                .body(body.to_string()),
            None => builder.header(CONTENT_TYPE, "application/json"),
        };

        debug!(method = ?request.method, %url, "Sending Azure DevOps request");
        let started = Instant::now();

        let exchange = async {
            let response = builder
                .send()
                .await
                .map_err(|e| TransportError::Network(e.to_string()))?;
            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| TransportError::Network(e.to_string()))?;
            Ok::<_, TransportError>((status, body))
        };

        // Dropping the exchange future on expiry aborts the in-flight request.
        let (status, body) = match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    %endpoint,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Azure DevOps request timed out"
                );
                return Err(TransportError::Timeout {
                    elapsed: self.timeout,
                }
                .into());
            }
        };

        if !status.is_success() {
            warn!(%endpoint, status = status.as_u16(), "Azure DevOps request failed");
            return Err(ApiError::RequestFailed {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        debug!(
            %endpoint,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Azure DevOps request completed"
        );
        Ok(body)
    }

    fn organization_url(&self) -> AdoResult<String> {
        Ok(self.config()?.organization_url)
    }
}
