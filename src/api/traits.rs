//! Transport abstraction for Azure DevOps REST calls.
//!
//! The client describes each call as an [`AdoRequest`] and hands it to an
//! [`AdoTransport`]. This enables:
//! - Mocking the server in unit tests (request capture, scripted bodies)
//! - Swapping the HTTP stack without touching query/mapping logic

use async_trait::async_trait;
use serde_json::Value;

use crate::error::AdoResult;

/// API version pinned for every endpoint except the identity picker.
pub const API_VERSION: &str = "7.1";

/// API version of the identity picker endpoint.
pub const IDENTITY_PICKER_API_VERSION: &str = "7.1-preview.1";

/// Where the endpoint path is rooted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// `{org}/{project}/_apis/...`
    Project,
    /// `{org}/_apis/...`
    Organization,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
}

/// Request payload, tagged with how it must be labelled on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// `application/json`
    Json(Value),
    /// `application/json-patch+json`
    JsonPatch(Value),
}

/// A transport-independent description of one REST call.
#[derive(Debug, Clone, PartialEq)]
pub struct AdoRequest {
    pub method: HttpMethod,
    pub scope: Scope,
    /// Path below `_apis`, one entry per segment (unencoded).
    pub segments: Vec<String>,
    /// Query parameters other than `api-version` (unencoded).
    pub query: Vec<(String, String)>,
    pub api_version: &'static str,
    pub body: Option<RequestBody>,
}

impl AdoRequest {
    fn new<I, S>(method: HttpMethod, scope: Scope, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            scope,
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            api_version: API_VERSION,
            body: None,
        }
    }

    pub fn get<I, S>(scope: Scope, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(HttpMethod::Get, scope, segments)
    }

    pub fn post<I, S>(scope: Scope, segments: I, body: RequestBody) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut request = Self::new(HttpMethod::Post, scope, segments);
        request.body = Some(body);
        request
    }

    pub fn patch<I, S>(scope: Scope, segments: I, body: RequestBody) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut request = Self::new(HttpMethod::Patch, scope, segments);
        request.body = Some(body);
        request
    }

    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_api_version(mut self, api_version: &'static str) -> Self {
        self.api_version = api_version;
        self
    }

    /// Endpoint label used in logs and validation errors, e.g. `wit/wiql`.
    pub fn endpoint(&self) -> String {
        self.segments.join("/")
    }

    /// Value of a query parameter, if set.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Executes [`AdoRequest`]s against Azure DevOps.
///
/// Implementations read configuration and credentials on every call and
/// return the raw body of a 2xx response; interpreting it is left to the
/// schema layer.
#[async_trait]
pub trait AdoTransport: Send + Sync {
    /// Sends the request and returns the response body.
    async fn send(&self, request: AdoRequest) -> AdoResult<String>;

    /// The configured organization URL, without trailing slash.
    fn organization_url(&self) -> AdoResult<String>;
}
