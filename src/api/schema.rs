//! Response shapes for every Azure DevOps endpoint the client consumes.
//!
//! Every body coming back from the server goes through [`parse`]. Fields that
//! vary between server versions, or that are only present when explicitly
//! requested, are optional here; the mapping layer decides which of them are
//! actually required.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

use crate::error::ValidationError;

/// Parse a raw response body for `endpoint` into `T`.
///
/// On mismatch the error names the endpoint and carries serde's description
/// of the offending field and expected shape.
pub fn parse<T: DeserializeOwned>(endpoint: &str, raw: &str) -> Result<T, ValidationError> {
    serde_json::from_str(raw).map_err(|e| {
        let err = ValidationError {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
            line: e.line(),
            column: e.column(),
        };
        tracing::warn!(
            endpoint = %err.endpoint,
            error = %err.message,
            "Response failed schema validation"
        );
        err
    })
}

/// Identity as embedded in `System.AssignedTo` and identity picker results.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AdoIdentity {
    #[serde(default)]
    pub id: Option<String>,
    pub display_name: String,
    #[serde(default)]
    pub unique_name: Option<String>,
    #[serde(default)]
    pub sign_in_address: Option<String>,
    #[serde(default)]
    pub sam_account_name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub local_id: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Work item fields; a batch fetch that names a subset of fields returns a
/// partial object, so all of them are optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct AdoWorkItemFields {
    #[serde(rename = "System.Id", default)]
    pub id: Option<i64>,
    #[serde(rename = "System.Title", default)]
    pub title: Option<String>,
    #[serde(rename = "System.WorkItemType", default)]
    pub work_item_type: Option<String>,
    #[serde(rename = "System.State", default)]
    pub state: Option<String>,
    #[serde(rename = "System.AssignedTo", default)]
    pub assigned_to: Option<AdoIdentity>,
    #[serde(rename = "System.AreaPath", default)]
    pub area_path: Option<String>,
    #[serde(rename = "System.IterationPath", default)]
    pub iteration_path: Option<String>,
    #[serde(rename = "System.ChangedDate", default)]
    pub changed_date: Option<DateTime<Utc>>,
    #[serde(rename = "System.Description", default)]
    pub description: Option<String>,
    #[serde(rename = "System.Tags", default)]
    pub tags: Option<String>,
    #[serde(rename = "System.CreatedDate", default)]
    pub created_date: Option<DateTime<Utc>>,
}

/// A typed link on a work item.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AdoRelation {
    pub rel: String,
    pub url: String,
    #[serde(default)]
    pub attributes: Option<HashMap<String, serde_json::Value>>,
}

/// A work item as returned by the single and batch endpoints.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AdoWorkItem {
    pub id: i64,
    pub url: String,
    pub fields: AdoWorkItemFields,
    #[serde(default)]
    pub relations: Option<Vec<AdoRelation>>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct AdoWorkItemRef {
    pub id: i64,
}

/// One row of a link query. The root row of a tree query has no source.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AdoWorkItemLink {
    #[serde(default)]
    pub rel: Option<String>,
    #[serde(default)]
    pub source: Option<AdoWorkItemRef>,
    #[serde(default)]
    pub target: Option<AdoWorkItemRef>,
}

/// Result of `POST wit/wiql`: flat for `FROM WorkItems`, pairs for
/// `FROM WorkItemLinks`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AdoWiqlResult {
    #[serde(default)]
    pub work_items: Option<Vec<AdoWorkItemRef>>,
    #[serde(default)]
    pub work_item_relations: Option<Vec<AdoWorkItemLink>>,
}

/// `{ "value": [...] }` envelope used by list endpoints.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AdoList<T> {
    pub value: Vec<T>,
}

pub type AdoBatchWorkItems = AdoList<AdoWorkItem>;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AdoAccountProperty {
    #[serde(rename = "$value")]
    pub value: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct AdoUserProperties {
    pub account: AdoAccountProperty,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AdoAuthenticatedUser {
    pub id: String,
    pub descriptor: String,
    pub subject_descriptor: String,
    pub provider_display_name: String,
    #[serde(default)]
    pub custom_display_name: Option<String>,
    pub is_active: bool,
    pub properties: AdoUserProperties,
}

/// Result of `GET _apis/connectionData`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AdoConnectionData {
    pub authenticated_user: AdoAuthenticatedUser,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AdoIdentityGroup {
    pub identities: Vec<AdoIdentity>,
}

/// Result of `POST _apis/IdentityPicker/Identities`, grouped per query.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AdoIdentitySearchResult {
    pub results: Vec<AdoIdentityGroup>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AdoWorkItemTypeState {
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub category: String,
}

pub type AdoWorkItemTypeStates = AdoList<AdoWorkItemTypeState>;

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AdoIterationAttributes {
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finish_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AdoIteration {
    pub id: String,
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub attributes: Option<AdoIterationAttributes>,
}

pub type AdoIterations = AdoList<AdoIteration>;

/// Recursive area/iteration classification node.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AdoClassificationNode {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub has_children: bool,
    #[serde(default)]
    pub children: Vec<AdoClassificationNode>,
}
