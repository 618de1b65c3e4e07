//! Azure DevOps work item client.
//!
//! Runs WIQL queries, fetches the matching work items in batches while
//! keeping the query's order, maps payloads to domain types and writes
//! changes back as JSON-Patch documents.

use chrono::{DateTime, Months, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

use super::mappers::{flatten_area_tree, identity_from_assignee, identity_from_picker};
use super::schema::{
    self, AdoBatchWorkItems, AdoClassificationNode, AdoConnectionData, AdoIdentitySearchResult,
    AdoIterations, AdoWiqlResult, AdoWorkItem, AdoWorkItemTypeStates,
};
use super::traits::{AdoRequest, AdoTransport, IDENTITY_PICKER_API_VERSION, RequestBody, Scope};
use super::transport::HttpTransport;
use super::wiql::{
    HIERARCHY_REVERSE, build_assigned_items_query, build_children_query, build_list_query,
    normalize_area_path,
};
use crate::config::ConfigStore;
use crate::error::{AdoResult, TransportError};
use crate::models::{
    AreaPath, ConnectionTestResult, Identity, Iteration, SortOrder, WorkItemCreatePayload,
    WorkItemDetail, WorkItemListFilters, WorkItemSummary, WorkItemType, WorkItemTypeState,
    WorkItemUpdatePatch,
};
use crate::secret::SecretStore;

/// Maximum number of ids per batch fetch.
pub const BATCH_SIZE: usize = 200;

/// Row cap for the assignee-harvesting query behind [`AzureDevOpsClient::list_project_users`].
pub const PROJECT_USERS_QUERY_TOP: usize = 500;

/// Fields requested for list views.
pub const SUMMARY_FIELDS: [&str; 8] = [
    "System.Id",
    "System.Title",
    "System.WorkItemType",
    "System.State",
    "System.AssignedTo",
    "System.AreaPath",
    "System.IterationPath",
    "System.ChangedDate",
];

/// States that disqualify a work item from becoming a parent.
pub const CLOSED_STATES: [&str; 4] = ["Closed", "Done", "Removed", "Resolved"];

/// One JSON-Patch operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOperation {
    Add { path: String, value: Value },
    Replace { path: String, value: Value },
    Remove { path: String },
}

impl PatchOperation {
    fn add_field(field: &str, value: impl Into<Value>) -> Self {
        Self::Add {
            path: format!("/fields/{field}"),
            value: value.into(),
        }
    }

    fn replace_field(field: &str, value: impl Into<Value>) -> Self {
        Self::Replace {
            path: format!("/fields/{field}"),
            value: value.into(),
        }
    }
}

fn parent_relation(organization_url: &str, parent_id: i64) -> PatchOperation {
    PatchOperation::Add {
        path: "/relations/-".to_string(),
        value: json!({
            "rel": HIERARCHY_REVERSE,
            "url": format!("{organization_url}/_apis/wit/workItems/{parent_id}"),
        }),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Patch document for a new work item. The title always comes first; other
/// fields are only added when non-empty.
pub fn build_create_operations(
    payload: &WorkItemCreatePayload,
    organization_url: &str,
) -> Vec<PatchOperation> {
    let mut ops = vec![PatchOperation::add_field(
        "System.Title",
        payload.title.as_str(),
    )];
    if let Some(description) = non_empty(&payload.description) {
        ops.push(PatchOperation::add_field("System.Description", description));
    }
    if let Some(assignee) = non_empty(&payload.assigned_to) {
        ops.push(PatchOperation::add_field("System.AssignedTo", assignee));
    }
    if let Some(area) = non_empty(&payload.area_path) {
        ops.push(PatchOperation::add_field(
            "System.AreaPath",
            normalize_area_path(area),
        ));
    }
    if let Some(iteration) = non_empty(&payload.iteration_path) {
        ops.push(PatchOperation::add_field("System.IterationPath", iteration));
    }
    if let Some(parent_id) = payload.parent_id {
        ops.push(parent_relation(organization_url, parent_id));
    }
    ops
}

/// Patch document for an update; only the fields present are replaced, in a
/// fixed order.
pub fn build_update_operations(patch: &WorkItemUpdatePatch) -> Vec<PatchOperation> {
    let mut ops = Vec::new();
    if let Some(title) = &patch.title {
        ops.push(PatchOperation::replace_field("System.Title", title.as_str()));
    }
    if let Some(description) = &patch.description {
        ops.push(PatchOperation::replace_field(
            "System.Description",
            description.as_str(),
        ));
    }
    if let Some(state) = &patch.state {
        ops.push(PatchOperation::replace_field("System.State", state.as_str()));
    }
    if let Some(assignee) = &patch.assigned_to {
        ops.push(PatchOperation::replace_field(
            "System.AssignedTo",
            assignee.as_str(),
        ));
    }
    if let Some(area) = &patch.area_path {
        ops.push(PatchOperation::replace_field(
            "System.AreaPath",
            normalize_area_path(area),
        ));
    }
    if let Some(iteration) = &patch.iteration_path {
        ops.push(PatchOperation::replace_field(
            "System.IterationPath",
            iteration.as_str(),
        ));
    }
    ops
}

/// Keep iterations that have no finish date or finished within the three
/// calendar months before `now`.
pub fn filter_recent_iterations(iterations: Vec<Iteration>, now: DateTime<Utc>) -> Vec<Iteration> {
    let Some(cutoff) = now.checked_sub_months(Months::new(3)) else {
        return iterations;
    };
    iterations
        .into_iter()
        .filter(|i| i.finish_date.is_none_or(|finish| finish >= cutoff))
        .collect()
}

/// Drop closed-like items, the item itself and its children.
pub fn filter_parent_candidates(
    items: Vec<WorkItemSummary>,
    work_item_id: i64,
    child_ids: &[i64],
) -> Vec<WorkItemSummary> {
    items
        .into_iter()
        .filter(|item| {
            !CLOSED_STATES.contains(&item.state.as_str())
                && item.id != work_item_id
                && !child_ids.contains(&item.id)
        })
        .collect()
}

fn patch_body(ops: &[PatchOperation]) -> AdoResult<RequestBody> {
    let value =
        serde_json::to_value(ops).map_err(|e| TransportError::Encode(e.to_string()))?;
    Ok(RequestBody::JsonPatch(value))
}

/// Azure DevOps API client for work item management.
///
/// Every call reads configuration and the PAT through the transport, so a
/// client can be created once and kept for the life of the process.
///
/// # Example
///
/// ```rust,no_run
/// use adowork::api::AzureDevOpsClient;
/// use adowork::config::FileConfigStore;
/// use adowork::models::{WorkItemListFilters, WorkItemType};
/// use adowork::secret::EnvSecretStore;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = AzureDevOpsClient::with_stores(
///     Arc::new(FileConfigStore::default_location()?),
///     Arc::new(EnvSecretStore::default()),
/// )?;
///
/// let filters = WorkItemListFilters {
///     types: vec![WorkItemType::UserStory],
///     ..Default::default()
/// };
/// let items = client.list_work_items(&filters).await?;
/// println!("Found {} user stories", items.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AzureDevOpsClient {
    transport: Arc<dyn AdoTransport>,
}

impl AzureDevOpsClient {
    /// Creates a client over an arbitrary transport.
    pub fn new(transport: Arc<dyn AdoTransport>) -> Self {
        Self { transport }
    }

    /// Creates a client over [`HttpTransport`] backed by the given stores.
    pub fn with_stores(
        config_store: Arc<dyn ConfigStore>,
        secret_store: Arc<dyn SecretStore>,
    ) -> AdoResult<Self> {
        let transport = HttpTransport::new(config_store, secret_store)?;
        Ok(Self::new(Arc::new(transport)))
    }

    async fn fetch<T: DeserializeOwned>(&self, request: AdoRequest) -> AdoResult<T> {
        let endpoint = request.endpoint();
        let raw = self.transport.send(request).await?;
        Ok(schema::parse(&endpoint, &raw)?)
    }

    async fn run_wiql(&self, query: String, top: Option<usize>) -> AdoResult<AdoWiqlResult> {
        debug!(%query, "Running WIQL query");
        let mut request = AdoRequest::post(
            Scope::Project,
            ["wit", "wiql"],
            RequestBody::Json(json!({ "query": query })),
        );
        if let Some(top) = top {
            request = request.with_query("$top", top.to_string());
        }
        self.fetch(request).await
    }

    /// Fetches work items in sequential batches of [`BATCH_SIZE`].
    async fn fetch_batches(&self, ids: &[i64], fields: &[&str]) -> AdoResult<Vec<AdoWorkItem>> {
        let mut items = Vec::with_capacity(ids.len());
        let batch_count = ids.len().div_ceil(BATCH_SIZE);
        for (index, chunk) in ids.chunks(BATCH_SIZE).enumerate() {
            debug!(
                batch = index + 1,
                batch_count,
                size = chunk.len(),
                "Fetching work item batch"
            );
            let ids_param = chunk
                .iter()
                .map(i64::to_string)
                .collect::<Vec<_>>()
                .join(",");
            let request = AdoRequest::get(Scope::Project, ["wit", "workitems"])
                .with_query("ids", ids_param)
                .with_query("fields", fields.join(","));
            let batch: AdoBatchWorkItems = self.fetch(request).await?;
            items.extend(batch.value);
        }
        Ok(items)
    }

    /// Fetches summaries for `ids`, returned in the order of `ids`. Ids the
    /// server did not return are dropped.
    async fn fetch_summaries_in_order(&self, ids: &[i64]) -> AdoResult<Vec<WorkItemSummary>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut by_id: HashMap<i64, WorkItemSummary> = HashMap::with_capacity(ids.len());
        for item in self.fetch_batches(ids, &SUMMARY_FIELDS).await? {
            let summary = WorkItemSummary::try_from(item)?;
            by_id.insert(summary.id, summary);
        }

        let ordered: Vec<WorkItemSummary> =
            ids.iter().filter_map(|id| by_id.remove(id)).collect();
        if ordered.len() < ids.len() {
            debug!(
                requested = ids.len(),
                returned = ordered.len(),
                "Some work items were not returned by the batch fetch"
            );
        }
        Ok(ordered)
    }

    /// Lists work items matching `filters`, in query order.
    pub async fn list_work_items(
        &self,
        filters: &WorkItemListFilters,
    ) -> AdoResult<Vec<WorkItemSummary>> {
        let result = self.run_wiql(build_list_query(filters), None).await?;
        let ids: Vec<i64> = result
            .work_items
            .unwrap_or_default()
            .into_iter()
            .map(|r| r.id)
            .collect();
        debug!(count = ids.len(), "WIQL query matched work items");
        self.fetch_summaries_in_order(&ids).await
    }

    /// Lists the direct children of `parent_id`, oldest first.
    pub async fn list_children(&self, parent_id: i64) -> AdoResult<Vec<WorkItemSummary>> {
        let result = self
            .run_wiql(build_children_query(parent_id), None)
            .await?;
        let ids: Vec<i64> = result
            .work_item_relations
            .unwrap_or_default()
            .into_iter()
            .filter_map(|link| link.target)
            .map(|target| target.id)
            .filter(|id| *id != parent_id)
            .collect();
        self.fetch_summaries_in_order(&ids).await
    }

    async fn get_raw_work_item(&self, id: i64) -> AdoResult<AdoWorkItem> {
        let request = AdoRequest::get(
            Scope::Project,
            ["wit".to_string(), "workitems".to_string(), id.to_string()],
        )
        .with_query("$expand", "relations");
        self.fetch(request).await
    }

    /// Fetches one work item with its relations.
    pub async fn get_work_item(&self, id: i64) -> AdoResult<WorkItemDetail> {
        let item = self.get_raw_work_item(id).await?;
        Ok(WorkItemDetail::try_from(item)?)
    }

    async fn patch_work_item(&self, id: i64, ops: &[PatchOperation]) -> AdoResult<WorkItemDetail> {
        let request = AdoRequest::patch(
            Scope::Project,
            ["wit".to_string(), "workitems".to_string(), id.to_string()],
            patch_body(ops)?,
        );
        let item: AdoWorkItem = self.fetch(request).await?;
        Ok(WorkItemDetail::try_from(item)?)
    }

    /// Creates a work item and returns it as stored by the server.
    pub async fn create_work_item(
        &self,
        payload: &WorkItemCreatePayload,
    ) -> AdoResult<WorkItemDetail> {
        let organization_url = if payload.parent_id.is_some() {
            self.transport.organization_url()?
        } else {
            String::new()
        };
        let ops = build_create_operations(payload, &organization_url);
        let request = AdoRequest::post(
            Scope::Project,
            [
                "wit".to_string(),
                "workitems".to_string(),
                format!("${}", payload.work_item_type.as_str()),
            ],
            patch_body(&ops)?,
        );
        let item: AdoWorkItem = self.fetch(request).await?;
        debug!(id = item.id, work_item_type = %payload.work_item_type, "Created work item");
        Ok(WorkItemDetail::try_from(item)?)
    }

    /// Replaces the fields present in `patch`. An empty patch still issues
    /// the request.
    pub async fn update_work_item(
        &self,
        id: i64,
        patch: &WorkItemUpdatePatch,
    ) -> AdoResult<WorkItemDetail> {
        self.patch_work_item(id, &build_update_operations(patch))
            .await
    }

    /// Moves `id` under `parent_id`, or detaches it when `None`.
    pub async fn update_parent(
        &self,
        id: i64,
        parent_id: Option<i64>,
    ) -> AdoResult<WorkItemDetail> {
        let current = self.get_raw_work_item(id).await?;
        let mut ops: Vec<PatchOperation> = current
            .relations
            .iter()
            .flatten()
            .enumerate()
            .filter(|(_, r)| r.rel == HIERARCHY_REVERSE)
            .map(|(index, _)| PatchOperation::Remove {
                path: format!("/relations/{index}"),
            })
            .collect();
        // Later indices shift when earlier ones are removed.
        ops.reverse();

        if let Some(parent_id) = parent_id {
            let organization_url = self.transport.organization_url()?;
            ops.push(parent_relation(&organization_url, parent_id));
        }
        self.patch_work_item(id, &ops).await
    }

    /// Open work items one level above `work_item_type`, most recently
    /// changed first.
    pub async fn list_parent_candidates(
        &self,
        work_item_id: i64,
        work_item_type: &WorkItemType,
        child_ids: &[i64],
        area_path: Option<&str>,
    ) -> AdoResult<Vec<WorkItemSummary>> {
        let Some(parent_type) = work_item_type.parent_type() else {
            return Ok(Vec::new());
        };
        let filters = WorkItemListFilters {
            types: vec![parent_type],
            area_path: area_path.map(String::from),
            sort: SortOrder::ChangedDesc,
            ..Default::default()
        };
        let items = self.list_work_items(&filters).await?;
        Ok(filter_parent_candidates(items, work_item_id, child_ids))
    }

    /// Organization-wide user search through the identity picker.
    pub async fn search_identities(&self, query: &str) -> AdoResult<Vec<Identity>> {
        let request = AdoRequest::post(
            Scope::Organization,
            ["IdentityPicker", "Identities"],
            RequestBody::Json(json!({
                "query": query,
                "identityTypes": ["user"],
                "operationScopes": ["ims", "source"],
                "options": { "MinResults": 5, "MaxResults": 20 },
            })),
        )
        .with_api_version(IDENTITY_PICKER_API_VERSION);
        let result: AdoIdentitySearchResult = self.fetch(request).await?;
        Ok(result
            .results
            .into_iter()
            .flat_map(|group| group.identities)
            .filter_map(identity_from_picker)
            .collect())
    }

    /// Same as [`Self::search_identities`].
    pub async fn search_users(&self, query: &str) -> AdoResult<Vec<Identity>> {
        self.search_identities(query).await
    }

    /// Distinct assignees of recently changed work items, sorted by display
    /// name.
    pub async fn list_project_users(&self) -> AdoResult<Vec<Identity>> {
        let result = self
            .run_wiql(build_assigned_items_query(), Some(PROJECT_USERS_QUERY_TOP))
            .await?;
        let ids: Vec<i64> = result
            .work_items
            .unwrap_or_default()
            .into_iter()
            .take(BATCH_SIZE)
            .map(|r| r.id)
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let items = self.fetch_batches(&ids, &["System.AssignedTo"]).await?;
        let mut seen = HashSet::new();
        let mut users: Vec<Identity> = items
            .into_iter()
            .filter_map(|item| item.fields.assigned_to)
            .filter_map(identity_from_assignee)
            .filter(|identity| seen.insert(identity.id.clone()))
            .collect();
        users.sort_by_key(|u| u.display_name.to_lowercase());
        Ok(users)
    }

    /// The user the PAT belongs to.
    pub async fn get_current_user(&self) -> AdoResult<Identity> {
        let data: AdoConnectionData = self
            .fetch(AdoRequest::get(Scope::Organization, ["connectionData"]))
            .await?;
        let user = data.authenticated_user;
        Ok(Identity {
            id: user.id,
            display_name: user
                .custom_display_name
                .filter(|n| !n.is_empty())
                .unwrap_or(user.provider_display_name),
            unique_name: user.properties.account.value,
            image_url: None,
        })
    }

    pub async fn get_work_item_type_states(
        &self,
        work_item_type: &WorkItemType,
    ) -> AdoResult<Vec<WorkItemTypeState>> {
        let request = AdoRequest::get(
            Scope::Project,
            [
                "wit".to_string(),
                "workitemtypes".to_string(),
                work_item_type.as_str().to_string(),
                "states".to_string(),
            ],
        );
        let states: AdoWorkItemTypeStates = self.fetch(request).await?;
        Ok(states.value.into_iter().map(Into::into).collect())
    }

    /// Team iterations, minus those that finished more than three months ago.
    pub async fn list_iterations(&self) -> AdoResult<Vec<Iteration>> {
        let request = AdoRequest::get(Scope::Project, ["work", "teamsettings", "iterations"]);
        let iterations: AdoIterations = self.fetch(request).await?;
        let iterations = iterations.value.into_iter().map(Iteration::from).collect();
        Ok(filter_recent_iterations(iterations, Utc::now()))
    }

    /// The project's area tree, flattened in pre-order.
    pub async fn list_area_paths(&self) -> AdoResult<Vec<AreaPath>> {
        let request = AdoRequest::get(Scope::Project, ["wit", "classificationnodes", "areas"])
            .with_query("$depth", "10");
        let root: AdoClassificationNode = self.fetch(request).await?;
        Ok(flatten_area_tree(root))
    }

    /// Checks that the configuration and PAT can reach the organization.
    /// Never fails; the outcome is in the result.
    pub async fn test_connection(&self) -> ConnectionTestResult {
        match self
            .transport
            .send(AdoRequest::get(Scope::Organization, ["projects"]))
            .await
        {
            Ok(_) => ConnectionTestResult::ok(),
            Err(e) => ConnectionTestResult::failed(e.to_string()),
        }
    }
}
