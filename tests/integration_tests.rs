//! Integration tests for the adowork library
//!
//! These tests drive the public client API against a local mock server and
//! verify the full path: stores, transport, validation and mapping.

use adowork::config::{AdoConfig, ConfigStore, MemoryConfigStore};
use adowork::error::{AdoError, ApiError, ConfigError};
use adowork::models::{WorkItemCreatePayload, WorkItemListFilters, WorkItemType};
use adowork::secret::{MemorySecretStore, SecretStore};
use adowork::AzureDevOpsClient;
use mockito::{Matcher, Server, ServerGuard};
use secrecy::SecretString;
use serde_json::json;
use std::sync::Arc;

const PAT_HEADER: &str = "Basic OnRlc3QtcGF0LXRva2Vu";

struct Harness {
    server: ServerGuard,
    config_store: Arc<MemoryConfigStore>,
    secret_store: Arc<MemorySecretStore>,
    client: AzureDevOpsClient,
}

impl Harness {
    async fn new() -> Self {
        let server = Server::new_async().await;
        let config_store = Arc::new(MemoryConfigStore::new(Some(AdoConfig::new(
            format!("{}/test-org", server.url()),
            "test-project",
        ))));
        let secret_store = Arc::new(MemorySecretStore::new(Some("test-pat-token".to_string())));
        let client =
            AzureDevOpsClient::with_stores(config_store.clone(), secret_store.clone()).unwrap();
        Self {
            server,
            config_store,
            secret_store,
            client,
        }
    }

    fn org_url(&self) -> String {
        format!("{}/test-org", self.server.url())
    }
}

fn work_item(id: i64, org_url: &str) -> serde_json::Value {
    json!({
        "id": id,
        "url": format!("{org_url}/_apis/wit/workItems/{id}"),
        "fields": {
            "System.Id": id,
            "System.Title": format!("Item {id}"),
            "System.WorkItemType": "User Story",
            "System.State": "Active",
            "System.AssignedTo": { "displayName": "Ann", "uniqueName": "ann@example.com", "id": "a-1" },
            "System.AreaPath": "test-project\\Team",
            "System.ChangedDate": "2024-05-01T08:30:00.123Z"
        }
    })
}

/// # List Flow
///
/// Tests a full list: WIQL then one batch, reordered to query order.
///
/// ## Test Scenario
/// - WIQL answers ids [2, 1]; the batch answers [1, 2]
///
/// ## Expected Outcome
/// - Both calls carry the PAT header and api-version
/// - Output order is [2, 1] with mapped fields
#[tokio::test]
async fn test_list_work_items_end_to_end() {
    let mut h = Harness::new().await;
    let org_url = h.org_url();

    let wiql = h
        .server
        .mock("POST", "/test-org/test-project/_apis/wit/wiql")
        .match_query(Matcher::UrlEncoded("api-version".into(), "7.1".into()))
        .match_header("authorization", PAT_HEADER)
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(json!({
            "query": "SELECT [System.Id] FROM WorkItems WHERE [System.AssignedTo] = @Me ORDER BY [System.ChangedDate] DESC"
        })))
        .with_body(json!({ "workItems": [ { "id": 2 }, { "id": 1 } ] }).to_string())
        .create_async()
        .await;

    let batch = h
        .server
        .mock("GET", "/test-org/test-project/_apis/wit/workitems")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("ids".into(), "2,1".into()),
            Matcher::UrlEncoded("api-version".into(), "7.1".into()),
        ]))
        .match_header("authorization", PAT_HEADER)
        .with_body(json!({ "value": [work_item(1, &org_url), work_item(2, &org_url)] }).to_string())
        .create_async()
        .await;

    let filters = WorkItemListFilters {
        assigned_to: Some(adowork::models::AssigneeFilter::Me),
        ..Default::default()
    };
    let items = h.client.list_work_items(&filters).await.unwrap();

    let ids: Vec<i64> = items.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![2, 1]);
    assert_eq!(items[0].work_item_type, WorkItemType::UserStory);
    assert_eq!(
        items[0].assigned_to.as_ref().unwrap().unique_name.as_deref(),
        Some("ann@example.com")
    );
    assert!(items[0].changed_date.is_some());

    wiql.assert_async().await;
    batch.assert_async().await;
}

/// # Error Body Surfaced Verbatim
///
/// Tests that a 401 from the server reaches the caller unchanged.
///
/// ## Test Scenario
/// - Server answers 401 with a plain-text body
///
/// ## Expected Outcome
/// - ApiError with status 401 and the literal body in the message
#[tokio::test]
async fn test_unauthorized_body_is_verbatim() {
    let mut h = Harness::new().await;
    let _m = h
        .server
        .mock("GET", "/test-org/test-project/_apis/wit/workitems/5")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body("Unauthorized - Invalid PAT")
        .create_async()
        .await;

    let err = h.client.get_work_item(5).await.unwrap_err();
    assert!(matches!(
        err,
        AdoError::Api(ApiError::RequestFailed { status: 401, .. })
    ));
    assert_eq!(
        err.to_string(),
        "Azure DevOps API error: 401 Unauthorized - Invalid PAT"
    );
}

/// # Stores Are Read Per Call
///
/// Tests that store changes take effect without rebuilding the client.
///
/// ## Test Scenario
/// - Clears the PAT, runs a connection test, stores it again, reruns
///
/// ## Expected Outcome
/// - First test reports "PAT not configured" without any request
/// - Second test succeeds
#[tokio::test]
async fn test_stores_are_read_per_call() {
    let mut h = Harness::new().await;
    let projects = h
        .server
        .mock("GET", "/test-org/_apis/projects")
        .match_query(Matcher::Any)
        .with_body(r#"{"count":0,"value":[]}"#)
        .expect(1)
        .create_async()
        .await;

    h.secret_store.clear_secret().unwrap();
    let result = h.client.test_connection().await;
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("PAT not configured"));

    h.secret_store
        .set_secret(SecretString::from("test-pat-token".to_string()))
        .unwrap();
    let result = h.client.test_connection().await;
    assert!(result.success, "{:?}", result.error);

    projects.assert_async().await;
}

#[tokio::test]
async fn test_missing_config_checked_first() {
    let config_store = Arc::new(MemoryConfigStore::default());
    let secret_store = Arc::new(MemorySecretStore::default());
    let client = AzureDevOpsClient::with_stores(config_store.clone(), secret_store).unwrap();

    let err = client
        .list_work_items(&WorkItemListFilters::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AdoError::Config(ConfigError::NotConfigured)));
    assert!(config_store.get_config().is_none());
}

/// # Create With Parent
///
/// Tests the create request shape against the server.
///
/// ## Test Scenario
/// - Creates a Task under parent 9
///
/// ## Expected Outcome
/// - POST to `$Task` with json-patch content type
/// - Parent relation URL is built from the configured organization
#[tokio::test]
async fn test_create_work_item_end_to_end() {
    let mut h = Harness::new().await;
    let org_url = h.org_url();

    let mut created = work_item(30, &org_url);
    created["fields"]["System.WorkItemType"] = json!("Task");
    created["relations"] = json!([
        { "rel": "System.LinkTypes.Hierarchy-Reverse", "url": format!("{org_url}/_apis/wit/workItems/9") }
    ]);

    let mock = h
        .server
        .mock("POST", "/test-org/test-project/_apis/wit/workitems/$Task")
        .match_query(Matcher::UrlEncoded("api-version".into(), "7.1".into()))
        .match_header("content-type", "application/json-patch+json")
        .match_body(Matcher::Json(json!([
            { "op": "add", "path": "/fields/System.Title", "value": "Subtask" },
            { "op": "add", "path": "/relations/-", "value": {
                "rel": "System.LinkTypes.Hierarchy-Reverse",
                "url": format!("{org_url}/_apis/wit/workItems/9")
            } }
        ])))
        .with_body(created.to_string())
        .create_async()
        .await;

    let payload = WorkItemCreatePayload {
        parent_id: Some(9),
        ..WorkItemCreatePayload::new(WorkItemType::Task, "Subtask")
    };
    let detail = h.client.create_work_item(&payload).await.unwrap();

    assert_eq!(detail.summary.id, 30);
    assert_eq!(detail.parent_id, Some(9));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_reconfigure_changes_target() {
    let h = Harness::new().await;
    let mut other = Server::new_async().await;
    let mock = other
        .mock("GET", "/other-org/_apis/projects")
        .match_query(Matcher::Any)
        .with_body("{}")
        .create_async()
        .await;

    h.config_store
        .set_config(AdoConfig::new(format!("{}/other-org", other.url()), "p"))
        .unwrap();
    assert!(h.client.test_connection().await.success);
    mock.assert_async().await;
}

#[test]
fn test_library_version() {
    let version = adowork::VERSION;
    assert!(!version.is_empty());
    assert!(version.contains('.'));
}
