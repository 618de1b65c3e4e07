//! Domain types returned by and passed to the work item client.
//!
//! These are request/response values only; nothing here is persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of work item.
///
/// Server type names outside the four planning levels (e.g. `Bug`) are kept
/// as [`WorkItemType::Other`] so hierarchy reads do not fail on them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WorkItemType {
    Epic,
    Feature,
    UserStory,
    Task,
    Other(String),
}

impl WorkItemType {
    /// The four planning levels, top-down.
    pub const ALL: [WorkItemType; 4] = [
        WorkItemType::Epic,
        WorkItemType::Feature,
        WorkItemType::UserStory,
        WorkItemType::Task,
    ];

    /// Name used by Azure DevOps for this type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Epic => "Epic",
            Self::Feature => "Feature",
            Self::UserStory => "User Story",
            Self::Task => "Task",
            Self::Other(name) => name,
        }
    }

    /// The type one level up in the backlog hierarchy, if any.
    pub fn parent_type(&self) -> Option<WorkItemType> {
        match self {
            Self::Task => Some(Self::UserStory),
            Self::UserStory => Some(Self::Feature),
            Self::Feature => Some(Self::Epic),
            Self::Epic | Self::Other(_) => None,
        }
    }
}

impl From<String> for WorkItemType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "Epic" => Self::Epic,
            "Feature" => Self::Feature,
            "User Story" => Self::UserStory,
            "Task" => Self::Task,
            _ => Self::Other(name),
        }
    }
}

impl From<&str> for WorkItemType {
    fn from(name: &str) -> Self {
        Self::from(name.to_string())
    }
}

impl From<WorkItemType> for String {
    fn from(kind: WorkItemType) -> Self {
        match kind {
            WorkItemType::Other(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for WorkItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Person a work item is assigned to, as shown in summaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedTo {
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_name: Option<String>,
}

/// A work item as shown in lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItemSummary {
    pub id: i64,
    pub url: String,
    #[serde(rename = "type")]
    pub work_item_type: WorkItemType,
    pub title: String,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<AssignedTo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iteration_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed_date: Option<DateTime<Utc>>,
}

/// A single work item with its description, tags and parent link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItemDetail {
    #[serde(flatten)]
    pub summary: WorkItemSummary,
    /// Raw HTML from the server; not sanitized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Derived from the hierarchy-reverse relation, never stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
}

/// Who the listed work items must be assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssigneeFilter {
    /// The user owning the PAT (`@Me`).
    Me,
    /// A specific organization member.
    #[serde(rename_all = "camelCase")]
    Identity {
        identity_id: String,
        unique_name: Option<String>,
    },
}

/// Result ordering for [`WorkItemListFilters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    #[default]
    ChangedDesc,
    CreatedDesc,
}

/// Structured filter translated into a WIQL query.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItemListFilters {
    #[serde(default)]
    pub types: Vec<WorkItemType>,
    #[serde(default)]
    pub assigned_to: Option<AssigneeFilter>,
    #[serde(default)]
    pub states: Vec<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub area_path: Option<String>,
    #[serde(default)]
    pub iteration_path: Option<String>,
    #[serde(default)]
    pub changed_since_days: Option<u32>,
    #[serde(default)]
    pub sort: SortOrder,
}

/// Fields for a new work item. Only present fields are sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItemCreatePayload {
    #[serde(rename = "type")]
    pub work_item_type: WorkItemType,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub area_path: Option<String>,
    #[serde(default)]
    pub iteration_path: Option<String>,
}

impl WorkItemCreatePayload {
    pub fn new(work_item_type: WorkItemType, title: impl Into<String>) -> Self {
        Self {
            work_item_type,
            title: title.into(),
            description: None,
            assigned_to: None,
            parent_id: None,
            area_path: None,
            iteration_path: None,
        }
    }
}

/// Sparse update. Absent fields are left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItemUpdatePatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub area_path: Option<String>,
    #[serde(default)]
    pub iteration_path: Option<String>,
}

impl WorkItemUpdatePatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// An organization member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub display_name: String,
    pub unique_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// A sprint/iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Iteration {
    pub id: String,
    pub name: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_date: Option<DateTime<Utc>>,
}

/// One node of the area classification tree, flattened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaPath {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub has_children: bool,
}

/// A workflow state allowed for a work item type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItemTypeState {
    pub name: String,
    pub color: String,
    pub category: String,
}

/// Outcome of a connectivity probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionTestResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConnectionTestResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_item_type_names() {
        assert_eq!(WorkItemType::from("User Story"), WorkItemType::UserStory);
        assert_eq!(WorkItemType::UserStory.to_string(), "User Story");
        assert_eq!(
            WorkItemType::from("Bug"),
            WorkItemType::Other("Bug".to_string())
        );
        assert_eq!(String::from(WorkItemType::from("Bug")), "Bug");
    }

    #[test]
    fn test_parent_type_chain() {
        assert_eq!(
            WorkItemType::Task.parent_type(),
            Some(WorkItemType::UserStory)
        );
        assert_eq!(
            WorkItemType::UserStory.parent_type(),
            Some(WorkItemType::Feature)
        );
        assert_eq!(WorkItemType::Feature.parent_type(), Some(WorkItemType::Epic));
        assert_eq!(WorkItemType::Epic.parent_type(), None);
        assert_eq!(WorkItemType::from("Bug").parent_type(), None);
    }

    #[test]
    fn test_summary_serializes_platform_type_name() {
        let summary = WorkItemSummary {
            id: 7,
            url: "https://example.test/7".to_string(),
            work_item_type: WorkItemType::UserStory,
            title: "Story".to_string(),
            state: "New".to_string(),
            assigned_to: None,
            area_path: None,
            iteration_path: None,
            changed_date: None,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["type"], "User Story");
        assert!(json.get("assignedTo").is_none());
    }

    #[test]
    fn test_detail_flattens_summary() {
        let json = serde_json::json!({
            "id": 1,
            "url": "u",
            "type": "Task",
            "title": "T",
            "state": "Active",
            "parentId": 9
        });
        let detail: WorkItemDetail = serde_json::from_value(json).unwrap();
        assert_eq!(detail.summary.work_item_type, WorkItemType::Task);
        assert_eq!(detail.parent_id, Some(9));
    }

    #[test]
    fn test_update_patch_is_empty() {
        assert!(WorkItemUpdatePatch::default().is_empty());
        let patch = WorkItemUpdatePatch {
            state: Some("Done".to_string()),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
