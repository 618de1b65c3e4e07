//! WIQL construction.
//!
//! Queries only ever select ids; field data is fetched separately in
//! batches. Every user-supplied string goes through [`escape_wiql`] before it
//! is interpolated.

use crate::models::{AssigneeFilter, SortOrder, WorkItemListFilters};

/// Link type on a child that points at its parent.
pub const HIERARCHY_REVERSE: &str = "System.LinkTypes.Hierarchy-Reverse";

/// Link type on a parent that points at its children.
pub const HIERARCHY_FORWARD: &str = "System.LinkTypes.Hierarchy-Forward";

/// Double every single quote so the value can sit inside a WIQL literal.
#[must_use]
pub fn escape_wiql(value: &str) -> String {
    value.replace('\'', "''")
}

/// Bring a classification-node path into the form work item fields use.
///
/// Classification nodes report `\Project\Area\Team`; the work item field for
/// the same area is `Project\Team`. Strips one leading separator, then the
/// `Area` segment directly under the project.
#[must_use]
pub fn normalize_area_path(path: &str) -> String {
    let trimmed = path.strip_prefix('\\').unwrap_or(path);
    let mut segments: Vec<&str> = trimmed.split('\\').collect();
    if segments.len() > 1 && segments[1] == "Area" {
        segments.remove(1);
    }
    segments.join("\\")
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Translate list filters into a WIQL query selecting work item ids.
#[must_use]
pub fn build_list_query(filters: &WorkItemListFilters) -> String {
    let mut conditions: Vec<String> = Vec::new();

    if !filters.types.is_empty() {
        let types: Vec<String> = filters
            .types
            .iter()
            .map(|t| format!("[System.WorkItemType] = '{}'", escape_wiql(t.as_str())))
            .collect();
        conditions.push(format!("({})", types.join(" OR ")));
    }

    match &filters.assigned_to {
        Some(AssigneeFilter::Me) => conditions.push("[System.AssignedTo] = @Me".to_string()),
        Some(AssigneeFilter::Identity {
            identity_id,
            unique_name,
        }) => {
            let key = unique_name
                .as_deref()
                .filter(|n| !n.is_empty())
                .unwrap_or(identity_id);
            conditions.push(format!("[System.AssignedTo] = '{}'", escape_wiql(key)));
        }
        None => {}
    }

    if !filters.states.is_empty() {
        let states: Vec<String> = filters
            .states
            .iter()
            .map(|s| format!("[System.State] = '{}'", escape_wiql(s)))
            .collect();
        conditions.push(format!("({})", states.join(" OR ")));
    }

    if let Some(text) = non_empty(&filters.text) {
        conditions.push(format!("[System.Title] CONTAINS '{}'", escape_wiql(text)));
    }

    if let Some(area) = non_empty(&filters.area_path) {
        conditions.push(format!(
            "[System.AreaPath] UNDER '{}'",
            escape_wiql(&normalize_area_path(area))
        ));
    }

    if let Some(iteration) = non_empty(&filters.iteration_path) {
        conditions.push(format!(
            "[System.IterationPath] UNDER '{}'",
            escape_wiql(iteration)
        ));
    }

    if let Some(days) = filters.changed_since_days.filter(|d| *d > 0) {
        conditions.push(format!("[System.ChangedDate] >= @Today - {days}"));
    }

    let order_by = match filters.sort {
        SortOrder::ChangedDesc => "ORDER BY [System.ChangedDate] DESC",
        SortOrder::CreatedDesc => "ORDER BY [System.CreatedDate] DESC",
    };

    if conditions.is_empty() {
        format!("SELECT [System.Id] FROM WorkItems {order_by}")
    } else {
        format!(
            "SELECT [System.Id] FROM WorkItems WHERE {} {order_by}",
            conditions.join(" AND ")
        )
    }
}

/// Link query returning `(parent, child)` pairs for the direct children of
/// `parent_id`, oldest child first.
#[must_use]
pub fn build_children_query(parent_id: i64) -> String {
    format!(
        "SELECT [System.Id] FROM WorkItemLinks \
         WHERE ([Source].[System.Id] = {parent_id}) \
         AND ([System.Links.LinkType] = '{}') \
         ORDER BY [Target].[System.CreatedDate] ASC \
         MODE (MustContain)",
        escape_wiql(HIERARCHY_FORWARD)
    )
}

/// Recently changed work items that have an assignee.
#[must_use]
pub fn build_assigned_items_query() -> String {
    "SELECT [System.Id] FROM WorkItems WHERE [System.AssignedTo] <> '' \
     ORDER BY [System.ChangedDate] DESC"
        .to_string()
}
