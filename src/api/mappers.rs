//! Conversions from validated response shapes to domain types.
//!
//! Work item conversions are fallible: title, type and state must be present,
//! everything else degrades to `None`.

use super::schema::{
    AdoClassificationNode, AdoIdentity, AdoIteration, AdoWorkItem, AdoWorkItemTypeState,
};
use super::wiql::{HIERARCHY_REVERSE, normalize_area_path};
use crate::error::DomainError;
use crate::models::{
    AreaPath, AssignedTo, Identity, Iteration, WorkItemDetail, WorkItemSummary, WorkItemType,
    WorkItemTypeState,
};

fn required(id: i64, value: Option<String>, field: &'static str) -> Result<String, DomainError> {
    value.ok_or(DomainError::MissingField { id, field })
}

/// Split the `;`-separated tag string, dropping empty entries.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// Extract the parent id from the first hierarchy-reverse relation.
///
/// The relation URL ends with the parent's id, e.g.
/// `https://dev.azure.com/org/_apis/wit/workItems/42`. A URL without a
/// numeric trailing segment yields `None`.
pub fn extract_parent_id(item: &AdoWorkItem) -> Option<i64> {
    let relation = item
        .relations
        .iter()
        .flatten()
        .find(|r| r.rel == HIERARCHY_REVERSE)?;

    let parent_id = relation
        .url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse::<i64>().ok());
    if parent_id.is_none() {
        tracing::warn!(
            id = item.id,
            url = %relation.url,
            "Ignoring hierarchy relation with malformed URL"
        );
    }
    parent_id
}

impl TryFrom<AdoWorkItem> for WorkItemSummary {
    type Error = DomainError;

    fn try_from(item: AdoWorkItem) -> Result<Self, Self::Error> {
        let id = item.id;
        let fields = item.fields;
        Ok(WorkItemSummary {
            id,
            url: item.url,
            work_item_type: WorkItemType::from(required(
                id,
                fields.work_item_type,
                "System.WorkItemType",
            )?),
            title: required(id, fields.title, "System.Title")?,
            state: required(id, fields.state, "System.State")?,
            assigned_to: fields.assigned_to.map(|a| AssignedTo {
                display_name: a.display_name,
                unique_name: a.unique_name,
            }),
            area_path: fields.area_path,
            iteration_path: fields.iteration_path,
            changed_date: fields.changed_date,
        })
    }
}

impl TryFrom<AdoWorkItem> for WorkItemDetail {
    type Error = DomainError;

    fn try_from(mut item: AdoWorkItem) -> Result<Self, Self::Error> {
        let parent_id = extract_parent_id(&item);
        let description_html = item.fields.description.take();
        let tags = item.fields.tags.take().map(|raw| split_tags(&raw));
        Ok(WorkItemDetail {
            summary: WorkItemSummary::try_from(item)?,
            description_html,
            tags,
            parent_id,
        })
    }
}

/// Identity picker entry to [`Identity`]; entries without any id are skipped
/// by returning `None`.
pub fn identity_from_picker(identity: AdoIdentity) -> Option<Identity> {
    let id = identity.local_id.or(identity.id)?;
    let unique_name = identity
        .sign_in_address
        .filter(|s| !s.is_empty())
        .or(identity.sam_account_name.filter(|s| !s.is_empty()))
        .or(identity.unique_name)
        .unwrap_or_default();
    Some(Identity {
        id,
        display_name: identity.display_name,
        unique_name,
        image_url: identity.image.or(identity.image_url),
    })
}

/// `System.AssignedTo` value to [`Identity`]; `None` without an id.
pub fn identity_from_assignee(identity: AdoIdentity) -> Option<Identity> {
    Some(Identity {
        id: identity.id?,
        display_name: identity.display_name,
        unique_name: identity.unique_name.unwrap_or_default(),
        image_url: identity.image_url,
    })
}

impl From<AdoIteration> for Iteration {
    fn from(iteration: AdoIteration) -> Self {
        let attributes = iteration.attributes.unwrap_or_default();
        Iteration {
            id: iteration.id,
            name: iteration.name,
            path: iteration.path,
            start_date: attributes.start_date,
            finish_date: attributes.finish_date,
        }
    }
}

impl From<AdoWorkItemTypeState> for WorkItemTypeState {
    fn from(state: AdoWorkItemTypeState) -> Self {
        WorkItemTypeState {
            name: state.name,
            color: state.color,
            category: state.category,
        }
    }
}

/// Pre-order flatten of the area tree, with work-item-style paths.
pub fn flatten_area_tree(root: AdoClassificationNode) -> Vec<AreaPath> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        out.push(AreaPath {
            id: node.id,
            name: node.name,
            path: normalize_area_path(&node.path),
            has_children: node.has_children,
        });
        stack.extend(node.children.into_iter().rev());
    }
    out
}
