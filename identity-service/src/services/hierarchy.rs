//! Hierarchy resolver: rebuilds the ancestor chain and descendant subtree of
//! a global id from the flat organization namespace.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

use super::error::ServiceError;
use super::store::OrganizationStore;
use crate::models::organization::{parent_global_id, GLOBAL_ID_SEPARATOR};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct OrganizationTreeNode {
    pub globalid: String,
    pub children: Vec<OrganizationTreeNode>,
}

/// Every prefix of `global_id`, shallowest first: `a.b.c` -> `[a, a.b, a.b.c]`.
pub fn ancestor_global_ids(global_id: &str) -> Vec<String> {
    let mut ancestors = Vec::new();
    let mut current = String::with_capacity(global_id.len());
    for (i, segment) in global_id.split(GLOBAL_ID_SEPARATOR).enumerate() {
        if i > 0 {
            current.push(GLOBAL_ID_SEPARATOR);
        }
        current.push_str(segment);
        ancestors.push(current.clone());
    }
    ancestors
}

/// Link a set of global ids into a tree rooted at the lexicographically first one.
///
/// Sorting puts every parent ahead of its children, so one pass suffices. A node
/// whose parent is absent means the namespace is inconsistent.
pub fn build_tree(
    mut global_ids: Vec<String>,
) -> Result<Option<OrganizationTreeNode>, ServiceError> {
    global_ids.sort();
    global_ids.dedup();

    let mut children: Vec<Vec<usize>> = Vec::with_capacity(global_ids.len());
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(global_ids.len());

    for (i, global_id) in global_ids.iter().enumerate() {
        children.push(Vec::new());
        index.insert(global_id.as_str(), i);
        if i == 0 {
            continue;
        }

        let parent = parent_global_id(global_id)
            .and_then(|parent| index.get(parent).copied())
            .ok_or_else(|| {
                ServiceError::Inconsistent(format!("parent of {} not present in tree", global_id))
            })?;
        children[parent].push(i);
    }

    if global_ids.is_empty() {
        return Ok(None);
    }
    Ok(Some(assemble(0, &global_ids, &children)))
}

fn assemble(node: usize, global_ids: &[String], children: &[Vec<usize>]) -> OrganizationTreeNode {
    OrganizationTreeNode {
        globalid: global_ids[node].clone(),
        children: children[node]
            .iter()
            .map(|&child| assemble(child, global_ids, children))
            .collect(),
    }
}

#[derive(Clone)]
pub struct HierarchyResolver {
    organizations: Arc<dyn OrganizationStore>,
}

impl HierarchyResolver {
    pub fn new(organizations: Arc<dyn OrganizationStore>) -> Self {
        Self { organizations }
    }

    /// Tree of every stored ancestor and descendant of `global_id`.
    #[tracing::instrument(skip(self))]
    pub async fn resolve(&self, global_id: &str) -> Result<OrganizationTreeNode, ServiceError> {
        let ancestors = ancestor_global_ids(global_id);
        let mut organizations = self.organizations.get_many(&ancestors).await?;
        organizations.extend(self.organizations.get_descendants(global_id).await?);

        let global_ids = organizations.into_iter().map(|org| org.global_id).collect();
        match build_tree(global_ids) {
            Ok(Some(tree)) => Ok(tree),
            Ok(None) => Err(ServiceError::OrganizationNotFound(global_id.to_string())),
            Err(e) => {
                tracing::error!(error = %e, "Organization tree is inconsistent");
                Err(e)
            }
        }
    }
}
