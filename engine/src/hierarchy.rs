//! Assembling queue nodes from classified properties.

use std::collections::BTreeMap;

use diagnostics::ValidationIssue;
use tracing::warn;

use crate::classify::ClassifiedProperties;
use crate::conventions::{parent_path, SchedulerConventions};
use crate::tree::QueueNode;

/// Build the node map for every discovered path and attach base properties.
///
/// Ancestors of a discovered path are always themselves discovered (children
/// are only ever registered under known parents), so every created node is a
/// confirmed queue. A child that was declared in a parent's list but carries
/// no properties of its own is kept in the tree and reported as a structural
/// warning.
pub fn build_nodes(
    classified: &ClassifiedProperties,
    conventions: &SchedulerConventions,
) -> (BTreeMap<String, QueueNode>, Vec<ValidationIssue>) {
    let mut nodes: BTreeMap<String, QueueNode> = BTreeMap::new();
    nodes.insert(
        conventions.root_path.clone(),
        QueueNode::new(&conventions.root_path, true),
    );

    for path in &classified.paths {
        nodes
            .entry(path.clone())
            .or_insert_with(|| QueueNode::new(path, true))
            .discovered = true;
        if let Some(parent) = parent_path(path) {
            let segment = crate::conventions::last_segment(path).to_string();
            nodes
                .entry(parent.to_string())
                .or_insert_with(|| QueueNode::new(parent, true))
                .children
                .insert(segment);
        }
    }

    for scoped in &classified.scoped {
        if let Some(node) = nodes.get_mut(&scoped.queue_path) {
            node.base_properties
                .insert(scoped.name.clone(), scoped.value.clone());
        }
    }

    let mut warnings = Vec::new();
    for (path, node) in &nodes {
        if path != &conventions.root_path && node.base_properties.is_empty() {
            warn!(%path, "queue declared in a parent list but not found");
            warnings.push(ValidationIssue::warning(
                path.clone(),
                format!("Queue {path} is declared in its parent's queue list but has no properties"),
            ));
        }
    }

    (nodes, warnings)
}
