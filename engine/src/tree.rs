//! The in-memory queue hierarchy: base state plus the pending overlay.
//!
//! Nodes live in a single `BTreeMap` keyed by full path, which makes parent
//! linkage a path computation instead of an ownership edge and gives the
//! sorted live-path listing for free. The whole tree is rebuilt from scratch
//! on every fresh load; staging only ever touches the overlay.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::classify::classify;
use crate::conventions::{parent_path, SchedulerConventions};
use crate::hierarchy::build_nodes;
use crate::payload::Property;
use diagnostics::ValidationIssue;

/// Opaque identifier of one staged change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChangeId(Uuid);

impl ChangeId {
    pub(crate) fn mint() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ChangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The pending operation on one node.
///
/// Exactly one pending operation exists per node at any time; the enum makes
/// that a type-level invariant rather than a runtime convention.
#[derive(Debug, Clone, PartialEq)]
pub enum StagedChange {
    /// The queue does not exist remotely; effective state is `props` alone.
    Add {
        props: BTreeMap<String, String>,
        id: ChangeId,
        at: DateTime<Utc>,
    },
    /// Delta over the base state. `old` snapshots the prior base value for
    /// every key first touched by this change (`None` = key was absent),
    /// which is what rollback and previews read.
    Update {
        props: BTreeMap<String, String>,
        old: BTreeMap<String, Option<String>>,
        id: ChangeId,
        at: DateTime<Utc>,
    },
    /// Soft delete: effective state is empty, the node object is retained
    /// until the change is cleared or the tree reloaded.
    Delete { id: ChangeId, at: DateTime<Utc> },
}

impl StagedChange {
    pub fn id(&self) -> ChangeId {
        match self {
            Self::Add { id, .. } | Self::Update { id, .. } | Self::Delete { id, .. } => *id,
        }
    }

    pub fn staged_at(&self) -> DateTime<Utc> {
        match self {
            Self::Add { at, .. } | Self::Update { at, .. } | Self::Delete { at, .. } => *at,
        }
    }
}

/// One node of the hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueNode {
    pub segment: String,
    pub full_path: String,
    /// True when the load discovered this path as a real queue. Ancestors
    /// created implicitly by a staged addition stay false.
    pub discovered: bool,
    /// Properties as loaded from the remote source; immutable until reload.
    pub base_properties: BTreeMap<String, String>,
    pub staged: Option<StagedChange>,
    /// Child segments; re-derivable from the child-list property, kept for
    /// structure queries.
    pub children: BTreeSet<String>,
}

impl QueueNode {
    pub(crate) fn new(full_path: &str, discovered: bool) -> Self {
        Self {
            segment: crate::conventions::last_segment(full_path).to_string(),
            full_path: full_path.to_string(),
            discovered,
            base_properties: BTreeMap::new(),
            staged: None,
            children: BTreeSet::new(),
        }
    }

    /// A node is a queue once discovered by a load or staged as an addition.
    pub fn is_queue(&self) -> bool {
        self.discovered || matches!(self.staged, Some(StagedChange::Add { .. }))
    }

    pub fn pending_delete(&self) -> bool {
        matches!(self.staged, Some(StagedChange::Delete { .. }))
    }
}

/// Scheduler-wide properties outside any queue. Global updates batch under a
/// single change id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalConfigState {
    pub base_properties: BTreeMap<String, String>,
    pub staged: Option<GlobalChange>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlobalChange {
    pub props: BTreeMap<String, String>,
    pub old: BTreeMap<String, Option<String>>,
    pub id: ChangeId,
    pub at: DateTime<Utc>,
}

/// The staged configuration: queue tree, global state, and the conventions
/// the tree was classified under.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    conventions: SchedulerConventions,
    nodes: BTreeMap<String, QueueNode>,
    global: GlobalConfigState,
}

impl SchedulerConfig {
    /// Build the tree from a freshly fetched flat property set. Any previous
    /// tree, including all pending state, is discarded by construction.
    /// Structural problems come back as warnings alongside the best-effort
    /// tree; this never fails.
    pub fn from_properties(
        properties: &[Property],
        conventions: SchedulerConventions,
    ) -> (Self, Vec<ValidationIssue>) {
        let classified = classify(properties, &conventions);
        let mut warnings = classified.warnings.clone();
        let (nodes, structural) = build_nodes(&classified, &conventions);
        warnings.extend(structural);

        let config = Self {
            conventions,
            nodes,
            global: GlobalConfigState {
                base_properties: classified.global,
                staged: None,
            },
        };
        (config, warnings)
    }

    /// An empty tree holding only the root queue.
    pub fn empty(conventions: SchedulerConventions) -> Self {
        let root = QueueNode::new(&conventions.root_path, true);
        let nodes = BTreeMap::from([(conventions.root_path.clone(), root)]);
        Self {
            conventions,
            nodes,
            global: GlobalConfigState::default(),
        }
    }

    pub fn conventions(&self) -> &SchedulerConventions {
        &self.conventions
    }

    /// Exact path lookup, root-relative.
    pub fn node(&self, path: &str) -> Option<&QueueNode> {
        self.nodes.get(path)
    }

    pub(crate) fn node_mut(&mut self, path: &str) -> Option<&mut QueueNode> {
        self.nodes.get_mut(path)
    }

    pub(crate) fn nodes(&self) -> &BTreeMap<String, QueueNode> {
        &self.nodes
    }

    pub(crate) fn insert_node(&mut self, node: QueueNode) {
        self.nodes.insert(node.full_path.clone(), node);
    }

    pub(crate) fn global_state(&self) -> &GlobalConfigState {
        &self.global
    }

    pub(crate) fn global_state_mut(&mut self) -> &mut GlobalConfigState {
        &mut self.global
    }

    /// True when `path` or any of its ancestors has a pending delete.
    pub(crate) fn in_deleted_subtree(&self, path: &str) -> bool {
        let mut current = Some(path);
        while let Some(p) = current {
            if self.nodes.get(p).is_some_and(QueueNode::pending_delete) {
                return true;
            }
            current = parent_path(p);
        }
        false
    }

    /// Effective properties of one queue, per its pending operation. Empty
    /// for unknown paths and for anything inside a deleted subtree. Always a
    /// fresh copy, never a view of internal state.
    pub fn effective_properties(&self, path: &str) -> BTreeMap<String, String> {
        let Some(node) = self.nodes.get(path) else {
            return BTreeMap::new();
        };
        if self.in_deleted_subtree(path) {
            return BTreeMap::new();
        }
        match &node.staged {
            None => node.base_properties.clone(),
            Some(StagedChange::Add { props, .. }) => props.clone(),
            Some(StagedChange::Update { props, .. }) => {
                let mut merged = node.base_properties.clone();
                merged.extend(props.clone());
                merged
            }
            Some(StagedChange::Delete { .. }) => BTreeMap::new(),
        }
    }

    /// Every live queue path, sorted lexicographically. Delete-pending
    /// subtrees are excluded while their node objects remain in the tree.
    pub fn live_paths(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|(path, node)| node.is_queue() && !self.in_deleted_subtree(path))
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Global base properties overlaid by pending global changes.
    pub fn effective_global_properties(&self) -> BTreeMap<String, String> {
        let mut merged = self.global.base_properties.clone();
        if let Some(change) = &self.global.staged {
            merged.extend(change.props.clone());
        }
        merged
    }

    /// Whether legacy sibling-sum aggregation applies, read from the
    /// effective global state.
    pub fn legacy_mode(&self) -> bool {
        let key = self.conventions.legacy_mode_full_key();
        match self.effective_global_properties().get(&key) {
            Some(value) => value.trim().eq_ignore_ascii_case("true"),
            None => self.conventions.legacy_mode_default,
        }
    }

    /// Re-flatten the effective state into the wire key form. Feeding the
    /// result back through a fresh load reproduces the same effective state.
    pub fn flatten(&self) -> Vec<Property> {
        let mut out: Vec<Property> = self
            .effective_global_properties()
            .into_iter()
            .map(|(key, value)| Property { key, value })
            .collect();
        for path in self.live_paths() {
            for (name, value) in self.effective_properties(&path) {
                out.push(Property {
                    key: self.conventions.scoped_key(&path, &name),
                    value,
                });
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, &str)]) -> Vec<Property> {
        pairs.iter().map(|(k, v)| Property::new(*k, *v)).collect()
    }

    fn two_queue_config() -> SchedulerConfig {
        let input = props(&[
            ("yarn.scheduler.capacity.root.queues", "a,b"),
            ("yarn.scheduler.capacity.root.a.capacity", "60"),
            ("yarn.scheduler.capacity.root.b.capacity", "40"),
        ]);
        let (config, warnings) = SchedulerConfig::from_properties(&input, Default::default());
        assert!(warnings.is_empty());
        config
    }

    #[test]
    fn root_always_exists_and_is_a_queue() {
        let config = SchedulerConfig::empty(Default::default());
        let root = config.node("root").unwrap();
        assert!(root.is_queue());
        assert_eq!(config.live_paths(), vec!["root".to_string()]);
    }

    #[test]
    fn live_paths_are_sorted_and_complete() {
        let config = two_queue_config();
        assert_eq!(config.live_paths(), vec!["root", "root.a", "root.b"]);
    }

    #[test]
    fn effective_properties_for_unknown_path_are_empty() {
        let config = two_queue_config();
        assert!(config.effective_properties("root.nope").is_empty());
    }

    #[test]
    fn full_path_links_parent_and_segment() {
        let config = two_queue_config();
        let node = config.node("root.a").unwrap();
        assert_eq!(node.segment, "a");
        assert_eq!(node.full_path, "root.a");
        assert!(config.node("root").unwrap().children.contains("a"));
    }

    #[test]
    fn legacy_mode_defaults_on_and_follows_the_toggle() {
        let mut input = props(&[("yarn.scheduler.capacity.root.queues", "a")]);
        let (config, _) = SchedulerConfig::from_properties(&input, Default::default());
        assert!(config.legacy_mode());

        input.push(Property::new(
            "yarn.scheduler.capacity.legacy-queue-mode.enabled",
            "false",
        ));
        let (config, _) = SchedulerConfig::from_properties(&input, Default::default());
        assert!(!config.legacy_mode());
    }
}
