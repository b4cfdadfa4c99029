//! The write side of the overlay: staging, rollback, and summary.
//!
//! Every operation is synchronous, returns the opaque id of the change it
//! created or continued, and on failure leaves the overlay exactly as it
//! was. Conflicting combinations (touching a queue that has a pending
//! delete, re-adding a live queue) are rejected rather than guessed at.

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::debug;

use crate::conventions::parent_path;
use crate::error::StagingError;
use crate::tree::{ChangeId, GlobalChange, QueueNode, SchedulerConfig, StagedChange};

/// Counts from a full-tree fold over the pending overlay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    pub added: usize,
    pub modified: usize,
    pub deleted: usize,
    pub global_changed: bool,
}

impl SchedulerConfig {
    fn check_path(&self, path: &str) -> Result<(), StagingError> {
        let root = &self.conventions().root_path;
        let under_root = path
            .strip_prefix(root.as_str())
            .is_some_and(|rest| rest.starts_with('.'));
        if !under_root {
            return Err(StagingError::invalid_path(path));
        }
        if path.split('.').any(|segment| segment.trim().is_empty()) {
            return Err(StagingError::invalid_path(path));
        }
        Ok(())
    }

    /// Stage the addition of a new queue at `path`, creating any missing
    /// ancestors as placeholders. Re-adding while the addition is still
    /// pending merges the properties in place under the same change id.
    pub fn stage_add_queue(
        &mut self,
        path: &str,
        properties: BTreeMap<String, String>,
    ) -> Result<ChangeId, StagingError> {
        self.check_path(path)?;

        if let Some(node) = self.node_mut(path) {
            return match &mut node.staged {
                Some(StagedChange::Add { props, id, .. }) => {
                    props.extend(properties);
                    Ok(*id)
                }
                Some(StagedChange::Delete { .. }) => Err(StagingError::conflict(
                    path,
                    "queue has a pending delete; clear it before re-adding",
                )),
                Some(StagedChange::Update { .. }) => Err(StagingError::conflict(
                    path,
                    "queue already exists and has a pending update",
                )),
                None if node.discovered || !node.base_properties.is_empty() => Err(
                    StagingError::conflict(path, "queue already exists"),
                ),
                None => {
                    let id = ChangeId::mint();
                    node.staged = Some(StagedChange::Add {
                        props: properties,
                        id,
                        at: Utc::now(),
                    });
                    Ok(id)
                }
            };
        }

        self.create_with_ancestors(path);
        let id = ChangeId::mint();
        let node = self.node_mut(path).expect("node just created");
        node.staged = Some(StagedChange::Add {
            props: properties,
            id,
            at: Utc::now(),
        });
        debug!(path, %id, "staged queue addition");
        Ok(id)
    }

    /// Stage a property delta against an existing queue. An update on a
    /// queue whose addition is still pending continues the addition; an
    /// update on a delete-pending queue is a conflict.
    pub fn stage_update_queue(
        &mut self,
        path: &str,
        properties: BTreeMap<String, String>,
    ) -> Result<ChangeId, StagingError> {
        let Some(node) = self.node_mut(path) else {
            return Err(StagingError::not_found(path));
        };
        match &mut node.staged {
            Some(StagedChange::Delete { .. }) => Err(StagingError::conflict(
                path,
                "queue has a pending delete; clear it before updating",
            )),
            Some(StagedChange::Add { props, id, .. }) => {
                props.extend(properties);
                Ok(*id)
            }
            Some(StagedChange::Update { props, old, id, .. }) => {
                for (key, value) in properties {
                    // First touch wins: the snapshot keeps the original base
                    // value, not any intermediate staged one.
                    old.entry(key.clone())
                        .or_insert_with(|| node.base_properties.get(&key).cloned());
                    props.insert(key, value);
                }
                Ok(*id)
            }
            None => {
                let old: BTreeMap<String, Option<String>> = properties
                    .keys()
                    .map(|key| (key.clone(), node.base_properties.get(key).cloned()))
                    .collect();
                let id = ChangeId::mint();
                node.staged = Some(StagedChange::Update {
                    props: properties,
                    old,
                    id,
                    at: Utc::now(),
                });
                Ok(id)
            }
        }
    }

    /// Stage the removal of a queue and, implicitly, its subtree. The node
    /// object is retained (soft delete) until the change is cleared or the
    /// tree reloaded. Deleting again returns the existing change id.
    pub fn stage_delete_queue(&mut self, path: &str) -> Result<ChangeId, StagingError> {
        if path == self.conventions().root_path {
            return Err(StagingError::invalid_path(path));
        }
        let Some(node) = self.node_mut(path) else {
            return Err(StagingError::not_found(path));
        };
        match &node.staged {
            Some(StagedChange::Delete { id, .. }) => Ok(*id),
            Some(StagedChange::Add { .. }) => Err(StagingError::conflict(
                path,
                "queue has a pending addition; clear it instead of deleting",
            )),
            // A pending update is discarded: the queue vanishes, there is
            // nothing left to preserve.
            _ => {
                let id = ChangeId::mint();
                node.staged = Some(StagedChange::Delete { id, at: Utc::now() });
                debug!(path, %id, "staged queue delete");
                Ok(id)
            }
        }
    }

    /// Stage scheduler-global property changes. All global updates batch
    /// under one change id, with the same first-touch snapshot discipline as
    /// queue updates.
    pub fn stage_global_update(
        &mut self,
        properties: BTreeMap<String, String>,
    ) -> Result<ChangeId, StagingError> {
        let global = self.global_state_mut();
        match &mut global.staged {
            Some(change) => {
                for (key, value) in properties {
                    change
                        .old
                        .entry(key.clone())
                        .or_insert_with(|| global.base_properties.get(&key).cloned());
                    change.props.insert(key, value);
                }
                Ok(change.id)
            }
            None => {
                let old: BTreeMap<String, Option<String>> = properties
                    .keys()
                    .map(|key| (key.clone(), global.base_properties.get(key).cloned()))
                    .collect();
                let id = ChangeId::mint();
                global.staged = Some(GlobalChange {
                    props: properties,
                    old,
                    id,
                    at: Utc::now(),
                });
                Ok(id)
            }
        }
    }

    /// Reset the pending state owned by `id`, wherever it lives.
    pub fn clear_change(&mut self, id: ChangeId) -> Result<(), StagingError> {
        if self
            .global_state()
            .staged
            .as_ref()
            .is_some_and(|change| change.id == id)
        {
            self.global_state_mut().staged = None;
            return Ok(());
        }
        let owner = self
            .nodes()
            .values()
            .find(|node| node.staged.as_ref().is_some_and(|s| s.id() == id))
            .map(|node| node.full_path.clone());
        match owner {
            Some(path) => {
                let node = self.node_mut(&path).expect("owner just located");
                node.staged = None;
                Ok(())
            }
            None => Err(StagingError::UnknownChange { id: id.to_string() }),
        }
    }

    /// Discard every pending change, queue-level and global.
    pub fn clear_all(&mut self) {
        let paths: Vec<String> = self.nodes().keys().cloned().collect();
        for path in paths {
            if let Some(node) = self.node_mut(&path) {
                node.staged = None;
            }
        }
        self.global_state_mut().staged = None;
    }

    pub fn has_pending_changes(&self) -> bool {
        self.global_state().staged.is_some()
            || self.nodes().values().any(|node| node.staged.is_some())
    }

    pub fn change_summary(&self) -> ChangeSummary {
        let mut summary = ChangeSummary {
            global_changed: self.global_state().staged.is_some(),
            ..Default::default()
        };
        for node in self.nodes().values() {
            match node.staged {
                Some(StagedChange::Add { .. }) => summary.added += 1,
                Some(StagedChange::Update { .. }) => summary.modified += 1,
                Some(StagedChange::Delete { .. }) => summary.deleted += 1,
                None => {}
            }
        }
        summary
    }

    fn create_with_ancestors(&mut self, path: &str) {
        let mut missing = Vec::new();
        let mut current = Some(path);
        while let Some(p) = current {
            if self.node(p).is_some() {
                break;
            }
            missing.push(p.to_string());
            current = parent_path(p);
        }
        // Created shallowest-first so each node can link into its parent.
        for p in missing.into_iter().rev() {
            let node = QueueNode::new(&p, false);
            if let Some(parent) = parent_path(&p) {
                if let Some(parent_node) = self.node_mut(parent) {
                    parent_node.children.insert(node.segment.clone());
                }
            }
            self.insert_node(node);
        }
    }
}
