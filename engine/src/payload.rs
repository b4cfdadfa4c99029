//! Wire shapes at the engine boundary and the batch mutation fold.
//!
//! The transport collaborator frames [`BatchMutation`] into whatever the
//! remote system expects (XML or JSON); that framing is out of scope here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::tree::{SchedulerConfig, StagedChange};
use crate::values::wire_value;

/// One raw key/value pair as delivered by the configuration-fetch endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Property {
    pub key: String,
    pub value: String,
}

impl Property {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A queue addition or update in the batch payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QueueMutation {
    pub queue_name: String,
    pub params: BTreeMap<String, String>,
}

/// The batched, uncommitted edit set in its wire-level shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BatchMutation {
    pub remove_queues: Vec<String>,
    pub add_queues: Vec<QueueMutation>,
    pub update_queues: Vec<QueueMutation>,
    pub global_updates: BTreeMap<String, String>,
}

impl BatchMutation {
    pub fn is_empty(&self) -> bool {
        self.remove_queues.is_empty()
            && self.add_queues.is_empty()
            && self.update_queues.is_empty()
            && self.global_updates.is_empty()
    }
}

/// Fold the pending overlay into the four-bucket batch payload.
///
/// Deleting an ancestor deletes its subtree on the remote side, so only the
/// topmost path of a deleted subtree is emitted and any pending change
/// beneath it is suppressed. Updates carry their staged delta only; the
/// remote system applies it onto its own stored base.
pub fn serialize_mutations(config: &SchedulerConfig) -> BatchMutation {
    let mut batch = BatchMutation::default();

    for (path, node) in config.nodes() {
        let Some(staged) = &node.staged else { continue };
        let under_deleted_ancestor = crate::conventions::parent_path(path)
            .is_some_and(|parent| config.in_deleted_subtree(parent));
        if under_deleted_ancestor {
            continue;
        }
        match staged {
            StagedChange::Delete { .. } => batch.remove_queues.push(path.clone()),
            StagedChange::Add { props, .. } => batch.add_queues.push(QueueMutation {
                queue_name: path.clone(),
                params: wire_params(props),
            }),
            StagedChange::Update { props, .. } => batch.update_queues.push(QueueMutation {
                queue_name: path.clone(),
                params: wire_params(props),
            }),
        }
    }

    if let Some(change) = &config.global_state().staged {
        batch.global_updates = wire_params(&change.props);
    }

    debug!(
        removes = batch.remove_queues.len(),
        adds = batch.add_queues.len(),
        updates = batch.update_queues.len(),
        globals = batch.global_updates.len(),
        "serialized batch mutation"
    );
    batch
}

fn wire_params(props: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    props
        .iter()
        .map(|(key, value)| (key.clone(), wire_value(value)))
        .collect()
}

/// Minimal delta between the effective view a form was populated from and
/// the values it holds after editing. Changed and added keys carry the new
/// value; keys the edit removed map to the empty string, which the remote
/// system treats as property removal.
pub fn minimal_diff(
    effective: &BTreeMap<String, String>,
    edited: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut diff = BTreeMap::new();
    for (key, value) in edited {
        if effective.get(key) != Some(value) {
            diff.insert(key.clone(), value.clone());
        }
    }
    for key in effective.keys() {
        if !edited.contains_key(key) {
            diff.insert(key.clone(), String::new());
        }
    }
    diff
}
