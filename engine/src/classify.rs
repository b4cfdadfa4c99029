//! Splitting the flat property set into global and queue-scoped halves.
//!
//! Two passes are required because a queue segment may share its name with a
//! property (a queue literally called `capacity`). The discovery pass walks
//! child-list properties to a fixed point to learn every queue path; the
//! classification pass then attributes each key to the longest known queue
//! path that is a strict ancestor of it.

use std::collections::{BTreeMap, BTreeSet};

use diagnostics::ValidationIssue;
use tracing::{debug, warn};

use crate::conventions::SchedulerConventions;
use crate::payload::Property;

/// A property attributed to one queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedProperty {
    pub queue_path: String,
    pub name: String,
    pub value: String,
}

/// Output of the classification pass.
#[derive(Debug, Clone, Default)]
pub struct ClassifiedProperties {
    pub global: BTreeMap<String, String>,
    pub scoped: Vec<ScopedProperty>,
    /// Every queue path learned during discovery, root included.
    pub paths: BTreeSet<String>,
    pub warnings: Vec<ValidationIssue>,
}

/// Split `properties` into global and queue-scoped sets.
pub fn classify(
    properties: &[Property],
    conventions: &SchedulerConventions,
) -> ClassifiedProperties {
    let (paths, warnings) = discover_paths(properties, conventions);
    let mut out = ClassifiedProperties {
        paths,
        warnings,
        ..Default::default()
    };

    for property in properties {
        let relative = conventions
            .relative_key(&property.key)
            .filter(|rel| conventions.is_root_scoped(rel));
        let Some(relative) = relative else {
            out.global
                .insert(property.key.clone(), property.value.clone());
            continue;
        };
        match longest_ancestor_path(&out.paths, relative) {
            Some(queue_path) => {
                let name = relative[queue_path.len() + 1..].to_string();
                out.scoped.push(ScopedProperty {
                    queue_path: queue_path.to_string(),
                    name,
                    value: property.value.clone(),
                });
            }
            // Root-scoped but under no known queue; treated as global so a
            // partially-resolved hierarchy never drops data.
            None => {
                out.global
                    .insert(property.key.clone(), property.value.clone());
            }
        }
    }

    debug!(
        queues = out.paths.len(),
        scoped = out.scoped.len(),
        global = out.global.len(),
        "classified scheduler properties"
    );
    out
}

/// Fixed-point discovery of queue paths from child-list properties.
///
/// Each round registers the children of every list whose owner is already a
/// known path. The round count is bounded by the number of candidate lists,
/// which is enough for any resolvable chain; candidates still unresolved at
/// the fixed point become warnings, never errors.
fn discover_paths(
    properties: &[Property],
    conventions: &SchedulerConventions,
) -> (BTreeSet<String>, Vec<ValidationIssue>) {
    let mut known = BTreeSet::from([conventions.root_path.clone()]);
    let list_suffix = format!(".{}", conventions.child_list_property);

    let candidates: Vec<(String, &str)> = properties
        .iter()
        .filter_map(|p| {
            let relative = conventions.relative_key(&p.key)?;
            if !conventions.is_root_scoped(relative) {
                return None;
            }
            let owner = relative.strip_suffix(list_suffix.as_str())?;
            Some((owner.to_string(), p.value.as_str()))
        })
        .collect();

    let mut resolved = vec![false; candidates.len()];
    for _ in 0..=candidates.len() {
        let mut progress = false;
        for (index, (owner, value)) in candidates.iter().enumerate() {
            if resolved[index] || !known.contains(owner) {
                continue;
            }
            resolved[index] = true;
            progress = true;
            for segment in SchedulerConventions::split_child_list(value) {
                known.insert(format!("{owner}.{segment}"));
            }
        }
        if !progress {
            break;
        }
    }

    let mut warnings = Vec::new();
    for (index, (owner, _)) in candidates.iter().enumerate() {
        if !resolved[index] {
            warn!(%owner, "queue list references an unresolvable parent");
            warnings.push(ValidationIssue::warning(
                owner.clone(),
                format!(
                    "Queue list {} references parent {owner}, which is not a known queue",
                    conventions.scoped_key(owner, &conventions.child_list_property)
                ),
            ));
        }
    }
    (known, warnings)
}

/// Longest known queue path that is a strict ancestor-prefix of `relative`.
fn longest_ancestor_path<'a>(paths: &'a BTreeSet<String>, relative: &str) -> Option<&'a str> {
    paths
        .iter()
        .filter(|path| {
            relative.len() > path.len()
                && relative.starts_with(path.as_str())
                && relative.as_bytes()[path.len()] == b'.'
        })
        .max_by_key(|path| path.len())
        .map(String::as_str)
}
