//! Stateless rule validation over the effective hierarchy.
//!
//! Rules read the effective (base + pending) state and never mutate it.
//! Each rule runs independently; a rule that fails internally is converted
//! into one synthetic error record so the remaining findings still surface.
//! Errors block the apply step, warnings are advisory.

use std::collections::BTreeMap;

use anyhow::Result;
use diagnostics::ValidationIssue;
use tracing::warn;

use crate::conventions::{parent_path, SchedulerConventions};
use crate::tree::SchedulerConfig;
use crate::values::{CapacityParseError, CapacityValue};

/// Snapshot of the effective state the rules run against.
struct EffectiveView {
    /// Live path -> effective properties.
    queues: BTreeMap<String, BTreeMap<String, String>>,
    legacy_mode: bool,
}

impl EffectiveView {
    fn capture(config: &SchedulerConfig) -> Self {
        let queues = config
            .live_paths()
            .into_iter()
            .map(|path| {
                let props = config.effective_properties(&path);
                (path, props)
            })
            .collect();
        Self {
            queues,
            legacy_mode: config.legacy_mode(),
        }
    }

    /// Live children of `parent`, in path order.
    fn children_of<'a>(&'a self, parent: &str) -> Vec<&'a str> {
        self.queues
            .keys()
            .filter(|path| parent_path(path) == Some(parent))
            .map(String::as_str)
            .collect()
    }
}

type Rule = fn(&EffectiveView, &SchedulerConventions) -> Result<Vec<ValidationIssue>>;

const RULES: &[(&str, Rule)] = &[
    ("capacity-range", check_capacity_ranges),
    ("maximum-below-capacity", check_maximum_vs_capacity),
    ("sibling-capacity-sum", check_sibling_sums),
    ("enumerated-values", check_enumerated_values),
    ("sibling-mode-mix", check_sibling_mode_mix),
];

/// Run every rule against the effective hierarchy.
pub fn validate(config: &SchedulerConfig) -> Vec<ValidationIssue> {
    let view = EffectiveView::capture(config);
    let conventions = config.conventions();
    let mut issues = Vec::new();
    for (name, rule) in RULES {
        match rule(&view, conventions) {
            Ok(found) => issues.extend(found),
            Err(error) => {
                warn!(rule = *name, %error, "validation rule failed");
                issues.push(ValidationIssue::global_error(format!(
                    "Validation rule '{name}' failed: {error}"
                )));
            }
        }
    }
    issues
}

fn check_capacity_ranges(
    view: &EffectiveView,
    conventions: &SchedulerConventions,
) -> Result<Vec<ValidationIssue>> {
    let mut issues = Vec::new();
    for (path, props) in &view.queues {
        for key in [
            &conventions.capacity_property,
            &conventions.maximum_capacity_property,
        ] {
            let Some(raw) = props.get(key) else { continue };
            match CapacityValue::parse(raw) {
                Ok(CapacityValue::Percentage(pct)) => {
                    if !(0.0..=100.0).contains(&pct) {
                        issues.push(ValidationIssue::error(
                            path.clone(),
                            format!("{key} {pct} is outside the percentage range 0-100"),
                        ));
                    }
                }
                Ok(CapacityValue::Weight(weight)) => {
                    if weight <= 0.0 {
                        issues.push(ValidationIssue::error(
                            path.clone(),
                            format!("{key} weight {weight} must be greater than 0"),
                        ));
                    }
                }
                Ok(CapacityValue::Absolute(_)) => {}
                Err(CapacityParseError::MalformedAbsolute { raw }) => {
                    issues.push(ValidationIssue::warning(
                        path.clone(),
                        format!("{key} has a malformed absolute resource value: {raw}"),
                    ));
                }
                Err(CapacityParseError::NotANumber { raw }) => {
                    issues.push(ValidationIssue::error(
                        path.clone(),
                        format!("{key} is not a valid capacity value: {raw}"),
                    ));
                }
            }
        }
    }
    Ok(issues)
}

fn check_maximum_vs_capacity(
    view: &EffectiveView,
    conventions: &SchedulerConventions,
) -> Result<Vec<ValidationIssue>> {
    let mut issues = Vec::new();
    for (path, props) in &view.queues {
        let capacity = props
            .get(&conventions.capacity_property)
            .and_then(|raw| CapacityValue::parse(raw).ok());
        let maximum = props
            .get(&conventions.maximum_capacity_property)
            .and_then(|raw| CapacityValue::parse(raw).ok());
        if let (Some(CapacityValue::Percentage(cap)), Some(CapacityValue::Percentage(max))) =
            (capacity, maximum)
        {
            if max < cap {
                issues.push(ValidationIssue::warning(
                    path.clone(),
                    format!("maximum-capacity {max} is below capacity {cap}"),
                ));
            }
        }
    }
    Ok(issues)
}

/// In legacy mode sibling percentage capacities must sum to 100. The remote
/// system is the final authority, so drift is a warning, not an error. The
/// check is skipped for sibling sets that mix modes; the mode-mix rule
/// covers those.
fn check_sibling_sums(
    view: &EffectiveView,
    conventions: &SchedulerConventions,
) -> Result<Vec<ValidationIssue>> {
    if !view.legacy_mode {
        return Ok(Vec::new());
    }
    let mut issues = Vec::new();
    for parent in view.queues.keys() {
        let children = view.children_of(parent);
        if children.is_empty() {
            continue;
        }
        let mut sum = 0.0;
        let mut uniform = true;
        for child in &children {
            let raw = view.queues[*child]
                .get(&conventions.capacity_property)
                .cloned()
                .unwrap_or_else(|| "0".to_string());
            match CapacityValue::parse(&raw) {
                Ok(CapacityValue::Percentage(pct)) => sum += pct,
                Ok(_) => uniform = false,
                // Unparseable capacities are the range rule's finding.
                Err(_) => uniform = false,
            }
        }
        if uniform && (sum - 100.0).abs() > conventions.sum_tolerance {
            issues.push(ValidationIssue::warning(
                parent.clone(),
                format!("Child capacities of {parent} sum to {sum:.2}%, expected 100%"),
            ));
        }
    }
    Ok(issues)
}

fn check_enumerated_values(
    view: &EffectiveView,
    conventions: &SchedulerConventions,
) -> Result<Vec<ValidationIssue>> {
    let mut issues = Vec::new();
    let fields: [(&String, &Vec<String>); 2] = [
        (&conventions.state_property, &conventions.legal_states),
        (
            &conventions.ordering_policy_property,
            &conventions.legal_ordering_policies,
        ),
    ];
    for (path, props) in &view.queues {
        for (field, legal) in &fields {
            let Some(value) = props.get(*field) else {
                continue;
            };
            if !legal.iter().any(|candidate| candidate == value) {
                issues.push(ValidationIssue::error(
                    path.clone(),
                    format!(
                        "{field} '{value}' is not one of the legal values [{}]",
                        legal.join(", ")
                    ),
                ));
            }
        }
    }
    Ok(issues)
}

fn check_sibling_mode_mix(
    view: &EffectiveView,
    conventions: &SchedulerConventions,
) -> Result<Vec<ValidationIssue>> {
    if !view.legacy_mode {
        return Ok(Vec::new());
    }
    let mut issues = Vec::new();
    for parent in view.queues.keys() {
        let children = view.children_of(parent);
        if children.len() < 2 {
            continue;
        }
        let mut modes: Vec<&'static str> = children
            .iter()
            .filter_map(|child| {
                view.queues[*child]
                    .get(&conventions.capacity_property)
                    .and_then(|raw| CapacityValue::parse(raw).ok())
                    .map(|value| value.mode())
            })
            .collect();
        modes.sort_unstable();
        modes.dedup();
        if modes.len() > 1 {
            issues.push(ValidationIssue::warning(
                parent.clone(),
                format!(
                    "Children of {parent} mix capacity modes ({}) under legacy mode",
                    modes.join(", ")
                ),
            ));
        }
    }
    Ok(issues)
}
