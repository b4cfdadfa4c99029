//! Naming conventions of the remote scheduler's property namespace.
//!
//! The original system kept these in a process-wide registry; here they are
//! an explicit value constructed once and passed into the classifier,
//! validator, and serializer, which keeps those passes pure functions of
//! their inputs.

/// Key conventions and legal-value tables for one scheduler dialect.
#[derive(Debug, Clone)]
pub struct SchedulerConventions {
    /// Namespace prefix every scheduler property lives under.
    pub prefix: String,
    /// Path of the hierarchy root, conventionally the literal `root`.
    pub root_path: String,
    /// Property name holding a queue's comma-separated child list.
    pub child_list_property: String,
    /// Global key (relative to `prefix`) toggling legacy sibling-sum rules.
    pub legacy_mode_key: String,
    /// Whether legacy mode applies when the toggle is absent.
    pub legacy_mode_default: bool,
    pub capacity_property: String,
    pub maximum_capacity_property: String,
    pub state_property: String,
    pub legal_states: Vec<String>,
    pub ordering_policy_property: String,
    pub legal_ordering_policies: Vec<String>,
    /// Tolerance for the sibling capacity sum check, in percent points.
    pub sum_tolerance: f64,
}

impl Default for SchedulerConventions {
    fn default() -> Self {
        Self {
            prefix: "yarn.scheduler.capacity.".to_string(),
            root_path: "root".to_string(),
            child_list_property: "queues".to_string(),
            legacy_mode_key: "legacy-queue-mode.enabled".to_string(),
            legacy_mode_default: true,
            capacity_property: "capacity".to_string(),
            maximum_capacity_property: "maximum-capacity".to_string(),
            state_property: "state".to_string(),
            legal_states: vec!["RUNNING".to_string(), "STOPPED".to_string()],
            ordering_policy_property: "ordering-policy".to_string(),
            legal_ordering_policies: vec![
                "fifo".to_string(),
                "fair".to_string(),
                "utilization".to_string(),
                "priority-utilization".to_string(),
            ],
            sum_tolerance: 0.01,
        }
    }
}

impl SchedulerConventions {
    /// Relative path part of `key`, if the key lives under the scheduler
    /// prefix at all (queue-scoped or not).
    pub fn relative_key<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(self.prefix.as_str())
    }

    /// Whether a relative key addresses the root subtree. Checks the segment
    /// boundary so `rootless.x` is not mistaken for a root-scoped key.
    pub fn is_root_scoped(&self, relative: &str) -> bool {
        relative == self.root_path
            || relative
                .strip_prefix(self.root_path.as_str())
                .is_some_and(|rest| rest.starts_with('.'))
    }

    /// Full wire key for a property attached to a queue.
    pub fn scoped_key(&self, queue_path: &str, name: &str) -> String {
        format!("{}{}.{}", self.prefix, queue_path, name)
    }

    /// Full wire key of the legacy-mode toggle.
    pub fn legacy_mode_full_key(&self) -> String {
        format!("{}{}", self.prefix, self.legacy_mode_key)
    }

    /// Parse a comma-separated child list into segment names.
    pub fn split_child_list(value: &str) -> Vec<String> {
        value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Parent path of a dot-delimited queue path, `None` for the root.
pub fn parent_path(path: &str) -> Option<&str> {
    path.rsplit_once('.').map(|(parent, _)| parent)
}

/// Last segment of a dot-delimited queue path.
pub fn last_segment(path: &str) -> &str {
    path.rsplit_once('.').map_or(path, |(_, seg)| seg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_scope_respects_segment_boundaries() {
        let conv = SchedulerConventions::default();
        assert!(conv.is_root_scoped("root"));
        assert!(conv.is_root_scoped("root.a.capacity"));
        assert!(!conv.is_root_scoped("rootless.capacity"));
        assert!(!conv.is_root_scoped("maximum-applications"));
    }

    #[test]
    fn child_lists_tolerate_whitespace_and_empties() {
        assert_eq!(
            SchedulerConventions::split_child_list(" a, b ,,c"),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn path_helpers() {
        assert_eq!(parent_path("root.a.b"), Some("root.a"));
        assert_eq!(parent_path("root"), None);
        assert_eq!(last_segment("root.a.b"), "b");
        assert_eq!(last_segment("root"), "root");
    }
}
