//! Issue records shared by the configuration staging engine and its UI
//! consumers.
//!
//! Every problem the engine reports crosses the component boundary as data:
//! a [`ValidationIssue`] with a severity, a human-readable message, and the
//! queue path it concerns (when it concerns one). Errors block an apply,
//! warnings do not.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// A single finding from structural analysis or rule validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    /// Queue path the issue concerns; `None` for global or system findings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub message: String,
    pub severity: Severity,
}

impl ValidationIssue {
    pub fn new(severity: Severity, path: Option<String>, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
            severity,
        }
    }

    pub fn warning(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, Some(path.into()), message)
    }

    pub fn error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, Some(path.into()), message)
    }

    pub fn global_warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, None, message)
    }

    pub fn global_error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, None, message)
    }

    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// True when any issue in the set must block the apply step.
pub fn has_blocking(issues: &[ValidationIssue]) -> bool {
    issues.iter().any(ValidationIssue::is_blocking)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_do_not_block() {
        let issues = vec![
            ValidationIssue::warning("root.a", "capacities do not sum to 100"),
            ValidationIssue::global_warning("legacy mode is deprecated"),
        ];
        assert!(!has_blocking(&issues));
    }

    #[test]
    fn a_single_error_blocks() {
        let issues = vec![
            ValidationIssue::warning("root.a", "maximum-capacity below capacity"),
            ValidationIssue::error("root.b", "capacity 120 outside 0-100"),
        ];
        assert!(has_blocking(&issues));
    }

    #[test]
    fn serializes_camel_case_with_optional_path() {
        let issue = ValidationIssue::error("root.b", "bad state");
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["path"], "root.b");
        assert_eq!(json["severity"], "error");

        let global = ValidationIssue::global_warning("sum drift");
        let json = serde_json::to_value(&global).unwrap();
        assert!(json.get("path").is_none());
    }
}
