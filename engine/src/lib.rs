//! Staging engine for a remote cluster's hierarchical capacity-scheduler
//! configuration.
//!
//! The engine turns a flat namespaced property set into a typed queue
//! hierarchy, tracks uncommitted edits against it with rollback and conflict
//! semantics, answers effective-state (base + pending) queries, validates
//! the effective hierarchy, and folds the pending overlay into one batch
//! mutation payload for the transport collaborator.
//!
//! All operations are synchronous; reads hand out copied snapshots, never
//! live internal references. Problems cross the boundary as data: staging
//! failures as [`StagingError`], everything else as
//! [`diagnostics::ValidationIssue`] records.

pub mod classify;
pub mod conventions;
pub mod error;
pub mod hierarchy;
pub mod payload;
pub mod staging;
pub mod tree;
pub mod validate;
pub mod values;

pub use classify::{classify, ClassifiedProperties, ScopedProperty};
pub use conventions::SchedulerConventions;
pub use error::StagingError;
pub use payload::{minimal_diff, serialize_mutations, BatchMutation, Property, QueueMutation};
pub use staging::ChangeSummary;
pub use tree::{ChangeId, GlobalConfigState, QueueNode, SchedulerConfig, StagedChange};
pub use validate::validate;
pub use values::{CapacityParseError, CapacityValue};

pub use diagnostics::{has_blocking, Severity, ValidationIssue};
