//! Build errors for state trees, attributes and rule declarations.

use crate::core::StateId;
use thiserror::Error;

/// A single problem found while validating a state tree.
///
/// Tree validation accumulates every violation instead of stopping at the
/// first one, so a broken configuration is reported in one pass.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TreeViolation {
    #[error("unknown state reference '{name}' (referenced by '{referenced_by}')")]
    UnknownState { name: StateId, referenced_by: StateId },

    #[error("'{name}' is a reserved word and cannot be used as a state name")]
    ReservedName { name: StateId },

    #[error("state '{name}' is declared more than once")]
    DuplicateState { name: StateId },

    #[error("group '{name}' declares no child states")]
    EmptyGroup { name: StateId },

    #[error("'{referenced_by}' lists the never-set sentinel as a transition target")]
    SentinelTarget { referenced_by: StateId },

    #[error("default state '{name}' is not a leaf state")]
    InvalidDefault { name: StateId },
}

/// Errors that can occur when building attributes and machines.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid state tree for '{attribute}': {}", join_violations(.violations))]
    InvalidTree {
        attribute: String,
        violations: Vec<TreeViolation>,
    },

    #[error("unknown state reference '{name}' for attribute '{attribute}'")]
    UnknownState { attribute: String, name: StateId },

    #[error("unknown state attribute '{0}'")]
    UnknownAttribute(String),

    #[error("No attributes defined. Add at least one state attribute")]
    NoAttributes,

    #[error("Transition source state not specified. Call .from(states)")]
    MissingFromState,

    #[error("Transition target state not specified. Call .to(states)")]
    MissingToState,

    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] serde_json::Error),
}

fn join_violations(violations: &[TreeViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
