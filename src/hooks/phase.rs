//! Fixed points of the transition protocol at which hooks may run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A phase of the transition pipeline.
///
/// Phases run in declaration order: the three validation phases, then
/// `BeforeSave` once the new value is written, then `AfterSave` once the
/// host has persisted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    BeforeValidation,
    Validate,
    AfterValidation,
    /// Also known as before-commit.
    BeforeSave,
    /// Also known as after-commit.
    AfterSave,
}

impl Phase {
    /// Validation phases, in execution order.
    pub const VALIDATION: [Phase; 3] = [
        Phase::BeforeValidation,
        Phase::Validate,
        Phase::AfterValidation,
    ];

    /// Hooks registered for this phase fire at most once per
    /// `(from, to)` pair for the lifetime of a host instance.
    pub fn is_run_once(self) -> bool {
        matches!(self, Phase::AfterSave)
    }

    pub fn name(self) -> &'static str {
        match self {
            Phase::BeforeValidation => "before_validation",
            Phase::Validate => "validate",
            Phase::AfterValidation => "after_validation",
            Phase::BeforeSave => "before_save",
            Phase::AfterSave => "after_save",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
