//! State identifiers.
//!
//! States are named by plain identifiers taken from the declarative
//! configuration. Two names carry special meaning: [`WILDCARD`] selects
//! every state and [`NONE`] names the sentinel that stands for an
//! attribute that has never been set.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Marker that expands to "every other state".
pub const WILDCARD: &str = "*";

/// Name of the sentinel node representing a never-set attribute.
pub const NONE: &str = "none";

/// Names that can never be used for a declared state.
pub const RESERVED: &[&str] = &["new", WILDCARD];

/// Identifier of a state or group within a state tree.
///
/// # Example
///
/// ```rust
/// use stateful::core::StateId;
///
/// let draft = StateId::from("draft");
/// assert_eq!(draft.as_str(), "draft");
/// assert!(!draft.is_none());
/// assert!(StateId::none().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateId(String);

impl StateId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The sentinel identifier for a never-set attribute.
    pub fn none() -> Self {
        Self(NONE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_none(&self) -> bool {
        self.0 == NONE
    }

    pub fn is_wildcard(&self) -> bool {
        self.0 == WILDCARD
    }

    pub fn is_reserved(&self) -> bool {
        RESERVED.contains(&self.0.as_str())
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for StateId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for StateId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StateId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for StateId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&StateId> for StateId {
    fn from(s: &StateId) -> Self {
        s.clone()
    }
}

impl PartialEq<str> for StateId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for StateId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Conversion into a list of state selectors.
///
/// Lets the rule DSL accept a single name or any list of names.
pub trait IntoStates {
    fn into_states(self) -> Vec<StateId>;
}

impl IntoStates for &str {
    fn into_states(self) -> Vec<StateId> {
        vec![StateId::from(self)]
    }
}

impl IntoStates for String {
    fn into_states(self) -> Vec<StateId> {
        vec![StateId::from(self)]
    }
}

impl IntoStates for StateId {
    fn into_states(self) -> Vec<StateId> {
        vec![self]
    }
}

impl<const N: usize> IntoStates for [&str; N] {
    fn into_states(self) -> Vec<StateId> {
        self.into_iter().map(StateId::from).collect()
    }
}

impl IntoStates for &[&str] {
    fn into_states(self) -> Vec<StateId> {
        self.iter().copied().map(StateId::from).collect()
    }
}

impl IntoStates for Vec<&str> {
    fn into_states(self) -> Vec<StateId> {
        self.into_iter().map(StateId::from).collect()
    }
}

impl IntoStates for Vec<String> {
    fn into_states(self) -> Vec<StateId> {
        self.into_iter().map(StateId::from).collect()
    }
}

impl IntoStates for Vec<StateId> {
    fn into_states(self) -> Vec<StateId> {
        self
    }
}
