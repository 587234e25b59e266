//! A single node of a state tree.

use super::state::StateId;

/// A leaf state or a group of states.
///
/// Nodes live in a [`StateTree`](super::StateTree) arena and refer to their
/// parent and children by name. Leaves carry transitions; groups only
/// carry children and exist for expansion and "is-a" queries.
#[derive(Debug, Clone)]
pub struct StateNode {
    pub(crate) name: StateId,
    pub(crate) parent: Option<StateId>,
    pub(crate) children: Vec<StateId>,
    pub(crate) group: bool,
    pub(crate) declared: Vec<StateId>,
    pub(crate) resolved: Vec<StateId>,
    pub(crate) tracked: bool,
}

impl StateNode {
    pub(crate) fn leaf(name: StateId, parent: Option<StateId>, declared: Vec<StateId>) -> Self {
        Self {
            name,
            parent,
            children: Vec::new(),
            group: false,
            declared,
            resolved: Vec::new(),
            tracked: false,
        }
    }

    pub(crate) fn group(name: StateId, parent: Option<StateId>) -> Self {
        Self {
            group: true,
            ..Self::leaf(name, parent, Vec::new())
        }
    }

    pub fn name(&self) -> &StateId {
        &self.name
    }

    pub fn parent(&self) -> Option<&StateId> {
        self.parent.as_ref()
    }

    pub fn children(&self) -> &[StateId] {
        &self.children
    }

    pub fn is_group(&self) -> bool {
        self.group
    }

    pub fn is_leaf(&self) -> bool {
        !self.group
    }

    /// Whether this is the never-set sentinel.
    pub fn is_sentinel(&self) -> bool {
        self.name.is_none()
    }

    pub fn is_tracked(&self) -> bool {
        self.tracked
    }

    /// Transition targets exactly as configured.
    pub fn declared_transitions(&self) -> &[StateId] {
        &self.declared
    }

    /// Leaf states this node may transition to, after wildcard and group
    /// expansion. Always empty for groups.
    pub fn transitions(&self) -> &[StateId] {
        &self.resolved
    }
}
