//! State trees: construction, resolution and queries.
//!
//! A tree is compiled once from a nested [`StateConfig`]. Construction is a
//! depth-first walk that creates one node per key, followed by a single
//! resolution pass that expands every leaf's declared targets into concrete
//! leaf names. All configuration problems are collected and reported
//! together.

use super::node::StateNode;
use super::state::{StateId, NONE};
use crate::builder::error::{BuildError, TreeViolation};
use crate::config::{StateConfig, Targets};
use std::collections::HashMap;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

type Check = Validation<(), NonEmptyVec<TreeViolation>>;

/// The compiled states of one attribute.
///
/// # Example
///
/// ```rust
/// use stateful::config::{StateConfig, Targets};
/// use stateful::core::StateTree;
///
/// let config = StateConfig::new()
///     .state("draft", "beta")
///     .state(
///         "beta",
///         StateConfig::new()
///             .state("needs_testing", "needs_approval")
///             .state("needs_approval", "approved"),
///     )
///     .state("approved", "retired")
///     .state("retired", Targets::None);
///
/// let tree = StateTree::build("state", &config, &[]).unwrap();
/// assert!(tree.can_transition("draft", "needs_testing"));
/// assert!(!tree.can_transition("draft", "retired"));
/// assert!(tree.is_within("needs_testing", "beta"));
/// ```
#[derive(Debug, Clone)]
pub struct StateTree {
    attribute: String,
    nodes: Vec<StateNode>,
    index: HashMap<StateId, usize>,
    sentinel: usize,
}

impl StateTree {
    /// Compile a state map into a resolved tree.
    ///
    /// `track` names the states or groups whose entry should be recorded.
    /// When the map has no top-level `none` entry, the never-set sentinel
    /// is added and may move to any leaf.
    pub fn build(
        attribute: &str,
        config: &StateConfig,
        track: &[StateId],
    ) -> Result<Self, BuildError> {
        let mut checks: Vec<Check> = Vec::new();
        let mut tree = StateTree {
            attribute: attribute.to_string(),
            nodes: Vec::new(),
            index: HashMap::new(),
            sentinel: 0,
        };

        tree.walk(config, None, &mut checks);

        match tree.index.get(NONE).copied() {
            Some(sentinel) => tree.sentinel = sentinel,
            None => {
                tree.sentinel = tree.push(StateNode::leaf(
                    StateId::none(),
                    None,
                    vec![StateId::from(crate::core::WILDCARD)],
                ));
            }
        }

        for name in track {
            match tree.index.get(name.as_str()).copied() {
                Some(i) => tree.nodes[i].tracked = true,
                None => checks.push(Validation::fail(TreeViolation::UnknownState {
                    name: name.clone(),
                    referenced_by: StateId::from("track"),
                })),
            }
        }

        tree.resolve(&mut checks);

        match Validation::all_vec(checks) {
            Validation::Success(_) => Ok(tree),
            Validation::Failure(errors) => Err(BuildError::InvalidTree {
                attribute: attribute.to_string(),
                violations: errors.iter().cloned().collect(),
            }),
        }
    }

    fn push(&mut self, node: StateNode) -> usize {
        let i = self.nodes.len();
        self.index.insert(node.name.clone(), i);
        self.nodes.push(node);
        i
    }

    fn walk(&mut self, config: &StateConfig, parent: Option<&StateId>, checks: &mut Vec<Check>) {
        for (name, targets) in config.entries() {
            // `none` may only configure the sentinel, at the top level.
            let misplaced_sentinel = name.is_none() && (parent.is_some() || targets.is_group());
            if name.is_reserved() || misplaced_sentinel {
                checks.push(Validation::fail(TreeViolation::ReservedName { name: name.clone() }));
                continue;
            }
            if self.index.contains_key(name.as_str()) {
                checks.push(Validation::fail(TreeViolation::DuplicateState { name: name.clone() }));
                continue;
            }

            let node = match targets {
                Targets::Group(_) => StateNode::group(name.clone(), parent.cloned()),
                Targets::None => StateNode::leaf(name.clone(), parent.cloned(), Vec::new()),
                Targets::Wildcard => StateNode::leaf(
                    name.clone(),
                    parent.cloned(),
                    vec![StateId::from(crate::core::WILDCARD)],
                ),
                Targets::List(names) => StateNode::leaf(name.clone(), parent.cloned(), names.clone()),
            };
            self.push(node);

            if let Some(parent) = parent.and_then(|p| self.index.get(p.as_str()).copied()) {
                self.nodes[parent].children.push(name.clone());
            }

            if let Targets::Group(children) = targets {
                if children.is_empty() {
                    checks.push(Validation::fail(TreeViolation::EmptyGroup { name: name.clone() }));
                }
                self.walk(children, Some(name), checks);
            }
        }
    }

    /// Expand declared targets of every leaf. Runs exactly once, from
    /// [`StateTree::build`].
    fn resolve(&mut self, checks: &mut Vec<Check>) {
        let resolved: Vec<(usize, Vec<StateId>)> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_leaf())
            .map(|(i, node)| (i, self.resolve_leaf(node, checks)))
            .collect();

        for (i, targets) in resolved {
            self.nodes[i].resolved = targets;
        }
    }

    fn resolve_leaf(&self, node: &StateNode, checks: &mut Vec<Check>) -> Vec<StateId> {
        let mut resolved = Vec::new();
        for target in &node.declared {
            if target.is_wildcard() {
                resolved.extend(self.leaves().map(|leaf| leaf.name.clone()));
            } else if target.is_none() {
                checks.push(Validation::fail(TreeViolation::SentinelTarget {
                    referenced_by: node.name.clone(),
                }));
            } else {
                match self.collect_leaf_states(target.as_str()) {
                    Some(leaves) => resolved.extend(leaves),
                    None => checks.push(Validation::fail(TreeViolation::UnknownState {
                        name: target.clone(),
                        referenced_by: node.name.clone(),
                    })),
                }
            }
        }
        dedup(resolved, |state| *state != node.name)
    }

    /// Name of the attribute this tree belongs to.
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn get(&self, name: &str) -> Option<&StateNode> {
        self.index.get(name).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// The never-set sentinel node.
    pub fn sentinel(&self) -> &StateNode {
        &self.nodes[self.sentinel]
    }

    /// Every node in declaration order, sentinel included.
    pub fn nodes(&self) -> impl Iterator<Item = &StateNode> {
        self.nodes.iter()
    }

    /// Leaf states in declaration order, excluding the sentinel.
    pub fn leaves(&self) -> impl Iterator<Item = &StateNode> {
        self.nodes
            .iter()
            .filter(|node| node.is_leaf() && !node.is_sentinel())
    }

    pub fn parent_of(&self, node: &StateNode) -> Option<&StateNode> {
        node.parent.as_ref().and_then(|p| self.get(p.as_str()))
    }

    /// True when `state` is `ancestor` or nested (transitively) inside it.
    pub fn is_within(&self, state: &str, ancestor: &str) -> bool {
        let mut current = self.get(state);
        while let Some(node) = current {
            if node.name == ancestor {
                return true;
            }
            current = self.parent_of(node);
        }
        false
    }

    /// All leaves under `name`, or `name` itself when it is a leaf.
    /// Returns `None` for unknown names.
    pub fn collect_leaf_states(&self, name: &str) -> Option<Vec<StateId>> {
        let node = self.get(name)?;
        if node.is_leaf() {
            return Some(vec![node.name.clone()]);
        }
        let mut leaves = Vec::new();
        for child in &node.children {
            leaves.extend(self.collect_leaf_states(child.as_str())?);
        }
        Some(leaves)
    }

    /// Whether a value of `from` may move to `to`.
    ///
    /// Group endpoints and unknown targets are never allowed.
    pub fn can_transition(&self, from: &str, to: &str) -> bool {
        let (Some(from), Some(to)) = (self.get(from), self.get(to)) else {
            return false;
        };
        if from.is_group() || to.is_group() {
            return false;
        }
        from.resolved.iter().any(|state| *state == to.name)
    }

    /// The node whose tracking applies when entering `state`: the state
    /// itself if tracked, else its nearest tracked ancestor group.
    pub fn tracked_for(&self, state: &str) -> Option<&StateNode> {
        let mut current = self.get(state);
        while let Some(node) = current {
            if node.tracked {
                return Some(node);
            }
            current = self.parent_of(node);
        }
        None
    }

    /// Expand rule selectors into concrete leaf names.
    ///
    /// The wildcard selects every leaf, plus the sentinel when
    /// `wildcard_includes_sentinel` is set. Groups select their leaves.
    /// Returns the first unknown selector on failure.
    pub fn expand(
        &self,
        selectors: &[StateId],
        wildcard_includes_sentinel: bool,
    ) -> Result<Vec<StateId>, StateId> {
        let mut expanded = Vec::new();
        for selector in selectors {
            if selector.is_wildcard() {
                expanded.extend(self.leaves().map(|leaf| leaf.name.clone()));
                if wildcard_includes_sentinel {
                    expanded.push(self.sentinel().name.clone());
                }
            } else {
                let leaves = self
                    .collect_leaf_states(selector.as_str())
                    .ok_or_else(|| selector.clone())?;
                expanded.extend(leaves);
            }
        }
        Ok(dedup(expanded, |_| true))
    }
}

fn dedup(states: Vec<StateId>, keep: impl Fn(&StateId) -> bool) -> Vec<StateId> {
    let mut out: Vec<StateId> = Vec::with_capacity(states.len());
    for state in states {
        if keep(&state) && !out.contains(&state) {
            out.push(state);
        }
    }
    out
}
