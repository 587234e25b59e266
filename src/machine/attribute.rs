//! Compiled definition of one state attribute.

use crate::builder::error::{BuildError, TreeViolation};
use crate::config::{AttributeConfig, EventDef, EventTable};
use crate::core::{StateId, StateTree};

/// Default message for inclusion validation.
pub const INVALID_VALUE: &str = "has invalid value";

/// An attribute's tree and options, fixed at build time and shared by
/// every machine that inherits it.
#[derive(Debug, Clone)]
pub struct StateAttribute {
    name: String,
    tree: StateTree,
    default: Option<StateId>,
    events: EventTable,
    validate_on_change: bool,
    allow_nil: bool,
    message: Option<String>,
}

impl StateAttribute {
    pub fn from_config(config: &AttributeConfig) -> Result<Self, BuildError> {
        let tree = StateTree::build(&config.name, &config.states, &config.track)?;

        if let Some(default) = &config.default {
            let is_leaf = tree
                .get(default.as_str())
                .is_some_and(|node| node.is_leaf() && !node.is_sentinel());
            if !is_leaf {
                return Err(BuildError::InvalidTree {
                    attribute: config.name.clone(),
                    violations: vec![TreeViolation::InvalidDefault {
                        name: default.clone(),
                    }],
                });
            }
        }

        for event in config.events.iter() {
            if let Some(unknown) = event
                .targets
                .iter()
                .find(|target| target.is_none() || !tree.contains(target.as_str()))
            {
                return Err(BuildError::UnknownState {
                    attribute: config.name.clone(),
                    name: unknown.clone(),
                });
            }
        }

        Ok(Self {
            name: config.name.clone(),
            tree,
            default: config.default.clone(),
            events: config.events.clone(),
            validate_on_change: config.validate_on_change,
            allow_nil: config.allow_nil,
            message: config.message.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tree(&self) -> &StateTree {
        &self.tree
    }

    /// Value reported while the host has never stored one.
    pub fn default_state(&self) -> Option<&StateId> {
        self.default.as_ref()
    }

    pub fn events(&self) -> impl Iterator<Item = &EventDef> {
        self.events.iter()
    }

    pub fn event(&self, name: &str) -> Option<&EventDef> {
        self.events.get(name)
    }

    pub fn validates_on_change(&self) -> bool {
        self.validate_on_change
    }

    pub fn allows_nil(&self) -> bool {
        self.allow_nil
    }

    pub fn invalid_message(&self) -> &str {
        self.message.as_deref().unwrap_or(INVALID_VALUE)
    }
}
