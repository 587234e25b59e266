//! Builder for constructing state machines.

use crate::builder::error::BuildError;
use crate::builder::rules::RuleScope;
use crate::config::{AttributeConfig, MachineConfig};
use crate::hooks::{Lineage, RuleStore};
use crate::host::Stateful;
use crate::machine::{Machine, StateAttribute};
use std::sync::Arc;

/// Builder for constructing machines with a fluent API.
///
/// # Example
///
/// ```rust,ignore
/// let machine = Machine::<Kata>::builder("Kata")
///     .attribute(config)?
///     .when_transition("state", |rules| {
///         rules.from("draft").to("beta").before_save(|kata, _| Ok(()));
///     })?
///     .build()?;
/// ```
pub struct MachineBuilder<E> {
    name: String,
    parent: Option<Lineage<E>>,
    attributes: Vec<Arc<StateAttribute>>,
    rules: RuleStore<E>,
}

impl<E> MachineBuilder<E> {
    /// Create a new builder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            attributes: Vec::new(),
            rules: RuleStore::new(),
        }
    }

    /// Start from a machine config, adding every attribute it lists.
    pub fn from_config(config: &MachineConfig) -> Result<Self, BuildError> {
        config
            .attributes
            .iter()
            .try_fold(Self::new(config.name.clone()), |builder, attribute| {
                builder.attribute(attribute.clone())
            })
    }

    /// Inherit `parent`'s attributes and rules. Rules declared on this
    /// builder run after the parent's for the same transition; the parent
    /// itself is not modified. Attributes defined on this builder replace
    /// inherited ones of the same name.
    pub fn extends(mut self, parent: &Machine<E>) -> Self {
        let mut attributes: Vec<Arc<StateAttribute>> = parent
            .shared_attributes()
            .iter()
            .map(|inherited| {
                self.attributes
                    .iter()
                    .find(|own| own.name() == inherited.name())
                    .unwrap_or(inherited)
                    .clone()
            })
            .collect();
        for own in &self.attributes {
            if !attributes.iter().any(|a| a.name() == own.name()) {
                attributes.push(Arc::clone(own));
            }
        }
        self.attributes = attributes;
        self.parent = Some(parent.lineage().clone());
        self
    }

    /// Add (or redefine) a state attribute.
    /// Returns an error if the configuration does not describe a valid tree.
    pub fn attribute(mut self, config: AttributeConfig) -> Result<Self, BuildError> {
        let attribute = Arc::new(StateAttribute::from_config(&config)?);
        match self
            .attributes
            .iter()
            .position(|existing| existing.name() == attribute.name())
        {
            Some(i) => self.attributes[i] = attribute,
            None => self.attributes.push(attribute),
        }
        Ok(self)
    }

    /// Build the machine.
    /// Returns an error if no attribute was defined.
    pub fn build(self) -> Result<Machine<E>, BuildError> {
        if self.attributes.is_empty() {
            return Err(BuildError::NoAttributes);
        }

        let rules = self.rules.len();
        let lineage = match self.parent {
            Some(parent) => parent.extend(self.rules),
            None => Lineage::root(self.rules),
        };
        tracing::debug!(
            machine = %self.name,
            attributes = self.attributes.len(),
            rules,
            depth = lineage.depth(),
            "built state machine"
        );

        Ok(Machine::new(self.name, self.attributes, lineage))
    }
}

impl<E: Stateful + 'static> MachineBuilder<E> {
    /// Declare transition rules for `attribute`.
    /// Returns the first declaration error, if any.
    pub fn when_transition<F>(mut self, attribute: &str, declare: F) -> Result<Self, BuildError>
    where
        F: FnOnce(&mut RuleScope<E>),
    {
        let definition = self
            .attributes
            .iter()
            .find(|a| a.name() == attribute)
            .cloned()
            .ok_or_else(|| BuildError::UnknownAttribute(attribute.to_string()))?;

        let mut scope = RuleScope::new(definition);
        declare(&mut scope);
        let (store, errors) = scope.finish();

        if let Some(error) = errors.into_iter().next() {
            return Err(error);
        }
        self.rules.absorb(store);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{StateConfig, Targets};
    use crate::hooks::Phase;
    use crate::test_support::{kata_config, Record};

    #[test]
    fn builder_requires_attributes() {
        let result = MachineBuilder::<Record>::new("Empty").build();

        assert!(matches!(result, Err(BuildError::NoAttributes)));
    }

    #[test]
    fn rules_require_a_known_attribute() {
        let result = MachineBuilder::<Record>::new("Kata")
            .attribute(kata_config())
            .unwrap()
            .when_transition("review", |_| {});

        assert!(matches!(result, Err(BuildError::UnknownAttribute(ref name)) if name == "review"));
    }

    #[test]
    fn declaration_errors_fail_the_build() {
        let result = MachineBuilder::<Record>::new("Kata")
            .attribute(kata_config())
            .unwrap()
            .when_transition("state", |rules| {
                rules.from("draft").to("archived").before_save(|_, _| Ok(()));
            });

        assert!(matches!(result, Err(BuildError::UnknownState { ref name, .. }) if name == "archived"));
    }

    #[test]
    fn redefining_an_attribute_replaces_it() {
        let machine = MachineBuilder::<Record>::new("Kata")
            .attribute(kata_config())
            .unwrap()
            .attribute(AttributeConfig::new(
                "state",
                StateConfig::new().state("open", "closed").state("closed", Targets::None),
            ))
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(machine.attributes().count(), 1);
        assert!(machine.definition("state").unwrap().tree().contains("open"));
    }

    #[test]
    fn extends_shares_parent_rules() {
        let base = MachineBuilder::<Record>::new("Kata")
            .attribute(kata_config())
            .unwrap()
            .when_transition("state", |rules| {
                rules.from("draft").to("beta").before_save(|_, _| Ok(()));
            })
            .unwrap()
            .build()
            .unwrap();

        let derived = MachineBuilder::new("TimedKata")
            .extends(&base)
            .when_transition("state", |rules| {
                rules.from("draft").to("needs_feedback").before_save(|_, _| Ok(()));
            })
            .unwrap()
            .build()
            .unwrap();

        let hooks = |machine: &Machine<Record>| {
            machine
                .lineage()
                .hooks("state", Phase::BeforeSave, "draft", "needs_feedback")
                .count()
        };
        assert_eq!(hooks(&base), 1);
        assert_eq!(hooks(&derived), 2);
        assert_eq!(derived.lineage().depth(), 2);
        assert!(derived.definition("state").is_some());
    }

    #[test]
    fn builds_from_machine_config() {
        let config = MachineConfig::from_json(
            r#"{ "name": "Ticket", "attributes": [
                { "states": { "open": "closed", "closed": null } },
                { "name": "priority", "default": "low", "states": { "low": "high", "high": "low" } }
            ] }"#,
        )
        .unwrap();

        let machine: Machine<Record> = MachineBuilder::from_config(&config).unwrap().build().unwrap();
        assert_eq!(machine.name(), "Ticket");
        assert!(machine.attribute("priority").is_some());
        assert!(machine.attribute("state").is_some());
    }
}
