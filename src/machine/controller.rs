//! Per-attribute operations on a host entity.

use super::attribute::StateAttribute;
use super::error::StateChangeError;
use super::events::EventBinding;
use super::pipeline::{current_state, ChangeOptions, Outcome, Pipeline, Strictness};
use super::Machine;
use crate::config::EventDef;
use crate::core::{StateId, StateNode, StateTree};
use crate::host::Stateful;

/// Operations for one state attribute of a machine.
///
/// A controller is a pair of borrows and is cheap to copy. It holds no
/// per-instance state; every method takes the host entity explicitly.
pub struct AttributeController<'m, E> {
    machine: &'m Machine<E>,
    definition: &'m StateAttribute,
}

impl<'m, E> AttributeController<'m, E> {
    pub(crate) fn new(machine: &'m Machine<E>, definition: &'m StateAttribute) -> Self {
        Self { machine, definition }
    }

    pub fn name(&self) -> &'m str {
        self.definition.name()
    }

    pub fn machine(&self) -> &'m Machine<E> {
        self.machine
    }

    pub fn definition(&self) -> &'m StateAttribute {
        self.definition
    }

    pub fn tree(&self) -> &'m StateTree {
        self.definition.tree()
    }

    /// Every declared state and group name, sentinel excluded.
    pub fn values(&self) -> Vec<&'m StateId> {
        self.tree()
            .nodes()
            .filter(|node| !node.is_sentinel())
            .map(StateNode::name)
            .collect()
    }

    pub fn events(&self) -> impl Iterator<Item = &'m EventDef> {
        self.definition.events()
    }
}

impl<'m, E: Stateful> AttributeController<'m, E> {
    /// The current value: the stored one, else the configured default.
    pub fn value(&self, entity: &E) -> Option<StateId> {
        entity
            .read_state(self.name())
            .or_else(|| self.definition.default_state().cloned())
    }

    /// Node for the current value; the sentinel while never set. `None`
    /// when the stored value is not part of the tree.
    pub fn info(&self, entity: &E) -> Option<&'m StateNode> {
        self.tree().get(current_state(self.definition, entity).as_str())
    }

    /// Whether the current value is a known leaf (or never set).
    pub fn is_valid(&self, entity: &E) -> bool {
        self.info(entity).is_some_and(StateNode::is_leaf)
    }

    /// True when the current value is `name` or nested inside group `name`.
    pub fn is(&self, entity: &E, name: &str) -> bool {
        self.tree()
            .is_within(current_state(self.definition, entity).as_str(), name)
    }

    pub fn can_transition_to(&self, entity: &E, to: &str) -> bool {
        self.tree()
            .can_transition(current_state(self.definition, entity).as_str(), to)
    }

    /// Events whose every target is reachable from the current value. A
    /// group target requires all of its leaves to be reachable; events
    /// without targets are never allowable.
    pub fn allowable_events(&self, entity: &E) -> Vec<&'m str> {
        let from = current_state(self.definition, entity);
        let tree = self.tree();
        self.definition
            .events()
            .filter(|event| !event.targets.is_empty())
            .filter(|event| {
                event.targets.iter().all(|target| {
                    tree.collect_leaf_states(target.as_str())
                        .is_some_and(|leaves| {
                            leaves
                                .iter()
                                .all(|leaf| tree.can_transition(from.as_str(), leaf.as_str()))
                        })
                })
            })
            .map(|event| event.name.as_str())
            .collect()
    }

    /// Lenient change: `Ok(false)` when unchanged, illegal or not persisted.
    pub fn change_state(&self, entity: &mut E, to: impl Into<StateId>) -> Result<bool, StateChangeError> {
        self.change_state_with(entity, to, ChangeOptions::new())
    }

    pub fn change_state_with(
        &self,
        entity: &mut E,
        to: impl Into<StateId>,
        options: ChangeOptions<'_, E>,
    ) -> Result<bool, StateChangeError> {
        self.transition(entity, to, Strictness::Lenient, options)
            .map(Outcome::is_committed)
    }

    /// Strict change: illegal transitions and rejected saves are errors.
    /// Changing to the current value is still a no-op returning `Ok(false)`.
    pub fn change_state_strict(&self, entity: &mut E, to: impl Into<StateId>) -> Result<bool, StateChangeError> {
        self.change_state_strict_with(entity, to, ChangeOptions::new())
    }

    pub fn change_state_strict_with(
        &self,
        entity: &mut E,
        to: impl Into<StateId>,
        options: ChangeOptions<'_, E>,
    ) -> Result<bool, StateChangeError> {
        self.transition(entity, to, Strictness::Strict, options)
            .map(Outcome::is_committed)
    }

    /// Run the full pipeline and report how it ended.
    pub fn transition(
        &self,
        entity: &mut E,
        to: impl Into<StateId>,
        strictness: Strictness,
        options: ChangeOptions<'_, E>,
    ) -> Result<Outcome, StateChangeError> {
        Pipeline::new(self.machine, self.definition, strictness).run(entity, to.into(), options)
    }

    /// Binding for a declared event.
    pub fn event(&self, name: &str) -> Result<EventBinding<'m, E>, StateChangeError> {
        self.definition
            .event(name)
            .map(|event| EventBinding::new(*self, event))
            .ok_or_else(|| StateChangeError::UnknownEvent {
                attribute: self.name().to_string(),
                event: name.to_string(),
            })
    }

    /// Change state on behalf of the event currently being fired, with the
    /// strictness it was fired with.
    pub fn transition_to(&self, entity: &mut E, to: impl Into<StateId>) -> Result<bool, StateChangeError> {
        let active = entity
            .ledger()
            .active_event(self.name())
            .ok_or_else(|| StateChangeError::NoActiveEvent {
                attribute: self.name().to_string(),
            })?;
        let options = ChangeOptions::new().event(&active.name);
        self.transition(entity, to, active.strictness, options)
            .map(Outcome::is_committed)
    }

    /// The value before the host's pending change, if it has one.
    pub fn previous(&self, entity: &E) -> Option<StateId> {
        entity
            .changed_state(self.name())
            .and_then(|(previous, _)| previous)
    }

    pub fn previous_info(&self, entity: &E) -> Option<&'m StateNode> {
        self.previous(entity)
            .and_then(|previous| self.tree().get(previous.as_str()))
    }

    /// Check the host's pending change against the tree. Adds
    /// `"<to> is not a valid transition state from <from>"` to the host's
    /// errors when illegal. Does nothing unless validate-on-change is set.
    pub fn validate_transition(&self, entity: &mut E) -> bool {
        if !self.definition.validates_on_change() {
            return true;
        }
        let Some((previous, current)) = entity.changed_state(self.name()) else {
            return true;
        };
        let from = previous.unwrap_or_else(StateId::none);
        if from == current || self.tree().can_transition(from.as_str(), current.as_str()) {
            return true;
        }
        entity.add_error(
            self.name(),
            format!("{current} is not a valid transition state from {from}"),
        );
        false
    }

    /// Check that the current value (the configured default when never
    /// stored) is a known leaf. Without either, the value passes only when
    /// `allow_nil` is configured.
    pub fn validate_value(&self, entity: &mut E) -> bool {
        let valid = match self.value(entity) {
            None => self.definition.allows_nil(),
            Some(value) => self
                .tree()
                .get(value.as_str())
                .is_some_and(|node| node.is_leaf() && !node.is_sentinel()),
        };
        if !valid {
            entity.add_error(self.name(), self.definition.invalid_message().to_string());
        }
        valid
    }
}

impl<E> Clone for AttributeController<'_, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for AttributeController<'_, E> {}

impl<E> std::fmt::Debug for AttributeController<'_, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributeController")
            .field("machine", &self.machine.name())
            .field("attribute", &self.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::simple_machine;
    use crate::test_support::{kata_machine, merge_config, merge_machine, Record};

    #[test]
    fn value_falls_back_to_default() {
        let machine = merge_machine();
        let merge = machine.attribute("merge_status").unwrap();
        let record = Record::default();

        assert_eq!(merge.value(&record), Some(StateId::from("na")));
        assert!(merge.is(&record, "na"));
        assert_eq!(merge.info(&record).unwrap().name(), "na");
    }

    #[test]
    fn never_set_value_is_the_sentinel() {
        let machine = kata_machine();
        let state = machine.attribute("state").unwrap();
        let record = Record::default();

        assert_eq!(state.value(&record), None);
        assert!(state.info(&record).unwrap().is_sentinel());
        assert!(state.is_valid(&record));
        assert!(state.can_transition_to(&record, "draft"));
    }

    #[test]
    fn is_matches_enclosing_groups() {
        let machine = kata_machine();
        let state = machine.attribute("state").unwrap();
        let mut record = Record::default();
        record.set("state", "needs_feedback");

        assert!(state.is(&record, "needs_feedback"));
        assert!(state.is(&record, "beta"));
        assert!(state.is(&record, "published"));
        assert!(!state.is(&record, "draft"));
        assert!(!state.is(&record, "approved"));
    }

    #[test]
    fn unknown_stored_values_are_invalid() {
        let machine = kata_machine();
        let state = machine.attribute("state").unwrap();
        let mut record = Record::default();
        record.set("state", "archived");

        assert!(!state.is_valid(&record));
        assert!(state.info(&record).is_none());
        assert!(!state.can_transition_to(&record, "draft"));

        record.set("state", "beta");
        assert!(!state.is_valid(&record));
    }

    #[test]
    fn allowable_events_require_every_target() {
        let machine = kata_machine();
        let state = machine.attribute("state").unwrap();
        let mut record = Record::default();

        record.set("state", "draft");
        assert_eq!(state.allowable_events(&record), vec!["submit"]);

        record.set("state", "needs_approval");
        assert_eq!(state.allowable_events(&record), vec!["reject", "approve"]);

        record.set("state", "needs_feedback");
        assert_eq!(state.allowable_events(&record), vec!["reject"]);

        record.set("state", "retired");
        assert!(state.allowable_events(&record).is_empty());
    }

    #[test]
    fn values_list_declared_names() {
        let machine = kata_machine();
        let state = machine.attribute("state").unwrap();
        let values: Vec<&str> = state.values().into_iter().map(StateId::as_str).collect();

        assert_eq!(
            values,
            vec!["draft", "published", "beta", "needs_feedback", "needs_approval", "approved", "retired"]
        );
    }

    #[test]
    fn validate_transition_reports_illegal_changes() {
        let machine = kata_machine();
        let state = machine.attribute("state").unwrap();
        let mut record = Record::default();
        record.set("state", "draft");
        record.save_point();
        record.set("state", "retired");

        assert!(!state.validate_transition(&mut record));
        assert_eq!(
            record.errors,
            vec![("state".to_string(), "retired is not a valid transition state from draft".to_string())]
        );

        record.errors.clear();
        record.set("state", "needs_approval");
        assert!(state.validate_transition(&mut record));
        assert!(record.errors.is_empty());
    }

    #[test]
    fn validate_value_honors_allow_nil() {
        let machine = merge_machine();
        let merge = machine.attribute("merge_status").unwrap();
        let mut record = Record::default();

        assert!(merge.validate_value(&mut record));

        record.set("merge_status", "bogus");
        assert!(!merge.validate_value(&mut record));
        assert_eq!(record.errors[0].1, "has invalid value");

        let kata = kata_machine();
        let state = kata.attribute("state").unwrap();
        let mut fresh = Record::default();
        assert!(!state.validate_value(&mut fresh));
    }

    #[test]
    fn validate_value_accepts_the_default() {
        let machine = simple_machine::<Record>("Merge", merge_config().allow_nil(false)).unwrap();
        let merge = machine.attribute("merge_status").unwrap();
        let mut record = Record::default();

        assert_eq!(merge.value(&record), Some(StateId::from("na")));
        assert!(merge.is_valid(&record));
        assert!(merge.validate_value(&mut record));
        assert!(record.errors.is_empty());
    }

    #[test]
    fn previous_reads_the_pending_change() {
        let machine = kata_machine();
        let state = machine.attribute("state").unwrap();
        let mut record = Record::default();
        assert!(state.previous(&record).is_none());

        record.set("state", "draft");
        record.save_point();
        record.set("state", "needs_feedback");

        assert_eq!(state.previous(&record), Some(StateId::from("draft")));
        assert_eq!(state.previous_info(&record).unwrap().name(), "draft");
    }

    #[test]
    fn transition_to_requires_an_active_event() {
        let machine = kata_machine();
        let state = machine.attribute("state").unwrap();
        let mut record = Record::default();

        let err = state.transition_to(&mut record, "draft").unwrap_err();
        assert!(matches!(err, StateChangeError::NoActiveEvent { .. }));
        assert!(record.get("state").is_none());
    }
}
