//! Named business events.
//!
//! Firing an event marks it active on the host's ledger for the duration
//! of a body. Inside the body, [`EventBinding::transition_to`] (or
//! [`AttributeController::transition_to`]) changes state tagged with the
//! event, so rules declared with `on_event` apply.

use super::controller::AttributeController;
use super::error::StateChangeError;
use super::pipeline::Strictness;
use crate::config::EventDef;
use crate::core::StateId;
use crate::host::Stateful;

/// A declared event of one attribute.
pub struct EventBinding<'m, E> {
    controller: AttributeController<'m, E>,
    event: &'m EventDef,
}

impl<'m, E> EventBinding<'m, E> {
    pub(crate) fn new(controller: AttributeController<'m, E>, event: &'m EventDef) -> Self {
        Self { controller, event }
    }

    pub fn name(&self) -> &'m str {
        &self.event.name
    }

    /// States the event is declared to lead to.
    pub fn targets(&self) -> &'m [StateId] {
        &self.event.targets
    }
}

impl<'m, E: Stateful> EventBinding<'m, E> {
    /// Whether the event is currently allowable for `entity`.
    pub fn is_allowable(&self, entity: &E) -> bool {
        self.controller
            .allowable_events(entity)
            .contains(&self.event.name.as_str())
    }

    /// Fire the event leniently: transitions made by `body` return `false`
    /// instead of failing.
    pub fn fire<R>(
        &self,
        entity: &mut E,
        body: impl FnOnce(&mut E, &Self) -> Result<R, StateChangeError>,
    ) -> Result<R, StateChangeError> {
        self.run(entity, Strictness::Lenient, body)
    }

    /// Fire the event strictly: illegal transitions made by `body` fail.
    pub fn fire_strict<R>(
        &self,
        entity: &mut E,
        body: impl FnOnce(&mut E, &Self) -> Result<R, StateChangeError>,
    ) -> Result<R, StateChangeError> {
        self.run(entity, Strictness::Strict, body)
    }

    fn run<R>(
        &self,
        entity: &mut E,
        strictness: Strictness,
        body: impl FnOnce(&mut E, &Self) -> Result<R, StateChangeError>,
    ) -> Result<R, StateChangeError> {
        let _scope = entity
            .ledger()
            .begin_event(self.controller.name(), self.name(), strictness);
        tracing::trace!(attribute = self.controller.name(), event = self.name(), ?strictness, "firing event");
        body(entity, self)
    }

    /// Change state on behalf of this event.
    pub fn transition_to(&self, entity: &mut E, to: impl Into<StateId>) -> Result<bool, StateChangeError> {
        self.controller.transition_to(entity, to)
    }
}

impl<E> std::fmt::Debug for EventBinding<'_, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBinding")
            .field("attribute", &self.controller.name())
            .field("event", &self.event)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{kata_machine, Record};

    #[test]
    fn unknown_events_are_rejected() {
        let machine = kata_machine();
        let state = machine.attribute("state").unwrap();
        let err = state.event("launch").unwrap_err();
        assert_eq!(err.to_string(), "unknown event 'launch' for state");
    }

    #[test]
    fn event_is_active_only_while_firing() {
        let machine = kata_machine();
        let state = machine.attribute("state").unwrap();
        let submit = state.event("submit").unwrap();
        let mut record = Record::default();
        record.set("state", "draft");

        let seen = submit
            .fire(&mut record, |record, _| {
                Ok(record.ledger().active_event("state").map(|active| active.name))
            })
            .unwrap();

        assert_eq!(seen.as_deref(), Some("submit"));
        assert!(record.ledger().active_event("state").is_none());
        assert!(submit.is_allowable(&record));
        assert_eq!(submit.targets(), &[StateId::from("beta")]);
    }

    #[test]
    fn lenient_event_reports_illegal_transition_as_false() {
        let machine = kata_machine();
        let state = machine.attribute("state").unwrap();
        let approve = state.event("approve").unwrap();
        let mut record = Record::default();
        record.set("state", "draft");

        let changed = approve
            .fire(&mut record, |record, event| event.transition_to(record, "approved"))
            .unwrap();

        assert!(!changed);
        assert_eq!(record.get("state"), Some(&StateId::from("draft")));
    }

    #[test]
    fn strict_event_raises_on_illegal_transition() {
        let machine = kata_machine();
        let state = machine.attribute("state").unwrap();
        let approve = state.event("approve").unwrap();
        let mut record = Record::default();
        record.set("state", "draft");

        let err = approve
            .fire_strict(&mut record, |record, event| event.transition_to(record, "approved"))
            .unwrap_err();

        assert!(matches!(err, StateChangeError::Disallowed { .. }));
        assert!(record.ledger().active_event("state").is_none());
    }
}
