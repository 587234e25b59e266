//! Built machines and the runtime side of the engine.
//!
//! A [`Machine`] bundles the state attributes of one entity type with the
//! rule stores it inherits. It is immutable after [`MachineBuilder::build`]
//! and may be shared across threads; all per-instance state lives in the
//! host entity and its [`TransitionLedger`](crate::ledger::TransitionLedger).

mod attribute;
mod controller;
mod error;
mod events;
mod pipeline;

pub use attribute::{StateAttribute, INVALID_VALUE};
pub use controller::AttributeController;
pub use error::StateChangeError;
pub use events::EventBinding;
pub use pipeline::{ChangeOptions, Outcome, Stage, Strictness};

use crate::builder::MachineBuilder;
use crate::core::StateId;
use crate::hooks::{Lineage, Phase, TransitionContext};
use crate::host::Stateful;
use std::sync::Arc;

/// The compiled state machine of one entity type.
pub struct Machine<E> {
    name: String,
    attributes: Vec<Arc<StateAttribute>>,
    lineage: Lineage<E>,
}

impl<E> Machine<E> {
    pub(crate) fn new(name: String, attributes: Vec<Arc<StateAttribute>>, lineage: Lineage<E>) -> Self {
        Self {
            name,
            attributes,
            lineage,
        }
    }

    pub fn builder(name: impl Into<String>) -> MachineBuilder<E> {
        MachineBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Controller for one attribute.
    pub fn attribute(&self, name: &str) -> Option<AttributeController<'_, E>> {
        self.definition(name)
            .map(|definition| AttributeController::new(self, definition))
    }

    pub fn definition(&self, name: &str) -> Option<&StateAttribute> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name() == name)
            .map(Arc::as_ref)
    }

    pub fn attributes(&self) -> impl Iterator<Item = &StateAttribute> {
        self.attributes.iter().map(Arc::as_ref)
    }

    pub(crate) fn shared_attributes(&self) -> &[Arc<StateAttribute>] {
        &self.attributes
    }

    /// Rule stores visible to this machine, ancestors first.
    pub fn lineage(&self) -> &Lineage<E> {
        &self.lineage
    }
}

impl<E: Stateful> Machine<E> {
    /// Run the hooks of `phase` for the host's pending change of
    /// `attribute`, for hosts that drive the rules from their own save
    /// cycle instead of through [`AttributeController::change_state`].
    ///
    /// Returns `false` when the host reports no change. `BeforeSave` also
    /// records tracking for the new value.
    pub fn process_changes(&self, entity: &mut E, attribute: &str, phase: Phase) -> Result<bool, StateChangeError> {
        let definition = self
            .definition(attribute)
            .ok_or_else(|| StateChangeError::UnknownAttribute(attribute.to_string()))?;
        let Some((previous, current)) = entity.changed_state(attribute) else {
            return Ok(false);
        };
        let from = previous.unwrap_or_else(StateId::none);
        if from == current {
            return Ok(false);
        }

        let event = entity.ledger().active_event(attribute).map(|active| active.name);
        if phase == Phase::BeforeSave {
            pipeline::record_tracking(definition, entity, &current);
        }

        let unprotected = entity.ledger().is_unprotected();
        let ctx = TransitionContext::new(
            self,
            definition.name(),
            &from,
            &current,
            event.as_deref(),
            phase,
            unprotected,
        );
        pipeline::run_phase(entity, &ctx)?;
        Ok(true)
    }
}

impl<E> Clone for Machine<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            attributes: self.attributes.clone(),
            lineage: self.lineage.clone(),
        }
    }
}

impl<E> std::fmt::Debug for Machine<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Machine")
            .field("name", &self.name)
            .field("attributes", &self.attributes.iter().map(|a| a.name()).collect::<Vec<_>>())
            .field("lineage", &self.lineage.depth())
            .finish()
    }
}
