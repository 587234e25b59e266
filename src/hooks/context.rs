//! Read-only view of the transition a hook is running for.

use super::phase::Phase;
use crate::core::StateId;
use crate::machine::{AttributeController, Machine};

/// Everything a hook may inspect about the transition in flight.
///
/// The context borrows from the running pipeline, so hooks receive it by
/// reference alongside the mutable host entity.
pub struct TransitionContext<'a, E> {
    machine: &'a Machine<E>,
    pub attribute: &'a str,
    pub from: &'a StateId,
    pub to: &'a StateId,
    /// Event the transition was fired under, if any.
    pub event: Option<&'a str>,
    pub phase: Phase,
    /// Snapshot of the host's unprotected scope when the phase started.
    pub unprotected: bool,
}

impl<'a, E> TransitionContext<'a, E> {
    pub(crate) fn new(
        machine: &'a Machine<E>,
        attribute: &'a str,
        from: &'a StateId,
        to: &'a StateId,
        event: Option<&'a str>,
        phase: Phase,
        unprotected: bool,
    ) -> Self {
        Self {
            machine,
            attribute,
            from,
            to,
            event,
            phase,
            unprotected,
        }
    }

    /// The same transition at another phase, with a fresh protection
    /// snapshot.
    pub(crate) fn at(&self, phase: Phase, unprotected: bool) -> Self {
        Self {
            phase,
            unprotected,
            ..*self
        }
    }

    pub fn machine(&self) -> &'a Machine<E> {
        self.machine
    }

    /// Controller for the attribute being changed.
    pub fn controller(&self) -> Option<AttributeController<'a, E>> {
        self.machine.attribute(self.attribute)
    }
}

impl<E> Clone for TransitionContext<'_, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for TransitionContext<'_, E> {}

impl<E> std::fmt::Debug for TransitionContext<'_, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionContext")
            .field("machine", &self.machine.name())
            .field("attribute", &self.attribute)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("event", &self.event)
            .field("phase", &self.phase)
            .field("unprotected", &self.unprotected)
            .finish()
    }
}
