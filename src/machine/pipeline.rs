//! The transition protocol.
//!
//! A state change moves through
//! `Requested → Validating → Committing → AfterCommit → Done`, and may
//! end in `Aborted` from `Validating` (illegal transition) or `Committing`
//! (rejected save). Hooks run at fixed phases along the way:
//!
//! 1. A change to the current value is a no-op.
//! 2. Validating: legality is checked, then the validation hooks run.
//! 3. Committing: the value is written, the caller's block sees the
//!    previous value, tracking is recorded and before-save hooks run.
//! 4. The host persists the change.
//! 5. AfterCommit: after-save hooks run, each at most once per
//!    `(from, to)` pair for the lifetime of the instance.
//!
//! Hook errors abort the remaining steps and propagate unchanged. Nothing
//! is rolled back.

use super::attribute::StateAttribute;
use super::error::StateChangeError;
use super::Machine;
use crate::core::{StateId, TrackingRecord};
use crate::hooks::{HookError, Phase, TransitionContext};
use crate::host::{PersistError, Stateful};
use std::fmt;

/// How failures are reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strictness {
    /// Illegal transitions and rejected saves return `false`.
    Lenient,
    /// Illegal transitions and rejected saves are errors.
    Strict,
}

/// Lifecycle position of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Requested,
    Validating,
    Committing,
    AfterCommit,
    Done,
    Aborted,
}

impl Stage {
    fn can_advance_to(self, next: Stage) -> bool {
        use Stage::*;
        matches!(
            (self, next),
            (Requested, Validating)
                | (Requested, Done)
                | (Validating, Committing)
                | (Validating, Aborted)
                | (Committing, AfterCommit)
                | (Committing, Aborted)
                | (AfterCommit, Done)
        )
    }
}

/// How a transition ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The target was already the current value.
    Unchanged,
    /// The tree does not allow the transition.
    Disallowed,
    /// The value was written but the host refused to persist it.
    PersistFailed,
    Committed,
}

impl Outcome {
    pub fn is_committed(self) -> bool {
        matches!(self, Outcome::Committed)
    }
}

type Block<'a, E> = Box<dyn FnOnce(&mut E, &StateId) + 'a>;
type Persist<'a, E> = Box<dyn FnOnce(&mut E) -> bool + 'a>;

/// Per-call options for a state change.
pub struct ChangeOptions<'a, E> {
    event: Option<&'a str>,
    skip_persist: bool,
    persist: Option<Persist<'a, E>>,
    block: Option<Block<'a, E>>,
}

impl<'a, E> ChangeOptions<'a, E> {
    pub fn new() -> Self {
        Self {
            event: None,
            skip_persist: false,
            persist: None,
            block: None,
        }
    }

    /// Tag the change with a business event, enabling rules scoped to it.
    pub fn event(mut self, event: &'a str) -> Self {
        self.event = Some(event);
        self
    }

    /// Change the value in memory only; host persistence is not invoked.
    pub fn skip_persist(mut self) -> Self {
        self.skip_persist = true;
        self
    }

    /// Persist through `persist` instead of [`Stateful::persist`] for this
    /// call. A `false` return is handled like a rejected save.
    pub fn persist_with<F>(mut self, persist: F) -> Self
    where
        F: FnOnce(&mut E) -> bool + 'a,
    {
        self.persist = Some(Box::new(persist));
        self
    }

    /// Run `block` with the previous value right after the new one is
    /// written, before any save hooks or persistence.
    pub fn apply<F>(mut self, block: F) -> Self
    where
        F: FnOnce(&mut E, &StateId) + 'a,
    {
        self.block = Some(Box::new(block));
        self
    }
}

impl<E> Default for ChangeOptions<'_, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for ChangeOptions<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeOptions")
            .field("event", &self.event)
            .field("skip_persist", &self.skip_persist)
            .field("persist", &self.persist.is_some())
            .field("block", &self.block.is_some())
            .finish()
    }
}

/// One transition in flight.
pub(crate) struct Pipeline<'m, E> {
    machine: &'m Machine<E>,
    attribute: &'m StateAttribute,
    strictness: Strictness,
    stage: Stage,
}

impl<'m, E: Stateful> Pipeline<'m, E> {
    pub(crate) fn new(machine: &'m Machine<E>, attribute: &'m StateAttribute, strictness: Strictness) -> Self {
        Self {
            machine,
            attribute,
            strictness,
            stage: Stage::Requested,
        }
    }

    fn advance(&mut self, next: Stage) {
        debug_assert!(
            self.stage.can_advance_to(next),
            "illegal stage change {:?} -> {:?}",
            self.stage,
            next
        );
        tracing::trace!(attribute = self.attribute.name(), from = ?self.stage, to = ?next, "pipeline stage");
        self.stage = next;
    }

    pub(crate) fn run(
        mut self,
        entity: &mut E,
        to: StateId,
        options: ChangeOptions<'_, E>,
    ) -> Result<Outcome, StateChangeError> {
        let attribute = self.attribute;
        let name = attribute.name();
        let from = current_state(attribute, entity);

        if from == to {
            self.advance(Stage::Done);
            return Ok(Outcome::Unchanged);
        }

        self.advance(Stage::Validating);
        if !attribute.tree().can_transition(from.as_str(), to.as_str()) {
            self.advance(Stage::Aborted);
            tracing::debug!(attribute = name, %from, %to, "transition not allowed");
            return match self.strictness {
                Strictness::Lenient => Ok(Outcome::Disallowed),
                Strictness::Strict => Err(StateChangeError::Disallowed {
                    attribute: name.to_string(),
                    from,
                    to,
                }),
            };
        }

        let ctx = TransitionContext::new(
            self.machine,
            name,
            &from,
            &to,
            options.event,
            Phase::BeforeValidation,
            entity.ledger().is_unprotected(),
        );
        for phase in Phase::VALIDATION {
            let unprotected = entity.ledger().is_unprotected();
            run_phase(entity, &ctx.at(phase, unprotected))?;
        }

        self.advance(Stage::Committing);
        entity.write_state(name, to.clone());
        if let Some(block) = options.block {
            block(entity, &from);
        }
        record_tracking(attribute, entity, &to);
        let unprotected = entity.ledger().is_unprotected();
        run_phase(entity, &ctx.at(Phase::BeforeSave, unprotected))?;

        if !options.skip_persist {
            let persisted = match options.persist {
                Some(persist) => {
                    if persist(entity) {
                        Ok(())
                    } else {
                        Err(PersistError::Rejected)
                    }
                }
                None => match self.strictness {
                    Strictness::Lenient => {
                        if entity.persist() {
                            Ok(())
                        } else {
                            Err(PersistError::Rejected)
                        }
                    }
                    Strictness::Strict => entity.persist_strict(),
                },
            };
            if let Err(source) = persisted {
                self.advance(Stage::Aborted);
                tracing::warn!(attribute = name, %from, %to, error = %source, "host rejected state change");
                return match self.strictness {
                    Strictness::Lenient => Ok(Outcome::PersistFailed),
                    Strictness::Strict => Err(StateChangeError::Persist {
                        attribute: name.to_string(),
                        source,
                    }),
                };
            }
        }

        self.advance(Stage::AfterCommit);
        let unprotected = entity.ledger().is_unprotected();
        run_phase(entity, &ctx.at(Phase::AfterSave, unprotected))?;

        self.advance(Stage::Done);
        tracing::debug!(
            machine = self.machine.name(),
            attribute = name,
            %from,
            %to,
            event = options.event,
            "state change committed"
        );
        Ok(Outcome::Committed)
    }
}

/// The stored value, the default when never stored, else the sentinel.
pub(crate) fn current_state<E: Stateful>(attribute: &StateAttribute, entity: &E) -> StateId {
    entity
        .read_state(attribute.name())
        .or_else(|| attribute.default_state().cloned())
        .unwrap_or_else(StateId::none)
}

/// Record entry into `to`, or into its nearest tracked ancestor group.
pub(crate) fn record_tracking<E: Stateful>(attribute: &StateAttribute, entity: &mut E, to: &StateId) {
    let Some(tracked) = attribute.tree().tracked_for(to.as_str()) else {
        return;
    };
    let value = tracked.is_group().then(|| to.clone());
    let record = TrackingRecord::now(entity.current_actor(), value);
    tracing::trace!(attribute = attribute.name(), state = %tracked.name(), "recording tracked state");
    entity.record_tracking(attribute.name(), tracked.name(), record);
}

/// Run the merged hooks of one phase, honoring event scope, protection and
/// run-once.
pub(crate) fn run_phase<E: Stateful>(entity: &mut E, ctx: &TransitionContext<'_, E>) -> Result<(), HookError> {
    let hooks = ctx
        .machine()
        .lineage()
        .hooks(ctx.attribute, ctx.phase, ctx.from.as_str(), ctx.to.as_str());

    for hook in hooks {
        if !hook.applies_to(ctx.event) {
            continue;
        }
        if hook.is_protected() && ctx.unprotected {
            tracing::trace!(hook = %hook.id(), phase = %ctx.phase, "skipping protected hook");
            continue;
        }
        if hook.is_run_once() && !entity.ledger().mark_ran(ctx.attribute, ctx.from, ctx.to, hook.id()) {
            tracing::trace!(hook = %hook.id(), phase = %ctx.phase, "run-once hook already fired");
            continue;
        }
        tracing::trace!(hook = %hook.id(), phase = %ctx.phase, from = %ctx.from, to = %ctx.to, "running hook");
        hook.call(entity, ctx)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_graph_matches_protocol() {
        assert!(Stage::Requested.can_advance_to(Stage::Validating));
        assert!(Stage::Validating.can_advance_to(Stage::Aborted));
        assert!(Stage::Committing.can_advance_to(Stage::Aborted));
        assert!(Stage::AfterCommit.can_advance_to(Stage::Done));
        assert!(!Stage::AfterCommit.can_advance_to(Stage::Aborted));
        assert!(!Stage::Done.can_advance_to(Stage::Requested));
    }

    #[test]
    fn only_committed_is_committed() {
        assert!(Outcome::Committed.is_committed());
        assert!(!Outcome::Unchanged.is_committed());
        assert!(!Outcome::Disallowed.is_committed());
        assert!(!Outcome::PersistFailed.is_committed());
    }
}
