//! Guard predicates for forbidding transitions.
//!
//! Guards are pure boolean functions over the host entity and the
//! transition in flight. They back the `forbid_if` rule, which turns a
//! matching guard into a validation error.

use super::context::TransitionContext;

/// Pure predicate over a host entity and a transition.
///
/// # Example
///
/// ```rust
/// use stateful::hooks::Guard;
///
/// struct Ticket {
///     assignee: Option<String>,
/// }
///
/// let unassigned = Guard::new(|t: &Ticket, _ctx| t.assignee.is_none());
/// # let _ = unassigned;
/// ```
pub struct Guard<E> {
    predicate: Box<dyn Fn(&E, &TransitionContext<'_, E>) -> bool + Send + Sync>,
}

impl<E> Guard<E> {
    /// Create a guard from a pure predicate function.
    ///
    /// The predicate must be deterministic and thread-safe.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&E, &TransitionContext<'_, E>) -> bool + Send + Sync + 'static,
    {
        Guard {
            predicate: Box::new(predicate),
        }
    }

    /// Evaluate the predicate without side effects.
    pub fn check(&self, entity: &E, ctx: &TransitionContext<'_, E>) -> bool {
        (self.predicate)(entity, ctx)
    }
}

impl<E> std::fmt::Debug for Guard<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Guard").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StateId;
    use crate::hooks::Phase;
    use crate::test_support::{kata_machine, Record};

    #[test]
    fn guard_sees_entity_and_transition() {
        let machine = kata_machine();
        let from = StateId::from("draft");
        let to = StateId::from("needs_feedback");
        let ctx = TransitionContext::new(&machine, "state", &from, &to, None, Phase::Validate, false);

        let to_feedback = Guard::new(|_: &Record, ctx| ctx.to == "needs_feedback");
        let flagged = Guard::new(|record: &Record, _| record.flagged);

        let mut record = Record::default();
        assert!(to_feedback.check(&record, &ctx));
        assert!(!flagged.check(&record, &ctx));

        record.flagged = true;
        assert!(flagged.check(&record, &ctx));
    }

    #[test]
    fn guard_is_deterministic() {
        let machine = kata_machine();
        let from = StateId::from("draft");
        let to = StateId::from("needs_approval");
        let ctx = TransitionContext::new(&machine, "state", &from, &to, Some("submit"), Phase::Validate, false);
        let guard = Guard::new(|_: &Record, ctx| ctx.event == Some("submit"));
        let record = Record::default();

        for _ in 0..10 {
            assert!(guard.check(&record, &ctx));
        }
    }
}
