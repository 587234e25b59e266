//! Per-instance transition bookkeeping.
//!
//! Every host entity owns one [`TransitionLedger`]. It remembers which
//! run-once hooks already fired, whether the entity is inside an
//! unprotected scope, and which event (if any) is currently being fired
//! for each attribute.

use crate::core::StateId;
use crate::hooks::HookId;
use crate::machine::Strictness;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RunOnceKey {
    attribute: String,
    from: StateId,
    to: StateId,
    hook: HookId,
}

/// The event being fired for one attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveEvent {
    pub name: String,
    pub strictness: Strictness,
}

#[derive(Debug, Clone, Default)]
struct LedgerState {
    ran: HashSet<RunOnceKey>,
    unprotected: usize,
    events: HashMap<String, ActiveEvent>,
}

/// Mutable transition state of one host instance.
///
/// Cloning a ledger copies its contents; the clone is independent.
#[derive(Debug, Default)]
pub struct TransitionLedger {
    inner: Arc<Mutex<LedgerState>>,
}

impl TransitionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter an unprotected scope. Protected hooks are skipped until the
    /// returned guard is dropped. Scopes nest.
    pub fn unprotected(&self) -> UnprotectedScope {
        self.inner.lock().unprotected += 1;
        UnprotectedScope {
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn is_unprotected(&self) -> bool {
        self.inner.lock().unprotected > 0
    }

    /// Record that a run-once hook fired for `(from, to)`. Returns `false`
    /// when it had already fired.
    pub(crate) fn mark_ran(&self, attribute: &str, from: &StateId, to: &StateId, hook: HookId) -> bool {
        self.inner.lock().ran.insert(RunOnceKey {
            attribute: attribute.to_string(),
            from: from.clone(),
            to: to.clone(),
            hook,
        })
    }

    /// Whether a run-once hook already fired for `(from, to)`.
    pub fn has_run(&self, attribute: &str, from: &StateId, to: &StateId, hook: HookId) -> bool {
        self.inner.lock().ran.contains(&RunOnceKey {
            attribute: attribute.to_string(),
            from: from.clone(),
            to: to.clone(),
            hook,
        })
    }

    /// Forget every run-once record, e.g. after reloading the host.
    pub fn forget_callbacks(&self) {
        let mut state = self.inner.lock();
        tracing::trace!(forgotten = state.ran.len(), "clearing run-once ledger");
        state.ran.clear();
    }

    pub(crate) fn begin_event(&self, attribute: &str, name: &str, strictness: Strictness) -> EventScope {
        let previous = self.inner.lock().events.insert(
            attribute.to_string(),
            ActiveEvent {
                name: name.to_string(),
                strictness,
            },
        );
        EventScope {
            inner: Arc::clone(&self.inner),
            attribute: attribute.to_string(),
            previous,
        }
    }

    /// The event currently being fired for `attribute`.
    pub fn active_event(&self, attribute: &str) -> Option<ActiveEvent> {
        self.inner.lock().events.get(attribute).cloned()
    }
}

impl Clone for TransitionLedger {
    fn clone(&self) -> Self {
        let state = self.inner.lock().clone();
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }
}

/// Guard returned by [`TransitionLedger::unprotected`].
#[must_use = "the scope ends as soon as the guard is dropped"]
#[derive(Debug)]
pub struct UnprotectedScope {
    inner: Arc<Mutex<LedgerState>>,
}

impl Drop for UnprotectedScope {
    fn drop(&mut self) {
        let mut state = self.inner.lock();
        state.unprotected = state.unprotected.saturating_sub(1);
    }
}

/// Guard marking an event as active; restores the previous one on drop.
#[must_use = "the event ends as soon as the guard is dropped"]
#[derive(Debug)]
pub(crate) struct EventScope {
    inner: Arc<Mutex<LedgerState>>,
    attribute: String,
    previous: Option<ActiveEvent>,
}

impl Drop for EventScope {
    fn drop(&mut self) {
        let mut state = self.inner.lock();
        match self.previous.take() {
            Some(previous) => {
                state.events.insert(self.attribute.clone(), previous);
            }
            None => {
                state.events.remove(&self.attribute);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    #[test]
    fn unprotected_scopes_nest() {
        let ledger = TransitionLedger::new();
        assert!(!ledger.is_unprotected());

        let outer = ledger.unprotected();
        {
            let _inner = ledger.unprotected();
            assert!(ledger.is_unprotected());
        }
        assert!(ledger.is_unprotected());
        drop(outer);
        assert!(!ledger.is_unprotected());
    }

    #[test]
    fn unprotected_scope_clears_on_panic() {
        let ledger = TransitionLedger::new();
        let result = catch_unwind(AssertUnwindSafe(|| {
            let _scope = ledger.unprotected();
            panic!("hook exploded");
        }));
        assert!(result.is_err());
        assert!(!ledger.is_unprotected());
    }

    #[test]
    fn run_once_marks_each_key_once() {
        let ledger = TransitionLedger::new();
        let (a, b) = (StateId::from("a"), StateId::from("b"));
        let hook = HookId::new();

        assert!(ledger.mark_ran("state", &a, &b, hook));
        assert!(!ledger.mark_ran("state", &a, &b, hook));
        assert!(ledger.has_run("state", &a, &b, hook));
        assert!(ledger.mark_ran("state", &b, &a, hook));
        assert!(ledger.mark_ran("review", &a, &b, hook));
    }

    #[test]
    fn forget_callbacks_resets_run_once() {
        let ledger = TransitionLedger::new();
        let (a, b) = (StateId::from("a"), StateId::from("b"));
        let hook = HookId::new();

        ledger.mark_ran("state", &a, &b, hook);
        ledger.forget_callbacks();
        assert!(!ledger.has_run("state", &a, &b, hook));
    }

    #[test]
    fn event_scopes_restore_previous_event() {
        let ledger = TransitionLedger::new();
        {
            let _outer = ledger.begin_event("state", "publish", Strictness::Lenient);
            {
                let _inner = ledger.begin_event("state", "approve", Strictness::Strict);
                let active = ledger.active_event("state").unwrap();
                assert_eq!(active.name, "approve");
                assert_eq!(active.strictness, Strictness::Strict);
            }
            assert_eq!(ledger.active_event("state").unwrap().name, "publish");
            assert!(ledger.active_event("review").is_none());
        }
        assert!(ledger.active_event("state").is_none());
    }

    #[test]
    fn clones_are_independent() {
        let ledger = TransitionLedger::new();
        let (a, b) = (StateId::from("a"), StateId::from("b"));
        let hook = HookId::new();
        ledger.mark_ran("state", &a, &b, hook);

        let copy = ledger.clone();
        copy.forget_callbacks();

        assert!(ledger.has_run("state", &a, &b, hook));
        assert!(!copy.has_run("state", &a, &b, hook));
    }
}
