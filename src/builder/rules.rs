//! Fluent DSL for declaring transition rules.
//!
//! Rules are declared inside
//! [`MachineBuilder::when_transition`](crate::builder::MachineBuilder::when_transition),
//! which hands the closure a [`RuleScope`] for one attribute:
//!
//! ```rust,ignore
//! builder.when_transition("state", |rules| {
//!     rules.from("draft").to("beta").before_save(|kata, _| { /* ... */ Ok(()) });
//!     rules.from("*").to("retired").forbid_if(|kata, _| kata.locked);
//!     rules.after_transition_from("needs_approval").to("approved", |kata, _| Ok(()));
//! })?;
//! ```
//!
//! Selectors are expanded when the rule is declared: the wildcard selects
//! every leaf (and, as a `from` selector, the never-set sentinel), groups
//! select their leaves, and self-loops are dropped.

use super::error::BuildError;
use crate::core::{IntoStates, StateId};
use crate::hooks::{callback, Callback, Guard, Hook, HookError, Phase, RuleStore, TransitionContext};
use crate::host::Stateful;
use crate::machine::StateAttribute;
use std::sync::Arc;

/// Rule declarations for one attribute.
pub struct RuleScope<E> {
    attribute: Arc<StateAttribute>,
    store: RuleStore<E>,
    errors: Vec<BuildError>,
}

impl<E: Stateful + 'static> RuleScope<E> {
    pub(crate) fn new(attribute: Arc<StateAttribute>) -> Self {
        Self {
            attribute,
            store: RuleStore::new(),
            errors: Vec::new(),
        }
    }

    pub(crate) fn finish(self) -> (RuleStore<E>, Vec<BuildError>) {
        (self.store, self.errors)
    }

    pub fn attribute(&self) -> &str {
        self.attribute.name()
    }

    /// Start a rule for transitions leaving `states`. Must be followed by
    /// [`WhenTransition::to`] before any hook is attached.
    pub fn from(&mut self, states: impl IntoStates) -> WhenTransition<'_, E> {
        let from = self.expand(states.into_states(), true, BuildError::MissingFromState);
        WhenTransition {
            scope: self,
            from,
            to: None,
            event: None,
        }
    }

    /// Single-source sugar: attach hooks for `phase` on transitions from
    /// `states` to the targets named in [`FromTransition::to`].
    pub fn transition_from(&mut self, phase: Phase, states: impl IntoStates) -> FromTransition<'_, E> {
        let from = self.expand(states.into_states(), true, BuildError::MissingFromState);
        FromTransition {
            scope: self,
            phase,
            from,
        }
    }

    pub fn before_transition_from(&mut self, states: impl IntoStates) -> FromTransition<'_, E> {
        self.transition_from(Phase::BeforeSave, states)
    }

    pub fn after_transition_from(&mut self, states: impl IntoStates) -> FromTransition<'_, E> {
        self.transition_from(Phase::AfterSave, states)
    }

    pub fn validate_transition_from(&mut self, states: impl IntoStates) -> FromTransition<'_, E> {
        self.transition_from(Phase::Validate, states)
    }

    fn expand(&mut self, selectors: Vec<StateId>, is_source: bool, missing: BuildError) -> Vec<StateId> {
        if selectors.is_empty() {
            self.errors.push(missing);
            return Vec::new();
        }
        match self.attribute.tree().expand(&selectors, is_source) {
            Ok(states) => states,
            Err(name) => {
                self.errors.push(BuildError::UnknownState {
                    attribute: self.attribute.name().to_string(),
                    name,
                });
                Vec::new()
            }
        }
    }

    fn register(&mut self, from: &[StateId], to: &[StateId], hook: Hook<E>) {
        let hook = Arc::new(hook);
        let attribute = self.attribute.name();
        for source in from {
            for target in to.iter().filter(|target| *target != source) {
                self.store.add(attribute, source, target, Arc::clone(&hook));
            }
        }
        tracing::trace!(
            attribute,
            phase = %hook.phase(),
            event = hook.event(),
            from = from.len(),
            to = to.len(),
            "declared transition rule"
        );
    }
}

/// A rule under construction: `from(..).to(..)` followed by hooks.
///
/// Every hook method registers immediately and returns the rule, so
/// several hooks can share one selection.
pub struct WhenTransition<'s, E> {
    scope: &'s mut RuleScope<E>,
    from: Vec<StateId>,
    to: Option<Vec<StateId>>,
    event: Option<String>,
}

impl<'s, E: Stateful + 'static> WhenTransition<'s, E> {
    pub fn to(mut self, states: impl IntoStates) -> Self {
        self.to = Some(
            self.scope
                .expand(states.into_states(), false, BuildError::MissingToState),
        );
        self
    }

    /// Limit the following hooks to transitions fired under `event`.
    pub fn on_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    fn add(self, phase: Phase, protected: bool, body: Callback<E>) -> Self {
        match &self.to {
            Some(to) => {
                let hook = Hook::new(phase, self.event.clone(), protected, body);
                self.scope.register(&self.from, to, hook);
            }
            None => self.scope.errors.push(BuildError::MissingToState),
        }
        self
    }

    pub fn before_validation<F>(self, f: F) -> Self
    where
        F: Fn(&mut E, &TransitionContext<'_, E>) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.add(Phase::BeforeValidation, false, callback(f))
    }

    pub fn validate<F>(self, f: F) -> Self
    where
        F: Fn(&mut E, &TransitionContext<'_, E>) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.add(Phase::Validate, false, callback(f))
    }

    pub fn after_validation<F>(self, f: F) -> Self
    where
        F: Fn(&mut E, &TransitionContext<'_, E>) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.add(Phase::AfterValidation, false, callback(f))
    }

    pub fn before_save<F>(self, f: F) -> Self
    where
        F: Fn(&mut E, &TransitionContext<'_, E>) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.add(Phase::BeforeSave, false, callback(f))
    }

    /// Alias of [`WhenTransition::before_save`].
    pub fn before_commit<F>(self, f: F) -> Self
    where
        F: Fn(&mut E, &TransitionContext<'_, E>) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.before_save(f)
    }

    /// Runs once per `(from, to)` pair for the lifetime of each instance.
    pub fn after_save<F>(self, f: F) -> Self
    where
        F: Fn(&mut E, &TransitionContext<'_, E>) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.add(Phase::AfterSave, false, callback(f))
    }

    /// Alias of [`WhenTransition::after_save`].
    pub fn after_commit<F>(self, f: F) -> Self
    where
        F: Fn(&mut E, &TransitionContext<'_, E>) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.after_save(f)
    }

    /// Add `"Cannot transition from <from> to <to>"` to the host's errors
    /// when `predicate` holds.
    pub fn forbid_if<F>(self, predicate: F) -> Self
    where
        F: Fn(&E, &TransitionContext<'_, E>) -> bool + Send + Sync + 'static,
    {
        let guard = Guard::new(predicate);
        self.forbid_with(move |entity, ctx| {
            guard
                .check(entity, ctx)
                .then(|| format!("Cannot transition from {} to {}", ctx.from, ctx.to))
        })
    }

    /// Add the returned message to the host's errors, if any.
    pub fn forbid_with<F>(self, check: F) -> Self
    where
        F: Fn(&E, &TransitionContext<'_, E>) -> Option<String> + Send + Sync + 'static,
    {
        self.add(
            Phase::Validate,
            false,
            callback(move |entity: &mut E, ctx| {
                if let Some(message) = check(&*entity, ctx) {
                    entity.add_error(ctx.attribute, message);
                }
                Ok(())
            }),
        )
    }

    /// A before-save hook that is skipped inside an unprotected scope.
    pub fn protect<F>(self, f: F) -> Self
    where
        F: Fn(&mut E, &TransitionContext<'_, E>) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.protect_at(Phase::BeforeSave, f)
    }

    /// A protected hook for another phase.
    pub fn protect_at<F>(self, phase: Phase, f: F) -> Self
    where
        F: Fn(&mut E, &TransitionContext<'_, E>) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.add(phase, true, callback(f))
    }

    /// Refuse the transition with [`HookError::Protected`] unless inside an
    /// unprotected scope.
    pub fn protected(self) -> Self {
        self.protect(|_, ctx| {
            Err(HookError::Protected {
                attribute: ctx.attribute.to_string(),
                from: ctx.from.clone(),
                to: ctx.to.clone(),
            })
        })
    }
}

/// Targets for a single-phase rule started with
/// [`RuleScope::transition_from`].
pub struct FromTransition<'s, E> {
    scope: &'s mut RuleScope<E>,
    phase: Phase,
    from: Vec<StateId>,
}

impl<'s, E: Stateful + 'static> FromTransition<'s, E> {
    pub fn to<F>(self, states: impl IntoStates, f: F) -> Self
    where
        F: Fn(&mut E, &TransitionContext<'_, E>) -> Result<(), HookError> + Send + Sync + 'static,
    {
        let to = self
            .scope
            .expand(states.into_states(), false, BuildError::MissingToState);
        let hook = Hook::new(self.phase, None, false, callback(f));
        self.scope.register(&self.from, &to, hook);
        self
    }
}
