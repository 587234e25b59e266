//! Hook handles and the errors hooks may raise.

use super::context::TransitionContext;
use super::phase::Phase;
use crate::core::StateId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by hooks. They propagate unchanged to the caller of the
/// transition; the already written state value is not rolled back.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("transition from {from} to {to} is protected for {attribute}")]
    Protected {
        attribute: String,
        from: StateId,
        to: StateId,
    },

    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl HookError {
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    pub fn other<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Other(Box::new(error))
    }
}

/// Signature shared by every hook body.
pub type Callback<E> =
    Arc<dyn Fn(&mut E, &TransitionContext<'_, E>) -> Result<(), HookError> + Send + Sync>;

/// Wrap a closure as a [`Callback`], fixing its higher-ranked signature.
pub fn callback<E, F>(f: F) -> Callback<E>
where
    F: Fn(&mut E, &TransitionContext<'_, E>) -> Result<(), HookError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Stable identity of a registered hook, used as the run-once key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HookId(Uuid);

impl HookId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for HookId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered hook: the user closure plus its scheduling metadata.
///
/// One handle is shared by every `(from, to)` pair it was declared for.
pub struct Hook<E> {
    id: HookId,
    phase: Phase,
    event: Option<String>,
    protected: bool,
    callback: Callback<E>,
}

impl<E> Hook<E> {
    pub(crate) fn new(
        phase: Phase,
        event: Option<String>,
        protected: bool,
        callback: Callback<E>,
    ) -> Self {
        Self {
            id: HookId::new(),
            phase,
            event,
            protected,
            callback,
        }
    }

    pub fn id(&self) -> HookId {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The event this hook is limited to, if any.
    pub fn event(&self) -> Option<&str> {
        self.event.as_deref()
    }

    pub fn is_run_once(&self) -> bool {
        self.phase.is_run_once()
    }

    /// Protected hooks are skipped inside an unprotected scope.
    pub fn is_protected(&self) -> bool {
        self.protected
    }

    /// Unscoped hooks apply to every transition; scoped hooks only to
    /// transitions fired under their event.
    pub fn applies_to(&self, event: Option<&str>) -> bool {
        match self.event.as_deref() {
            None => true,
            Some(scope) => event == Some(scope),
        }
    }

    pub(crate) fn call(&self, entity: &mut E, ctx: &TransitionContext<'_, E>) -> Result<(), HookError> {
        (self.callback)(entity, ctx)
    }
}

impl<E> fmt::Debug for Hook<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("id", &self.id)
            .field("phase", &self.phase)
            .field("event", &self.event)
            .field("protected", &self.protected)
            .finish_non_exhaustive()
    }
}
