//! Errors raised while changing state.

use crate::core::StateId;
use crate::hooks::HookError;
use crate::host::PersistError;
use thiserror::Error;

/// Failures of strict transitions and event routing.
///
/// Lenient calls report illegal transitions and rejected saves through
/// their return value; only hook errors reach them as `Err`.
#[derive(Debug, Error)]
pub enum StateChangeError {
    #[error("transition from {from} to {to} not allowed for {attribute}")]
    Disallowed {
        attribute: String,
        from: StateId,
        to: StateId,
    },

    #[error("transition_to for {attribute} can only be called while a {attribute} event is being fired")]
    NoActiveEvent { attribute: String },

    #[error("unknown state attribute '{0}'")]
    UnknownAttribute(String),

    #[error("unknown event '{event}' for {attribute}")]
    UnknownEvent { attribute: String, event: String },

    #[error(transparent)]
    Hook(#[from] HookError),

    #[error("could not persist {attribute}: {source}")]
    Persist {
        attribute: String,
        #[source]
        source: PersistError,
    },
}
