//! The host-entity boundary.
//!
//! The engine never owns state values. Storage, error collection and
//! persistence belong to the host entity, which exposes them through the
//! [`Stateful`] trait.

use crate::core::{StateId, TrackingRecord};
use crate::ledger::TransitionLedger;
use thiserror::Error;

/// Failure reported by a host's strict persistence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistError {
    #[error("the record was rejected by validation")]
    Rejected,

    #[error("persistence failed: {0}")]
    Failed(String),
}

/// A host entity carrying one or more state attributes.
///
/// Only raw storage, the ledger and error collection are required; every
/// other capability has a default that treats it as absent.
///
/// # Example
///
/// ```rust
/// use stateful::core::StateId;
/// use stateful::host::Stateful;
/// use stateful::ledger::TransitionLedger;
///
/// #[derive(Default)]
/// struct Kata {
///     state: Option<StateId>,
///     errors: Vec<(String, String)>,
///     ledger: TransitionLedger,
/// }
///
/// impl Stateful for Kata {
///     fn read_state(&self, _attribute: &str) -> Option<StateId> {
///         self.state.clone()
///     }
///
///     fn write_state(&mut self, _attribute: &str, value: StateId) {
///         self.state = Some(value);
///     }
///
///     fn ledger(&self) -> &TransitionLedger {
///         &self.ledger
///     }
///
///     fn add_error(&mut self, attribute: &str, message: String) {
///         self.errors.push((attribute.to_string(), message));
///     }
/// }
///
/// let mut kata = Kata::default();
/// kata.write_state("state", StateId::from("draft"));
/// assert!(kata.persist());
/// ```
pub trait Stateful: Sized {
    /// The raw stored value, `None` when never set.
    fn read_state(&self, attribute: &str) -> Option<StateId>;

    fn write_state(&mut self, attribute: &str, value: StateId);

    fn ledger(&self) -> &TransitionLedger;

    /// Append a validation error keyed by attribute.
    fn add_error(&mut self, attribute: &str, message: String);

    /// The `(previous, current)` pair when the host tracks unsaved changes.
    fn changed_state(&self, _attribute: &str) -> Option<(Option<StateId>, StateId)> {
        None
    }

    /// Identity of the acting user, recorded with tracked transitions.
    fn current_actor(&self) -> Option<String> {
        None
    }

    /// Store the record for entering tracked node `state`.
    fn record_tracking(&mut self, _attribute: &str, _state: &StateId, _record: TrackingRecord) {}

    /// Lenient persistence: `false` when the host rejected the change.
    fn persist(&mut self) -> bool {
        true
    }

    /// Strict persistence. Defaults to [`Stateful::persist`].
    fn persist_strict(&mut self) -> Result<(), PersistError> {
        if self.persist() {
            Ok(())
        } else {
            Err(PersistError::Rejected)
        }
    }

    /// Run `f` with protected hooks disabled. The scope ends on every exit
    /// path, panics included.
    fn unprotected<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let _scope = self.ledger().unprotected();
        f(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Record;

    #[test]
    fn persist_strict_follows_persist() {
        let mut record = Record::default();
        assert_eq!(record.persist_strict(), Ok(()));

        record.reject_saves = true;
        assert_eq!(record.persist_strict(), Err(PersistError::Rejected));
    }

    #[test]
    fn unprotected_helper_scopes_the_closure() {
        let mut record = Record::default();
        let inside = record.unprotected(|r| r.ledger().is_unprotected());
        assert!(inside);
        assert!(!record.ledger().is_unprotected());
    }
}
