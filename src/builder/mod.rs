//! Builder API for ergonomic machine construction.
//!
//! This module provides the fluent machine builder, the rule DSL and the
//! `states!` macro, together with the errors reported while building.

pub mod error;
pub mod machine;
pub mod macros;
pub mod rules;

pub use error::{BuildError, TreeViolation};
pub use machine::MachineBuilder;
pub use rules::{FromTransition, RuleScope, WhenTransition};

use crate::config::AttributeConfig;
use crate::host::Stateful;
use crate::machine::Machine;

/// Build a single-attribute machine without rules.
///
/// # Example
///
/// ```
/// use stateful::builder::simple_machine;
/// use stateful::config::AttributeConfig;
/// use stateful::states;
/// # use stateful::core::StateId;
/// # use stateful::host::Stateful;
/// # use stateful::ledger::TransitionLedger;
/// # #[derive(Default)]
/// # struct Door { state: Option<StateId>, ledger: TransitionLedger }
/// # impl Stateful for Door {
/// #     fn read_state(&self, _: &str) -> Option<StateId> { self.state.clone() }
/// #     fn write_state(&mut self, _: &str, value: StateId) { self.state = Some(value); }
/// #     fn ledger(&self) -> &TransitionLedger { &self.ledger }
/// #     fn add_error(&mut self, _: &str, _: String) {}
/// # }
///
/// let machine = simple_machine::<Door>(
///     "Door",
///     AttributeConfig::new("state", states! { open => closed, closed => open }),
/// )
/// .unwrap();
///
/// let mut door = Door::default();
/// let state = machine.attribute("state").unwrap();
/// assert!(state.change_state(&mut door, "open").unwrap());
/// assert!(state.change_state(&mut door, "closed").unwrap());
/// ```
pub fn simple_machine<E>(name: &str, config: AttributeConfig) -> Result<Machine<E>, BuildError>
where
    E: Stateful + 'static,
{
    MachineBuilder::new(name).attribute(config)?.build()
}
