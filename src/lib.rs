//! Stateful: a hierarchical state machine engine
//!
//! Stateful governs the legal values of named state attributes on a host
//! entity. States are declared as a nested map: leaves are the values an
//! attribute can hold, groups collect leaves for transition declarations
//! and "is-a" queries. Transitions are checked against the compiled tree
//! and run an ordered pipeline of hooks around the change.
//!
//! # Core Concepts
//!
//! - **State tree**: Leaves, groups and wildcard transitions, resolved once
//! - **Rules**: Hooks keyed by attribute, phase and `(from, to)` pair,
//!   inherited from parent machines without being clobbered
//! - **Pipeline**: Validation, commit, persistence and after-commit phases
//!   with protected and run-once hooks
//! - **Host**: The entity owns storage and persistence through [`Stateful`]
//!
//! # Example
//!
//! ```rust
//! use stateful::config::AttributeConfig;
//! use stateful::core::StateId;
//! use stateful::host::Stateful;
//! use stateful::ledger::TransitionLedger;
//! use stateful::{states, Machine};
//!
//! #[derive(Default)]
//! struct Kata {
//!     state: Option<StateId>,
//!     ledger: TransitionLedger,
//! }
//!
//! impl Stateful for Kata {
//!     fn read_state(&self, _attribute: &str) -> Option<StateId> {
//!         self.state.clone()
//!     }
//!
//!     fn write_state(&mut self, _attribute: &str, value: StateId) {
//!         self.state = Some(value);
//!     }
//!
//!     fn ledger(&self) -> &TransitionLedger {
//!         &self.ledger
//!     }
//!
//!     fn add_error(&mut self, _attribute: &str, _message: String) {}
//! }
//!
//! let machine = Machine::<Kata>::builder("Kata")
//!     .attribute(
//!         AttributeConfig::new(
//!             "state",
//!             states! {
//!                 draft => beta,
//!                 beta => { needs_testing => needs_approval, needs_approval => approved },
//!                 approved => retired,
//!                 retired => none,
//!             },
//!         )
//!         .default_state("draft"),
//!     )
//!     .unwrap()
//!     .build()
//!     .unwrap();
//!
//! let mut kata = Kata::default();
//! let state = machine.attribute("state").unwrap();
//! assert!(state.change_state(&mut kata, "needs_testing").unwrap());
//! assert!(state.is(&kata, "beta"));
//! assert!(!state.change_state(&mut kata, "retired").unwrap());
//! ```

pub mod builder;
pub mod config;
pub mod core;
pub mod hooks;
pub mod host;
pub mod ledger;
pub mod machine;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use builder::{BuildError, MachineBuilder};
pub use core::{StateId, StateTree};
pub use host::Stateful;
pub use machine::{AttributeController, ChangeOptions, Machine, StateChangeError};
