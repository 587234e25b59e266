//! Transition hooks.
//!
//! Hooks are user closures attached to a phase of the transition pipeline
//! and a concrete `(from, to)` pair of one attribute. They are declared
//! through [`RuleScope`](crate::builder::RuleScope), stored in a
//! [`RuleStore`], and read through a machine's [`Lineage`] so that
//! inherited rules run before the machine's own.
//!
//! # Example
//!
//! ```rust
//! use stateful::hooks::{HookError, Phase};
//!
//! assert!(Phase::AfterSave.is_run_once());
//! let err = HookError::message("reviewer required");
//! assert_eq!(err.to_string(), "reviewer required");
//! ```

mod context;
mod guard;
mod hook;
mod phase;
mod store;

pub use context::TransitionContext;
pub use guard::Guard;
pub use hook::{callback, Callback, Hook, HookError, HookId};
pub use phase::Phase;
pub use store::{Lineage, RuleStore};
