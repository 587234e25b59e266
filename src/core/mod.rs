//! Core state definitions.
//!
//! This module contains the immutable part of the engine:
//! - State identifiers and the reserved names
//! - State nodes and the compiled state tree
//! - Tracking records produced when entering tracked states
//!
//! Nothing in here performs side effects; trees are built once and can be
//! shared freely.

mod node;
mod state;
mod tracking;
mod tree;

pub use node::StateNode;
pub use state::{IntoStates, StateId, NONE, RESERVED, WILDCARD};
pub use tracking::TrackingRecord;
pub use tree::StateTree;
