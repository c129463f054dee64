//! ANVIL Core Types
//!
//! This crate contains pure types with no search logic: the per-agent
//! crafting state, the task vocabulary, and the declarative rule data.
//! All types are serializable.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod rules;
pub mod state;
pub mod task;

// Re-exports
pub use error::{CoreError, CoreResult};
pub use rules::{Recipe, RuleSet};
pub use state::{State, StateError};
pub use task::{operator_name, Task};

/// Agent identifier used when the caller does not name one
pub const DEFAULT_AGENT: &str = "agent";
