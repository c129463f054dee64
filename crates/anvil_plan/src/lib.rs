//! ANVIL Planner
//!
//! Compiles declarative crafting recipes into HTN methods and operators,
//! then searches for an operator sequence that reaches a goal within a
//! time budget.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod agenda;
pub mod compiler;
pub mod config;
pub mod heuristic;
pub mod method;
pub mod operator;
pub mod planner;
pub mod validate;

pub use agenda::Agenda;
pub use compiler::{Compiler, CompilerOutput, CompilerWarning, Domain};
pub use config::{MethodOrder, PlannerConfig};
pub use heuristic::{CycleDetection, DepthBound, Heuristic, HeuristicSet, PruneReason, RedundantTool, SearchNode};
pub use method::{Method, MethodInapplicable, RecipeMethod};
pub use operator::{Operator, OperatorRejected};
pub use planner::{FailureReason, Plan, Planner, PlanningFailure, SearchStats, Step};
pub use validate::{DomainError, Validator};

use anvil_core::{State, Task};

/// Plan with the default configuration
///
/// # Errors
///
/// Returns [`PlanningFailure`] if no plan exists under the depth bound
pub fn plan(domain: &Domain, state: &State, goals: &[Task]) -> Result<Plan, PlanningFailure> {
    Planner::new(domain).plan(state, goals)
}
