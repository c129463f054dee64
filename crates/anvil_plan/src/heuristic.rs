//! Pruning heuristics evaluated before every task expansion.
//!
//! A heuristic that returns a [`PruneReason`] makes the planner abandon the
//! branch exactly as if an operator had been rejected.

use crate::agenda::Agenda;
use crate::compiler::Domain;
use anvil_core::{State, Task};

/// Everything a heuristic may inspect at a search node
#[derive(Debug, Clone, Copy)]
pub struct SearchNode<'a> {
    /// Compiled domain
    pub domain: &'a Domain,
    /// State at this node
    pub state: &'a State,
    /// Task about to be expanded
    pub task: &'a Task,
    /// Pending tasks, `task` first
    pub agenda: &'a Agenda,
    /// Method expansions on the path to this node
    pub depth: usize,
}

/// Predicate that can veto a branch
pub trait Heuristic: Send + Sync {
    /// Name used in traces
    fn name(&self) -> &'static str;

    /// Return a reason to prune, or `None` to continue
    fn check(&self, node: &SearchNode<'_>) -> Option<PruneReason>;
}

/// Why a branch was abandoned
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PruneReason {
    /// Producing the resource requires producing it again
    #[error("Cycle: {resource} is needed to produce itself")]
    Cycle {
        /// Resource name
        resource: String,
    },

    /// Too many method expansions on this path
    #[error("Depth {depth} exceeds limit {limit}")]
    DepthExceeded {
        /// Current depth
        depth: usize,
        /// Configured ceiling
        limit: usize,
    },

    /// Durable tool already made
    #[error("Tool {tool} is already built")]
    ToolBuilt {
        /// Tool name
        tool: String,
    },

    /// Durable tool already being made on this branch
    #[error("Tool {tool} is already under construction")]
    ToolPending {
        /// Tool name
        tool: String,
    },

    /// Rejected by a caller-supplied heuristic
    #[error("{heuristic}: {message}")]
    Custom {
        /// Heuristic name
        heuristic: String,
        /// Explanation
        message: String,
    },
}

/// Prunes `have_enough(R)` when the agenda already holds a pending
/// "produce R, then re-check R" pair for a non-tool resource R
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleDetection;

impl CycleDetection {
    /// Non-tool resources whose production is pending further down the agenda
    fn pending_products<'a>(node: &SearchNode<'a>) -> Vec<&'a str> {
        let rest: Vec<&Task> = node.agenda.rest().collect();
        rest.windows(2)
            .filter_map(|pair| match (pair[0], pair[1]) {
                (Task::Operator { recipe, .. }, Task::HaveEnough { resource, .. }) => {
                    let operator = node.domain.operator(recipe)?;
                    (operator.produces(resource) && !node.domain.is_tool(resource))
                        .then_some(resource.as_str())
                }
                _ => None,
            })
            .collect()
    }
}

impl Heuristic for CycleDetection {
    fn name(&self) -> &'static str {
        "cycle"
    }

    fn check(&self, node: &SearchNode<'_>) -> Option<PruneReason> {
        let Task::HaveEnough { resource, .. } = node.task else {
            return None;
        };
        Self::pending_products(node)
            .contains(&resource.as_str())
            .then(|| PruneReason::Cycle {
                resource: resource.clone(),
            })
    }
}

/// Prunes any node deeper than a fixed number of method expansions
#[derive(Debug, Clone, Copy)]
pub struct DepthBound {
    /// Deepest allowed node
    pub limit: usize,
}

impl DepthBound {
    /// Create a depth bound
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }
}

impl Heuristic for DepthBound {
    fn name(&self) -> &'static str {
        "depth"
    }

    fn check(&self, node: &SearchNode<'_>) -> Option<PruneReason> {
        (node.depth > self.limit).then_some(PruneReason::DepthExceeded {
            depth: node.depth,
            limit: self.limit,
        })
    }
}

/// Prunes `produce(tool)` for a durable tool that is built or whose
/// operator is already pending
#[derive(Debug, Clone, Copy, Default)]
pub struct RedundantTool;

impl Heuristic for RedundantTool {
    fn name(&self) -> &'static str {
        "redundant-tool"
    }

    fn check(&self, node: &SearchNode<'_>) -> Option<PruneReason> {
        let Task::Produce { resource, .. } = node.task else {
            return None;
        };
        if !node.domain.is_tool(resource) {
            return None;
        }
        if node.state.is_built(resource) {
            return Some(PruneReason::ToolBuilt {
                tool: resource.clone(),
            });
        }
        let pending = node.agenda.rest().any(|task| match task {
            Task::Operator { recipe, .. } => node
                .domain
                .operator(recipe)
                .is_some_and(|op| op.builds.iter().any(|t| t == resource)),
            _ => false,
        });
        pending.then(|| PruneReason::ToolPending {
            tool: resource.clone(),
        })
    }
}

/// Ordered collection of heuristics; the first veto wins
pub struct HeuristicSet {
    heuristics: Vec<Box<dyn Heuristic>>,
}

impl HeuristicSet {
    /// Create an empty set
    #[must_use]
    pub fn empty() -> Self {
        Self {
            heuristics: Vec::new(),
        }
    }

    /// Cycle detection, depth bound, and redundant-tool avoidance
    #[must_use]
    pub fn standard(max_depth: usize) -> Self {
        Self::empty()
            .with(Box::new(CycleDetection))
            .with(Box::new(DepthBound::new(max_depth)))
            .with(Box::new(RedundantTool))
    }

    /// Append a heuristic
    #[must_use]
    pub fn with(mut self, heuristic: Box<dyn Heuristic>) -> Self {
        self.heuristics.push(heuristic);
        self
    }

    /// Append a heuristic in place
    pub fn push(&mut self, heuristic: Box<dyn Heuristic>) {
        self.heuristics.push(heuristic);
    }

    /// Run every heuristic in order
    #[must_use]
    pub fn check(&self, node: &SearchNode<'_>) -> Option<(&'static str, PruneReason)> {
        self.heuristics
            .iter()
            .find_map(|h| h.check(node).map(|reason| (h.name(), reason)))
    }

    /// Names of the installed heuristics
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.heuristics.iter().map(|h| h.name()).collect()
    }

    /// Number of installed heuristics
    #[must_use]
    pub fn len(&self) -> usize {
        self.heuristics.len()
    }

    /// Check if no heuristics are installed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heuristics.is_empty()
    }
}

impl Default for HeuristicSet {
    fn default() -> Self {
        Self::standard(crate::config::DEFAULT_MAX_DEPTH)
    }
}
