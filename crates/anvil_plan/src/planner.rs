//! Depth-first backtracking decomposition planner.
//!
//! The search works on `(state, agenda, plan, depth)`:
//!
//! - an empty agenda is success;
//! - the front task is first shown to every pruning heuristic;
//! - an operator task is applied in place and the loop continues;
//! - a compound task becomes a choice point and is replaced by the subtasks
//!   of the first method that accepts it, one level deeper. When that branch
//!   fails the next method is tried.
//!
//! Choice points are kept on an explicit stack. Each method trial gets its
//! own clone of the state, so a failed branch can never leak mutations into
//! its siblings. The plan is a shared vector truncated back to its length at
//! the choice point on backtrack.

use crate::agenda::Agenda;
use crate::compiler::Domain;
use crate::config::PlannerConfig;
use crate::heuristic::{Heuristic, HeuristicSet, PruneReason, SearchNode};
use crate::operator::OperatorRejected;
use anvil_core::{operator_name, State, Task};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Nodes between wall-clock checks
const CLOCK_INTERVAL: u64 = 256;

/// One applied operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Agent that acted
    pub agent: String,
    /// Recipe name as written in the rule data
    pub recipe: String,
    /// Operator name
    pub operator: String,
    /// Time cost of the step
    pub time: u64,
    /// Time left after the step
    pub time_remaining: u64,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.operator, self.agent)
    }
}

/// A successful search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Operators in application order
    pub steps: Vec<Step>,
    /// State after the last step
    pub final_state: State,
    /// Search counters
    pub stats: SearchStats,
}

impl Plan {
    /// Number of steps
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if the goal held without acting
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Sum of step time costs
    #[must_use]
    pub fn total_time(&self) -> u64 {
        self.steps.iter().map(|s| s.time).sum()
    }

    /// Recipe names in order
    #[must_use]
    pub fn recipes(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.recipe.as_str()).collect()
    }
}

/// Search counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Task nodes visited
    pub nodes: u64,
    /// Method expansions
    pub expansions: u64,
    /// Operators applied, including ones later undone
    pub operators_applied: u64,
    /// Operators rejected
    pub rejected: u64,
    /// Methods that declined a task
    pub inapplicable: u64,
    /// Branches pruned by heuristics
    pub pruned: u64,
    /// Failed method trials
    pub backtracks: u64,
    /// Deepest node visited
    pub deepest: usize,
}

/// Why planning stopped without a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum FailureReason {
    /// Every branch failed or was pruned
    #[error("search space exhausted")]
    Exhausted,

    /// Node budget spent
    #[error("node limit {limit} reached")]
    NodeLimit {
        /// Configured budget
        limit: u64,
    },

    /// Wall-clock budget spent
    #[error("timed out after {elapsed_ms} ms")]
    Timeout {
        /// Time spent searching
        elapsed_ms: u64,
    },
}

/// No plan exists under the given budget and bounds
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("No plan found: {reason}")]
pub struct PlanningFailure {
    /// Why the search stopped
    pub reason: FailureReason,
    /// Search counters
    pub stats: SearchStats,
}

/// HTN planner over a compiled domain
pub struct Planner<'d> {
    domain: &'d Domain,
    config: PlannerConfig,
    extra: HeuristicSet,
}

impl<'d> Planner<'d> {
    /// Create a planner with the default configuration
    #[must_use]
    pub fn new(domain: &'d Domain) -> Self {
        Self {
            domain,
            config: PlannerConfig::default(),
            extra: HeuristicSet::empty(),
        }
    }

    /// Replace the configuration
    #[must_use]
    pub fn with_config(mut self, config: PlannerConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a heuristic that runs after the built-in ones
    #[must_use]
    pub fn with_heuristic(mut self, heuristic: Box<dyn Heuristic>) -> Self {
        self.extra.push(heuristic);
        self
    }

    /// Search for a plan that accomplishes `goals` from `state`
    ///
    /// # Errors
    ///
    /// Returns [`PlanningFailure`] when every branch fails within the
    /// bounds, or a node/time budget runs out
    pub fn plan(&self, state: &State, goals: &[Task]) -> Result<Plan, PlanningFailure> {
        let mut search = Search {
            domain: self.domain,
            config: &self.config,
            standard: HeuristicSet::standard(self.config.max_depth),
            extra: &self.extra,
            stats: SearchStats::default(),
            started: Instant::now(),
        };

        tracing::info!(
            goals = goals.len(),
            time = state.time_remaining(),
            max_depth = self.config.max_depth,
            heuristics = ?search.standard.names(),
            extra = ?search.extra.names(),
            "planning"
        );

        let mut steps = Vec::new();
        let outcome = search.seek(state.clone(), Agenda::new(goals.to_vec()), &mut steps);
        let stats = search.stats;

        match outcome {
            Ok(final_state) => {
                tracing::info!(
                    steps = steps.len(),
                    nodes = stats.nodes,
                    backtracks = stats.backtracks,
                    time_remaining = final_state.time_remaining(),
                    "plan found"
                );
                Ok(Plan {
                    steps,
                    final_state,
                    stats,
                })
            }
            Err(abort) => {
                let reason = match abort {
                    Abort::Backtrack => FailureReason::Exhausted,
                    Abort::Stop(reason) => reason,
                };
                tracing::info!(%reason, nodes = stats.nodes, "no plan");
                Err(PlanningFailure { reason, stats })
            }
        }
    }
}

/// Branch outcome other than success
enum Abort {
    /// This branch failed; try the next alternative
    Backtrack,
    /// A budget ran out; unwind everything
    Stop(FailureReason),
}

impl From<PruneReason> for Abort {
    fn from(_: PruneReason) -> Self {
        Self::Backtrack
    }
}

impl From<OperatorRejected> for Abort {
    fn from(_: OperatorRejected) -> Self {
        Self::Backtrack
    }
}

/// A partial plan still being extended
struct Branch {
    state: State,
    agenda: Agenda,
    depth: usize,
}

/// A compound task with methods left to try
struct ChoicePoint {
    task: Task,
    /// State and agenda with `task` removed
    state: State,
    agenda: Agenda,
    next_method: usize,
    /// Plan length when the task was reached
    mark: usize,
    depth: usize,
    /// A branch from this point is being explored
    open: bool,
}

enum Advance {
    Done(State),
    Choice(ChoicePoint),
}

struct Search<'a> {
    domain: &'a Domain,
    config: &'a PlannerConfig,
    standard: HeuristicSet,
    extra: &'a HeuristicSet,
    stats: SearchStats,
    started: Instant,
}

impl Search<'_> {
    /// Run the search from the root branch
    ///
    /// Choice points live on a heap stack, so the length of a plan never
    /// bounds the native stack.
    fn seek(&mut self, state: State, agenda: Agenda, steps: &mut Vec<Step>) -> Result<State, Abort> {
        let mut choices: Vec<ChoicePoint> = Vec::new();
        let mut branch = Some(Branch {
            state,
            agenda,
            depth: 0,
        });

        loop {
            if let Some(current) = branch.take() {
                match self.advance(current, steps) {
                    Ok(Advance::Done(state)) => return Ok(state),
                    Ok(Advance::Choice(point)) => choices.push(point),
                    Err(Abort::Backtrack) => {}
                    Err(stop) => return Err(stop),
                }
            }

            let Some(point) = choices.last_mut() else {
                return Err(Abort::Backtrack);
            };
            match self.next_branch(point, steps) {
                Some(next) => branch = Some(next),
                None => {
                    choices.pop();
                }
            }
        }
    }

    /// Work through a branch until it finishes, fails, or reaches a
    /// compound task
    fn advance(&mut self, branch: Branch, steps: &mut Vec<Step>) -> Result<Advance, Abort> {
        let Branch {
            mut state,
            mut agenda,
            depth,
        } = branch;
        let domain = self.domain;

        loop {
            let task = match agenda.front() {
                Some(task) => task.clone(),
                None => return Ok(Advance::Done(state)),
            };
            self.visit(depth)?;

            let node = SearchNode {
                domain,
                state: &state,
                task: &task,
                agenda: &agenda,
                depth,
            };
            if let Some((heuristic, reason)) = self.prune(&node) {
                self.stats.pruned += 1;
                tracing::debug!(depth, %task, heuristic, %reason, "pruned");
                return Err(reason.into());
            }

            agenda.pop_front();
            if let Task::Operator { agent, recipe } = &task {
                let step = self.apply(&mut state, agent, recipe)?;
                tracing::trace!(depth, %step, time_remaining = step.time_remaining, "applied");
                steps.push(step);
                continue;
            }

            return Ok(Advance::Choice(ChoicePoint {
                task,
                state,
                agenda,
                next_method: 0,
                mark: steps.len(),
                depth,
                open: false,
            }));
        }
    }

    /// Undo the previous alternative at `point`, if any, and expand the next
    /// method that accepts its task
    fn next_branch(&mut self, point: &mut ChoicePoint, steps: &mut Vec<Step>) -> Option<Branch> {
        let domain = self.domain;
        if point.open {
            steps.truncate(point.mark);
            point.open = false;
            self.stats.backtracks += 1;
            tracing::debug!(depth = point.depth, task = %point.task, "backtracking");
        }

        let methods = domain.methods_for(&point.task);
        while let Some(method) = methods.get(point.next_method) {
            point.next_method += 1;
            match method.decompose(&point.task, &point.state, domain, self.config.fast_fail) {
                Ok(subtasks) => {
                    self.stats.expansions += 1;
                    tracing::debug!(
                        depth = point.depth,
                        task = %point.task,
                        method = method.name(),
                        subtasks = subtasks.len(),
                        "expanding"
                    );
                    point.open = true;
                    return Some(Branch {
                        state: point.state.clone(),
                        agenda: point.agenda.with_front(subtasks),
                        depth: point.depth + 1,
                    });
                }
                Err(why) => {
                    self.stats.inapplicable += 1;
                    tracing::trace!(
                        depth = point.depth,
                        task = %point.task,
                        method = method.name(),
                        %why,
                        "inapplicable"
                    );
                }
            }
        }
        None
    }

    /// Count a node and enforce the node and time budgets
    fn visit(&mut self, depth: usize) -> Result<(), Abort> {
        self.stats.nodes += 1;
        self.stats.deepest = self.stats.deepest.max(depth);

        if let Some(limit) = self.config.node_limit {
            if self.stats.nodes > limit {
                return Err(Abort::Stop(FailureReason::NodeLimit { limit }));
            }
        }
        if let Some(timeout) = self.config.timeout {
            if self.stats.nodes % CLOCK_INTERVAL == 0 && self.started.elapsed() > timeout {
                let elapsed_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
                return Err(Abort::Stop(FailureReason::Timeout { elapsed_ms }));
            }
        }
        Ok(())
    }

    fn prune(&self, node: &SearchNode<'_>) -> Option<(&'static str, PruneReason)> {
        self.standard.check(node).or_else(|| self.extra.check(node))
    }

    /// Apply an operator task, counting rejections
    fn apply(&mut self, state: &mut State, agent: &str, recipe: &str) -> Result<Step, Abort> {
        let result = self.try_apply(state, agent, recipe);
        match result {
            Ok(step) => {
                self.stats.operators_applied += 1;
                Ok(step)
            }
            Err(rejected) => {
                self.stats.rejected += 1;
                tracing::trace!(operator = %operator_name(recipe), %rejected, "rejected");
                Err(rejected.into())
            }
        }
    }

    fn try_apply(&self, state: &mut State, agent: &str, recipe: &str) -> Result<Step, OperatorRejected> {
        if agent != state.agent() {
            return Err(OperatorRejected::ForeignAgent {
                task: agent.to_string(),
                state: state.agent().to_string(),
            });
        }
        let operator = self
            .domain
            .operator(recipe)
            .ok_or_else(|| OperatorRejected::UnknownOperator {
                recipe: recipe.to_string(),
            })?;
        operator.apply(state)?;
        Ok(Step {
            agent: agent.to_string(),
            recipe: recipe.to_string(),
            operator: operator.name.clone(),
            time: operator.time,
            time_remaining: state.time_remaining(),
        })
    }
}
