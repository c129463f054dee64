//! Decomposition methods.
//!
//! `have_enough` tasks always get the two built-in methods, check first.
//! `produce` tasks get one [`RecipeMethod`] per recipe that yields the
//! resource.

use crate::compiler::Domain;
use anvil_core::{State, Task};

/// A way to decompose a compound task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// Succeed with no subtasks if enough is already held
    CheckEnough,
    /// Produce once more, then re-check
    ProduceEnough,
    /// Satisfy a recipe's requirements, then apply its operator
    Recipe(RecipeMethod),
}

impl Method {
    /// Name used in traces and listings
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::CheckEnough => "check_enough",
            Self::ProduceEnough => "produce_enough",
            Self::Recipe(m) => &m.name,
        }
    }

    /// Compute the subtasks that replace `task`
    ///
    /// # Errors
    ///
    /// Returns [`MethodInapplicable`] if this method cannot be used here;
    /// the planner then tries the next one
    pub fn decompose(
        &self,
        task: &Task,
        state: &State,
        domain: &Domain,
        fast_fail: bool,
    ) -> Result<Vec<Task>, MethodInapplicable> {
        match (self, task) {
            (
                Self::CheckEnough,
                Task::HaveEnough {
                    resource, count, ..
                },
            ) => {
                let have = state.quantity(resource);
                if have >= *count {
                    Ok(Vec::new())
                } else {
                    Err(MethodInapplicable::NotEnough {
                        resource: resource.clone(),
                        have,
                        need: *count,
                    })
                }
            }
            (Self::ProduceEnough, Task::HaveEnough { agent, resource, count }) => Ok(vec![
                Task::produce(agent.as_str(), resource.as_str()),
                Task::have_enough(agent.as_str(), resource.as_str(), *count),
            ]),
            (Self::Recipe(method), Task::Produce { agent, .. }) => {
                if fast_fail {
                    method.fast_fail(state, domain)?;
                }
                Ok(method.subtasks(agent))
            }
            _ => Err(MethodInapplicable::WrongTask {
                method: self.name().to_string(),
                task: task.to_string(),
            }),
        }
    }
}

/// Recipe-backed method for a `produce` task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeMethod {
    /// Method name (recipe name with spaces replaced)
    pub name: String,
    /// Recipe the method invokes
    pub recipe: String,
    /// `Requires` then `Consumes`, one `have_enough` each
    pub requirements: Vec<(String, u64)>,
    /// Consumed quantities, for fast-fail
    pub consumes: Vec<(String, u64)>,
    /// Recipe time cost
    pub time: u64,
}

impl RecipeMethod {
    /// Subtasks: requirement checks followed by the operator
    #[must_use]
    pub fn subtasks(&self, agent: &str) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .requirements
            .iter()
            .map(|(resource, count)| Task::have_enough(agent, resource.as_str(), *count))
            .collect();
        tasks.push(Task::operator(agent, self.recipe.as_str()));
        tasks
    }

    /// Refuse when the recipe can never run from this state
    ///
    /// Time never increases and unproducible resources never appear, so
    /// either shortfall is permanent.
    fn fast_fail(&self, state: &State, domain: &Domain) -> Result<(), MethodInapplicable> {
        if !state.can_afford(self.time) {
            return Err(MethodInapplicable::OutOfTime {
                recipe: self.recipe.clone(),
                cost: self.time,
                remaining: state.time_remaining(),
            });
        }
        for (resource, need) in &self.consumes {
            if state.quantity(resource) < *need && !domain.is_producible(resource) {
                return Err(MethodInapplicable::Unobtainable {
                    recipe: self.recipe.clone(),
                    resource: resource.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Reason a method declined a task
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MethodInapplicable {
    /// `check_enough` on a short resource
    #[error("Holding {have} {resource}, need {need}")]
    NotEnough {
        /// Resource name
        resource: String,
        /// Quantity held
        have: u64,
        /// Quantity needed
        need: u64,
    },

    /// Recipe costs more time than is left
    #[error("Recipe '{recipe}' costs {cost}, {remaining} remaining")]
    OutOfTime {
        /// Recipe name
        recipe: String,
        /// Time cost
        cost: u64,
        /// Time left
        remaining: u64,
    },

    /// Recipe consumes a short resource nothing can produce
    #[error("Recipe '{recipe}' consumes unobtainable {resource}")]
    Unobtainable {
        /// Recipe name
        recipe: String,
        /// Resource name
        resource: String,
    },

    /// Method does not decompose this kind of task
    #[error("Method {method} does not apply to {task}")]
    WrongTask {
        /// Method name
        method: String,
        /// Task display
        task: String,
    },
}
