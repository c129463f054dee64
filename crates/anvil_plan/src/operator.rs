//! Primitive operators compiled from recipes.

use anvil_core::{operator_name, Recipe, State, StateError};
use indexmap::IndexMap;

/// Atomic state transition for one recipe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator {
    /// Normalised operator name (`op_craft_plank`)
    pub name: String,
    /// Recipe name as written in the rule data
    pub recipe: String,
    /// Quantities added
    pub produces: IndexMap<String, u64>,
    /// Quantities removed
    pub consumes: IndexMap<String, u64>,
    /// Quantities that must be held
    pub requires: IndexMap<String, u64>,
    /// Time cost
    pub time: u64,
    /// Produced resources that are durable tools
    pub builds: Vec<String>,
}

impl Operator {
    /// Compile an operator from a recipe
    #[must_use]
    pub fn compile(name: &str, recipe: &Recipe, is_tool: impl Fn(&str) -> bool) -> Self {
        Self {
            name: operator_name(name),
            recipe: name.to_string(),
            produces: recipe.produces.clone(),
            consumes: recipe.consumes.clone(),
            requires: recipe.requires.clone(),
            time: recipe.time,
            builds: recipe
                .produces
                .keys()
                .filter(|r| is_tool(r))
                .cloned()
                .collect(),
        }
    }

    /// Check whether the operator would apply, without mutating
    ///
    /// # Errors
    ///
    /// Returns the first failed check: requires, then consumes, then time
    pub fn check(&self, state: &State) -> Result<(), OperatorRejected> {
        for (resource, &need) in &self.requires {
            let have = state.quantity(resource);
            if have < need {
                return Err(OperatorRejected::MissingRequirement {
                    resource: resource.clone(),
                    have,
                    need,
                });
            }
        }
        for (resource, &need) in &self.consumes {
            let have = state.quantity(resource);
            if have < need {
                return Err(OperatorRejected::MissingConsumable {
                    resource: resource.clone(),
                    have,
                    need,
                });
            }
        }
        if !state.can_afford(self.time) {
            return Err(OperatorRejected::InsufficientTime {
                cost: self.time,
                remaining: state.time_remaining(),
            });
        }
        Ok(())
    }

    /// Apply the operator
    ///
    /// All checks run before any mutation, so a rejected operator leaves
    /// the state untouched.
    ///
    /// # Errors
    ///
    /// Returns error if a requirement, consumable, or the time budget is short
    pub fn apply(&self, state: &mut State) -> Result<(), OperatorRejected> {
        self.check(state)?;

        let mut next = state.clone();
        next.consume_time(self.time)?;
        for (resource, &count) in &self.consumes {
            next.apply_delta(resource, -to_delta(resource, count)?)?;
        }
        for (resource, &count) in &self.produces {
            next.apply_delta(resource, to_delta(resource, count)?)?;
        }
        for tool in &self.builds {
            next.mark_built(tool);
        }

        *state = next;
        Ok(())
    }

    /// Check if the operator produces a resource
    #[must_use]
    pub fn produces(&self, resource: &str) -> bool {
        self.produces.contains_key(resource)
    }
}

fn to_delta(resource: &str, count: u64) -> Result<i64, OperatorRejected> {
    i64::try_from(count).map_err(|_| {
        OperatorRejected::State(StateError::Overflow {
            resource: resource.to_string(),
        })
    })
}

/// Runtime operator failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OperatorRejected {
    /// A kept resource is short
    #[error("Requires {need} {resource}, holding {have}")]
    MissingRequirement {
        /// Resource name
        resource: String,
        /// Quantity held
        have: u64,
        /// Quantity needed
        need: u64,
    },

    /// A consumed resource is short
    #[error("Consumes {need} {resource}, holding {have}")]
    MissingConsumable {
        /// Resource name
        resource: String,
        /// Quantity held
        have: u64,
        /// Quantity needed
        need: u64,
    },

    /// Not enough time left
    #[error("Costs {cost} time, {remaining} remaining")]
    InsufficientTime {
        /// Time cost
        cost: u64,
        /// Time left
        remaining: u64,
    },

    /// No operator compiled under this recipe name
    #[error("Unknown operator for recipe '{recipe}'")]
    UnknownOperator {
        /// Recipe name
        recipe: String,
    },

    /// Task addressed to a different agent than the state's owner
    #[error("Task for agent '{task}' applied to state of '{state}'")]
    ForeignAgent {
        /// Agent named by the task
        task: String,
        /// Agent owning the state
        state: String,
    },

    /// State mutation failed
    #[error(transparent)]
    State(#[from] StateError),
}
