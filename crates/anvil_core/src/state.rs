//! Per-agent crafting state.
//!
//! A [`State`] is owned by exactly one search branch. The planner forks it
//! with `clone` before every method trial, so nothing here needs an undo log.

use crate::rules::RuleSet;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Resource quantities, remaining time, and built tools for one agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// Agent that owns this state
    agent: String,
    /// Quantity per resource name (absent means 0)
    quantities: IndexMap<String, u64>,
    /// Time units left in the budget
    time_remaining: u64,
    /// Durable tools produced at least once
    built: IndexSet<String>,
}

impl State {
    /// Create an empty state with a time budget
    #[must_use]
    pub fn new(agent: impl Into<String>, time_budget: u64) -> Self {
        Self {
            agent: agent.into(),
            quantities: IndexMap::new(),
            time_remaining: time_budget,
            built: IndexSet::new(),
        }
    }

    /// Create the initial state described by a rule set
    ///
    /// Every declared item and tool starts at 0, then `Initial` is applied.
    /// Tools present initially count as already built.
    #[must_use]
    pub fn from_rules(rules: &RuleSet, agent: impl Into<String>, time_budget: u64) -> Self {
        let mut state = Self::new(agent, time_budget);
        for name in rules.items.iter().chain(rules.tools.iter()) {
            state.quantities.insert(name.clone(), 0);
        }
        for (name, &count) in &rules.initial {
            state.set_quantity(name, count);
            if count > 0 && rules.is_tool(name) {
                state.mark_built(name);
            }
        }
        state
    }

    /// Set a quantity while building a state
    #[must_use]
    pub fn with_quantity(mut self, resource: impl Into<String>, count: u64) -> Self {
        self.quantities.insert(resource.into(), count);
        self
    }

    /// Agent that owns this state
    #[must_use]
    pub fn agent(&self) -> &str {
        &self.agent
    }

    /// Current quantity of a resource, 0 if never seen
    #[must_use]
    pub fn quantity(&self, resource: &str) -> u64 {
        self.quantities.get(resource).copied().unwrap_or(0)
    }

    /// Overwrite a quantity
    pub fn set_quantity(&mut self, resource: &str, count: u64) {
        match self.quantities.get_mut(resource) {
            Some(slot) => *slot = count,
            None => {
                self.quantities.insert(resource.to_string(), count);
            }
        }
    }

    /// Add a signed delta to a quantity
    ///
    /// # Errors
    ///
    /// Returns error, leaving the state unchanged, if the result would be
    /// negative or overflow
    pub fn apply_delta(&mut self, resource: &str, delta: i64) -> Result<u64, StateError> {
        let have = self.quantity(resource);
        let next = if delta >= 0 {
            have.checked_add(delta.unsigned_abs())
                .ok_or_else(|| StateError::Overflow {
                    resource: resource.to_string(),
                })?
        } else {
            have.checked_sub(delta.unsigned_abs())
                .ok_or_else(|| StateError::Underflow {
                    resource: resource.to_string(),
                    have,
                    delta,
                })?
        };
        self.set_quantity(resource, next);
        Ok(next)
    }

    /// Time units left
    #[must_use]
    pub fn time_remaining(&self) -> u64 {
        self.time_remaining
    }

    /// Check if a cost fits in the remaining time
    #[must_use]
    pub fn can_afford(&self, cost: u64) -> bool {
        cost <= self.time_remaining
    }

    /// Deduct time
    ///
    /// # Errors
    ///
    /// Returns error, leaving the state unchanged, if `cost` exceeds the
    /// remaining time
    pub fn consume_time(&mut self, cost: u64) -> Result<(), StateError> {
        if !self.can_afford(cost) {
            return Err(StateError::InsufficientTime {
                requested: cost,
                remaining: self.time_remaining,
            });
        }
        self.time_remaining -= cost;
        Ok(())
    }

    /// Record that a durable tool has been produced
    pub fn mark_built(&mut self, tool: &str) {
        if !self.built.contains(tool) {
            self.built.insert(tool.to_string());
        }
    }

    /// Check if a durable tool has been produced
    #[must_use]
    pub fn is_built(&self, tool: &str) -> bool {
        self.built.contains(tool)
    }

    /// Tools built so far, in build order
    pub fn built_tools(&self) -> impl Iterator<Item = &str> {
        self.built.iter().map(String::as_str)
    }

    /// All known quantities, in first-seen order
    pub fn quantities(&self) -> impl Iterator<Item = (&str, u64)> {
        self.quantities.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Quantities that are non-zero
    pub fn holdings(&self) -> impl Iterator<Item = (&str, u64)> {
        self.quantities().filter(|(_, v)| *v > 0)
    }
}

/// State mutation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// Quantity would go negative
    #[error("Cannot apply {delta} to {resource}: only {have} held")]
    Underflow {
        /// Resource name
        resource: String,
        /// Quantity held
        have: u64,
        /// Delta that was refused
        delta: i64,
    },

    /// Quantity would overflow
    #[error("Quantity overflow for {resource}")]
    Overflow {
        /// Resource name
        resource: String,
    },

    /// Not enough time left
    #[error("Insufficient time: requested {requested}, remaining {remaining}")]
    InsufficientTime {
        /// Cost that was refused
        requested: u64,
        /// Time left
        remaining: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_state_new() {
        let state = State::new("agent", 300);
        assert_eq!(state.agent(), "agent");
        assert_eq!(state.time_remaining(), 300);
        assert_eq!(state.quantity("plank"), 0);
    }

    #[test]
    fn test_apply_delta() {
        let mut state = State::new("agent", 0).with_quantity("plank", 2);
        assert_eq!(state.apply_delta("plank", 4), Ok(6));
        assert_eq!(state.apply_delta("plank", -6), Ok(0));
        assert_eq!(state.apply_delta("stick", 4), Ok(4));
    }

    #[test]
    fn test_apply_delta_underflow_leaves_state() {
        let mut state = State::new("agent", 0).with_quantity("plank", 1);
        let err = state.apply_delta("plank", -2).unwrap_err();
        assert_eq!(
            err,
            StateError::Underflow {
                resource: "plank".to_string(),
                have: 1,
                delta: -2,
            }
        );
        assert_eq!(state.quantity("plank"), 1);
    }

    #[test]
    fn test_apply_delta_overflow() {
        let mut state = State::new("agent", 0).with_quantity("plank", u64::MAX);
        assert!(matches!(
            state.apply_delta("plank", 1),
            Err(StateError::Overflow { .. })
        ));
        assert_eq!(state.quantity("plank"), u64::MAX);
    }

    #[test]
    fn test_consume_time() {
        let mut state = State::new("agent", 10);
        assert!(state.consume_time(4).is_ok());
        assert_eq!(state.time_remaining(), 6);
        assert!(state.consume_time(7).is_err());
        assert_eq!(state.time_remaining(), 6);
        assert!(state.consume_time(6).is_ok());
        assert_eq!(state.time_remaining(), 0);
    }

    #[test]
    fn test_built_flags() {
        let mut state = State::new("agent", 0);
        assert!(!state.is_built("bench"));
        state.mark_built("bench");
        state.mark_built("bench");
        assert!(state.is_built("bench"));
        assert_eq!(state.built_tools().collect::<Vec<_>>(), vec!["bench"]);
    }

    #[test]
    fn test_from_rules() {
        let rules = RuleSet::from_json_str(
            r#"{
                "Items": ["plank"],
                "Tools": ["bench"],
                "Initial": {"bench": 1},
                "Goal": {},
                "Recipes": {}
            }"#,
        )
        .unwrap();
        let state = State::from_rules(&rules, "agent", 50);
        assert_eq!(state.quantity("plank"), 0);
        assert_eq!(state.quantity("bench"), 1);
        assert!(state.is_built("bench"));
        assert_eq!(state.quantities().count(), 2);
        assert_eq!(state.holdings().collect::<Vec<_>>(), vec![("bench", 1)]);
    }

    proptest::proptest! {
        #[test]
        fn prop_quantity_never_negative(start in 0u64..100, delta in -200i64..200) {
            let mut state = State::new("agent", 0).with_quantity("ore", start);
            match state.apply_delta("ore", delta) {
                Ok(next) => prop_assert_eq!(next as i64, start as i64 + delta),
                Err(_) => {
                    prop_assert!(start as i64 + delta < 0);
                    prop_assert_eq!(state.quantity("ore"), start);
                }
            }
        }
    }
}
