//! Task vocabulary for hierarchical decomposition.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Method-table key for `have_enough` tasks
pub const HAVE_ENOUGH: &str = "have_enough";

/// Prefix of method-table keys for `produce` tasks
pub const PRODUCE_PREFIX: &str = "produce_";

/// A pending unit of work on the planner's agenda
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Task {
    /// Ensure the agent holds at least `count` of `resource`
    HaveEnough {
        /// Agent the task is for
        agent: String,
        /// Resource name
        resource: String,
        /// Minimum quantity
        count: u64,
    },
    /// Produce one batch of `resource` with some recipe
    Produce {
        /// Agent the task is for
        agent: String,
        /// Resource name
        resource: String,
    },
    /// Apply the operator compiled from `recipe`
    Operator {
        /// Agent the task is for
        agent: String,
        /// Recipe name as written in the rule data
        recipe: String,
    },
}

impl Task {
    /// Create a `have_enough` task
    #[must_use]
    pub fn have_enough(agent: impl Into<String>, resource: impl Into<String>, count: u64) -> Self {
        Self::HaveEnough {
            agent: agent.into(),
            resource: resource.into(),
            count,
        }
    }

    /// Create a `produce` task
    #[must_use]
    pub fn produce(agent: impl Into<String>, resource: impl Into<String>) -> Self {
        Self::Produce {
            agent: agent.into(),
            resource: resource.into(),
        }
    }

    /// Create an operator task
    #[must_use]
    pub fn operator(agent: impl Into<String>, recipe: impl Into<String>) -> Self {
        Self::Operator {
            agent: agent.into(),
            recipe: recipe.into(),
        }
    }

    /// Agent the task is for
    #[must_use]
    pub fn agent(&self) -> &str {
        match self {
            Self::HaveEnough { agent, .. }
            | Self::Produce { agent, .. }
            | Self::Operator { agent, .. } => agent,
        }
    }

    /// Resource targeted by a compound task
    #[must_use]
    pub fn resource(&self) -> Option<&str> {
        match self {
            Self::HaveEnough { resource, .. } | Self::Produce { resource, .. } => Some(resource),
            Self::Operator { .. } => None,
        }
    }

    /// Key into the domain's method table, `None` for operator tasks
    #[must_use]
    pub fn method_key(&self) -> Option<String> {
        match self {
            Self::HaveEnough { .. } => Some(HAVE_ENOUGH.to_string()),
            Self::Produce { resource, .. } => Some(format!("{PRODUCE_PREFIX}{resource}")),
            Self::Operator { .. } => None,
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HaveEnough {
                agent,
                resource,
                count,
            } => write!(f, "{HAVE_ENOUGH}({agent}, {resource}, {count})"),
            Self::Produce { agent, resource } => write!(f, "produce({agent}, {resource})"),
            Self::Operator { agent, recipe } => write!(f, "{}({agent})", operator_name(recipe)),
        }
    }
}

/// Operator name for a recipe: `"craft plank"` becomes `op_craft_plank`
#[must_use]
pub fn operator_name(recipe: &str) -> String {
    format!("op_{}", recipe.replace(' ', "_"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_name() {
        assert_eq!(operator_name("craft plank"), "op_craft_plank");
        assert_eq!(
            operator_name("craft wooden_pickaxe at bench"),
            "op_craft_wooden_pickaxe_at_bench"
        );
    }

    #[test]
    fn test_task_display() {
        assert_eq!(
            Task::have_enough("agent", "plank", 1).to_string(),
            "have_enough(agent, plank, 1)"
        );
        assert_eq!(Task::produce("agent", "plank").to_string(), "produce(agent, plank)");
        assert_eq!(
            Task::operator("agent", "punch for wood").to_string(),
            "op_punch_for_wood(agent)"
        );
    }

    #[test]
    fn test_method_key() {
        assert_eq!(
            Task::have_enough("a", "wood", 2).method_key().as_deref(),
            Some("have_enough")
        );
        assert_eq!(
            Task::produce("a", "wood").method_key().as_deref(),
            Some("produce_wood")
        );
        assert_eq!(Task::operator("a", "craft plank").method_key(), None);
    }

    #[test]
    fn test_task_accessors() {
        let task = Task::produce("steve", "stick");
        assert_eq!(task.agent(), "steve");
        assert_eq!(task.resource(), Some("stick"));
        assert_eq!(Task::operator("steve", "craft stick").resource(), None);
    }

    #[test]
    fn test_task_serde_tag() {
        let json = serde_json::to_value(Task::have_enough("agent", "ore", 3)).unwrap();
        assert_eq!(json["kind"], "have_enough");
        assert_eq!(json["count"], 3);
        let back: Task = serde_json::from_value(json).unwrap();
        assert_eq!(back, Task::have_enough("agent", "ore", 3));
    }
}
