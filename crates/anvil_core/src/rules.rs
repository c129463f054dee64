//! Declarative rule data: resources, recipes, initial holdings, goals.
//!
//! The JSON document uses capitalised keys:
//!
//! ```json
//! {
//!   "Items": ["wood", "plank"],
//!   "Tools": ["bench"],
//!   "Initial": {},
//!   "Goal": {"plank": 1},
//!   "Recipes": {
//!     "punch for wood": {"Produces": {"wood": 1}, "Time": 4},
//!     "craft plank": {"Produces": {"plank": 4}, "Consumes": {"wood": 1}, "Time": 1}
//!   }
//! }
//! ```
//!
//! Maps keep document order; method ordering and requirement ordering
//! both depend on it.

use crate::error::{CoreError, CoreResult};
use crate::state::State;
use crate::task::Task;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A complete rule set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    /// Consumable resource names
    #[serde(rename = "Items")]
    pub items: Vec<String>,
    /// Durable tool names
    #[serde(rename = "Tools", default)]
    pub tools: Vec<String>,
    /// Starting quantities
    #[serde(rename = "Initial", default)]
    pub initial: IndexMap<String, u64>,
    /// Target quantities
    #[serde(rename = "Goal", default)]
    pub goal: IndexMap<String, u64>,
    /// Recipes keyed by name
    #[serde(rename = "Recipes")]
    pub recipes: IndexMap<String, Recipe>,
}

impl RuleSet {
    /// Parse a rule set from JSON text
    ///
    /// # Errors
    ///
    /// Returns error if the text is not a valid rule document
    pub fn from_json_str(input: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// Load a rule set from a JSON file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| CoreError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&text)
    }

    /// Replace the starting quantities
    #[must_use]
    pub fn with_initial(mut self, initial: IndexMap<String, u64>) -> Self {
        self.initial = initial;
        self
    }

    /// Replace the goal quantities
    #[must_use]
    pub fn with_goal(mut self, goal: IndexMap<String, u64>) -> Self {
        self.goal = goal;
        self
    }

    /// Check if a name is a durable tool
    #[must_use]
    pub fn is_tool(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t == name)
    }

    /// Check if a name is a declared item or tool
    #[must_use]
    pub fn is_known(&self, name: &str) -> bool {
        self.is_tool(name) || self.items.iter().any(|i| i == name)
    }

    /// Declared items followed by declared tools
    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.items.iter().chain(self.tools.iter()).map(String::as_str)
    }

    /// Look up a recipe by name
    #[must_use]
    pub fn recipe(&self, name: &str) -> Option<&Recipe> {
        self.recipes.get(name)
    }

    /// Initial state for an agent with a time budget
    #[must_use]
    pub fn initial_state(&self, agent: &str, time_budget: u64) -> State {
        State::from_rules(self, agent, time_budget)
    }

    /// One `have_enough` task per goal entry, in document order
    #[must_use]
    pub fn goal_tasks(&self, agent: &str) -> Vec<Task> {
        self.goal
            .iter()
            .map(|(resource, &count)| Task::have_enough(agent, resource.as_str(), count))
            .collect()
    }
}

/// A single recipe
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    /// Quantities granted
    #[serde(rename = "Produces")]
    pub produces: IndexMap<String, u64>,
    /// Quantities destroyed
    #[serde(rename = "Consumes", default, skip_serializing_if = "IndexMap::is_empty")]
    pub consumes: IndexMap<String, u64>,
    /// Quantities that must be held but are kept
    #[serde(rename = "Requires", default, skip_serializing_if = "IndexMap::is_empty")]
    pub requires: IndexMap<String, u64>,
    /// Time cost
    #[serde(rename = "Time")]
    pub time: u64,
}

impl Recipe {
    /// Create a recipe producing `count` of `resource`
    #[must_use]
    pub fn new(resource: impl Into<String>, count: u64, time: u64) -> Self {
        let mut produces = IndexMap::new();
        produces.insert(resource.into(), count);
        Self {
            produces,
            consumes: IndexMap::new(),
            requires: IndexMap::new(),
            time,
        }
    }

    /// Add a consumed resource
    #[must_use]
    pub fn consuming(mut self, resource: impl Into<String>, count: u64) -> Self {
        self.consumes.insert(resource.into(), count);
        self
    }

    /// Add a required (kept) resource
    #[must_use]
    pub fn requiring(mut self, resource: impl Into<String>, count: u64) -> Self {
        self.requires.insert(resource.into(), count);
        self
    }

    /// The resource this recipe is for: the first `Produces` entry
    #[must_use]
    pub fn primary_product(&self) -> Option<&str> {
        self.produces.keys().next().map(String::as_str)
    }

    /// `Requires` merged with `Consumes`
    ///
    /// A resource listed in both keeps its `Requires` position and takes the
    /// `Consumes` amount.
    #[must_use]
    pub fn requirements(&self) -> IndexMap<String, u64> {
        let mut merged = self.requires.clone();
        for (resource, &count) in &self.consumes {
            merged.insert(resource.clone(), count);
        }
        merged
    }

    /// Every resource the recipe mentions
    pub fn mentions(&self) -> impl Iterator<Item = &str> {
        self.produces
            .keys()
            .chain(self.consumes.keys())
            .chain(self.requires.keys())
            .map(String::as_str)
    }
}
