//! Planner configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default decomposition depth ceiling
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Order in which recipe methods for the same resource are tried
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MethodOrder {
    /// Most time-expensive recipe first; ties keep declaration order
    #[default]
    TimeDescending,
    /// Recipe declaration order
    Declaration,
}

impl std::fmt::Display for MethodOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TimeDescending => write!(f, "time-descending"),
            Self::Declaration => write!(f, "declaration"),
        }
    }
}

/// Search configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Branches deeper than this many method expansions are pruned
    pub max_depth: usize,
    /// Recipe method ordering policy
    pub method_order: MethodOrder,
    /// Let recipe methods refuse before emitting subtasks when they can
    /// never succeed
    pub fast_fail: bool,
    /// Stop after visiting this many search nodes
    pub node_limit: Option<u64>,
    /// Stop after this much wall-clock time
    pub timeout: Option<Duration>,
}

impl PlannerConfig {
    /// Create the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            method_order: MethodOrder::default(),
            fast_fail: true,
            node_limit: None,
            timeout: None,
        }
    }

    /// Set the depth ceiling
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the method ordering policy
    #[must_use]
    pub fn with_method_order(mut self, order: MethodOrder) -> Self {
        self.method_order = order;
        self
    }

    /// Enable or disable method fast-fail
    #[must_use]
    pub fn with_fast_fail(mut self, fast_fail: bool) -> Self {
        self.fast_fail = fast_fail;
        self
    }

    /// Set a node budget
    #[must_use]
    pub fn with_node_limit(mut self, limit: u64) -> Self {
        self.node_limit = Some(limit);
        self
    }

    /// Set a wall-clock budget
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self::new()
    }
}
