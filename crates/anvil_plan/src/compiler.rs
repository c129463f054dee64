//! Compiler from rule data to an executable domain.
//!
//! The output [`Domain`] owns two tables: methods keyed by task name
//! (`have_enough`, `produce_<resource>`) and operators keyed by recipe name.
//! It is built once and passed by reference into the planner.

use crate::config::MethodOrder;
use crate::method::{Method, RecipeMethod};
use crate::operator::{Operator, OperatorRejected};
use crate::planner::Plan;
use crate::validate::{DomainError, Validator};
use anvil_core::task::{HAVE_ENOUGH, PRODUCE_PREFIX};
use anvil_core::{RuleSet, State, Task};
use indexmap::{IndexMap, IndexSet};
use std::fmt::Write as _;

/// Output from compiling a rule set
#[derive(Debug, Clone)]
pub struct CompilerOutput {
    /// The compiled domain
    pub domain: Domain,
    /// Compilation warnings
    pub warnings: Vec<CompilerWarning>,
}

/// Compilation warning
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompilerWarning {
    /// No recipe produces the resource and it is not held initially
    Unobtainable { resource: String },
    /// Declared but never mentioned by a recipe, `Initial`, or `Goal`
    UnusedResource { resource: String },
}

impl std::fmt::Display for CompilerWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unobtainable { resource } => {
                write!(f, "No recipe produces {} and none is held initially", resource)
            }
            Self::UnusedResource { resource } => write!(f, "Resource {} is never used", resource),
        }
    }
}

/// Compiler for transforming rule data into a domain
pub struct Compiler {
    /// Ordering policy for recipe methods
    order: MethodOrder,
    /// Validator run before compilation
    validator: Validator,
}

impl Compiler {
    /// Create a new compiler
    #[must_use]
    pub fn new() -> Self {
        Self {
            order: MethodOrder::default(),
            validator: Validator::new(),
        }
    }

    /// Set the recipe method ordering policy
    #[must_use]
    pub fn with_method_order(mut self, order: MethodOrder) -> Self {
        self.order = order;
        self
    }

    /// Replace the validator
    #[must_use]
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// Compile a rule set
    ///
    /// # Errors
    ///
    /// Returns the first [`DomainError`] if the rule set is malformed
    pub fn compile(&self, rules: &RuleSet) -> Result<CompilerOutput, DomainError> {
        if let Err(mut errors) = self.validator.validate(rules) {
            return Err(errors.remove(0));
        }

        let tools: IndexSet<String> = rules.tools.iter().cloned().collect();

        let mut operators = IndexMap::new();
        for (name, recipe) in &rules.recipes {
            let operator = Operator::compile(name, recipe, |r| tools.contains(r));
            operators.insert(name.clone(), operator);
        }

        let mut methods: IndexMap<String, Vec<Method>> = IndexMap::new();
        methods.insert(
            HAVE_ENOUGH.to_string(),
            vec![Method::CheckEnough, Method::ProduceEnough],
        );

        let mut producible = IndexSet::new();
        for resource in rules.resources() {
            let mut candidates: Vec<RecipeMethod> = rules
                .recipes
                .iter()
                .filter(|(_, recipe)| recipe.produces.contains_key(resource))
                .map(|(name, recipe)| RecipeMethod {
                    name: name.replace(' ', "_"),
                    recipe: name.clone(),
                    requirements: recipe.requirements().into_iter().collect(),
                    consumes: recipe
                        .consumes
                        .iter()
                        .map(|(r, n)| (r.clone(), *n))
                        .collect(),
                    time: recipe.time,
                })
                .collect();

            if candidates.is_empty() {
                continue;
            }
            producible.insert(resource.to_string());

            // Stable sort keeps declaration order among equal times
            if self.order == MethodOrder::TimeDescending {
                candidates.sort_by(|a, b| b.time.cmp(&a.time));
            }

            methods.insert(
                format!("{PRODUCE_PREFIX}{resource}"),
                candidates.into_iter().map(Method::Recipe).collect(),
            );
        }

        let warnings = self.collect_warnings(rules, &producible);
        let domain = Domain {
            tools,
            producible,
            methods,
            operators,
            order: self.order,
        };

        tracing::info!(
            operators = domain.operators.len(),
            method_tables = domain.methods.len(),
            warnings = warnings.len(),
            "compiled domain"
        );

        Ok(CompilerOutput { domain, warnings })
    }

    fn collect_warnings(
        &self,
        rules: &RuleSet,
        producible: &IndexSet<String>,
    ) -> Vec<CompilerWarning> {
        let mut warnings = Vec::new();
        let mentioned: IndexSet<&str> = rules
            .recipes
            .values()
            .flat_map(|r| r.mentions())
            .chain(rules.initial.keys().map(String::as_str))
            .chain(rules.goal.keys().map(String::as_str))
            .collect();

        for resource in rules.resources() {
            if !mentioned.contains(resource) {
                warnings.push(CompilerWarning::UnusedResource {
                    resource: resource.to_string(),
                });
            } else if !producible.contains(resource)
                && rules.initial.get(resource).copied().unwrap_or(0) == 0
            {
                warnings.push(CompilerWarning::Unobtainable {
                    resource: resource.to_string(),
                });
            }
        }
        warnings
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Compiled method and operator tables
#[derive(Debug, Clone)]
pub struct Domain {
    /// Durable tool names
    tools: IndexSet<String>,
    /// Resources with at least one recipe
    producible: IndexSet<String>,
    /// Methods keyed by task name
    methods: IndexMap<String, Vec<Method>>,
    /// Operators keyed by recipe name
    operators: IndexMap<String, Operator>,
    /// Policy the recipe methods were sorted with
    order: MethodOrder,
}

impl Domain {
    /// Methods for a compound task, in the order they are tried
    #[must_use]
    pub fn methods_for(&self, task: &Task) -> &[Method] {
        task.method_key()
            .and_then(|key| self.methods.get(&key))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Operator compiled from a recipe
    #[must_use]
    pub fn operator(&self, recipe: &str) -> Option<&Operator> {
        self.operators.get(recipe)
    }

    /// All operators, in declaration order
    pub fn operators(&self) -> impl Iterator<Item = &Operator> {
        self.operators.values()
    }

    /// Check if a name is a durable tool
    #[must_use]
    pub fn is_tool(&self, name: &str) -> bool {
        self.tools.contains(name)
    }

    /// Check if some recipe produces a resource
    #[must_use]
    pub fn is_producible(&self, resource: &str) -> bool {
        self.producible.contains(resource)
    }

    /// Recipe names producing a resource, in the order they are tried
    #[must_use]
    pub fn recipes_producing(&self, resource: &str) -> Vec<&str> {
        self.methods_for(&Task::produce("", resource))
            .iter()
            .filter_map(|m| match m {
                Method::Recipe(r) => Some(r.recipe.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Policy the recipe methods were sorted with
    #[must_use]
    pub fn method_order(&self) -> MethodOrder {
        self.order
    }

    /// Re-apply a plan's operators to a state
    ///
    /// # Errors
    ///
    /// Returns the index and reason of the first step that does not apply
    pub fn replay(&self, state: &State, plan: &Plan) -> Result<State, (usize, OperatorRejected)> {
        let mut current = state.clone();
        for (index, step) in plan.steps.iter().enumerate() {
            let operator = self.operator(&step.recipe).ok_or_else(|| {
                (
                    index,
                    OperatorRejected::UnknownOperator {
                        recipe: step.recipe.clone(),
                    },
                )
            })?;
            operator.apply(&mut current).map_err(|e| (index, e))?;
        }
        Ok(current)
    }

    /// Human-readable listing of both tables
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "OPERATORS:");
        for op in self.operators.values() {
            let _ = writeln!(out, "  {} (time {})", op.name, op.time);
        }
        let _ = writeln!(out, "METHODS:");
        for (task, methods) in &self.methods {
            let names: Vec<&str> = methods.iter().map(Method::name).collect();
            let _ = writeln!(out, "  {}: {}", task, names.join(", "));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULES: &str = r#"{
        "Items": ["wood", "plank", "stick", "dust"],
        "Tools": ["bench", "wooden_axe"],
        "Initial": {},
        "Goal": {"plank": 1},
        "Recipes": {
            "wooden_axe for wood": {"Produces": {"wood": 1}, "Requires": {"wooden_axe": 1}, "Time": 2},
            "punch for wood": {"Produces": {"wood": 1}, "Time": 4},
            "lucky find": {"Produces": {"wood": 1}, "Time": 2},
            "craft plank": {"Produces": {"plank": 4}, "Consumes": {"wood": 1}, "Time": 1},
            "craft bench": {"Produces": {"bench": 1}, "Consumes": {"plank": 4}, "Time": 1},
            "craft wooden_axe at bench": {
                "Produces": {"wooden_axe": 1},
                "Requires": {"bench": 1},
                "Consumes": {"plank": 3, "stick": 2},
                "Time": 1
            }
        }
    }"#;

    fn rules() -> RuleSet {
        RuleSet::from_json_str(RULES).unwrap()
    }

    #[test]
    fn test_compiler_new() {
        let compiler = Compiler::new();
        assert_eq!(compiler.order, MethodOrder::TimeDescending);
    }

    #[test]
    fn test_compile_tables() {
        let output = Compiler::new().compile(&rules()).unwrap();
        let domain = output.domain;
        assert_eq!(domain.operators().count(), 6);
        assert!(domain.operator("craft plank").is_some());
        assert_eq!(
            domain.methods_for(&Task::have_enough("agent", "wood", 1)),
            &[Method::CheckEnough, Method::ProduceEnough]
        );
        assert!(domain.methods_for(&Task::operator("agent", "craft plank")).is_empty());
        assert!(domain.is_tool("bench"));
        assert!(!domain.is_tool("wood"));
        assert!(domain.is_producible("plank"));
        assert!(!domain.is_producible("stick"));
    }

    #[test]
    fn test_time_descending_order() {
        let domain = Compiler::new().compile(&rules()).unwrap().domain;
        assert_eq!(
            domain.recipes_producing("wood"),
            vec!["punch for wood", "wooden_axe for wood", "lucky find"]
        );
    }

    #[test]
    fn test_declaration_order() {
        let domain = Compiler::new()
            .with_method_order(MethodOrder::Declaration)
            .compile(&rules())
            .unwrap()
            .domain;
        assert_eq!(domain.method_order(), MethodOrder::Declaration);
        assert_eq!(
            domain.recipes_producing("wood"),
            vec!["wooden_axe for wood", "punch for wood", "lucky find"]
        );
    }

    #[test]
    fn test_recipe_method_requirements() {
        let domain = Compiler::new().compile(&rules()).unwrap().domain;
        let methods = domain.methods_for(&Task::produce("agent", "wooden_axe"));
        assert_eq!(methods.len(), 1);
        let Method::Recipe(method) = &methods[0] else {
            panic!("expected recipe method");
        };
        assert_eq!(method.name, "craft_wooden_axe_at_bench");
        assert_eq!(
            method.requirements,
            vec![
                ("bench".to_string(), 1),
                ("plank".to_string(), 3),
                ("stick".to_string(), 2),
            ]
        );
    }

    #[test]
    fn test_compile_warnings() {
        let output = Compiler::new().compile(&rules()).unwrap();
        assert!(output.warnings.contains(&CompilerWarning::Unobtainable {
            resource: "stick".to_string()
        }));
        assert!(output.warnings.contains(&CompilerWarning::UnusedResource {
            resource: "dust".to_string()
        }));
        assert_eq!(output.warnings.len(), 2);
    }

    #[test]
    fn test_compile_rejects_malformed() {
        let mut rules = rules();
        rules.goal.insert("diamond".to_string(), 1);
        let err = Compiler::new().compile(&rules).unwrap_err();
        assert_eq!(
            err,
            DomainError::UnknownResource {
                context: "Goal".to_string(),
                resource: "diamond".to_string(),
            }
        );
    }

    #[test]
    fn test_describe() {
        let domain = Compiler::new().compile(&rules()).unwrap().domain;
        let listing = domain.describe();
        assert!(listing.contains("op_craft_plank (time 1)"));
        assert!(listing.contains("have_enough: check_enough, produce_enough"));
        assert!(listing.contains("produce_wood: punch_for_wood, wooden_axe_for_wood, lucky_find"));
    }

    #[test]
    fn test_warning_display() {
        let warning = CompilerWarning::UnusedResource {
            resource: "dust".to_string(),
        };
        assert_eq!(warning.to_string(), "Resource dust is never used");
    }
}
