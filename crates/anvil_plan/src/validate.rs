//! Rule set validator.
//!
//! Every problem found here is fatal: the domain cannot be compiled and no
//! search is attempted.

use anvil_core::{operator_name, RuleSet};
use indexmap::{IndexMap, IndexSet};

/// Malformed rule data
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Recipe has no `Produces` entry
    #[error("Recipe '{recipe}' produces nothing")]
    EmptyProduces {
        /// Recipe name
        recipe: String,
    },

    /// Recipe produces zero of something
    #[error("Recipe '{recipe}' yields zero {resource}")]
    ZeroYield {
        /// Recipe name
        recipe: String,
        /// Resource name
        resource: String,
    },

    /// A name that is not a declared item or tool
    #[error("Unknown resource '{resource}' in {context}")]
    UnknownResource {
        /// Where the name appeared
        context: String,
        /// Resource name
        resource: String,
    },

    /// A name declared more than once
    #[error("Resource declared more than once: {name}")]
    DuplicateResource {
        /// Resource name
        name: String,
    },

    /// Two recipes normalise to the same operator name
    #[error("Recipes '{first}' and '{second}' both compile to operator {operator}")]
    OperatorCollision {
        /// Operator name
        operator: String,
        /// First recipe
        first: String,
        /// Second recipe
        second: String,
    },
}

/// Validator for rule sets
pub struct Validator {
    /// Check `Initial` names against the declarations
    pub check_initial: bool,
    /// Check `Goal` names against the declarations
    pub check_goal: bool,
}

impl Validator {
    /// Create a new validator
    #[must_use]
    pub fn new() -> Self {
        Self {
            check_initial: true,
            check_goal: true,
        }
    }

    /// Validate a rule set
    ///
    /// # Errors
    ///
    /// Returns every problem found
    pub fn validate(&self, rules: &RuleSet) -> Result<(), Vec<DomainError>> {
        let mut errors = Vec::new();

        self.check_declarations(rules, &mut errors);
        self.check_recipes(rules, &mut errors);
        self.check_operator_names(rules, &mut errors);

        if self.check_initial {
            for name in rules.initial.keys() {
                if !rules.is_known(name) {
                    errors.push(DomainError::UnknownResource {
                        context: "Initial".to_string(),
                        resource: name.clone(),
                    });
                }
            }
        }

        if self.check_goal {
            for name in rules.goal.keys() {
                if !rules.is_known(name) {
                    errors.push(DomainError::UnknownResource {
                        context: "Goal".to_string(),
                        resource: name.clone(),
                    });
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Items and tools must be disjoint and free of repeats
    fn check_declarations(&self, rules: &RuleSet, errors: &mut Vec<DomainError>) {
        let mut seen = IndexSet::new();
        for name in rules.resources() {
            if !seen.insert(name) {
                errors.push(DomainError::DuplicateResource {
                    name: name.to_string(),
                });
            }
        }
    }

    /// Each recipe must produce something and mention only declared names
    fn check_recipes(&self, rules: &RuleSet, errors: &mut Vec<DomainError>) {
        for (name, recipe) in &rules.recipes {
            if recipe.produces.is_empty() {
                errors.push(DomainError::EmptyProduces {
                    recipe: name.clone(),
                });
            }
            for (resource, &count) in &recipe.produces {
                if count == 0 {
                    errors.push(DomainError::ZeroYield {
                        recipe: name.clone(),
                        resource: resource.clone(),
                    });
                }
            }
            for resource in recipe.mentions() {
                if !rules.is_known(resource) {
                    errors.push(DomainError::UnknownResource {
                        context: format!("recipe '{name}'"),
                        resource: resource.to_string(),
                    });
                }
            }
        }
    }

    /// `"craft plank"` and `"craft_plank"` cannot coexist
    fn check_operator_names(&self, rules: &RuleSet, errors: &mut Vec<DomainError>) {
        let mut owners: IndexMap<String, &str> = IndexMap::new();
        for name in rules.recipes.keys() {
            let operator = operator_name(name);
            if let Some(first) = owners.get(&operator) {
                errors.push(DomainError::OperatorCollision {
                    operator,
                    first: first.to_string(),
                    second: name.clone(),
                });
            } else {
                owners.insert(operator, name);
            }
        }
    }

    /// Set whether `Initial` is checked
    #[must_use]
    pub fn with_check_initial(mut self, check: bool) -> Self {
        self.check_initial = check;
        self
    }

    /// Set whether `Goal` is checked
    #[must_use]
    pub fn with_check_goal(mut self, check: bool) -> Self {
        self.check_goal = check;
        self
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anvil_core::Recipe;

    fn base_rules() -> RuleSet {
        let mut rules = RuleSet {
            items: vec!["wood".to_string(), "plank".to_string()],
            tools: vec!["bench".to_string()],
            ..RuleSet::default()
        };
        rules
            .recipes
            .insert("punch for wood".to_string(), Recipe::new("wood", 1, 4));
        rules.recipes.insert(
            "craft plank".to_string(),
            Recipe::new("plank", 4, 1).consuming("wood", 1),
        );
        rules
    }

    #[test]
    fn test_validator_new() {
        let validator = Validator::new();
        assert!(validator.check_initial);
        assert!(validator.check_goal);
    }

    #[test]
    fn test_valid_rules() {
        assert!(Validator::new().validate(&base_rules()).is_ok());
    }

    #[test]
    fn test_empty_produces() {
        let mut rules = base_rules();
        rules.recipes.insert("nothing".to_string(), Recipe::default());
        let errors = Validator::new().validate(&rules).unwrap_err();
        assert_eq!(
            errors,
            vec![DomainError::EmptyProduces {
                recipe: "nothing".to_string()
            }]
        );
    }

    #[test]
    fn test_zero_yield() {
        let mut rules = base_rules();
        rules
            .recipes
            .insert("idle".to_string(), Recipe::new("wood", 0, 1));
        let errors = Validator::new().validate(&rules).unwrap_err();
        assert!(matches!(errors[0], DomainError::ZeroYield { .. }));
    }

    #[test]
    fn test_unknown_resource_in_recipe() {
        let mut rules = base_rules();
        rules.recipes.insert(
            "craft stick".to_string(),
            Recipe::new("stick", 4, 1).consuming("plank", 2),
        );
        let errors = Validator::new().validate(&rules).unwrap_err();
        assert_eq!(
            errors,
            vec![DomainError::UnknownResource {
                context: "recipe 'craft stick'".to_string(),
                resource: "stick".to_string(),
            }]
        );
    }

    #[test]
    fn test_duplicate_resource() {
        let mut rules = base_rules();
        rules.tools.push("wood".to_string());
        let errors = Validator::new().validate(&rules).unwrap_err();
        assert_eq!(
            errors,
            vec![DomainError::DuplicateResource {
                name: "wood".to_string()
            }]
        );
    }

    #[test]
    fn test_operator_collision() {
        let mut rules = base_rules();
        rules.recipes.insert(
            "craft_plank".to_string(),
            Recipe::new("plank", 4, 1).consuming("wood", 1),
        );
        let errors = Validator::new().validate(&rules).unwrap_err();
        assert_eq!(
            errors,
            vec![DomainError::OperatorCollision {
                operator: "op_craft_plank".to_string(),
                first: "craft plank".to_string(),
                second: "craft_plank".to_string(),
            }]
        );
    }

    #[test]
    fn test_unknown_goal_and_initial() {
        let mut rules = base_rules();
        rules.initial.insert("diamond".to_string(), 1);
        rules.goal.insert("emerald".to_string(), 1);
        let errors = Validator::new().validate(&rules).unwrap_err();
        assert_eq!(errors.len(), 2);

        let relaxed = Validator::new()
            .with_check_initial(false)
            .with_check_goal(false);
        assert!(relaxed.validate(&rules).is_ok());
    }

    #[test]
    fn test_error_display() {
        let err = DomainError::UnknownResource {
            context: "Goal".to_string(),
            resource: "emerald".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown resource 'emerald' in Goal");
    }
}
