//! Hyperparameter configurations with value semantics.

use hm_types::{ConfigurationError, InputType, Point, Value, Variable};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

/// An ordered set of active variables. Groups and the fixed set are derived
/// from the variables' own flags, so they always agree with the dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Configuration {
    variables: Vec<Variable>,
}

impl Configuration {
    /// Build a configuration from untrusted input, checking every invariant.
    pub fn new(variables: Vec<Variable>) -> Result<Self, ConfigurationError> {
        {
            let mut seen = HashSet::new();
            for var in &variables {
                if !seen.insert(var.name.as_str()) {
                    return Err(ConfigurationError::DuplicateName {
                        name: var.name.clone(),
                    });
                }
                var.check()?;
            }
        }
        Ok(Self { variables })
    }

    /// Build without checking bounds or values; the descriptor builder is
    /// the gate for generated candidates.
    pub(crate) fn assemble(variables: Vec<Variable>) -> Self {
        Self { variables }
    }

    /// Rebuild this configuration with the values carried by a driver point.
    pub fn with_point(&self, point: &Point) -> Result<Self, ConfigurationError> {
        if point.len() != self.dimension() {
            return Err(ConfigurationError::LengthMismatch {
                expected: self.dimension(),
                actual: point.len(),
            });
        }
        let variables = self
            .variables
            .iter()
            .zip(&point.coordinates)
            .map(|(var, &x)| var.decode(x).map(|value| var.with_value(value)))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(variables)
    }

    pub fn dimension(&self) -> usize {
        self.variables.len()
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, index: usize) -> Option<&Variable> {
        self.variables.get(index)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|v| v.name == name)
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.index_of(name).map(|i| &self.variables[i].value)
    }

    pub fn input_types(&self) -> Vec<InputType> {
        self.variables.iter().map(Variable::input_type).collect()
    }

    pub fn lower_bounds(&self) -> Vec<f64> {
        self.variables.iter().map(Variable::lower).collect()
    }

    pub fn upper_bounds(&self) -> Vec<f64> {
        self.variables.iter().map(Variable::upper).collect()
    }

    /// Current values in driver coordinates. A value that does not fit its
    /// variable encodes as NaN.
    pub fn point(&self) -> Point {
        Point::new(
            self.variables
                .iter()
                .map(|v| v.encode().unwrap_or(f64::NAN))
                .collect(),
        )
    }

    pub fn fixed_indices(&self) -> BTreeSet<usize> {
        self.variables
            .iter()
            .enumerate()
            .filter(|(_, v)| v.fixed)
            .map(|(i, _)| i)
            .collect()
    }

    /// Index sets of the variable groups, ordered by first member.
    pub fn variable_groups(&self) -> Vec<BTreeSet<usize>> {
        let mut order: Vec<&str> = Vec::new();
        let mut groups: Vec<BTreeSet<usize>> = Vec::new();
        for (i, var) in self.variables.iter().enumerate() {
            let Some(group) = var.group.as_deref() else {
                continue;
            };
            match order.iter().position(|g| *g == group) {
                Some(slot) => {
                    groups[slot].insert(i);
                }
                None => {
                    order.push(group);
                    groups.push(BTreeSet::from([i]));
                }
            }
        }
        groups
    }

    pub fn categorical_indices(&self) -> Vec<usize> {
        self.variables
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_categorical())
            .map(|(i, _)| i)
            .collect()
    }
}
