//! Structural rules: how a categorical move reshapes the active variable set.

use hm_types::{SchemaError, Value, Variable};
use serde::{Deserialize, Serialize};

/// A variable activated by a categorical move, with its default assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddedVariable {
    pub variable: Variable,
    /// Insert right after this variable when it is active, otherwise append.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

impl AddedVariable {
    pub fn new(variable: Variable) -> Self {
        Self {
            variable,
            after: None,
        }
    }

    pub fn after(mut self, anchor: impl Into<String>) -> Self {
        self.after = Some(anchor.into());
        self
    }
}

/// Variables dropped and activated when a categorical variable takes a value.
///
/// Deltas describe the target structure, so they apply from any base:
/// removing an inactive variable is a no-op and adding an active one keeps
/// its current assignment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuralDelta {
    #[serde(default)]
    pub removed: Vec<String>,
    #[serde(default)]
    pub added: Vec<AddedVariable>,
}

impl StructuralDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remove(mut self, name: impl Into<String>) -> Self {
        self.removed.push(name.into());
        self
    }

    pub fn add(mut self, variable: Variable) -> Self {
        self.added.push(AddedVariable::new(variable));
        self
    }

    pub fn add_after(mut self, anchor: impl Into<String>, variable: Variable) -> Self {
        self.added.push(AddedVariable::new(variable).after(anchor));
        self
    }
}

/// Rule keyed by (categorical variable, target value).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralRule {
    pub variable: String,
    pub value: Value,
    #[serde(default)]
    pub delta: StructuralDelta,
}

impl StructuralRule {
    pub fn new(variable: impl Into<String>, value: impl Into<Value>, delta: StructuralDelta) -> Self {
        Self {
            variable: variable.into(),
            value: value.into(),
            delta,
        }
    }
}

/// Read-only rule table for a run.
///
/// A categorical variable no rule mentions is plain: moving it only swaps its
/// value. Once a variable has any rule, every move of it needs one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleTable {
    rules: Vec<StructuralRule>,
}

impl RuleTable {
    pub fn new(rules: Vec<StructuralRule>) -> Result<Self, SchemaError> {
        for (i, rule) in rules.iter().enumerate() {
            let duplicate = rules[..i]
                .iter()
                .any(|r| r.variable == rule.variable && r.value == rule.value);
            if duplicate {
                return Err(SchemaError::DuplicateRule {
                    variable: rule.variable.clone(),
                    value: rule.value.clone(),
                });
            }
        }
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[StructuralRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn is_structural(&self, variable: &str) -> bool {
        self.rules.iter().any(|r| r.variable == variable)
    }

    /// The delta for a move, `None` for a plain categorical.
    pub fn lookup(&self, variable: &str, value: &Value) -> Result<Option<&StructuralDelta>, SchemaError> {
        if !self.is_structural(variable) {
            return Ok(None);
        }
        self.rules
            .iter()
            .find(|r| r.variable == variable && &r.value == value)
            .map(|r| Some(&r.delta))
            .ok_or_else(|| SchemaError::LookupMiss {
                variable: variable.to_string(),
                value: value.clone(),
            })
    }
}
