//! Hyperparameter variables: kinds, bounds, values and their point encoding.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::descriptor::InputType;
use crate::errors::ConfigurationError;

/// A concrete variable assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Real(f64),
    Label(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Real(v) => write!(f, "{v}"),
            Self::Label(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Label(v.to_string())
    }
}

/// The search range of a variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VariableKind {
    /// Continuous range [lower, upper].
    Continuous { lower: f64, upper: f64 },
    /// Integer range [lower, upper] inclusive.
    Integer { lower: i64, upper: i64 },
    /// Finite ordered domain. Encoded in points by position.
    Categorical { domain: Vec<Value> },
}

/// One dimension of a configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    /// Unique name within a configuration (e.g. "layer2_units").
    pub name: String,
    pub kind: VariableKind,
    pub value: Value,
    /// Fixed variables keep their value in every neighbor and are excluded
    /// from search directions.
    #[serde(default)]
    pub fixed: bool,
    /// Variables sharing a group id form one variable group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl Variable {
    pub fn continuous(name: impl Into<String>, lower: f64, upper: f64, value: f64) -> Self {
        Self::with_kind(name, VariableKind::Continuous { lower, upper }, Value::Real(value))
    }

    pub fn integer(name: impl Into<String>, lower: i64, upper: i64, value: i64) -> Self {
        Self::with_kind(name, VariableKind::Integer { lower, upper }, Value::Int(value))
    }

    pub fn categorical(name: impl Into<String>, domain: Vec<Value>, value: impl Into<Value>) -> Self {
        Self::with_kind(name, VariableKind::Categorical { domain }, value.into())
    }

    fn with_kind(name: impl Into<String>, kind: VariableKind, value: Value) -> Self {
        Self {
            name: name.into(),
            kind,
            value,
            fixed: false,
            group: None,
        }
    }

    pub fn fixed(mut self) -> Self {
        self.fixed = true;
        self
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Same variable with another assignment.
    pub fn with_value(&self, value: Value) -> Self {
        Self {
            value,
            ..self.clone()
        }
    }

    pub fn is_categorical(&self) -> bool {
        matches!(self.kind, VariableKind::Categorical { .. })
    }

    pub fn domain(&self) -> Option<&[Value]> {
        match &self.kind {
            VariableKind::Categorical { domain } => Some(domain),
            _ => None,
        }
    }

    pub fn input_type(&self) -> InputType {
        match self.kind {
            VariableKind::Continuous { .. } => InputType::Continuous,
            VariableKind::Integer { .. } => InputType::Integer,
            VariableKind::Categorical { .. } => InputType::Categorical,
        }
    }

    /// Lower bound in point coordinates.
    pub fn lower(&self) -> f64 {
        match &self.kind {
            VariableKind::Continuous { lower, .. } => *lower,
            VariableKind::Integer { lower, .. } => *lower as f64,
            VariableKind::Categorical { .. } => 0.0,
        }
    }

    /// Upper bound in point coordinates.
    pub fn upper(&self) -> f64 {
        match &self.kind {
            VariableKind::Continuous { upper, .. } => *upper,
            VariableKind::Integer { upper, .. } => *upper as f64,
            VariableKind::Categorical { domain } => domain.len() as f64 - 1.0,
        }
    }

    /// The current value as a point coordinate, `None` if the value does not
    /// fit the variable's kind.
    pub fn encode(&self) -> Option<f64> {
        match (&self.kind, &self.value) {
            (VariableKind::Continuous { .. }, Value::Real(v)) => Some(*v),
            (VariableKind::Continuous { .. }, Value::Int(v)) => Some(*v as f64),
            (VariableKind::Integer { .. }, Value::Int(v)) => Some(*v as f64),
            (VariableKind::Categorical { domain }, value) => {
                domain.iter().position(|d| d == value).map(|i| i as f64)
            }
            _ => None,
        }
    }

    /// Interpret a point coordinate as a value of this variable.
    pub fn decode(&self, x: f64) -> Result<Value, ConfigurationError> {
        match &self.kind {
            VariableKind::Continuous { lower, upper } => {
                if x.is_finite() && *lower <= x && x <= *upper {
                    Ok(Value::Real(x))
                } else {
                    Err(self.out_of_bounds(Value::Real(x)))
                }
            }
            VariableKind::Integer { lower, upper } => {
                let v = self.integral(x)?;
                if *lower <= v && v <= *upper {
                    Ok(Value::Int(v))
                } else {
                    Err(self.out_of_bounds(Value::Int(v)))
                }
            }
            VariableKind::Categorical { domain } => {
                let position = self.integral(x)?;
                usize::try_from(position)
                    .ok()
                    .and_then(|i| domain.get(i))
                    .cloned()
                    .ok_or_else(|| ConfigurationError::NotInDomain {
                        name: self.name.clone(),
                        value: Value::Int(position),
                    })
            }
        }
    }

    /// Check bounds, domain and value kind.
    pub fn check(&self) -> Result<(), ConfigurationError> {
        match &self.kind {
            VariableKind::Continuous { lower, upper } => {
                // NaN bounds fail this comparison too.
                if !(lower <= upper) {
                    return Err(self.inverted(*lower, *upper));
                }
                let v = match &self.value {
                    Value::Real(v) => *v,
                    Value::Int(v) => *v as f64,
                    Value::Label(_) => return Err(self.kind_mismatch("continuous")),
                };
                if !(*lower <= v && v <= *upper) {
                    return Err(self.out_of_bounds(self.value.clone()));
                }
            }
            VariableKind::Integer { lower, upper } => {
                if lower > upper {
                    return Err(self.inverted(*lower as f64, *upper as f64));
                }
                match &self.value {
                    Value::Int(v) if lower <= v && v <= upper => {}
                    Value::Int(_) => return Err(self.out_of_bounds(self.value.clone())),
                    _ => return Err(self.kind_mismatch("integer")),
                }
            }
            VariableKind::Categorical { domain } => {
                if domain.is_empty() {
                    return Err(ConfigurationError::EmptyDomain {
                        name: self.name.clone(),
                    });
                }
                if let Some(repeated) = domain
                    .iter()
                    .enumerate()
                    .find_map(|(i, v)| domain[..i].contains(v).then_some(v))
                {
                    return Err(ConfigurationError::DuplicateDomainValue {
                        name: self.name.clone(),
                        value: repeated.clone(),
                    });
                }
                if !domain.contains(&self.value) {
                    return Err(ConfigurationError::NotInDomain {
                        name: self.name.clone(),
                        value: self.value.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn integral(&self, x: f64) -> Result<i64, ConfigurationError> {
        if x.is_finite() && x.fract() == 0.0 {
            Ok(x as i64)
        } else {
            Err(ConfigurationError::NonIntegral {
                name: self.name.clone(),
                value: x,
            })
        }
    }

    fn inverted(&self, lower: f64, upper: f64) -> ConfigurationError {
        ConfigurationError::InvertedBounds {
            name: self.name.clone(),
            lower,
            upper,
        }
    }

    fn out_of_bounds(&self, value: Value) -> ConfigurationError {
        ConfigurationError::OutOfBounds {
            name: self.name.clone(),
            value,
        }
    }

    fn kind_mismatch(&self, expected: &str) -> ConfigurationError {
        ConfigurationError::KindMismatch {
            name: self.name.clone(),
            expected: expected.to_string(),
            value: self.value.clone(),
        }
    }
}
