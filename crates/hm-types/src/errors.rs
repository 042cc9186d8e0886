use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::variable::Value;

/// Main error type for the HyperMesh system
#[derive(Error, Debug)]
pub enum HmError {
    #[error("Invalid configuration: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Space validation error: {0}")]
    SpaceValidation(#[from] SpaceValidationError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A configuration violates its own invariants.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Length mismatch: expected {expected} coordinates, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Inverted bounds for {name}: lower {lower} > upper {upper}")]
    InvertedBounds { name: String, lower: f64, upper: f64 },

    #[error("Value {value} of {name} lies outside its bounds")]
    OutOfBounds { name: String, value: Value },

    #[error("Value {value} of {name} is not in its domain")]
    NotInDomain { name: String, value: Value },

    #[error("Categorical variable {name} has an empty domain")]
    EmptyDomain { name: String },

    #[error("Value {value} of {name} does not match a {expected} variable")]
    KindMismatch {
        name: String,
        expected: String,
        value: Value,
    },

    #[error("Coordinate {value} of {name} is not integral")]
    NonIntegral { name: String, value: f64 },

    #[error("Duplicate variable name: {name}")]
    DuplicateName { name: String },

    #[error("Domain of {name} repeats value {value}")]
    DuplicateDomainValue { name: String, value: Value },
}

/// Which descriptor check rejected a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationCheck {
    Dimension,
    Bounds,
    FixedValue,
    Groups,
    SharedSpace,
}

impl fmt::Display for ValidationCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Dimension => "dimension",
            Self::Bounds => "bounds",
            Self::FixedValue => "fixed value",
            Self::Groups => "variable groups",
            Self::SharedSpace => "shared space",
        };
        f.write_str(name)
    }
}

/// A well-formed configuration that does not yield a usable space descriptor.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{check} check failed{}: {detail}", at_index(.index))]
pub struct SpaceValidationError {
    pub check: ValidationCheck,
    pub index: Option<usize>,
    pub detail: String,
}

impl SpaceValidationError {
    pub fn new(check: ValidationCheck, index: Option<usize>, detail: impl Into<String>) -> Self {
        Self {
            check,
            index,
            detail: detail.into(),
        }
    }
}

fn at_index(index: &Option<usize>) -> String {
    index.map(|i| format!(" at index {i}")).unwrap_or_default()
}

/// Structural rule table errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("No structural rule for {variable} = {value}")]
    LookupMiss { variable: String, value: Value },

    #[error("Structural conflict moving {variable} to {value}: {message}")]
    StructuralConflict {
        variable: String,
        value: Value,
        message: String,
    },

    #[error("Rule targets {variable} which is not a categorical variable")]
    NotCategorical { variable: String },

    #[error("Duplicate rule for {variable} = {value}")]
    DuplicateRule { variable: String, value: Value },
}

/// Result type alias for HyperMesh operations
pub type HmResult<T> = Result<T, HmError>;

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::HmError::Config(format!($($arg)*))
    };
}
