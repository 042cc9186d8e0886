//! Space descriptors handed to the search driver.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Per-coordinate input type as understood by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputType {
    #[serde(rename = "R")]
    Continuous,
    #[serde(rename = "I")]
    Integer,
    #[serde(rename = "C")]
    Categorical,
}

/// Blackbox output kinds, shared by every descriptor of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutputType {
    /// Objective value.
    Obj,
    /// Constraint handled by the progressive barrier.
    Pb,
    /// Constraint handled by the extreme barrier.
    Eb,
    /// Whether the evaluation counts toward the budget.
    CntEval,
    /// Ignored output.
    Nothing,
}

/// Mesh discretization requested from the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MeshType {
    #[default]
    Xmesh,
    Smesh,
    Gmesh,
}

/// Reference to the blackbox executable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlackboxRef {
    pub executable: String,
}

impl BlackboxRef {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
        }
    }
}

/// Run-wide descriptor fields. Candidates attach the run's instance, never
/// their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedSpace {
    pub output_types: Vec<OutputType>,
    pub blackbox: BlackboxRef,
}

/// An evaluation point in driver coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Point {
    pub coordinates: Vec<f64>,
}

impl Point {
    pub fn new(coordinates: Vec<f64>) -> Self {
        Self { coordinates }
    }

    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    /// Bitwise identity key, used to spot duplicate registrations.
    pub fn key(&self) -> Vec<u64> {
        self.coordinates.iter().map(|x| x.to_bits()).collect()
    }
}

impl From<Vec<f64>> for Point {
    fn from(coordinates: Vec<f64>) -> Self {
        Self::new(coordinates)
    }
}

/// Everything the driver needs to treat a point as evaluable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceDescriptor {
    pub dimension: usize,
    pub input_types: Vec<InputType>,
    pub lower_bounds: Vec<f64>,
    pub upper_bounds: Vec<f64>,
    pub fixed: BTreeSet<usize>,
    pub groups: Vec<BTreeSet<usize>>,
    pub mesh: MeshType,
    pub shared: Arc<SharedSpace>,
}

impl SpaceDescriptor {
    /// Whether this descriptor carries exactly the given shared instance.
    pub fn shares(&self, shared: &Arc<SharedSpace>) -> bool {
        Arc::ptr_eq(&self.shared, shared)
    }

    /// Short human-readable summary used in logs.
    pub fn summary(&self) -> String {
        format!(
            "dim={} fixed={} groups={} bb={}",
            self.dimension,
            self.fixed.len(),
            self.groups.len(),
            self.shared.blackbox.executable
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_identity_is_by_handle() {
        let shared = Arc::new(SharedSpace {
            output_types: vec![OutputType::Obj],
            blackbox: BlackboxRef::new("./bb.py"),
        });
        let twin = Arc::new(shared.as_ref().clone());

        let descriptor = SpaceDescriptor {
            dimension: 1,
            input_types: vec![InputType::Continuous],
            lower_bounds: vec![0.0],
            upper_bounds: vec![1.0],
            fixed: BTreeSet::new(),
            groups: Vec::new(),
            mesh: MeshType::Xmesh,
            shared: Arc::clone(&shared),
        };

        assert!(descriptor.shares(&shared));
        assert!(!descriptor.shares(&twin));
        assert_eq!(descriptor.summary(), "dim=1 fixed=0 groups=0 bb=./bb.py");
    }

    #[test]
    fn output_types_use_driver_names() {
        let json = serde_json::to_string(&vec![OutputType::Obj, OutputType::CntEval]).unwrap();
        assert_eq!(json, r#"["OBJ","CNT_EVAL"]"#);
        let back: Vec<InputType> = serde_json::from_str(r#"["R","I","C"]"#).unwrap();
        assert_eq!(
            back,
            vec![InputType::Continuous, InputType::Integer, InputType::Categorical]
        );
    }

    #[test]
    fn point_key_distinguishes_coordinates() {
        let a = Point::new(vec![1.0, 0.5]);
        let b = Point::from(vec![1.0, 0.25]);
        assert_ne!(a.key(), b.key());
        assert_eq!(a.key(), a.clone().key());
        assert_eq!(a.len(), 2);
    }
}
