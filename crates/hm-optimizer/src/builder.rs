//! Turns configurations into validated space descriptors.

use hm_types::{MeshType, Point, SharedSpace, SpaceDescriptor, SpaceValidationError, ValidationCheck};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::configuration::Configuration;

/// Builds descriptors that all carry the run's shared output schema and
/// blackbox reference.
#[derive(Debug, Clone, Copy)]
pub struct SpaceDescriptorBuilder<'a> {
    shared: &'a Arc<SharedSpace>,
    mesh: MeshType,
}

impl<'a> SpaceDescriptorBuilder<'a> {
    /// Candidate descriptors always use the `Xmesh` mesh.
    pub fn new(shared: &'a Arc<SharedSpace>) -> Self {
        Self {
            shared,
            mesh: MeshType::Xmesh,
        }
    }

    pub fn with_mesh(mut self, mesh: MeshType) -> Self {
        self.mesh = mesh;
        self
    }

    /// Lay a configuration out as (x0, descriptor) without validating it.
    pub fn lay_out(&self, config: &Configuration) -> (Point, SpaceDescriptor) {
        let descriptor = SpaceDescriptor {
            dimension: config.dimension(),
            input_types: config.input_types(),
            lower_bounds: config.lower_bounds(),
            upper_bounds: config.upper_bounds(),
            fixed: config.fixed_indices(),
            groups: config.variable_groups(),
            mesh: self.mesh,
            shared: Arc::clone(self.shared),
        };
        (config.point(), descriptor)
    }

    pub fn build(&self, config: &Configuration) -> Result<(Point, SpaceDescriptor), SpaceValidationError> {
        let (point, descriptor) = self.lay_out(config);
        self.validate(&point, &descriptor, config)?;
        Ok((point, descriptor))
    }

    /// Build a neighbor of `base`. Fixed variables must keep the values
    /// recorded in `base`, wherever the move placed them.
    pub fn build_neighbor(
        &self,
        candidate: &Configuration,
        base: &Configuration,
    ) -> Result<(Point, SpaceDescriptor), SpaceValidationError> {
        let (point, descriptor) = self.lay_out(candidate);
        self.validate_against(&point, &descriptor, candidate, base)?;
        Ok((point, descriptor))
    }

    /// Run every descriptor check, in order, against the configuration the
    /// descriptor claims to describe.
    pub fn validate(
        &self,
        point: &Point,
        descriptor: &SpaceDescriptor,
        config: &Configuration,
    ) -> Result<(), SpaceValidationError> {
        self.validate_against(point, descriptor, config, config)
    }

    /// Like [`validate`](Self::validate), but fixed values are looked up by
    /// name in `recorded`. Fixed variables `recorded` lacks are compared with
    /// their own value in `config`.
    pub fn validate_against(
        &self,
        point: &Point,
        descriptor: &SpaceDescriptor,
        config: &Configuration,
        recorded: &Configuration,
    ) -> Result<(), SpaceValidationError> {
        check_dimension(point, descriptor, config)?;
        check_bounds(point, descriptor)?;
        check_fixed(point, descriptor, config, recorded)?;
        check_groups(descriptor)?;

        if !descriptor.shares(self.shared) {
            return Err(SpaceValidationError::new(
                ValidationCheck::SharedSpace,
                None,
                "descriptor does not carry the run's output types and blackbox",
            ));
        }
        Ok(())
    }
}

fn check_dimension(
    point: &Point,
    descriptor: &SpaceDescriptor,
    config: &Configuration,
) -> Result<(), SpaceValidationError> {
    let n = config.dimension();
    let lengths = [
        ("dimension", descriptor.dimension),
        ("input types", descriptor.input_types.len()),
        ("lower bounds", descriptor.lower_bounds.len()),
        ("upper bounds", descriptor.upper_bounds.len()),
        ("point", point.len()),
    ];
    for (what, len) in lengths {
        if len != n {
            return Err(SpaceValidationError::new(
                ValidationCheck::Dimension,
                None,
                format!("{what} has length {len}, expected {n} active variables"),
            ));
        }
    }
    Ok(())
}

fn check_bounds(point: &Point, descriptor: &SpaceDescriptor) -> Result<(), SpaceValidationError> {
    let rows = descriptor
        .lower_bounds
        .iter()
        .zip(&descriptor.upper_bounds)
        .zip(&point.coordinates)
        .enumerate();

    for (i, ((&lower, &upper), &x)) in rows {
        let fail = |detail: String| SpaceValidationError::new(ValidationCheck::Bounds, Some(i), detail);
        if !lower.is_finite() || !upper.is_finite() {
            return Err(fail(format!("bounds [{lower}, {upper}] are not finite")));
        }
        if lower > upper {
            return Err(fail(format!("lower {lower} > upper {upper}")));
        }
        if !(lower <= x && x <= upper) {
            return Err(fail(format!("value {x} outside [{lower}, {upper}]")));
        }
    }
    Ok(())
}

fn check_fixed(
    point: &Point,
    descriptor: &SpaceDescriptor,
    config: &Configuration,
    recorded: &Configuration,
) -> Result<(), SpaceValidationError> {
    for &i in &descriptor.fixed {
        let fail = |detail: String| SpaceValidationError::new(ValidationCheck::FixedValue, Some(i), detail);
        let (Some(&x), Some(var)) = (point.coordinates.get(i), config.variable(i)) else {
            return Err(fail(format!("fixed index out of range for dimension {}", descriptor.dimension)));
        };
        let expected = recorded
            .index_of(&var.name)
            .and_then(|j| recorded.variable(j))
            .unwrap_or(var);
        if expected.encode() != Some(x) {
            return Err(fail(format!("{} is {x}, recorded value is {}", var.name, expected.value)));
        }
    }
    Ok(())
}

fn check_groups(descriptor: &SpaceDescriptor) -> Result<(), SpaceValidationError> {
    let mut claimed = BTreeSet::new();
    for group in &descriptor.groups {
        if group.is_empty() {
            return Err(SpaceValidationError::new(
                ValidationCheck::Groups,
                None,
                "empty variable group",
            ));
        }
        for &i in group {
            let fail = |detail: &str| SpaceValidationError::new(ValidationCheck::Groups, Some(i), detail);
            if i >= descriptor.dimension {
                return Err(fail("group index out of range"));
            }
            if !claimed.insert(i) {
                return Err(fail("index belongs to more than one group"));
            }
        }
    }
    Ok(())
}
