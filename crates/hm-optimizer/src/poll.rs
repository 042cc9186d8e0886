//! Extended poll: the driver's hook for injecting categorical neighbors.

use hm_types::{ConfigurationError, Point, SchemaError, SharedSpace, SpaceDescriptor, SpaceValidationError};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::builder::SpaceDescriptorBuilder;
use crate::configuration::Configuration;
use crate::neighborhood::{CategoricalMove, NeighborhoodGenerator};
use crate::schema::RuleTable;

/// The driver's candidate pool, as seen from the extended poll.
pub trait CandidateSink {
    /// Offer a candidate; returns `false` if the sink already holds it.
    fn register(&mut self, point: Point, descriptor: SpaceDescriptor) -> bool;
}

impl CandidateSink for Vec<(Point, SpaceDescriptor)> {
    fn register(&mut self, point: Point, descriptor: SpaceDescriptor) -> bool {
        self.push((point, descriptor));
        true
    }
}

/// Capability the driver calls when its extended-poll trigger fires.
pub trait ExtendedPoll: Send + Sync {
    /// Register the categorical neighbors of `incumbent` with `sink`.
    ///
    /// Only a malformed incumbent is an error; rejected neighbors are
    /// reported in the returned [`PollReport`].
    fn construct_extended_points(
        &self,
        incumbent: &Point,
        configuration: &Configuration,
        sink: &mut dyn CandidateSink,
    ) -> Result<PollReport, ConfigurationError>;
}

/// Where an extended poll call is. Nothing survives the return to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    Idle,
    Triggered,
    Generating,
    Validating,
    Registering,
}

/// A neighbor that failed descriptor validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub change: CategoricalMove,
    pub error: SpaceValidationError,
}

/// Outcome of one extended poll call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollReport {
    pub generated: usize,
    pub registered: usize,
    /// Valid neighbors the sink already held.
    pub duplicates: usize,
    pub rejected: Vec<Rejection>,
    pub misses: Vec<SchemaError>,
    pub conflicts: Vec<SchemaError>,
}

/// Generates, validates and registers categorical neighbors.
#[derive(Debug, Clone, Copy)]
pub struct ExtendedPollAdapter<'a> {
    generator: NeighborhoodGenerator<'a>,
    builder: SpaceDescriptorBuilder<'a>,
}

impl<'a> ExtendedPollAdapter<'a> {
    pub fn new(rules: &'a RuleTable, shared: &'a Arc<SharedSpace>) -> Self {
        Self {
            generator: NeighborhoodGenerator::new(rules),
            builder: SpaceDescriptorBuilder::new(shared),
        }
    }
}

impl ExtendedPoll for ExtendedPollAdapter<'_> {
    fn construct_extended_points(
        &self,
        incumbent: &Point,
        configuration: &Configuration,
        sink: &mut dyn CandidateSink,
    ) -> Result<PollReport, ConfigurationError> {
        debug!("Extended poll {:?} at {:?}", PollPhase::Triggered, incumbent.coordinates);
        let current = configuration.with_point(incumbent).inspect_err(|e| {
            warn!("Incumbent does not match its configuration: {}", e);
        })?;

        debug!("Extended poll {:?}", PollPhase::Generating);
        let neighborhood = self.generator.generate(&current);

        let mut report = PollReport {
            generated: neighborhood.neighbors.len(),
            misses: neighborhood.misses,
            conflicts: neighborhood.conflicts,
            ..PollReport::default()
        };

        for neighbor in neighborhood.neighbors {
            debug!(
                "Extended poll {:?}: {} {} -> {}",
                PollPhase::Validating,
                neighbor.change.variable,
                neighbor.change.from,
                neighbor.change.to
            );
            match self.builder.build_neighbor(&neighbor.configuration, &current) {
                Ok((point, descriptor)) => {
                    debug!("Extended poll {:?}: {}", PollPhase::Registering, descriptor.summary());
                    if sink.register(point, descriptor) {
                        report.registered += 1;
                    } else {
                        debug!(
                            "Sink already holds neighbor {} = {}",
                            neighbor.change.variable, neighbor.change.to
                        );
                        report.duplicates += 1;
                    }
                }
                Err(error) => {
                    warn!(
                        "Rejected neighbor {} = {}: {}",
                        neighbor.change.variable, neighbor.change.to, error
                    );
                    report.rejected.push(Rejection {
                        change: neighbor.change,
                        error,
                    });
                }
            }
        }

        info!(
            "Extended poll registered {} of {} neighbors ({} rejected, {} duplicate, {} without rule)",
            report.registered,
            report.generated,
            report.rejected.len(),
            report.duplicates,
            report.misses.len()
        );
        debug!("Extended poll {:?}", PollPhase::Idle);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{StructuralDelta, StructuralRule};
    use hm_types::{BlackboxRef, OutputType, ValidationCheck, Value, Variable};

    fn shared() -> Arc<SharedSpace> {
        Arc::new(SharedSpace {
            output_types: vec![OutputType::Obj, OutputType::Eb],
            blackbox: BlackboxRef::new("./bb.py"),
        })
    }

    fn base() -> Configuration {
        Configuration::new(vec![
            Variable::categorical("num_conv", vec![0.into(), 1.into(), 2.into()], 1),
            Variable::integer("conv1_filters", 4, 128, 32).in_group("conv1"),
            Variable::categorical("activation", vec!["relu".into(), "tanh".into()], "relu"),
            Variable::continuous("lr", 1e-4, 1.0, 0.1).fixed(),
        ])
        .unwrap()
    }

    fn rules(bad_filters: bool) -> RuleTable {
        let (lower, upper) = if bad_filters { (128, 4) } else { (4, 128) };
        RuleTable::new(vec![
            StructuralRule::new("num_conv", 0, StructuralDelta::new().remove("conv1_filters").remove("conv2_filters")),
            StructuralRule::new("num_conv", 1, StructuralDelta::new().remove("conv2_filters")),
            StructuralRule::new(
                "num_conv",
                2,
                StructuralDelta::new().add_after(
                    "conv1_filters",
                    Variable::integer("conv2_filters", lower, upper, 16).in_group("conv2"),
                ),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn registers_every_valid_neighbor() {
        let shared = shared();
        let rules = rules(false);
        let config = base();
        let adapter = ExtendedPollAdapter::new(&rules, &shared);

        let mut pool: Vec<(Point, SpaceDescriptor)> = Vec::new();
        let report = adapter
            .construct_extended_points(&config.point(), &config, &mut pool)
            .unwrap();

        assert_eq!(report.generated, 3);
        assert_eq!(report.registered, 3);
        assert!(report.rejected.is_empty());
        assert_eq!(pool.len(), 3);

        let dims: Vec<usize> = pool.iter().map(|(_, d)| d.dimension).collect();
        assert_eq!(dims, vec![3, 5, 4]);
        for (point, descriptor) in &pool {
            assert_eq!(point.len(), descriptor.dimension);
            assert!(descriptor.shares(&shared));
        }
    }

    #[test]
    fn one_bad_neighbor_does_not_stop_the_rest() {
        let shared = shared();
        let rules = rules(true);
        let config = base();
        let adapter = ExtendedPollAdapter::new(&rules, &shared);

        let mut pool: Vec<(Point, SpaceDescriptor)> = Vec::new();
        let report = adapter
            .construct_extended_points(&config.point(), &config, &mut pool)
            .unwrap();

        assert_eq!(report.generated, 3);
        assert_eq!(report.registered, 2);
        assert_eq!(pool.len(), 2);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].change.to, Value::Int(2));
        assert_eq!(report.rejected[0].error.check, ValidationCheck::Bounds);
    }

    #[test]
    fn validated_neighbors_stay_in_bounds() {
        let shared = shared();
        let rules = rules(false);
        let config = base();
        let mut pool: Vec<(Point, SpaceDescriptor)> = Vec::new();
        ExtendedPollAdapter::new(&rules, &shared)
            .construct_extended_points(&config.point(), &config, &mut pool)
            .unwrap();

        for (point, descriptor) in &pool {
            for (i, x) in point.coordinates.iter().enumerate() {
                assert!(descriptor.lower_bounds[i] <= *x && *x <= descriptor.upper_bounds[i]);
            }
        }
    }

    #[test]
    fn incumbent_point_drives_generation() {
        let shared = shared();
        let rules = rules(false);
        let config = base();
        let mut pool: Vec<(Point, SpaceDescriptor)> = Vec::new();

        // Driver moved to num_conv = 2 with 64 filters and tanh.
        let incumbent = Point::new(vec![2.0, 64.0, 1.0, 0.1]);
        ExtendedPollAdapter::new(&rules, &shared)
            .construct_extended_points(&incumbent, &config, &mut pool)
            .unwrap();

        // num_conv -> 0, num_conv -> 1, activation -> relu
        assert_eq!(pool.len(), 3);
        assert_eq!(pool[1].0.coordinates, vec![1.0, 64.0, 1.0, 0.1]);
        assert_eq!(pool[2].0.coordinates, vec![2.0, 64.0, 0.0, 0.1]);
    }

    #[test]
    fn malformed_incumbent_is_fatal() {
        let shared = shared();
        let rules = rules(false);
        let config = base();
        let mut pool: Vec<(Point, SpaceDescriptor)> = Vec::new();

        let result = ExtendedPollAdapter::new(&rules, &shared).construct_extended_points(
            &Point::new(vec![1.0, 32.0]),
            &config,
            &mut pool,
        );
        assert!(matches!(
            result,
            Err(ConfigurationError::LengthMismatch { .. })
        ));
        assert!(pool.is_empty());
    }

    /// Sink that refuses points it has already accepted.
    #[derive(Default)]
    struct KnownPoints(Vec<Point>);

    impl CandidateSink for KnownPoints {
        fn register(&mut self, point: Point, _descriptor: SpaceDescriptor) -> bool {
            if self.0.contains(&point) {
                return false;
            }
            self.0.push(point);
            true
        }
    }

    #[test]
    fn refused_candidates_are_not_counted_as_registered() {
        let shared = shared();
        let rules = rules(false);
        let config = base();
        let adapter = ExtendedPollAdapter::new(&rules, &shared);
        let mut sink = KnownPoints::default();

        let first = adapter
            .construct_extended_points(&config.point(), &config, &mut sink)
            .unwrap();
        assert_eq!((first.registered, first.duplicates), (3, 0));

        let again = adapter
            .construct_extended_points(&config.point(), &config, &mut sink)
            .unwrap();
        assert_eq!(again.generated, 3);
        assert_eq!((again.registered, again.duplicates), (0, 3));
        assert_eq!(sink.0.len(), 3);
    }

    #[test]
    fn adapter_is_usable_as_trait_object() {
        let shared = shared();
        let rules = RuleTable::default();
        let adapter = ExtendedPollAdapter::new(&rules, &shared);
        let hook: &dyn ExtendedPoll = &adapter;

        let config = Configuration::new(vec![Variable::continuous("x", 0.0, 1.0, 0.5)]).unwrap();
        let mut pool: Vec<(Point, SpaceDescriptor)> = Vec::new();
        let report = hook
            .construct_extended_points(&config.point(), &config, &mut pool)
            .unwrap();
        assert_eq!(report, PollReport::default());
        assert!(pool.is_empty());
    }
}
