//! # hm-optimizer
//!
//! Extended poll over conditional hyperparameter spaces for HyperMesh.
//!
//! Provides the configuration model, structural rule tables, categorical
//! neighborhood generation, space descriptor validation, and the extended
//! poll adapter a direct-search driver calls to inject categorical
//! neighbors of its incumbent.

mod builder;
mod configuration;
mod neighborhood;
mod poll;
mod run;
mod schema;

pub use builder::SpaceDescriptorBuilder;
pub use configuration::Configuration;
pub use neighborhood::{CategoricalMove, Neighbor, Neighborhood, NeighborhoodGenerator};
pub use poll::{CandidateSink, ExtendedPoll, ExtendedPollAdapter, PollPhase, PollReport, Rejection};
pub use run::{
    ExtendedPollTrigger, LatinHypercube, ProcessRole, RunContext, RunDefinition, RunId,
};
pub use schema::{AddedVariable, RuleTable, StructuralDelta, StructuralRule};
