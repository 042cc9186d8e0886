//! Run definition and the run context shared by every component of a run.

use chrono::{DateTime, Utc};
use hm_types::{
    config_error, BlackboxRef, HmResult, MeshType, OutputType, Point, SchemaError, SharedSpace,
    SpaceDescriptor, Variable,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::builder::SpaceDescriptorBuilder;
use crate::configuration::Configuration;
use crate::poll::ExtendedPollAdapter;
use crate::schema::{RuleTable, StructuralRule};

/// Unique run identifier.
pub type RunId = Uuid;

/// Role of this process in a master/worker evaluation setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessRole {
    Master,
    Worker { rank: usize },
}

impl Default for ProcessRole {
    fn default() -> Self {
        Self::Master
    }
}

/// Latin hypercube sampling counts handed to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatinHypercube {
    /// Points sampled before the first iteration.
    pub initial: usize,
    /// Points sampled at each iteration.
    pub iterative: usize,
}

impl Default for LatinHypercube {
    fn default() -> Self {
        Self {
            initial: 0,
            iterative: 5,
        }
    }
}

/// Driver policy deciding when an extended poll is worth running around a
/// point that lost to the incumbent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtendedPollTrigger {
    pub value: f64,
    /// Scale `value` by the incumbent's objective magnitude.
    pub relative: bool,
}

impl Default for ExtendedPollTrigger {
    fn default() -> Self {
        Self {
            value: 10.0,
            relative: false,
        }
    }
}

impl ExtendedPollTrigger {
    /// Whether a point with objective `candidate` is close enough to the
    /// incumbent objective `incumbent` to be polled around.
    pub fn fires(&self, incumbent: f64, candidate: f64) -> bool {
        let margin = if self.relative {
            self.value * incumbent.abs()
        } else {
            self.value
        };
        candidate < incumbent + margin
    }
}

fn default_max_bb_eval() -> usize {
    100
}

fn default_display_degree() -> u8 {
    3
}

fn default_stats_file() -> String {
    "stats.txt".to_string()
}

fn default_history_file() -> String {
    "history.txt".to_string()
}

/// Everything read from a run definition file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunDefinition {
    pub name: String,
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub rules: Vec<StructuralRule>,
    pub output_types: Vec<OutputType>,
    pub blackbox: String,
    #[serde(default = "default_max_bb_eval")]
    pub max_bb_eval: usize,
    #[serde(default)]
    pub lh_search: LatinHypercube,
    #[serde(default)]
    pub extended_poll_trigger: ExtendedPollTrigger,
    #[serde(default)]
    pub mesh: MeshType,
    #[serde(default = "default_display_degree")]
    pub display_degree: u8,
    #[serde(default = "default_stats_file")]
    pub stats_file: String,
    #[serde(default = "default_history_file")]
    pub history_file: String,
}

impl RunDefinition {
    pub fn from_json_str(json: &str) -> HmResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> HmResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }
}

/// Immutable state of one run, constructed at startup and passed by
/// reference to every component that needs it.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub id: RunId,
    pub name: String,
    pub role: ProcessRole,
    pub max_bb_eval: usize,
    pub lh_search: LatinHypercube,
    pub extended_poll_trigger: ExtendedPollTrigger,
    pub mesh: MeshType,
    pub display_degree: u8,
    pub stats_file: String,
    pub history_file: String,
    pub created_at: DateTime<Utc>,
    base: Configuration,
    rules: RuleTable,
    shared: Arc<SharedSpace>,
}

impl RunContext {
    /// Validate a definition and build the run context. Any error here is
    /// fatal to the run.
    pub fn from_definition(definition: RunDefinition, role: ProcessRole) -> HmResult<Self> {
        let result = Self::assemble(definition, role);
        if let Err(e) = &result {
            if role == ProcessRole::Master {
                error!("Run definition rejected: {}", e);
            }
        }
        result
    }

    fn assemble(definition: RunDefinition, role: ProcessRole) -> HmResult<Self> {
        if definition.output_types.is_empty() {
            return Err(config_error!("run {} declares no output types", definition.name));
        }
        if definition.blackbox.trim().is_empty() {
            return Err(config_error!("run {} declares no blackbox", definition.name));
        }

        let base = Configuration::new(definition.variables)?;
        let rules = RuleTable::new(definition.rules)?;
        for rule in rules.rules() {
            if base.variables().iter().any(|v| v.name == rule.variable && !v.is_categorical()) {
                return Err(SchemaError::NotCategorical {
                    variable: rule.variable.clone(),
                }
                .into());
            }
        }

        let shared = Arc::new(SharedSpace {
            output_types: definition.output_types,
            blackbox: BlackboxRef::new(definition.blackbox),
        });

        let context = Self {
            id: Uuid::new_v4(),
            name: definition.name,
            role,
            max_bb_eval: definition.max_bb_eval,
            lh_search: definition.lh_search,
            extended_poll_trigger: definition.extended_poll_trigger,
            mesh: definition.mesh,
            display_degree: definition.display_degree,
            stats_file: definition.stats_file,
            history_file: definition.history_file,
            created_at: Utc::now(),
            base,
            rules,
            shared,
        };
        // The base descriptor must be valid before any poll can run.
        context.base_descriptor()?;

        info!(
            "Run {} ({}) ready: dimension {}, {} structural rules, budget {}",
            context.name,
            context.id,
            context.base.dimension(),
            context.rules.len(),
            context.max_bb_eval
        );
        Ok(context)
    }

    pub fn with_max_bb_eval(mut self, n: usize) -> Self {
        self.max_bb_eval = n;
        self
    }

    pub fn with_extended_poll_trigger(mut self, value: f64, relative: bool) -> Self {
        self.extended_poll_trigger = ExtendedPollTrigger { value, relative };
        self
    }

    pub fn with_lh_search(mut self, initial: usize, iterative: usize) -> Self {
        self.lh_search = LatinHypercube { initial, iterative };
        self
    }

    pub fn is_master(&self) -> bool {
        self.role == ProcessRole::Master
    }

    pub fn base(&self) -> &Configuration {
        &self.base
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn shared(&self) -> &Arc<SharedSpace> {
        &self.shared
    }

    /// The starting point and its descriptor, using the run's mesh.
    pub fn base_descriptor(&self) -> HmResult<(Point, SpaceDescriptor)> {
        let builder = SpaceDescriptorBuilder::new(&self.shared).with_mesh(self.mesh);
        Ok(builder.build(&self.base)?)
    }

    pub fn adapter(&self) -> ExtendedPollAdapter<'_> {
        ExtendedPollAdapter::new(&self.rules, &self.shared)
    }
}
