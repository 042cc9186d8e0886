//! Categorical neighborhoods: every configuration one categorical move away.

use hm_types::{SchemaError, Value, Variable};
use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

use crate::configuration::Configuration;
use crate::schema::{RuleTable, StructuralDelta};

/// The single categorical change that produced a neighbor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoricalMove {
    pub variable: String,
    pub from: Value,
    pub to: Value,
}

/// A neighbor configuration and the move that reached it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Neighbor {
    pub configuration: Configuration,
    pub change: CategoricalMove,
}

/// Output of one generation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Neighborhood {
    /// Neighbors in variable order, then domain order.
    pub neighbors: Vec<Neighbor>,
    /// Moves skipped because no rule covers them.
    pub misses: Vec<SchemaError>,
    /// Moves whose rule would leave an inconsistent variable set.
    pub conflicts: Vec<SchemaError>,
}

impl Neighborhood {
    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }
}

/// Enumerates single-move categorical neighbors of a configuration.
///
/// Generation is a pure function of the base configuration and the rule
/// table: the same input always yields the same neighbors in the same order.
#[derive(Debug, Clone, Copy)]
pub struct NeighborhoodGenerator<'a> {
    rules: &'a RuleTable,
}

impl<'a> NeighborhoodGenerator<'a> {
    pub fn new(rules: &'a RuleTable) -> Self {
        Self { rules }
    }

    pub fn generate(&self, base: &Configuration) -> Neighborhood {
        let mut neighborhood = Neighborhood::default();

        for (index, var) in base.variables().iter().enumerate() {
            if var.fixed {
                continue;
            }
            let Some(domain) = var.domain() else {
                continue;
            };

            for target in domain.iter().filter(|v| **v != var.value) {
                let delta = match self.rules.lookup(&var.name, target) {
                    Ok(delta) => delta,
                    Err(miss) => {
                        debug!("Skipping move: {}", miss);
                        neighborhood.misses.push(miss);
                        continue;
                    }
                };

                match apply_move(base, index, target, delta) {
                    Ok(configuration) => neighborhood.neighbors.push(Neighbor {
                        configuration,
                        change: CategoricalMove {
                            variable: var.name.clone(),
                            from: var.value.clone(),
                            to: target.clone(),
                        },
                    }),
                    Err(conflict) => {
                        debug!("Dropping neighbor: {}", conflict);
                        neighborhood.conflicts.push(conflict);
                    }
                }
            }
        }

        debug!(
            "Generated {} neighbors ({} misses, {} conflicts) from dimension {}",
            neighborhood.neighbors.len(),
            neighborhood.misses.len(),
            neighborhood.conflicts.len(),
            base.dimension()
        );
        neighborhood
    }
}

fn apply_move(
    base: &Configuration,
    index: usize,
    target: &Value,
    delta: Option<&StructuralDelta>,
) -> Result<Configuration, SchemaError> {
    let moved = &base.variables()[index];
    let conflict = |message: String| SchemaError::StructuralConflict {
        variable: moved.name.clone(),
        value: target.clone(),
        message,
    };

    let mut variables: Vec<Variable> = base.variables().to_vec();
    variables[index] = moved.with_value(target.clone());

    if let Some(delta) = delta {
        for name in &delta.removed {
            if *name == moved.name {
                return Err(conflict("rule removes the moved variable".to_string()));
            }
            let Some(pos) = variables.iter().position(|v| v.name == *name) else {
                continue;
            };
            if variables[pos].fixed {
                return Err(conflict(format!("rule removes fixed variable {name}")));
            }
            variables.remove(pos);
        }

        for added in &delta.added {
            if variables.iter().any(|v| v.name == added.variable.name) {
                continue;
            }
            let at = added
                .after
                .as_deref()
                .and_then(|anchor| variables.iter().position(|v| v.name == anchor))
                .map_or(variables.len(), |pos| pos + 1);
            variables.insert(at, added.variable.clone());
        }
    }

    let duplicate = {
        let mut names = HashSet::new();
        variables
            .iter()
            .find(|v| !names.insert(v.name.as_str()))
            .map(|v| v.name.clone())
    };
    if let Some(name) = duplicate {
        return Err(conflict(format!("duplicate variable {name}")));
    }

    Ok(Configuration::assemble(variables))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::StructuralRule;

    fn layer(n: usize) -> [Variable; 2] {
        let group = format!("layer{n}");
        [
            Variable::continuous(format!("layer{n}_dropout"), 0.0, 0.9, 0.2).in_group(&group),
            Variable::continuous(format!("layer{n}_l2"), 0.0, 0.1, 0.001).in_group(&group),
        ]
    }

    fn layer_rules() -> RuleTable {
        let [l2_dropout, l2_l2] = layer(2);
        let [l3_dropout, l3_l2] = layer(3);
        let add_layer2 = StructuralDelta::new()
            .add_after("layer1_l2", l2_dropout)
            .add_after("layer2_dropout", l2_l2);
        let add_layer3 = add_layer2
            .clone()
            .add_after("layer2_l2", l3_dropout)
            .add_after("layer3_dropout", l3_l2);

        RuleTable::new(vec![
            StructuralRule::new(
                "num_layers",
                1,
                StructuralDelta::new()
                    .remove("layer2_dropout")
                    .remove("layer2_l2")
                    .remove("layer3_dropout")
                    .remove("layer3_l2"),
            ),
            StructuralRule::new(
                "num_layers",
                2,
                add_layer2.remove("layer3_dropout").remove("layer3_l2"),
            ),
            StructuralRule::new("num_layers", 3, add_layer3),
        ])
        .unwrap()
    }

    fn two_layer_net() -> Configuration {
        let [l1_dropout, l1_l2] = layer(1);
        let [l2_dropout, l2_l2] = layer(2);
        Configuration::new(vec![
            Variable::categorical("num_layers", vec![1.into(), 2.into(), 3.into()], 2),
            l1_dropout.with_value(Value::Real(0.35)),
            l1_l2,
            l2_dropout,
            l2_l2,
        ])
        .unwrap()
    }

    fn names(config: &Configuration) -> Vec<&str> {
        config.variables().iter().map(|v| v.name.as_str()).collect()
    }

    #[test]
    fn num_layers_changes_dimension() {
        let rules = layer_rules();
        let base = two_layer_net();
        assert_eq!(base.dimension(), 5);

        let neighborhood = NeighborhoodGenerator::new(&rules).generate(&base);
        assert_eq!(neighborhood.len(), 2);
        assert!(neighborhood.misses.is_empty());

        let one = &neighborhood.neighbors[0].configuration;
        assert_eq!(one.dimension(), 3);
        assert_eq!(one.value("num_layers"), Some(&Value::Int(1)));
        assert_eq!(names(one), vec!["num_layers", "layer1_dropout", "layer1_l2"]);
        assert_eq!(one.value("layer1_dropout"), Some(&Value::Real(0.35)));

        let three = &neighborhood.neighbors[1].configuration;
        assert_eq!(three.dimension(), 7);
        assert_eq!(
            names(three),
            vec![
                "num_layers",
                "layer1_dropout",
                "layer1_l2",
                "layer2_dropout",
                "layer2_l2",
                "layer3_dropout",
                "layer3_l2",
            ]
        );
        assert_eq!(three.value("layer1_dropout"), Some(&Value::Real(0.35)));
        assert_eq!(three.variable_groups().len(), 3);
        assert_eq!(neighborhood.neighbors[1].change.from, Value::Int(2));
        assert_eq!(neighborhood.neighbors[1].change.to, Value::Int(3));
    }

    #[test]
    fn plain_categorical_yields_k_minus_one() {
        let rules = RuleTable::default();
        let base = Configuration::new(vec![
            Variable::categorical(
                "activation",
                vec!["relu".into(), "tanh".into(), "elu".into(), "gelu".into()],
                "tanh",
            ),
            Variable::continuous("lr", 1e-5, 1.0, 0.01),
        ])
        .unwrap();

        let neighborhood = NeighborhoodGenerator::new(&rules).generate(&base);
        assert_eq!(neighborhood.len(), 3);
        let targets: Vec<&Value> = neighborhood.neighbors.iter().map(|n| &n.change.to).collect();
        assert_eq!(
            targets,
            vec![&Value::from("relu"), &Value::from("elu"), &Value::from("gelu")]
        );
        for neighbor in &neighborhood.neighbors {
            assert_eq!(neighbor.configuration.dimension(), 2);
            assert_eq!(neighbor.configuration.variables()[1], base.variables()[1]);
        }
    }

    #[test]
    fn generation_is_deterministic() {
        let rules = layer_rules();
        let base = two_layer_net();
        let generator = NeighborhoodGenerator::new(&rules);
        assert_eq!(generator.generate(&base), generator.generate(&base));
    }

    #[test]
    fn fixed_values_are_preserved() {
        let rules = layer_rules();
        let mut variables = two_layer_net().variables().to_vec();
        variables.insert(1, Variable::continuous("learning_rate", 1e-5, 1.0, 0.003).fixed());
        let base = Configuration::new(variables).unwrap();

        let neighborhood = NeighborhoodGenerator::new(&rules).generate(&base);
        assert_eq!(neighborhood.len(), 2);
        for neighbor in &neighborhood.neighbors {
            for i in base.fixed_indices() {
                assert_eq!(neighbor.configuration.variables()[i], base.variables()[i]);
            }
        }
    }

    #[test]
    fn fixed_and_singleton_categoricals_do_not_move() {
        let rules = RuleTable::default();
        let base = Configuration::new(vec![
            Variable::categorical("optimizer", vec!["adam".into(), "sgd".into()], "adam").fixed(),
            Variable::categorical("loss", vec!["xent".into()], "xent"),
            Variable::integer("batch_size", 16, 512, 128),
        ])
        .unwrap();
        assert!(NeighborhoodGenerator::new(&rules).generate(&base).is_empty());
    }

    #[test]
    fn no_categorical_means_no_neighbors() {
        let rules = layer_rules();
        let base = Configuration::new(vec![
            Variable::integer("epochs", 1, 100, 10),
            Variable::continuous("momentum", 0.0, 1.0, 0.9),
        ])
        .unwrap();
        let neighborhood = NeighborhoodGenerator::new(&rules).generate(&base);
        assert!(neighborhood.is_empty());
        assert!(neighborhood.misses.is_empty());
    }

    #[test]
    fn missing_rule_omits_the_move() {
        let rules = RuleTable::new(vec![StructuralRule::new(
            "num_layers",
            1,
            StructuralDelta::new().remove("layer2_dropout").remove("layer2_l2"),
        )])
        .unwrap();
        let neighborhood = NeighborhoodGenerator::new(&rules).generate(&two_layer_net());

        assert_eq!(neighborhood.len(), 1);
        assert_eq!(neighborhood.neighbors[0].configuration.dimension(), 3);
        assert_eq!(
            neighborhood.misses,
            vec![SchemaError::LookupMiss {
                variable: "num_layers".into(),
                value: Value::Int(3),
            }]
        );
    }

    #[test]
    fn removing_fixed_or_moved_variable_is_a_conflict() {
        let rules = RuleTable::new(vec![
            StructuralRule::new("num_layers", 1, StructuralDelta::new().remove("layer2_dropout")),
            StructuralRule::new("num_layers", 3, StructuralDelta::new().remove("num_layers")),
        ])
        .unwrap();
        let mut variables = two_layer_net().variables().to_vec();
        variables[3].fixed = true;
        let base = Configuration::new(variables).unwrap();

        let neighborhood = NeighborhoodGenerator::new(&rules).generate(&base);
        assert!(neighborhood.is_empty());
        assert_eq!(neighborhood.conflicts.len(), 2);
    }
}
