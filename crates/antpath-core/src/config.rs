//! Run configuration.
//!
//! `SimConfig` is the resolved option set a front-end hands to the driver.
//! It serializes as one flat JSON object: the colony tunables of
//! [`ColonyParams`] sit next to the layer names and round counts. Every
//! field has a default, so a config file only needs the fields it changes.

use serde::{Deserialize, Serialize};

use crate::colony::{ColonyParams, LayerNames};
use crate::error::{SimError, SimResult};
use crate::grid::Connectivity;

/// When the driver hands the pheromone layer to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSchedule {
    /// Only once, after the last round.
    Final,
    /// Every `n` ticks, plus once after the last round.
    Every(u64),
}

impl OutputSchedule {
    /// `output_rounds == 0` means final output only; otherwise snapshots are
    /// spread evenly as every `rounds / output_rounds` ticks (at least 1).
    pub fn from_rounds(rounds: u64, output_rounds: u64) -> Self {
        if output_rounds == 0 {
            OutputSchedule::Final
        } else {
            OutputSchedule::Every((rounds / output_rounds).max(1))
        }
    }

    pub fn is_due(&self, tick: u64) -> bool {
        match self {
            OutputSchedule::Final => false,
            OutputSchedule::Every(n) => tick % n == 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Layer whose non-zero cells are spawn sites and goals.
    pub site_layer: String,
    /// Layer of traversal costs.
    pub cost_layer: String,
    /// Existing layer to seed the pheromone field from.
    pub pheromone_layer: Option<String>,
    /// Name the pheromone layer is saved under.
    pub output_name: String,
    pub overwrite_pheromone: bool,
    /// Allow the cost layer to replace a grid layer of the same name. Input
    /// layers are only read, so this matters only when `cost_layer` names
    /// the site layer.
    pub overwrite_cost: bool,
    pub rounds: u64,
    /// Number of progressive snapshots; 0 saves only the final layer.
    pub output_rounds: u64,
    pub seed: u64,
    pub connectivity: Connectivity,
    #[serde(flatten)]
    pub colony: ColonyParams,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            site_layer: "sites".to_string(),
            cost_layer: "cost".to_string(),
            pheromone_layer: None,
            output_name: "pheromone".to_string(),
            overwrite_pheromone: false,
            overwrite_cost: false,
            rounds: 1000,
            output_rounds: 0,
            seed: 0x5EED_A17C,
            connectivity: Connectivity::Eight,
            colony: ColonyParams::default(),
        }
    }
}

impl SimConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn validate(&self) -> SimResult<()> {
        let names = [
            ("site_layer", &self.site_layer),
            ("cost_layer", &self.cost_layer),
            ("output_name", &self.output_name),
        ];
        for (field, name) in names {
            if name.trim().is_empty() {
                return Err(SimError::parameter(field, "layer name is empty"));
            }
        }
        if self.output_name == self.site_layer || self.output_name == self.cost_layer {
            return Err(SimError::parameter(
                "output_name",
                format!("`{}` would replace an input layer", self.output_name),
            ));
        }
        if let Some(seed) = &self.pheromone_layer {
            if seed.trim().is_empty() {
                return Err(SimError::parameter("pheromone_layer", "layer name is empty"));
            }
        }
        self.colony.validate()
    }

    /// Names the colony binds to; the working pheromone layer is named after
    /// the output.
    pub fn layer_names(&self) -> LayerNames {
        LayerNames::new(&self.site_layer, &self.cost_layer, &self.output_name)
    }

    pub fn schedule(&self) -> OutputSchedule {
        OutputSchedule::from_rounds(self.rounds, self.output_rounds)
    }

    pub fn snapshot_name(&self, tick: u64) -> String {
        format!("{}_{}", self.output_name, tick)
    }

    /// Every layer name a run of `rounds` ticks starting after `start_tick`
    /// will write, in write order.
    pub fn output_names(&self, start_tick: u64) -> Vec<String> {
        let schedule = self.schedule();
        let mut names: Vec<String> = (start_tick + 1..=start_tick + self.rounds)
            .filter(|t| schedule.is_due(*t))
            .map(|t| self.snapshot_name(t))
            .collect();
        names.push(self.output_name.clone());
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colony::GoalPolicy;
    use crate::error::ErrorKind;

    #[test]
    fn test_schedule() {
        assert_eq!(OutputSchedule::from_rounds(100, 0), OutputSchedule::Final);
        assert_eq!(OutputSchedule::from_rounds(100, 4), OutputSchedule::Every(25));
        assert_eq!(OutputSchedule::from_rounds(3, 10), OutputSchedule::Every(1));
        assert!(OutputSchedule::Every(25).is_due(50));
        assert!(!OutputSchedule::Every(25).is_due(51));
        assert!(!OutputSchedule::Final.is_due(100));
    }

    #[test]
    fn test_output_names() {
        let config = SimConfig {
            output_name: "trail".into(),
            rounds: 10,
            output_rounds: 2,
            ..Default::default()
        };
        assert_eq!(config.output_names(0), vec!["trail_5", "trail_10", "trail"]);
        assert_eq!(config.output_names(10), vec!["trail_15", "trail_20", "trail"]);

        let final_only = SimConfig {
            rounds: 10,
            ..Default::default()
        };
        assert_eq!(final_only.output_names(0), vec!["pheromone"]);
    }

    #[test]
    fn test_flat_json_with_defaults() {
        let config = SimConfig::from_json(
            r#"{
                "site_layer": "nests",
                "rounds": 50,
                "max_population": 20,
                "low_cost_limit": null,
                "goal_policy": "reset",
                "connectivity": "four"
            }"#,
        )
        .unwrap();
        assert_eq!(config.site_layer, "nests");
        assert_eq!(config.cost_layer, "cost");
        assert_eq!(config.rounds, 50);
        assert_eq!(config.colony.max_population, 20);
        assert_eq!(config.colony.low_cost_limit, None);
        assert_eq!(config.colony.goal_policy, GoalPolicy::Reset);
        assert_eq!(config.connectivity, Connectivity::Four);
        assert_eq!(config.colony.half_life, ColonyParams::default().half_life);

        let again = SimConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(again, config);
    }

    #[test]
    fn test_validate() {
        assert!(SimConfig::default().validate().is_ok());

        let clobber = SimConfig {
            output_name: "cost".into(),
            ..Default::default()
        };
        assert_eq!(clobber.validate().unwrap_err().kind(), ErrorKind::Config);

        let empty = SimConfig {
            site_layer: " ".into(),
            ..Default::default()
        };
        assert!(empty.validate().is_err());

        let mut bad_colony = SimConfig::default();
        bad_colony.colony.max_pheromone = -1.0;
        assert!(bad_colony.validate().is_err());
    }
}
