// src/simulation/config.rs

use crate::error::SimError;
use crate::ledger::client::LedgerSetup;
use crate::model::agent::AgentRole;
use crate::strategy::estimators::ColdStartStrategy;
use crate::strategy::implementations::PolicyKind;
use crate::strategy::traits::{OrderPolicy, VisibilityMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What the driver does when a role's state cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataFallback {
    /// Decide on the last state seen for the role; submit `fallback_order`
    /// if there is none. The row is marked degraded.
    #[default]
    LastKnown,
    /// Stop the run with the fetch error.
    Abort,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub max_weeks: usize,
    pub order_delay: usize,
    pub shipment_delay: usize,
    pub initial_inventory: u32,
    /// Units already travelling in every pipe slot at week 0.
    pub initial_pipeline: u32,
    pub holding_cost: f64,
    pub backlog_cost: f64,
    pub visibility: VisibilityMode,
    /// Weeks of received orders and customer demand fetched per decision.
    pub history_window: usize,
    pub cold_start: ColdStartStrategy,
    pub on_data_unavailable: DataFallback,
    pub fallback_order: u32,
    /// Progress line every n weeks; 0 disables it.
    pub log_every: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_weeks: 25,
            order_delay: 2,
            shipment_delay: 2,
            initial_inventory: 15,
            initial_pipeline: 4,
            holding_cost: 0.5,
            backlog_cost: 1.0,
            visibility: VisibilityMode::Traditional,
            history_window: 10,
            cold_start: ColdStartStrategy::ConfiguredDefault,
            on_data_unavailable: DataFallback::LastKnown,
            fallback_order: 4,
            log_every: 5,
        }
    }
}

impl SimulationConfig {
    pub fn lead_time(&self) -> usize {
        self.order_delay + self.shipment_delay
    }

    pub fn with_visibility(&self, visibility: VisibilityMode) -> Self {
        Self {
            visibility,
            ..self.clone()
        }
    }

    pub fn ledger_setup(&self, demand: &[u32]) -> LedgerSetup {
        LedgerSetup {
            weeks: self.max_weeks,
            initial_inventory: self.initial_inventory,
            initial_pipeline: self.initial_pipeline,
            order_delay: self.order_delay,
            shipping_delay: self.shipment_delay,
            holding_cost: self.holding_cost,
            backlog_cost: self.backlog_cost,
            demand: demand.to_vec(),
        }
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if self.max_weeks == 0 {
            return Err(SimError::Config("max_weeks must be at least 1".into()));
        }
        if self.history_window == 0 {
            return Err(SimError::Config("history_window must be at least 1".into()));
        }
        for (name, cost) in [
            ("holding_cost", self.holding_cost),
            ("backlog_cost", self.backlog_cost),
        ] {
            if !cost.is_finite() || cost < 0.0 {
                return Err(SimError::Config(format!(
                    "{name} must be a non-negative number, got {cost}"
                )));
            }
        }
        Ok(())
    }
}

/// Which policy each role runs. Hybrid setups mix families.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyAssignment {
    pub retailer: PolicyKind,
    pub wholesaler: PolicyKind,
    pub distributor: PolicyKind,
    pub factory: PolicyKind,
}

impl PolicyAssignment {
    pub fn uniform(kind: PolicyKind) -> Self {
        Self {
            retailer: kind,
            wholesaler: kind,
            distributor: kind,
            factory: kind,
        }
    }

    pub fn for_role(&self, role: AgentRole) -> &PolicyKind {
        match role {
            AgentRole::Retailer => &self.retailer,
            AgentRole::Wholesaler => &self.wholesaler,
            AgentRole::Distributor => &self.distributor,
            AgentRole::Factory => &self.factory,
        }
    }

    /// Fresh policy objects in role order.
    pub fn build(&self) -> Vec<Box<dyn OrderPolicy>> {
        AgentRole::ALL
            .iter()
            .map(|role| self.for_role(*role).build())
            .collect()
    }

    pub fn label(&self) -> String {
        let families: Vec<&str> = AgentRole::ALL
            .iter()
            .map(|role| self.for_role(*role).family())
            .collect();
        if families.iter().all(|f| *f == families[0]) {
            families[0].to_string()
        } else {
            families.join("/")
        }
    }
}

/// Where the end-customer demand schedule comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DemandSource {
    Constant {
        value: u32,
    },
    /// 4 units for four weeks, then 8.
    ClassicStep,
    Normal {
        mean: f64,
        std_dev: f64,
        seed: Option<u64>,
    },
    Csv {
        path: PathBuf,
        column: String,
        /// Rescale to this mean while keeping the coefficient of variation.
        target_mean: Option<f64>,
    },
}

impl Default for DemandSource {
    fn default() -> Self {
        DemandSource::ClassicStep
    }
}

/// A full experiment description as stored on disk.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub simulation: SimulationConfig,
    pub policies: PolicyAssignment,
    pub demand: DemandSource,
}

impl ExperimentConfig {
    pub fn from_json_str(json: &str) -> Result<Self, SimError> {
        let config: ExperimentConfig = serde_json::from_str(json)?;
        config.simulation.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, SimError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
