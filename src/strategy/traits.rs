// src/strategy/traits.rs

use crate::error::SimError;
use crate::model::agent::{AgentRole, RoleState};
use crate::strategy::estimators::ColdStartStrategy;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Which information a role is allowed to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisibilityMode {
    /// Own received orders only; the retailer also sees its customers.
    #[default]
    Traditional,
    /// End-customer demand and the downstream role's state are shared with everyone.
    Blockchain,
}

impl VisibilityMode {
    pub fn name(self) -> &'static str {
        match self {
            VisibilityMode::Traditional => "traditional",
            VisibilityMode::Blockchain => "blockchain",
        }
    }
}

/// Under blockchain visibility, what an upstream role feeds its forecast with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "source", content = "role", rename_all = "snake_case")]
pub enum SignalSource {
    /// Current, unsmoothed end-customer demand.
    #[default]
    EndCustomer,
    /// The latest order of a given role, shared on the ledger.
    RoleOrder(AgentRole),
}

/// Everything a role may look at besides its own stock, filtered by visibility.
///
/// The driver only fills the fields the visibility mode allows; policies can
/// trust that a `Some` means the information is legitimately visible.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderContext {
    pub role: AgentRole,
    pub week: usize,
    pub visibility: VisibilityMode,

    /// Current end-customer demand.
    pub customer_demand: Option<u32>,
    /// Recent end-customer demand, oldest first, current week last.
    pub customer_history: Vec<u32>,

    /// Orders received from the downstream role in prior weeks, oldest first.
    pub received_orders: Vec<u32>,
    /// Latest order of each role, indexed by `AgentRole::index`.
    pub latest_orders: [Option<u32>; 4],
    /// The downstream role's own state (blockchain only).
    pub downstream: Option<RoleState>,

    /// Inbound pipeline contents, next arrival first.
    pub pipeline: Vec<u32>,
    /// No downstream data exists yet for this role.
    pub cold_start: bool,
    pub cold_start_strategy: ColdStartStrategy,
}

impl OrderContext {
    pub fn new(role: AgentRole, week: usize, visibility: VisibilityMode) -> Self {
        Self {
            role,
            week,
            visibility,
            customer_demand: None,
            customer_history: Vec::new(),
            received_orders: Vec::new(),
            latest_orders: [None; 4],
            downstream: None,
            pipeline: Vec::new(),
            cold_start: false,
            cold_start_strategy: ColdStartStrategy::default(),
        }
    }

    /// Whether this role forecasts from end-customer demand.
    pub fn sees_end_customer(&self) -> bool {
        self.role == AgentRole::Retailer
            || (self.visibility == VisibilityMode::Blockchain && !self.cold_start)
    }

    pub fn last_received_order(&self) -> Option<u32> {
        if self.cold_start {
            return None;
        }
        self.received_orders.last().copied()
    }

    /// The demand figure fed into a forecast recurrence this week.
    ///
    /// The retailer always uses its customers' demand. A cold-starting role
    /// gets the cold-start proxy (possibly nothing) whatever the visibility.
    pub fn demand_signal(&self, source: SignalSource) -> Option<f64> {
        if self.role == AgentRole::Retailer {
            return self.customer_demand.map(f64::from);
        }
        if self.cold_start {
            return self.cold_start_strategy.proxy_signal(&self.pipeline);
        }
        match self.visibility {
            VisibilityMode::Traditional => self.last_received_order().map(f64::from),
            VisibilityMode::Blockchain => match source {
                SignalSource::EndCustomer => self.customer_demand.map(f64::from),
                SignalSource::RoleOrder(role) => self.latest_orders[role.index()]
                    .or(self.customer_demand)
                    .map(f64::from),
            },
        }
    }
}

/// The downstream role's target as seen from upstream. Diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DownstreamTarget {
    pub role: AgentRole,
    pub target: f64,
    pub inventory_position: i64,
}

impl DownstreamTarget {
    pub fn gap(&self) -> f64 {
        self.target - self.inventory_position as f64
    }
}

/// Result of one policy invocation for one role and week.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderDecision {
    pub quantity: u32,
    /// Forecast to persist for next week.
    pub forecast: f64,
    pub downstream_target: Option<DownstreamTarget>,
    /// The policy had to fall back to a safe default.
    pub degraded: bool,
    /// False when the forecast is a placeholder that must not seed the
    /// role's stored forecast.
    pub persist_forecast: bool,
}

impl OrderDecision {
    pub fn new(quantity: u32, forecast: f64) -> Self {
        Self {
            quantity,
            forecast,
            downstream_target: None,
            degraded: false,
            persist_forecast: true,
        }
    }

    /// Decision whose forecast is used this week only.
    pub fn unseeded(quantity: u32, forecast: f64) -> Self {
        Self {
            persist_forecast: false,
            ..Self::new(quantity, forecast)
        }
    }
}

/// Decision logic for a supply chain role.
///
/// Implementations are pure: the persisted forecast comes in as an argument
/// and the updated one goes out in the decision, so the same inputs always
/// give the same decision.
pub trait OrderPolicy: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Forecast a role starts a fresh run with. `None` means "seed from the first signal".
    fn initial_forecast(&self) -> Option<f64>;

    /// Calculates how much to order from the upstream supplier (or produce).
    ///
    /// # Arguments
    /// * `state` - The role's own stock, backlog, supply line and lead time.
    /// * `context` - Demand information visible to the role this week.
    /// * `previous_forecast` - The forecast persisted from last week.
    fn calculate_order(
        &self,
        state: &RoleState,
        context: &OrderContext,
        previous_forecast: Option<f64>,
    ) -> Result<OrderDecision, SimError>;
}
