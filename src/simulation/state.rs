// src/simulation/state.rs

use crate::model::agent::{AgentRole, RoleState};
use crate::strategy::traits::OrderPolicy;

/// A role's state together with the pipeline it was derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleSnapshot {
    pub state: RoleState,
    pub pipeline: Vec<u32>,
}

/// Mutable per-run memory of the driver.
///
/// One instance per run; a sweep builds a new one for every configuration so
/// forecasts never leak between runs.
#[derive(Debug, Clone, Default)]
pub struct SimulationState {
    forecasts: [Option<f64>; 4],
    last_known: [Option<RoleSnapshot>; 4],
    latest_orders: [Option<u32>; 4],
    last_customer_demand: Option<u32>,
    customer_history: Vec<u32>,
}

impl SimulationState {
    /// Fresh state with each role's forecast at its policy's starting value.
    pub fn reset(policies: &[Box<dyn OrderPolicy>]) -> Self {
        let mut state = Self::default();
        for (slot, policy) in state.forecasts.iter_mut().zip(policies) {
            *slot = policy.initial_forecast();
        }
        state
    }

    pub fn forecast(&self, role: AgentRole) -> Option<f64> {
        self.forecasts[role.index()]
    }

    pub fn set_forecast(&mut self, role: AgentRole, forecast: f64) {
        self.forecasts[role.index()] = Some(forecast);
    }

    pub fn last_known(&self, role: AgentRole) -> Option<&RoleSnapshot> {
        self.last_known[role.index()].as_ref()
    }

    pub fn remember(&mut self, role: AgentRole, snapshot: RoleSnapshot) {
        self.last_known[role.index()] = Some(snapshot);
    }

    /// Latest order per role: this week's for roles that already decided,
    /// last week's for the others.
    pub fn latest_orders(&self) -> [Option<u32>; 4] {
        self.latest_orders
    }

    pub fn record_order(&mut self, role: AgentRole, quantity: u32) {
        self.latest_orders[role.index()] = Some(quantity);
    }

    pub fn last_customer_demand(&self) -> Option<u32> {
        self.last_customer_demand
    }

    pub fn customer_history(&self) -> &[u32] {
        &self.customer_history
    }

    pub fn remember_customer(&mut self, demand: Option<u32>, history: Option<Vec<u32>>) {
        if demand.is_some() {
            self.last_customer_demand = demand;
        }
        if let Some(history) = history {
            self.customer_history = history;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::implementations::{PolicyKind, StermanParams};

    #[test]
    fn reset_seeds_policy_defaults() {
        let policies = vec![
            PolicyKind::Sterman(StermanParams::default()).build(),
            PolicyKind::Simple.build(),
            PolicyKind::Simple.build(),
            PolicyKind::Sterman(StermanParams {
                initial_forecast: 6.0,
                ..StermanParams::default()
            })
            .build(),
        ];
        let state = SimulationState::reset(&policies);
        assert_eq!(state.forecast(AgentRole::Retailer), Some(4.0));
        assert_eq!(state.forecast(AgentRole::Wholesaler), None);
        assert_eq!(state.forecast(AgentRole::Factory), Some(6.0));
        assert!(state.last_known(AgentRole::Retailer).is_none());
    }

    #[test]
    fn orders_and_forecasts_are_per_role() {
        let mut state = SimulationState::default();
        state.set_forecast(AgentRole::Distributor, 5.5);
        state.record_order(AgentRole::Retailer, 7);
        assert_eq!(state.forecast(AgentRole::Distributor), Some(5.5));
        assert_eq!(state.forecast(AgentRole::Retailer), None);
        assert_eq!(state.latest_orders(), [Some(7), None, None, None]);
    }

    #[test]
    fn customer_memory_keeps_last_good_values() {
        let mut state = SimulationState::default();
        state.remember_customer(Some(4), Some(vec![4]));
        state.remember_customer(None, None);
        assert_eq!(state.last_customer_demand(), Some(4));
        assert_eq!(state.customer_history(), &[4]);
    }
}
