// src/ledger/memory.rs

use crate::error::LedgerError;
use crate::ledger::client::{Ledger, LedgerSetup, RawValue};
use crate::model::agent::{AgentRole, SupplyChainAgent};
use crate::model::queues::TimeDelayQueue;
use tracing::debug;

/// In-process stand-in for the game contract.
///
/// Keeps the authoritative books: member stock and backlog, the order and
/// shipment pipes between members, the factory's production pipe, orders per
/// role per week, and accumulated cost.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    setup: Option<LedgerSetup>,

    agents: Vec<SupplyChainAgent>,

    // Order pipes flow upstream: 0 = R->W, 1 = W->D, 2 = D->F
    order_queues: Vec<TimeDelayQueue>,
    // Shipment pipes flow downstream: 0 = W->R, 1 = D->W, 2 = F->D
    shipment_queues: Vec<TimeDelayQueue>,
    production_queue: TimeDelayQueue,

    // orders_placed[role][week]
    orders_placed: Vec<Vec<u32>>,
    pending: [Option<u32>; 4],

    week: usize,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn setup(&self) -> Result<&LedgerSetup, LedgerError> {
        self.setup
            .as_ref()
            .ok_or_else(|| LedgerError::Unavailable("game not initialized".into()))
    }

    fn ensure_active(&self) -> Result<&LedgerSetup, LedgerError> {
        let setup = self
            .setup
            .as_ref()
            .ok_or_else(|| LedgerError::Rejected("game not initialized".into()))?;
        if self.week >= setup.weeks {
            return Err(LedgerError::Rejected(format!(
                "game finished after {} weeks",
                setup.weeks
            )));
        }
        Ok(setup)
    }

    fn inbound_pipe(&self, role: AgentRole) -> &TimeDelayQueue {
        match role {
            AgentRole::Factory => &self.production_queue,
            other => &self.shipment_queues[other.index()],
        }
    }

    fn demand_at(&self, week: usize) -> u32 {
        self.setup
            .as_ref()
            .and_then(|s| s.demand.get(week).copied())
            .unwrap_or(0)
    }

    pub fn week(&self) -> usize {
        self.week
    }

    pub fn agent(&self, role: AgentRole) -> Option<&SupplyChainAgent> {
        self.agents.get(role.index())
    }
}

impl Ledger for InMemoryLedger {
    fn initialize(&mut self, setup: &LedgerSetup) -> Result<(), LedgerError> {
        self.agents = AgentRole::ALL
            .iter()
            .map(|role| SupplyChainAgent::new(*role, setup.initial_inventory))
            .collect();

        self.order_queues = (0..3)
            .map(|_| TimeDelayQueue::prefilled(setup.order_delay, setup.initial_pipeline))
            .collect();
        self.shipment_queues = (0..3)
            .map(|_| TimeDelayQueue::prefilled(setup.shipping_delay, setup.initial_pipeline))
            .collect();
        // Production takes as long as shipping.
        self.production_queue =
            TimeDelayQueue::prefilled(setup.shipping_delay, setup.initial_pipeline);

        self.orders_placed = vec![Vec::with_capacity(setup.weeks); 4];
        self.pending = [None; 4];
        self.week = 0;
        self.setup = Some(setup.clone());
        Ok(())
    }

    fn current_week(&self) -> Result<RawValue, LedgerError> {
        self.setup()?;
        Ok(RawValue::Int(self.week as i64))
    }

    fn member_state(&self, role: AgentRole) -> Result<Vec<RawValue>, LedgerError> {
        self.setup()?;
        let m = self
            .agent(role)
            .ok_or_else(|| LedgerError::Unavailable(format!("no member {}", role.name())))?
            .member_state();
        Ok(vec![
            m.on_hand.into(),
            m.backlog.into(),
            m.incoming_shipment.into(),
            m.weekly_cost.into(),
            m.total_cost.into(),
        ])
    }

    fn shipment_pipeline(&self, role: AgentRole) -> Result<Vec<RawValue>, LedgerError> {
        self.setup()?;
        Ok(self
            .inbound_pipe(role)
            .contents()
            .into_iter()
            .map(RawValue::from)
            .collect())
    }

    fn order_for_week(&self, role: AgentRole, week: usize) -> Result<RawValue, LedgerError> {
        self.setup()?;
        let placed = self.orders_placed[role.index()]
            .get(week)
            .copied()
            .unwrap_or(0);
        Ok(placed.into())
    }

    fn current_customer_demand(&self) -> Result<RawValue, LedgerError> {
        self.setup()?;
        Ok(self.demand_at(self.week).into())
    }

    fn customer_demand_history(&self) -> Result<Vec<RawValue>, LedgerError> {
        self.setup()?;
        Ok((0..=self.week).map(|w| self.demand_at(w).into()).collect())
    }

    fn lead_time_parameters(&self) -> Result<Vec<RawValue>, LedgerError> {
        let setup = self.setup()?;
        Ok(vec![
            RawValue::Int(setup.order_delay as i64),
            RawValue::Int(setup.shipping_delay as i64),
        ])
    }

    fn submit_order(&mut self, role: AgentRole, quantity: u32) -> Result<(), LedgerError> {
        self.ensure_active()?;
        if role == AgentRole::Factory {
            return Err(LedgerError::Rejected(
                "factory schedules production, not orders".into(),
            ));
        }
        self.pending[role.index()] = Some(quantity);
        Ok(())
    }

    fn submit_production(&mut self, quantity: u32) -> Result<(), LedgerError> {
        self.ensure_active()?;
        self.pending[AgentRole::Factory.index()] = Some(quantity);
        Ok(())
    }

    fn advance_week(&mut self) -> Result<(), LedgerError> {
        let setup = self.ensure_active()?;
        let (holding_cost, backlog_cost) = (setup.holding_cost, setup.backlog_cost);
        let customer_demand = self.demand_at(self.week);

        // Morning: arrivals
        let arrivals = [
            self.shipment_queues[0].pop_arrival(),
            self.shipment_queues[1].pop_arrival(),
            self.shipment_queues[2].pop_arrival(),
            self.production_queue.pop_arrival(),
        ];
        let incoming_orders = [
            customer_demand,
            self.order_queues[0].pop_arrival(),
            self.order_queues[1].pop_arrival(),
            self.order_queues[2].pop_arrival(),
        ];

        // Day: receive goods, then ship what we can
        let mut shipped = [0u32; 4];
        for (i, agent) in self.agents.iter_mut().enumerate() {
            agent.receive_shipment(arrivals[i]);
            shipped[i] = agent.process_order(incoming_orders[i]);
        }

        // Evening: this week's decisions enter the pipes.
        // A role that never submitted is booked as ordering nothing.
        let placed = self.pending.map(|p| p.unwrap_or(0));
        for i in 0..3 {
            self.order_queues[i].push_departure(placed[i]);
            self.shipment_queues[i].push_departure(shipped[i + 1]);
        }
        self.production_queue.push_departure(placed[3]);

        for (i, orders) in self.orders_placed.iter_mut().enumerate() {
            orders.push(placed[i]);
        }
        for agent in self.agents.iter_mut() {
            agent.accrue_cost(holding_cost, backlog_cost);
        }

        debug!(
            target: "sim.ledger",
            week = self.week,
            customer_demand,
            retailer_inventory = self.agents[0].inventory,
            retailer_backlog = self.agents[0].backlog,
            "week processed"
        );

        self.pending = [None; 4];
        self.week += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(weeks: usize) -> LedgerSetup {
        LedgerSetup {
            weeks,
            initial_inventory: 12,
            initial_pipeline: 4,
            order_delay: 2,
            shipping_delay: 2,
            holding_cost: 0.5,
            backlog_cost: 1.0,
            demand: vec![4, 4, 8, 8],
        }
    }

    fn ledger(weeks: usize) -> InMemoryLedger {
        let mut ledger = InMemoryLedger::new();
        ledger.initialize(&setup(weeks)).unwrap();
        ledger
    }

    #[test]
    fn calls_before_initialize_fail() {
        let ledger = InMemoryLedger::new();
        assert!(ledger.member_state(AgentRole::Retailer).is_err());
        assert!(ledger.current_customer_demand().is_err());
    }

    #[test]
    fn pipelines_start_prefilled() {
        let ledger = ledger(4);
        let pipe = ledger.shipment_pipeline(AgentRole::Factory).unwrap();
        assert_eq!(pipe, vec![RawValue::Int(4), RawValue::Int(4)]);
    }

    #[test]
    fn factory_cannot_submit_an_order() {
        let mut ledger = ledger(4);
        assert!(matches!(
            ledger.submit_order(AgentRole::Factory, 3),
            Err(LedgerError::Rejected(_))
        ));
        assert!(ledger.submit_production(3).is_ok());
    }

    #[test]
    fn advance_ships_books_orders_and_costs() {
        let mut ledger = ledger(4);
        ledger.submit_order(AgentRole::Retailer, 6).unwrap();
        ledger.submit_order(AgentRole::Wholesaler, 5).unwrap();
        ledger.submit_order(AgentRole::Distributor, 4).unwrap();
        ledger.submit_production(3).unwrap();
        ledger.advance_week().unwrap();

        assert_eq!(ledger.week(), 1);
        // 12 on hand + 4 arriving - 4 shipped
        let retailer = ledger.agent(AgentRole::Retailer).unwrap();
        assert_eq!(retailer.inventory, 12);
        assert_eq!(retailer.weekly_cost, 6.0);
        assert_eq!(
            ledger.order_for_week(AgentRole::Retailer, 0).unwrap(),
            RawValue::Int(6)
        );
        assert_eq!(
            ledger.shipment_pipeline(AgentRole::Factory).unwrap(),
            vec![RawValue::Int(4), RawValue::Int(3)]
        );
    }

    #[test]
    fn missing_submission_books_zero() {
        let mut ledger = ledger(4);
        ledger.advance_week().unwrap();
        assert_eq!(
            ledger.order_for_week(AgentRole::Distributor, 0).unwrap(),
            RawValue::Int(0)
        );
    }

    #[test]
    fn game_rejects_writes_after_last_week() {
        let mut ledger = ledger(1);
        ledger.advance_week().unwrap();
        assert!(matches!(
            ledger.submit_order(AgentRole::Retailer, 4),
            Err(LedgerError::Rejected(_))
        ));
        assert!(ledger.advance_week().is_err());
    }

    #[test]
    fn customer_history_runs_through_current_week() {
        let mut ledger = ledger(4);
        ledger.advance_week().unwrap();
        ledger.advance_week().unwrap();
        let history = ledger.customer_demand_history().unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(ledger.current_customer_demand().unwrap(), RawValue::Int(8));
    }
}
