// src/model/agent.rs

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Retailer,
    Wholesaler,
    Distributor,
    Factory,
}

impl AgentRole {
    /// Fixed decision order within a week.
    pub const ALL: [AgentRole; 4] = [
        AgentRole::Retailer,
        AgentRole::Wholesaler,
        AgentRole::Distributor,
        AgentRole::Factory,
    ];

    pub fn index(self) -> usize {
        match self {
            AgentRole::Retailer => 0,
            AgentRole::Wholesaler => 1,
            AgentRole::Distributor => 2,
            AgentRole::Factory => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// The role this one ships to (and receives orders from).
    pub fn downstream(self) -> Option<Self> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }

    pub fn name(self) -> &'static str {
        match self {
            AgentRole::Retailer => "retailer",
            AgentRole::Wholesaler => "wholesaler",
            AgentRole::Distributor => "distributor",
            AgentRole::Factory => "factory",
        }
    }
}

/// What a policy sees of a role in a given week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RoleState {
    pub on_hand: u32,
    pub backlog: u32,
    /// Goods in the inbound shipment (or production) pipeline.
    pub on_order: u32,
    /// Order delay + shipping delay, in weeks.
    pub lead_time: u32,
}

impl RoleState {
    /// On hand + on order - backlog. Can go negative under a large backlog.
    pub fn inventory_position(&self) -> i64 {
        self.on_hand as i64 + self.on_order as i64 - self.backlog as i64
    }

    pub fn effective_inventory(&self) -> i64 {
        self.on_hand as i64 - self.backlog as i64
    }
}

/// Weekly bookkeeping reported by the ledger for one role.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MemberState {
    pub on_hand: u32,
    pub backlog: u32,
    pub incoming_shipment: u32,
    pub weekly_cost: f64,
    pub total_cost: f64,
}

/// A single node of the chain as the ledger books it.
#[derive(Debug, Clone)]
pub struct SupplyChainAgent {
    pub role: AgentRole,

    pub inventory: u32,
    pub backlog: u32,

    pub last_shipment_received: u32,

    pub weekly_cost: f64,
    pub total_cost: f64,
}

impl SupplyChainAgent {
    pub fn new(role: AgentRole, initial_inventory: u32) -> Self {
        Self {
            role,
            inventory: initial_inventory,
            backlog: 0,
            last_shipment_received: 0,
            weekly_cost: 0.0,
            total_cost: 0.0,
        }
    }

    /// Goods arriving from upstream (or out of production).
    pub fn receive_shipment(&mut self, quantity: u32) {
        self.inventory = self.inventory.saturating_add(quantity);
        self.last_shipment_received = quantity;
    }

    /// Fills the incoming order plus the old backlog as far as stock allows.
    ///
    /// Returns the quantity shipped downstream.
    pub fn process_order(&mut self, incoming_order: u32) -> u32 {
        let total_demand = incoming_order.saturating_add(self.backlog);

        if self.inventory >= total_demand {
            self.inventory -= total_demand;
            self.backlog = 0;
            total_demand
        } else {
            // Short: ship everything, backlog the rest.
            let shipped = self.inventory;
            self.backlog = total_demand - self.inventory;
            self.inventory = 0;
            shipped
        }
    }

    /// Books this week's holding and backlog cost.
    pub fn accrue_cost(&mut self, holding_cost: f64, backlog_cost: f64) -> f64 {
        self.weekly_cost = self.inventory as f64 * holding_cost + self.backlog as f64 * backlog_cost;
        self.total_cost += self.weekly_cost;
        self.weekly_cost
    }

    pub fn member_state(&self) -> MemberState {
        MemberState {
            on_hand: self.inventory,
            backlog: self.backlog,
            incoming_shipment: self.last_shipment_received,
            weekly_cost: self.weekly_cost,
            total_cost: self.total_cost,
        }
    }
}
