// src/ledger/client.rs

use crate::error::LedgerError;
use crate::model::agent::{AgentRole, MemberState, RoleState};
use serde::{Deserialize, Serialize};

/// A value as it comes back from the ledger, before any interpretation.
///
/// Contract calls hand back big integers, hex strings or floats depending on
/// the client library, so nothing outside this module looks at them directly.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Int(i64),
    Float(f64),
    Text(String),
    Null,
}

impl From<u32> for RawValue {
    fn from(v: u32) -> Self {
        RawValue::Int(v as i64)
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Float(v)
    }
}

/// Coerces any ledger value to an integer. Never fails.
///
/// - `Int` passes through.
/// - `Float` is rounded half away from zero; NaN maps to 0, infinities saturate.
/// - `Text` is trimmed, then read as `0x` hex, decimal integer or float, in
///   that order; out-of-range numbers saturate, anything else maps to 0.
/// - `Null` maps to 0.
pub fn to_integer(value: &RawValue) -> i64 {
    match value {
        RawValue::Int(v) => *v,
        RawValue::Float(f) => float_to_integer(*f),
        RawValue::Text(s) => text_to_integer(s.trim()),
        RawValue::Null => 0,
    }
}

fn float_to_integer(f: f64) -> i64 {
    if f.is_nan() {
        0
    } else {
        // `as` saturates at the i64 bounds.
        f.round() as i64
    }
}

fn text_to_integer(s: &str) -> i64 {
    if s.is_empty() {
        return 0;
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return match u128::from_str_radix(hex, 16) {
            Ok(v) => i64::try_from(v).unwrap_or(i64::MAX),
            Err(_) => 0,
        };
    }
    if let Ok(v) = s.parse::<i128>() {
        return v.clamp(i64::MIN as i128, i64::MAX as i128) as i64;
    }
    match s.parse::<f64>() {
        Ok(f) => float_to_integer(f),
        Err(_) => 0,
    }
}

/// Integer coercion clamped into the non-negative `u32` range.
pub fn to_quantity(value: &RawValue) -> u32 {
    to_integer(value).clamp(0, u32::MAX as i64) as u32
}

/// Monetary amounts keep their fraction when the ledger provides one.
pub fn to_amount(value: &RawValue) -> f64 {
    match value {
        RawValue::Float(f) if f.is_finite() => *f,
        RawValue::Text(s) => match s.trim().parse::<f64>() {
            Ok(f) if f.is_finite() => f,
            _ => to_integer(value) as f64,
        },
        other => to_integer(other) as f64,
    }
}

/// Parameters the ledger is configured with before week 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSetup {
    pub weeks: usize,
    pub initial_inventory: u32,
    pub initial_pipeline: u32,
    pub order_delay: usize,
    pub shipping_delay: usize,
    pub holding_cost: f64,
    pub backlog_cost: f64,
    pub demand: Vec<u32>,
}

/// The external game contract.
///
/// Reads return loosely-typed values; `LedgerClient` turns them into domain
/// types. Member state is a tuple `[onHand, backlog, incomingShipment,
/// weeklyCost, totalCost]` of which only the first two are mandatory; lead
/// time parameters are `[orderDelay, shippingDelay]`.
pub trait Ledger {
    fn initialize(&mut self, setup: &LedgerSetup) -> Result<(), LedgerError>;

    fn current_week(&self) -> Result<RawValue, LedgerError>;

    fn member_state(&self, role: AgentRole) -> Result<Vec<RawValue>, LedgerError>;

    fn shipment_pipeline(&self, role: AgentRole) -> Result<Vec<RawValue>, LedgerError>;

    /// The order `role` placed in `week`. Weeks not yet played read as zero.
    fn order_for_week(&self, role: AgentRole, week: usize) -> Result<RawValue, LedgerError>;

    fn current_customer_demand(&self) -> Result<RawValue, LedgerError>;

    /// End-customer demand from week 0 through the current week.
    fn customer_demand_history(&self) -> Result<Vec<RawValue>, LedgerError>;

    fn lead_time_parameters(&self) -> Result<Vec<RawValue>, LedgerError>;

    fn submit_order(&mut self, role: AgentRole, quantity: u32) -> Result<(), LedgerError>;

    /// Factory only.
    fn submit_production(&mut self, quantity: u32) -> Result<(), LedgerError>;

    /// Ships, delivers, resolves backlog and books costs for the current week.
    fn advance_week(&mut self) -> Result<(), LedgerError>;
}

/// Typed view over a `Ledger`.
#[derive(Debug)]
pub struct LedgerClient<L: Ledger> {
    inner: L,
}

impl<L: Ledger> LedgerClient<L> {
    pub fn new(inner: L) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }

    pub fn into_inner(self) -> L {
        self.inner
    }

    pub fn initialize(&mut self, setup: &LedgerSetup) -> Result<(), LedgerError> {
        self.inner.initialize(setup)
    }

    pub fn current_week(&self) -> Result<usize, LedgerError> {
        Ok(to_integer(&self.inner.current_week()?).max(0) as usize)
    }

    pub fn member_state(&self, role: AgentRole) -> Result<MemberState, LedgerError> {
        let fields = self.inner.member_state(role)?;
        if fields.len() < 2 {
            return Err(LedgerError::InvalidShape(format!(
                "member state for {} has {} fields, expected at least 2",
                role.name(),
                fields.len()
            )));
        }
        let quantity = |i: usize| fields.get(i).map(to_quantity).unwrap_or(0);
        let amount = |i: usize| fields.get(i).map(to_amount).unwrap_or(0.0);
        Ok(MemberState {
            on_hand: quantity(0),
            backlog: quantity(1),
            incoming_shipment: quantity(2),
            weekly_cost: amount(3),
            total_cost: amount(4),
        })
    }

    pub fn pipeline(&self, role: AgentRole) -> Result<Vec<u32>, LedgerError> {
        Ok(self
            .inner
            .shipment_pipeline(role)?
            .iter()
            .map(to_quantity)
            .collect())
    }

    pub fn lead_time(&self) -> Result<u32, LedgerError> {
        let params = self.inner.lead_time_parameters()?;
        match params.as_slice() {
            [order_delay, shipping_delay] => {
                Ok(to_quantity(order_delay).saturating_add(to_quantity(shipping_delay)))
            }
            other => Err(LedgerError::InvalidShape(format!(
                "lead time parameters have {} fields, expected 2",
                other.len()
            ))),
        }
    }

    /// Everything a policy needs about `role` itself.
    pub fn role_state(&self, role: AgentRole) -> Result<RoleState, LedgerError> {
        let member = self.member_state(role)?;
        let on_order = self
            .pipeline(role)?
            .iter()
            .fold(0u32, |acc, q| acc.saturating_add(*q));
        Ok(RoleState {
            on_hand: member.on_hand,
            backlog: member.backlog,
            on_order,
            lead_time: self.lead_time()?,
        })
    }

    pub fn order_for_week(&self, role: AgentRole, week: usize) -> Result<u32, LedgerError> {
        Ok(to_quantity(&self.inner.order_for_week(role, week)?))
    }

    /// Orders `role` received from its downstream neighbour in the `window`
    /// weeks before `week`, oldest first. The retailer gets an empty list.
    pub fn received_orders(
        &self,
        role: AgentRole,
        week: usize,
        window: usize,
    ) -> Result<Vec<u32>, LedgerError> {
        let Some(downstream) = role.downstream() else {
            return Ok(Vec::new());
        };
        (week.saturating_sub(window)..week)
            .map(|w| self.order_for_week(downstream, w))
            .collect()
    }

    pub fn customer_demand(&self) -> Result<u32, LedgerError> {
        Ok(to_quantity(&self.inner.current_customer_demand()?))
    }

    /// The last `window` weeks of end-customer demand, oldest first.
    pub fn customer_history(&self, window: usize) -> Result<Vec<u32>, LedgerError> {
        let all = self.inner.customer_demand_history()?;
        let start = all.len().saturating_sub(window);
        Ok(all[start..].iter().map(to_quantity).collect())
    }

    /// Orders go upstream; the factory schedules production instead.
    pub fn submit(&mut self, role: AgentRole, quantity: u32) -> Result<(), LedgerError> {
        match role {
            AgentRole::Factory => self.inner.submit_production(quantity),
            _ => self.inner.submit_order(role, quantity),
        }
    }

    pub fn advance_week(&mut self) -> Result<(), LedgerError> {
        self.inner.advance_week()
    }
}
