// src/simulation/engine.rs

use crate::error::{LedgerError, SimError};
use crate::ledger::client::{Ledger, LedgerClient};
use crate::model::agent::{AgentRole, MemberState, RoleState};
use crate::simulation::config::{DataFallback, SimulationConfig};
use crate::simulation::state::{RoleSnapshot, SimulationState};
use crate::strategy::estimators::DEFAULT_FORECAST;
use crate::strategy::traits::{OrderContext, OrderDecision, OrderPolicy, VisibilityMode};
use serde::Serialize;
use tracing::{debug, info, warn};

/// One row of weekly telemetry for one role.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryRecord {
    pub week: usize,
    pub role: AgentRole,
    pub visibility: VisibilityMode,
    /// Empty when the ledger could not report it and nothing was known yet.
    pub customer_demand: Option<u32>,
    pub inventory: u32,
    pub backlog: u32,
    pub order_placed: u32,
    pub incoming_shipment: u32,
    pub weekly_cost: f64,
    pub total_cost: f64,
    pub forecast: f64,
    pub downstream_target: Option<f64>,
    /// A fallback or rejected call affected this row.
    pub degraded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverPhase {
    Initializing,
    FetchState,
    Decide,
    Submit,
    Advance,
    Finalizing,
    Finished,
}

/// End-customer information fetched once per week.
#[derive(Debug, Clone, Default)]
struct CustomerView {
    demand: Option<u32>,
    history: Vec<u32>,
    degraded: bool,
}

/// What happened for one role in the decision phase of a week.
#[derive(Debug, Clone, Copy)]
struct WeekDecision {
    role: AgentRole,
    quantity: u32,
    forecast: f64,
    downstream_target: Option<f64>,
    degraded: bool,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub visibility: VisibilityMode,
    pub weeks: usize,
    pub customer_demand: Vec<u32>,
    pub history: Vec<HistoryRecord>,
    pub cost_by_role: Vec<(AgentRole, f64)>,
    pub total_cost: f64,
}

impl RunReport {
    pub fn records_for(&self, role: AgentRole) -> impl Iterator<Item = &HistoryRecord> {
        self.history.iter().filter(move |r| r.role == role)
    }

    pub fn orders_for(&self, role: AgentRole) -> Vec<u32> {
        self.records_for(role).map(|r| r.order_placed).collect()
    }

    /// Total cost for a specific role across all weeks.
    pub fn total_cost_for(&self, role: AgentRole) -> f64 {
        self.cost_by_role
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, c)| *c)
            .unwrap_or(0.0)
    }

    /// Total cost for the entire supply chain across all weeks.
    pub fn total_supply_chain_cost(&self) -> f64 {
        self.total_cost
    }

    pub fn cost_breakdown(&self) -> Vec<(String, f64)> {
        self.cost_by_role
            .iter()
            .map(|(role, cost)| (role.name().to_string(), *cost))
            .collect()
    }

    pub fn degraded_records(&self) -> usize {
        self.history.iter().filter(|r| r.degraded).count()
    }
}

/// Drives one game against a ledger, week by week.
///
/// Per week: every role in chain order fetches its state, decides and
/// submits; only then is the ledger asked to advance. Forecasts live in the
/// driver's `SimulationState`, never in the ledger.
pub struct ChainSimulation<L: Ledger> {
    config: SimulationConfig,
    ledger: LedgerClient<L>,
    policies: Vec<Box<dyn OrderPolicy>>,
    demand_schedule: Vec<u32>,
    state: SimulationState,
    phase: DriverPhase,

    pub current_week: usize,
    pub history: Vec<HistoryRecord>,
}

impl<L: Ledger> ChainSimulation<L> {
    pub fn new(
        config: SimulationConfig,
        ledger: L,
        demand_schedule: Vec<u32>,
        strategies: Vec<Box<dyn OrderPolicy>>,
    ) -> Result<Self, SimError> {
        if strategies.len() != AgentRole::ALL.len() {
            return Err(SimError::Config(format!(
                "need exactly 4 strategies, got {}",
                strategies.len()
            )));
        }
        config.validate()?;

        Ok(Self {
            config,
            ledger: LedgerClient::new(ledger),
            policies: strategies,
            demand_schedule,
            state: SimulationState::default(),
            phase: DriverPhase::Initializing,
            current_week: 0,
            history: Vec::new(),
        })
    }

    pub fn phase(&self) -> DriverPhase {
        self.phase
    }

    pub fn ledger(&self) -> &L {
        self.ledger.inner()
    }

    pub fn into_ledger(self) -> L {
        self.ledger.into_inner()
    }

    pub fn run(&mut self) -> Result<RunReport, SimError> {
        self.initialize()?;
        while self.current_week < self.config.max_weeks {
            self.step()?;
        }
        self.finalize()
    }

    fn initialize(&mut self) -> Result<(), SimError> {
        self.phase = DriverPhase::Initializing;
        let setup = self.config.ledger_setup(&self.demand_schedule);
        self.ledger.initialize(&setup).map_err(SimError::Setup)?;

        self.state = SimulationState::reset(&self.policies);
        self.history.clear();
        self.current_week = 0;

        info!(
            target: "sim.driver",
            visibility = self.config.visibility.name(),
            weeks = self.config.max_weeks,
            lead_time = self.config.lead_time(),
            policies = ?self.policies.iter().map(|p| p.name()).collect::<Vec<_>>(),
            "run initialized"
        );
        Ok(())
    }

    fn step(&mut self) -> Result<(), SimError> {
        let week = self.current_week;
        match self.ledger.current_week() {
            Ok(ledger_week) if ledger_week != week => {
                warn!(target: "sim.driver", week, ledger_week, "ledger week out of step with driver");
            }
            Ok(_) => {}
            Err(err) => debug!(target: "sim.driver", week, error = %err, "ledger week unavailable"),
        }
        let customer = self.fetch_customer(week);

        let mut decisions = Vec::with_capacity(AgentRole::ALL.len());
        for role in AgentRole::ALL {
            decisions.push(self.decide_and_submit(role, week, &customer)?);
        }

        self.phase = DriverPhase::Advance;
        self.ledger
            .advance_week()
            .map_err(|source| SimError::AdvanceFailed { week, source })?;

        for decision in decisions {
            self.record(week, &customer, decision);
        }

        if self.config.log_every > 0 && (week + 1) % self.config.log_every == 0 {
            if let Some(retailer) = self.history.iter().rev().find(|r| r.role == AgentRole::Retailer) {
                info!(
                    target: "sim.driver",
                    week,
                    retailer_inventory = retailer.inventory,
                    retailer_backlog = retailer.backlog,
                    retailer_cost = retailer.weekly_cost,
                    "progress"
                );
            }
        }

        self.current_week += 1;
        Ok(())
    }

    fn fetch_customer(&mut self, week: usize) -> CustomerView {
        let mut degraded = false;

        let demand = match self.ledger.customer_demand() {
            Ok(d) => Some(d),
            Err(err) => {
                warn!(target: "sim.driver", week, error = %err, "customer demand unavailable, using last known");
                degraded = true;
                None
            }
        };
        let history = match self.ledger.customer_history(self.config.history_window) {
            Ok(h) => Some(h),
            Err(err) => {
                warn!(target: "sim.driver", week, error = %err, "customer history unavailable, using last known");
                degraded = true;
                None
            }
        };
        self.state.remember_customer(demand, history);

        CustomerView {
            demand: demand.or(self.state.last_customer_demand()),
            history: self.state.customer_history().to_vec(),
            degraded,
        }
    }

    fn fetch_snapshot(&self, role: AgentRole, week: usize) -> Result<RoleSnapshot, SimError> {
        let unavailable = |source: LedgerError| SimError::DataUnavailable { role, week, source };

        let member = self.ledger.member_state(role).map_err(unavailable)?;
        let pipeline = self.ledger.pipeline(role).map_err(unavailable)?;
        let lead_time = self.ledger.lead_time().map_err(unavailable)?;
        let on_order = pipeline.iter().fold(0u32, |acc, q| acc.saturating_add(*q));

        Ok(RoleSnapshot {
            state: RoleState {
                on_hand: member.on_hand,
                backlog: member.backlog,
                on_order,
                lead_time,
            },
            pipeline,
        })
    }

    /// Fills in what `role` is allowed to see this week.
    ///
    /// Returns the context and whether any optional piece had to be left out.
    fn build_context(
        &self,
        role: AgentRole,
        week: usize,
        pipeline: Vec<u32>,
        customer: &CustomerView,
    ) -> (OrderContext, bool) {
        let visibility = self.config.visibility;
        let mut degraded = false;

        let mut context = OrderContext::new(role, week, visibility);
        context.pipeline = pipeline;
        context.cold_start_strategy = self.config.cold_start;
        // Nobody above the retailer has downstream data in week 0, whatever the mode.
        context.cold_start = role != AgentRole::Retailer && week == 0;

        match self
            .ledger
            .received_orders(role, week, self.config.history_window)
        {
            Ok(orders) => context.received_orders = orders,
            Err(err) => {
                warn!(target: "sim.driver", week, role = role.name(), error = %err, "received orders unavailable");
                degraded = true;
            }
        }

        if context.sees_end_customer() {
            context.customer_demand = customer.demand;
            context.customer_history = customer.history.clone();
            degraded |= customer.degraded;
        }

        if visibility == VisibilityMode::Blockchain && !context.cold_start {
            context.latest_orders = self.state.latest_orders();
            if let Some(downstream) = role.downstream() {
                match self.ledger.role_state(downstream) {
                    Ok(state) => context.downstream = Some(state),
                    Err(err) => {
                        warn!(target: "sim.driver", week, role = role.name(), error = %err, "downstream state unavailable");
                        degraded = true;
                    }
                }
            }
        }

        (context, degraded)
    }

    fn decide_and_submit(
        &mut self,
        role: AgentRole,
        week: usize,
        customer: &CustomerView,
    ) -> Result<WeekDecision, SimError> {
        self.phase = DriverPhase::FetchState;
        let (snapshot, mut degraded) = match self.fetch_snapshot(role, week) {
            Ok(snapshot) => {
                self.state.remember(role, snapshot.clone());
                (snapshot, false)
            }
            Err(err) => {
                if self.config.on_data_unavailable == DataFallback::Abort {
                    return Err(err);
                }
                match self.state.last_known(role) {
                    Some(snapshot) => {
                        warn!(target: "sim.driver", week, role = role.name(), error = %err, "deciding on last known state");
                        (snapshot.clone(), true)
                    }
                    None => {
                        warn!(
                            target: "sim.driver",
                            week,
                            role = role.name(),
                            error = %err,
                            fallback_order = self.config.fallback_order,
                            "no state known, submitting fallback order"
                        );
                        return Ok(self.submit_fallback(role, week));
                    }
                }
            }
        };

        let (context, context_degraded) =
            self.build_context(role, week, snapshot.pipeline, customer);
        degraded |= context_degraded;

        self.phase = DriverPhase::Decide;
        let previous = self.state.forecast(role);
        let decision = match self.policies[role.index()].calculate_order(
            &snapshot.state,
            &context,
            previous,
        ) {
            Ok(decision) => decision,
            Err(err) => {
                warn!(target: "sim.driver", week, role = role.name(), error = %err, "policy failed, using fallback order");
                OrderDecision {
                    degraded: true,
                    persist_forecast: previous.is_some(),
                    ..OrderDecision::new(
                        self.config.fallback_order,
                        previous.unwrap_or(DEFAULT_FORECAST),
                    )
                }
            }
        };
        if decision.persist_forecast {
            self.state.set_forecast(role, decision.forecast);
        }

        debug!(
            target: "sim.driver",
            week,
            role = role.name(),
            policy = self.policies[role.index()].name(),
            on_hand = snapshot.state.on_hand,
            backlog = snapshot.state.backlog,
            on_order = snapshot.state.on_order,
            forecast = decision.forecast,
            order = decision.quantity,
            "decided"
        );

        let submitted = self.submit(role, week, decision.quantity);

        Ok(WeekDecision {
            role,
            quantity: decision.quantity,
            forecast: decision.forecast,
            downstream_target: decision.downstream_target.map(|t| t.target),
            degraded: degraded || decision.degraded || !submitted,
        })
    }

    fn submit_fallback(&mut self, role: AgentRole, week: usize) -> WeekDecision {
        let quantity = self.config.fallback_order;
        self.submit(role, week, quantity);
        WeekDecision {
            role,
            quantity,
            forecast: self.state.forecast(role).unwrap_or(DEFAULT_FORECAST),
            downstream_target: None,
            degraded: true,
        }
    }

    /// Writes the decision to the ledger. A rejection is logged and the run goes on.
    fn submit(&mut self, role: AgentRole, week: usize, quantity: u32) -> bool {
        self.phase = DriverPhase::Submit;
        match self.ledger.submit(role, quantity) {
            Ok(()) => {
                self.state.record_order(role, quantity);
                true
            }
            Err(source) => {
                let err = SimError::SubmissionRejected { role, week, source };
                warn!(target: "sim.driver", error = %err, "submission rejected");
                // The ledger books nothing for this role.
                self.state.record_order(role, 0);
                false
            }
        }
    }

    fn record(&mut self, week: usize, customer: &CustomerView, decision: WeekDecision) {
        let role = decision.role;
        let (member, telemetry_ok) = match self.ledger.member_state(role) {
            Ok(member) => (member, true),
            Err(err) => {
                warn!(target: "sim.driver", week, role = role.name(), error = %err, "telemetry unavailable");
                let total_cost = self
                    .history
                    .iter()
                    .rev()
                    .find(|r| r.role == role)
                    .map(|r| r.total_cost)
                    .unwrap_or(0.0);
                (
                    MemberState {
                        total_cost,
                        ..MemberState::default()
                    },
                    false,
                )
            }
        };

        self.history.push(HistoryRecord {
            week,
            role,
            visibility: self.config.visibility,
            customer_demand: customer.demand,
            inventory: member.on_hand,
            backlog: member.backlog,
            order_placed: decision.quantity,
            incoming_shipment: member.incoming_shipment,
            weekly_cost: member.weekly_cost,
            total_cost: member.total_cost,
            forecast: decision.forecast,
            downstream_target: decision.downstream_target,
            degraded: decision.degraded || !telemetry_ok || customer.demand.is_none(),
        });
    }

    fn finalize(&mut self) -> Result<RunReport, SimError> {
        self.phase = DriverPhase::Finalizing;

        let mut cost_by_role = Vec::with_capacity(AgentRole::ALL.len());
        for role in AgentRole::ALL {
            let cost = match self.ledger.member_state(role) {
                Ok(member) => member.total_cost,
                Err(err) => {
                    warn!(target: "sim.driver", role = role.name(), error = %err, "final cost unavailable, summing telemetry");
                    self.history
                        .iter()
                        .filter(|r| r.role == role)
                        .map(|r| r.weekly_cost)
                        .sum()
                }
            };
            cost_by_role.push((role, cost));
        }
        let total_cost = cost_by_role.iter().map(|(_, c)| c).sum();

        let weeks = self.current_week;
        let customer_demand = (0..weeks)
            .map(|w| self.demand_schedule.get(w).copied().unwrap_or(0))
            .collect();

        let report = RunReport {
            visibility: self.config.visibility,
            weeks,
            customer_demand,
            history: self.history.clone(),
            cost_by_role,
            total_cost,
        };

        info!(
            target: "sim.driver",
            visibility = self.config.visibility.name(),
            total_cost = report.total_cost,
            degraded = report.degraded_records(),
            "run finished"
        );
        self.phase = DriverPhase::Finished;
        Ok(report)
    }
}
