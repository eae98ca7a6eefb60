// src/simulation/sweep.rs

use crate::error::SimError;
use crate::ledger::client::Ledger;
use crate::model::agent::AgentRole;
use crate::simulation::config::{PolicyAssignment, SimulationConfig};
use crate::simulation::engine::{ChainSimulation, RunReport};
use crate::simulation::metrics::role_metrics;
use crate::strategy::implementations::{BaseStockParams, PolicyKind, StermanParams};
use crate::strategy::traits::VisibilityMode;
use serde::Serialize;
use tracing::info;

/// Run summary in the shape the analysis tooling reads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostComparison {
    pub traditional_cost: f64,
    pub blockchain_cost: f64,
    pub cost_reduction: f64,
    pub cost_reduction_percent: f64,
}

impl CostComparison {
    pub fn new(traditional_cost: f64, blockchain_cost: f64) -> Self {
        let cost_reduction = traditional_cost - blockchain_cost;
        let cost_reduction_percent = if traditional_cost > 0.0 {
            cost_reduction / traditional_cost * 100.0
        } else {
            0.0
        };
        Self {
            traditional_cost,
            blockchain_cost,
            cost_reduction,
            cost_reduction_percent,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VisibilityComparison {
    pub traditional: RunReport,
    pub blockchain: RunReport,
    pub summary: CostComparison,
}

/// One full run on a fresh ledger with freshly built policies.
pub fn run_once<L: Ledger>(
    config: &SimulationConfig,
    policies: &PolicyAssignment,
    demand: &[u32],
    ledger: L,
) -> Result<RunReport, SimError> {
    let mut sim = ChainSimulation::new(config.clone(), ledger, demand.to_vec(), policies.build())?;
    sim.run()
}

/// Runs the same demand and policies once per visibility mode.
///
/// `make_ledger` is called once per run so the two runs never share ledger
/// or forecast state.
pub fn compare_visibility<L, F>(
    mut make_ledger: F,
    config: &SimulationConfig,
    policies: &PolicyAssignment,
    demand: &[u32],
) -> Result<VisibilityComparison, SimError>
where
    L: Ledger,
    F: FnMut() -> L,
{
    let traditional = run_once(
        &config.with_visibility(VisibilityMode::Traditional),
        policies,
        demand,
        make_ledger(),
    )?;
    let blockchain = run_once(
        &config.with_visibility(VisibilityMode::Blockchain),
        policies,
        demand,
        make_ledger(),
    )?;

    let summary = CostComparison::new(traditional.total_cost, blockchain.total_cost);
    info!(
        target: "sim.sweep",
        policies = %policies.label(),
        traditional = summary.traditional_cost,
        blockchain = summary.blockchain_cost,
        reduction_pct = summary.cost_reduction_percent,
        "visibility comparison"
    );

    Ok(VisibilityComparison {
        traditional,
        blockchain,
        summary,
    })
}

/// One configuration of a parameter grid.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepPoint {
    pub label: String,
    pub policies: PolicyAssignment,
    pub alpha_s: Option<f64>,
    pub beta: Option<f64>,
    pub service_level: Option<f64>,
}

/// Every (alpha_s, beta) pair applied to all four roles.
pub fn sterman_grid(alphas: &[f64], betas: &[f64], base: StermanParams) -> Vec<SweepPoint> {
    let mut points = Vec::with_capacity(alphas.len() * betas.len());
    for &alpha_s in alphas {
        for &beta in betas {
            let params = StermanParams {
                alpha_s,
                beta,
                ..base
            };
            points.push(SweepPoint {
                label: format!("sterman a={alpha_s} b={beta}"),
                policies: PolicyAssignment::uniform(PolicyKind::Sterman(params)),
                alpha_s: Some(alpha_s),
                beta: Some(beta),
                service_level: None,
            });
        }
    }
    points
}

pub fn service_level_grid(levels: &[f64], base: BaseStockParams) -> Vec<SweepPoint> {
    levels
        .iter()
        .map(|&service_level| SweepPoint {
            label: format!("base_stock sl={service_level}"),
            policies: PolicyAssignment::uniform(PolicyKind::BaseStock(BaseStockParams {
                service_level,
                ..base
            })),
            alpha_s: None,
            beta: None,
            service_level: Some(service_level),
        })
        .collect()
}

/// One row of a sweep table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepRow {
    pub label: String,
    pub policies: String,
    pub alpha_s: Option<f64>,
    pub beta: Option<f64>,
    pub service_level: Option<f64>,
    pub traditional_cost: f64,
    pub blockchain_cost: f64,
    pub cost_reduction: f64,
    pub cost_reduction_percent: f64,
    pub degraded_records: usize,
}

/// Order variability, bullwhip and cost of one role in one run of a point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageMetrics {
    pub scenario: String,
    pub stage: AgentRole,
    pub mode: VisibilityMode,
    pub variance_orders_placed: f64,
    pub cv_orders: f64,
    pub bullwhip_ratio: f64,
    /// Mean of the role's total cost over the point's runs in this mode.
    pub mean_total_cost: f64,
}

impl StageMetrics {
    /// One entry per role, in chain order.
    pub fn for_run(scenario: &str, report: &RunReport) -> Vec<Self> {
        role_metrics(report)
            .into_iter()
            .map(|m| Self {
                scenario: scenario.to_string(),
                stage: m.role,
                mode: report.visibility,
                variance_orders_placed: m.order_variance,
                cv_orders: m.order_cv,
                bullwhip_ratio: m.bullwhip_ratio,
                mean_total_cost: m.total_cost,
            })
            .collect()
    }
}

/// Cost rows per point plus per-role metrics per point and mode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepResults {
    pub rows: Vec<SweepRow>,
    pub stages: Vec<StageMetrics>,
}

/// Runs a traditional vs blockchain comparison for every point.
pub fn sweep<L, F>(
    mut make_ledger: F,
    config: &SimulationConfig,
    points: &[SweepPoint],
    demand: &[u32],
) -> Result<SweepResults, SimError>
where
    L: Ledger,
    F: FnMut() -> L,
{
    info!(target: "sim.sweep", points = points.len(), weeks = config.max_weeks, "sweep started");

    let mut rows = Vec::with_capacity(points.len());
    let mut stages = Vec::with_capacity(points.len() * AgentRole::ALL.len() * 2);
    for (i, point) in points.iter().enumerate() {
        let comparison = compare_visibility(&mut make_ledger, config, &point.policies, demand)?;
        let summary = comparison.summary;
        info!(
            target: "sim.sweep",
            point = i + 1,
            of = points.len(),
            label = %point.label,
            reduction_pct = summary.cost_reduction_percent,
            "point done"
        );
        for report in [&comparison.traditional, &comparison.blockchain] {
            stages.extend(StageMetrics::for_run(&point.label, report));
        }
        rows.push(SweepRow {
            label: point.label.clone(),
            policies: point.policies.label(),
            alpha_s: point.alpha_s,
            beta: point.beta,
            service_level: point.service_level,
            traditional_cost: summary.traditional_cost,
            blockchain_cost: summary.blockchain_cost,
            cost_reduction: summary.cost_reduction,
            cost_reduction_percent: summary.cost_reduction_percent,
            degraded_records: comparison.traditional.degraded_records()
                + comparison.blockchain.degraded_records(),
        });
    }
    Ok(SweepResults { rows, stages })
}
