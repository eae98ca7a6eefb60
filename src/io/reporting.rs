// src/io/reporting.rs

use crate::error::SimError;
use crate::model::agent::AgentRole;
use crate::simulation::engine::{HistoryRecord, RunReport};
use crate::simulation::metrics::MetricComparison;
use crate::simulation::sweep::{CostComparison, StageMetrics, SweepRow};
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

/// Serializes rows to a CSV file, one header line from the row type.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), SimError> {
    ensure_parent(path)?;
    let mut wtr = csv::Writer::from_path(path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    // Flush the buffer to ensure all data is written
    wtr.flush()?;
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), SimError> {
    ensure_parent(path)?;
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<(), SimError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => Ok(fs::create_dir_all(dir)?),
        _ => Ok(()),
    }
}

/// Writes the simulation history to a CSV file.
///
/// # Arguments
/// * `path` - Where to save the file (e.g., "results/run_1.csv").
/// * `data` - The history records from the simulation engine.
pub fn write_simulation_log(path: &Path, data: &[HistoryRecord]) -> Result<(), SimError> {
    write_csv(path, data)?;
    info!(target: "sim.report", rows = data.len(), path = %path.display(), "simulation log written");
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerEntry {
    pub week: usize,
    pub demand: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekEntry {
    pub week: usize,
    pub order: u32,
    pub on_hand: u32,
    pub backlog: u32,
    pub incoming_shipment: u32,
    pub weekly_cost: f64,
    pub total_cost: f64,
    pub degraded: bool,
}

impl From<&HistoryRecord> for WeekEntry {
    fn from(r: &HistoryRecord) -> Self {
        Self {
            week: r.week,
            order: r.order_placed,
            on_hand: r.inventory,
            backlog: r.backlog,
            incoming_shipment: r.incoming_shipment,
            weekly_cost: r.weekly_cost,
            total_cost: r.total_cost,
            degraded: r.degraded,
        }
    }
}

/// Per-run JSON file: customer demand plus one week list per role.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunFile {
    pub visibility: String,
    pub weeks: usize,
    pub customer: Vec<CustomerEntry>,
    pub retailer: Vec<WeekEntry>,
    pub wholesaler: Vec<WeekEntry>,
    pub distributor: Vec<WeekEntry>,
    pub factory: Vec<WeekEntry>,
    pub total_cost: f64,
}

impl From<&RunReport> for RunFile {
    fn from(report: &RunReport) -> Self {
        let entries = |role: AgentRole| -> Vec<WeekEntry> {
            report.records_for(role).map(WeekEntry::from).collect()
        };
        Self {
            visibility: report.visibility.name().to_string(),
            weeks: report.weeks,
            customer: report
                .customer_demand
                .iter()
                .enumerate()
                .map(|(week, &demand)| CustomerEntry { week, demand })
                .collect(),
            retailer: entries(AgentRole::Retailer),
            wholesaler: entries(AgentRole::Wholesaler),
            distributor: entries(AgentRole::Distributor),
            factory: entries(AgentRole::Factory),
            total_cost: report.total_cost,
        }
    }
}

pub fn write_run_json(path: &Path, report: &RunReport) -> Result<(), SimError> {
    write_json(path, &RunFile::from(report))?;
    info!(
        target: "sim.report",
        visibility = report.visibility.name(),
        path = %path.display(),
        "run file written"
    );
    Ok(())
}

pub fn write_comparison_summary(path: &Path, summary: &CostComparison) -> Result<(), SimError> {
    write_json(path, summary)?;
    info!(target: "sim.report", path = %path.display(), "comparison summary written");
    Ok(())
}

#[derive(Serialize)]
struct MetricRow<'a> {
    #[serde(rename = "Metric")]
    metric: &'a str,
    #[serde(rename = "Traditional")]
    traditional: f64,
    #[serde(rename = "Blockchain")]
    blockchain: f64,
    #[serde(rename = "Difference")]
    difference: f64,
    #[serde(rename = "% Change")]
    percent_change: f64,
}

/// The traditional vs blockchain metrics table as CSV.
pub fn write_metrics_table(path: &Path, rows: &[MetricComparison]) -> Result<(), SimError> {
    let rows: Vec<MetricRow> = rows
        .iter()
        .map(|r| MetricRow {
            metric: &r.metric,
            traditional: r.traditional,
            blockchain: r.blockchain,
            difference: r.difference,
            percent_change: r.percent_change,
        })
        .collect();
    write_csv(path, &rows)?;
    info!(target: "sim.report", path = %path.display(), "metrics table written");
    Ok(())
}

pub fn write_sweep_table(path: &Path, rows: &[SweepRow]) -> Result<(), SimError> {
    write_csv(path, rows)?;
    info!(target: "sim.report", rows = rows.len(), path = %path.display(), "sweep table written");
    Ok(())
}

#[derive(Serialize)]
struct BullwhipRow<'a> {
    #[serde(rename = "Scenario")]
    scenario: &'a str,
    #[serde(rename = "Stage")]
    stage: &'static str,
    #[serde(rename = "Mode")]
    mode: &'static str,
    #[serde(rename = "Variance_Orders_Placed")]
    variance_orders_placed: f64,
    #[serde(rename = "CV_Orders")]
    cv_orders: f64,
    #[serde(rename = "Bullwhip_Ratio")]
    bullwhip_ratio: f64,
    #[serde(rename = "Mean_Total_Cost")]
    mean_total_cost: f64,
}

/// Per-role, per-mode sweep metrics in the long layout the plotting
/// scripts pivot on (`Scenario`, `Stage`, `Mode`).
pub fn write_bullwhip_metrics(path: &Path, stages: &[StageMetrics]) -> Result<(), SimError> {
    let rows: Vec<BullwhipRow> = stages
        .iter()
        .map(|s| BullwhipRow {
            scenario: &s.scenario,
            stage: s.stage.name(),
            mode: s.mode.name(),
            variance_orders_placed: s.variance_orders_placed,
            cv_orders: s.cv_orders,
            bullwhip_ratio: s.bullwhip_ratio,
            mean_total_cost: s.mean_total_cost,
        })
        .collect();
    write_csv(path, &rows)?;
    info!(target: "sim.report", rows = rows.len(), path = %path.display(), "bullwhip metrics written");
    Ok(())
}
