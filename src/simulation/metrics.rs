// src/simulation/metrics.rs

use crate::model::agent::AgentRole;
use crate::simulation::engine::RunReport;
use serde::Serialize;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance.
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Standard deviation over mean; 0 when the mean is not positive.
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    let m = mean(values);
    if m <= 0.0 {
        return 0.0;
    }
    variance(values).sqrt() / m
}

/// CV of a role's orders divided by CV of end-customer demand.
///
/// Zero when demand has no variation, so a flat demand series never yields
/// an infinite ratio.
pub fn bullwhip_ratio(orders: &[u32], demand: &[u32]) -> f64 {
    let orders: Vec<f64> = orders.iter().map(|&o| f64::from(o)).collect();
    let demand: Vec<f64> = demand.iter().map(|&d| f64::from(d)).collect();
    let cv_demand = coefficient_of_variation(&demand);
    if cv_demand <= 0.0 {
        return 0.0;
    }
    coefficient_of_variation(&orders) / cv_demand
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleMetrics {
    pub role: AgentRole,
    pub average_inventory: f64,
    pub average_backlog: f64,
    pub order_variance: f64,
    pub order_cv: f64,
    pub bullwhip_ratio: f64,
    pub total_cost: f64,
}

pub fn role_metrics(report: &RunReport) -> Vec<RoleMetrics> {
    AgentRole::ALL
        .iter()
        .map(|&role| {
            let inventory: Vec<f64> = report
                .records_for(role)
                .map(|r| f64::from(r.inventory))
                .collect();
            let backlog: Vec<f64> = report
                .records_for(role)
                .map(|r| f64::from(r.backlog))
                .collect();
            let orders = report.orders_for(role);
            let order_values: Vec<f64> = orders.iter().map(|&o| f64::from(o)).collect();

            RoleMetrics {
                role,
                average_inventory: mean(&inventory),
                average_backlog: mean(&backlog),
                order_variance: variance(&order_values),
                order_cv: coefficient_of_variation(&order_values),
                bullwhip_ratio: bullwhip_ratio(&orders, &report.customer_demand),
                total_cost: report.total_cost_for(role),
            }
        })
        .collect()
}

/// One line of the traditional vs blockchain summary table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricComparison {
    pub metric: String,
    pub traditional: f64,
    pub blockchain: f64,
    pub difference: f64,
    /// Relative to the traditional value; 0 when that is zero.
    pub percent_change: f64,
}

impl MetricComparison {
    pub fn new(metric: impl Into<String>, traditional: f64, blockchain: f64) -> Self {
        let difference = blockchain - traditional;
        let percent_change = if traditional != 0.0 {
            (difference / traditional * 100.0 * 100.0).round() / 100.0
        } else {
            0.0
        };
        Self {
            metric: metric.into(),
            traditional,
            blockchain,
            difference,
            percent_change,
        }
    }
}

/// Total cost, then average inventory, average backlog and bullwhip per role.
pub fn summary_metrics(traditional: &RunReport, blockchain: &RunReport) -> Vec<MetricComparison> {
    let trad = role_metrics(traditional);
    let chain = role_metrics(blockchain);

    let mut rows = vec![MetricComparison::new(
        "Total Cost",
        traditional.total_supply_chain_cost(),
        blockchain.total_supply_chain_cost(),
    )];

    let sections: [(&str, fn(&RoleMetrics) -> f64); 3] = [
        ("Avg Inventory", |m| m.average_inventory),
        ("Avg Backlog", |m| m.average_backlog),
        ("Bullwhip", |m| m.bullwhip_ratio),
    ];
    for (label, value) in sections {
        for (t, b) in trad.iter().zip(&chain) {
            rows.push(MetricComparison::new(
                format!("{label} - {}", t.role.name()),
                value(t),
                value(b),
            ));
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::engine::HistoryRecord;
    use crate::strategy::traits::VisibilityMode;

    fn report(orders: &[[u32; 4]], demand: &[u32]) -> RunReport {
        let mut history = Vec::new();
        for (week, row) in orders.iter().enumerate() {
            for role in AgentRole::ALL {
                history.push(HistoryRecord {
                    week,
                    role,
                    visibility: VisibilityMode::Traditional,
                    customer_demand: Some(demand[week]),
                    inventory: 10,
                    backlog: week as u32,
                    order_placed: row[role.index()],
                    incoming_shipment: 4,
                    weekly_cost: 5.0,
                    total_cost: 5.0 * (week + 1) as f64,
                    forecast: 4.0,
                    downstream_target: None,
                    degraded: false,
                });
            }
        }
        let weeks = orders.len();
        RunReport {
            visibility: VisibilityMode::Traditional,
            weeks,
            customer_demand: demand.to_vec(),
            history,
            cost_by_role: AgentRole::ALL
                .iter()
                .map(|r| (*r, 5.0 * weeks as f64))
                .collect(),
            total_cost: 20.0 * weeks as f64,
        }
    }

    #[test]
    fn statistics_of_empty_input_are_zero() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(variance(&[]), 0.0);
        assert_eq!(coefficient_of_variation(&[0.0, 0.0]), 0.0);
    }

    #[test]
    fn variance_is_population_variance() {
        assert!((variance(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn bullwhip_is_one_when_orders_mirror_demand() {
        let demand = [4, 8, 4, 8];
        assert!((bullwhip_ratio(&demand, &demand) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn bullwhip_guards_flat_demand() {
        assert_eq!(bullwhip_ratio(&[1, 9, 3], &[4, 4, 4]), 0.0);
        assert_eq!(bullwhip_ratio(&[0, 0, 0], &[4, 8, 4]), 0.0);
    }

    #[test]
    fn role_metrics_amplify_upstream() {
        let orders = [[4, 4, 4, 2], [8, 8, 10, 14], [4, 4, 2, 0], [8, 8, 12, 16]];
        let demand = [4, 8, 4, 8];
        let metrics = role_metrics(&report(&orders, &demand));
        assert_eq!(metrics.len(), 4);
        assert!((metrics[0].bullwhip_ratio - 1.0).abs() < 1e-12);
        assert!(metrics[3].bullwhip_ratio > metrics[2].bullwhip_ratio);
        assert!((metrics[0].average_backlog - 1.5).abs() < 1e-12);
        assert_eq!(metrics[0].average_inventory, 10.0);
        assert_eq!(metrics[1].total_cost, 20.0);
    }

    #[test]
    fn summary_has_cost_then_three_rows_per_role() {
        let demand = [4, 8, 4, 8];
        let trad = report(&[[4, 4, 4, 4], [8, 8, 8, 8], [4, 4, 4, 4], [8, 8, 8, 8]], &demand);
        let chain = report(&[[4, 4, 4, 4], [8, 8, 8, 8], [4, 4, 4, 4], [8, 8, 8, 8]], &demand);
        let rows = summary_metrics(&trad, &chain);
        assert_eq!(rows.len(), 13);
        assert_eq!(rows[0].metric, "Total Cost");
        assert_eq!(rows[1].metric, "Avg Inventory - retailer");
        assert_eq!(rows[12].metric, "Bullwhip - factory");
        assert!(rows.iter().all(|r| r.difference == 0.0));
    }

    #[test]
    fn percent_change_is_relative_to_traditional() {
        let row = MetricComparison::new("Total Cost", 200.0, 150.0);
        assert_eq!(row.difference, -50.0);
        assert_eq!(row.percent_change, -25.0);
        assert_eq!(MetricComparison::new("x", 0.0, 3.0).percent_change, 0.0);
    }
}
