// src/strategy/optimization.rs

//! Inventory-target arithmetic for the base-stock family.

/// Calculates the Critical Ratio (Target Service Level).
///
/// The critical ratio represents the probability of not stocking out
/// that balances the cost of overstocking (holding) vs understocking (backlog).
///
/// Formula: CR = BacklogCost / (BacklogCost + HoldingCost)
pub fn calculate_critical_ratio(backlog_cost: f64, holding_cost: f64) -> f64 {
    if backlog_cost + holding_cost == 0.0 {
        return 0.0;
    }
    backlog_cost / (backlog_cost + holding_cost)
}

/// Z-score for a service level, from a fixed table.
///
/// | service level | z    |
/// |---------------|------|
/// | <= 0.84       | 1.00 |
/// | <= 0.95       | 1.65 |
/// | <= 0.975      | 1.96 |
/// | <= 0.99       | 2.33 |
/// | above         | 2.58 |
pub fn safety_factor(service_level: f64) -> f64 {
    if service_level <= 0.84 {
        1.00
    } else if service_level <= 0.95 {
        1.65
    } else if service_level <= 0.975 {
        1.96
    } else if service_level <= 0.99 {
        2.33
    } else {
        2.58
    }
}

/// Order-up-to level covering demand over the lead time plus safety stock.
///
/// # Formula
/// Target = Forecast * L + z(ServiceLevel) * StdDev * sqrt(L)
pub fn base_stock_level(forecast: f64, lead_time: u32, std_dev: f64, service_level: f64) -> f64 {
    let lead = lead_time as f64;
    forecast * lead + safety_factor(service_level) * std_dev * lead.sqrt()
}

/// Shortfall between a target and the current inventory position, never negative.
///
/// Returns `None` when the gap is not a finite number.
pub fn order_up_to(target: f64, inventory_position: i64) -> Option<u32> {
    let gap = target - inventory_position as f64;
    if !gap.is_finite() {
        return None;
    }
    Some(clamp_order(gap))
}

/// Rounds a raw order and clips it into `0..=u32::MAX`.
pub fn clamp_order(raw: f64) -> u32 {
    if raw <= 0.0 || raw.is_nan() {
        0
    } else {
        // `as` saturates at u32::MAX.
        raw.round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critical_ratio_for_standard_costs() {
        let cr = calculate_critical_ratio(1.0, 0.5);
        assert!((cr - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(calculate_critical_ratio(0.0, 0.0), 0.0);
    }

    #[test]
    fn safety_factor_table_boundaries() {
        assert_eq!(safety_factor(0.5), 1.00);
        assert_eq!(safety_factor(0.84), 1.00);
        assert_eq!(safety_factor(0.90), 1.65);
        assert_eq!(safety_factor(0.95), 1.65);
        assert_eq!(safety_factor(0.97), 1.96);
        assert_eq!(safety_factor(0.975), 1.96);
        assert_eq!(safety_factor(0.99), 2.33);
        assert_eq!(safety_factor(0.995), 2.58);
    }

    #[test]
    fn base_stock_without_variability_is_lead_time_demand() {
        let target = base_stock_level(6.0, 3, 0.0, 0.97);
        assert_eq!(target, 18.0);
        assert_eq!(order_up_to(target, 10), Some(8));
    }

    #[test]
    fn safety_stock_scales_with_sqrt_lead_time() {
        let target = base_stock_level(4.0, 4, 2.0, 0.97);
        assert!((target - (16.0 + 1.96 * 2.0 * 2.0)).abs() < 1e-12);
    }

    #[test]
    fn overstock_orders_nothing() {
        assert_eq!(order_up_to(10.0, 40), Some(0));
        assert_eq!(order_up_to(f64::NAN, 0), None);
        assert_eq!(clamp_order(-3.2), 0);
        assert_eq!(clamp_order(2.5), 3);
    }
}
