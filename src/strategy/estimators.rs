// src/strategy/estimators.rs

//! Forecast and variability estimators shared by the ordering policies.

use serde::{Deserialize, Serialize};

/// Forecast used when there is nothing to average.
pub const DEFAULT_FORECAST: f64 = 4.0;

/// Exponential smoothing step: `theta * signal + (1 - theta) * previous`.
pub fn update_forecast(signal: f64, previous_forecast: f64, theta: f64) -> f64 {
    theta * signal + (1.0 - theta) * previous_forecast
}

/// Mean of the last `min(window, len)` values, or `DEFAULT_FORECAST` when empty.
pub fn moving_average(history: &[f64], window: usize) -> f64 {
    let tail = last_n(history, window);
    if tail.is_empty() {
        return DEFAULT_FORECAST;
    }
    tail.iter().sum::<f64>() / tail.len() as f64
}

pub fn last_n<T>(history: &[T], n: usize) -> &[T] {
    &history[history.len().saturating_sub(n)..]
}

/// Whose demand a standard deviation describes. Decides the single-sample floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariabilityScope {
    /// Orders a role received from its downstream neighbour.
    Local,
    /// End-customer demand.
    EndCustomer,
}

/// Population standard deviation around `mean`.
///
/// Empty history gives 0. A single observation gives a floor instead of 0 so
/// safety stock does not collapse in the first weeks: `max(1, mean / 4)` for
/// local orders, `1` for end-customer demand.
pub fn std_dev(history: &[f64], mean: f64, scope: VariabilityScope) -> f64 {
    match history.len() {
        0 => 0.0,
        1 => match scope {
            VariabilityScope::Local => (mean * 0.25).max(1.0),
            VariabilityScope::EndCustomer => 1.0,
        },
        n => {
            let sum_sq: f64 = history.iter().map(|x| (x - mean).powi(2)).sum();
            (sum_sq / n as f64).sqrt()
        }
    }
}

/// Drops zero entries. A zero in a received-order history means no order had
/// been placed yet, not a demand of zero.
pub fn non_zero(history: &[u32]) -> Vec<f64> {
    history
        .iter()
        .filter(|v| **v > 0)
        .map(|v| *v as f64)
        .collect()
}

pub fn as_f64(history: &[u32]) -> Vec<f64> {
    history.iter().map(|v| *v as f64).collect()
}

/// How a policy turns a demand history into a point forecast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ForecastMethod {
    /// Smooth the latest signal into the persisted forecast.
    Exponential { theta: f64 },
    /// Average the bounded history window.
    MovingAverage { window: usize },
}

/// Mean and spread of a demand series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemandEstimate {
    pub forecast: f64,
    pub std_dev: f64,
}

/// What to assume about demand before a role has seen any real order.
///
/// Both strategies use only the role's own pipeline, so the outcome does not
/// depend on the visibility mode. The choice moves week-0 and week-1 orders
/// noticeably.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColdStartStrategy {
    /// Use the configured initial forecast and no variability.
    #[default]
    ConfiguredDefault,
    /// Treat the non-zero contents of the inbound pipeline as past demand.
    PipelineProxy,
}

impl ColdStartStrategy {
    /// Proxy demand history, empty when the strategy has nothing to offer.
    pub fn proxy_history(&self, pipeline: &[u32]) -> Vec<f64> {
        match self {
            ColdStartStrategy::ConfiguredDefault => Vec::new(),
            ColdStartStrategy::PipelineProxy => non_zero(pipeline),
        }
    }

    /// A single stand-in signal for the recurrence-driven policies.
    pub fn proxy_signal(&self, pipeline: &[u32]) -> Option<f64> {
        let history = self.proxy_history(pipeline);
        if history.is_empty() {
            None
        } else {
            Some(history.iter().sum::<f64>() / history.len() as f64)
        }
    }

    /// Forecast and spread to use under cold start.
    pub fn estimate(&self, pipeline: &[u32], initial_forecast: f64) -> DemandEstimate {
        let history = self.proxy_history(pipeline);
        if history.is_empty() {
            return DemandEstimate {
                forecast: initial_forecast,
                std_dev: 0.0,
            };
        }
        let forecast = moving_average(&history, history.len());
        DemandEstimate {
            forecast,
            std_dev: std_dev(&history, forecast, VariabilityScope::Local),
        }
    }
}
