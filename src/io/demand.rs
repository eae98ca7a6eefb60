// src/io/demand.rs

use crate::error::SimError;
use crate::simulation::config::DemandSource;
use crate::simulation::metrics::coefficient_of_variation;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::path::Path;
use tracing::info;

/// Generates a demand schedule where every week has the exact same order amount.
/// Useful for testing stability (e.g., step-response tests).
pub fn generate_constant_demand(weeks: usize, value: u32) -> Vec<u32> {
    vec![value; weeks]
}

/// Generates a demand schedule based on a Normal (Bell Curve) distribution.
///
/// # Arguments
/// * `weeks` - Length of the simulation.
/// * `mean` - The average order size (e.g., 10.0).
/// * `std_dev` - The standard deviation (volatility) (e.g., 2.0).
/// * `seed` - Fixes the sequence; `None` draws a fresh one.
pub fn generate_normal_demand(
    weeks: usize,
    mean: f64,
    std_dev: f64,
    seed: Option<u64>,
) -> Result<Vec<u32>, SimError> {
    let normal = Normal::new(mean, std_dev)
        .map_err(|e| SimError::Config(format!("normal demand({mean}, {std_dev}): {e}")))?;
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    // Round to the nearest unit; demand cannot be negative.
    Ok((0..weeks)
        .map(|_| {
            let val: f64 = normal.sample(&mut rng);
            val.round().max(0.0) as u32
        })
        .collect())
}

/// Generates a "Step" pattern: 4 weeks of 4, then 8 for the rest.
/// This is the classic scenario used in the MIT Beer Game to trigger the Bullwhip effect.
pub fn generate_classic_beer_game_demand(weeks: usize) -> Vec<u32> {
    (0..weeks).map(|w| if w < 4 { 4 } else { 8 }).collect()
}

/// Reads one numeric column of a CSV file, skipping empty cells.
pub fn load_csv_column(path: &Path, column: &str) -> Result<Vec<f64>, SimError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let index = headers
        .iter()
        .position(|h| h.trim_start_matches('\u{feff}') == column)
        .ok_or_else(|| {
            SimError::Config(format!(
                "column '{column}' not found in {}",
                path.display()
            ))
        })?;

    let mut values = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let Some(cell) = record.get(index).filter(|c| !c.is_empty()) else {
            continue;
        };
        let value: f64 = cell.parse().map_err(|_| {
            SimError::Config(format!(
                "row {}: '{cell}' in column '{column}' is not a number",
                line + 2
            ))
        })?;
        values.push(value);
    }
    Ok(values)
}

/// Parameters of the scale-factor search in [`precision_scale`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalingSearch {
    pub target_mean: f64,
    /// Largest accepted relative CV error, 0.01 = 1%.
    pub cv_tolerance: f64,
    pub min_multiplier: f64,
    pub max_multiplier: f64,
    pub step: f64,
}

impl Default for ScalingSearch {
    fn default() -> Self {
        Self {
            target_mean: 6.0,
            cv_tolerance: 0.01,
            min_multiplier: 1.0,
            max_multiplier: 20.0,
            step: 0.005,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScaledDemand {
    pub scale: f64,
    pub values: Vec<u32>,
    /// |CV(rounded) - CV(original)| / CV(original)
    pub cv_error: f64,
}

/// Scales a raw series to whole units near a target mean while keeping its
/// coefficient of variation.
///
/// Starts at the factor that hits the target mean and widens it by
/// multipliers from `min_multiplier` upwards, keeping the best rounded
/// series, until the CV error is within tolerance.
pub fn precision_scale(original: &[f64], search: ScalingSearch) -> Result<ScaledDemand, SimError> {
    let original_mean = original.iter().sum::<f64>() / original.len().max(1) as f64;
    if original.is_empty() || original_mean <= 0.0 {
        return Err(SimError::Config(
            "cannot scale an empty or non-positive demand series".into(),
        ));
    }
    if search.step <= 0.0 {
        return Err(SimError::Config("scaling step must be positive".into()));
    }

    let original_cv = coefficient_of_variation(original);
    let base_scale = search.target_mean / original_mean;
    let round = |scale: f64| -> Vec<u32> {
        original
            .iter()
            .map(|v| (v * scale).round().max(0.0) as u32)
            .collect()
    };

    let mut best = ScaledDemand {
        scale: base_scale,
        values: round(base_scale),
        cv_error: f64::INFINITY,
    };

    let mut multiplier = search.min_multiplier;
    let mut tried = 0usize;
    while multiplier < search.max_multiplier {
        tried += 1;
        let scale = base_scale * multiplier;
        let values = round(scale);
        let as_f64: Vec<f64> = values.iter().map(|&v| f64::from(v)).collect();
        let cv_error = if original_cv > 0.0 {
            (coefficient_of_variation(&as_f64) - original_cv).abs() / original_cv
        } else {
            coefficient_of_variation(&as_f64)
        };

        if cv_error < best.cv_error {
            best = ScaledDemand {
                scale,
                values,
                cv_error,
            };
            if cv_error <= search.cv_tolerance {
                break;
            }
        }
        multiplier = search.min_multiplier + tried as f64 * search.step;
    }

    info!(
        target: "sim.demand",
        scale = best.scale,
        cv_error = best.cv_error,
        tried,
        "demand scaled"
    );
    Ok(best)
}

/// Materializes a demand source into a schedule of `weeks` entries.
pub fn resolve(source: &DemandSource, weeks: usize) -> Result<Vec<u32>, SimError> {
    match source {
        DemandSource::Constant { value } => Ok(generate_constant_demand(weeks, *value)),
        DemandSource::ClassicStep => Ok(generate_classic_beer_game_demand(weeks)),
        DemandSource::Normal {
            mean,
            std_dev,
            seed,
        } => generate_normal_demand(weeks, *mean, *std_dev, *seed),
        DemandSource::Csv {
            path,
            column,
            target_mean,
        } => {
            let raw = load_csv_column(path, column)?;
            let values = match target_mean {
                Some(target_mean) => {
                    let search = ScalingSearch {
                        target_mean: *target_mean,
                        ..ScalingSearch::default()
                    };
                    precision_scale(&raw, search)?.values
                }
                None => raw.iter().map(|v| v.round().max(0.0) as u32).collect(),
            };
            if values.len() < weeks {
                return Err(SimError::Config(format!(
                    "{} holds {} weeks of demand, {weeks} needed",
                    path.display(),
                    values.len()
                )));
            }
            Ok(values[..weeks].to_vec())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn temp_csv(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "bullwhip-demand-{}-{name}.csv",
            std::process::id()
        ));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn classic_demand_steps_after_four_weeks() {
        assert_eq!(generate_classic_beer_game_demand(6), vec![4, 4, 4, 4, 8, 8]);
        assert_eq!(generate_constant_demand(3, 5), vec![5, 5, 5]);
    }

    #[test]
    fn seeded_normal_demand_is_reproducible() {
        let a = generate_normal_demand(50, 8.0, 3.0, Some(7)).unwrap();
        let b = generate_normal_demand(50, 8.0, 3.0, Some(7)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 50);
    }

    #[test]
    fn negative_draws_clamp_to_zero() {
        let demand = generate_normal_demand(200, -5.0, 1.0, Some(1)).unwrap();
        assert!(demand.iter().all(|&d| d == 0));
    }

    #[test]
    fn invalid_normal_parameters_are_config_errors() {
        let result = generate_normal_demand(5, 4.0, -1.0, Some(1));
        assert!(matches!(result, Err(SimError::Config(_))));
    }

    #[test]
    fn csv_column_is_read_by_header() {
        let path = temp_csv("column", "\u{feff}Week,Sales\n1, 4.5\n2,\n3,7\n");
        let values = load_csv_column(&path, "Sales").unwrap();
        assert_eq!(values, vec![4.5, 7.0]);
        let weeks = load_csv_column(&path, "Week").unwrap();
        assert_eq!(weeks, vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            load_csv_column(&path, "Missing"),
            Err(SimError::Config(_))
        ));
        fs::remove_file(path).ok();
    }

    #[test]
    fn precision_scaling_hits_mean_and_keeps_cv() {
        let raw = [120.0, 180.0, 150.0, 210.0, 90.0, 160.0, 140.0, 200.0];
        let scaled = precision_scale(&raw, ScalingSearch::default()).unwrap();
        assert!(scaled.cv_error <= 0.01);
        assert_eq!(scaled.values.len(), raw.len());
        let original_cv = coefficient_of_variation(&raw);
        let values: Vec<f64> = scaled.values.iter().map(|&v| f64::from(v)).collect();
        assert!((coefficient_of_variation(&values) - original_cv).abs() / original_cv <= 0.01);
    }

    #[test]
    fn precision_scaling_rejects_empty_series() {
        assert!(precision_scale(&[], ScalingSearch::default()).is_err());
        assert!(precision_scale(&[0.0, 0.0], ScalingSearch::default()).is_err());
    }

    #[test]
    fn resolve_csv_needs_enough_weeks() {
        let path = temp_csv("short", "Demand\n4\n5\n6\n");
        let source = DemandSource::Csv {
            path: path.clone(),
            column: "Demand".into(),
            target_mean: None,
        };
        assert_eq!(resolve(&source, 2).unwrap(), vec![4, 5]);
        assert!(resolve(&source, 5).is_err());
        fs::remove_file(path).ok();
    }

    #[test]
    fn resolve_builtin_sources() {
        assert_eq!(resolve(&DemandSource::Constant { value: 6 }, 2).unwrap(), vec![6, 6]);
        assert_eq!(resolve(&DemandSource::ClassicStep, 5).unwrap(), vec![4, 4, 4, 4, 8]);
    }
}
