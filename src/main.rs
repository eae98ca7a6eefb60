use bullwhip_visibility::io::{demand, reporting};
use bullwhip_visibility::ledger::InMemoryLedger;
use bullwhip_visibility::simulation::config::{DemandSource, ExperimentConfig, PolicyAssignment};
use bullwhip_visibility::simulation::engine::RunReport;
use bullwhip_visibility::simulation::metrics;
use bullwhip_visibility::simulation::sweep::{self, SweepPoint};
use bullwhip_visibility::strategy::implementations::{BaseStockParams, PolicyKind, StermanParams};
use bullwhip_visibility::strategy::traits::VisibilityMode;
use bullwhip_visibility::SimError;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bullwhip-visibility")]
#[command(about = "Beer distribution game: traditional vs blockchain visibility")]
struct Cli {
    /// Experiment file (JSON); flags below override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// One run in a single visibility mode
    Run {
        #[arg(short, long, value_enum, default_value_t = Mode::Traditional)]
        mode: Mode,

        #[command(flatten)]
        common: CommonArgs,
    },
    /// Traditional and blockchain runs on the same demand
    Compare {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Comparison over a parameter grid
    Sweep {
        /// Sterman alpha_S values
        #[arg(long, value_delimiter = ',')]
        alphas: Vec<f64>,

        /// Sterman beta values
        #[arg(long, value_delimiter = ',')]
        betas: Vec<f64>,

        /// Base-stock service levels
        #[arg(long, value_delimiter = ',')]
        service_levels: Vec<f64>,

        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Number of weeks to simulate
    #[arg(short, long)]
    weeks: Option<usize>,

    /// Policy for all four roles
    #[arg(short, long, value_enum)]
    policy: Option<PolicyArg>,

    /// CSV file with end-customer demand
    #[arg(long)]
    demand_csv: Option<PathBuf>,

    /// Column of the demand CSV
    #[arg(long, default_value = "Demand")]
    column: String,

    /// Rescale CSV demand to this mean, keeping its variation
    #[arg(long)]
    target_mean: Option<f64>,

    #[arg(short, long, default_value = "results")]
    output_dir: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Traditional,
    Blockchain,
}

impl From<Mode> for VisibilityMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Traditional => VisibilityMode::Traditional,
            Mode::Blockchain => VisibilityMode::Blockchain,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    BaseStock,
    Sterman,
    Simple,
}

impl From<PolicyArg> for PolicyKind {
    fn from(policy: PolicyArg) -> Self {
        match policy {
            PolicyArg::BaseStock => PolicyKind::BaseStock(BaseStockParams::default()),
            PolicyArg::Sterman => PolicyKind::Sterman(StermanParams::default()),
            PolicyArg::Simple => PolicyKind::Simple,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "simulation failed");
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: Cli) -> Result<(), SimError> {
    let base = match &cli.config {
        Some(path) => ExperimentConfig::from_json_file(path)?,
        None => ExperimentConfig::default(),
    };

    match cli.command {
        Commands::Run { mode, common } => {
            let experiment = apply_overrides(base, &common)?;
            let config = experiment.simulation.with_visibility(mode.into());
            let demand_schedule = demand::resolve(&experiment.demand, config.max_weeks)?;
            info!(demand = ?demand_schedule, "demand schedule generated");

            let report =
                sweep::run_once(&config, &experiment.policies, &demand_schedule, InMemoryLedger::new())?;

            let stem = format!("run_{}", config.visibility.name());
            reporting::write_simulation_log(&common.output_dir.join(format!("{stem}.csv")), &report.history)?;
            reporting::write_run_json(&common.output_dir.join(format!("{stem}.json")), &report)?;
            print_cost_analysis(&report);
        }
        Commands::Compare { common } => {
            let experiment = apply_overrides(base, &common)?;
            let config = experiment.simulation;
            let demand_schedule = demand::resolve(&experiment.demand, config.max_weeks)?;

            let comparison = sweep::compare_visibility(
                InMemoryLedger::new,
                &config,
                &experiment.policies,
                &demand_schedule,
            )?;

            let dir = &common.output_dir;
            for report in [&comparison.traditional, &comparison.blockchain] {
                let stem = format!("run_{}", report.visibility.name());
                reporting::write_simulation_log(&dir.join(format!("{stem}.csv")), &report.history)?;
                reporting::write_run_json(&dir.join(format!("{stem}.json")), report)?;
            }
            reporting::write_comparison_summary(&dir.join("summary.json"), &comparison.summary)?;
            reporting::write_metrics_table(
                &dir.join("summary_metrics.csv"),
                &metrics::summary_metrics(&comparison.traditional, &comparison.blockchain),
            )?;

            print_cost_analysis(&comparison.traditional);
            print_cost_analysis(&comparison.blockchain);
            let s = comparison.summary;
            println!("\n=== Visibility Comparison ===");
            println!("Traditional total cost: {:.2}", s.traditional_cost);
            println!("Blockchain total cost:  {:.2}", s.blockchain_cost);
            println!("Cost reduction: {:.2} ({:.2}%)", s.cost_reduction, s.cost_reduction_percent);
        }
        Commands::Sweep {
            alphas,
            betas,
            service_levels,
            common,
        } => {
            let experiment = apply_overrides(base, &common)?;
            let config = experiment.simulation;
            let demand_schedule = demand::resolve(&experiment.demand, config.max_weeks)?;

            let points = sweep_points(&alphas, &betas, &service_levels, &experiment.policies);
            if points.is_empty() {
                return Err(SimError::Config(
                    "sweep needs --alphas and --betas, or --service-levels".into(),
                ));
            }

            let results = sweep::sweep(InMemoryLedger::new, &config, &points, &demand_schedule)?;
            reporting::write_sweep_table(&common.output_dir.join("sweep.csv"), &results.rows)?;
            reporting::write_bullwhip_metrics(
                &common.output_dir.join("bullwhip_metrics.csv"),
                &results.stages,
            )?;

            println!("\n=== Sweep ===");
            for row in &results.rows {
                println!(
                    "{:<32} traditional {:>9.2}  blockchain {:>9.2}  reduction {:>6.2}%",
                    row.label, row.traditional_cost, row.blockchain_cost, row.cost_reduction_percent
                );
            }
        }
    }
    Ok(())
}

fn apply_overrides(mut experiment: ExperimentConfig, common: &CommonArgs) -> Result<ExperimentConfig, SimError> {
    if let Some(weeks) = common.weeks {
        experiment.simulation.max_weeks = weeks;
    }
    if let Some(policy) = common.policy {
        experiment.policies = PolicyAssignment::uniform(policy.into());
    }
    if let Some(path) = &common.demand_csv {
        experiment.demand = DemandSource::Csv {
            path: path.clone(),
            column: common.column.clone(),
            target_mean: common.target_mean,
        };
    }
    experiment.simulation.validate()?;
    Ok(experiment)
}

/// Sterman grid from the alpha/beta lists and a base-stock grid from the
/// service levels, each starting from the configured parameters when the
/// experiment already uses that family.
fn sweep_points(
    alphas: &[f64],
    betas: &[f64],
    service_levels: &[f64],
    policies: &PolicyAssignment,
) -> Vec<SweepPoint> {
    let mut points = Vec::new();
    if !alphas.is_empty() && !betas.is_empty() {
        let base = match policies.retailer {
            PolicyKind::Sterman(params) => params,
            _ => StermanParams::default(),
        };
        points.extend(sweep::sterman_grid(alphas, betas, base));
    }
    if !service_levels.is_empty() {
        let base = match policies.retailer {
            PolicyKind::BaseStock(params) => params,
            _ => BaseStockParams::default(),
        };
        points.extend(sweep::service_level_grid(service_levels, base));
    }
    points
}

fn print_cost_analysis(report: &RunReport) {
    println!("\n=== Cost Analysis ({}) ===", report.visibility.name());
    for (stage, cost) in report.cost_breakdown() {
        println!("{}: ${:.2}", stage, cost);
    }
    println!("Total Supply Chain Cost: ${:.2}", report.total_supply_chain_cost());
    if report.degraded_records() > 0 {
        println!("Degraded rows: {}", report.degraded_records());
    }
}
