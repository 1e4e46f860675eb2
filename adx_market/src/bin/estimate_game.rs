//! Equilibrium revenue estimation
//!
//! Samples every WE/WF profile of the configured game, builds the
//! best-response graph and writes the equilibrium revenue for each
//! requested equilibrium kind and aggregator.
//!
//! Usage:
//!   cargo run --release --bin estimate_game -- experiments/baseline.toml
//!
//! Output (under `output_dir`, default `results/<name>`):
//! - results.csv: one row per sampled game
//! - eq_<kind>_<aggregator>.txt: equilibrium revenue files
//! - summary.json: parameters, seed, timestamp and revenues

use adx_market::experiment::ExperimentConfig;
use adx_market::report::EquilibriumSummary;
use adx_market::{MiniLpSolver, RunSummary, estimate_profiles};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <experiment_config.toml>", args[0]);
        eprintln!("Example: {} experiments/baseline.toml", args[0]);
        std::process::exit(1);
    }

    if let Err(e) = run(&args[1]) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(config_path: &str) -> adx_market::Result<()> {
    let start_time = Instant::now();
    println!("=== Ad Exchange Equilibrium Revenue ===\n");
    println!("Loading experiment config: {}\n", config_path);

    let experiment = ExperimentConfig::load(config_path)?;
    let game = experiment.game_config()?;
    let params = game.params();
    let samples_per_profile = experiment.samples_per_profile();

    println!("Experiment: {}", experiment.experiment.name);
    println!("Description: {}", experiment.experiment.description);
    println!(
        "Game: k={} n={} rdf={} eps={} delta={}",
        params.k, params.n, params.reach_discount_factor, params.eps, params.delta
    );
    println!(
        "Sampling: {} games x {} profiles (base seed {})\n",
        samples_per_profile,
        params.n + 1,
        experiment.experiment.base_seed
    );

    let output_dir = experiment
        .experiment
        .output_dir
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("results").join(&experiment.experiment.name));
    fs::create_dir_all(&output_dir)?;

    let table = estimate_profiles(
        &game,
        experiment.experiment.base_seed,
        samples_per_profile,
        experiment.experiment.num_threads,
        &MiniLpSolver,
    )?;
    table.write_csv(output_dir.join("results.csv"))?;

    println!("=== Profile Means ===\n");
    println!(
        "{:>6} {:>6} {:>12} {:>12} {:>12}",
        "num_WE", "num_WF", "WE", "WF", "Revenue"
    );
    for mean in table.means() {
        println!(
            "{:>6} {:>6} {:>12.4} {:>12.4} {:>12.4}",
            mean.num_we, mean.num_wf, mean.we, mean.wf, mean.revenue
        );
    }

    let mut summary = RunSummary::new(
        &experiment.experiment.name,
        experiment.experiment.base_seed,
        &game,
        samples_per_profile,
        table.len(),
    );

    println!("\n=== Equilibria ===\n");
    for result in experiment.analyze(&table)? {
        result.report.write(output_dir.join(result.file_name()))?;
        println!(
            "{:<5} {:<10} revenue={:.4} members={}",
            result.kind.to_string(),
            result.aggregator.to_string(),
            result.report.value,
            result
                .report
                .members
                .iter()
                .map(|m| format!("{{{}}}", m.join(",")))
                .collect::<Vec<_>>()
                .join(" ")
        );
        summary.equilibria.push(EquilibriumSummary::new(
            result.kind,
            result.aggregator,
            &result.report,
        ));
    }
    summary.save_json(output_dir.join("summary.json"))?;

    println!(
        "\nCompleted in {:.1}s. Results saved to: {}",
        start_time.elapsed().as_secs_f64(),
        output_dir.display()
    );
    Ok(())
}
