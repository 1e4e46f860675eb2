//! Ad Exchange Market Game - single verbose game
//!
//! Plays one game on the baseline catalog and prints every stage.
//!
//! Usage:
//!   cargo run --release --bin adx_market -- [num_WE] [num_WF] [seed]

use adx_market::{GameConfig, MiniLpSolver, play_game};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::env;
use tracing_subscriber::EnvFilter;

fn parse_arg<T: std::str::FromStr>(args: &[String], i: usize, default: T) -> T {
    match args.get(i) {
        Some(s) => s.parse().unwrap_or_else(|_| {
            eprintln!("Invalid argument '{}'", s);
            eprintln!("Usage: {} [num_WE] [num_WF] [seed]", args[0]);
            std::process::exit(1);
        }),
        None => default,
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    let num_we: usize = parse_arg(&args, 1, 4);
    let num_wf: usize = parse_arg(&args, 2, 4);
    let seed: u64 = parse_arg(&args, 3, 42);

    println!("=== Ad Exchange Market Game ===\n");

    let config = GameConfig::baseline().unwrap_or_else(|e| {
        eprintln!("Error building baseline config: {}", e);
        std::process::exit(1);
    });

    println!("Configuration:");
    println!("  Impressions (k): {}", config.params().k);
    println!("  Players: {} WE, {} WF", num_we, num_wf);
    println!("  Reach discount factor: {}", config.params().reach_discount_factor);
    println!("  Seed: {}\n", seed);

    println!("Goods (id, supply, reserve):");
    for good in config.goods() {
        println!("  {}", good);
    }
    println!();

    let mut rng = StdRng::seed_from_u64(seed);
    let game = play_game(&config, num_we, num_wf, &mut rng, &MiniLpSolver).unwrap_or_else(|e| {
        eprintln!("Error playing game: {}", e);
        std::process::exit(1);
    });

    println!("Campaigns (id, target, reach, budget, density):");
    for campaign in game.we_campaigns() {
        println!("  WE {}", campaign);
    }
    for campaign in game.wf_campaigns() {
        println!("  WF {}", campaign);
    }

    println!("\nSubmitted bids:");
    for bid in &game.bids {
        println!("  {}", bid);
    }

    println!("\n=== Allocation ===\n");
    print!("{}", game.auction.allocation);
    println!("\n=== Expenditure ===\n");
    print!("{}", game.auction.expenditure);

    println!("\n=== Results ===\n");
    println!(
        "{:<8} {:>10} {:>12} {:>10} {:>10}",
        "Campaign", "Units", "Reach ratio", "Spend", "Utility"
    );
    for outcome in &game.statistics.campaigns {
        println!(
            "{:<8} {:>10} {:>12.4} {:>10.4} {:>10.4}",
            outcome.campaign.to_string(),
            outcome.effective_units,
            outcome.reach_ratio,
            outcome.spend,
            outcome.utility
        );
    }

    let sample = game.sample();
    println!("\nUnsold impressions: {}", game.auction.unsold);
    println!("Units sold: {}", game.statistics.total_units);
    println!("Revenue: {:.4}", sample.revenue);
    println!("First WE utility: {:.4}", sample.we);
    println!("First WF utility: {:.4}", sample.wf);
}
