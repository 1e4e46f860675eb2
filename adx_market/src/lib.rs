//! Ad Exchange Market Game
//!
//! Campaigns with a reach target and a budget buy impressions in repeated
//! second-price auctions with reserve prices. Each campaign bids with one of
//! two strategies:
//! - WE: greedy efficient allocation priced by a linear program
//! - WF: waterfall, taking the cheapest competing rate one unit at a time
//!
//! Sampling many games per population profile yields a best-response graph
//! over profiles. Its strongly connected components (or sinks) are the
//! equilibria, and their revenue estimates what the exchange earns at a
//! given reserve-price setting.
//!
//! Pipeline:
//! - `game::play_game`: draw campaigns and impressions, bid, clear, score
//! - `profiles::estimate_profiles`: many games per profile, in parallel
//! - `brg::build_eps_brg`: profile means to a best-response graph
//! - `equilibrium`: SCC/sink families and revenue aggregation
//! - `report`: equilibrium files and run summaries

pub mod allocation;
pub mod auction;
pub mod brg;
pub mod campaigns;
pub mod config;
pub mod draws;
pub mod efficient;
pub mod equilibrium;
pub mod error;
pub mod experiment;
pub mod game;
pub mod goods;
pub mod lp;
pub mod profiles;
pub mod report;
pub mod statistics;
pub mod waterfall;

pub use allocation::{Allocation, Expenditure, Ledger};
pub use auction::{AuctionOutcome, FirstTied, RandomTieBreaker, TieBreaker, run_auctions};
pub use brg::{BestResponseGraph, BrgOptions, ProfileNode, build_eps_brg};
pub use campaigns::{Bid, Campaign, CampaignId, Market};
pub use config::{GameConfig, GameParams, SegmentSpec};
pub use efficient::{greedy_allocation, pricing, we_strategy};
pub use equilibrium::{
    Aggregator, EquilibriumFamilies, EquilibriumFamily, EquilibriumKind, Reducer, SccEquilibria,
    SinkEquilibria, aggregate, compute_scc_equilibria, compute_sink_equilibria,
};
pub use error::{Error, Result};
pub use experiment::{ExperimentConfig, estimate_equilibrium_revenue};
pub use game::{GameOutcome, play_game};
pub use goods::Good;
pub use lp::{LpSolver, MiniLpSolver};
pub use profiles::{ProfileSample, ProfileTable, estimate_profiles};
pub use report::{EquilibriumReport, RunSummary, read_revenue};
pub use statistics::{GameStatistics, compute_statistics, effective_reach_ratio};
pub use waterfall::{waterfall, wf_strategy};
