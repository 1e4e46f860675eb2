//! TOML experiment files
//!
//! ```toml
//! [experiment]
//! name = "baseline"
//! description = "..."
//! base_seed = 42
//! samples_per_profile = 50   # optional, defaults to the eps/delta bound
//!
//! [game]
//! k = 1000
//! n = 8
//!
//! [analysis]
//! equilibria = ["sink", "scc"]
//! aggregators = ["min-min", "mean-mean"]
//!
//! [reserve_prices]           # optional, by good id
//! FHO = 0.5
//! ```
//!
//! Omitted goods and targets fall back to the baseline catalog.

use crate::brg::{BrgOptions, build_eps_brg};
use crate::config::{GameConfig, GameParams, SegmentSpec, baseline_goods, baseline_targets};
use crate::equilibrium::{Aggregator, EquilibriumKind};
use crate::error::{Error, Result};
use crate::profiles::ProfileTable;
use crate::report::EquilibriumReport;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct ExperimentConfig {
    pub experiment: ExperimentMetadata,
    #[serde(default)]
    pub game: GameParams,
    #[serde(default)]
    pub analysis: AnalysisSettings,
    pub goods: Option<Vec<SegmentSpec>>,
    pub targets: Option<Vec<SegmentSpec>>,
    pub reserve_prices: Option<HashMap<String, f64>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExperimentMetadata {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub base_seed: u64,
    pub samples_per_profile: Option<usize>,
    pub num_threads: Option<usize>,
    pub output_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub normalize_utilities: bool,
    pub normalize_revenue: bool,
    pub equilibria: Vec<EquilibriumKind>,
    pub aggregators: Vec<String>,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        AnalysisSettings {
            normalize_utilities: true,
            normalize_revenue: true,
            equilibria: vec![EquilibriumKind::Sink],
            aggregators: vec![Aggregator::default().to_string()],
        }
    }
}

impl AnalysisSettings {
    pub fn brg_options(&self) -> BrgOptions {
        BrgOptions {
            normalize_utilities: self.normalize_utilities,
            normalize_revenue: self.normalize_revenue,
        }
    }

    pub fn aggregators(&self) -> Result<Vec<Aggregator>> {
        self.aggregators.iter().map(|a| a.parse()).collect()
    }
}

/// One equilibrium family reduced by one aggregator
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub kind: EquilibriumKind,
    pub aggregator: Aggregator,
    pub report: EquilibriumReport,
}

impl AnalysisResult {
    /// File name for this result, e.g. "eq_sink_min-min.txt"
    pub fn file_name(&self) -> String {
        format!("eq_{}_{}.txt", self.kind, self.aggregator)
    }
}

impl ExperimentConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: ExperimentConfig = toml::from_str(s)?;
        config.game.validate()?;
        config.analysis.aggregators()?;
        if config.analysis.equilibria.is_empty() || config.analysis.aggregators.is_empty() {
            return Err(Error::InvalidConfig(
                "analysis needs at least one equilibrium kind and one aggregator".into(),
            ));
        }
        if config.experiment.samples_per_profile == Some(0) {
            return Err(Error::InvalidConfig("samples_per_profile must be positive".into()));
        }
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        ExperimentConfig::from_toml_str(&fs::read_to_string(path)?)
    }

    /// Game config with the experiment's catalog and reserve prices
    pub fn game_config(&self) -> Result<GameConfig> {
        let goods = self.goods.clone().unwrap_or_else(baseline_goods);
        let targets = self.targets.clone().unwrap_or_else(baseline_targets);
        let config = GameConfig::new(self.game.clone(), &goods, &targets)?;
        match &self.reserve_prices {
            Some(reserves) => config.with_reserve_prices(reserves),
            None => Ok(config),
        }
    }

    /// Explicit override, else the eps/delta sample bound
    pub fn samples_per_profile(&self) -> usize {
        self.experiment
            .samples_per_profile
            .unwrap_or_else(|| self.game.samples_per_profile())
    }

    /// Every requested (equilibrium kind, aggregator) pair over one table
    pub fn analyze(&self, table: &ProfileTable) -> Result<Vec<AnalysisResult>> {
        let aggregators = self.analysis.aggregators()?;
        let mut results = Vec::new();
        for &kind in &self.analysis.equilibria {
            for &aggregator in &aggregators {
                let report = estimate_equilibrium_revenue(
                    table,
                    self.game.eps,
                    self.analysis.brg_options(),
                    kind,
                    aggregator,
                )?;
                results.push(AnalysisResult {
                    kind,
                    aggregator,
                    report,
                });
            }
        }
        Ok(results)
    }
}

/// Profile table to BRG to equilibria to one revenue figure
pub fn estimate_equilibrium_revenue(
    table: &ProfileTable,
    eps: f64,
    options: BrgOptions,
    kind: EquilibriumKind,
    aggregator: Aggregator,
) -> Result<EquilibriumReport> {
    let brg = build_eps_brg(table.rows(), eps, options)?;
    let families = kind.compute(&brg, &brg.revenue_per_node())?;
    let report = EquilibriumReport::new(&families, aggregator)?;
    info!(
        %kind,
        %aggregator,
        members = families.len(),
        revenue = report.value,
        "equilibrium revenue"
    );
    Ok(report)
}
