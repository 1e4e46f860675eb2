//! Game configuration: market size, sampling tolerances and the good catalog

use crate::error::{Error, Result};
use crate::goods::Good;
use crate::statistics::effective_reach_ratio;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Scalar parameters of one game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameParams {
    pub k: u32,                     // impressions drawn per game
    pub n: usize,                   // players per game
    pub reach_discount_factor: f64, // scales campaign reach against supply
    pub eps: f64,                   // utility estimation tolerance
    pub delta: f64,                 // failure probability of the estimate
    pub search_budget: u32,         // reserve-price vectors an outer search may evaluate
}

impl GameParams {
    pub fn baseline() -> Self {
        GameParams {
            k: 1000,
            n: 8,
            reach_discount_factor: 1.0,
            eps: 0.1,
            delta: 0.1,
            search_budget: 5,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(Error::InvalidConfig("k must be positive".into()));
        }
        if self.n == 0 {
            return Err(Error::InvalidConfig("n must be positive".into()));
        }
        if !(self.reach_discount_factor.is_finite() && self.reach_discount_factor > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "reach_discount_factor must be positive, got {}",
                self.reach_discount_factor
            )));
        }
        if !(self.eps.is_finite() && self.eps > 0.0) {
            return Err(Error::InvalidEpsilon(self.eps));
        }
        if !(self.delta > 0.0 && self.delta < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "delta must lie in (0, 1), got {}",
                self.delta
            )));
        }
        if self.search_budget == 0 {
            return Err(Error::InvalidConfig("search_budget must be positive".into()));
        }
        Ok(())
    }

    /// Samples per profile for an eps-accurate estimate with probability 1 - delta
    ///
    /// ceil(0.5 / eps^2 * ln(4 (n + 1) budget / delta)), union-bounded over
    /// every profile of every search step.
    pub fn samples_per_profile(&self) -> usize {
        let profiles = 4.0 * (self.n as f64 + 1.0) * self.search_budget as f64;
        (0.5 * (1.0 / (self.eps * self.eps)) * (profiles / self.delta).ln()).ceil() as usize
    }

    /// Samples across all profiles and search steps
    pub fn total_samples(&self) -> usize {
        self.samples_per_profile() * (self.n + 1) * self.search_budget as usize
    }
}

impl Default for GameParams {
    fn default() -> Self {
        Self::baseline()
    }
}

/// A segment set with its probability and, for base goods, a reserve price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSpec {
    pub segments: Vec<String>,
    pub probability: f64,
    #[serde(default)]
    pub reserve_price: f64,
}

impl SegmentSpec {
    pub fn new(segments: &[&str], probability: f64) -> Self {
        SegmentSpec {
            segments: segments.iter().map(|s| s.to_string()).collect(),
            probability,
            reserve_price: 0.0,
        }
    }
}

/// Everything needed to draw and play one game instance
///
/// Immutable: reserve-price updates produce a new config.
#[derive(Debug, Clone)]
pub struct GameConfig {
    params: GameParams,
    goods: Vec<Good>,
    impression_pmf: Vec<f64>,
    targets: Vec<Good>,
    target_pmf: Vec<f64>,
}

impl GameConfig {
    /// Build the catalog from base-good and target specs
    ///
    /// Base-good probabilities form the impression distribution and must
    /// sum to 1. Each base good's supply is ceil(k * probability). Target
    /// probabilities are the share of impressions a target matches.
    pub fn new(
        params: GameParams,
        base: &[SegmentSpec],
        targets: &[SegmentSpec],
    ) -> Result<GameConfig> {
        params.validate()?;
        if base.is_empty() || targets.is_empty() {
            return Err(Error::InvalidConfig(
                "need at least one base good and one campaign target".into(),
            ));
        }

        let mut goods = Vec::with_capacity(base.len());
        let mut impression_pmf = Vec::with_capacity(base.len());
        for spec in base {
            check_probability(spec)?;
            let supply = (params.k as f64 * spec.probability).ceil() as u32;
            let good = Good::new(spec.segments.iter().cloned(), supply, spec.reserve_price)?;
            if goods.contains(&good) {
                return Err(Error::DuplicateGood(good.id().to_string()));
            }
            goods.push(good);
            impression_pmf.push(spec.probability);
        }
        let total: f64 = impression_pmf.iter().sum();
        if (total - 1.0).abs() > 1e-6 {
            return Err(Error::InvalidConfig(format!(
                "impression probabilities sum to {total}, expected 1"
            )));
        }

        let mut target_goods = Vec::with_capacity(targets.len());
        let mut target_pmf = Vec::with_capacity(targets.len());
        for spec in targets {
            check_probability(spec)?;
            if spec.probability == 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "target {:?} has zero probability",
                    spec.segments
                )));
            }
            target_goods.push(Good::target(spec.segments.iter().cloned())?);
            target_pmf.push(spec.probability);
        }

        Ok(GameConfig {
            params,
            goods,
            impression_pmf,
            targets: target_goods,
            target_pmf,
        })
    }

    /// Eight base goods (gender x age x income) and twenty campaign targets
    pub fn baseline() -> Result<GameConfig> {
        GameConfig::new(GameParams::baseline(), &baseline_goods(), &baseline_targets())
    }

    /// Same market under different scalar parameters
    pub fn with_params(&self, params: GameParams) -> Result<GameConfig> {
        let base: Vec<SegmentSpec> = self
            .goods
            .iter()
            .zip(&self.impression_pmf)
            .map(|(g, &p)| SegmentSpec {
                segments: g.segments().iter().cloned().collect(),
                probability: p,
                reserve_price: g.reserve_price(),
            })
            .collect();
        let targets: Vec<SegmentSpec> = self
            .targets
            .iter()
            .zip(&self.target_pmf)
            .map(|(g, &p)| SegmentSpec {
                segments: g.segments().iter().cloned().collect(),
                probability: p,
                reserve_price: 0.0,
            })
            .collect();
        GameConfig::new(params, &base, &targets)
    }

    /// Same market with reserve prices replaced by good id (e.g. "HMY")
    ///
    /// Goods not named keep their current reserve.
    pub fn with_reserve_prices(&self, reserves: &HashMap<String, f64>) -> Result<GameConfig> {
        for id in reserves.keys() {
            if !self.goods.iter().any(|g| g.id() == id) {
                return Err(Error::UnknownGood(id.clone()));
            }
        }
        let goods = self
            .goods
            .iter()
            .map(|g| match reserves.get(g.id()) {
                Some(&r) => g.with_reserve_price(r),
                None => Ok(g.clone()),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(GameConfig {
            goods,
            ..self.clone()
        })
    }

    /// Same market with one reserve price for every good
    pub fn with_uniform_reserve(&self, reserve_price: f64) -> Result<GameConfig> {
        let reserves = self
            .goods
            .iter()
            .map(|g| (g.id().to_string(), reserve_price))
            .collect();
        self.with_reserve_prices(&reserves)
    }

    pub fn params(&self) -> &GameParams {
        &self.params
    }

    pub fn goods(&self) -> &[Good] {
        &self.goods
    }

    pub fn impression_pmf(&self) -> &[f64] {
        &self.impression_pmf
    }

    pub fn targets(&self) -> &[Good] {
        &self.targets
    }

    pub fn target_pmf(&self) -> &[f64] {
        &self.target_pmf
    }

    /// Reserve price per good id, in catalog order
    pub fn reserve_prices(&self) -> Vec<(String, f64)> {
        self.goods
            .iter()
            .map(|g| (g.id().to_string(), g.reserve_price()))
            .collect()
    }

    /// Largest utility a campaign could ever reach
    ///
    /// The widest target's campaign with the largest possible budget
    /// (1.5 per unit of reach) winning every impression for free.
    pub fn utility_upper_bound(&self) -> Result<f64> {
        let p_max = self.target_pmf.iter().copied().fold(0.0, f64::max);
        let p = &self.params;
        let reach = (p.reach_discount_factor * p.k as f64 * p_max / p.n as f64).ceil() as u32;
        let budget = 1.5 * reach as f64;
        Ok(budget * effective_reach_ratio(p.k as f64, reach)?)
    }
}

fn check_probability(spec: &SegmentSpec) -> Result<()> {
    if spec.probability.is_finite() && (0.0..=1.0).contains(&spec.probability) {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!(
            "probability of {:?} must lie in [0, 1], got {}",
            spec.segments, spec.probability
        )))
    }
}

pub fn baseline_goods() -> Vec<SegmentSpec> {
    vec![
        SegmentSpec::new(&["Male", "Young", "High"], 0.0517),
        SegmentSpec::new(&["Male", "Young", "Low"], 0.1836),
        SegmentSpec::new(&["Male", "Old", "High"], 0.0808),
        SegmentSpec::new(&["Male", "Old", "Low"], 0.1795),
        SegmentSpec::new(&["Female", "Young", "High"], 0.0256),
        SegmentSpec::new(&["Female", "Young", "Low"], 0.1980),
        SegmentSpec::new(&["Female", "Old", "High"], 0.0407),
        SegmentSpec::new(&["Female", "Old", "Low"], 0.2401),
    ]
}

pub fn baseline_targets() -> Vec<SegmentSpec> {
    let mut targets = baseline_goods();
    targets.extend([
        SegmentSpec::new(&["Male", "Young"], 0.2353),
        SegmentSpec::new(&["Male", "Old"], 0.2603),
        SegmentSpec::new(&["Male", "High"], 0.1325),
        SegmentSpec::new(&["Male", "Low"], 0.3631),
        SegmentSpec::new(&["Female", "Young"], 0.2236),
        SegmentSpec::new(&["Female", "Old"], 0.2808),
        SegmentSpec::new(&["Female", "High"], 0.0663),
        SegmentSpec::new(&["Female", "Low"], 0.4381),
        SegmentSpec::new(&["Young", "Low"], 0.3816),
        SegmentSpec::new(&["Young", "High"], 0.0773),
        SegmentSpec::new(&["Old", "Low"], 0.4196),
        SegmentSpec::new(&["Old", "High"], 0.1215),
    ]);
    targets
}
