//! Random impressions and campaigns

use crate::campaigns::{Campaign, CampaignId};
use crate::config::GameConfig;
use crate::error::{Error, Result};
use crate::goods::Good;
use rand::prelude::*;
use rand_distr::{Beta, Distribution};

/// One impression drawn from the catalog's impression distribution
///
/// Inverse-CDF sampling; if rounding leaves the uniform draw above the
/// cumulative mass, the last good is returned.
pub fn draw_impression<'a, R: Rng + ?Sized>(config: &'a GameConfig, rng: &mut R) -> &'a Good {
    let goods = config.goods();
    let u: f64 = rng.random();
    let mut cumulative = 0.0;
    for (good, &p) in goods.iter().zip(config.impression_pmf()) {
        cumulative += p;
        if u <= cumulative {
            return good;
        }
    }
    &goods[goods.len() - 1]
}

/// `k` impressions for one game
pub fn draw_impressions<R: Rng + ?Sized>(config: &GameConfig, rng: &mut R) -> Vec<Good> {
    (0..config.params().k)
        .map(|_| draw_impression(config, rng).clone())
        .collect()
}

/// Samples budget-per-reach multipliers in [0.5, 1.5]
pub struct BudgetSampler {
    beta: Beta<f64>,
}

impl BudgetSampler {
    pub fn new() -> Result<Self> {
        let beta = Beta::new(10.0, 10.0).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        Ok(BudgetSampler { beta })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.beta.sample(rng) + 0.5
    }
}

/// A random campaign for a game with `num_players` campaigns
///
/// The target is uniform over the configured targets. Reach is
/// ceil(rdf * k * p(target) / num_players) and budget is reach times a
/// Beta(10, 10) draw shifted by 0.5.
pub fn draw_campaign<R: Rng + ?Sized>(
    id: CampaignId,
    num_players: usize,
    config: &GameConfig,
    budgets: &BudgetSampler,
    rng: &mut R,
) -> Result<Campaign> {
    let t = rng.random_range(0..config.targets().len());
    let params = config.params();
    let reach = (params.reach_discount_factor * params.k as f64 * config.target_pmf()[t]
        / num_players as f64)
        .ceil();
    if reach < 1.0 {
        return Err(Error::InvalidReach { campaign: id });
    }
    let reach = reach as u32;
    let budget = reach as f64 * budgets.sample(rng);
    Campaign::new(id, reach, budget, config.targets()[t].clone())
}
