//! One game instance: draw a market, bid by strategy, clear, score

use crate::auction::{AuctionOutcome, RandomTieBreaker, run_auctions};
use crate::campaigns::{Bid, Campaign, CampaignId, Market};
use crate::config::GameConfig;
use crate::draws::{BudgetSampler, draw_campaign, draw_impressions};
use crate::efficient::we_strategy;
use crate::error::{Error, Result};
use crate::lp::LpSolver;
use crate::profiles::ProfileSample;
use crate::statistics::{GameStatistics, compute_statistics};
use crate::waterfall::wf_strategy;
use rand::Rng;
use tracing::debug;

/// Everything produced by one game, kept for reporting
#[derive(Debug, Clone)]
pub struct GameOutcome {
    pub num_we: usize,
    pub num_wf: usize,
    pub market: Market,
    pub we_bids: Vec<Bid>,
    pub wf_bids: Vec<Bid>,
    /// Bids actually submitted: WE bids of the first `num_we` campaigns,
    /// WF bids of the rest
    pub bids: Vec<Bid>,
    pub auction: AuctionOutcome,
    pub statistics: GameStatistics,
}

impl GameOutcome {
    pub fn we_campaigns(&self) -> &[Campaign] {
        &self.market.campaigns()[..self.num_we]
    }

    pub fn wf_campaigns(&self) -> &[Campaign] {
        &self.market.campaigns()[self.num_we..]
    }

    /// Utility of the first WE and first WF campaign, 0 when a strategy has no players
    pub fn sample(&self) -> ProfileSample {
        let utility_of = |campaigns: &[Campaign]| {
            campaigns
                .first()
                .and_then(|c| self.statistics.utility(c.id()))
                .unwrap_or(0.0)
        };
        ProfileSample {
            num_we: self.num_we,
            num_wf: self.num_wf,
            we: utility_of(self.we_campaigns()),
            wf: utility_of(self.wf_campaigns()),
            revenue: self.statistics.total_revenue,
        }
    }
}

/// Play one game with `num_we` WE players and `num_wf` WF players
///
/// Both strategies are computed on the full market; each campaign then
/// submits the bids of the strategy it plays.
pub fn play_game<R, S>(
    config: &GameConfig,
    num_we: usize,
    num_wf: usize,
    rng: &mut R,
    solver: &S,
) -> Result<GameOutcome>
where
    R: Rng + ?Sized,
    S: LpSolver + ?Sized,
{
    let num_players = num_we + num_wf;
    if num_players == 0 {
        return Err(Error::InvalidConfig("a game needs at least one player".into()));
    }

    let budgets = BudgetSampler::new()?;
    let campaigns = (0..num_players)
        .map(|i| draw_campaign(CampaignId(i), num_players, config, &budgets, rng))
        .collect::<Result<Vec<_>>>()?;
    let market = Market::new(campaigns, config.goods().to_vec())?;

    let we_bids = we_strategy(&market, solver)?;
    let wf_bids = wf_strategy(&market)?;
    let bids: Vec<Bid> = we_bids
        .iter()
        .filter(|b| b.campaign().0 < num_we)
        .chain(wf_bids.iter().filter(|b| b.campaign().0 >= num_we))
        .cloned()
        .collect();

    let impressions = draw_impressions(config, rng);
    let auction = run_auctions(
        &impressions,
        market.goods(),
        market.campaigns(),
        &bids,
        &mut RandomTieBreaker(&mut *rng),
    )?;
    let statistics = compute_statistics(&auction.allocation, &auction.expenditure)?;

    debug!(
        num_we,
        num_wf,
        bids = bids.len(),
        unsold = auction.unsold,
        revenue = statistics.total_revenue,
        "game played"
    );

    Ok(GameOutcome {
        num_we,
        num_wf,
        market,
        we_bids,
        wf_bids,
        bids,
        auction,
        statistics,
    })
}
