//! Campaign utilities and auctioneer revenue after an auction round

use crate::allocation::{Allocation, Expenditure};
use crate::campaigns::CampaignId;
use crate::error::{Error, Result};
use std::collections::HashSet;

const SIGMOID_SCALE: f64 = 4.08577;
const SIGMOID_SHIFT: f64 = 3.08577;

/// Sigmoidal fraction of a campaign's value earned by `units` effective impressions
///
/// Close to 0 for `units` much smaller than `reach`, close to 1 at
/// `units == reach`, and saturating slightly above 1 beyond it.
pub fn effective_reach_ratio(units: f64, reach: u32) -> Result<f64> {
    if reach == 0 {
        return Err(Error::ZeroReach);
    }
    let x = units / reach as f64;
    Ok((2.0 / SIGMOID_SCALE)
        * ((SIGMOID_SCALE * x - SIGMOID_SHIFT).atan() - (-SIGMOID_SHIFT).atan()))
}

/// How one campaign fared in a round
#[derive(Debug, Clone, PartialEq)]
pub struct CampaignOutcome {
    pub campaign: CampaignId,
    /// Units won on goods matching the campaign's target
    pub effective_units: u32,
    pub reach_ratio: f64,
    pub spend: f64,
    pub utility: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameStatistics {
    pub campaigns: Vec<CampaignOutcome>,
    pub total_units: u32,
    pub total_revenue: f64,
}

impl GameStatistics {
    pub fn outcome(&self, campaign: CampaignId) -> Option<&CampaignOutcome> {
        self.campaigns.iter().find(|o| o.campaign == campaign)
    }

    pub fn utility(&self, campaign: CampaignId) -> Option<f64> {
        self.outcome(campaign).map(|o| o.utility)
    }
}

/// Utility of every campaign and the total revenue collected
///
/// Utility is `reach_ratio * budget - spend`, where spend covers every good
/// the campaign paid for, matching or not. Does not modify its inputs, so
/// calling it twice on the same ledgers yields the same result.
pub fn compute_statistics(
    allocation: &Allocation,
    expenditure: &Expenditure,
) -> Result<GameStatistics> {
    if !allocation.same_shape(expenditure) {
        return Err(Error::LedgerMismatch);
    }

    let goods = allocation.goods();
    let mut seen = HashSet::with_capacity(allocation.campaigns().len());
    let mut campaigns = Vec::with_capacity(allocation.campaigns().len());

    for (c, campaign) in allocation.campaigns().iter().enumerate() {
        if !seen.insert(campaign.id()) {
            return Err(Error::DuplicateCampaign(campaign.id()));
        }

        let effective_units: u32 = goods
            .iter()
            .enumerate()
            .filter(|(_, g)| campaign.wants(g))
            .map(|(g, _)| allocation.at(c, g))
            .sum();
        let reach_ratio = effective_reach_ratio(effective_units as f64, campaign.reach())?;
        let spend = expenditure.total_for_campaign(c);

        campaigns.push(CampaignOutcome {
            campaign: campaign.id(),
            effective_units,
            reach_ratio,
            spend,
            utility: reach_ratio * campaign.budget() - spend,
        });
    }

    Ok(GameStatistics {
        campaigns,
        total_units: allocation.total(),
        total_revenue: expenditure.total(),
    })
}
