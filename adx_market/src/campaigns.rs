//! Demand side: campaigns, their bids, and the market they trade in

use crate::error::{Error, Result};
use crate::goods::Good;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CampaignId(pub usize);

impl fmt::Display for CampaignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0)
    }
}

/// A bidding agent that wants `reach` impressions matching `target`
#[derive(Debug, Clone)]
pub struct Campaign {
    id: CampaignId,
    reach: u32,
    budget: f64,
    target: Good,
}

impl Campaign {
    pub fn new(id: CampaignId, reach: u32, budget: f64, target: Good) -> Result<Campaign> {
        if reach == 0 {
            return Err(Error::InvalidReach { campaign: id });
        }
        if !(budget.is_finite() && budget > 0.0) {
            return Err(Error::InvalidBudget { campaign: id, budget });
        }
        Ok(Campaign {
            id,
            reach,
            budget,
            target,
        })
    }

    pub fn id(&self) -> CampaignId {
        self.id
    }

    pub fn reach(&self) -> u32 {
        self.reach
    }

    pub fn budget(&self) -> f64 {
        self.budget
    }

    pub fn target(&self) -> &Good {
        &self.target
    }

    /// Budget per unit of reach
    pub fn bid_density(&self) -> f64 {
        self.budget / self.reach as f64
    }

    /// True if `good` counts toward this campaign's reach
    pub fn wants(&self, good: &Good) -> bool {
        good.matches(&self.target)
    }
}

impl PartialEq for Campaign {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Campaign {}

impl fmt::Display for Campaign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {:.4}, {:.4})",
            self.id,
            self.target.id(),
            self.reach,
            self.budget,
            self.bid_density()
        )
    }
}

/// Campaign indices by descending bid density
///
/// Stable: campaigns with equal density keep their original order.
pub fn density_order(campaigns: &[Campaign]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..campaigns.len()).collect();
    order.sort_by(|&a, &b| {
        campaigns[b]
            .bid_density()
            .total_cmp(&campaigns[a].bid_density())
    });
    order
}

/// A standing offer to pay up to `amount` per unit of any good matching `good`
///
/// `limit` caps the campaign's cumulative spend over every catalog good that
/// matches this bid's good, not the spend on a single good.
#[derive(Debug, Clone, PartialEq)]
pub struct Bid {
    campaign: CampaignId,
    good: Good,
    amount: f64,
    limit: f64,
}

impl Bid {
    pub fn new(campaign: CampaignId, good: Good, amount: f64, limit: f64) -> Result<Bid> {
        let valid = amount.is_finite()
            && limit.is_finite()
            && amount >= 0.0
            && limit > 0.0
            && amount <= limit;
        if !valid {
            return Err(Error::InvalidBid {
                campaign,
                amount,
                limit,
            });
        }
        Ok(Bid {
            campaign,
            good,
            amount,
            limit,
        })
    }

    pub fn campaign(&self) -> CampaignId {
        self.campaign
    }

    pub fn good(&self) -> &Good {
        &self.good
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn limit(&self) -> f64 {
        self.limit
    }
}

impl fmt::Display for Bid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bid {:.4} for {} with limit {:.4}",
            self.campaign, self.amount, self.good, self.limit
        )
    }
}

/// Campaigns and goods for one auction round
///
/// Immutable once built. Campaign ids are unique and goods are distinct by
/// segment set, so both can be looked up by identity.
#[derive(Debug, Clone)]
pub struct Market {
    campaigns: Vec<Campaign>,
    goods: Vec<Good>,
    campaign_index: HashMap<CampaignId, usize>,
    good_index: HashMap<Good, usize>,
}

impl Market {
    pub fn new(campaigns: Vec<Campaign>, goods: Vec<Good>) -> Result<Market> {
        let mut campaign_index = HashMap::with_capacity(campaigns.len());
        for (i, c) in campaigns.iter().enumerate() {
            if campaign_index.insert(c.id(), i).is_some() {
                return Err(Error::DuplicateCampaign(c.id()));
            }
        }

        let mut good_index = HashMap::with_capacity(goods.len());
        for (i, g) in goods.iter().enumerate() {
            if good_index.insert(g.clone(), i).is_some() {
                return Err(Error::DuplicateGood(g.id().to_string()));
            }
        }

        Ok(Market {
            campaigns,
            goods,
            campaign_index,
            good_index,
        })
    }

    pub fn campaigns(&self) -> &[Campaign] {
        &self.campaigns
    }

    pub fn goods(&self) -> &[Good] {
        &self.goods
    }

    pub fn campaign_index(&self, id: CampaignId) -> Option<usize> {
        self.campaign_index.get(&id).copied()
    }

    pub fn good_index(&self, good: &Good) -> Option<usize> {
        self.good_index.get(good).copied()
    }
}
