//! WF: sequential waterfall allocation at competing rates
//!
//! Each good carries the second-highest bid density among the campaigns
//! that want it, with the auctioneer standing in at the reserve price.
//! Campaigns, densest first, fill their reach from the cheapest goods
//! upward and pay the rate of each good they take.

use crate::allocation::{Allocation, Ledger};
use crate::campaigns::{Bid, Market, density_order};
use crate::error::Result;
use tracing::debug;

/// Allocation plus the per-unit rate each served campaign pays per good
#[derive(Debug, Clone)]
pub struct WaterfallOutcome {
    pub allocation: Allocation,
    pub prices: Ledger<f64>,
}

/// Second-highest density among bidders for each catalog good
///
/// Bidders are every campaign wanting the good with density at least the
/// reserve, plus the auctioneer bidding the reserve itself. If the
/// auctioneer is the only bidder the rate is the reserve.
pub fn competing_rates(market: &Market) -> Vec<f64> {
    market
        .goods()
        .iter()
        .map(|good| {
            let reserve = good.reserve_price();
            let mut densities: Vec<f64> = market
                .campaigns()
                .iter()
                .filter(|c| c.wants(good))
                .map(|c| c.bid_density())
                .filter(|&d| d >= reserve)
                .collect();
            densities.push(reserve);
            densities.sort_by(|a, b| b.total_cmp(a));
            densities.get(1).copied().unwrap_or(reserve)
        })
        .collect()
}

pub fn waterfall(market: &Market) -> WaterfallOutcome {
    let goods = market.goods();
    let rates = competing_rates(market);
    let mut supply: Vec<u32> = goods.iter().map(|g| g.supply()).collect();
    let mut allocation = Allocation::new(market);
    let mut prices = Ledger::<f64>::new(market);

    for c in density_order(market.campaigns()) {
        let campaign = &market.campaigns()[c];
        let mut matching: Vec<usize> = (0..goods.len())
            .filter(|&g| supply[g] > 0 && campaign.wants(&goods[g]))
            .collect();
        matching.sort_by(|&a, &b| rates[a].total_cmp(&rates[b]));

        let available: u64 = matching.iter().map(|&g| supply[g] as u64).sum();
        if available < campaign.reach() as u64 {
            debug!(campaign = %campaign.id(), available, "not enough supply, skipped");
            continue;
        }

        let mut remaining = campaign.reach();
        let mut cost = 0.0;
        for &g in &matching {
            if remaining == 0 {
                break;
            }
            let take = supply[g].min(remaining);
            allocation.set(c, g, take);
            prices.set(c, g, rates[g]);
            supply[g] -= take;
            remaining -= take;
            cost += take as f64 * rates[g];
        }

        if cost > campaign.budget() {
            for &g in &matching {
                supply[g] += allocation.at(c, g);
                allocation.set(c, g, 0);
                prices.set(c, g, goods[g].reserve_price());
            }
            debug!(campaign = %campaign.id(), cost, "waterfall bundle over budget, rolled back");
        }
    }

    WaterfallOutcome { allocation, prices }
}

/// Bids for every (campaign, good) the waterfall serves
///
/// Limits follow the same rule as WE: units times rate, or the whole budget
/// for a free good.
pub fn wf_strategy(market: &Market) -> Result<Vec<Bid>> {
    let WaterfallOutcome { allocation, prices } = waterfall(market);

    let mut bids = Vec::new();
    for (c, g, units) in allocation.entries() {
        let campaign = &market.campaigns()[c];
        let price = prices.at(c, g);
        let limit = if price > 0.0 {
            units as f64 * price
        } else {
            campaign.budget()
        };
        bids.push(Bid::new(campaign.id(), market.goods()[g].clone(), price, limit)?);
    }
    debug!(bids = bids.len(), "WF bids");
    Ok(bids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaigns::{Campaign, CampaignId};
    use crate::goods::Good;
    use approx::assert_relative_eq;

    fn good(segments: &[&str], supply: u32, reserve: f64) -> Good {
        Good::new(segments.iter().copied(), supply, reserve).unwrap()
    }

    fn campaign(id: usize, reach: u32, budget: f64, target: &[&str]) -> Campaign {
        Campaign::new(
            CampaignId(id),
            reach,
            budget,
            Good::target(target.iter().copied()).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_lone_bidder_rate_is_reserve() {
        let market = Market::new(
            vec![campaign(0, 1, 5.0, &["Male"])],
            vec![good(&["Male"], 1, 0.25)],
        )
        .unwrap();
        assert_eq!(competing_rates(&market), vec![0.25]);
    }

    #[test]
    fn test_rate_is_second_highest_density() {
        let market = Market::new(
            vec![
                campaign(0, 1, 5.0, &["Male"]),
                campaign(1, 1, 3.0, &["Male"]),
                campaign(2, 1, 4.0, &["Young"]),
                campaign(3, 1, 0.1, &["Male"]),
            ],
            vec![good(&["Male", "Old"], 2, 0.5), good(&["Female"], 2, 0.0)],
        )
        .unwrap();
        // Campaign 2 does not want old males; campaign 3 is below the reserve
        assert_eq!(competing_rates(&market), vec![3.0, 0.0]);
    }

    #[test]
    fn test_fills_cheapest_goods_first() {
        let goods = vec![good(&["Male", "Old"], 2, 1.0), good(&["Male", "Young"], 2, 0.0)];
        let market = Market::new(vec![campaign(0, 3, 9.0, &["Male"])], goods).unwrap();

        let out = waterfall(&market);
        assert_eq!(out.allocation.at(0, 1), 2);
        assert_eq!(out.allocation.at(0, 0), 1);
        assert_relative_eq!(out.prices.at(0, 1), 0.0);
        assert_relative_eq!(out.prices.at(0, 0), 1.0);
    }

    #[test]
    fn test_rollback_frees_supply_for_later_campaigns() {
        let goods = vec![good(&["Male", "Old"], 1, 0.0), good(&["Male", "Young"], 1, 0.0)];
        let campaigns = vec![
            campaign(0, 2, 6.0, &["Male"]),
            campaign(1, 1, 2.0, &["Male", "Young"]),
            campaign(2, 5, 50.0, &["Male", "Old"]),
            campaign(3, 5, 45.0, &["Male", "Old"]),
        ];
        let market = Market::new(campaigns, goods).unwrap();
        // Campaigns 2 and 3 never fit but still push the old-male rate up
        assert_eq!(competing_rates(&market), vec![9.0, 2.0]);

        // Campaign 0 would pay 2 + 9 > 6, so its young unit goes to campaign 1
        let out = waterfall(&market);
        assert_eq!(out.allocation.total_for_campaign(0), 0);
        assert_eq!(out.prices.at(0, 0), 0.0);
        assert_eq!(out.allocation.at(1, 1), 1);
        assert_relative_eq!(out.prices.at(1, 1), 2.0);
        assert_eq!(out.allocation.total(), 1);
    }

    #[test]
    fn test_rollback_resets_prices_to_reserve() {
        let goods = vec![good(&["Male", "Old"], 1, 0.5), good(&["Male", "Young"], 1, 0.25)];
        let campaigns = vec![
            campaign(0, 2, 6.0, &["Male"]),
            campaign(1, 1, 2.0, &["Male", "Young"]),
            campaign(2, 5, 50.0, &["Male", "Old"]),
            campaign(3, 5, 45.0, &["Male", "Old"]),
        ];
        let market = Market::new(campaigns, goods).unwrap();
        assert_eq!(competing_rates(&market), vec![9.0, 2.0]);

        let out = waterfall(&market);
        assert_eq!(out.allocation.total_for_campaign(0), 0);
        assert_relative_eq!(out.prices.at(0, 0), 0.5);
        assert_relative_eq!(out.prices.at(0, 1), 0.25);
        assert_relative_eq!(out.prices.at(1, 1), 2.0);

        // Rolled-back cells carry no allocation, so they produce no bids
        let bids = wf_strategy(&market).unwrap();
        assert!(bids.iter().all(|b| b.campaign() != CampaignId(0)));
    }

    #[test]
    fn test_wf_bids_use_rates_as_amounts() {
        let goods = vec![good(&["Male"], 3, 0.0)];
        let campaigns = vec![
            campaign(0, 1, 4.0, &["Male"]),
            campaign(1, 1, 2.0, &["Male"]),
        ];
        let market = Market::new(campaigns, goods).unwrap();

        let bids = wf_strategy(&market).unwrap();
        assert_eq!(bids.len(), 2);
        for bid in &bids {
            assert_relative_eq!(bid.amount(), 2.0);
            assert_relative_eq!(bid.limit(), 2.0);
        }
    }

    #[test]
    fn test_free_good_bid_limit_is_budget() {
        let market = Market::new(
            vec![campaign(0, 1, 7.0, &["Male"])],
            vec![good(&["Male"], 1, 0.0)],
        )
        .unwrap();

        let bids = wf_strategy(&market).unwrap();
        assert_eq!(bids.len(), 1);
        assert_eq!(bids[0].amount(), 0.0);
        assert_eq!(bids[0].limit(), 7.0);
    }
}
