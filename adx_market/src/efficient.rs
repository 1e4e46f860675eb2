//! WE: greedy efficient allocation priced by a linear program
//!
//! Campaigns are served in order of bid density, all or nothing, from the
//! most expensive goods first. Prices then maximize revenue subject to
//! every served campaign affording its bundle, with a penalized slack
//! allowing a campaign to pay more for a good than for an unexhausted
//! substitute.

use crate::allocation::Allocation;
use crate::campaigns::{Bid, Market, density_order};
use crate::error::Result;
use crate::goods::allocation_order;
use crate::lp::{LinearProgram, LpSolver, Relation};
use tracing::debug;

/// All-or-nothing greedy allocation at reserve prices
///
/// A campaign is served only if the remaining matching supply covers its
/// whole reach, and only if the bundle's reserve cost fits its budget.
/// A rejected bundle is returned to supply before the next campaign.
pub fn greedy_allocation(market: &Market) -> Allocation {
    let goods = market.goods();
    let goods_order = allocation_order(goods);
    let mut supply: Vec<u32> = goods.iter().map(|g| g.supply()).collect();
    let mut allocation = Allocation::new(market);

    for c in density_order(market.campaigns()) {
        let campaign = &market.campaigns()[c];
        let matching: Vec<usize> = goods_order
            .iter()
            .copied()
            .filter(|&g| campaign.wants(&goods[g]))
            .collect();

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
            if take > 0 {
                allocation.set(c, g, take);
                supply[g] -= take;
                remaining -= take;
                cost += take as f64 * goods[g].reserve_price();
            }
        }

        if cost > campaign.budget() {
            for &g in &matching {
                supply[g] += allocation.at(c, g);
                allocation.set(c, g, 0);
            }
            debug!(campaign = %campaign.id(), cost, "bundle over budget, rolled back");
        }
    }

    allocation
}

/// Revenue-maximizing prices for an allocation, one per catalog good
///
/// Every price is at least its good's reserve.
pub fn pricing<S: LpSolver + ?Sized>(allocation: &Allocation, solver: &S) -> Result<Vec<f64>> {
    let goods = allocation.goods();
    let campaigns = allocation.campaigns();
    let mut lp = LinearProgram::new();

    let prices: Vec<usize> = goods
        .iter()
        .enumerate()
        .map(|(g, good)| {
            lp.add_var(
                allocation.total_for_good(g) as f64,
                good.reserve_price(),
                f64::INFINITY,
            )
        })
        .collect();

    for (c, campaign) in campaigns.iter().enumerate() {
        if allocation.total_for_campaign(c) == 0 {
            continue;
        }

        // Individual rationality: the bundle must be affordable
        let terms = allocation
            .row(c)
            .iter()
            .enumerate()
            .filter(|(_, units)| **units > 0)
            .map(|(g, &units)| (prices[g], units as f64))
            .collect();
        lp.add_constraint(terms, Relation::Le, campaign.budget());

        for (i, &units) in allocation.row(c).iter().enumerate() {
            if units == 0 {
                continue;
            }
            for (k, substitute) in goods.iter().enumerate() {
                let exhausted = allocation.at(c, k) >= substitute.supply();
                if k == i || exhausted || !campaign.wants(substitute) {
                    continue;
                }
                let slack = lp.add_var(-1.0, 0.0, f64::INFINITY);
                lp.add_constraint(
                    vec![(prices[i], 1.0), (prices[k], -1.0), (slack, -1.0)],
                    Relation::Le,
                    0.0,
                );
            }
        }
    }

    let solution = solver.maximize(&lp)?;
    Ok(prices
        .iter()
        .zip(goods)
        .map(|(&var, good)| solution[var].max(good.reserve_price()))
        .collect())
}

/// Bids for every (campaign, good) the WE allocation serves
///
/// A bid offers the LP price and caps spend at the bundle's cost for that
/// good, or at the whole budget when the good is free.
pub fn we_strategy<S: LpSolver + ?Sized>(market: &Market, solver: &S) -> Result<Vec<Bid>> {
    let allocation = greedy_allocation(market);
    let prices = pricing(&allocation, solver)?;

    let mut bids = Vec::new();
    for (c, g, units) in allocation.entries() {
        let campaign = &market.campaigns()[c];
        let price = prices[g];
        let limit = if price > 0.0 {
            units as f64 * price
        } else {
            campaign.budget()
        };
        bids.push(Bid::new(campaign.id(), market.goods()[g].clone(), price, limit)?);
    }
    debug!(bids = bids.len(), "WE bids");
    Ok(bids)
}
