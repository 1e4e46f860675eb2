//! Sequential second-price clearing of an impression stream
//!
//! Impressions are sold one at a time, in order. Each sale can exhaust the
//! winner's spend limits, which retires bids before later impressions are
//! cleared, so the same bids against a reordered stream can produce a
//! different outcome.

use crate::allocation::{Allocation, Expenditure};
use crate::campaigns::{Bid, Campaign, Market};
use crate::error::{Error, Result};
use crate::goods::Good;
use rand::Rng;
use tracing::trace;

/// Slack allowed when comparing a bid amount with its remaining headroom
const HEADROOM_TOLERANCE: f64 = 1e-9;

/// Chooses a winner among bids tied at the maximum
pub trait TieBreaker {
    /// Index in `0..num_tied` of the winning bid
    fn pick(&mut self, num_tied: usize) -> usize;
}

/// Uniformly random tie-breaking from an explicit generator
pub struct RandomTieBreaker<R>(pub R);

impl<R: Rng> TieBreaker for RandomTieBreaker<R> {
    fn pick(&mut self, num_tied: usize) -> usize {
        self.0.random_range(0..num_tied)
    }
}

/// Always the first tied bid in campaign order
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstTied;

impl TieBreaker for FirstTied {
    fn pick(&mut self, _num_tied: usize) -> usize {
        0
    }
}

/// Result of clearing one impression stream
#[derive(Debug, Clone)]
pub struct AuctionOutcome {
    pub allocation: Allocation,
    pub expenditure: Expenditure,
    pub unsold: usize,
}

struct StandingBid<'a> {
    bid: &'a Bid,
    campaign: usize,
    /// Catalog goods whose spend counts against this bid's limit
    covered: Vec<usize>,
    active: bool,
}

/// Clear `impressions` in order against the standing `bids`
///
/// Each impression must be a catalog good; its reserve price is the
/// catalog's. The highest qualifying bid wins one unit at the larger of
/// the second-highest qualifying bid and the reserve. A campaign competes
/// only with its best qualifying bid.
pub fn run_auctions<T: TieBreaker>(
    impressions: &[Good],
    goods: &[Good],
    campaigns: &[Campaign],
    bids: &[Bid],
    tie_breaker: &mut T,
) -> Result<AuctionOutcome> {
    let market = Market::new(campaigns.to_vec(), goods.to_vec())?;

    let mut standing = Vec::with_capacity(bids.len());
    for bid in bids {
        let campaign = market
            .campaign_index(bid.campaign())
            .ok_or(Error::UnknownCampaign(bid.campaign()))?;
        let covered = goods
            .iter()
            .enumerate()
            .filter(|(_, g)| g.matches(bid.good()))
            .map(|(i, _)| i)
            .collect();
        standing.push(StandingBid {
            bid,
            campaign,
            covered,
            active: true,
        });
    }

    let mut allocation = Allocation::new(&market);
    let mut expenditure = Expenditure::new(&market);
    let mut unsold = 0;

    // Best qualifying amount per campaign for the current impression
    let mut best: Vec<Option<f64>> = vec![None; campaigns.len()];

    for impression in impressions {
        let g = market
            .good_index(impression)
            .ok_or_else(|| Error::UnknownGood(impression.id().to_string()))?;
        let reserve = goods[g].reserve_price();

        best.iter_mut().for_each(|b| *b = None);
        for s in standing.iter().filter(|s| s.active) {
            let amount = s.bid.amount();
            if amount >= reserve && impression.matches(s.bid.good()) {
                let slot = &mut best[s.campaign];
                if slot.is_none_or(|current| amount > current) {
                    *slot = Some(amount);
                }
            }
        }

        let candidates: Vec<(usize, f64)> = best
            .iter()
            .enumerate()
            .filter_map(|(c, b)| b.map(|amount| (c, amount)))
            .collect();
        if candidates.is_empty() {
            trace!(good = impression.id(), "impression unsold");
            unsold += 1;
            continue;
        }

        let (first, second) = top_two(candidates.iter().map(|&(_, a)| a));
        let tied: Vec<usize> = candidates
            .iter()
            .filter(|&&(_, a)| a == first)
            .map(|&(c, _)| c)
            .collect();
        let winner = tied[tie_breaker.pick(tied.len()).min(tied.len() - 1)];
        let price = second.max(reserve);

        allocation.add(winner, g, 1);
        expenditure.add(winner, g, price);
        trace!(
            good = impression.id(),
            winner = %campaigns[winner].id(),
            price,
            bidders = candidates.len(),
            "impression sold"
        );

        // Only the winner's spend changed, so only its bids can run out of headroom
        for s in standing
            .iter_mut()
            .filter(|s| s.active && s.campaign == winner)
        {
            let spent: f64 = s.covered.iter().map(|&cg| expenditure.at(winner, cg)).sum();
            if s.bid.limit() - spent + HEADROOM_TOLERANCE < s.bid.amount() {
                s.active = false;
                trace!(bid = %s.bid, spent, "bid retired");
            }
        }
    }

    Ok(AuctionOutcome {
        allocation,
        expenditure,
        unsold,
    })
}

/// Largest and second-largest values, duplicates counted separately
///
/// The second is 0 when fewer than two values are given.
fn top_two(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let mut first = f64::NEG_INFINITY;
    let mut second = f64::NEG_INFINITY;
    for v in values {
        if v > first {
            second = first;
            first = v;
        } else if v > second {
            second = v;
        }
    }
    let second = if second.is_finite() { second } else { 0.0 };
    (first, second)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaigns::CampaignId;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

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

    fn bid(id: usize, g: &Good, amount: f64, limit: f64) -> Bid {
        Bid::new(CampaignId(id), g.clone(), amount, limit).unwrap()
    }

    #[test]
    fn test_top_two() {
        assert_eq!(top_two([3.0, 1.0, 2.0].into_iter()), (3.0, 2.0));
        assert_eq!(top_two([2.0, 2.0].into_iter()), (2.0, 2.0));
        assert_eq!(top_two([4.0].into_iter()), (4.0, 0.0));
    }

    #[test]
    fn test_single_bidder_pays_reserve() {
        let m = good(&["Male"], 1, 0.5);
        let c = campaign(0, 1, 10.0, &["Male"]);
        let bids = vec![bid(0, &m, 2.0, 10.0)];

        let out = run_auctions(&[m.clone()], &[m.clone()], &[c], &bids, &mut FirstTied).unwrap();
        assert_eq!(out.allocation.at(0, 0), 1);
        assert_relative_eq!(out.expenditure.at(0, 0), 0.5);
        assert_eq!(out.unsold, 0);
    }

    #[test]
    fn test_winner_pays_second_price() {
        let m = good(&["Male"], 2, 0.0);
        let campaigns = vec![
            campaign(0, 1, 10.0, &["Male"]),
            campaign(1, 1, 10.0, &["Male"]),
        ];
        let bids = vec![bid(0, &m, 3.0, 10.0), bid(1, &m, 1.25, 10.0)];

        let out = run_auctions(&[m.clone()], &[m], &campaigns, &bids, &mut FirstTied).unwrap();
        assert_eq!(out.allocation.at(0, 0), 1);
        assert_eq!(out.allocation.at(1, 0), 0);
        assert_relative_eq!(out.expenditure.at(0, 0), 1.25);
    }

    #[test]
    fn test_campaign_does_not_outbid_itself() {
        let m = good(&["Male"], 1, 0.0);
        let c = campaign(0, 1, 10.0, &["Male"]);
        let bids = vec![bid(0, &m, 3.0, 10.0), bid(0, &m, 2.0, 10.0)];

        let out = run_auctions(&[m.clone()], &[m], &[c], &bids, &mut FirstTied).unwrap();
        assert_relative_eq!(out.expenditure.at(0, 0), 0.0);
    }

    #[test]
    fn test_bids_below_reserve_do_not_qualify() {
        let m = good(&["Male"], 1, 2.0);
        let c = campaign(0, 1, 10.0, &["Male"]);
        let bids = vec![bid(0, &m, 1.0, 10.0)];

        let out = run_auctions(&[m.clone()], &[m], &[c], &bids, &mut FirstTied).unwrap();
        assert_eq!(out.unsold, 1);
        assert_eq!(out.allocation.total(), 0);
        assert_eq!(out.expenditure.total(), 0.0);
    }

    #[test]
    fn test_bid_retired_when_limit_reached() {
        let m = good(&["Male"], 3, 0.0);
        let campaigns = vec![
            campaign(0, 2, 10.0, &["Male"]),
            campaign(1, 3, 10.0, &["Male"]),
        ];
        // Campaign 0 can afford two units at price 1
        let bids = vec![bid(0, &m, 2.0, 2.0), bid(1, &m, 1.0, 10.0)];
        let stream = vec![m.clone(), m.clone(), m.clone()];

        let out = run_auctions(&stream, &[m], &campaigns, &bids, &mut FirstTied).unwrap();
        // First sale: spent 1, headroom 1 < 2, so the bid retires after one unit
        assert_eq!(out.allocation.at(0, 0), 1);
        assert_eq!(out.allocation.at(1, 0), 2);
        assert_relative_eq!(out.expenditure.at(0, 0), 1.0);
        assert_relative_eq!(out.expenditure.at(1, 0), 0.0);
    }

    #[test]
    fn test_limit_spans_all_matching_goods() {
        let young = good(&["Male", "Young"], 1, 1.0);
        let old = good(&["Male", "Old"], 1, 1.0);
        let c = campaign(0, 2, 10.0, &["Male"]);
        let broad = Good::target(["Male"]).unwrap();
        let bids = vec![bid(0, &broad, 1.0, 1.0)];
        let goods = vec![young.clone(), old.clone()];

        let out = run_auctions(&[young, old], &goods, &[c], &bids, &mut FirstTied).unwrap();
        assert_eq!(out.allocation.total(), 1);
        assert_eq!(out.unsold, 1);
    }

    #[test]
    fn test_unknown_impression_rejected() {
        let m = good(&["Male"], 1, 0.0);
        let f = good(&["Female"], 1, 0.0);
        let c = campaign(0, 1, 1.0, &["Male"]);

        let result = run_auctions(&[f], &[m], &[c], &[], &mut FirstTied);
        assert!(matches!(result, Err(Error::UnknownGood(_))));
    }

    #[test]
    fn test_bid_from_unknown_campaign_rejected() {
        let m = good(&["Male"], 1, 0.0);
        let c = campaign(0, 1, 1.0, &["Male"]);
        let bids = vec![bid(5, &m, 1.0, 1.0)];

        let result = run_auctions(&[m.clone()], &[m], &[c], &bids, &mut FirstTied);
        assert!(matches!(result, Err(Error::UnknownCampaign(CampaignId(5)))));
    }

    #[test]
    fn test_random_ties_are_reproducible() {
        let m = good(&["Male"], 10, 0.0);
        let campaigns: Vec<_> = (0..4).map(|i| campaign(i, 10, 100.0, &["Male"])).collect();
        let bids: Vec<_> = (0..4).map(|i| bid(i, &m, 1.0, 100.0)).collect();
        let stream = vec![m.clone(); 10];

        let run = |seed| {
            let mut tb = RandomTieBreaker(StdRng::seed_from_u64(seed));
            run_auctions(&stream, &[m.clone()], &campaigns, &bids, &mut tb)
                .unwrap()
                .allocation
        };
        assert_eq!(run(7), run(7));
        assert_eq!(run(7).total(), 10);
    }
}
