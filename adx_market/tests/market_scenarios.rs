// Given-When-Then scenarios for one market round: bidding, clearing, scoring

use adx_market::draws::{BudgetSampler, draw_campaign, draw_impressions};
use adx_market::{
    Bid, Campaign, CampaignId, FirstTied, GameConfig, GameParams, Good, Market, MiniLpSolver,
    RandomTieBreaker, compute_statistics, effective_reach_ratio, greedy_allocation, run_auctions,
    waterfall, we_strategy, wf_strategy,
};
use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const TOLERANCE: f64 = 1e-9;

fn small_config(reserve: f64) -> GameConfig {
    let mut params = GameParams::baseline();
    params.k = 300;
    params.n = 4;
    GameConfig::baseline()
        .unwrap()
        .with_params(params)
        .unwrap()
        .with_uniform_reserve(reserve)
        .unwrap()
}

fn random_market(config: &GameConfig, seed: u64) -> Market {
    let budgets = BudgetSampler::new().unwrap();
    let mut rng = StdRng::seed_from_u64(seed);
    let n = config.params().n;
    let campaigns: Vec<Campaign> = (0..n)
        .map(|i| draw_campaign(CampaignId(i), n, config, &budgets, &mut rng).unwrap())
        .collect();
    Market::new(campaigns, config.goods().to_vec()).unwrap()
}

#[test]
fn given_single_campaign_and_single_impression_when_cleared_then_wins_at_reserve() {
    // GIVEN: goods {M} and {F}, one campaign targeting {M} with reach 1 and budget 10
    let male = Good::new(["M"], 1, 0.0).unwrap();
    let female = Good::new(["F"], 1, 0.0).unwrap();
    let campaign = Campaign::new(CampaignId(0), 1, 10.0, Good::target(["M"]).unwrap()).unwrap();
    let bid = Bid::new(CampaignId(0), male.clone(), 1.0, 10.0).unwrap();

    // WHEN: one {M} impression is auctioned
    let outcome = run_auctions(
        &[male.clone()],
        &[male.clone(), female],
        &[campaign],
        &[bid],
        &mut FirstTied,
    )
    .unwrap();

    // THEN: the campaign wins it for free and reaches its target
    assert_eq!(outcome.allocation.get(CampaignId(0), &male), 1);
    assert_eq!(outcome.expenditure.get(CampaignId(0), &male), 0.0);
    assert_eq!(outcome.unsold, 0);

    let stats = compute_statistics(&outcome.allocation, &outcome.expenditure).unwrap();
    let expected = effective_reach_ratio(1.0, 1).unwrap() * 10.0;
    assert_relative_eq!(stats.utility(CampaignId(0)).unwrap(), expected, epsilon = 1e-12);
    assert_relative_eq!(stats.total_revenue, 0.0);
}

#[test]
fn given_random_markets_when_cleared_then_units_bounded_by_draws_and_prices_by_reserve() {
    for seed in 0..5 {
        // GIVEN: a random market with a uniform reserve and mixed strategies
        let config = small_config(0.3);
        let market = random_market(&config, seed);
        let mut bids = we_strategy(&market, &MiniLpSolver).unwrap();
        bids.retain(|b| b.campaign().0 % 2 == 0);
        bids.extend(wf_strategy(&market).unwrap().into_iter().filter(|b| b.campaign().0 % 2 == 1));

        // WHEN: a random impression stream is cleared
        let mut rng = StdRng::seed_from_u64(100 + seed);
        let impressions = draw_impressions(&config, &mut rng);
        let outcome = run_auctions(
            &impressions,
            market.goods(),
            market.campaigns(),
            &bids,
            &mut RandomTieBreaker(&mut rng),
        )
        .unwrap();

        // THEN: every sold unit was drawn, and none sold below reserve
        assert_eq!(
            outcome.allocation.total() as usize + outcome.unsold,
            impressions.len()
        );
        for (g, good) in market.goods().iter().enumerate() {
            let drawn = impressions.iter().filter(|i| *i == good).count() as u32;
            assert!(outcome.allocation.total_for_good(g) <= drawn);
        }
        for (c, g, units) in outcome.allocation.entries() {
            let reserve = market.goods()[g].reserve_price();
            assert!(outcome.expenditure.at(c, g) + TOLERANCE >= units as f64 * reserve);
        }
    }
}

#[test]
fn given_one_bid_per_campaign_when_cleared_then_spend_stays_within_limit() {
    // GIVEN: random single bids on random base goods
    let config = small_config(0.0);
    let market = random_market(&config, 7);
    let mut rng = StdRng::seed_from_u64(8);
    let bids: Vec<Bid> = market
        .campaigns()
        .iter()
        .map(|c| {
            let good = market.goods()[rng.random_range(0..market.goods().len())].clone();
            let limit: f64 = rng.random_range(1.0..20.0);
            let amount = rng.random::<f64>() * limit.min(2.0);
            Bid::new(c.id(), good, amount, limit).unwrap()
        })
        .collect();

    // WHEN
    let impressions = draw_impressions(&config, &mut rng);
    let outcome = run_auctions(
        &impressions,
        market.goods(),
        market.campaigns(),
        &bids,
        &mut FirstTied,
    )
    .unwrap();

    // THEN: spend over the goods each bid covers never passes its limit
    for bid in &bids {
        let c = market.campaign_index(bid.campaign()).unwrap();
        let spent: f64 = market
            .goods()
            .iter()
            .enumerate()
            .filter(|(_, g)| g.matches(bid.good()))
            .map(|(g, _)| outcome.expenditure.at(c, g))
            .sum();
        assert!(spent <= bid.limit() + TOLERANCE, "{bid}: spent {spent}");
    }
}

#[test]
fn given_random_markets_when_allocating_then_reach_and_supply_respected() {
    for seed in 0..5 {
        let config = small_config(0.0);
        let market = random_market(&config, seed);

        for allocation in [greedy_allocation(&market), waterfall(&market).allocation] {
            for (c, campaign) in market.campaigns().iter().enumerate() {
                assert!(allocation.total_for_campaign(c) <= campaign.reach());
            }
            for (g, good) in market.goods().iter().enumerate() {
                assert!(allocation.total_for_good(g) <= good.supply());
            }
        }
    }
}

#[test]
fn given_statistics_computed_when_recomputed_then_identical() {
    // GIVEN: a played round
    let config = small_config(0.1);
    let market = random_market(&config, 3);
    let bids = wf_strategy(&market).unwrap();
    let mut rng = StdRng::seed_from_u64(4);
    let impressions = draw_impressions(&config, &mut rng);
    let outcome = run_auctions(
        &impressions,
        market.goods(),
        market.campaigns(),
        &bids,
        &mut FirstTied,
    )
    .unwrap();

    // WHEN: statistics are computed twice
    let first = compute_statistics(&outcome.allocation, &outcome.expenditure).unwrap();
    let second = compute_statistics(&outcome.allocation, &outcome.expenditure).unwrap();

    // THEN: nothing accumulated between calls
    assert_eq!(first, second);
    assert_relative_eq!(first.total_revenue, outcome.expenditure.total(), epsilon = 1e-9);
}

#[test]
fn given_invalid_bids_when_constructed_then_rejected() {
    let good = Good::new(["M"], 1, 0.0).unwrap();
    assert!(Bid::new(CampaignId(0), good.clone(), -0.1, 1.0).is_err());
    assert!(Bid::new(CampaignId(0), good.clone(), 2.0, 1.0).is_err());
    assert!(Bid::new(CampaignId(0), good.clone(), 0.0, 0.0).is_err());
    assert!(Bid::new(CampaignId(0), good, 1.0, 1.0).is_ok());
}

#[test]
fn given_goods_when_matching_then_reflexive_and_fewer_labels_never_match() {
    let target = Good::target(["Male", "Young"]).unwrap();
    let exact = Good::new(["Male", "Young"], 1, 0.0).unwrap();
    let wider = Good::new(["Male", "Young", "Low"], 1, 0.0).unwrap();
    let narrower = Good::new(["Male"], 1, 0.0).unwrap();

    assert!(exact.matches(&exact));
    assert!(exact.matches(&target));
    assert!(wider.matches(&target));
    assert!(!narrower.matches(&target));
}
