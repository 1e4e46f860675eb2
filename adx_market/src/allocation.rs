//! Campaign x good ledgers for units won and money spent

use crate::campaigns::{Campaign, CampaignId, Market};
use crate::goods::Good;
use std::cell::OnceCell;
use std::fmt;
use std::iter::Sum;
use std::ops::AddAssign;

/// A dense table of values keyed by (campaign, good)
///
/// Rows follow the campaign order of the market and columns follow the
/// catalog order. Per-campaign and per-good totals are computed on first
/// use and cached until the ledger is written again.
#[derive(Debug, Clone)]
pub struct Ledger<T> {
    campaigns: Vec<Campaign>,
    goods: Vec<Good>,
    cells: Vec<Vec<T>>,
    campaign_totals: OnceCell<Vec<T>>,
    good_totals: OnceCell<Vec<T>>,
}

/// Units won per (campaign, good)
pub type Allocation = Ledger<u32>;

/// Money charged per (campaign, good)
pub type Expenditure = Ledger<f64>;

impl<T> Ledger<T>
where
    T: Copy + Default + AddAssign + Sum<T> + PartialEq,
{
    pub fn new(market: &Market) -> Ledger<T> {
        Ledger::from_parts(market.campaigns(), market.goods())
    }

    pub fn from_parts(campaigns: &[Campaign], goods: &[Good]) -> Ledger<T> {
        Ledger {
            campaigns: campaigns.to_vec(),
            goods: goods.to_vec(),
            cells: vec![vec![T::default(); goods.len()]; campaigns.len()],
            campaign_totals: OnceCell::new(),
            good_totals: OnceCell::new(),
        }
    }

    pub fn campaigns(&self) -> &[Campaign] {
        &self.campaigns
    }

    pub fn goods(&self) -> &[Good] {
        &self.goods
    }

    /// Value at (campaign index, good index)
    pub fn at(&self, campaign: usize, good: usize) -> T {
        self.cells[campaign][good]
    }

    /// Value for a campaign and good, zero if either is not in the ledger
    pub fn get(&self, campaign: CampaignId, good: &Good) -> T {
        let c = self.campaigns.iter().position(|c| c.id() == campaign);
        let g = self.goods.iter().position(|g| g == good);
        match (c, g) {
            (Some(c), Some(g)) => self.cells[c][g],
            _ => T::default(),
        }
    }

    pub fn row(&self, campaign: usize) -> &[T] {
        &self.cells[campaign]
    }

    pub(crate) fn add(&mut self, campaign: usize, good: usize, value: T) {
        self.cells[campaign][good] += value;
        self.invalidate();
    }

    pub(crate) fn set(&mut self, campaign: usize, good: usize, value: T) {
        self.cells[campaign][good] = value;
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.campaign_totals.take();
        self.good_totals.take();
    }

    /// Sum over all goods for one campaign
    pub fn total_for_campaign(&self, campaign: usize) -> T {
        self.campaign_totals
            .get_or_init(|| self.cells.iter().map(|row| row.iter().copied().sum()).collect())
            [campaign]
    }

    /// Sum over all campaigns for one good
    pub fn total_for_good(&self, good: usize) -> T {
        self.good_totals.get_or_init(|| {
            (0..self.goods.len())
                .map(|g| self.cells.iter().map(|row| row[g]).sum())
                .collect()
        })[good]
    }

    /// Grand total over the whole ledger
    pub fn total(&self) -> T {
        (0..self.campaigns.len())
            .map(|c| self.total_for_campaign(c))
            .sum()
    }

    /// Non-zero cells as (campaign index, good index, value)
    pub fn entries(&self) -> impl Iterator<Item = (usize, usize, T)> + '_ {
        self.cells.iter().enumerate().flat_map(|(c, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, v)| **v != T::default())
                .map(move |(g, v)| (c, g, *v))
        })
    }

    /// True if both ledgers have the same campaigns and goods in the same order
    pub fn same_shape<U>(&self, other: &Ledger<U>) -> bool {
        self.campaigns.len() == other.campaigns.len()
            && self.goods == other.goods
            && self
                .campaigns
                .iter()
                .zip(&other.campaigns)
                .all(|(a, b)| a.id() == b.id())
    }
}

impl<T: PartialEq> PartialEq for Ledger<T> {
    fn eq(&self, other: &Self) -> bool {
        self.goods == other.goods && self.campaigns == other.campaigns && self.cells == other.cells
    }
}

impl<T: fmt::Display> fmt::Display for Ledger<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<8}", "")?;
        for good in &self.goods {
            write!(f, "{:>10}", good.id())?;
        }
        writeln!(f)?;
        for (campaign, row) in self.campaigns.iter().zip(&self.cells) {
            write!(f, "{:<8}", campaign.id().to_string())?;
            for value in row {
                write!(f, "{:>10.4}", value)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
