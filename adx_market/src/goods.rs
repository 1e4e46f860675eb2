//! Impression goods and the segment-matching relation

use crate::error::{Error, Result};
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// One kind of impression opportunity, tagged with demographic segments
///
/// Equality and hashing look only at the segment set, so the same slot type
/// with a different supply or reserve price is still the same good.
#[derive(Debug, Clone)]
pub struct Good {
    id: String,
    segments: BTreeSet<String>,
    supply: u32,
    reserve_price: f64,
}

impl Good {
    pub fn new<I, S>(segments: I, supply: u32, reserve_price: f64) -> Result<Good>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: BTreeSet<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() || segments.iter().any(|s| s.is_empty()) {
            return Err(Error::EmptySegments);
        }
        check_reserve_price(reserve_price)?;

        // First letter of each sorted label, e.g. {Male, Young, High} -> "HMY"
        let id = segments.iter().filter_map(|s| s.chars().next()).collect();

        Ok(Good {
            id,
            segments,
            supply,
            reserve_price,
        })
    }

    /// A good used only as a campaign target or bid key (no supply, no reserve)
    pub fn target<I, S>(segments: I) -> Result<Good>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Good::new(segments, 0, 0.0)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn segments(&self) -> &BTreeSet<String> {
        &self.segments
    }

    pub fn supply(&self) -> u32 {
        self.supply
    }

    pub fn reserve_price(&self) -> f64 {
        self.reserve_price
    }

    /// Same good with a new reserve price
    pub fn with_reserve_price(&self, reserve_price: f64) -> Result<Good> {
        check_reserve_price(reserve_price)?;
        Ok(Good {
            reserve_price,
            ..self.clone()
        })
    }

    /// Same good with a new supply
    pub fn with_supply(&self, supply: u32) -> Good {
        Good {
            supply,
            ..self.clone()
        }
    }

    /// True if `other`'s segments are a subset of this good's segments
    ///
    /// A more specific good satisfies a broader target. Reflexive, but only
    /// ever evaluated good-vs-target, so do not chain it.
    pub fn matches(&self, other: &Good) -> bool {
        other.segments.is_subset(&self.segments)
    }
}

fn check_reserve_price(reserve_price: f64) -> Result<()> {
    if reserve_price.is_finite() && reserve_price >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidReservePrice(reserve_price))
    }
}

impl PartialEq for Good {
    fn eq(&self, other: &Self) -> bool {
        self.segments == other.segments
    }
}

impl Eq for Good {}

impl Hash for Good {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.segments.hash(state);
    }
}

impl fmt::Display for Good {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.id, self.supply, self.reserve_price)
    }
}

/// Catalog indices in allocation order: descending by (reserve price, supply)
///
/// The sort is stable, so goods that tie keep their catalog order.
pub fn allocation_order(goods: &[Good]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..goods.len()).collect();
    order.sort_by(|&a, &b| {
        let (ga, gb) = (&goods[a], &goods[b]);
        gb.reserve_price
            .total_cmp(&ga.reserve_price)
            .then(gb.supply.cmp(&ga.supply))
    });
    order
}
