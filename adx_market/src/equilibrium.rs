//! Equilibria of the best-response graph and their revenue
//!
//! Two families are supported: all strongly connected components, and
//! sinks (components no edge leaves). Either family reduces to a single
//! revenue estimate through an inner reducer per member and an outer
//! reducer across members.

use crate::brg::BestResponseGraph;
use crate::error::{Error, Result};
use petgraph::algo::tarjan_scc;
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// A way of picking node sets of the BRG as equilibria
pub trait EquilibriumFamily {
    fn name(&self) -> &'static str;

    /// Members of the family, each a set of graph nodes
    fn members(&self, brg: &BestResponseGraph) -> Vec<Vec<NodeIndex>>;
}

/// Every strongly connected component
#[derive(Debug, Clone, Copy, Default)]
pub struct SccEquilibria;

impl EquilibriumFamily for SccEquilibria {
    fn name(&self) -> &'static str {
        "scc"
    }

    fn members(&self, brg: &BestResponseGraph) -> Vec<Vec<NodeIndex>> {
        tarjan_scc(brg.graph())
    }
}

/// Strongly connected components with no edge leaving them
#[derive(Debug, Clone, Copy, Default)]
pub struct SinkEquilibria;

impl EquilibriumFamily for SinkEquilibria {
    fn name(&self) -> &'static str {
        "sink"
    }

    fn members(&self, brg: &BestResponseGraph) -> Vec<Vec<NodeIndex>> {
        let graph = brg.graph();
        tarjan_scc(graph)
            .into_iter()
            .filter(|component| {
                let inside: HashSet<NodeIndex> = component.iter().copied().collect();
                component
                    .iter()
                    .all(|&node| graph.neighbors(node).all(|next| inside.contains(&next)))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EquilibriumKind {
    Scc,
    Sink,
}

impl EquilibriumKind {
    pub fn compute(&self, brg: &BestResponseGraph, revenue_per_node: &[f64]) -> Result<EquilibriumFamilies> {
        match self {
            EquilibriumKind::Scc => compute_equilibria(&SccEquilibria, brg, revenue_per_node),
            EquilibriumKind::Sink => compute_equilibria(&SinkEquilibria, brg, revenue_per_node),
        }
    }
}

impl FromStr for EquilibriumKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "scc" => Ok(EquilibriumKind::Scc),
            "sink" => Ok(EquilibriumKind::Sink),
            _ => Err(Error::UnknownEquilibriumKind(s.to_string())),
        }
    }
}

impl fmt::Display for EquilibriumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EquilibriumKind::Scc => write!(f, "scc"),
            EquilibriumKind::Sink => write!(f, "sink"),
        }
    }
}

/// Members of an equilibrium family with the revenue at each member node
///
/// Members are listed by their smallest number of WE players, and nodes
/// within a member in increasing number of WE players.
#[derive(Debug, Clone, PartialEq)]
pub struct EquilibriumFamilies {
    /// Node names per member, e.g. ["0WE_8WF", "1WE_7WF"]
    pub members: Vec<Vec<String>>,
    /// Number of WE players per member node
    pub profiles: Vec<Vec<usize>>,
    pub revenues: Vec<Vec<f64>>,
}

impl EquilibriumFamilies {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Extract a family and attach revenues indexed by number of WE players
pub fn compute_equilibria<F: EquilibriumFamily + ?Sized>(
    family: &F,
    brg: &BestResponseGraph,
    revenue_per_node: &[f64],
) -> Result<EquilibriumFamilies> {
    if revenue_per_node.len() != brg.n() + 1 {
        return Err(Error::RevenueLengthMismatch {
            got: revenue_per_node.len(),
            expected: brg.n() + 1,
        });
    }

    let graph = brg.graph();
    let mut profiles: Vec<Vec<usize>> = family
        .members(brg)
        .into_iter()
        .map(|member| {
            let mut num_we: Vec<usize> = member.iter().map(|&i| graph[i].num_we).collect();
            num_we.sort_unstable();
            num_we
        })
        .collect();
    profiles.sort();

    let members = profiles
        .iter()
        .map(|member| {
            member
                .iter()
                .filter_map(|&i| brg.profile(i).map(|p| p.name()))
                .collect()
        })
        .collect();
    let revenues = profiles
        .iter()
        .map(|member| member.iter().map(|&i| revenue_per_node[i]).collect())
        .collect();

    Ok(EquilibriumFamilies {
        members,
        profiles,
        revenues,
    })
}

pub fn compute_scc_equilibria(brg: &BestResponseGraph, revenue_per_node: &[f64]) -> Result<EquilibriumFamilies> {
    compute_equilibria(&SccEquilibria, brg, revenue_per_node)
}

pub fn compute_sink_equilibria(brg: &BestResponseGraph, revenue_per_node: &[f64]) -> Result<EquilibriumFamilies> {
    compute_equilibria(&SinkEquilibria, brg, revenue_per_node)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reducer {
    Min,
    Mean,
    Max,
}

impl Reducer {
    /// `None` for an empty slice
    pub fn reduce(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        Some(match self {
            Reducer::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Reducer::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Reducer::Mean => values.iter().sum::<f64>() / values.len() as f64,
        })
    }
}

impl FromStr for Reducer {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "min" => Ok(Reducer::Min),
            "mean" | "avg" => Ok(Reducer::Mean),
            "max" => Ok(Reducer::Max),
            _ => Err(Error::UnknownReducer(s.to_string())),
        }
    }
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Reducer::Min => "min",
            Reducer::Mean => "mean",
            Reducer::Max => "max",
        };
        write!(f, "{name}")
    }
}

/// An (outer, inner) reducer pair, written "outer-inner"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aggregator {
    pub outer: Reducer,
    pub inner: Reducer,
}

impl Aggregator {
    pub fn new(outer: Reducer, inner: Reducer) -> Self {
        Aggregator { outer, inner }
    }

    pub fn aggregate(&self, revenues: &[Vec<f64>]) -> Result<(f64, Vec<f64>)> {
        aggregate(revenues, self.outer, self.inner)
    }
}

impl Default for Aggregator {
    /// Worst profile of the worst equilibrium
    fn default() -> Self {
        Aggregator::new(Reducer::Min, Reducer::Min)
    }
}

impl FromStr for Aggregator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (outer, inner) = s
            .split_once('-')
            .ok_or_else(|| Error::UnknownAggregator(s.to_string()))?;
        Ok(Aggregator::new(outer.parse()?, inner.parse()?))
    }
}

impl fmt::Display for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.outer, self.inner)
    }
}

/// Reduce each member with `inner`, then the member values with `outer`
///
/// Returns the scalar and the per-member values.
pub fn aggregate(revenues: &[Vec<f64>], outer: Reducer, inner: Reducer) -> Result<(f64, Vec<f64>)> {
    let per_member = revenues
        .iter()
        .enumerate()
        .map(|(i, member)| inner.reduce(member).ok_or(Error::EmptyFamilyMember(i)))
        .collect::<Result<Vec<f64>>>()?;
    let value = outer.reduce(&per_member).ok_or(Error::EmptyFamily)?;
    Ok((value, per_member))
}
