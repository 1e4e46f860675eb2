//! Approximate best-response graph over WE/WF population profiles
//!
//! Node `i` is the profile with `i` WE players and `n - i` WF players.
//! Only neighbouring profiles are connected: a single player switching
//! strategy moves the population one step along the chain.

use crate::error::{Error, Result};
use crate::profiles::{ProfileSample, mean_by_profile};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Which quantities are min-max normalized before use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrgOptions {
    pub normalize_utilities: bool,
    pub normalize_revenue: bool,
}

impl Default for BrgOptions {
    fn default() -> Self {
        BrgOptions {
            normalize_utilities: true,
            normalize_revenue: true,
        }
    }
}

/// Mean outcomes at one profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileNode {
    pub num_we: usize,
    pub num_wf: usize,
    pub we_utility: f64,
    pub wf_utility: f64,
    pub revenue: f64,
}

impl ProfileNode {
    /// Node label, e.g. "3WE_5WF"
    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ProfileNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}WE_{}WF", self.num_we, self.num_wf)
    }
}

#[derive(Debug, Clone)]
pub struct BestResponseGraph {
    graph: DiGraph<ProfileNode, ()>,
    /// Node index by number of WE players
    nodes: Vec<NodeIndex>,
}

impl BestResponseGraph {
    /// Number of players
    pub fn n(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn graph(&self) -> &DiGraph<ProfileNode, ()> {
        &self.graph
    }

    pub fn node_index(&self, num_we: usize) -> Option<NodeIndex> {
        self.nodes.get(num_we).copied()
    }

    pub fn profile(&self, num_we: usize) -> Option<&ProfileNode> {
        self.node_index(num_we).map(|i| &self.graph[i])
    }

    pub fn profiles(&self) -> impl Iterator<Item = &ProfileNode> + '_ {
        self.nodes.iter().map(|&i| &self.graph[i])
    }

    pub fn has_edge(&self, from_we: usize, to_we: usize) -> bool {
        match (self.node_index(from_we), self.node_index(to_we)) {
            (Some(a), Some(b)) => self.graph.find_edge(a, b).is_some(),
            _ => false,
        }
    }

    /// All edges as (from num_WE, to num_WE), sorted
    pub fn edges(&self) -> Vec<(usize, usize)> {
        let mut edges: Vec<(usize, usize)> = self
            .graph
            .edge_indices()
            .filter_map(|e| self.graph.edge_endpoints(e))
            .map(|(a, b)| (self.graph[a].num_we, self.graph[b].num_we))
            .collect();
        edges.sort_unstable();
        edges
    }

    /// Revenue at each profile, indexed by number of WE players
    pub fn revenue_per_node(&self) -> Vec<f64> {
        self.profiles().map(|p| p.revenue).collect()
    }
}

impl fmt::Display for BestResponseGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (from, to) in self.edges() {
            let (a, b) = (&self.graph[self.nodes[from]], &self.graph[self.nodes[to]]);
            writeln!(f, "{a} -> {b}")?;
        }
        Ok(())
    }
}

/// Build the 2-eps best-response graph from sampled games
///
/// Samples are optionally min-max scaled across every row, then averaged
/// per profile. For each `i < n`, with `we[j]` the
/// WE utility where `j` players play WE and `wf[j]` the WF utility where
/// `j` players play WF:
/// - `i -> i+1` when `we[i+1] >= wf[n-i] - 2 eps` (a WF player gains by switching)
/// - `i+1 -> i` when `we[i+1] - 2 eps <= wf[n-i]` (a WE player gains by switching)
///
/// Both edges exist when the two utilities are within `2 eps`.
pub fn build_eps_brg(
    rows: &[ProfileSample],
    eps: f64,
    options: BrgOptions,
) -> Result<BestResponseGraph> {
    if !(eps.is_finite() && eps >= 0.0) {
        return Err(Error::InvalidEpsilon(eps));
    }
    let first = rows.first().ok_or(Error::EmptyProfileTable)?;
    let n = first.num_we + first.num_wf;

    // Scaling is over individual samples, before averaging
    let mut rows = rows.to_vec();
    if options.normalize_utilities {
        normalize(&mut rows, |r| &mut r.we);
        normalize(&mut rows, |r| &mut r.wf);
    }
    if options.normalize_revenue {
        normalize(&mut rows, |r| &mut r.revenue);
    }

    let mut means: HashMap<usize, ProfileSample> = HashMap::new();
    for mean in mean_by_profile(&rows) {
        if mean.num_we + mean.num_wf != n {
            return Err(Error::InconsistentProfile {
                num_we: mean.num_we,
                num_wf: mean.num_wf,
                n,
            });
        }
        means.insert(mean.num_we, mean);
    }

    let mut profiles = Vec::with_capacity(n + 1);
    for num_we in 0..=n {
        let mean = means.get(&num_we).ok_or(Error::MissingProfile {
            num_we,
            num_wf: n - num_we,
        })?;
        profiles.push(ProfileNode {
            num_we,
            num_wf: n - num_we,
            we_utility: mean.we,
            wf_utility: mean.wf,
            revenue: mean.revenue,
        });
    }

    // we[j] lives on node j; wf[j] lives on node n - j
    let we = |j: usize| profiles[j].we_utility;
    let wf = |j: usize| profiles[n - j].wf_utility;

    let mut graph = DiGraph::with_capacity(n + 1, 2 * n);
    let nodes: Vec<NodeIndex> = profiles.iter().map(|&p| graph.add_node(p)).collect();

    for i in 0..n {
        let (gain_we, gain_wf) = (we(i + 1), wf(n - i));
        if gain_we >= gain_wf - 2.0 * eps {
            graph.add_edge(nodes[i], nodes[i + 1], ());
        }
        if gain_we - 2.0 * eps <= gain_wf {
            graph.add_edge(nodes[i + 1], nodes[i], ());
        }
    }
    debug!(n, eps, edges = graph.edge_count(), "built best-response graph");

    Ok(BestResponseGraph { graph, nodes })
}

/// Min-max scale one field across all samples to [0, 1]
///
/// A constant field becomes all zeros.
fn normalize<F>(rows: &mut [ProfileSample], field: F)
where
    F: Fn(&mut ProfileSample) -> &mut f64,
{
    let (mut min, mut max) = (f64::INFINITY, f64::NEG_INFINITY);
    for row in rows.iter_mut() {
        let v = *field(row);
        min = min.min(v);
        max = max.max(v);
    }
    let range = if max - min > 0.0 { max - min } else { 1.0 };
    for row in rows.iter_mut() {
        let v = field(row);
        *v = (*v - min) / range;
    }
}
