//! Per-profile utility and revenue samples
//!
//! A profile is a split of the `n` players into `num_we` WE players and
//! `num_wf` WF players. Sampling runs many independent games per profile
//! in parallel; the table they produce feeds the best-response graph.

use crate::config::GameConfig;
use crate::error::{Error, Result};
use crate::game::play_game;
use crate::lp::LpSolver;
use rand::SeedableRng;
use rand::rngs::StdRng;
use sampler::{JobFailure, ParallelRunner, logging_progress_reporter};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// Most games in flight at once; large runs are sampled in batches
const SAMPLE_BATCH_SIZE: usize = 4096;

/// One sampled game, or a per-profile mean of many
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileSample {
    #[serde(rename = "num_WE")]
    pub num_we: usize,
    #[serde(rename = "num_WF")]
    pub num_wf: usize,
    pub we: f64,
    pub wf: f64,
    pub revenue: f64,
}

/// Sampled games ordered by ascending `num_WE`, then descending `num_WF`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileTable {
    rows: Vec<ProfileSample>,
}

impl ProfileTable {
    pub fn new(mut rows: Vec<ProfileSample>) -> Self {
        rows.sort_by(|a, b| a.num_we.cmp(&b.num_we).then(b.num_wf.cmp(&a.num_wf)));
        ProfileTable { rows }
    }

    pub fn rows(&self) -> &[ProfileSample] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Mean utilities and revenue per profile
    pub fn means(&self) -> Vec<ProfileSample> {
        mean_by_profile(&self.rows)
    }

    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let rows = reader
            .deserialize()
            .collect::<std::result::Result<Vec<ProfileSample>, csv::Error>>()?;
        Ok(ProfileTable::new(rows))
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Average rows sharing a (num_WE, num_WF) key, ordered by ascending num_WE
pub fn mean_by_profile(rows: &[ProfileSample]) -> Vec<ProfileSample> {
    let mut groups: BTreeMap<(usize, usize), (ProfileSample, usize)> = BTreeMap::new();
    for row in rows {
        let entry = groups.entry((row.num_we, row.num_wf)).or_insert((
            ProfileSample {
                we: 0.0,
                wf: 0.0,
                revenue: 0.0,
                ..*row
            },
            0,
        ));
        entry.0.we += row.we;
        entry.0.wf += row.wf;
        entry.0.revenue += row.revenue;
        entry.1 += 1;
    }

    groups
        .into_values()
        .map(|(sum, count)| {
            let count = count as f64;
            ProfileSample {
                we: sum.we / count,
                wf: sum.wf / count,
                revenue: sum.revenue / count,
                ..sum
            }
        })
        .collect()
}

/// Sample `samples_per_profile` games for every profile of `config`
///
/// Job `j` plays profile `j / samples_per_profile` with seed
/// `base_seed + j`, so results do not depend on the thread count. Failed
/// games are logged and left out of the table.
pub fn estimate_profiles<S>(
    config: &GameConfig,
    base_seed: u64,
    samples_per_profile: usize,
    num_threads: Option<usize>,
    solver: &S,
) -> Result<ProfileTable>
where
    S: LpSolver + Sync + ?Sized,
{
    let n = config.params().n;
    let total = samples_per_profile * (n + 1);
    info!(profiles = n + 1, samples_per_profile, total, "estimating profiles");

    let job = |job_id: usize| {
        let num_we = job_id / samples_per_profile;
        let mut rng = StdRng::seed_from_u64(base_seed + job_id as u64);
        play_game(config, num_we, n - num_we, &mut rng, solver).map(|game| game.sample())
    };

    let mut runner = ParallelRunner::new(total, job)
        .batch_size(SAMPLE_BATCH_SIZE)
        .progress(logging_progress_reporter((total / 10).max(1)));
    if let Some(threads) = num_threads {
        runner = runner.num_threads(threads);
    }

    let mut rows = Vec::with_capacity(total);
    let mut failed = 0;
    for result in runner.run()? {
        match result {
            Ok(sample) => rows.push(sample),
            Err(failure) => {
                failed += 1;
                match &failure {
                    JobFailure::Failed { job_id, error } => {
                        warn!(job_id, %error, "sample failed, skipped")
                    }
                    JobFailure::Panicked { job_id, message } => {
                        warn!(job_id, %message, "sample panicked, skipped")
                    }
                }
            }
        }
    }

    if rows.is_empty() {
        return Err(Error::EmptyProfileTable);
    }
    if failed > 0 {
        warn!(failed, total, "some samples were skipped");
    }
    Ok(ProfileTable::new(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameParams;
    use crate::lp::MiniLpSolver;
    use approx::assert_relative_eq;

    fn sample(num_we: usize, num_wf: usize, we: f64, wf: f64, revenue: f64) -> ProfileSample {
        ProfileSample {
            num_we,
            num_wf,
            we,
            wf,
            revenue,
        }
    }

    #[test]
    fn test_rows_sorted_by_profile() {
        let table = ProfileTable::new(vec![
            sample(2, 0, 1.0, 0.0, 1.0),
            sample(0, 2, 0.0, 1.0, 1.0),
            sample(1, 1, 1.0, 1.0, 1.0),
        ]);
        let keys: Vec<_> = table.rows().iter().map(|r| (r.num_we, r.num_wf)).collect();
        assert_eq!(keys, vec![(0, 2), (1, 1), (2, 0)]);
    }

    #[test]
    fn test_means_per_profile() {
        let table = ProfileTable::new(vec![
            sample(0, 1, 0.0, 2.0, 4.0),
            sample(0, 1, 0.0, 4.0, 6.0),
            sample(1, 0, 3.0, 0.0, 1.0),
        ]);
        let means = table.means();
        assert_eq!(means.len(), 2);
        assert_relative_eq!(means[0].wf, 3.0);
        assert_relative_eq!(means[0].revenue, 5.0);
        assert_eq!((means[1].num_we, means[1].num_wf), (1, 0));
        assert_relative_eq!(means[1].we, 3.0);
    }

    #[test]
    fn test_csv_header_and_roundtrip() {
        let dir = std::env::temp_dir().join(format!("adx_profiles_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("results.csv");

        let table = ProfileTable::new(vec![sample(0, 2, 0.0, 1.5, 2.25), sample(2, 0, 1.0, 0.0, 3.0)]);
        table.write_csv(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("num_WE,num_WF,we,wf,revenue"));
        assert_eq!(ProfileTable::read_csv(&path).unwrap(), table);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_estimate_profiles_covers_every_profile() {
        let mut params = GameParams::baseline();
        params.k = 100;
        params.n = 2;
        let config = crate::config::GameConfig::baseline()
            .unwrap()
            .with_params(params)
            .unwrap();

        let table = estimate_profiles(&config, 42, 3, Some(2), &MiniLpSolver).unwrap();
        assert_eq!(table.len(), 9);
        let means = table.means();
        let keys: Vec<_> = means.iter().map(|r| (r.num_we, r.num_wf)).collect();
        assert_eq!(keys, vec![(0, 2), (1, 1), (2, 0)]);
    }

    struct RejectingSolver;

    impl LpSolver for RejectingSolver {
        fn maximize(&self, _program: &crate::lp::LinearProgram) -> Result<Vec<f64>> {
            Err(Error::PricingInfeasible)
        }
    }

    struct PanickingSolver;

    impl LpSolver for PanickingSolver {
        fn maximize(&self, _program: &crate::lp::LinearProgram) -> Result<Vec<f64>> {
            panic!("solver crashed")
        }
    }

    #[test]
    fn test_failed_and_panicked_samples_are_skipped() {
        let mut params = GameParams::baseline();
        params.k = 20;
        params.n = 1;
        let config = crate::config::GameConfig::baseline()
            .unwrap()
            .with_params(params)
            .unwrap();

        // Every game prices a WE allocation, so every sample fails
        assert!(matches!(
            estimate_profiles(&config, 1, 2, Some(2), &RejectingSolver),
            Err(Error::EmptyProfileTable)
        ));
        assert!(matches!(
            estimate_profiles(&config, 1, 2, None, &PanickingSolver),
            Err(Error::EmptyProfileTable)
        ));
    }

    #[test]
    fn test_estimation_independent_of_threads() {
        let mut params = GameParams::baseline();
        params.k = 50;
        params.n = 2;
        let config = crate::config::GameConfig::baseline()
            .unwrap()
            .with_params(params)
            .unwrap();

        let one = estimate_profiles(&config, 7, 2, Some(1), &MiniLpSolver).unwrap();
        let four = estimate_profiles(&config, 7, 2, Some(4), &MiniLpSolver).unwrap();
        assert_eq!(one, four);
    }
}
