//! Equilibrium revenue files and run summaries
//!
//! The equilibrium file is plain text:
//! line 1 holds the aggregated revenue, then one line of comma-joined node
//! names per family member, one line of comma-joined revenues per member,
//! and one line per member with its inner reduced value.

use crate::config::{GameConfig, GameParams};
use crate::equilibrium::{Aggregator, EquilibriumFamilies, EquilibriumKind};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct EquilibriumReport {
    pub value: f64,
    pub members: Vec<Vec<String>>,
    pub revenues: Vec<Vec<f64>>,
    pub member_values: Vec<f64>,
}

impl EquilibriumReport {
    /// Aggregate a family into a report
    pub fn new(families: &EquilibriumFamilies, aggregator: Aggregator) -> Result<Self> {
        let (value, member_values) = aggregator.aggregate(&families.revenues)?;
        Ok(EquilibriumReport {
            value,
            members: families.members.clone(),
            revenues: families.revenues.clone(),
            member_values,
        })
    }

    pub fn num_members(&self) -> usize {
        self.members.len()
    }

    pub fn to_text(&self) -> String {
        let mut lines = Vec::with_capacity(1 + 3 * self.members.len());
        lines.push(self.value.to_string());
        lines.extend(self.members.iter().map(|m| m.join(",")));
        lines.extend(self.revenues.iter().map(|r| join_values(r)));
        lines.extend(self.member_values.iter().map(|v| v.to_string()));
        let mut text = lines.join("\n");
        text.push('\n');
        text
    }

    pub fn parse(text: &str) -> Result<Self> {
        let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
        let (first, rest) = lines
            .split_first()
            .ok_or_else(|| Error::MalformedReport("empty file".into()))?;
        if rest.len() % 3 != 0 {
            return Err(Error::MalformedReport(format!(
                "{} lines after the aggregate, expected a multiple of 3",
                rest.len()
            )));
        }
        let m = rest.len() / 3;

        let value = parse_value(first)?;
        let members = rest[..m]
            .iter()
            .map(|line| line.split(',').map(|s| s.trim().to_string()).collect())
            .collect();
        let revenues = rest[m..2 * m]
            .iter()
            .map(|line| line.split(',').map(parse_value).collect::<Result<Vec<f64>>>())
            .collect::<Result<Vec<_>>>()?;
        let member_values = rest[2 * m..]
            .iter()
            .map(|line| parse_value(line))
            .collect::<Result<Vec<f64>>>()?;

        Ok(EquilibriumReport {
            value,
            members,
            revenues,
            member_values,
        })
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_text())?;
        Ok(())
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        EquilibriumReport::parse(&fs::read_to_string(path)?)
    }
}

/// Aggregated revenue from the first line of an equilibrium file
pub fn read_revenue<P: AsRef<Path>>(path: P) -> Result<f64> {
    let text = fs::read_to_string(path)?;
    let first = text
        .lines()
        .next()
        .ok_or_else(|| Error::MalformedReport("empty file".into()))?;
    parse_value(first)
}

fn join_values(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn parse_value(s: &str) -> Result<f64> {
    s.trim()
        .parse()
        .map_err(|_| Error::MalformedReport(format!("not a number: '{}'", s.trim())))
}

/// Summary of one estimation run for reproducibility
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub experiment: String,
    pub base_seed: u64,
    pub timestamp: String,
    pub params: GameParams,
    pub reserve_prices: Vec<(String, f64)>,
    pub samples_per_profile: usize,
    pub num_samples: usize,
    pub equilibria: Vec<EquilibriumSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquilibriumSummary {
    pub kind: EquilibriumKind,
    pub aggregator: String,
    pub revenue: f64,
    pub members: Vec<Vec<String>>,
    pub member_values: Vec<f64>,
}

impl EquilibriumSummary {
    pub fn new(kind: EquilibriumKind, aggregator: Aggregator, report: &EquilibriumReport) -> Self {
        EquilibriumSummary {
            kind,
            aggregator: aggregator.to_string(),
            revenue: report.value,
            members: report.members.clone(),
            member_values: report.member_values.clone(),
        }
    }
}

impl RunSummary {
    pub fn new(
        experiment: &str,
        base_seed: u64,
        config: &GameConfig,
        samples_per_profile: usize,
        num_samples: usize,
    ) -> Self {
        RunSummary {
            experiment: experiment.to_string(),
            base_seed,
            timestamp: chrono::Utc::now().to_rfc3339(),
            params: config.params().clone(),
            reserve_prices: config.reserve_prices(),
            samples_per_profile,
            num_samples,
            equilibria: Vec::new(),
        }
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
