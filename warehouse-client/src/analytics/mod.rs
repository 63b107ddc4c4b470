//! Reports over joined emission rows.
//!
//! Each report is a pure function of the joined rows. [`ReportSet`] runs all
//! of them against one [`JoinOutcome`].

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::domain::{JoinOutcome, MissingReference};

pub mod contribution;
pub mod cube;
pub mod latest;
pub mod moving_average;
pub mod ranking;
pub mod window;

pub use contribution::{sector_contribution, SectorContribution};
pub use cube::{cube, CubeRow, ALL};
pub use latest::{latest_comparison, Comparison, LatestComparison};
pub use moving_average::{moving_average, MovingAverage};
pub use ranking::{country_rank, CountryRank, RankMethod};

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum AnalyticsError {
    #[error("moving average window must be at least 1, got {0}")]
    InvalidWindow(usize),
    #[error("unknown report '{0}'")]
    UnknownReport(String),
    #[error("unknown comparison label '{0}'")]
    UnknownComparison(String),
    #[error("moving average window {0} was not computed")]
    WindowNotComputed(usize),
}

fn default_windows() -> Vec<usize> {
    vec![3, 5]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportOptions {
    #[serde(default)]
    pub rank_method: RankMethod,
    #[serde(default = "default_windows")]
    pub moving_average_windows: Vec<usize>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            rank_method: RankMethod::default(),
            moving_average_windows: default_windows(),
        }
    }
}

/// A single report, as named on the command line and over HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Cube,
    CountryRank,
    LatestComparison,
    MovingAverage(usize),
    SectorContribution,
    Exclusions,
}

impl FromStr for ReportKind {
    type Err = AnalyticsError;

    /// Accepts `cube`, `country_rank`, `latest_comparison`,
    /// `moving_average_<N>`, `sector_contribution` and `exclusions`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cube" => Ok(ReportKind::Cube),
            "country_rank" => Ok(ReportKind::CountryRank),
            "latest_comparison" => Ok(ReportKind::LatestComparison),
            "sector_contribution" => Ok(ReportKind::SectorContribution),
            "exclusions" => Ok(ReportKind::Exclusions),
            other => other
                .strip_prefix("moving_average_")
                .and_then(|n| n.parse().ok())
                .map(ReportKind::MovingAverage)
                .ok_or_else(|| AnalyticsError::UnknownReport(other.to_string())),
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportKind::Cube => f.write_str("cube"),
            ReportKind::CountryRank => f.write_str("country_rank"),
            ReportKind::LatestComparison => f.write_str("latest_comparison"),
            ReportKind::MovingAverage(n) => write!(f, "moving_average_{n}"),
            ReportKind::SectorContribution => f.write_str("sector_contribution"),
            ReportKind::Exclusions => f.write_str("exclusions"),
        }
    }
}

/// Every report computed from one join of the warehouse.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSet {
    /// blake3 of the joined rows the reports were computed from.
    pub fingerprint: String,
    pub joined_rows: usize,
    pub cube: Vec<CubeRow>,
    pub country_rank: Vec<CountryRank>,
    pub latest_comparison: Vec<LatestComparison>,
    pub moving_averages: BTreeMap<usize, Vec<MovingAverage>>,
    pub sector_contribution: Vec<SectorContribution>,
    pub exclusions: Vec<MissingReference>,
}

impl ReportSet {
    pub fn compute(outcome: &JoinOutcome, options: &ReportOptions) -> Result<Self, AnalyticsError> {
        let rows = &outcome.rows;
        let mut moving_averages = BTreeMap::new();
        for &window in &options.moving_average_windows {
            moving_averages.insert(window, moving_average(rows, window)?);
        }

        Ok(Self {
            fingerprint: outcome.fingerprint(),
            joined_rows: rows.len(),
            cube: cube(rows),
            country_rank: country_rank(rows, options.rank_method),
            latest_comparison: latest_comparison(rows),
            moving_averages,
            sector_contribution: sector_contribution(rows),
            exclusions: outcome.missing_references(),
        })
    }

    /// Names of the reports held by this set.
    pub fn kinds(&self) -> Vec<ReportKind> {
        let mut kinds = vec![
            ReportKind::Cube,
            ReportKind::CountryRank,
            ReportKind::LatestComparison,
        ];
        kinds.extend(self.moving_averages.keys().map(|&n| ReportKind::MovingAverage(n)));
        kinds.push(ReportKind::SectorContribution);
        kinds.push(ReportKind::Exclusions);
        kinds
    }

    pub fn moving_average(&self, window: usize) -> Result<&[MovingAverage], AnalyticsError> {
        self.moving_averages
            .get(&window)
            .map(Vec::as_slice)
            .ok_or(AnalyticsError::WindowNotComputed(window))
    }
}
