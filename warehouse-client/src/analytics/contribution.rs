use serde::{Deserialize, Serialize};

use super::window::{peer_running_sums, sum_by};
use crate::domain::JoinedEmission;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SectorContribution {
    pub sector: String,
    pub total_quantity: f64,
    pub cumulative_quantity: f64,
    /// `None` when the grand total is zero.
    pub cumulative_fraction: Option<f64>,
}

/// Cumulative share of the grand total, walking sectors from largest to
/// smallest. Sectors with equal totals are peers and share a cumulative sum.
pub fn sector_contribution(rows: &[JoinedEmission]) -> Vec<SectorContribution> {
    let mut totals: Vec<(String, f64)> = sum_by(rows, |r| r.sector.clone(), |r| r.quantity)
        .into_iter()
        .collect();
    totals.sort_by(|a, b| b.1.total_cmp(&a.1));

    let values: Vec<f64> = totals.iter().map(|(_, total)| *total).collect();
    let grand_total: f64 = values.iter().sum();
    let cumulative = peer_running_sums(&values);

    totals
        .into_iter()
        .zip(cumulative)
        .map(|((sector, total_quantity), cumulative_quantity)| SectorContribution {
            sector,
            total_quantity,
            cumulative_quantity,
            cumulative_fraction: (grand_total != 0.0).then(|| cumulative_quantity / grand_total),
        })
        .collect()
}
