use serde::{Deserialize, Serialize};

use super::window::{competition_ranks, dense_ranks, sum_by};
use crate::domain::JoinedEmission;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankMethod {
    /// Ties share a rank and the next rank skips (1, 1, 3).
    #[default]
    Competition,
    /// Ties share a rank and the next rank follows on (1, 1, 2).
    Dense,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CountryRank {
    pub country: String,
    pub total_quantity: f64,
    pub rank: i64,
}

/// Rank countries by total quantity, highest first.
///
/// Countries with equal totals share a rank and are listed by country code.
pub fn country_rank(rows: &[JoinedEmission], method: RankMethod) -> Vec<CountryRank> {
    let mut totals: Vec<(String, f64)> = sum_by(rows, |r| r.country.clone(), |r| r.quantity)
        .into_iter()
        .collect();
    // Stable sort keeps the ascending country order among ties.
    totals.sort_by(|a, b| b.1.total_cmp(&a.1));

    let values: Vec<f64> = totals.iter().map(|(_, total)| *total).collect();
    let ranks = match method {
        RankMethod::Competition => competition_ranks(&values),
        RankMethod::Dense => dense_ranks(&values),
    };

    totals
        .into_iter()
        .zip(ranks)
        .map(|((country, total_quantity), rank)| CountryRank {
            country,
            total_quantity,
            rank,
        })
        .collect()
}
