use serde::{Deserialize, Serialize};

use super::{
    window::{partition_by, sum_by, trailing_means},
    AnalyticsError,
};
use crate::domain::JoinedEmission;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MovingAverage {
    pub country: String,
    pub sector: String,
    pub period: i32,
    pub total_quantity: f64,
    pub moving_average: f64,
}

/// Trailing mean of yearly (country, sector) totals over `window` periods.
///
/// The window counts rows, not calendar years: a partition with a gap in its
/// years still averages the `window` most recent rows.
pub fn moving_average(
    rows: &[JoinedEmission],
    window: usize,
) -> Result<Vec<MovingAverage>, AnalyticsError> {
    if window == 0 {
        return Err(AnalyticsError::InvalidWindow(window));
    }

    let totals = sum_by(
        rows,
        |r| (r.country.clone(), r.sector.clone(), r.period()),
        |r| r.quantity,
    );
    let partitions = partition_by(totals, |((country, sector, _), _)| {
        (country.clone(), sector.clone())
    });

    let mut out = Vec::new();
    for ((country, sector), periods) in partitions {
        let values: Vec<f64> = periods.iter().map(|(_, total)| *total).collect();
        let means = trailing_means(&values, window);
        for (((_, _, period), total_quantity), moving_average) in periods.into_iter().zip(means) {
            out.push(MovingAverage {
                country: country.clone(),
                sector: sector.clone(),
                period,
                total_quantity,
                moving_average,
            });
        }
    }
    Ok(out)
}
