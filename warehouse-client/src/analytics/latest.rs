use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::Date;

use super::{
    window::{partition_by, sum_by},
    AnalyticsError,
};
use crate::domain::JoinedEmission;

/// How a period's total compares with the final period of its partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    More,
    Less,
    Latest,
}

impl Comparison {
    fn between(total: f64, latest: f64) -> Self {
        if total > latest {
            Comparison::More
        } else if total < latest {
            Comparison::Less
        } else {
            Comparison::Latest
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Comparison::More => "More",
            Comparison::Less => "Less",
            Comparison::Latest => "Latest",
        })
    }
}

impl FromStr for Comparison {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "More" => Ok(Comparison::More),
            "Less" => Ok(Comparison::Less),
            "Latest" => Ok(Comparison::Latest),
            other => Err(AnalyticsError::UnknownComparison(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestComparison {
    pub country: String,
    pub gas: String,
    pub end_time: Date,
    pub total_quantity: f64,
    pub latest_quantity: f64,
    pub comparison: Comparison,
}

/// Compare each (country, gas, end time) total with the total at the last
/// end time of its (country, gas) partition.
///
/// The anchor is taken before filtering, so a partition whose final period
/// sums to zero still compares against zero. Rows whose own total is zero are
/// left out of the output.
pub fn latest_comparison(rows: &[JoinedEmission]) -> Vec<LatestComparison> {
    let totals = sum_by(
        rows,
        |r| (r.country.clone(), r.gas.clone(), r.end_time),
        |r| r.quantity,
    );
    let partitions = partition_by(totals, |((country, gas, _), _)| (country.clone(), gas.clone()));

    let mut out = Vec::new();
    for ((country, gas), periods) in partitions {
        // Partitions inherit end-time order from the sorted totals.
        let Some(&(_, latest_quantity)) = periods.last() else {
            continue;
        };
        for ((_, _, end_time), total_quantity) in periods {
            if total_quantity == 0.0 {
                continue;
            }
            out.push(LatestComparison {
                country: country.clone(),
                gas: gas.clone(),
                end_time,
                total_quantity,
                latest_quantity,
                comparison: Comparison::between(total_quantity, latest_quantity),
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn row(country: &str, gas: &str, end_time: Date, quantity: f64) -> JoinedEmission {
        JoinedEmission {
            record_id: 0,
            country: country.to_string(),
            start_time: date!(2015 - 01 - 01),
            end_time,
            sector: "power".to_string(),
            subsector: None,
            gas: gas.to_string(),
            quantity,
        }
    }

    #[test]
    fn labels_relative_to_final_period() {
        let rows = vec![
            row("ABW", "co2", date!(2017 - 12 - 31), 4.0),
            row("ABW", "co2", date!(2015 - 12 - 31), 6.0),
            row("ABW", "co2", date!(2016 - 12 - 31), 2.0),
            row("ABW", "co2", date!(2016 - 12 - 31), 2.0),
            row("ABW", "co2", date!(2016 - 12 - 31), -1.0),
        ];
        let out = latest_comparison(&rows);
        let labels: Vec<_> = out.iter().map(|r| (r.end_time.year(), r.comparison)).collect();
        assert_eq!(
            labels,
            vec![
                (2015, Comparison::More),
                (2016, Comparison::Less),
                (2017, Comparison::Latest),
            ]
        );
        assert!(out.iter().all(|r| r.latest_quantity == 4.0));
    }

    #[test]
    fn final_row_of_every_partition_is_latest() {
        let rows = vec![
            row("ABW", "co2", date!(2015 - 12 - 31), 1.0),
            row("ABW", "ch4", date!(2016 - 12 - 31), 9.0),
            row("ABW", "ch4", date!(2015 - 12 - 31), 3.0),
            row("NLD", "co2", date!(2018 - 12 - 31), 7.0),
        ];
        let out = latest_comparison(&rows);
        let parts = partition_by(out, |r| (r.country.clone(), r.gas.clone()));
        for (_, part) in parts {
            let last = part.iter().max_by_key(|r| r.end_time).unwrap();
            assert_eq!(last.comparison, Comparison::Latest);
        }
    }

    #[test]
    fn zero_totals_are_filtered_but_still_anchor() {
        let rows = vec![
            row("ABW", "co2", date!(2015 - 12 - 31), 3.0),
            row("ABW", "co2", date!(2016 - 12 - 31), 0.0),
        ];
        let out = latest_comparison(&rows);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].latest_quantity, 0.0);
        assert_eq!(out[0].comparison, Comparison::More);
    }

    #[test]
    fn comparison_parses_its_own_display() {
        for c in [Comparison::More, Comparison::Less, Comparison::Latest] {
            assert_eq!(c.to_string().parse::<Comparison>().unwrap(), c);
        }
        assert!("Equal".parse::<Comparison>().is_err());
    }
}
