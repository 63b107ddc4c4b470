use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::JoinedEmission;

/// Label written in place of a dimension that was rolled up.
pub const ALL: &str = "ALL";

const DIMENSIONS: usize = 3;

/// One cell of the (country, sector, gas) cube.
///
/// `grouping_id` has a bit set for every rolled-up dimension, country being
/// the most significant, so the grand total carries `0b111`. It tells a real
/// value spelled `ALL` apart from the sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CubeRow {
    pub country: String,
    pub sector: String,
    pub gas: String,
    pub total_quantity: f64,
    pub record_count: i64,
    pub grouping_id: i32,
}

impl CubeRow {
    pub fn is_grand_total(&self) -> bool {
        self.grouping_id == (1 << DIMENSIONS) - 1
    }
}

/// Sum and count over every subset of {country, sector, gas}.
///
/// Rows come out ordered by (country, sector, gas) in byte order, with the
/// grouping id breaking ties. The grand total is present even for empty
/// input.
pub fn cube(rows: &[JoinedEmission]) -> Vec<CubeRow> {
    let mut cells: BTreeMap<([String; DIMENSIONS], i32), (f64, i64)> = BTreeMap::new();
    let grand_total_mask = (1 << DIMENSIONS) - 1;
    cells.insert(([ALL.to_string(), ALL.to_string(), ALL.to_string()], grand_total_mask), (0.0, 0));

    for row in rows {
        let values = [row.country.as_str(), row.sector.as_str(), row.gas.as_str()];
        // Bit i of `mask` keeps values[i]; the rest roll up to ALL.
        for mask in 0..(1u32 << DIMENSIONS) {
            let mut grouping_id = 0;
            let key: [String; DIMENSIONS] = std::array::from_fn(|i| {
                if mask & (1 << i) != 0 {
                    values[i].to_string()
                } else {
                    ALL.to_string()
                }
            });
            for i in 0..DIMENSIONS {
                if mask & (1 << i) == 0 {
                    grouping_id |= 1 << (DIMENSIONS - 1 - i);
                }
            }
            let cell = cells.entry((key, grouping_id)).or_insert((0.0, 0));
            cell.0 += row.quantity;
            cell.1 += 1;
        }
    }

    cells
        .into_iter()
        .map(|(([country, sector, gas], grouping_id), (total_quantity, record_count))| CubeRow {
            country,
            sector,
            gas,
            total_quantity,
            record_count,
            grouping_id,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn row(id: i32, country: &str, sector: &str, gas: &str, quantity: f64) -> JoinedEmission {
        JoinedEmission {
            record_id: id,
            country: country.to_string(),
            start_time: date!(2015 - 01 - 01),
            end_time: date!(2015 - 12 - 31),
            sector: sector.to_string(),
            subsector: None,
            gas: gas.to_string(),
            quantity,
        }
    }

    fn find<'a>(rows: &'a [CubeRow], c: &str, s: &str, g: &str) -> &'a CubeRow {
        rows.iter()
            .find(|r| r.country == c && r.sector == s && r.gas == g)
            .unwrap()
    }

    #[test]
    fn grouped_sum_for_country_and_sector() {
        let rows = vec![
            row(1, "ABW", "agriculture", "co2", 5.0),
            row(2, "ABW", "agriculture", "co2", 3.0),
        ];
        let out = cube(&rows);
        let cell = find(&out, "ABW", "agriculture", ALL);
        assert_eq!(cell.total_quantity, 8.0);
        assert_eq!(cell.record_count, 2);
    }

    #[test]
    fn every_subset_is_emitted_and_grand_total_matches() {
        let rows = vec![
            row(1, "ABW", "agriculture", "co2", 5.0),
            row(2, "NLD", "power", "ch4", 2.5),
            row(3, "NLD", "agriculture", "co2", 0.0),
        ];
        let out = cube(&rows);

        // 3 detail + 3 (country,sector) + 3 (country,gas) + 2 (sector,gas)
        // + 2 country + 2 sector + 2 gas + 1 grand total.
        assert_eq!(out.len(), 18);

        let grand = find(&out, ALL, ALL, ALL);
        assert!(grand.is_grand_total());
        assert_eq!(grand.total_quantity, 7.5);
        assert_eq!(grand.record_count, 3);

        for mask in 0..8 {
            let subset_total: f64 = out
                .iter()
                .filter(|r| r.grouping_id == mask)
                .map(|r| r.total_quantity)
                .sum();
            assert_eq!(subset_total, 7.5, "grouping set {mask:03b}");
        }
    }

    #[test]
    fn output_is_sorted_by_labels() {
        let rows = vec![
            row(1, "NLD", "power", "co2", 1.0),
            row(2, "ABW", "agriculture", "ch4", 1.0),
        ];
        let out = cube(&rows);
        let keys: Vec<_> = out
            .iter()
            .map(|r| (r.country.clone(), r.sector.clone(), r.gas.clone()))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(out[0].country, "ABW");
    }

    #[test]
    fn empty_input_still_has_grand_total() {
        let out = cube(&[]);
        assert_eq!(out.len(), 1);
        assert!(out[0].is_grand_total());
        assert_eq!(out[0].record_count, 0);
    }

    #[test]
    fn zero_quantity_rows_are_counted() {
        let out = cube(&[row(1, "ABW", "waste", "n2o", 0.0)]);
        assert_eq!(find(&out, "ABW", "waste", "n2o").record_count, 1);
    }
}
