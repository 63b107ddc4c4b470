use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::{
    Country, Dimension, EmissionRecord, Gas, JoinedEmission, Sector, Subsector, TimePoint,
};

/// Label given to an unresolved country, sector or gas under
/// [`JoinPolicy::UnknownBucket`].
pub const UNKNOWN: &str = "UNKNOWN";

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum WarehouseError {
    #[error("duplicate {dimension} id {id}")]
    DuplicateDimensionKey { dimension: Dimension, id: i32 },
    #[error("duplicate emission record id {0}")]
    DuplicateRecord(i32),
}

/// How fact rows with dangling dimension references are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinPolicy {
    /// Drop the fact from every report, as an inner join would, and record
    /// why in [`JoinOutcome::excluded`].
    #[default]
    Inner,
    /// Keep the fact under an [`UNKNOWN`] label. Facts with an unresolved
    /// start or end time are still excluded since no period can be derived.
    UnknownBucket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingDimension {
    pub dimension: Dimension,
    pub id: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludedFact {
    pub record_id: i32,
    pub missing: Vec<MissingDimension>,
}

/// One dangling reference of an excluded fact, flattened for tabular output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingReference {
    pub record_id: i32,
    pub dimension: Dimension,
    pub dimension_id: i32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinOutcome {
    pub rows: Vec<JoinedEmission>,
    pub excluded: Vec<ExcludedFact>,
}

impl JoinOutcome {
    pub fn missing_references(&self) -> Vec<MissingReference> {
        self.excluded
            .iter()
            .flat_map(|fact| {
                fact.missing.iter().map(move |m| MissingReference {
                    record_id: fact.record_id,
                    dimension: m.dimension,
                    dimension_id: m.id,
                })
            })
            .collect()
    }

    /// Content hash of the joined rows, in row order.
    pub fn fingerprint(&self) -> String {
        let mut h = blake3::Hasher::new();
        for row in &self.rows {
            h.update(&row.record_id.to_le_bytes());
            hash_str(&mut h, &row.country);
            hash_str(&mut h, &row.start_time.to_string());
            hash_str(&mut h, &row.end_time.to_string());
            hash_str(&mut h, &row.sector);
            match &row.subsector {
                Some(s) => {
                    h.update(&[1]);
                    hash_str(&mut h, s);
                }
                None => {
                    h.update(&[0]);
                }
            }
            hash_str(&mut h, &row.gas);
            h.update(&row.quantity.to_bits().to_le_bytes());
        }
        h.finalize().to_hex().to_string()
    }
}

fn hash_str(hasher: &mut blake3::Hasher, s: &str) {
    let len = s.len() as u32;
    hasher.update(&len.to_le_bytes());
    hasher.update(s.as_bytes());
}

/// In-memory star schema: six dimension lookups and the emission fact table.
#[derive(Debug, Clone, Default)]
pub struct Warehouse {
    countries: HashMap<i32, Country>,
    start_times: HashMap<i32, TimePoint>,
    end_times: HashMap<i32, TimePoint>,
    gases: HashMap<i32, Gas>,
    sectors: HashMap<i32, Sector>,
    subsectors: HashMap<i32, Subsector>,
    emissions: Vec<EmissionRecord>,
    emission_ids: HashSet<i32>,
}

fn insert_unique<T>(
    table: &mut HashMap<i32, T>,
    dimension: Dimension,
    id: i32,
    row: T,
) -> Result<(), WarehouseError> {
    if table.contains_key(&id) {
        return Err(WarehouseError::DuplicateDimensionKey { dimension, id });
    }
    table.insert(id, row);
    Ok(())
}

impl Warehouse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_country(&mut self, country: Country) -> Result<(), WarehouseError> {
        insert_unique(&mut self.countries, Dimension::Country, country.id, country)
    }

    pub fn add_start_time(&mut self, point: TimePoint) -> Result<(), WarehouseError> {
        insert_unique(&mut self.start_times, Dimension::StartTime, point.id, point)
    }

    pub fn add_end_time(&mut self, point: TimePoint) -> Result<(), WarehouseError> {
        insert_unique(&mut self.end_times, Dimension::EndTime, point.id, point)
    }

    pub fn add_gas(&mut self, gas: Gas) -> Result<(), WarehouseError> {
        insert_unique(&mut self.gases, Dimension::Gas, gas.id, gas)
    }

    pub fn add_sector(&mut self, sector: Sector) -> Result<(), WarehouseError> {
        insert_unique(&mut self.sectors, Dimension::Sector, sector.id, sector)
    }

    pub fn add_subsector(&mut self, subsector: Subsector) -> Result<(), WarehouseError> {
        insert_unique(&mut self.subsectors, Dimension::Subsector, subsector.id, subsector)
    }

    pub fn add_emission(&mut self, record: EmissionRecord) -> Result<(), WarehouseError> {
        if !self.emission_ids.insert(record.id) {
            return Err(WarehouseError::DuplicateRecord(record.id));
        }
        self.emissions.push(record);
        Ok(())
    }

    pub fn emissions(&self) -> &[EmissionRecord] {
        &self.emissions
    }

    /// Row count per dimension table.
    pub fn dimension_sizes(&self) -> Vec<(Dimension, usize)> {
        Dimension::ALL
            .iter()
            .map(|d| {
                let len = match d {
                    Dimension::Country => self.countries.len(),
                    Dimension::StartTime => self.start_times.len(),
                    Dimension::EndTime => self.end_times.len(),
                    Dimension::Gas => self.gases.len(),
                    Dimension::Sector => self.sectors.len(),
                    Dimension::Subsector => self.subsectors.len(),
                };
                (*d, len)
            })
            .collect()
    }

    /// Resolve every fact against the dimensions, in load order.
    ///
    /// Subsector is looked up when referenced but never causes exclusion.
    pub fn join(&self, policy: JoinPolicy) -> JoinOutcome {
        let mut outcome = JoinOutcome {
            rows: Vec::with_capacity(self.emissions.len()),
            excluded: Vec::new(),
        };

        for record in &self.emissions {
            let mut missing = Vec::new();
            let mut lookup = |found: bool, dimension: Dimension, id: i32| {
                if !found {
                    missing.push(MissingDimension { dimension, id });
                }
            };

            let country = self.countries.get(&record.country_id);
            lookup(country.is_some(), Dimension::Country, record.country_id);
            let start = self.start_times.get(&record.start_time_id);
            lookup(start.is_some(), Dimension::StartTime, record.start_time_id);
            let end = self.end_times.get(&record.end_time_id);
            lookup(end.is_some(), Dimension::EndTime, record.end_time_id);
            let sector = self.sectors.get(&record.sector_id);
            lookup(sector.is_some(), Dimension::Sector, record.sector_id);
            let gas = self.gases.get(&record.gas_id);
            lookup(gas.is_some(), Dimension::Gas, record.gas_id);

            let joinable = match policy {
                JoinPolicy::Inner => missing.is_empty(),
                JoinPolicy::UnknownBucket => start.is_some() && end.is_some(),
            };

            let (Some(start), Some(end), true) = (start, end, joinable) else {
                tracing::debug!(record_id = record.id, ?missing, "emission record excluded from join");
                outcome.excluded.push(ExcludedFact {
                    record_id: record.id,
                    missing,
                });
                continue;
            };

            if !missing.is_empty() {
                tracing::debug!(record_id = record.id, ?missing, "emission record bucketed as unknown");
            }

            let label = |name: Option<&String>| name.cloned().unwrap_or_else(|| UNKNOWN.to_string());

            outcome.rows.push(JoinedEmission {
                record_id: record.id,
                country: label(country.map(|c| &c.iso_code)),
                start_time: start.date,
                end_time: end.date,
                sector: label(sector.map(|s| &s.name)),
                subsector: record
                    .subsector_id
                    .and_then(|id| self.subsectors.get(&id))
                    .map(|s| s.name.clone()),
                gas: label(gas.map(|g| &g.name)),
                quantity: record.quantity.unwrap_or(0.0),
            });
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn seeded() -> Warehouse {
        let mut w = Warehouse::new();
        w.add_country(Country { id: 1, iso_code: "ABW".to_string() }).unwrap();
        w.add_start_time(TimePoint { id: 1, date: date!(2015 - 01 - 01) }).unwrap();
        w.add_end_time(TimePoint { id: 1, date: date!(2015 - 12 - 31) }).unwrap();
        w.add_gas(Gas { id: 1, name: "co2".to_string() }).unwrap();
        w.add_sector(Sector { id: 1, name: "agriculture".to_string() }).unwrap();
        w.add_subsector(Subsector { id: 1, name: "rice-cultivation".to_string() }).unwrap();
        w
    }

    fn record(id: i32, country_id: i32, sector_id: i32, quantity: Option<f64>) -> EmissionRecord {
        EmissionRecord {
            id,
            country_id,
            start_time_id: 1,
            end_time_id: 1,
            sector_id,
            subsector_id: Some(1),
            gas_id: 1,
            quantity,
        }
    }

    #[test]
    fn duplicate_dimension_id_is_rejected() {
        let mut w = seeded();
        let err = w
            .add_country(Country { id: 1, iso_code: "NLD".to_string() })
            .unwrap_err();
        assert_eq!(
            err,
            WarehouseError::DuplicateDimensionKey { dimension: Dimension::Country, id: 1 }
        );
    }

    #[test]
    fn duplicate_record_id_is_rejected() {
        let mut w = seeded();
        w.add_emission(record(7, 1, 1, Some(1.0))).unwrap();
        assert_eq!(
            w.add_emission(record(7, 1, 1, Some(2.0))),
            Err(WarehouseError::DuplicateRecord(7))
        );
    }

    #[test]
    fn inner_join_excludes_and_names_dangling_references() {
        let mut w = seeded();
        w.add_emission(record(1, 1, 1, Some(5.0))).unwrap();
        w.add_emission(record(2, 99, 42, Some(3.0))).unwrap();

        let outcome = w.join(JoinPolicy::Inner);
        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.rows[0].record_id, 1);
        assert_eq!(
            outcome.excluded,
            vec![ExcludedFact {
                record_id: 2,
                missing: vec![
                    MissingDimension { dimension: Dimension::Country, id: 99 },
                    MissingDimension { dimension: Dimension::Sector, id: 42 },
                ],
            }]
        );
        assert_eq!(outcome.missing_references().len(), 2);
    }

    #[test]
    fn unknown_bucket_keeps_facts_with_resolvable_dates() {
        let mut w = seeded();
        w.add_emission(record(1, 99, 1, Some(5.0))).unwrap();
        let mut no_dates = record(2, 1, 1, Some(1.0));
        no_dates.start_time_id = 9;
        w.add_emission(no_dates).unwrap();

        let outcome = w.join(JoinPolicy::UnknownBucket);
        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.rows[0].country, UNKNOWN);
        assert_eq!(outcome.rows[0].sector, "agriculture");
        assert_eq!(outcome.excluded.len(), 1);
        assert_eq!(outcome.excluded[0].record_id, 2);
    }

    #[test]
    fn null_quantity_coalesces_to_zero() {
        let mut w = seeded();
        w.add_emission(record(1, 1, 1, None)).unwrap();
        let outcome = w.join(JoinPolicy::Inner);
        assert_eq!(outcome.rows[0].quantity, 0.0);
        assert_eq!(outcome.rows[0].subsector.as_deref(), Some("rice-cultivation"));
    }

    #[test]
    fn missing_subsector_never_excludes() {
        let mut w = seeded();
        let mut r = record(1, 1, 1, Some(2.0));
        r.subsector_id = Some(55);
        w.add_emission(r).unwrap();
        let outcome = w.join(JoinPolicy::Inner);
        assert_eq!(outcome.rows.len(), 1);
        assert!(outcome.rows[0].subsector.is_none());
    }

    #[test]
    fn fingerprint_tracks_row_content() {
        let mut w = seeded();
        w.add_emission(record(1, 1, 1, Some(5.0))).unwrap();
        let a = w.join(JoinPolicy::Inner).fingerprint();
        let b = w.join(JoinPolicy::Inner).fingerprint();
        assert_eq!(a, b);

        let mut w2 = seeded();
        w2.add_emission(record(1, 1, 1, Some(6.0))).unwrap();
        assert_ne!(a, w2.join(JoinPolicy::Inner).fingerprint());
    }
}
