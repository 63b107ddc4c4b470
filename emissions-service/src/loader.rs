use std::sync::Arc;

use warehouse_client::{
    db::Table,
    domain::{Country, Dimension, EmissionRecord, Gas, Sector, Subsector, Warehouse, WarehouseError},
    JoinPolicy, ReportSet,
};

use crate::{
    config::{AppConfig, WarehouseConfig},
    pipeline::{Pipeline, PipelineError},
    sinks::CollectSink,
    sources::{CsvFileSource, EndTimeRow, FromCsvRecord, StartTimeRow},
    transform::{Validate, Validation},
};

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),
    #[error("delimiter {0:?} must be a single ASCII character")]
    Delimiter(char),
}

fn delimiter_byte(delimiter: char) -> Result<u8, LoadError> {
    if delimiter.is_ascii() {
        Ok(delimiter as u8)
    } else {
        Err(LoadError::Delimiter(delimiter))
    }
}

/// Run one file through source, validation and collection.
async fn load_table<T>(cfg: &WarehouseConfig, table: Table, delimiter: u8) -> Result<Vec<T>, LoadError>
where
    T: FromCsvRecord + Validate,
{
    let path = cfg.path_for(table);
    let sink = CollectSink::new(table.name(), cfg.strict);
    let collected = sink.handle();

    let pipeline: Pipeline<_, T, _> = Pipeline {
        source: CsvFileSource::new(&path, delimiter),
        transforms: vec![Arc::new(Validation::<T>::default())],
        sink,
    };
    pipeline.run().await?;

    let mut collected = collected.lock().await;
    tracing::info!(
        table = table.name(),
        file = %path.display(),
        loaded = collected.rows.len(),
        rejected = collected.rejected,
        "table loaded"
    );
    Ok(std::mem::take(&mut collected.rows))
}

/// Load every dimension file and the fact file into a [`Warehouse`].
pub async fn load_warehouse(cfg: &WarehouseConfig) -> Result<Warehouse, LoadError> {
    let d = delimiter_byte(cfg.delimiter)?;

    let (countries, start_times, end_times, gases, sectors, subsectors, emissions) = tokio::try_join!(
        load_table::<Country>(cfg, Table::Dimension(Dimension::Country), d),
        load_table::<StartTimeRow>(cfg, Table::Dimension(Dimension::StartTime), d),
        load_table::<EndTimeRow>(cfg, Table::Dimension(Dimension::EndTime), d),
        load_table::<Gas>(cfg, Table::Dimension(Dimension::Gas), d),
        load_table::<Sector>(cfg, Table::Dimension(Dimension::Sector), d),
        load_table::<Subsector>(cfg, Table::Dimension(Dimension::Subsector), d),
        load_table::<EmissionRecord>(cfg, Table::Emissions, d),
    )?;

    let mut warehouse = Warehouse::new();
    for row in countries {
        warehouse.add_country(row)?;
    }
    for StartTimeRow(row) in start_times {
        warehouse.add_start_time(row)?;
    }
    for EndTimeRow(row) in end_times {
        warehouse.add_end_time(row)?;
    }
    for row in gases {
        warehouse.add_gas(row)?;
    }
    for row in sectors {
        warehouse.add_sector(row)?;
    }
    for row in subsectors {
        warehouse.add_subsector(row)?;
    }
    for row in emissions {
        warehouse.add_emission(row)?;
    }

    Ok(warehouse)
}

/// Load, join and compute every report as configured.
pub async fn build_report_set(cfg: &AppConfig) -> anyhow::Result<ReportSet> {
    let warehouse = load_warehouse(&cfg.warehouse).await?;
    for (dimension, rows) in warehouse.dimension_sizes() {
        tracing::debug!(%dimension, rows, "dimension size");
    }

    let outcome = warehouse.join(cfg.warehouse.join_policy);
    if !outcome.excluded.is_empty() {
        metrics::counter!("warehouse_facts_excluded_total").increment(outcome.excluded.len() as u64);
        let verb = match cfg.warehouse.join_policy {
            JoinPolicy::Inner => "inner join",
            JoinPolicy::UnknownBucket => "unresolved time dimension",
        };
        tracing::warn!(
            excluded = outcome.excluded.len(),
            reason = verb,
            "emission records left out of every report"
        );
    }

    let reports = ReportSet::compute(&outcome, &cfg.reports)?;
    tracing::info!(
        facts = warehouse.emissions().len(),
        joined = reports.joined_rows,
        fingerprint = %reports.fingerprint,
        "reports computed"
    );
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{fs, path::Path};
    use tempfile::TempDir;
    use warehouse_client::analytics::ALL;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    fn seed(dir: &Path, emissions: &str) {
        write(dir, "country.csv", "id,iso_code\n1,ABW\n2,NLD\n");
        write(dir, "start_time.csv", "id,start_time\n1,2015-01-01\n2,2016-01-01 00:00:00\n");
        write(dir, "end_time.csv", "id,end_time\n1,2015-12-31\n2,2016-12-31\n");
        write(dir, "gas.csv", "id,gas\n1,co2\n2,ch4\n");
        write(dir, "sector.csv", "id,sector\n1,agriculture\n2,power\n");
        write(dir, "subsector.csv", "id,subsector\n1,rice-cultivation\n");
        write(dir, "emissions.csv", emissions);
    }

    const HEADER: &str = "id,country_id,start_time_id,end_time_id,sector_id,subsector_id,gas_id,quantity\n";

    fn config(dir: &TempDir, strict: bool) -> AppConfig {
        let mut cfg = AppConfig::from_toml("").unwrap();
        cfg.warehouse.data_dir = dir.path().to_path_buf();
        cfg.warehouse.strict = strict;
        cfg
    }

    #[tokio::test]
    async fn end_to_end_grouped_sum() {
        let dir = TempDir::new().unwrap();
        seed(
            dir.path(),
            &format!("{HEADER}1,1,1,1,1,1,1,5\n2,1,1,1,1,,1,3\n3,2,2,2,2,,2,\n4,9,1,1,1,,1,100\n"),
        );

        let reports = build_report_set(&config(&dir, false)).await.unwrap();
        let cell = reports
            .cube
            .iter()
            .find(|r| r.country == "ABW" && r.sector == "agriculture" && r.gas == ALL)
            .unwrap();
        assert_eq!(cell.total_quantity, 8.0);

        let grand = reports.cube.iter().find(|r| r.is_grand_total()).unwrap();
        assert_eq!(grand.total_quantity, 8.0);
        assert_eq!(grand.record_count, 3);

        assert_eq!(reports.exclusions.len(), 1);
        assert_eq!(reports.exclusions[0].record_id, 4);
        assert_eq!(reports.exclusions[0].dimension, Dimension::Country);
    }

    #[tokio::test]
    async fn lenient_load_skips_bad_rows() {
        let dir = TempDir::new().unwrap();
        seed(dir.path(), &format!("{HEADER}1,1,1,1,1,,1,5\n2,1,1,1,1,,1,NaN\n3,x,1,1,1,,1,1\n"));

        let warehouse = load_warehouse(&config(&dir, false).warehouse).await.unwrap();
        assert_eq!(warehouse.emissions().len(), 1);
    }

    #[tokio::test]
    async fn strict_load_fails_on_bad_row() {
        let dir = TempDir::new().unwrap();
        seed(dir.path(), &format!("{HEADER}1,1,1,1,1,,1,5\n2,1,1,1,1,,1,NaN\n"));

        let err = load_warehouse(&config(&dir, true).warehouse).await.unwrap_err();
        assert!(matches!(err, LoadError::Pipeline(PipelineError::Transform { .. })));
    }

    #[tokio::test]
    async fn duplicate_dimension_ids_fail_the_load() {
        let dir = TempDir::new().unwrap();
        seed(dir.path(), HEADER);
        write(dir.path(), "gas.csv", "id,gas\n1,co2\n1,ch4\n");

        let err = load_warehouse(&config(&dir, false).warehouse).await.unwrap_err();
        assert!(matches!(
            err,
            LoadError::Warehouse(WarehouseError::DuplicateDimensionKey { dimension: Dimension::Gas, id: 1 })
        ));
    }

    #[tokio::test]
    async fn missing_file_fails_even_when_lenient() {
        let dir = TempDir::new().unwrap();
        seed(dir.path(), HEADER);
        fs::remove_file(dir.path().join("sector.csv")).unwrap();

        let err = load_warehouse(&config(&dir, false).warehouse).await.unwrap_err();
        assert!(matches!(err, LoadError::Pipeline(PipelineError::Source(_))));
    }

    #[test]
    fn non_ascii_delimiter_is_rejected() {
        assert!(matches!(delimiter_byte('§'), Err(LoadError::Delimiter('§'))));
        assert_eq!(delimiter_byte('|').unwrap(), b'|');
    }
}
