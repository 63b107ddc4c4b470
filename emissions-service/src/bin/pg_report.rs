use anyhow::{anyhow, bail, Result};
use emissions_service::{config::AppConfig, observability, output::{write_rows, OutputFormat}};
use sqlx::postgres::PgPoolOptions;
use std::{env, io};
use warehouse_client::{db::emission_reports, ReportKind};

/// Run the SQL rendition of a report against Postgres.
///
/// Usage:
///   pg_report <report> [csv|json]
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: pg_report <report> [csv|json]");
    }
    let kind: ReportKind = args[1].parse()?;
    let format: OutputFormat = args.get(2).map(String::as_str).unwrap_or("json").parse()?;

    let cfg = AppConfig::load()?;
    let pg = cfg
        .postgres
        .as_ref()
        .ok_or_else(|| anyhow!("[postgres] section missing from config"))?;

    let pool = PgPoolOptions::new()
        .max_connections(pg.max_connections)
        .connect(&pg.uri)
        .await?;

    let out = io::stdout().lock();
    match kind {
        ReportKind::Cube => write_rows(out, &emission_reports::cube(&pool).await?, format)?,
        ReportKind::CountryRank => write_rows(
            out,
            &emission_reports::country_rank(&pool, cfg.reports.rank_method).await?,
            format,
        )?,
        ReportKind::LatestComparison => {
            write_rows(out, &emission_reports::latest_comparison(&pool).await?, format)?
        }
        ReportKind::MovingAverage(window) => write_rows(
            out,
            &emission_reports::moving_average(&pool, window).await?,
            format,
        )?,
        ReportKind::SectorContribution => {
            write_rows(out, &emission_reports::sector_contribution(&pool).await?, format)?
        }
        ReportKind::Exclusions => write_rows(out, &emission_reports::exclusions(&pool).await?, format)?,
    }

    tracing::info!(report = %kind, "report finished");
    Ok(())
}
