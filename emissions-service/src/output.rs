use std::{io::Write, str::FromStr};

use anyhow::{anyhow, Result};
use serde::Serialize;
use warehouse_client::{ReportKind, ReportSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            other => Err(anyhow!("unknown output format '{other}', expected csv or json")),
        }
    }
}

/// Write rows as a headed CSV table or a JSON array.
pub fn write_rows<W: Write, R: Serialize>(writer: W, rows: &[R], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(writer);
            for row in rows {
                wtr.serialize(row)?;
            }
            wtr.flush()?;
        }
        OutputFormat::Json => {
            let mut writer = writer;
            serde_json::to_writer_pretty(&mut writer, rows)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}

pub fn write_report<W: Write>(
    reports: &ReportSet,
    kind: ReportKind,
    writer: W,
    format: OutputFormat,
) -> Result<()> {
    match kind {
        ReportKind::Cube => write_rows(writer, &reports.cube, format),
        ReportKind::CountryRank => write_rows(writer, &reports.country_rank, format),
        ReportKind::LatestComparison => write_rows(writer, &reports.latest_comparison, format),
        ReportKind::MovingAverage(window) => {
            write_rows(writer, reports.moving_average(window)?, format)
        }
        ReportKind::SectorContribution => write_rows(writer, &reports.sector_contribution, format),
        ReportKind::Exclusions => write_rows(writer, &reports.exclusions, format),
    }
}
