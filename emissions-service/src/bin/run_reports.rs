use anyhow::{bail, Result};
use emissions_service::{
    config::AppConfig,
    loader, observability,
    output::{write_report, OutputFormat},
};
use std::{env, fs::File, io, path::PathBuf};
use warehouse_client::ReportKind;

/// Compute reports from the configured CSV files and write them out.
///
/// Usage:
///   run_reports <report|all> [csv|json] [out_dir]
///
/// Without `out_dir` a single report goes to stdout; `all` as JSON writes the
/// whole report set to stdout. With `out_dir` each report lands in its own
/// `<report>.<format>` file.
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: run_reports <report|all> [csv|json] [out_dir]");
    }
    let format: OutputFormat = args.get(2).map(String::as_str).unwrap_or("csv").parse()?;
    let out_dir = args.get(3).map(PathBuf::from);

    let cfg = AppConfig::load()?;
    let reports = loader::build_report_set(&cfg).await?;

    let kinds = if args[1] == "all" {
        reports.kinds()
    } else {
        vec![args[1].parse::<ReportKind>()?]
    };

    match out_dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            for kind in kinds {
                let path = dir.join(format!("{kind}.{}", format.extension()));
                write_report(&reports, kind, File::create(&path)?, format)?;
                tracing::info!(report = %kind, file = %path.display(), "report written");
            }
        }
        None if args[1] == "all" => {
            if format != OutputFormat::Json {
                bail!("writing all reports to stdout requires json; pass an out_dir for csv");
            }
            serde_json::to_writer_pretty(io::stdout().lock(), &reports)?;
            println!();
        }
        None => {
            for kind in kinds {
                write_report(&reports, kind, io::stdout().lock(), format)?;
            }
        }
    }

    Ok(())
}
