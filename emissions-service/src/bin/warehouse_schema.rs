use anyhow::{anyhow, bail, Result};
use emissions_service::{config::AppConfig, observability};
use sqlx::postgres::PgPoolOptions;
use std::{
    env,
    path::{Path, PathBuf},
};
use warehouse_client::db::schema;

/// Manage the star schema in Postgres.
///
/// Usage:
///   warehouse_schema <create|drop|reset|load> [data_dir]
///
/// `load` issues server-side COPY statements, so `data_dir` (default:
/// `warehouse.data_dir` from config) must be readable by the database
/// server. Each file's header is also read locally to map its columns.
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: warehouse_schema <create|drop|reset|load> [data_dir]");
    }

    let cfg = AppConfig::load()?;
    let pg = cfg
        .postgres
        .as_ref()
        .ok_or_else(|| anyhow!("[postgres] section missing from config"))?;

    let pool = PgPoolOptions::new()
        .max_connections(pg.max_connections)
        .connect(&pg.uri)
        .await?;

    match args[1].as_str() {
        "create" => schema::create_schema(&pool).await?,
        "drop" => schema::drop_schema(&pool).await?,
        "reset" => {
            schema::drop_schema(&pool).await?;
            schema::create_schema(&pool).await?;
        }
        "load" => {
            let warehouse = cfg.warehouse.clone().with_data_dir(args.get(2).map(PathBuf::from));
            let table_files = warehouse.table_files();
            let files: Vec<(_, &Path)> = table_files.iter().map(|(t, p)| (*t, p.as_path())).collect();
            let rows = schema::bulk_load(&pool, &files, warehouse.delimiter).await?;
            tracing::info!(rows, "bulk load finished");
        }
        other => bail!("unknown command '{other}', expected create, drop, reset or load"),
    }

    Ok(())
}
