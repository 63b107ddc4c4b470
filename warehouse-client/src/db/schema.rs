use std::path::Path;

use anyhow::{bail, Context, Result};
use sqlx::PgPool;

use crate::domain::Dimension;

/// Tables of the star schema, dimensions first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Dimension(Dimension),
    Emissions,
}

impl Table {
    pub const LOAD_ORDER: [Table; 7] = [
        Table::Dimension(Dimension::Country),
        Table::Dimension(Dimension::StartTime),
        Table::Dimension(Dimension::EndTime),
        Table::Dimension(Dimension::Gas),
        Table::Dimension(Dimension::Sector),
        Table::Dimension(Dimension::Subsector),
        Table::Emissions,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Dimension(d) => d.as_str(),
            Table::Emissions => "emissions",
        }
    }

    /// Every column of the table, in DDL order.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Table::Dimension(Dimension::Country) => &["id", "iso_code"],
            Table::Dimension(Dimension::StartTime) => &["id", "start_time"],
            Table::Dimension(Dimension::EndTime) => &["id", "end_time"],
            Table::Dimension(Dimension::Gas) => &["id", "gas"],
            Table::Dimension(Dimension::Sector) => &["id", "sector"],
            Table::Dimension(Dimension::Subsector) => &["id", "subsector"],
            Table::Emissions => &[
                "id",
                "country_id",
                "start_time_id",
                "end_time_id",
                "sector_id",
                "subsector_id",
                "gas_id",
                "quantity",
            ],
        }
    }

    /// Columns a bulk-loaded file may leave out.
    pub fn optional_columns(&self) -> &'static [&'static str] {
        match self {
            Table::Emissions => &["subsector_id"],
            Table::Dimension(_) => &[],
        }
    }

    fn create_sql(&self) -> &'static str {
        match self {
            Table::Dimension(Dimension::Country) => {
                "CREATE TABLE IF NOT EXISTS country (id INT PRIMARY KEY, iso_code TEXT NOT NULL UNIQUE)"
            }
            Table::Dimension(Dimension::StartTime) => {
                "CREATE TABLE IF NOT EXISTS start_time (id INT PRIMARY KEY, start_time DATE NOT NULL)"
            }
            Table::Dimension(Dimension::EndTime) => {
                "CREATE TABLE IF NOT EXISTS end_time (id INT PRIMARY KEY, end_time DATE NOT NULL)"
            }
            Table::Dimension(Dimension::Gas) => {
                "CREATE TABLE IF NOT EXISTS gas (id INT PRIMARY KEY, gas TEXT NOT NULL)"
            }
            Table::Dimension(Dimension::Sector) => {
                "CREATE TABLE IF NOT EXISTS sector (id INT PRIMARY KEY, sector TEXT NOT NULL)"
            }
            Table::Dimension(Dimension::Subsector) => {
                "CREATE TABLE IF NOT EXISTS subsector (id INT PRIMARY KEY, subsector TEXT NOT NULL)"
            }
            // Dimension references are plain integers: reports inner-join,
            // and dangling ids are surfaced by the exclusions report instead
            // of being rejected at load time.
            Table::Emissions => {
                r#"
                CREATE TABLE IF NOT EXISTS emissions (
                    id            INT PRIMARY KEY,
                    country_id    INT NOT NULL,
                    start_time_id INT NOT NULL,
                    end_time_id   INT NOT NULL,
                    sector_id     INT NOT NULL,
                    subsector_id  INT,
                    gas_id        INT NOT NULL,
                    quantity      DOUBLE PRECISION
                )
                "#
            }
        }
    }
}

pub async fn create_schema(pool: &PgPool) -> Result<()> {
    for table in Table::LOAD_ORDER {
        sqlx::query(table.create_sql()).execute(pool).await?;
    }
    tracing::info!(tables = Table::LOAD_ORDER.len(), "star schema created");
    Ok(())
}

pub async fn drop_schema(pool: &PgPool) -> Result<()> {
    for table in Table::LOAD_ORDER.iter().rev() {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table.name()))
            .execute(pool)
            .await?;
    }
    tracing::info!("star schema dropped");
    Ok(())
}

/// Read the header row of a delimited file.
pub fn read_header(path: &Path, delimiter: char) -> Result<Vec<String>> {
    if !delimiter.is_ascii() {
        bail!("unsupported delimiter {delimiter:?}");
    }
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let headers = rdr
        .headers()
        .with_context(|| format!("failed to read header of {}", path.display()))?;
    Ok(headers.iter().map(|h| h.trim().to_string()).collect())
}

/// Build a server-side `COPY` for one table. The path is read by the
/// database server, not by this process.
///
/// `header` is the file's header row. It becomes the column list, so file
/// columns map by name whatever their order.
pub fn copy_statement(table: Table, path: &Path, header: &[String], delimiter: char) -> Result<String> {
    let Some(path) = path.to_str() else {
        bail!("bulk load path is not valid UTF-8: {}", path.display());
    };
    if !delimiter.is_ascii() || delimiter == '\'' {
        bail!("unsupported delimiter {delimiter:?}");
    }

    let known = table.columns();
    if let Some(unknown) = header.iter().find(|h| !known.contains(&h.as_str())) {
        bail!("{} has no column '{unknown}'", table.name());
    }
    for (i, column) in header.iter().enumerate() {
        if header[..i].contains(column) {
            bail!("column '{column}' appears twice in the {} header", table.name());
        }
    }
    if let Some(missing) = known
        .iter()
        .filter(|c| !table.optional_columns().contains(c))
        .find(|c| !header.iter().any(|h| h == *c))
    {
        bail!("{} file is missing column '{missing}'", table.name());
    }

    Ok(format!(
        "COPY {} ({}) FROM '{}' WITH (FORMAT csv, HEADER true, DELIMITER '{}')",
        table.name(),
        header.join(", "),
        path.replace('\'', "''"),
        delimiter,
    ))
}

/// Bulk-load every table from `files`, in the order given. Each file's
/// header is read locally to build its column list.
pub async fn bulk_load(pool: &PgPool, files: &[(Table, &Path)], delimiter: char) -> Result<u64> {
    let mut total = 0;
    for (table, path) in files {
        let header = read_header(path, delimiter)?;
        let sql = copy_statement(*table, path, &header, delimiter)?;
        let loaded = sqlx::query(&sql).execute(pool).await?.rows_affected();
        tracing::info!(table = table.name(), rows = loaded, "table bulk loaded");
        total += loaded;
    }
    Ok(total)
}
