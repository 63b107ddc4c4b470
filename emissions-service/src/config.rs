use serde::Deserialize;
use std::{fs, path::PathBuf};
use warehouse_client::{
    db::Table,
    domain::{Dimension, JoinPolicy},
    ReportOptions,
};

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_delimiter() -> char {
    ','
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_max_connections() -> u32 {
    5
}

/// File name of each table, relative to `data_dir`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceFiles {
    pub country: String,
    pub start_time: String,
    pub end_time: String,
    pub gas: String,
    pub sector: String,
    pub subsector: String,
    pub emissions: String,
}

impl Default for SourceFiles {
    fn default() -> Self {
        Self {
            country: "country.csv".to_string(),
            start_time: "start_time.csv".to_string(),
            end_time: "end_time.csv".to_string(),
            gas: "gas.csv".to_string(),
            sector: "sector.csv".to_string(),
            subsector: "subsector.csv".to_string(),
            emissions: "emissions.csv".to_string(),
        }
    }
}

impl SourceFiles {
    pub fn file_for(&self, table: Table) -> &str {
        match table {
            Table::Dimension(Dimension::Country) => &self.country,
            Table::Dimension(Dimension::StartTime) => &self.start_time,
            Table::Dimension(Dimension::EndTime) => &self.end_time,
            Table::Dimension(Dimension::Gas) => &self.gas,
            Table::Dimension(Dimension::Sector) => &self.sector,
            Table::Dimension(Dimension::Subsector) => &self.subsector,
            Table::Emissions => &self.emissions,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WarehouseConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub files: SourceFiles,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Abort the load on the first undecodable or invalid row.
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub join_policy: JoinPolicy,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            files: SourceFiles::default(),
            delimiter: default_delimiter(),
            strict: false,
            join_policy: JoinPolicy::default(),
        }
    }
}

impl WarehouseConfig {
    pub fn path_for(&self, table: Table) -> PathBuf {
        self.data_dir.join(self.files.file_for(table))
    }

    /// Replace `data_dir` when one is given, e.g. from the command line.
    pub fn with_data_dir(mut self, dir: Option<PathBuf>) -> Self {
        if let Some(dir) = dir {
            self.data_dir = dir;
        }
        self
    }

    /// Every table with its file, in load order.
    pub fn table_files(&self) -> Vec<(Table, PathBuf)> {
        Table::LOAD_ORDER
            .iter()
            .map(|&t| (t, self.path_for(t)))
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostgresConfig {
    pub uri: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub warehouse: WarehouseConfig,
    #[serde(default)]
    pub reports: ReportOptions,
    pub postgres: Option<PostgresConfig>,
    #[serde(default)]
    pub server: ServerConfig,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("EMISSIONS_CONFIG").unwrap_or_else(|_| "emissions-config.toml".to_string());
        let contents = fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("failed to read config '{path}': {e}"))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        Ok(cfg)
    }
}
