use anyhow::Result;
use emissions_service::{config::AppConfig, loader, metrics_server, observability, report_server};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    // Load configuration
    let cfg = AppConfig::load()?;

    // Start metrics server if configured
    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    // Reports are computed once; the warehouse is static after load.
    let reports = loader::build_report_set(&cfg).await?;

    report_server::serve(&cfg.server.bind_addr, Arc::new(reports)).await?;

    Ok(())
}
