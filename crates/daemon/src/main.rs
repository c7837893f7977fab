#![forbid(unsafe_code)]

//! mgosd: dumps MongoDB collections to timestamped JSON snapshots on a fixed interval.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use mgosd_core::DumperConfig;
use mgosd_daemon::config::{self, Cli};
use mgosd_daemon::logging;
use mgosd_daemon::mongo::MongoSource;
use mgosd_daemon::Supervisor;
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        license = "GNU GPLv3",
        "mgosd starting"
    );

    let config = config::resolve(&cli)?;
    let source = Arc::new(MongoSource::new(config.db.clone()));
    let supervisor = Supervisor::new(source, config);
    log_parameters(supervisor.config());

    if let Err(e) = supervisor.run_until(shutdown_signal()).await {
        tracing::error!(error = %e, "dump run aborted");
        return Err(e).context("dump run aborted");
    }

    info!("mgosd stopped");
    Ok(())
}

fn log_parameters(config: &DumperConfig) {
    info!(
        host = %config.db.host,
        port = config.db.port,
        database = %config.db.database,
        auth = config.db.auth,
        "database"
    );
    info!(
        count = config.collections.len(),
        collections = ?config.collections,
        interval = ?config.interval,
        output = %config.output.display(),
        "dump parameters"
    );
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::warn!(error = %e, "ctrl-c handler unavailable; running until a worker fails");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
