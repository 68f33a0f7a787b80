//! Jellyfin newsletter - entry point
//!
//! Loads the configuration, checks the Jellyfin connection, then either runs
//! a single newsletter pass or keeps running on the configured schedule.

use std::sync::Arc;

use anyhow::Context;
use jellyfin_newsletter::app::AppContext;
use jellyfin_newsletter::cli::CliOptions;
use jellyfin_newsletter::config::Config;
use jellyfin_newsletter::jobs;
use jellyfin_newsletter::services::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = CliOptions::from_args();

    let config_path = Config::resolve_path(cli.config_path);
    let config = Config::load(&config_path)?;
    init_tracing(&config.log)?;

    tracing::info!(path = %config_path.display(), "Configuration loaded");

    let app = AppContext::from_config(config)?;
    app.jellyfin
        .test_connection()
        .await
        .context("Jellyfin is not reachable")?;

    let job = Arc::new(app.newsletter_job());

    let schedule = app.config.scheduler.as_ref().filter(|_| !cli.once);
    let Some(schedule) = schedule else {
        tracing::info!("No schedule configured, running once");
        job.run().await?;
        return Ok(());
    };

    let mut scheduler = jobs::start_scheduler(job, &schedule.cron).await?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received, stopping scheduler");
    scheduler.shutdown().await?;

    Ok(())
}
