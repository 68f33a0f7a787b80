//! Newsletter job
//!
//! One pass: fix the cutoff, collect what was added in the watched folders,
//! enrich it, and hand the digest on. With dry-run enabled the digest is
//! written to disk as JSON.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::catalog::{Cutoff, FolderAggregator, ItemSource};
use crate::config::{Config, DryRunConfig};
use crate::services::enrichment::{DetailsProvider, NewsletterDigest, build_digest};

pub struct NewsletterJob {
    config: Arc<Config>,
    aggregator: FolderAggregator,
    details: Arc<dyn DetailsProvider>,
}

impl NewsletterJob {
    pub fn new(
        config: Arc<Config>,
        source: Arc<dyn ItemSource>,
        details: Arc<dyn DetailsProvider>,
    ) -> Self {
        let aggregator = FolderAggregator::new(source)
            .with_max_concurrent_folders(config.jellyfin.max_concurrent_folders);
        Self {
            config,
            aggregator,
            details,
        }
    }

    /// Run against the current time
    pub async fn run(&self) -> Result<NewsletterDigest> {
        self.run_at(Utc::now()).await
    }

    /// Run as if it were `now`. The cutoff is computed once and shared by
    /// every folder of the run.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<NewsletterDigest> {
        let jellyfin = &self.config.jellyfin;
        let cutoff = Cutoff::from_observation_window(now, jellyfin.observed_period_days);

        info!(
            observed_period_days = jellyfin.observed_period_days,
            cutoff = %cutoff.instant(),
            film_folders = jellyfin.watched_film_folders.len(),
            series_folders = jellyfin.watched_series_folders.len(),
            "Starting newsletter run"
        );

        let added = self
            .aggregator
            .collect(
                &jellyfin.watched_series_folders,
                &jellyfin.watched_film_folders,
                cutoff,
            )
            .await;

        let digest = build_digest(
            self.details.as_ref(),
            added,
            jellyfin.observed_period_days,
            self.config.email_template.sort_mode,
            now,
        )
        .await;

        info!(
            movies = digest.movies.len(),
            series = digest.series.len(),
            episodes = digest.episode_count(),
            "Newsletter run completed"
        );

        if digest.is_empty() {
            warn!("Nothing was added during the observed period, the newsletter would be empty");
        }

        if self.config.dry_run.enabled {
            let path = write_dry_run(&digest, &self.config.dry_run)?;
            info!(path = %path.display(), "Dry run enabled, newsletter written to file");
        }

        Ok(digest)
    }
}

/// Write the digest as pretty JSON, creating the output directory when needed
pub fn write_dry_run(digest: &NewsletterDigest, config: &DryRunConfig) -> Result<PathBuf> {
    fs::create_dir_all(&config.output_directory).with_context(|| {
        format!(
            "Failed to create dry-run directory {}",
            config.output_directory.display()
        )
    })?;

    let path = config.output_path();
    let json = serde_json::to_string_pretty(digest).context("Failed to serialize newsletter")?;
    fs::write(&path, json)
        .with_context(|| format!("Failed to write dry-run output {}", path.display()))?;
    Ok(path)
}
