//! Application wiring: clients built from configuration and shared by runs.

use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;
use crate::jobs::NewsletterJob;
use crate::services::{JellyfinClient, TmdbClient};

/// Long-lived clients for the lifetime of the process
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub jellyfin: Arc<JellyfinClient>,
    pub tmdb: Arc<TmdbClient>,
}

impl AppContext {
    pub fn from_config(config: Config) -> Result<Self> {
        let jellyfin = Arc::new(JellyfinClient::new(&config.jellyfin)?);
        let tmdb = Arc::new(TmdbClient::new(
            config.tmdb.api_key.clone(),
            config.email_template.language.clone(),
        )?);

        Ok(Self {
            config: Arc::new(config),
            jellyfin,
            tmdb,
        })
    }

    pub fn newsletter_job(&self) -> NewsletterJob {
        NewsletterJob::new(self.config.clone(), self.jellyfin.clone(), self.tmdb.clone())
    }
}
