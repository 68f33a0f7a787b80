//! TMDB (The Movie Database) API client for newsletter metadata
//!
//! Base URL: https://api.themoviedb.org/3
//!
//! Only overview and poster are needed. Lookups go by TMDB id when the media
//! server knows it, otherwise by name and production year, keeping the most
//! popular hit. Any failure falls back to placeholder details so an entry is
//! never dropped for lack of metadata.
//!
//! Rate limiting: TMDB allows ~40 requests per 10 seconds.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use tracing::{debug, warn};

use super::rate_limiter::{Attempt, RateLimitedClient, ResponseExt, RetryConfig, retry_async};
use crate::config::Secret;

const TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";
const POSTER_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";

pub const DEFAULT_OVERVIEW: &str = "No description available.";
pub const DEFAULT_POSTER_URL: &str = "https://placehold.co/200";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Movie,
    Tv,
}

impl MediaType {
    /// Path segment used by the TMDB API
    pub fn as_path(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
        }
    }

    fn year_parameter(&self) -> &'static str {
        match self {
            MediaType::Movie => "year",
            MediaType::Tv => "first_air_date_year",
        }
    }
}

/// Movie or TV show as returned by details and search endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TmdbMedia {
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub popularity: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct TmdbSearchResult {
    #[serde(default)]
    results: Vec<TmdbMedia>,
}

/// What the newsletter shows next to an entry
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ItemDetails {
    pub overview: String,
    pub poster_url: String,
}

impl Default for ItemDetails {
    fn default() -> Self {
        Self {
            overview: DEFAULT_OVERVIEW.to_string(),
            poster_url: DEFAULT_POSTER_URL.to_string(),
        }
    }
}

impl ItemDetails {
    pub fn from_media(media: &TmdbMedia) -> Self {
        let mut details = Self::default();
        if let Some(overview) = media.overview.as_deref().filter(|o| !o.trim().is_empty()) {
            details.overview = overview.to_string();
        }
        if let Some(path) = media.poster_path.as_deref().filter(|p| !p.is_empty()) {
            details.poster_url = format!("{}{}", POSTER_BASE_URL, path);
        }
        details
    }

    /// Details of the most popular result; the first one wins ties
    pub fn from_search_results(results: &[TmdbMedia]) -> Self {
        let mut best: Option<&TmdbMedia> = None;
        for candidate in results {
            let popularity = candidate.popularity.unwrap_or(0.0);
            if best.is_none_or(|b| popularity > b.popularity.unwrap_or(0.0)) {
                best = Some(candidate);
            }
        }
        best.map(Self::from_media).unwrap_or_default()
    }
}

/// TMDB API client with rate limiting and retry logic
pub struct TmdbClient {
    client: Arc<RateLimitedClient>,
    base_url: String,
    api_key: Secret,
    language: String,
    retry_config: RetryConfig,
}

impl TmdbClient {
    pub fn new(api_key: Secret, language: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: Arc::new(RateLimitedClient::for_tmdb()?),
            base_url: TMDB_BASE_URL.to_string(),
            api_key,
            language: language.into(),
            retry_config: RetryConfig::default(),
        })
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Details for an entry, never failing: id lookup, then search, then defaults
    pub async fn item_details(
        &self,
        external_id: &str,
        name: &str,
        production_year: i32,
        media_type: MediaType,
    ) -> ItemDetails {
        if !external_id.is_empty() {
            return match self.get_media(external_id, media_type).await {
                Ok(media) => ItemDetails::from_media(&media),
                Err(e) => {
                    warn!(
                        tmdb_id = %external_id,
                        name = %name,
                        media_type = media_type.as_path(),
                        error = %e,
                        "TMDB lookup failed, using default details"
                    );
                    ItemDetails::default()
                }
            };
        }

        if name.trim().is_empty() {
            warn!(
                media_type = media_type.as_path(),
                "Item has neither a TMDB id nor a name, TMDB search skipped"
            );
            return ItemDetails::default();
        }

        debug!(
            name = %name,
            production_year = production_year,
            "Item has no TMDB id, searching by name and keeping the most popular match"
        );

        let year = (production_year != 0).then_some(production_year);
        match self.search_media(name, year, media_type).await {
            Ok(results) => ItemDetails::from_search_results(&results),
            Err(e) => {
                warn!(name = %name, error = %e, "TMDB search failed, using default details");
                ItemDetails::default()
            }
        }
    }

    /// Get movie or show details by TMDB id
    pub async fn get_media(&self, tmdb_id: &str, media_type: MediaType) -> Result<TmdbMedia> {
        let url = format!("{}/{}/{}", self.base_url, media_type.as_path(), tmdb_id);
        debug!(tmdb_id = %tmdb_id, media_type = media_type.as_path(), "Fetching details from TMDB");

        self.get_json(&url, vec![("language", self.language.clone())], "tmdb_get_media")
            .await
    }

    /// Search movies or shows by name
    pub async fn search_media(
        &self,
        name: &str,
        year: Option<i32>,
        media_type: MediaType,
    ) -> Result<Vec<TmdbMedia>> {
        let url = format!("{}/search/{}", self.base_url, media_type.as_path());

        let mut query = vec![
            ("language", self.language.clone()),
            ("query", name.to_string()),
            ("include_adult", "false".to_string()),
        ];
        if let Some(y) = year {
            query.push((media_type.year_parameter(), y.to_string()));
        }

        let result: TmdbSearchResult = self.get_json(&url, query, "tmdb_search_media").await?;
        debug!(count = result.results.len(), "TMDB search returned results");
        Ok(result.results)
    }

    async fn get_json<T>(
        &self,
        url: &str,
        query: Vec<(&'static str, String)>,
        operation_name: &str,
    ) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        if !self.has_api_key() {
            anyhow::bail!("TMDB API key not configured");
        }

        let authorization = format!("Bearer {}", self.api_key.expose());

        retry_async(
            || {
                let client = self.client.clone();
                let authorization = authorization.clone();
                let query = query.clone();
                async move {
                    let response = match client
                        .get_with_headers_and_query(
                            url,
                            &[
                                ("Authorization", authorization.as_str()),
                                ("Accept", "application/json"),
                            ],
                            &query,
                        )
                        .await
                    {
                        Ok(response) => response,
                        Err(e) => return Err(Attempt::Transient(e)),
                    };

                    let status = response.status();
                    if response.is_transient_error() {
                        return Err(Attempt::Transient(anyhow!(
                            "TMDB request failed with status: {}",
                            status
                        )));
                    }
                    if status.as_u16() == 401 {
                        return Err(Attempt::Permanent(anyhow!("TMDB API key is invalid")));
                    }
                    if status.as_u16() == 404 {
                        return Err(Attempt::Permanent(anyhow!("Not found on TMDB")));
                    }
                    if !status.is_success() {
                        return Err(Attempt::Permanent(anyhow!(
                            "TMDB request failed with status: {}",
                            status
                        )));
                    }

                    response
                        .json::<T>()
                        .await
                        .context("Failed to parse TMDB response")
                        .map_err(Attempt::Permanent)
                }
            },
            &self.retry_config,
            operation_name,
        )
        .await
    }
}
