//! Newsletter digest assembly
//!
//! Attaches overview and poster to every classified entry and orders the
//! result for presentation. Lookups never drop an entry; a failed lookup
//! yields placeholder details.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;

use super::tmdb::{ItemDetails, MediaType, TmdbClient};
use crate::catalog::{ClassifiedMovie, ClassifiedSeries, Cutoff, NewlyAdded};
use crate::config::SortMode;

/// Lookups kept in flight at once; the TMDB client rate limits on top of this
const ENRICHMENT_CONCURRENCY: usize = 4;

/// Source of presentation details for an entry
#[async_trait]
pub trait DetailsProvider: Send + Sync {
    async fn item_details(
        &self,
        external_id: &str,
        name: &str,
        production_year: i32,
        media_type: MediaType,
    ) -> ItemDetails;
}

#[async_trait]
impl DetailsProvider for TmdbClient {
    async fn item_details(
        &self,
        external_id: &str,
        name: &str,
        production_year: i32,
        media_type: MediaType,
    ) -> ItemDetails {
        TmdbClient::item_details(self, external_id, name, production_year, media_type).await
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedMovie {
    #[serde(flatten)]
    pub movie: ClassifiedMovie,
    pub details: ItemDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedSeries {
    #[serde(flatten)]
    pub series: ClassifiedSeries,
    pub details: ItemDetails,
}

impl EnrichedSeries {
    /// Most recent date among what is reported for this series
    pub fn latest_addition(&self) -> DateTime<Utc> {
        let series = &self.series;
        let Some(seasons) = &series.new_seasons else {
            return series.creation_date;
        };

        seasons
            .iter()
            .flat_map(|season| {
                let episode_dates = season
                    .episodes
                    .iter()
                    .flatten()
                    .map(|episode| episode.creation_date);
                let season_date = season.is_season_new.then_some(season.creation_date);
                season_date.into_iter().chain(episode_dates)
            })
            .max()
            .unwrap_or(series.creation_date)
    }
}

/// What one newsletter run hands to templating
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewsletterDigest {
    pub generated_at: DateTime<Utc>,
    pub cutoff: Cutoff,
    pub observed_period_days: u32,
    pub movies: Vec<EnrichedMovie>,
    pub series: Vec<EnrichedSeries>,
}

impl NewsletterDigest {
    pub fn is_empty(&self) -> bool {
        self.movies.is_empty() && self.series.is_empty()
    }

    /// Episodes listed individually across all series
    pub fn episode_count(&self) -> usize {
        self.series
            .iter()
            .filter_map(|s| s.series.new_seasons.as_ref())
            .flatten()
            .filter_map(|season| season.episodes.as_ref())
            .map(Vec::len)
            .sum()
    }

    pub fn sort(&mut self, mode: SortMode) {
        match mode {
            SortMode::DateDesc => {
                self.movies
                    .sort_by(|a, b| b.movie.creation_date.cmp(&a.movie.creation_date));
                self.series
                    .sort_by_key(|s| std::cmp::Reverse(s.latest_addition()));
            }
            SortMode::DateAsc => {
                self.movies.sort_by_key(|m| m.movie.creation_date);
                self.series.sort_by_key(EnrichedSeries::latest_addition);
            }
            SortMode::NameAsc => {
                self.movies.sort_by(|a, b| a.movie.name.cmp(&b.movie.name));
                self.series
                    .sort_by(|a, b| a.series.series_name.cmp(&b.series.series_name));
            }
            SortMode::NameDesc => {
                self.movies.sort_by(|a, b| b.movie.name.cmp(&a.movie.name));
                self.series
                    .sort_by(|a, b| b.series.series_name.cmp(&a.series.series_name));
            }
        }
    }
}

/// Enrich everything found in a run and order it
pub async fn build_digest(
    provider: &dyn DetailsProvider,
    added: NewlyAdded,
    observed_period_days: u32,
    sort_mode: SortMode,
    generated_at: DateTime<Utc>,
) -> NewsletterDigest {
    let movies: Vec<EnrichedMovie> = stream::iter(added.movies)
        .map(|movie| async move {
            let details = provider
                .item_details(
                    &movie.external_media_id,
                    &movie.name,
                    movie.production_year,
                    MediaType::Movie,
                )
                .await;
            EnrichedMovie { movie, details }
        })
        .buffered(ENRICHMENT_CONCURRENCY)
        .collect()
        .await;

    let series: Vec<EnrichedSeries> = stream::iter(added.series)
        .map(|series| async move {
            let details = provider
                .item_details(
                    &series.external_media_id,
                    &series.series_name,
                    series.production_year,
                    MediaType::Tv,
                )
                .await;
            EnrichedSeries { series, details }
        })
        .buffered(ENRICHMENT_CONCURRENCY)
        .collect()
        .await;

    let mut digest = NewsletterDigest {
        generated_at,
        cutoff: added.cutoff,
        observed_period_days,
        movies,
        series,
    };
    digest.sort(sort_mode);
    digest
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::catalog::{ClassifiedEpisode, ClassifiedSeason};

    /// Records every lookup and answers with the id as overview
    #[derive(Default)]
    struct RecordingProvider {
        calls: Mutex<Vec<(String, String, i32, MediaType)>>,
    }

    #[async_trait]
    impl DetailsProvider for RecordingProvider {
        async fn item_details(
            &self,
            external_id: &str,
            name: &str,
            production_year: i32,
            media_type: MediaType,
        ) -> ItemDetails {
            self.calls.lock().unwrap().push((
                external_id.to_string(),
                name.to_string(),
                production_year,
                media_type,
            ));
            ItemDetails {
                overview: format!("about {}", name),
                ..ItemDetails::default()
            }
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn movie(id: &str, name: &str, days_ago: i64) -> ClassifiedMovie {
        ClassifiedMovie {
            id: id.to_string(),
            name: name.to_string(),
            creation_date: now() - Duration::days(days_ago),
            external_media_id: format!("tmdb-{}", id),
            production_year: 2024,
        }
    }

    fn new_series(id: &str, name: &str, days_ago: i64) -> ClassifiedSeries {
        ClassifiedSeries {
            series_id: id.to_string(),
            series_name: name.to_string(),
            external_media_id: String::new(),
            production_year: 2020,
            creation_date: now() - Duration::days(days_ago),
            is_series_new: true,
            new_seasons: None,
        }
    }

    fn series_with_episode(id: &str, name: &str, episode_days_ago: i64) -> ClassifiedSeries {
        ClassifiedSeries {
            is_series_new: false,
            creation_date: now() - Duration::days(400),
            new_seasons: Some(vec![ClassifiedSeason {
                season_id: format!("{}-1", id),
                season_number: 1,
                name: "Season 1".to_string(),
                creation_date: now() - Duration::days(300),
                is_season_new: false,
                episodes: Some(vec![ClassifiedEpisode {
                    episode_id: format!("{}-1-1", id),
                    name: "Ep".to_string(),
                    creation_date: now() - Duration::days(episode_days_ago),
                    episode_number: 1,
                }]),
            }]),
            ..new_series(id, name, 400)
        }
    }

    fn added() -> NewlyAdded {
        NewlyAdded {
            cutoff: Cutoff::from_observation_window(now(), 30),
            series: vec![
                new_series("s1", "Alpha", 10),
                series_with_episode("s2", "Beta", 2),
            ],
            movies: vec![movie("m1", "Old", 20), movie("m2", "Recent", 1)],
        }
    }

    #[tokio::test]
    async fn test_every_entry_is_looked_up_with_its_kind() {
        let provider = RecordingProvider::default();
        let digest = build_digest(&provider, added(), 30, SortMode::NameAsc, now()).await;

        assert_eq!(digest.movies.len(), 2);
        assert_eq!(digest.series.len(), 2);
        assert_eq!(digest.movies[0].details.overview, "about Old");

        let calls = provider.calls.lock().unwrap();
        assert!(calls.contains(&("tmdb-m1".to_string(), "Old".to_string(), 2024, MediaType::Movie)));
        assert!(calls.contains(&(String::new(), "Beta".to_string(), 2020, MediaType::Tv)));
    }

    #[tokio::test]
    async fn test_date_desc_uses_latest_reported_addition() {
        let provider = RecordingProvider::default();
        let digest = build_digest(&provider, added(), 30, SortMode::DateDesc, now()).await;

        let movie_names: Vec<&str> = digest.movies.iter().map(|m| m.movie.name.as_str()).collect();
        assert_eq!(movie_names, vec!["Recent", "Old"]);

        // Beta's episode (2 days) is fresher than Alpha's series date (10 days)
        let series_names: Vec<&str> = digest
            .series
            .iter()
            .map(|s| s.series.series_name.as_str())
            .collect();
        assert_eq!(series_names, vec!["Beta", "Alpha"]);
    }

    #[tokio::test]
    async fn test_name_desc_and_date_asc() {
        let provider = RecordingProvider::default();
        let mut digest = build_digest(&provider, added(), 30, SortMode::NameDesc, now()).await;
        assert_eq!(digest.series[0].series.series_name, "Beta");
        assert_eq!(digest.movies[0].movie.name, "Recent");

        digest.sort(SortMode::DateAsc);
        assert_eq!(digest.series[0].series.series_name, "Alpha");
        assert_eq!(digest.movies[0].movie.name, "Old");
    }

    #[tokio::test]
    async fn test_counts_and_serialization() {
        let provider = RecordingProvider::default();
        let digest = build_digest(&provider, added(), 30, SortMode::NameAsc, now()).await;
        assert!(!digest.is_empty());
        assert_eq!(digest.episode_count(), 1);

        let json = serde_json::to_value(&digest).unwrap();
        assert_eq!(json["observed_period_days"], 30);
        assert_eq!(json["movies"][0]["name"], "Old");
        assert_eq!(json["movies"][0]["details"]["overview"], "about Old");
        assert_eq!(json["series"][1]["new_seasons"][0]["episodes"][0]["episode_number"], 1);
    }
}
