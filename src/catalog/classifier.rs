//! Freshness classification
//!
//! Decides what counts as newly added, reporting each change at the coarsest
//! level that covers it: a new series hides its seasons, a new season hides
//! its episodes. Comparisons are strictly-after the cutoff; an item created
//! exactly at the cutoff instant is not new.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use super::record::{MediaKind, MediaRecord};
use super::tree::{Season, Series, SeriesTree};

/// Days added to the observation window when computing the cutoff.
///
/// Zero means the cutoff is exactly `now - observed_period_days`.
pub const CUTOFF_GRACE_DAYS: i64 = 0;

/// The instant separating "new" from "not new" for a whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Cutoff(DateTime<Utc>);

impl Cutoff {
    /// `now - (observed_period_days + CUTOFF_GRACE_DAYS)`
    ///
    /// A window reaching past the earliest representable date is clamped to
    /// it, which makes every dated item new.
    pub fn from_observation_window(now: DateTime<Utc>, observed_period_days: u32) -> Self {
        let window = Duration::try_days(i64::from(observed_period_days) + CUTOFF_GRACE_DAYS);
        match window.and_then(|window| now.checked_sub_signed(window)) {
            Some(cutoff) => Self(cutoff),
            None => {
                warn!(
                    observed_period_days = observed_period_days,
                    "Observation window exceeds the supported date range, cutoff clamped"
                );
                Self(DateTime::<Utc>::MIN_UTC)
            }
        }
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.0
    }

    pub fn is_new(&self, creation_date: DateTime<Utc>) -> bool {
        creation_date > self.0
    }
}

/// A series with something new in it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedSeries {
    pub series_id: String,
    pub series_name: String,
    pub external_media_id: String,
    pub production_year: i32,
    pub creation_date: DateTime<Utc>,
    pub is_series_new: bool,
    /// Only set when the series itself is not new
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_seasons: Option<Vec<ClassifiedSeason>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedSeason {
    pub season_id: String,
    pub season_number: i32,
    pub name: String,
    pub creation_date: DateTime<Utc>,
    pub is_season_new: bool,
    /// Only set when the season itself is not new
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episodes: Option<Vec<ClassifiedEpisode>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedEpisode {
    pub episode_id: String,
    pub name: String,
    pub creation_date: DateTime<Utc>,
    pub episode_number: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedMovie {
    pub id: String,
    pub name: String,
    pub creation_date: DateTime<Utc>,
    pub external_media_id: String,
    pub production_year: i32,
}

/// Classify every series of a tree against the cutoff.
///
/// Series come back sorted by name then id, seasons by number, episodes by
/// number.
pub fn classify_series(tree: &SeriesTree, cutoff: Cutoff) -> Vec<ClassifiedSeries> {
    let mut classified: Vec<ClassifiedSeries> = tree
        .iter()
        .filter_map(|(series_id, series)| classify_one_series(series_id, series, cutoff))
        .collect();

    classified.sort_by(|a, b| {
        a.series_name
            .cmp(&b.series_name)
            .then_with(|| a.series_id.cmp(&b.series_id))
    });
    classified
}

fn classify_one_series(
    series_id: &str,
    series: &Series,
    cutoff: Cutoff,
) -> Option<ClassifiedSeries> {
    let mut classified = ClassifiedSeries {
        series_id: series_id.to_string(),
        series_name: series.name.clone(),
        external_media_id: series.external_media_id.clone(),
        production_year: series.production_year,
        creation_date: series.creation_date,
        is_series_new: false,
        new_seasons: None,
    };

    if cutoff.is_new(series.creation_date) {
        classified.is_series_new = true;
        return Some(classified);
    }

    let mut new_seasons: Vec<ClassifiedSeason> = series
        .seasons
        .iter()
        .filter_map(|(season_id, season)| classify_season(season_id, season, cutoff))
        .collect();

    if new_seasons.is_empty() {
        return None;
    }

    new_seasons.sort_by(|a, b| {
        a.season_number
            .cmp(&b.season_number)
            .then_with(|| a.season_id.cmp(&b.season_id))
    });
    classified.new_seasons = Some(new_seasons);
    Some(classified)
}

fn classify_season(season_id: &str, season: &Season, cutoff: Cutoff) -> Option<ClassifiedSeason> {
    let mut classified = ClassifiedSeason {
        season_id: season_id.to_string(),
        season_number: season.season_number,
        name: season.name.clone(),
        creation_date: season.creation_date,
        is_season_new: false,
        episodes: None,
    };

    if cutoff.is_new(season.creation_date) {
        classified.is_season_new = true;
        return Some(classified);
    }

    let mut episodes: Vec<ClassifiedEpisode> = season
        .episodes
        .iter()
        .filter(|(_, episode)| cutoff.is_new(episode.creation_date))
        .map(|(episode_id, episode)| ClassifiedEpisode {
            episode_id: episode_id.clone(),
            name: episode.name.clone(),
            creation_date: episode.creation_date,
            episode_number: episode.episode_number,
        })
        .collect();

    if episodes.is_empty() {
        return None;
    }

    episodes.sort_by(|a, b| {
        a.episode_number
            .cmp(&b.episode_number)
            .then_with(|| a.episode_id.cmp(&b.episode_id))
    });
    classified.episodes = Some(episodes);
    Some(classified)
}

/// Flat, one-level classification of movie records.
///
/// Movies without a creation date are skipped and logged; they are never
/// assumed to be new.
pub fn classify_movies(records: &[MediaRecord], cutoff: Cutoff) -> Vec<ClassifiedMovie> {
    let mut movies = Vec::new();

    for record in records {
        if record.kind != MediaKind::Movie {
            debug!(item_id = %record.id, kind = ?record.kind, "Non-movie record skipped");
            continue;
        }

        let name = record.name.clone().unwrap_or_default();
        let Some(creation_date) = record.creation_date else {
            warn!(
                movie_id = %record.id,
                movie_name = %name,
                "Movie ignored because it has no creation date"
            );
            continue;
        };

        if cutoff.is_new(creation_date) {
            movies.push(ClassifiedMovie {
                id: record.id.clone(),
                name,
                creation_date,
                external_media_id: record.external_media_id(),
                production_year: record.production_year.unwrap_or(0),
            });
        }
    }

    movies.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    movies
}
