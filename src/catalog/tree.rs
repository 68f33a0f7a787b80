//! Series → season → episode reconstruction
//!
//! The item source returns every series, season and episode of a folder as a
//! flat list. The builder groups the records by kind and rebuilds the
//! hierarchy as owned maps keyed by item id:
//!
//! 1. series records become [`Series`] entries
//! 2. seasons are attached to the series they declare
//! 3. physically stored episodes are attached to their season
//!
//! Records whose parent is missing or not part of the batch are dropped with
//! a warning. The upstream catalog is eventually consistent, so orphans are
//! expected and never treated as errors.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{trace, warn};

use super::record::{MediaKind, MediaRecord};

/// Name used when a series or season carries none
pub const UNKNOWN_NAME: &str = "Unknown";

/// Reconstructed series, keyed by series id in a [`SeriesTree`]
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub creation_date: DateTime<Utc>,
    pub production_year: i32,
    pub external_media_id: String,
    pub seasons: HashMap<String, Season>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Season {
    pub name: String,
    pub creation_date: DateTime<Utc>,
    pub season_number: i32,
    pub episodes: HashMap<String, Episode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Episode {
    pub name: String,
    pub creation_date: DateTime<Utc>,
    pub episode_number: i32,
}

/// Series id → series
pub type SeriesTree = HashMap<String, Series>;

/// Builds a [`SeriesTree`] from flat records.
///
/// Items without a creation date get the `missing_date` sentinel (the Unix
/// epoch unless overridden), which keeps them from ever being reported as new
/// on their own date. Every substitution is logged.
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    missing_date: DateTime<Utc>,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self {
            missing_date: DateTime::UNIX_EPOCH,
        }
    }
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the date assumed for items that carry none
    pub fn with_missing_date(mut self, sentinel: DateTime<Utc>) -> Self {
        self.missing_date = sentinel;
        self
    }

    /// Rebuild the hierarchy. Never fails; anomalies are logged and skipped.
    pub fn build(&self, records: &[MediaRecord]) -> SeriesTree {
        let mut series_records = Vec::new();
        let mut season_records = Vec::new();
        let mut episode_records = Vec::new();

        for record in records {
            match record.kind {
                MediaKind::Series => series_records.push(record),
                MediaKind::Season => season_records.push(record),
                MediaKind::Episode => episode_records.push(record),
                MediaKind::Movie => {
                    trace!(item_id = %record.id, "Movie record ignored while building series tree");
                }
            }
        }

        // Later passes look up parents created by earlier ones
        let mut tree = SeriesTree::new();
        for record in series_records {
            self.attach_series(&mut tree, record);
        }
        for record in season_records {
            self.attach_season(&mut tree, record);
        }
        for record in episode_records {
            self.attach_episode(&mut tree, record);
        }

        tree
    }

    fn attach_series(&self, tree: &mut SeriesTree, record: &MediaRecord) {
        let name = record
            .name
            .clone()
            .unwrap_or_else(|| UNKNOWN_NAME.to_string());

        let creation_date = record.creation_date.unwrap_or_else(|| {
            warn!(
                series_id = %record.id,
                series_name = %name,
                assumed_date = %self.missing_date,
                "Series has no creation date, using the fallback date"
            );
            self.missing_date
        });

        tree.insert(
            record.id.clone(),
            Series {
                name,
                creation_date,
                production_year: record.production_year.unwrap_or(0),
                external_media_id: record.external_media_id(),
                seasons: HashMap::new(),
            },
        );
    }

    fn attach_season(&self, tree: &mut SeriesTree, record: &MediaRecord) {
        let name = record
            .name
            .clone()
            .unwrap_or_else(|| UNKNOWN_NAME.to_string());

        let Some(series_id) = record.parent_series_id.as_deref() else {
            warn!(
                season_id = %record.id,
                season_name = %name,
                "Season ignored: season has no parent series"
            );
            return;
        };

        let Some(series) = tree.get_mut(series_id) else {
            warn!(
                season_id = %record.id,
                season_name = %name,
                series_id = %series_id,
                series_name = record.parent_series_name.as_deref().unwrap_or(""),
                "Season ignored: season references unknown series"
            );
            return;
        };

        let creation_date = record.creation_date.unwrap_or_else(|| {
            warn!(
                season_id = %record.id,
                season_name = %name,
                series_id = %series_id,
                assumed_date = %self.missing_date,
                "Season has no creation date"
            );
            self.missing_date
        });

        series.seasons.insert(
            record.id.clone(),
            Season {
                name,
                creation_date,
                season_number: record.index_number.unwrap_or(0),
                episodes: HashMap::new(),
            },
        );
    }

    fn attach_episode(&self, tree: &mut SeriesTree, record: &MediaRecord) {
        if !record.is_physically_stored {
            trace!(episode_id = %record.id, "Virtual episode ignored");
            return;
        }

        let (Some(series_id), Some(season_id)) = (
            record.parent_series_id.as_deref(),
            record.parent_season_id.as_deref(),
        ) else {
            warn!(
                episode_id = %record.id,
                episode_name = record.name.as_deref().unwrap_or(""),
                series_id = record.parent_series_id.as_deref().unwrap_or(""),
                season_id = record.parent_season_id.as_deref().unwrap_or(""),
                "Episode ignored: episode has no parent series or season"
            );
            return;
        };

        let Some(series) = tree.get_mut(series_id) else {
            warn!(
                episode_id = %record.id,
                episode_name = record.name.as_deref().unwrap_or(""),
                series_id = %series_id,
                series_name = record.parent_series_name.as_deref().unwrap_or(""),
                "Episode ignored: episode references unknown series"
            );
            return;
        };

        let Some(season) = series.seasons.get_mut(season_id) else {
            warn!(
                episode_id = %record.id,
                episode_name = record.name.as_deref().unwrap_or(""),
                series_id = %series_id,
                season_id = %season_id,
                "Episode ignored: episode references unknown season"
            );
            return;
        };

        let name = record.name.clone().unwrap_or_default();
        let creation_date = record.creation_date.unwrap_or_else(|| {
            warn!(
                episode_id = %record.id,
                episode_name = %name,
                season_id = %season_id,
                assumed_date = %self.missing_date,
                "Episode has no creation date"
            );
            self.missing_date
        });

        season.episodes.insert(
            record.id.clone(),
            Episode {
                name,
                creation_date,
                episode_number: record.index_number.unwrap_or(0),
            },
        );
    }
}

/// Build a tree with the default epoch sentinel
pub fn build_series_tree(records: &[MediaRecord]) -> SeriesTree {
    TreeBuilder::default().build(records)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use tracing_test::traced_test;

    use super::*;

    fn date(days_ago: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap() - Duration::days(days_ago)
    }

    #[test]
    fn test_builds_full_hierarchy() {
        let records = vec![
            MediaRecord::episode("e1", "s1", "s1-1")
                .with_name("Pilot")
                .with_index(1)
                .created_at(date(3)),
            MediaRecord::season("s1-1", "s1")
                .with_name("Season 1")
                .with_index(1)
                .created_at(date(4)),
            MediaRecord::series("s1")
                .with_name("Show")
                .with_production_year(2021)
                .with_provider_id("Tmdb", "1399")
                .created_at(date(5)),
        ];

        let tree = build_series_tree(&records);
        let series = &tree["s1"];
        assert_eq!(series.name, "Show");
        assert_eq!(series.production_year, 2021);
        assert_eq!(series.external_media_id, "1399");

        let season = &series.seasons["s1-1"];
        assert_eq!(season.season_number, 1);
        assert_eq!(season.episodes["e1"].name, "Pilot");
        assert_eq!(season.episodes["e1"].episode_number, 1);
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let records = vec![
            MediaRecord::series("s1"),
            MediaRecord::season("s1-1", "s1"),
            MediaRecord::episode("e1", "s1", "s1-1"),
        ];

        let tree = build_series_tree(&records);
        let series = &tree["s1"];
        assert_eq!(series.name, UNKNOWN_NAME);
        assert_eq!(series.creation_date, DateTime::UNIX_EPOCH);
        assert_eq!(series.production_year, 0);
        assert_eq!(series.external_media_id, "");

        let season = &series.seasons["s1-1"];
        assert_eq!(season.name, UNKNOWN_NAME);
        assert_eq!(season.season_number, 0);

        let episode = &season.episodes["e1"];
        assert_eq!(episode.name, "");
        assert_eq!(episode.creation_date, DateTime::UNIX_EPOCH);
        assert_eq!(episode.episode_number, 0);
    }

    #[test]
    #[traced_test]
    fn test_missing_season_date_is_logged() {
        let tree = build_series_tree(&[
            MediaRecord::series("s1").created_at(date(10)),
            MediaRecord::season("season-nodate", "s1").with_name("Season 3"),
        ]);

        assert_eq!(tree["s1"].seasons["season-nodate"].creation_date, DateTime::UNIX_EPOCH);
        assert!(logs_contain("Season has no creation date"));
        assert!(logs_contain("season-nodate"));
        assert!(logs_contain("Season 3"));
    }

    #[test]
    #[traced_test]
    fn test_missing_episode_date_is_logged() {
        let tree = build_series_tree(&[
            MediaRecord::series("s1").created_at(date(10)),
            MediaRecord::season("s1-1", "s1").created_at(date(10)),
            MediaRecord::episode("episode-nodate", "s1", "s1-1").with_name("Finale"),
        ]);

        let episode = &tree["s1"].seasons["s1-1"].episodes["episode-nodate"];
        assert_eq!(episode.creation_date, DateTime::UNIX_EPOCH);
        assert!(logs_contain("Episode has no creation date"));
        assert!(logs_contain("episode-nodate"));
        assert!(logs_contain("Finale"));
        assert!(!logs_contain("Season has no creation date"));
    }

    #[test]
    fn test_custom_missing_date_sentinel() {
        let sentinel = date(1000);
        let tree = TreeBuilder::new()
            .with_missing_date(sentinel)
            .build(&[MediaRecord::series("s1")]);
        assert_eq!(tree["s1"].creation_date, sentinel);
    }

    #[test]
    #[traced_test]
    fn test_missing_series_date_is_logged() {
        build_series_tree(&[MediaRecord::series("s-nodate").with_name("Dateless")]);
        assert!(logs_contain("Series has no creation date"));
        assert!(logs_contain("s-nodate"));
        assert!(logs_contain("Dateless"));
    }

    #[test]
    #[traced_test]
    fn test_season_without_parent_is_dropped() {
        let mut orphan = MediaRecord::new("lonely", MediaKind::Season).created_at(date(1));
        orphan.parent_series_id = None;

        let tree = build_series_tree(&[MediaRecord::series("s1").created_at(date(1)), orphan]);
        assert!(tree["s1"].seasons.is_empty());
        assert!(logs_contain("season has no parent series"));
    }

    #[test]
    #[traced_test]
    fn test_season_with_unknown_series_is_not_merged_elsewhere() {
        let mut orphan = MediaRecord::season("orphan-season", "ghost")
            .with_name("Season 9")
            .created_at(date(1));
        orphan.parent_series_name = Some("Ghost Show".to_string());

        let records = vec![MediaRecord::series("s1").created_at(date(1)), orphan];
        let tree = build_series_tree(&records);

        assert_eq!(tree.len(), 1);
        assert!(tree["s1"].seasons.is_empty());
        assert!(logs_contain("season references unknown series"));
        assert!(logs_contain("Ghost Show"));
    }

    #[test]
    fn test_virtual_episodes_are_ignored() {
        let records = vec![
            MediaRecord::series("s1").created_at(date(100)),
            MediaRecord::season("s1-1", "s1").created_at(date(100)),
            MediaRecord::episode("e-virtual", "s1", "s1-1")
                .created_at(date(1))
                .virtual_item(),
            MediaRecord::episode("e-real", "s1", "s1-1").created_at(date(1)),
        ];

        let tree = build_series_tree(&records);
        let episodes = &tree["s1"].seasons["s1-1"].episodes;
        assert_eq!(episodes.len(), 1);
        assert!(episodes.contains_key("e-real"));
    }

    #[test]
    #[traced_test]
    fn test_orphan_episodes_are_dropped() {
        let mut no_season = MediaRecord::episode("e-noseason", "s1", "x").created_at(date(1));
        no_season.parent_season_id = None;

        let records = vec![
            MediaRecord::series("s1").created_at(date(100)),
            MediaRecord::season("s1-1", "s1").created_at(date(100)),
            no_season,
            MediaRecord::episode("e-ghost-series", "ghost", "s1-1").created_at(date(1)),
            MediaRecord::episode("e-ghost-season", "s1", "ghost-season").created_at(date(1)),
        ];

        let tree = build_series_tree(&records);
        assert!(tree["s1"].seasons["s1-1"].episodes.is_empty());
        assert!(logs_contain("episode has no parent series or season"));
        assert!(logs_contain("episode references unknown series"));
        assert!(logs_contain("episode references unknown season"));
    }

    #[test]
    fn test_episode_cannot_attach_to_season_of_another_series() {
        let records = vec![
            MediaRecord::series("a").created_at(date(100)),
            MediaRecord::series("b").created_at(date(100)),
            MediaRecord::season("a-1", "a").created_at(date(100)),
            MediaRecord::episode("e1", "b", "a-1").created_at(date(1)),
        ];

        let tree = build_series_tree(&records);
        assert!(tree["a"].seasons["a-1"].episodes.is_empty());
        assert!(tree["b"].seasons.is_empty());
    }

    #[test]
    fn test_movies_are_not_part_of_the_tree() {
        let tree = build_series_tree(&[MediaRecord::movie("m1").created_at(date(1))]);
        assert!(tree.is_empty());
    }
}
