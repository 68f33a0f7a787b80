//! Flat media records as returned by an item source
//!
//! One record per series, season, episode or movie. Records are read-only
//! inputs to the tree builder and the classifier.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

/// Provider-id key under which the TMDB identifier is stored
pub const TMDB_PROVIDER_KEY: &str = "Tmdb";

/// Declared kind of a catalog item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Series,
    Season,
    Episode,
    Movie,
}

impl MediaKind {
    /// Map an upstream item type name onto a kind, if it is one we track
    pub fn from_item_type(value: &str) -> Option<Self> {
        match value {
            "Series" => Some(MediaKind::Series),
            "Season" => Some(MediaKind::Season),
            "Episode" => Some(MediaKind::Episode),
            "Movie" => Some(MediaKind::Movie),
            _ => None,
        }
    }
}

/// A single catalog entry
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRecord {
    pub id: String,
    pub kind: MediaKind,
    pub name: Option<String>,
    pub creation_date: Option<DateTime<Utc>>,
    pub production_year: Option<i32>,
    pub provider_ids: HashMap<String, String>,
    pub parent_series_id: Option<String>,
    /// Parent series name as declared by the upstream item (seasons, episodes)
    pub parent_series_name: Option<String>,
    pub parent_season_id: Option<String>,
    /// Season number for seasons, episode number for episodes
    pub index_number: Option<i32>,
    /// False for virtual/placeholder items with no media file behind them
    pub is_physically_stored: bool,
}

impl MediaRecord {
    /// Bare record of the given kind, physically stored, with every optional field unset
    pub fn new(id: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            id: id.into(),
            kind,
            name: None,
            creation_date: None,
            production_year: None,
            provider_ids: HashMap::new(),
            parent_series_id: None,
            parent_series_name: None,
            parent_season_id: None,
            index_number: None,
            is_physically_stored: true,
        }
    }

    pub fn series(id: impl Into<String>) -> Self {
        Self::new(id, MediaKind::Series)
    }

    pub fn season(id: impl Into<String>, series_id: impl Into<String>) -> Self {
        Self {
            parent_series_id: Some(series_id.into()),
            ..Self::new(id, MediaKind::Season)
        }
    }

    pub fn episode(
        id: impl Into<String>,
        series_id: impl Into<String>,
        season_id: impl Into<String>,
    ) -> Self {
        Self {
            parent_series_id: Some(series_id.into()),
            parent_season_id: Some(season_id.into()),
            ..Self::new(id, MediaKind::Episode)
        }
    }

    pub fn movie(id: impl Into<String>) -> Self {
        Self::new(id, MediaKind::Movie)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn created_at(mut self, date: DateTime<Utc>) -> Self {
        self.creation_date = Some(date);
        self
    }

    pub fn with_production_year(mut self, year: i32) -> Self {
        self.production_year = Some(year);
        self
    }

    pub fn with_index(mut self, index: i32) -> Self {
        self.index_number = Some(index);
        self
    }

    pub fn with_provider_id(mut self, provider: impl Into<String>, id: impl Into<String>) -> Self {
        self.provider_ids.insert(provider.into(), id.into());
        self
    }

    /// Mark the record as a virtual placeholder (no file on disk)
    pub fn virtual_item(mut self) -> Self {
        self.is_physically_stored = false;
        self
    }

    /// Raw TMDB identifier from the provider table, empty when absent.
    ///
    /// Kept as the provider's string; enrichment decides how to interpret it.
    pub fn external_media_id(&self) -> String {
        self.provider_ids
            .get(TMDB_PROVIDER_KEY)
            .cloned()
            .unwrap_or_default()
    }
}
