//! Catalog freshness: flat records in, "what is new" out

pub mod aggregator;
pub mod classifier;
pub mod record;
pub mod source;
pub mod tree;

pub use aggregator::{DEFAULT_MAX_CONCURRENT_FOLDERS, FolderAggregator, NewlyAdded};
pub use classifier::{
    CUTOFF_GRACE_DAYS, ClassifiedEpisode, ClassifiedMovie, ClassifiedSeason, ClassifiedSeries,
    Cutoff, classify_movies, classify_series,
};
pub use record::{MediaKind, MediaRecord, TMDB_PROVIDER_KEY};
pub use source::{ItemSource, SourceError};
pub use tree::{Episode, Season, Series, SeriesTree, TreeBuilder, build_series_tree};
