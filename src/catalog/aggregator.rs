//! Per-folder aggregation
//!
//! Runs the tree builder and classifier for every watched folder and merges
//! the results. A folder that cannot be resolved or fetched is logged and
//! left out; it never aborts its siblings. Folders are fetched concurrently,
//! at most `max_concurrent_folders` at a time, and the merged output is
//! sorted so it does not depend on completion order.

use std::future::Future;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, error, info};

use super::classifier::{
    ClassifiedMovie, ClassifiedSeries, Cutoff, classify_movies, classify_series,
};
use super::source::{ItemSource, SourceError};
use super::tree::TreeBuilder;

pub const DEFAULT_MAX_CONCURRENT_FOLDERS: usize = 4;

/// Everything new across all watched folders for one cutoff
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewlyAdded {
    pub cutoff: Cutoff,
    pub series: Vec<ClassifiedSeries>,
    pub movies: Vec<ClassifiedMovie>,
}

impl NewlyAdded {
    pub fn is_empty(&self) -> bool {
        self.series.is_empty() && self.movies.is_empty()
    }
}

pub struct FolderAggregator {
    source: Arc<dyn ItemSource>,
    tree_builder: TreeBuilder,
    max_concurrent_folders: usize,
}

impl FolderAggregator {
    pub fn new(source: Arc<dyn ItemSource>) -> Self {
        Self {
            source,
            tree_builder: TreeBuilder::default(),
            max_concurrent_folders: DEFAULT_MAX_CONCURRENT_FOLDERS,
        }
    }

    pub fn with_tree_builder(mut self, tree_builder: TreeBuilder) -> Self {
        self.tree_builder = tree_builder;
        self
    }

    /// Zero is treated as one
    pub fn with_max_concurrent_folders(mut self, limit: usize) -> Self {
        self.max_concurrent_folders = limit.max(1);
        self
    }

    /// Collect new series and movies against a single, already fixed cutoff
    pub async fn collect(
        &self,
        series_folders: &[String],
        movie_folders: &[String],
        cutoff: Cutoff,
    ) -> NewlyAdded {
        let (series, movies) = tokio::join!(
            self.newly_added_series(series_folders, cutoff),
            self.recently_added_movies(movie_folders, cutoff),
        );

        NewlyAdded {
            cutoff,
            series,
            movies,
        }
    }

    pub async fn newly_added_series(
        &self,
        folders: &[String],
        cutoff: Cutoff,
    ) -> Vec<ClassifiedSeries> {
        let mut series = self
            .gather(folders, "series", |folder| {
                self.series_in_folder(folder, cutoff)
            })
            .await;

        series.sort_by(|a, b| {
            a.series_name
                .cmp(&b.series_name)
                .then_with(|| a.series_id.cmp(&b.series_id))
        });
        series
    }

    pub async fn recently_added_movies(
        &self,
        folders: &[String],
        cutoff: Cutoff,
    ) -> Vec<ClassifiedMovie> {
        let mut movies = self
            .gather(folders, "movies", |folder| {
                self.movies_in_folder(folder, cutoff)
            })
            .await;

        movies.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        movies
    }

    async fn series_in_folder(
        &self,
        folder_name: String,
        cutoff: Cutoff,
    ) -> Result<Vec<ClassifiedSeries>, SourceError> {
        debug!(
            folder = %folder_name,
            cutoff = %cutoff.instant(),
            "Searching for recently added series"
        );

        let folder_id = self.source.resolve_folder_id(&folder_name).await?;
        let items = self.source.fetch_folder_items(&folder_id).await?;
        let tree = self.tree_builder.build(&items);

        Ok(classify_series(&tree, cutoff))
    }

    async fn movies_in_folder(
        &self,
        folder_name: String,
        cutoff: Cutoff,
    ) -> Result<Vec<ClassifiedMovie>, SourceError> {
        debug!(
            folder = %folder_name,
            cutoff = %cutoff.instant(),
            "Searching for recently added movies"
        );

        let folder_id = self.source.resolve_folder_id(&folder_name).await?;
        let movies = self.source.fetch_folder_movies(&folder_id).await?;

        Ok(classify_movies(&movies, cutoff))
    }

    /// Per-folder futures own their folder name; the run future must stay `Send`
    async fn gather<T, F, Fut>(&self, folders: &[String], media: &str, fetch: F) -> Vec<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<Vec<T>, SourceError>>,
    {
        let results: Vec<(String, Result<Vec<T>, SourceError>)> =
            stream::iter(folders.to_vec())
                .map(|folder| {
                    let fetching = fetch(folder.clone());
                    async move { (folder, fetching.await) }
                })
                .buffer_unordered(self.max_concurrent_folders)
                .collect()
                .await;

        let mut merged = Vec::new();
        for (folder, result) in results {
            match result {
                Ok(found) => {
                    info!(folder = %folder, media = %media, count = found.len(), "Folder scanned");
                    merged.extend(found);
                }
                Err(e) => {
                    error!(
                        folder = %folder,
                        media = %media,
                        error = %e,
                        "Folder skipped, its items will not be part of this run"
                    );
                }
            }
        }
        merged
    }
}
