//! Item source abstraction
//!
//! The classifier never talks to a media server directly; it consumes flat
//! records through this trait. [`JellyfinClient`](crate::services::jellyfin::JellyfinClient)
//! is the production implementation, tests use in-memory sources.

use async_trait::async_trait;
use thiserror::Error;

use super::record::MediaRecord;

/// Failure of a single item source call
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("media server returned no top-level folders")]
    NoFolders,

    #[error("no folder named '{0}' on the media server")]
    FolderNotFound(String),

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("media server answered {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("could not decode media server response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Read access to a media library, one folder at a time
#[async_trait]
pub trait ItemSource: Send + Sync {
    /// Resolve a top-level folder name to its opaque id
    async fn resolve_folder_id(&self, folder_name: &str) -> Result<String, SourceError>;

    /// Every series, season and episode under a folder, recursively
    async fn fetch_folder_items(&self, folder_id: &str) -> Result<Vec<MediaRecord>, SourceError>;

    /// Physically stored movies under a folder, recursively
    async fn fetch_folder_movies(&self, folder_id: &str)
    -> Result<Vec<MediaRecord>, SourceError>;
}
