//! Jellyfin API client
//!
//! Implements [`ItemSource`] on top of the Jellyfin REST API.
//! Authentication uses the `MediaBrowser Token="..."` authorization scheme.
//!
//! Only the fields the classifier needs are decoded. There is no retry here:
//! a failed call fails the folder it was made for.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::catalog::{ItemSource, MediaKind, MediaRecord, SourceError};
use crate::config::JellyfinConfig;

/// Extra fields requested on item listings; the rest is returned by default
const ITEM_FIELDS: &str = "DateCreated,ProviderIds";

/// `LocationType` of items backed by a file on disk
const LOCATION_FILE_SYSTEM: &str = "FileSystem";

/// Jellyfin API client
pub struct JellyfinClient {
    client: Client,
    base_url: String,
}

/// `GET /Items` envelope
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ItemsResponse {
    #[serde(default)]
    items: Vec<BaseItemDto>,
}

/// Subset of Jellyfin's `BaseItemDto`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BaseItemDto {
    pub id: String,
    pub name: Option<String>,
    #[serde(rename = "Type")]
    pub item_type: Option<String>,
    pub date_created: Option<DateTime<Utc>>,
    pub production_year: Option<i32>,
    #[serde(default)]
    pub provider_ids: HashMap<String, Option<String>>,
    pub series_id: Option<String>,
    pub series_name: Option<String>,
    pub season_id: Option<String>,
    pub index_number: Option<i32>,
    pub location_type: Option<String>,
}

impl BaseItemDto {
    /// Convert into a catalog record. Item types we do not track yield `None`.
    pub fn into_record(self) -> Option<MediaRecord> {
        let kind = MediaKind::from_item_type(self.item_type.as_deref()?)?;

        let provider_ids = self
            .provider_ids
            .into_iter()
            .filter_map(|(provider, id)| id.map(|id| (provider, id)))
            .collect();

        Some(MediaRecord {
            id: self.id,
            kind,
            name: self.name,
            creation_date: self.date_created,
            production_year: self.production_year,
            provider_ids,
            parent_series_id: self.series_id,
            parent_series_name: self.series_name,
            parent_season_id: self.season_id,
            index_number: self.index_number,
            is_physically_stored: self.location_type.as_deref() == Some(LOCATION_FILE_SYSTEM),
        })
    }
}

/// Server identity reported by `/System/Info`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SystemInfo {
    pub server_name: Option<String>,
    pub version: Option<String>,
}

impl JellyfinClient {
    /// Create a client for the configured server
    pub fn new(config: &JellyfinConfig) -> Result<Self> {
        let mut token = HeaderValue::from_str(&format!(
            "MediaBrowser Token=\"{}\"",
            config.api_token.expose()
        ))
        .context("Jellyfin API token contains characters not allowed in an HTTP header")?;
        token.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, token);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Ping the server and read its identity. Called once at startup.
    pub async fn test_connection(&self) -> Result<SystemInfo> {
        let ping_url = self.endpoint("System/Ping");
        let ping = self
            .client
            .post(&ping_url)
            .send()
            .await
            .context("Ping to the Jellyfin API failed, check for network issues")?;

        if !ping.status().is_success() {
            anyhow::bail!("Jellyfin ping failed with status: {}", ping.status());
        }
        debug!(http_status = ping.status().as_u16(), "Successfully pinged the Jellyfin API");

        let info_url = self.endpoint("System/Info");
        let response = self
            .client
            .get(&info_url)
            .send()
            .await
            .context("Failed to connect to the Jellyfin API")?;

        let status = response.status();
        if status.as_u16() == 401 {
            anyhow::bail!("Jellyfin API token is invalid");
        }
        if !status.is_success() {
            anyhow::bail!("Jellyfin system info failed with status: {}", status);
        }

        let system_info: SystemInfo = response
            .json()
            .await
            .context("Failed to parse Jellyfin system info")?;

        info!(
            http_status = status.as_u16(),
            server_name = system_info.server_name.as_deref().unwrap_or("Unknown"),
            api_version = system_info.version.as_deref().unwrap_or("Unknown"),
            "Successfully connected to Jellyfin"
        );

        Ok(system_info)
    }

    async fn get_items(&self, query: &[(&str, &str)]) -> Result<Vec<BaseItemDto>, SourceError> {
        let url = self.endpoint("Items");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|source| SourceError::Http {
                url: url.clone(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(SourceError::Status {
                url,
                status: response.status().as_u16(),
            });
        }

        let body: ItemsResponse = response
            .json()
            .await
            .map_err(|source| SourceError::Decode { url, source })?;

        Ok(body.items)
    }
}

/// Convert DTOs, dropping item types the catalog does not track
fn into_records(items: Vec<BaseItemDto>) -> Vec<MediaRecord> {
    let total = items.len();
    let records: Vec<MediaRecord> = items
        .into_iter()
        .filter_map(BaseItemDto::into_record)
        .collect();

    if records.len() != total {
        debug!(
            total = total,
            ignored = total - records.len(),
            "Ignored items of untracked types"
        );
    }
    records
}

#[async_trait]
impl ItemSource for JellyfinClient {
    async fn resolve_folder_id(&self, folder_name: &str) -> Result<String, SourceError> {
        let folders = self
            .get_items(&[("Recursive", "false"), ("LocationTypes", LOCATION_FILE_SYSTEM)])
            .await?;

        if folders.is_empty() {
            warn!(
                "No folders found. Jellyfin has no collection or folder at all, media should belong in folders"
            );
            return Err(SourceError::NoFolders);
        }

        folders
            .into_iter()
            .find(|folder| folder.name.as_deref() == Some(folder_name))
            .map(|folder| folder.id)
            .ok_or_else(|| {
                warn!(folder = %folder_name, "Folder not found, it will be ignored");
                SourceError::FolderNotFound(folder_name.to_string())
            })
    }

    async fn fetch_folder_items(&self, folder_id: &str) -> Result<Vec<MediaRecord>, SourceError> {
        let items = self
            .get_items(&[
                ("Recursive", "true"),
                ("ParentId", folder_id),
                ("Fields", ITEM_FIELDS),
            ])
            .await?;

        Ok(into_records(items))
    }

    async fn fetch_folder_movies(
        &self,
        folder_id: &str,
    ) -> Result<Vec<MediaRecord>, SourceError> {
        let items = self
            .get_items(&[
                ("Recursive", "true"),
                ("ParentId", folder_id),
                ("IncludeItemTypes", "Movie"),
                ("IsMovie", "true"),
                ("LocationTypes", LOCATION_FILE_SYSTEM),
                ("Fields", ITEM_FIELDS),
            ])
            .await?;

        Ok(into_records(items))
    }
}
