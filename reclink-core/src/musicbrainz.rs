use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::SuggestConfig;
use crate::models::{AppearsOn, Recording};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("MusicBrainz API returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Failed to parse response: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("MusicBrainz error: {0}")]
    Api(String),
}

/// Entity types the search endpoint is queried for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchEntity {
    Recording,
}

impl SearchEntity {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchEntity::Recording => "recording",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub entity: SearchEntity,
    pub query: String,
    pub limit: u32,
    pub offset: u32,
}

impl SearchRequest {
    pub fn recordings(query: impl Into<String>, limit: u32, offset: u32) -> Self {
        Self {
            entity: SearchEntity::Recording,
            query: query.into(),
            limit,
            offset,
        }
    }
}

/// One page of search results.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchPage {
    /// Total number of hits for the query, across all pages.
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub recordings: Vec<RecordingRecord>,
}

/// Raw recording as returned by the search endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordingRecord {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub length: Option<u64>,
    #[serde(default, rename = "artist-credit")]
    pub artist_credit: Vec<ArtistCreditRecord>,
    #[serde(default)]
    pub disambiguation: String,
    #[serde(default)]
    pub video: Option<bool>,
    pub releases: Option<Vec<ReleaseRecord>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistCreditRecord {
    pub name: String,
    #[serde(default)]
    pub joinphrase: String,
    pub artist: Option<ArtistRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseRecord {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "release-group")]
    pub release_group: Option<ReleaseGroupRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseGroupRecord {
    pub id: String,
}

impl RecordingRecord {
    /// Artist credit joined into one display string.
    pub fn artist_display(&self) -> String {
        self.artist_credit
            .iter()
            .map(|credit| format!("{}{}", credit.name, credit.joinphrase))
            .collect()
    }

    /// Releases summarized one per release group, in response order.
    /// Releases without a release group count as their own group.
    pub fn appears_on(&self) -> Option<Vec<AppearsOn>> {
        let releases = self.releases.as_ref()?;
        let mut seen = HashSet::new();
        Some(
            releases
                .iter()
                .filter_map(|release| {
                    let group_id = release
                        .release_group
                        .as_ref()
                        .map_or(release.id.as_str(), |rg| rg.id.as_str());
                    seen.insert(group_id.to_string()).then(|| AppearsOn {
                        release_id: release.id.clone(),
                        release_title: release.title.clone(),
                        release_group_id: group_id.to_string(),
                    })
                })
                .collect(),
        )
    }

    pub fn to_recording(&self) -> Recording {
        Recording {
            id: self.id.clone(),
            name: self.title.clone(),
            length: self.length,
            artist: self.artist_display(),
            comment: self.disambiguation.clone(),
            video: self.video.unwrap_or(false),
            appears_on: self.appears_on(),
        }
    }
}

/// Full-text search backend the suggestion engine queries.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<SearchPage, SearchError>;
}

/// [`SearchBackend`] over the MusicBrainz web service.
pub struct MusicBrainzClient {
    client: reqwest::Client,
    base_url: String,
    rate_limit: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl MusicBrainzClient {
    pub fn new(config: &SuggestConfig) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            rate_limit: config.rate_limit(),
            last_request: Mutex::new(None),
        })
    }

    /// Keep requests at least `rate_limit` apart.
    async fn wait_for_rate_limit(&self) {
        let mut last_request = self.last_request.lock().await;
        if let Some(last) = *last_request {
            let elapsed = last.elapsed();
            if elapsed < self.rate_limit {
                tokio::time::sleep(self.rate_limit - elapsed).await;
            }
        }
        *last_request = Some(Instant::now());
    }
}

#[async_trait]
impl SearchBackend for MusicBrainzClient {
    async fn search(&self, request: &SearchRequest) -> Result<SearchPage, SearchError> {
        let url = format!("{}/{}", self.base_url, request.entity.as_str());
        let limit = request.limit.to_string();
        let offset = request.offset.to_string();
        debug!(
            "MusicBrainz API request: {} query={} limit={} offset={}",
            url, request.query, limit, offset
        );

        self.wait_for_rate_limit().await;

        let response = self
            .client
            .get(&url)
            .query(&[
                ("query", request.query.as_str()),
                ("limit", limit.as_str()),
                ("offset", offset.as_str()),
                ("fmt", "json"),
            ])
            .header("Accept", "application/json")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!("MusicBrainz API error response ({}): {}", status, body);
            return Err(SearchError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let body = response.text().await?;
        parse_search_page(&body)
    }
}

/// Parse a search response body, surfacing an `error` member as an API error.
pub fn parse_search_page(body: &str) -> Result<SearchPage, SearchError> {
    let json: serde_json::Value = serde_json::from_str(body)?;
    if let Some(error_msg) = json.get("error").and_then(|e| e.as_str()) {
        return Err(SearchError::Api(error_msg.to_string()));
    }
    let page: SearchPage = serde_json::from_value(json)?;
    debug!(
        "MusicBrainz search response: {} of {} recordings at offset {}",
        page.recordings.len(),
        page.count,
        page.offset
    );
    Ok(page)
}
