use std::fmt;

use serde::{Deserialize, Serialize};

pub const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

pub fn watch_url(video_id: &str) -> String {
    format!("{WATCH_URL_PREFIX}{video_id}")
}

/// Like count of one video as seen by the statistics lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeCount {
    Count(u64),
    /// The owner hides the count, or the server did not report it.
    Hidden,
    /// The batch lookup carrying this video failed.
    Error,
}

impl LikeCount {
    pub fn as_number(&self) -> Option<u64> {
        match self {
            LikeCount::Count(value) => Some(*value),
            LikeCount::Hidden | LikeCount::Error => None,
        }
    }
}

impl fmt::Display for LikeCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LikeCount::Count(value) => write!(f, "{value}"),
            LikeCount::Hidden => f.write_str("N/A"),
            LikeCount::Error => f.write_str("Error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoRecord {
    pub title: String,
    pub video_id: String,
    pub likes: LikeCount,
}

impl VideoRecord {
    pub fn url(&self) -> String {
        watch_url(&self.video_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataUpdate {
    pub title: String,
    pub video_id: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub skipped: u64,
}

impl RunSummary {
    pub fn record_success(&mut self) {
        self.attempted += 1;
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self) {
        self.attempted += 1;
        self.failed += 1;
    }

    pub fn record_skip(&mut self) {
        self.attempted += 1;
        self.skipped += 1;
    }
}

// Wire payloads of the YouTube Data API v3.

#[derive(Debug, Clone, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelItem {
    pub content_details: Option<ChannelContentDetails>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelContentDetails {
    #[serde(default)]
    pub related_playlists: RelatedPlaylists,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelatedPlaylists {
    pub uploads: Option<String>,
}

impl ChannelItem {
    pub fn uploads_playlist_id(&self) -> Option<&str> {
        self.content_details
            .as_ref()?
            .related_playlists
            .uploads
            .as_deref()
            .filter(|id| !id.trim().is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub snippet: PlaylistItemSnippet,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemSnippet {
    pub title: Option<String>,
    pub published_at: Option<String>,
    #[serde(default)]
    pub resource_id: ResourceId,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceId {
    pub video_id: Option<String>,
}

impl PlaylistItem {
    pub fn video_id(&self) -> Option<&str> {
        self.snippet
            .resource_id
            .video_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    pub fn title(&self) -> &str {
        self.snippet.title.as_deref().unwrap_or("Untitled")
    }
}

pub type PlaylistItemPage = ListResponse<PlaylistItem>;

#[derive(Debug, Clone, Deserialize)]
pub struct VideoStatisticsItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub statistics: VideoStatistics,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatistics {
    /// The API encodes counters as decimal strings.
    pub like_count: Option<String>,
}

impl VideoStatisticsItem {
    pub fn like_count(&self) -> LikeCount {
        self.statistics
            .like_count
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .map(LikeCount::Count)
            .unwrap_or(LikeCount::Hidden)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoSnippetItem {
    #[serde(default)]
    pub id: String,
    pub snippet: Option<VideoSnippet>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
}

/// Body of `videos.update` with `part=snippet`. The snippet replaces the
/// stored one as a whole, so the category has to be sent back.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoUpdateRequest {
    pub id: String,
    pub snippet: VideoUpdateSnippet,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoUpdateSnippet {
    pub title: String,
    pub description: String,
    pub category_id: String,
}

impl VideoUpdateRequest {
    pub fn new(update: &MetadataUpdate, category_id: &str) -> Self {
        Self {
            id: update.video_id.clone(),
            snippet: VideoUpdateSnippet {
                title: update.title.clone(),
                description: update.description.clone(),
                category_id: category_id.to_string(),
            },
        }
    }
}
