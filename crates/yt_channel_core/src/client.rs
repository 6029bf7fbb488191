use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client, RequestBuilder,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::errors::SyncError;
use crate::models::{
    ChannelItem, ListResponse, PlaylistItemPage, VideoSnippet, VideoSnippetItem,
    VideoStatisticsItem, VideoUpdateRequest,
};

pub const API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
pub const CHANNELS_PATH: &str = "/channels";
pub const PLAYLIST_ITEMS_PATH: &str = "/playlistItems";
pub const VIDEOS_PATH: &str = "/videos";

/// Largest page the listing endpoints accept, and the id cap of `videos.list`.
pub const MAX_RESULTS: usize = 50;

pub const DEFAULT_HEADERS: [(&str, &str); 1] = [("accept", "application/json")];

/// Remote calls the sync flows depend on.
#[async_trait]
pub trait ChannelApi {
    /// Id of the authenticated channel's uploads playlist.
    async fn uploads_playlist_id(&self) -> Result<String, SyncError>;

    async fn playlist_items_page(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistItemPage, SyncError>;

    /// One `videos.list?part=statistics` call for at most [`MAX_RESULTS`] ids.
    async fn video_statistics(
        &self,
        ids: &[String],
    ) -> Result<Vec<VideoStatisticsItem>, SyncError>;

    /// Current snippet of one video, `None` when the id is unknown.
    async fn video_snippet(&self, video_id: &str) -> Result<Option<VideoSnippet>, SyncError>;

    async fn update_video_snippet(
        &self,
        request: &VideoUpdateRequest,
    ) -> Result<VideoSnippet, SyncError>;
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub timeout: Duration,
    pub base_url: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            base_url: None,
        }
    }
}

#[derive(Clone)]
pub struct YouTubeClient {
    client: Client,
    base_url: String,
    access_token: String,
}

impl YouTubeClient {
    pub fn new(options: ClientOptions, access_token: &str) -> Result<Self, SyncError> {
        let mut headers = HeaderMap::new();
        for (name, value) in DEFAULT_HEADERS.iter() {
            headers.insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }

        let client = Client::builder()
            .timeout(options.timeout)
            .default_headers(headers)
            .build()
            .map_err(SyncError::Request)?;

        let base_url = options
            .base_url
            .as_deref()
            .unwrap_or(API_BASE_URL)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            base_url,
            access_token: access_token.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, SyncError> {
        debug!(path, "GET");
        let mut req = self.client.get(self.url(path));
        for (k, v) in params {
            req = req.query(&[(k, v.as_str())]);
        }
        self.send(req).await
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, SyncError> {
        let response = req
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(SyncError::Request)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(SyncError::Request)?;
        if !status.is_success() {
            return Err(SyncError::Api {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }
        serde_json::from_slice(&bytes).map_err(|err| SyncError::InvalidJson(err.to_string()))
    }
}

#[async_trait]
impl ChannelApi for YouTubeClient {
    async fn uploads_playlist_id(&self) -> Result<String, SyncError> {
        let payload: ListResponse<ChannelItem> = self
            .get(
                CHANNELS_PATH,
                &[
                    ("part", "contentDetails".to_string()),
                    ("mine", "true".to_string()),
                ],
            )
            .await?;
        payload
            .items
            .first()
            .and_then(ChannelItem::uploads_playlist_id)
            .map(str::to_string)
            .ok_or(SyncError::Resolution)
    }

    async fn playlist_items_page(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistItemPage, SyncError> {
        let mut params = vec![
            ("part", "snippet".to_string()),
            ("playlistId", playlist_id.to_string()),
            ("maxResults", MAX_RESULTS.to_string()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }
        self.get(PLAYLIST_ITEMS_PATH, &params).await
    }

    async fn video_statistics(
        &self,
        ids: &[String],
    ) -> Result<Vec<VideoStatisticsItem>, SyncError> {
        let payload: ListResponse<VideoStatisticsItem> = self
            .get(
                VIDEOS_PATH,
                &[("part", "statistics".to_string()), ("id", ids.join(","))],
            )
            .await?;
        Ok(payload.items)
    }

    async fn video_snippet(&self, video_id: &str) -> Result<Option<VideoSnippet>, SyncError> {
        let payload: ListResponse<VideoSnippetItem> = self
            .get(
                VIDEOS_PATH,
                &[("part", "snippet".to_string()), ("id", video_id.to_string())],
            )
            .await?;
        Ok(payload.items.into_iter().next().and_then(|item| item.snippet))
    }

    async fn update_video_snippet(
        &self,
        request: &VideoUpdateRequest,
    ) -> Result<VideoSnippet, SyncError> {
        debug!(video_id = %request.id, "PUT videos");
        let req = self
            .client
            .put(self.url(VIDEOS_PATH))
            .query(&[("part", "snippet")])
            .json(request);
        let updated: VideoSnippetItem = self.send(req).await?;
        Ok(updated.snippet.unwrap_or_else(|| VideoSnippet {
            title: request.snippet.title.clone(),
            description: request.snippet.description.clone(),
            category_id: Some(request.snippet.category_id.clone()),
        }))
    }
}
