#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use encoding_rs::Encoding;
use serde_json::json;
use yt_channel_core::models::{
    PlaylistItem, PlaylistItemPage, VideoSnippet, VideoStatistics, VideoStatisticsItem,
    VideoUpdateRequest,
};
use yt_channel_core::{ChannelApi, SyncError};

pub type TestResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

pub type CsvRow = HashMap<String, String>;

/// Decodes a written CSV file and maps each row by header name.
pub fn read_csv_rows(path: &Path, encoding: &str) -> TestResult<Vec<CsvRow>> {
    let encoding = Encoding::for_label(encoding.as_bytes()).ok_or("unknown encoding")?;
    let bytes = fs::read(path)?;
    let (text, _, had_errors) = encoding.decode(&bytes);
    if had_errors {
        return Err("file is not valid in the given encoding".into());
    }
    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(
            headers
                .iter()
                .zip(record.iter())
                .map(|(header, value)| (header.to_string(), value.to_string()))
                .collect(),
        );
    }
    Ok(rows)
}

/// One scripted playlist page; `None` makes that request fail.
pub type PageFixture = Option<(Vec<PlaylistItem>, Option<String>)>;

#[derive(Debug, Default)]
pub struct Calls {
    pub page_tokens: Vec<Option<String>>,
    pub statistics: Vec<Vec<String>>,
    pub lookups: Vec<String>,
    pub updates: Vec<VideoUpdateRequest>,
}

/// In-memory channel serving scripted responses and recording every call.
#[derive(Default)]
pub struct FakeChannel {
    pub uploads: Option<String>,
    pub pages: Vec<PageFixture>,
    pub likes: HashMap<String, u64>,
    pub failing_batches: HashSet<usize>,
    pub snippets: HashMap<String, VideoSnippet>,
    pub failing_lookups: HashSet<String>,
    pub failing_updates: HashSet<String>,
    pub calls: Mutex<Calls>,
}

impl FakeChannel {
    pub fn calls(&self) -> std::sync::MutexGuard<'_, Calls> {
        self.calls.lock().unwrap()
    }
}

#[async_trait]
impl ChannelApi for FakeChannel {
    async fn uploads_playlist_id(&self) -> Result<String, SyncError> {
        self.uploads.clone().ok_or(SyncError::Resolution)
    }

    async fn playlist_items_page(
        &self,
        _playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistItemPage, SyncError> {
        let index = {
            let mut calls = self.calls();
            calls.page_tokens.push(page_token.map(str::to_string));
            calls.page_tokens.len() - 1
        };
        match self.pages.get(index).cloned().flatten() {
            Some((items, next_page_token)) => Ok(PlaylistItemPage {
                items,
                next_page_token,
            }),
            None => Err(server_error("backend error")),
        }
    }

    async fn video_statistics(
        &self,
        ids: &[String],
    ) -> Result<Vec<VideoStatisticsItem>, SyncError> {
        let index = {
            let mut calls = self.calls();
            calls.statistics.push(ids.to_vec());
            calls.statistics.len() - 1
        };
        if self.failing_batches.contains(&index) {
            return Err(server_error("backend error"));
        }
        Ok(ids
            .iter()
            .filter_map(|id| {
                self.likes.get(id).map(|likes| VideoStatisticsItem {
                    id: id.clone(),
                    statistics: VideoStatistics {
                        like_count: Some(likes.to_string()),
                    },
                })
            })
            .collect())
    }

    async fn video_snippet(&self, video_id: &str) -> Result<Option<VideoSnippet>, SyncError> {
        self.calls().lookups.push(video_id.to_string());
        if self.failing_lookups.contains(video_id) {
            return Err(server_error("lookup failed"));
        }
        Ok(self.snippets.get(video_id).cloned())
    }

    async fn update_video_snippet(
        &self,
        request: &VideoUpdateRequest,
    ) -> Result<VideoSnippet, SyncError> {
        self.calls().updates.push(request.clone());
        if self.failing_updates.contains(&request.id) {
            return Err(SyncError::Api {
                status: 403,
                body: r#"{"error":{"errors":[{"reason":"quotaExceeded"}]}}"#.to_string(),
            });
        }
        Ok(VideoSnippet {
            title: request.snippet.title.clone(),
            description: request.snippet.description.clone(),
            category_id: Some(request.snippet.category_id.clone()),
        })
    }
}

pub fn server_error(body: &str) -> SyncError {
    SyncError::Api {
        status: 500,
        body: body.to_string(),
    }
}

pub fn playlist_item(video_id: &str, title: &str, published_at: &str) -> PlaylistItem {
    serde_json::from_value(json!({
        "id": format!("item-{video_id}"),
        "snippet": {
            "title": title,
            "publishedAt": published_at,
            "resourceId": { "kind": "youtube#video", "videoId": video_id }
        }
    }))
    .unwrap()
}

pub fn snippet(title: &str, category_id: Option<&str>) -> VideoSnippet {
    VideoSnippet {
        title: title.to_string(),
        description: String::new(),
        category_id: category_id.map(str::to_string),
    }
}
