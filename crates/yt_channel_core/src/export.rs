use std::collections::HashMap;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::auth::StoredCredential;
use crate::client::{ChannelApi, ClientOptions, YouTubeClient, MAX_RESULTS};
use crate::csv_utils::write_video_records;
use crate::current_thread_runtime;
use crate::errors::FlowError;
use crate::models::{LikeCount, PlaylistItem, RunSummary, VideoRecord};
use crate::timestamp::published_year;

/// Ids per `videos.list` statistics call. The API rejects larger groups.
pub const STATISTICS_BATCH_SIZE: usize = MAX_RESULTS;

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub output_dir: PathBuf,
    pub encoding: String,
    pub year_filter: Option<i32>,
    pub client: ClientOptions,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            encoding: "utf-8".to_string(),
            year_filter: None,
            client: ClientOptions::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportResult {
    pub csv_path: PathBuf,
    pub playlist_id: String,
    pub records: Vec<VideoRecord>,
    pub most_liked: Option<VideoRecord>,
    /// Set when paging stopped early; `records` then covers the pages fetched.
    pub pagination_error: Option<String>,
    pub summary: RunSummary,
}

/// Items collected from a playlist, possibly cut short by a failed page.
#[derive(Debug, Clone, Default)]
pub struct PlaylistListing {
    pub items: Vec<PlaylistItem>,
    pub pages: usize,
    pub error: Option<String>,
}

pub fn output_file_name(year_filter: Option<i32>) -> String {
    match year_filter {
        Some(year) => format!("videos_youtube_{year}.csv"),
        None => "videos_youtube_all_years.csv".to_string(),
    }
}

pub async fn export_videos(
    options: ExportOptions,
    credential: &StoredCredential,
) -> Result<ExportResult, FlowError> {
    let client = YouTubeClient::new(options.client.clone(), &credential.access_token)?;
    export_videos_with(&client, &options).await
}

pub fn export_videos_blocking(
    options: ExportOptions,
    credential: &StoredCredential,
) -> Result<ExportResult, FlowError> {
    current_thread_runtime()?.block_on(export_videos(options, credential))
}

pub async fn export_videos_with<A: ChannelApi + Sync>(
    api: &A,
    options: &ExportOptions,
) -> Result<ExportResult, FlowError> {
    let playlist_id = api
        .uploads_playlist_id()
        .await
        .map_err(|err| FlowError::from(err).context("cannot resolve the uploads playlist"))?;
    info!(%playlist_id, "uploads playlist resolved");

    let listing = collect_playlist_items(api, &playlist_id).await;
    let ids: Vec<String> = listing
        .items
        .iter()
        .filter_map(PlaylistItem::video_id)
        .map(str::to_string)
        .collect();
    let likes = fetch_like_counts(api, &ids).await;

    let (records, summary) = select_videos(&listing.items, &likes, options.year_filter);
    let csv_path = options
        .output_dir
        .join(output_file_name(options.year_filter));
    write_video_records(&csv_path, &options.encoding, &records)
        .map_err(|err| FlowError::from(err).context("cannot write the export file"))?;
    info!(path = %csv_path.display(), rows = records.len(), "export file written");

    let most_liked = find_most_liked(&records).cloned();
    Ok(ExportResult {
        csv_path,
        playlist_id,
        records,
        most_liked,
        pagination_error: listing.error,
        summary,
    })
}

/// Follows continuation tokens until a page comes back without one. A failed
/// page ends the walk; the items gathered so far are kept.
pub async fn collect_playlist_items<A: ChannelApi + Sync>(
    api: &A,
    playlist_id: &str,
) -> PlaylistListing {
    let mut listing = PlaylistListing::default();
    let mut page_token: Option<String> = None;
    loop {
        match api
            .playlist_items_page(playlist_id, page_token.as_deref())
            .await
        {
            Ok(page) => {
                listing.pages += 1;
                listing.items.extend(page.items);
                info!(fetched = listing.items.len(), "playlist page received");
                match page.next_page_token.filter(|token| !token.is_empty()) {
                    Some(token) => page_token = Some(token),
                    None => break,
                }
            }
            Err(err) => {
                warn!(
                    error = %err,
                    fetched = listing.items.len(),
                    "playlist paging stopped early, keeping partial results"
                );
                listing.error = Some(err.to_string());
                break;
            }
        }
    }
    listing
}

/// Looks up like counts in groups of [`STATISTICS_BATCH_SIZE`]. Every input id
/// ends up in the map once. A failed group marks all of its ids as
/// [`LikeCount::Error`]; ids a successful group did not return read as hidden.
pub async fn fetch_like_counts<A: ChannelApi + Sync>(
    api: &A,
    ids: &[String],
) -> HashMap<String, LikeCount> {
    let mut counts = HashMap::with_capacity(ids.len());
    let total = ids.len().div_ceil(STATISTICS_BATCH_SIZE);
    for (index, batch) in ids.chunks(STATISTICS_BATCH_SIZE).enumerate() {
        info!(batch = index + 1, total, size = batch.len(), "fetching statistics");
        match api.video_statistics(batch).await {
            Ok(items) => {
                let returned: HashMap<String, LikeCount> = items
                    .iter()
                    .map(|item| (item.id.clone(), item.like_count()))
                    .collect();
                for id in batch {
                    let likes = returned.get(id).copied().unwrap_or(LikeCount::Hidden);
                    counts.insert(id.clone(), likes);
                }
            }
            Err(err) => {
                warn!(batch = index + 1, error = %err, "statistics lookup failed");
                for id in batch {
                    counts.insert(id.clone(), LikeCount::Error);
                }
            }
        }
    }
    counts
}

/// Turns playlist items into export rows, applying the optional year filter.
/// Items lacking an id or a parseable publish date are skipped with a warning.
pub fn select_videos(
    items: &[PlaylistItem],
    likes: &HashMap<String, LikeCount>,
    year_filter: Option<i32>,
) -> (Vec<VideoRecord>, RunSummary) {
    let mut summary = RunSummary::default();
    let mut records = Vec::new();
    for item in items {
        let title = item.title();
        let Some(video_id) = item.video_id() else {
            warn!(item = %item.id, title, "item has no video id, skipping");
            summary.record_skip();
            continue;
        };
        let Some(year) = item.snippet.published_at.as_deref().and_then(published_year) else {
            warn!(
                video_id,
                title,
                published_at = item.snippet.published_at.as_deref().unwrap_or(""),
                "item has no usable publish date, skipping"
            );
            summary.record_skip();
            continue;
        };
        if year_filter.is_some_and(|wanted| wanted != year) {
            continue;
        }
        let like_count = likes.get(video_id).copied().unwrap_or(LikeCount::Hidden);
        if like_count == LikeCount::Error {
            summary.record_failure();
        } else {
            summary.record_success();
        }
        records.push(VideoRecord {
            title: title.to_string(),
            video_id: video_id.to_string(),
            likes: like_count,
        });
    }
    (records, summary)
}

/// Row with the highest numeric like count. Sentinels are ignored, the first
/// row wins a tie.
pub fn find_most_liked(records: &[VideoRecord]) -> Option<&VideoRecord> {
    records
        .iter()
        .filter_map(|record| record.likes.as_number().map(|likes| (likes, record)))
        .fold(None, |best: Option<(u64, &VideoRecord)>, (likes, record)| match best {
            Some((top, _)) if top >= likes => best,
            _ => Some((likes, record)),
        })
        .map(|(_, record)| record)
}
