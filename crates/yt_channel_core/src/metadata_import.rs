use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::auth::StoredCredential;
use crate::client::{ChannelApi, ClientOptions, YouTubeClient};
use crate::csv_utils::{read_metadata_updates, ParsedRows};
use crate::current_thread_runtime;
use crate::errors::{FlowError, SyncError};
use crate::models::{MetadataUpdate, RunSummary, VideoUpdateRequest};

/// Reported once before a row is processed (`outcome: None`) and once after.
#[derive(Debug, Clone)]
pub struct ImportProgress {
    pub current: usize,
    pub total: usize,
    pub update: MetadataUpdate,
    pub outcome: Option<RowOutcome>,
}

pub type ProgressCallback = Arc<dyn Fn(ImportProgress) + Send + Sync + 'static>;

#[derive(Clone)]
pub struct ImportOptions {
    pub csv_path: PathBuf,
    pub encoding: String,
    /// Pause after every row, whatever its outcome.
    pub delay: Duration,
    pub client: ClientOptions,
    pub progress_callback: Option<ProgressCallback>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Updated { title: String },
    NotFound,
    MissingCategory,
    LookupFailed(String),
    UpdateFailed { message: String, rate_limited: bool },
}

impl RowOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RowOutcome::Updated { .. })
    }
}

#[derive(Debug, Clone)]
pub struct RowReport {
    pub video_id: String,
    pub outcome: RowOutcome,
}

#[derive(Debug, Clone)]
pub struct ImportResult {
    pub reports: Vec<RowReport>,
    pub summary: RunSummary,
}

/// Parses the input file. Fails on a missing file or missing columns, so the
/// caller can stop before any remote call is made. Rows without an id are
/// dropped and only counted.
pub fn load_updates(options: &ImportOptions) -> Result<ParsedRows<MetadataUpdate>, FlowError> {
    let parsed = read_metadata_updates(&options.csv_path, &options.encoding).map_err(|err| {
        FlowError::from(err).context(format!(
            "cannot read updates from {}",
            options.csv_path.display()
        ))
    })?;
    info!(
        rows = parsed.rows.len(),
        dropped = parsed.dropped,
        "update rows loaded"
    );
    Ok(parsed)
}

pub async fn import_metadata(
    options: &ImportOptions,
    updates: &[MetadataUpdate],
    credential: &StoredCredential,
) -> Result<ImportResult, FlowError> {
    let client = YouTubeClient::new(options.client.clone(), &credential.access_token)?;
    Ok(apply_updates(
        &client,
        updates,
        options.delay,
        options.progress_callback.as_ref(),
    )
    .await)
}

pub fn import_metadata_blocking(
    options: &ImportOptions,
    updates: &[MetadataUpdate],
    credential: &StoredCredential,
) -> Result<ImportResult, FlowError> {
    current_thread_runtime()?.block_on(import_metadata(options, updates, credential))
}

/// Applies each update in order. A failing row is recorded and the loop
/// moves on; nothing is retried.
pub async fn apply_updates<A: ChannelApi + Sync>(
    api: &A,
    updates: &[MetadataUpdate],
    delay: Duration,
    progress_callback: Option<&ProgressCallback>,
) -> ImportResult {
    let mut summary = RunSummary::default();
    let mut reports = Vec::with_capacity(updates.len());
    let total = updates.len();
    for (index, update) in updates.iter().enumerate() {
        let notify = |outcome: Option<RowOutcome>| {
            if let Some(callback) = progress_callback {
                callback(ImportProgress {
                    current: index + 1,
                    total,
                    update: update.clone(),
                    outcome,
                });
            }
        };
        notify(None);
        let outcome = apply_update(api, update).await;
        if outcome.is_success() {
            summary.record_success();
        } else {
            summary.record_failure();
        }
        notify(Some(outcome.clone()));
        reports.push(RowReport {
            video_id: update.video_id.clone(),
            outcome,
        });
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
    ImportResult { reports, summary }
}

async fn apply_update<A: ChannelApi + Sync>(api: &A, update: &MetadataUpdate) -> RowOutcome {
    let video_id = update.video_id.as_str();
    let snippet = match api.video_snippet(video_id).await {
        Ok(Some(snippet)) => snippet,
        Ok(None) => {
            warn!(video_id, "video not found");
            return RowOutcome::NotFound;
        }
        Err(err) => {
            warn!(video_id, error = %err, "cannot read current snippet");
            return RowOutcome::LookupFailed(err.to_string());
        }
    };
    let Some(category_id) = snippet.category_id.filter(|id| !id.trim().is_empty()) else {
        warn!(video_id, "current snippet has no category, update skipped");
        return RowOutcome::MissingCategory;
    };

    let request = VideoUpdateRequest::new(update, &category_id);
    match api.update_video_snippet(&request).await {
        Ok(updated) => RowOutcome::Updated {
            title: updated.title,
        },
        Err(err) => update_failure(video_id, err),
    }
}

fn update_failure(video_id: &str, err: SyncError) -> RowOutcome {
    let rate_limited = err.is_rate_limited();
    if rate_limited {
        warn!(
            video_id,
            error = %err,
            "update rejected by quota limits, consider a longer delay between updates"
        );
    } else {
        warn!(video_id, error = %err, "update failed");
    }
    RowOutcome::UpdateFailed {
        message: err.to_string(),
        rate_limited,
    }
}

impl fmt::Display for RowOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowOutcome::Updated { title } => write!(f, "updated '{title}'"),
            RowOutcome::NotFound => f.write_str("video not found"),
            RowOutcome::MissingCategory => f.write_str("current category unknown, update skipped"),
            RowOutcome::LookupFailed(message) => write!(f, "lookup failed: {message}"),
            RowOutcome::UpdateFailed {
                message,
                rate_limited: true,
            } => write!(
                f,
                "update failed: {message} (quota exceeded? raise the delay between updates)"
            ),
            RowOutcome::UpdateFailed { message, .. } => write!(f, "update failed: {message}"),
        }
    }
}
