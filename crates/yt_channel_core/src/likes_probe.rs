//! Hiding a video's like count is not exposed by the YouTube Data API: neither
//! `videos.update` nor any other method accepts such a setting. The probe
//! reads the requested ids and reports every one of them as skipped without
//! touching the remote side.

use std::path::PathBuf;

use tracing::info;

use crate::csv_utils::read_video_ids;
use crate::errors::FlowError;
use crate::models::RunSummary;

pub const UNSUPPORTED_REASON: &str =
    "the YouTube Data API has no supported way to hide a video's like count";

#[derive(Debug, Clone)]
pub struct ProbeOptions {
    pub csv_path: PathBuf,
    pub encoding: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub video_id: String,
    pub reason: &'static str,
}

#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub reports: Vec<ProbeReport>,
    pub dropped_rows: usize,
    pub summary: RunSummary,
}

pub fn probe_hide_likes(options: &ProbeOptions) -> Result<ProbeResult, FlowError> {
    let parsed = read_video_ids(&options.csv_path, &options.encoding).map_err(|err| {
        FlowError::from(err).context(format!(
            "cannot read video ids from {}",
            options.csv_path.display()
        ))
    })?;
    Ok(classify_ids(parsed.rows, parsed.dropped))
}

pub fn classify_ids(ids: Vec<String>, dropped_rows: usize) -> ProbeResult {
    let mut summary = RunSummary::default();
    let reports = ids
        .into_iter()
        .map(|video_id| {
            info!(%video_id, "like count cannot be hidden, skipping");
            summary.record_skip();
            ProbeReport {
                video_id,
                reason: UNSUPPORTED_REASON,
            }
        })
        .collect();
    ProbeResult {
        reports,
        dropped_rows,
        summary,
    }
}
