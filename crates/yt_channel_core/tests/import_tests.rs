mod common;

use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{snippet, FakeChannel, TestResult};
use tempfile::tempdir;
use yt_channel_core::metadata_import::apply_updates;
use yt_channel_core::{
    load_updates, probe_hide_likes, ClientOptions, ImportOptions, ImportProgress, MetadataUpdate,
    ProbeOptions, ProgressCallback, RowOutcome, SyncError, FlowError, UNSUPPORTED_REASON,
};

fn update(video_id: &str, title: &str) -> MetadataUpdate {
    MetadataUpdate {
        title: title.to_string(),
        video_id: video_id.to_string(),
        description: format!("About {title}"),
    }
}

fn import_options(csv_path: std::path::PathBuf) -> ImportOptions {
    ImportOptions {
        csv_path,
        encoding: "utf-8".to_string(),
        delay: Duration::ZERO,
        client: ClientOptions::default(),
        progress_callback: None,
    }
}

#[tokio::test]
async fn failed_lookup_does_not_stop_later_rows() {
    let channel = FakeChannel {
        snippets: [
            ("v1".to_string(), snippet("old 1", Some("22"))),
            ("v3".to_string(), snippet("old 3", Some("10"))),
        ]
        .into_iter()
        .collect(),
        failing_lookups: ["v2".to_string()].into_iter().collect(),
        ..FakeChannel::default()
    };
    let updates = vec![update("v1", "One"), update("v2", "Two"), update("v3", "Three")];

    let result = apply_updates(&channel, &updates, Duration::ZERO, None).await;

    assert_eq!(result.summary.succeeded, 2);
    assert_eq!(result.summary.failed, 1);
    assert!(matches!(result.reports[1].outcome, RowOutcome::LookupFailed(_)));

    let calls = channel.calls();
    assert_eq!(calls.lookups, vec!["v1", "v2", "v3"]);
    let updated: Vec<&str> = calls.updates.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(updated, vec!["v1", "v3"]);
    assert_eq!(calls.updates[0].snippet.title, "One");
    assert_eq!(calls.updates[0].snippet.description, "About One");
    assert_eq!(calls.updates[0].snippet.category_id, "22");
    assert_eq!(calls.updates[1].snippet.category_id, "10");
}

#[tokio::test]
async fn unknown_video_and_missing_category_fail_without_update() {
    let channel = FakeChannel {
        snippets: [("nocat".to_string(), snippet("old", None))]
            .into_iter()
            .collect(),
        ..FakeChannel::default()
    };
    let updates = vec![update("missing", "A"), update("nocat", "B")];

    let result = apply_updates(&channel, &updates, Duration::ZERO, None).await;

    assert_eq!(result.summary.failed, 2);
    assert_eq!(result.reports[0].outcome, RowOutcome::NotFound);
    assert_eq!(result.reports[1].outcome, RowOutcome::MissingCategory);
    assert!(channel.calls().updates.is_empty());
}

#[tokio::test]
async fn quota_rejection_is_flagged() {
    let channel = FakeChannel {
        snippets: [("v1".to_string(), snippet("old", Some("22")))]
            .into_iter()
            .collect(),
        failing_updates: ["v1".to_string()].into_iter().collect(),
        ..FakeChannel::default()
    };

    let result = apply_updates(&channel, &[update("v1", "New")], Duration::ZERO, None).await;

    match &result.reports[0].outcome {
        RowOutcome::UpdateFailed { rate_limited, .. } => assert!(*rate_limited),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(result.reports[0].outcome.to_string().contains("delay"));
    assert_eq!(result.summary.failed, 1);
}

#[tokio::test]
async fn progress_is_reported_before_and_after_each_row() {
    let channel = FakeChannel {
        snippets: [("v1".to_string(), snippet("old", Some("22")))]
            .into_iter()
            .collect(),
        ..FakeChannel::default()
    };
    let seen: Arc<Mutex<Vec<(usize, usize, bool)>>> = Arc::default();
    let sink = Arc::clone(&seen);
    let callback: ProgressCallback = Arc::new(move |progress: ImportProgress| {
        sink.lock()
            .unwrap()
            .push((progress.current, progress.total, progress.outcome.is_some()));
    });
    let updates = vec![update("v1", "One"), update("v2", "Two")];

    apply_updates(&channel, &updates, Duration::ZERO, Some(&callback)).await;

    assert_eq!(
        *seen.lock().unwrap(),
        vec![(1, 2, false), (1, 2, true), (2, 2, false), (2, 2, true)]
    );
}

#[tokio::test]
async fn delay_is_applied_after_every_row() {
    let channel = FakeChannel::default();
    let updates = vec![update("a", "A"), update("b", "B")];
    let started = std::time::Instant::now();

    apply_updates(&channel, &updates, Duration::from_millis(20), None).await;

    assert!(started.elapsed() >= Duration::from_millis(40));
}

#[test]
fn load_updates_accepts_canonical_headers_and_drops_rows_without_id() -> TestResult<()> {
    let dir = tempdir()?;
    let path = dir.path().join("updates.csv");
    fs::write(
        &path,
        "title,video_id,description\n\
         New title,abc123,\"Line one\nLine two\"\n\
         Orphan,,nothing\n\
         Linked,https://youtu.be/xyz789,desc\n",
    )?;

    let parsed = load_updates(&import_options(path))?;

    assert_eq!(parsed.dropped, 1);
    assert_eq!(parsed.rows.len(), 2);
    assert_eq!(parsed.rows[0].video_id, "abc123");
    assert_eq!(parsed.rows[0].description, "Line one\nLine two");
    assert_eq!(parsed.rows[1].video_id, "xyz789");
    Ok(())
}

#[test]
fn load_updates_accepts_legacy_headers() -> TestResult<()> {
    let dir = tempdir()?;
    let path = dir.path().join("legacy.csv");
    fs::write(
        &path,
        "Título Corregido,ID de YouTube,Descripción\nNuevo,abc123,Texto\n",
    )?;

    let parsed = load_updates(&import_options(path))?;

    assert_eq!(
        parsed.rows,
        vec![MetadataUpdate {
            title: "Nuevo".to_string(),
            video_id: "abc123".to_string(),
            description: "Texto".to_string(),
        }]
    );
    Ok(())
}

#[test]
fn load_updates_rejects_missing_column() -> TestResult<()> {
    let dir = tempdir()?;
    let path = dir.path().join("bad.csv");
    fs::write(&path, "title,video_id\nA,abc\n")?;

    let err = load_updates(&import_options(path)).unwrap_err();

    assert!(matches!(err, FlowError::Context(_)));
    assert!(err.to_string().contains("description"));
    Ok(())
}

#[test]
fn load_updates_rejects_missing_file() {
    let dir = tempdir().unwrap();

    let err = load_updates(&import_options(dir.path().join("absent.csv"))).unwrap_err();

    assert!(err.to_string().contains("not found"));
}

#[test]
fn hide_likes_check_skips_every_id_without_mutations() -> TestResult<()> {
    let dir = tempdir()?;
    let path = dir.path().join("ids.csv");
    fs::write(
        &path,
        "ID de YouTube\nabc\nhttps://www.youtube.com/watch?v=def\n\nhttps://www.youtube.com/shorts/ghi\n",
    )?;

    let result = probe_hide_likes(&ProbeOptions {
        csv_path: path,
        encoding: "utf-8".to_string(),
    })?;

    let ids: Vec<&str> = result.reports.iter().map(|r| r.video_id.as_str()).collect();
    assert_eq!(ids, vec!["abc", "def", "ghi"]);
    assert!(result.reports.iter().all(|r| r.reason == UNSUPPORTED_REASON));
    assert_eq!(result.summary.skipped, 3);
    assert_eq!(result.summary.succeeded, 0);
    assert_eq!(result.summary.failed, 0);
    Ok(())
}

#[test]
fn hide_likes_check_requires_an_id_column() -> TestResult<()> {
    let dir = tempdir()?;
    let path = dir.path().join("ids.csv");
    fs::write(&path, "name\nabc\n")?;

    let err = probe_hide_likes(&ProbeOptions {
        csv_path: path,
        encoding: "utf-8".to_string(),
    })
    .unwrap_err();

    assert!(err.to_string().contains("video_id"));
    Ok(())
}

#[test]
fn rate_limit_detection_matches_quota_bodies() {
    let quota = SyncError::Api {
        status: 403,
        body: r#"{"error":{"errors":[{"reason":"quotaExceeded"}]}}"#.to_string(),
    };
    let throttled = SyncError::Api {
        status: 429,
        body: String::new(),
    };
    let forbidden = SyncError::Api {
        status: 403,
        body: "forbidden".to_string(),
    };

    assert!(quota.is_rate_limited());
    assert!(throttled.is_rate_limited());
    assert!(!forbidden.is_rate_limited());
    assert!(!SyncError::Resolution.is_rate_limited());
}
