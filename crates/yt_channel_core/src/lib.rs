pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod csv_utils;
pub mod errors;
pub mod export;
pub mod likes_probe;
pub mod logging;
pub mod metadata_import;
pub mod models;
pub mod timestamp;

use tokio::runtime::{Builder, Runtime};

pub use auth::{
    acquire_credential_blocking, AuthOptions, ClientSecrets, CredentialProvider, StoredCredential,
    TokenCache,
};
pub use cli::CommonArgs;
pub use client::{ChannelApi, ClientOptions, YouTubeClient};
pub use config::{Scope, SyncConfig};
pub use csv_utils::FIELDNAMES;
pub use errors::{FlowError, SyncError};
pub use export::{
    export_videos, export_videos_blocking, find_most_liked, output_file_name, ExportOptions,
    ExportResult, STATISTICS_BATCH_SIZE,
};
pub use likes_probe::{probe_hide_likes, ProbeOptions, ProbeResult, UNSUPPORTED_REASON};
pub use logging::init_tracing;
pub use metadata_import::{
    import_metadata, import_metadata_blocking, load_updates, ImportOptions, ImportProgress,
    ImportResult, ProgressCallback, RowOutcome,
};
pub use models::{LikeCount, MetadataUpdate, RunSummary, VideoRecord};
pub use timestamp::{normalize_video_id, published_year};

/// The tools make one request at a time, so a single-threaded runtime is
/// enough to drive the async client.
pub(crate) fn current_thread_runtime() -> Result<Runtime, SyncError> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| SyncError::Other(format!("failed to start the tokio runtime: {err}")))
}
