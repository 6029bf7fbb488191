use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dirs_next::config_dir;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::AuthOptions;
use crate::client::ClientOptions;
use crate::errors::SyncError;

const APP_DIR: &str = "yt_channel_sync";
const CONFIG_NAME: &str = "config.json";
pub const DEFAULT_CLIENT_SECRETS: &str = "client_secret.json";
pub const DEFAULT_DELAY_SECS: f64 = 1.5;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const READONLY_SCOPE: &str = "https://www.googleapis.com/auth/youtube.readonly";
const READWRITE_SCOPE: &str = "https://www.googleapis.com/auth/youtube";

/// Permission variant a program authorizes with. Each variant keeps its own
/// credential cache file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    ReadOnly,
    ReadWrite,
}

impl Scope {
    pub fn url(&self) -> &'static str {
        match self {
            Scope::ReadOnly => READONLY_SCOPE,
            Scope::ReadWrite => READWRITE_SCOPE,
        }
    }

    pub fn default_cache_file(&self) -> &'static str {
        match self {
            Scope::ReadOnly => "token_youtube_readonly.json",
            Scope::ReadWrite => "token_youtube_write.json",
        }
    }

    /// Whether a credential granted `granted` may act for this scope.
    pub fn is_covered_by(&self, granted: &[String]) -> bool {
        granted.iter().any(|scope| {
            scope == self.url() || (*self == Scope::ReadOnly && scope == READWRITE_SCOPE)
        })
    }
}

fn default_client_secrets() -> PathBuf {
    PathBuf::from(DEFAULT_CLIENT_SECRETS)
}

fn default_true() -> bool {
    true
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

fn default_delay() -> f64 {
    DEFAULT_DELAY_SECS
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_client_secrets")]
    pub client_secrets_path: PathBuf,
    /// Overrides the per-scope cache file name.
    #[serde(default)]
    pub token_cache_path: Option<PathBuf>,
    #[serde(default)]
    pub csv_path: Option<PathBuf>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub year_filter: Option<i32>,
    #[serde(default = "default_delay")]
    pub delay_secs: f64,
    #[serde(default = "default_encoding")]
    pub encoding: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Loopback port for the authorization callback, 0 picks a free one.
    #[serde(default)]
    pub redirect_port: u16,
    #[serde(default = "default_true")]
    pub open_browser: bool,
    #[serde(default)]
    pub api_base_url: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            client_secrets_path: default_client_secrets(),
            token_cache_path: None,
            csv_path: None,
            output_dir: default_output_dir(),
            year_filter: None,
            delay_secs: DEFAULT_DELAY_SECS,
            encoding: default_encoding(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            redirect_port: 0,
            open_browser: true,
            api_base_url: None,
        }
    }
}

impl SyncConfig {
    /// Loads settings from `custom_path`, or from the per-user config file when
    /// it exists. A missing custom file is an error, a missing default file is
    /// not.
    pub fn load(custom_path: Option<&Path>) -> Result<Self, SyncError> {
        let path = match custom_path {
            Some(path) if !path.exists() => {
                return Err(SyncError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            Some(path) => path.to_path_buf(),
            None => default_config_path(),
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        debug!(path = %path.display(), "loading config file");
        let content = fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(|err| {
            SyncError::Config(format!("invalid config file {}: {err}", path.display()))
        })
    }

    pub fn token_cache_path(&self, scope: Scope) -> PathBuf {
        self.token_cache_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(scope.default_cache_file()))
    }

    pub fn delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.delay_secs.max(0.0))
            .unwrap_or_else(|_| Duration::from_secs_f64(DEFAULT_DELAY_SECS))
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            timeout: Duration::from_secs(self.timeout_secs.max(1)),
            base_url: self.api_base_url.clone(),
            ..ClientOptions::default()
        }
    }

    pub fn auth_options(&self, scope: Scope) -> AuthOptions {
        AuthOptions {
            scope,
            client_secrets_path: self.client_secrets_path.clone(),
            cache_path: self.token_cache_path(scope),
            redirect_port: self.redirect_port,
            open_browser: self.open_browser,
        }
    }
}

fn default_config_path() -> PathBuf {
    let mut base = config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.push(APP_DIR);
    base.push(CONFIG_NAME);
    base
}
