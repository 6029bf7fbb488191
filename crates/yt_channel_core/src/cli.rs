use std::path::PathBuf;

use clap::{ArgAction, Args};

use crate::config::SyncConfig;
use crate::errors::SyncError;

/// Flags shared by every tool. Values given here override the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// JSON config file (defaults to the per-user config directory)
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// OAuth client secrets downloaded from the Google Cloud console
    #[arg(long = "client-secrets")]
    pub client_secrets: Option<PathBuf>,

    /// Credential cache file
    #[arg(long = "token-cache")]
    pub token_cache: Option<PathBuf>,

    /// CSV text encoding
    #[arg(short = 'e', long = "encoding")]
    pub encoding: Option<String>,

    /// Request timeout in seconds
    #[arg(long = "timeout")]
    pub timeout: Option<u64>,

    /// Loopback port for the authorization callback (0 picks a free port)
    #[arg(long = "redirect-port")]
    pub redirect_port: Option<u16>,

    /// Print the consent URL instead of opening a browser
    #[arg(long = "no-browser")]
    pub no_browser: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

impl CommonArgs {
    pub fn resolve(&self) -> Result<SyncConfig, SyncError> {
        let mut config = SyncConfig::load(self.config.as_deref())?;
        if let Some(path) = &self.client_secrets {
            config.client_secrets_path = path.clone();
        }
        if let Some(path) = &self.token_cache {
            config.token_cache_path = Some(path.clone());
        }
        if let Some(encoding) = &self.encoding {
            config.encoding = encoding.clone();
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        if let Some(port) = self.redirect_port {
            config.redirect_port = port;
        }
        if self.no_browser {
            config.open_browser = false;
        }
        Ok(config)
    }
}
