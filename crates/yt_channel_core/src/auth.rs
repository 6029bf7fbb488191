//! OAuth credential acquisition with a local JSON cache.
//!
//! A cached credential is reused while it is valid, refreshed when it has
//! expired and carries a refresh token, and otherwise replaced through the
//! installed-app authorization-code flow with a loopback callback.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    RedirectUrl, RefreshToken, Scope as OAuthScope, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Scope;
use crate::current_thread_runtime;
use crate::errors::SyncError;

/// Schema version of the cache file. Records with another version are ignored.
pub const CREDENTIAL_VERSION: u32 = 1;

const EXPIRY_SKEW_SECS: i64 = 60;
const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const SUCCESS_PAGE: &str =
    "<html><body><p>Authorization complete. You can close this window.</p></body></html>";
const FAILURE_PAGE: &str =
    "<html><body><p>Authorization failed. Check the terminal for details.</p></body></html>";

/// Client identity issued by the Google Cloud console (`client_secret.json`).
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    pub fn load(path: &Path) -> Result<Self, SyncError> {
        if !path.exists() {
            return Err(SyncError::Config(format!(
                "client secrets file not found: {}. Download the OAuth client JSON from the \
                 Google Cloud console and save it under that name",
                path.display()
            )));
        }
        let content = fs::read_to_string(path)?;
        let file: ClientSecretsFile = serde_json::from_str(&content).map_err(|err| {
            SyncError::Config(format!(
                "invalid client secrets file {}: {err}",
                path.display()
            ))
        })?;
        file.installed.or(file.web).ok_or_else(|| {
            SyncError::Config(format!(
                "client secrets file {} has neither an 'installed' nor a 'web' section",
                path.display()
            ))
        })
    }

    fn oauth_client(&self, redirect: Option<RedirectUrl>) -> Result<BasicClient, SyncError> {
        let auth_url = AuthUrl::new(self.auth_uri.clone())
            .map_err(|err| SyncError::Config(format!("invalid auth_uri: {err}")))?;
        let token_url = TokenUrl::new(self.token_uri.clone())
            .map_err(|err| SyncError::Config(format!("invalid token_uri: {err}")))?;
        let client = BasicClient::new(
            ClientId::new(self.client_id.clone()),
            self.client_secret.clone().map(ClientSecret::new),
            auth_url,
            Some(token_url),
        )
        .set_auth_type(AuthType::RequestBody);
        Ok(match redirect {
            Some(url) => client.set_redirect_uri(url),
            None => client,
        })
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredential {
    pub version: u32,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl std::fmt::Debug for StoredCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredCredential")
            .field("version", &self.version)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .field("scopes", &self.scopes)
            .finish()
    }
}

impl StoredCredential {
    /// Credentials without an expiry never expire.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .map(|at| at - ChronoDuration::seconds(EXPIRY_SKEW_SECS) <= now)
            .unwrap_or(false)
    }

    fn from_token_response(
        token: &BasicTokenResponse,
        scope: Scope,
        previous_refresh_token: Option<String>,
    ) -> Self {
        let expires_at = token
            .expires_in()
            .and_then(|lifetime| ChronoDuration::from_std(lifetime).ok())
            .map(|lifetime| Utc::now() + lifetime);
        let scopes = token
            .scopes()
            .map(|granted| granted.iter().map(|s| s.as_str().to_string()).collect())
            .unwrap_or_else(|| vec![scope.url().to_string()]);
        Self {
            version: CREDENTIAL_VERSION,
            access_token: token.access_token().secret().clone(),
            refresh_token: token
                .refresh_token()
                .map(|refresh| refresh.secret().clone())
                .or(previous_refresh_token),
            expires_at,
            scopes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheState {
    Valid(StoredCredential),
    /// Expired, with a refresh token to try.
    Refreshable(StoredCredential),
    Missing,
}

/// Decides what to do with whatever the cache yielded.
pub fn classify_cached(
    cached: Option<StoredCredential>,
    scope: Scope,
    now: DateTime<Utc>,
) -> CacheState {
    let Some(credential) = cached else {
        return CacheState::Missing;
    };
    if credential.version != CREDENTIAL_VERSION {
        warn!(
            version = credential.version,
            "cached credential has an unknown schema version, ignoring it"
        );
        return CacheState::Missing;
    }
    if credential.access_token.trim().is_empty() {
        warn!("cached credential has no access token, ignoring it");
        return CacheState::Missing;
    }
    if !scope.is_covered_by(&credential.scopes) {
        warn!(scope = scope.url(), "cached credential lacks the required scope");
        return CacheState::Missing;
    }
    if !credential.is_expired(now) {
        return CacheState::Valid(credential);
    }
    if credential.refresh_token.is_some() {
        CacheState::Refreshable(credential)
    } else {
        CacheState::Missing
    }
}

#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Unreadable or malformed files read as an empty cache.
    pub fn load(&self) -> Option<StoredCredential> {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "cannot read credential cache");
                return None;
            }
        };
        match serde_json::from_slice(&content) {
            Ok(credential) => Some(credential),
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    error = %err,
                    "credential cache is corrupt, authorization will be requested"
                );
                None
            }
        }
    }

    pub fn save(&self, credential: &StoredCredential) -> Result<(), SyncError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(credential)
            .map_err(|err| SyncError::Other(format!("cannot encode credential: {err}")))?;
        fs::write(&self.path, json)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    pub fn clear(&self) -> Result<(), SyncError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthOptions {
    pub scope: Scope,
    pub client_secrets_path: PathBuf,
    pub cache_path: PathBuf,
    pub redirect_port: u16,
    pub open_browser: bool,
}

pub struct CredentialProvider {
    options: AuthOptions,
    cache: TokenCache,
}

impl CredentialProvider {
    pub fn new(options: AuthOptions) -> Self {
        let cache = TokenCache::new(options.cache_path.clone());
        Self { options, cache }
    }

    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    pub async fn acquire(&self) -> Result<StoredCredential, SyncError> {
        let credential = match classify_cached(self.cache.load(), self.options.scope, Utc::now())
        {
            CacheState::Valid(credential) => {
                info!(path = %self.cache.path().display(), "using cached credential");
                return Ok(credential);
            }
            CacheState::Refreshable(credential) => {
                let secrets = ClientSecrets::load(&self.options.client_secrets_path)?;
                match self.refresh_or_invalidate(&secrets, &credential).await? {
                    Some(refreshed) => refreshed,
                    None => self.authorize_interactively(&secrets).await?,
                }
            }
            CacheState::Missing => {
                let secrets = ClientSecrets::load(&self.options.client_secrets_path)?;
                self.authorize_interactively(&secrets).await?
            }
        };
        self.cache.save(&credential)?;
        info!(path = %self.cache.path().display(), "credential saved");
        Ok(credential)
    }

    /// Refreshes `credential`. On failure the cache file is deleted, best
    /// effort, and `None` is returned so the caller can fall back to
    /// interactive authorization.
    pub async fn refresh_or_invalidate(
        &self,
        secrets: &ClientSecrets,
        credential: &StoredCredential,
    ) -> Result<Option<StoredCredential>, SyncError> {
        info!("refreshing access token");
        match self.refresh(secrets, credential).await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(err) => {
                warn!(error = %err, "token refresh failed, new authorization required");
                if let Err(err) = self.cache.clear() {
                    warn!(
                        path = %self.cache.path().display(),
                        error = %err,
                        "cannot delete the stale credential cache"
                    );
                }
                Ok(None)
            }
        }
    }

    async fn refresh(
        &self,
        secrets: &ClientSecrets,
        credential: &StoredCredential,
    ) -> Result<StoredCredential, SyncError> {
        let refresh_token = credential
            .refresh_token
            .clone()
            .ok_or_else(|| SyncError::Auth("credential has no refresh token".to_string()))?;
        let client = secrets.oauth_client(None)?;
        let token = client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.clone()))
            .request_async(async_http_client)
            .await
            .map_err(|err| SyncError::Auth(format!("token refresh rejected: {err}")))?;
        let mut refreshed =
            StoredCredential::from_token_response(&token, self.options.scope, Some(refresh_token));
        if token.scopes().is_none() {
            refreshed.scopes = credential.scopes.clone();
        }
        Ok(refreshed)
    }

    async fn authorize_interactively(
        &self,
        secrets: &ClientSecrets,
    ) -> Result<StoredCredential, SyncError> {
        let listener = TcpListener::bind(("127.0.0.1", self.options.redirect_port)).await?;
        let port = listener.local_addr()?.port();
        let redirect = RedirectUrl::new(format!("http://127.0.0.1:{port}/"))
            .map_err(|err| SyncError::Config(format!("invalid redirect URL: {err}")))?;
        let client = secrets.oauth_client(Some(redirect))?;

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (auth_url, csrf_state) = client
            .authorize_url(CsrfToken::new_random)
            .add_scope(OAuthScope::new(self.options.scope.url().to_string()))
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .set_pkce_challenge(pkce_challenge)
            .url();

        println!("Authorization required. Open this URL in a browser if it does not open by itself:\n\n{auth_url}\n");
        if self.options.open_browser {
            if let Err(err) = open::that(auth_url.as_str()) {
                warn!(error = %err, "could not open a browser");
            }
        }

        let code = wait_for_callback(&listener, csrf_state.secret()).await?;
        debug!("authorization code received, exchanging it");
        let token = client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(pkce_verifier)
            .request_async(async_http_client)
            .await
            .map_err(|err| SyncError::Auth(format!("code exchange rejected: {err}")))?;
        Ok(StoredCredential::from_token_response(
            &token,
            self.options.scope,
            None,
        ))
    }
}

/// Extracts the authorization code from the callback request target.
/// Requests carrying neither `code` nor `error` (a favicon fetch, say) give
/// `Ok(None)`.
pub fn parse_callback(target: &str, expected_state: &str) -> Result<Option<String>, SyncError> {
    let url = Url::parse("http://127.0.0.1/")
        .and_then(|base| base.join(target))
        .map_err(|err| SyncError::Auth(format!("malformed callback request: {err}")))?;
    let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
    if let Some(error) = params.get("error") {
        return Err(SyncError::Auth(format!("authorization was denied: {error}")));
    }
    let Some(code) = params.get("code") else {
        return Ok(None);
    };
    match params.get("state") {
        Some(state) if state == expected_state => Ok(Some(code.clone())),
        _ => Err(SyncError::Auth(
            "callback state does not match the authorization request".to_string(),
        )),
    }
}

async fn wait_for_callback(
    listener: &TcpListener,
    expected_state: &str,
) -> Result<String, SyncError> {
    loop {
        let (mut stream, _) = listener.accept().await?;
        let request_line = {
            let mut reader = BufReader::new(&mut stream);
            let mut line = String::new();
            reader.read_line(&mut line).await?;
            line
        };
        let target = request_line.split_whitespace().nth(1).unwrap_or("/");
        let outcome = parse_callback(target, expected_state);
        let (status, body) = match &outcome {
            Ok(Some(_)) => ("200 OK", SUCCESS_PAGE),
            Ok(None) => ("404 Not Found", ""),
            Err(_) => ("400 Bad Request", FAILURE_PAGE),
        };
        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: text/html; charset=utf-8\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await?;
        stream.shutdown().await.ok();
        if let Some(code) = outcome? {
            return Ok(code);
        }
    }
}

pub fn acquire_credential_blocking(options: AuthOptions) -> Result<StoredCredential, SyncError> {
    current_thread_runtime()?.block_on(CredentialProvider::new(options).acquire())
}
