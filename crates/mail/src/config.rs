//! Credential loading for the Gmail transport
//!
//! Supports loading OAuth credentials from (in order of priority):
//! 1. Compile-time embedded credentials
//! 2. JSON file in the config directory (authorized-user format)
//! 3. Runtime environment variables

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Credentials filename in the config directory
const CREDENTIALS_FILE: &str = "gmail-credentials.json";

/// Google's OAuth2 token endpoint
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// OAuth credentials able to mint Gmail access tokens without user interaction
#[derive(Clone, Serialize, Deserialize)]
pub struct GmailCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl std::fmt::Debug for GmailCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GmailCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl GmailCredentials {
    /// Load credentials using the following priority:
    /// 1. Compile-time embedded credentials
    /// 2. JSON file (~/.config/mail-client/gmail-credentials.json)
    /// 3. Runtime environment variables
    pub fn load() -> Result<Self> {
        if let Some(creds) = Self::from_compile_time() {
            return Ok(creds);
        }

        if config::config_exists(CREDENTIALS_FILE) {
            let creds: GmailCredentials = config::load_json(CREDENTIALS_FILE)?;
            return creds.validated();
        }

        Self::from_env()
    }

    /// Load credentials embedded at compile time.
    /// Build with GMAIL_CLIENT_ID, GMAIL_CLIENT_SECRET and GMAIL_REFRESH_TOKEN set.
    pub fn from_compile_time() -> Option<Self> {
        let client_id = option_env!("GMAIL_CLIENT_ID")?;
        let client_secret = option_env!("GMAIL_CLIENT_SECRET")?;
        let refresh_token = option_env!("GMAIL_REFRESH_TOKEN")?;

        Self::new(
            client_id,
            client_secret,
            refresh_token,
            option_env!("GMAIL_TOKEN_URI"),
        )
        .validated()
        .ok()
    }

    /// Load credentials from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let creds: GmailCredentials = config::load_json_file(path)?;
        creds.validated()
    }

    /// Parse credentials from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let creds: GmailCredentials =
            serde_json::from_str(json).context("Failed to parse credentials JSON")?;
        creds.validated()
    }

    /// Load credentials from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build credentials from a variable lookup (environment or otherwise)
    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let client_id =
            lookup("GMAIL_CLIENT_ID").context("GMAIL_CLIENT_ID environment variable not set")?;
        let client_secret = lookup("GMAIL_CLIENT_SECRET")
            .context("GMAIL_CLIENT_SECRET environment variable not set")?;
        let refresh_token = lookup("GMAIL_REFRESH_TOKEN")
            .context("GMAIL_REFRESH_TOKEN environment variable not set")?;
        let token_uri = lookup("GMAIL_TOKEN_URI");

        Self::new(client_id, client_secret, refresh_token, token_uri).validated()
    }

    fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
        token_uri: Option<impl Into<String>>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
            token_uri: token_uri
                .map(Into::into)
                .filter(|uri: &String| !uri.is_empty())
                .unwrap_or_else(default_token_uri),
        }
    }

    /// Reject credentials with empty required fields
    fn validated(self) -> Result<Self> {
        if self.client_id.is_empty() {
            anyhow::bail!("Gmail credentials missing client_id");
        }
        if self.client_secret.is_empty() {
            anyhow::bail!("Gmail credentials missing client_secret");
        }
        if self.refresh_token.is_empty() {
            anyhow::bail!("Gmail credentials missing refresh_token");
        }
        Ok(self)
    }

    /// Save credentials to the config directory
    pub fn save(&self) -> Result<()> {
        config::save_json(CREDENTIALS_FILE, self)
    }

    /// Get the default credentials file path
    pub fn default_credentials_path() -> Option<PathBuf> {
        config::config_path(CREDENTIALS_FILE)
    }

    /// Check if credentials are available (compile-time, file, or env vars)
    pub fn is_available() -> bool {
        if Self::from_compile_time().is_some() {
            return true;
        }
        if config::config_exists(CREDENTIALS_FILE) {
            return true;
        }
        Self::from_env().is_ok()
    }
}
