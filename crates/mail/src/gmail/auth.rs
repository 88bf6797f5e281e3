//! Gmail OAuth2 authentication
//!
//! Exchanges a stored refresh token for short-lived access tokens and caches
//! them in memory until shortly before they expire.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use anyhow::{Context, Result, anyhow};
use log::{debug, info};
use serde::Deserialize;
use std::sync::{Mutex, MutexGuard};

use crate::config::GmailCredentials;

/// OAuth2 token management for Gmail
pub struct GmailAuth {
    credentials: GmailCredentials,
    cached: Mutex<Option<CachedToken>>,
}

/// Access token held in memory
#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    /// Unix timestamp
    expires_at: i64,
}

impl CachedToken {
    /// Cache a token response received at `now`
    fn from_response(response: TokenResponse, now: i64) -> Self {
        let lifetime = response
            .expires_in
            .map(|secs| secs as i64)
            .unwrap_or(GmailAuth::DEFAULT_TOKEN_LIFETIME_SECS);

        Self {
            access_token: response.access_token,
            expires_at: now + lifetime,
        }
    }

    /// Still usable at `now`, with a safety buffer before expiry
    fn is_fresh(&self, now: i64) -> bool {
        self.expires_at > now + GmailAuth::EXPIRY_BUFFER_SECS
    }
}

/// Token response from Google
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
    #[allow(dead_code)]
    token_type: Option<String>,
}

impl GmailAuth {
    /// Refresh tokens this many seconds before they expire
    const EXPIRY_BUFFER_SECS: i64 = 300;

    /// Lifetime assumed when the token response omits `expires_in`
    const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

    /// Create a new GmailAuth instance
    pub fn new(credentials: GmailCredentials) -> Self {
        Self {
            credentials,
            cached: Mutex::new(None),
        }
    }

    /// Load credentials from the usual sources and create a GmailAuth
    pub fn from_default_credentials() -> Result<Self> {
        Ok(Self::new(GmailCredentials::load()?))
    }

    /// Get a valid access token, refreshing as needed
    pub fn get_access_token(&self) -> Result<String> {
        let mut cached = self.cache()?;
        let now = chrono::Utc::now().timestamp();

        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.access_token.clone());
        }

        debug!("Access token missing or expiring, refreshing");
        let token = CachedToken::from_response(self.refresh_access_token()?, now);
        info!(
            "Refreshed Gmail access token (expires in {}s)",
            token.expires_at - now
        );

        *cached = Some(token.clone());
        Ok(token.access_token)
    }

    /// Exchange the refresh token for a new access token
    fn refresh_access_token(&self) -> Result<TokenResponse> {
        let response = ureq::post(&self.credentials.token_uri)
            .send_form([
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("refresh_token", self.credentials.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .context("Failed to refresh access token")?;

        response
            .into_body()
            .read_json()
            .context("Failed to parse refresh token response")
    }

    /// Check if a usable access token is cached
    pub fn is_authenticated(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        self.cache()
            .map(|cached| cached.as_ref().is_some_and(|t| t.is_fresh(now)))
            .unwrap_or(false)
    }

    /// Drop the cached access token so the next request refreshes it
    pub fn invalidate(&self) -> Result<()> {
        *self.cache()? = None;
        Ok(())
    }

    fn cache(&self) -> Result<MutexGuard<'_, Option<CachedToken>>> {
        self.cached
            .lock()
            .map_err(|_| anyhow!("Access token cache lock poisoned"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> GmailAuth {
        GmailAuth::new(
            GmailCredentials::from_json(
                r#"{"client_id": "id", "client_secret": "secret", "refresh_token": "r"}"#,
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_token_freshness() {
        let token = CachedToken {
            access_token: "t".into(),
            expires_at: 1_000,
        };
        assert!(token.is_fresh(600));
        assert!(!token.is_fresh(700));
        assert!(!token.is_fresh(2_000));
    }

    #[test]
    fn test_missing_expiry_uses_default_lifetime() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token": "ya29.a0", "token_type": "Bearer"}"#)
                .unwrap();

        let token = CachedToken::from_response(response, 10_000);
        assert_eq!(token.expires_at, 10_000 + GmailAuth::DEFAULT_TOKEN_LIFETIME_SECS);
        assert!(token.is_fresh(10_000));
    }

    #[test]
    fn test_expiry_from_response() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token": "ya29.a0", "expires_in": 3599}"#).unwrap();

        let token = CachedToken::from_response(response, 10_000);
        assert_eq!(token.expires_at, 13_599);
    }

    #[test]
    fn test_cached_token_is_reused() {
        let auth = auth();
        *auth.cache().unwrap() = Some(CachedToken {
            access_token: "cached".into(),
            expires_at: chrono::Utc::now().timestamp() + 3_600,
        });

        assert!(auth.is_authenticated());
        assert_eq!(auth.get_access_token().unwrap(), "cached");
    }

    #[test]
    fn test_invalidate() {
        let auth = auth();
        *auth.cache().unwrap() = Some(CachedToken {
            access_token: "cached".into(),
            expires_at: chrono::Utc::now().timestamp() + 3_600,
        });

        auth.invalidate().unwrap();
        assert!(!auth.is_authenticated());
    }

    #[test]
    fn test_parse_token_response() {
        let json = r#"{
            "access_token": "ya29.a0",
            "expires_in": 3599,
            "scope": "https://www.googleapis.com/auth/gmail.modify",
            "token_type": "Bearer"
        }"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(token.access_token, "ya29.a0");
        assert_eq!(token.expires_in, Some(3599));
    }
}
