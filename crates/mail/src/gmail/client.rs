//! Gmail API HTTP client
//!
//! Implements [`MailTransport`] over the Gmail REST API.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use anyhow::{Context, Result};
use log::{debug, warn};
use std::time::Duration;
use url::Url;

use super::GmailAuth;
use super::api::{ListMessagesResponse, ModifyMessageRequest, RawMessage};
use crate::models::{MessageId, MessagePage};
use crate::transport::MailTransport;

/// Non-success HTTP status from the Gmail API
#[derive(Debug, thiserror::Error)]
#[error("Gmail API {operation} request failed with HTTP {status}")]
pub struct GmailApiError {
    pub operation: &'static str,
    pub status: u16,
}

/// Gmail API client backing a [`crate::Mailbox`]
pub struct GmailClient {
    auth: GmailAuth,
    agent: ureq::Agent,
    base_url: String,
}

impl GmailClient {
    /// Gmail API base URL
    const BASE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1";

    /// Largest `maxResults` the list endpoint accepts
    const MAX_PAGE_SIZE: usize = 500;

    /// Upper bound on any single request
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Create a new Gmail client
    pub fn new(auth: GmailAuth) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(Self::REQUEST_TIMEOUT))
            .build();

        Self {
            auth,
            agent: ureq::Agent::new_with_config(config),
            base_url: Self::BASE_URL.to_string(),
        }
    }

    /// Point the client at a different API root (e.g. a local test server)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Check if the client holds a usable access token
    pub fn is_authenticated(&self) -> bool {
        self.auth.is_authenticated()
    }

    /// Obtain an access token up front instead of on the first request
    pub fn authenticate(&self) -> Result<()> {
        self.auth.get_access_token()?;
        Ok(())
    }

    fn bearer(&self) -> Result<String> {
        Ok(format!("Bearer {}", self.auth.get_access_token()?))
    }

    fn list_url(&self, page_token: Option<&str>, page_size: usize) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/users/me/messages", self.base_url))
            .context("Invalid Gmail API base URL")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair(
                "maxResults",
                &page_size.clamp(1, Self::MAX_PAGE_SIZE).to_string(),
            );
            if let Some(token) = page_token {
                query.append_pair("pageToken", token);
            }
        }
        Ok(url)
    }

    fn message_url(&self, id: &MessageId) -> String {
        format!(
            "{}/users/me/messages/{}",
            self.base_url,
            urlencoding::encode(id.as_str())
        )
    }

    /// Turn a failed request into an error, dropping the cached token on 401
    fn request_error(&self, operation: &'static str, err: ureq::Error) -> anyhow::Error {
        match err {
            ureq::Error::StatusCode(status) => {
                if status == 401 {
                    if let Err(e) = self.auth.invalidate() {
                        warn!("Failed to invalidate access token: {}", e);
                    }
                }
                GmailApiError { operation, status }.into()
            }
            other => anyhow::Error::new(other)
                .context(format!("Failed to send {} request", operation)),
        }
    }

    /// Map a mutation response to accepted / rejected
    fn mutation_outcome(
        &self,
        operation: &'static str,
        id: &MessageId,
        result: std::result::Result<ureq::http::Response<ureq::Body>, ureq::Error>,
    ) -> Result<bool> {
        match result {
            Ok(_) => Ok(true),
            Err(ureq::Error::StatusCode(status)) if is_rejection(status) => {
                warn!(
                    "Gmail rejected {} for message {} (HTTP {})",
                    operation, id, status
                );
                Ok(false)
            }
            Err(e) => Err(self.request_error(operation, e)),
        }
    }
}

/// Statuses that mean the server refused a mutation rather than failed
fn is_rejection(status: u16) -> bool {
    matches!(status, 403 | 404)
}

impl MailTransport for GmailClient {
    fn list_ids(&self, page_token: Option<&str>, page_size: usize) -> Result<MessagePage> {
        let url = self.list_url(page_token, page_size)?;
        debug!("GET {}", url);

        let mut response = self
            .agent
            .get(url.as_str())
            .header("Authorization", &self.bearer()?)
            .call()
            .map_err(|e| self.request_error("list messages", e))?;

        let list: ListMessagesResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse list messages response")?;

        let ids = list
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(|m| MessageId::new(m.id))
            .collect();

        Ok(MessagePage::new(ids, list.next_page_token))
    }

    fn fetch_raw(&self, id: &MessageId) -> Result<String> {
        let url = format!("{}?format=raw", self.message_url(id));
        debug!("GET {}", url);

        let mut response = self
            .agent
            .get(&url)
            .header("Authorization", &self.bearer()?)
            .call()
            .map_err(|e| self.request_error("get message", e))?;

        let message: RawMessage = response
            .body_mut()
            .read_json()
            .context("Failed to parse message response")?;

        message
            .raw
            .with_context(|| format!("No raw content found for message {}", id))
    }

    fn set_label(&self, id: &MessageId, label: &str, remove: bool) -> Result<bool> {
        let url = format!("{}/modify", self.message_url(id));
        debug!("POST {} ({} {})", url, if remove { "remove" } else { "add" }, label);

        let result = self
            .agent
            .post(&url)
            .header("Authorization", &self.bearer()?)
            .send_json(ModifyMessageRequest::for_label(label, remove));

        self.mutation_outcome("modify message", id, result)
    }

    fn delete_by_id(&self, id: &MessageId) -> Result<bool> {
        let url = self.message_url(id);
        debug!("DELETE {}", url);

        let result = self
            .agent
            .delete(&url)
            .header("Authorization", &self.bearer()?)
            .call();

        self.mutation_outcome("delete message", id, result)
    }
}
