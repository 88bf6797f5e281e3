//! In-memory transport implementation
//!
//! Backs a [`crate::Mailbox`] with an ordered list of raw messages. Used by
//! tests and demos; it also counts calls so tests can check how much work the
//! mailbox asked for.

use anyhow::{Context, Result, anyhow};
use base64::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use super::MailTransport;
use crate::models::{MessageId, MessagePage};

/// Labels given to messages inserted without explicit labels
const DEFAULT_LABELS: &[&str] = &["INBOX", "UNREAD"];

/// Page size used when none is configured
const DEFAULT_PAGE_SIZE: usize = 100;

/// Number of calls made to each transport operation
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransportCalls {
    pub list_ids: usize,
    pub fetch_raw: usize,
    pub set_label: usize,
    pub delete_by_id: usize,
}

struct StoredMessage {
    id: MessageId,
    raw: String,
    labels: BTreeSet<String>,
}

#[derive(Default)]
struct State {
    /// Messages in listing order
    messages: Vec<StoredMessage>,
    /// Fetches that should fail, with the error text to report
    fetch_failures: HashMap<MessageId, String>,
    calls: TransportCalls,
}

impl State {
    fn position(&self, id: &MessageId) -> Option<usize> {
        self.messages.iter().position(|m| &m.id == id)
    }
}

/// In-memory implementation of MailTransport
///
/// Page tokens are the decimal offset of the next message.
pub struct InMemoryTransport {
    state: Mutex<State>,
    page_size: usize,
}

impl InMemoryTransport {
    /// Create an empty mailbox
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Create an empty mailbox that never returns more than `page_size` IDs
    /// per listing page
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            state: Mutex::new(State::default()),
            page_size: page_size.max(1),
        }
    }

    /// Append a message whose source is already base64url encoded
    pub fn insert_raw(&self, id: impl Into<MessageId>, raw: impl Into<String>) -> Result<()> {
        self.insert_with_labels(id, raw, DEFAULT_LABELS)
    }

    /// Append a message given as RFC 5322 text
    pub fn insert_rfc822(&self, id: impl Into<MessageId>, source: &str) -> Result<()> {
        self.insert_raw(id, BASE64_URL_SAFE_NO_PAD.encode(source.as_bytes()))
    }

    /// Append a message with an explicit label set
    pub fn insert_with_labels(
        &self,
        id: impl Into<MessageId>,
        raw: impl Into<String>,
        labels: &[&str],
    ) -> Result<()> {
        let id = id.into();
        let mut state = self.state()?;
        if state.position(&id).is_some() {
            anyhow::bail!("Message {} already exists", id);
        }
        state.messages.push(StoredMessage {
            id,
            raw: raw.into(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
        });
        Ok(())
    }

    /// Make every fetch of `id` fail with `reason`
    pub fn fail_fetch(&self, id: impl Into<MessageId>, reason: impl Into<String>) -> Result<()> {
        self.state()?.fetch_failures.insert(id.into(), reason.into());
        Ok(())
    }

    /// Labels currently on a message, sorted; `None` if it does not exist
    pub fn labels(&self, id: &MessageId) -> Result<Option<Vec<String>>> {
        let state = self.state()?;
        Ok(state
            .position(id)
            .map(|pos| state.messages[pos].labels.iter().cloned().collect()))
    }

    pub fn contains(&self, id: &MessageId) -> Result<bool> {
        Ok(self.state()?.position(id).is_some())
    }

    /// Number of messages in the mailbox
    pub fn len(&self) -> Result<usize> {
        Ok(self.state()?.messages.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Snapshot of the call counters
    pub fn calls(&self) -> Result<TransportCalls> {
        Ok(self.state()?.calls)
    }

    fn state(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("In-memory transport lock poisoned"))
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MailTransport for InMemoryTransport {
    fn list_ids(&self, page_token: Option<&str>, page_size: usize) -> Result<MessagePage> {
        let mut state = self.state()?;
        state.calls.list_ids += 1;

        let start = match page_token {
            Some(token) => token
                .parse::<usize>()
                .with_context(|| format!("Invalid page token: {}", token))?,
            None => 0,
        };

        let limit = page_size.clamp(1, self.page_size);
        let end = start.saturating_add(limit).min(state.messages.len());
        let ids = state
            .messages
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .map(|m| m.id.clone())
            .collect();

        let next_page_token = (end < state.messages.len()).then(|| end.to_string());
        Ok(MessagePage::new(ids, next_page_token))
    }

    fn fetch_raw(&self, id: &MessageId) -> Result<String> {
        let mut state = self.state()?;
        state.calls.fetch_raw += 1;

        if let Some(reason) = state.fetch_failures.get(id) {
            return Err(anyhow!("{}", reason));
        }

        let pos = state
            .position(id)
            .with_context(|| format!("Message {} not found", id))?;
        Ok(state.messages[pos].raw.clone())
    }

    fn set_label(&self, id: &MessageId, label: &str, remove: bool) -> Result<bool> {
        let mut state = self.state()?;
        state.calls.set_label += 1;

        let Some(pos) = state.position(id) else {
            return Ok(false);
        };

        let labels = &mut state.messages[pos].labels;
        if remove {
            labels.remove(label);
        } else {
            labels.insert(label.to_string());
        }
        Ok(true)
    }

    fn delete_by_id(&self, id: &MessageId) -> Result<bool> {
        let mut state = self.state()?;
        state.calls.delete_by_id += 1;

        match state.position(id) {
            Some(pos) => {
                state.messages.remove(pos);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
