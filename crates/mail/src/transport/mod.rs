//! Transport abstraction over a remote mailbox
//!
//! The core never talks to a mail server directly. Everything it needs from
//! the remote side goes through [`MailTransport`], so the Gmail client, the
//! in-memory mailbox, or any other provider can back a [`crate::Mailbox`].

mod memory;

pub use memory::{InMemoryTransport, TransportCalls};

use anyhow::Result;

use crate::models::{MessageId, MessagePage};

/// Operations the core requires from an authenticated mail transport.
///
/// Errors are passed through to callers as [`crate::Error::Transport`]
/// without interpretation or retries.
pub trait MailTransport: Send + Sync {
    /// List one page of message IDs, most recent first
    ///
    /// `page_size` is a hint; implementations may return fewer or more IDs.
    fn list_ids(&self, page_token: Option<&str>, page_size: usize) -> Result<MessagePage>;

    /// Fetch the base64url-encoded RFC 5322 source of a message
    fn fetch_raw(&self, id: &MessageId) -> Result<String>;

    /// Add (`remove = false`) or remove (`remove = true`) a label.
    ///
    /// Returns `Ok(false)` when the remote rejected the change, for example
    /// because the message does not exist.
    fn set_label(&self, id: &MessageId, label: &str, remove: bool) -> Result<bool>;

    /// Permanently delete a message. `Ok(false)` when the remote rejected it.
    fn delete_by_id(&self, id: &MessageId) -> Result<bool>;
}
