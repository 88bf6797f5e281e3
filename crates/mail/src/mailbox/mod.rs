//! Mailbox operations over an injected transport
//!
//! [`Mailbox`] is the entry point for callers: it streams decoded messages
//! with [`Mailbox::messages`] and forwards single-message mutations to the
//! transport. Nothing is cached; every call goes to the transport.

mod iter;

pub use iter::Messages;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::decode::{MessageDecoder, RawMessageDecoder};
use crate::error::{Error, Result};
use crate::models::{Message, MessageId};
use crate::transport::MailTransport;

/// Number of messages returned by [`Mailbox::recent`]
pub const DEFAULT_MAX_RESULTS: usize = 10;

/// Largest listing page the Gmail API accepts
pub const MAX_PAGE_SIZE: usize = 500;

/// Config file holding [`MailboxOptions`]
const OPTIONS_FILE: &str = "mailbox.json";

/// Label IDs the mailbox manipulates
pub mod labels {
    pub const UNREAD: &str = "UNREAD";
}

/// Tuning for listing requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailboxOptions {
    /// Upper bound on IDs requested per listing page
    pub page_size: usize,
}

impl Default for MailboxOptions {
    fn default() -> Self {
        Self { page_size: 100 }
    }
}

impl MailboxOptions {
    /// Load options from `mailbox.json` in the config directory, falling
    /// back to defaults when the file does not exist
    pub fn load() -> anyhow::Result<Self> {
        if config::config_exists(OPTIONS_FILE) {
            config::load_json(OPTIONS_FILE)
        } else {
            Ok(Self::default())
        }
    }

    /// Page size clamped to what a listing request accepts
    pub fn effective_page_size(&self) -> usize {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }
}

/// Read and mutate a remote mailbox through a [`MailTransport`].
///
/// The transport and decoder are passed in by the caller; the mailbox owns
/// no connection state of its own.
pub struct Mailbox {
    transport: Arc<dyn MailTransport>,
    decoder: Arc<dyn MessageDecoder>,
    options: MailboxOptions,
}

impl Mailbox {
    /// Create a mailbox that decodes base64url RFC 5322 payloads
    pub fn new(transport: Arc<dyn MailTransport>) -> Self {
        Self::with_decoder(transport, Arc::new(RawMessageDecoder))
    }

    /// Create a mailbox with a custom decoder
    pub fn with_decoder(
        transport: Arc<dyn MailTransport>,
        decoder: Arc<dyn MessageDecoder>,
    ) -> Self {
        Self {
            transport,
            decoder,
            options: MailboxOptions::default(),
        }
    }

    /// Replace the listing options
    pub fn with_options(mut self, options: MailboxOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &MailboxOptions {
        &self.options
    }

    /// Lazily stream up to `max_results` messages in listing order.
    ///
    /// Nothing is requested from the transport until the iterator is
    /// advanced. See [`Messages`] for failure behavior.
    pub fn messages(&self, max_results: usize) -> Messages<'_> {
        Messages::new(self, max_results)
    }

    /// The [`DEFAULT_MAX_RESULTS`] most recent messages
    pub fn recent(&self) -> Messages<'_> {
        self.messages(DEFAULT_MAX_RESULTS)
    }

    /// Fetch and decode a single message
    pub fn get(&self, id: &MessageId) -> Result<Message> {
        debug!("Fetching message {}", id);
        let raw = self.transport.fetch_raw(id).map_err(Error::transport)?;
        self.decoder.decode(id, &raw)
    }

    /// Mark a message as read by removing its UNREAD label
    ///
    /// Returns `false` if the transport rejected the change.
    pub fn mark_read(&self, id: &MessageId) -> Result<bool> {
        let updated = self
            .transport
            .set_label(id, labels::UNREAD, true)
            .map_err(Error::transport)?;

        if updated {
            info!("Marked message {} as read", id);
        } else {
            info!("Transport rejected marking message {} as read", id);
        }
        Ok(updated)
    }

    /// Permanently delete a message
    ///
    /// Returns `false` if the transport rejected the deletion.
    pub fn delete(&self, id: &MessageId) -> Result<bool> {
        let deleted = self
            .transport
            .delete_by_id(id)
            .map_err(Error::transport)?;

        if deleted {
            info!("Deleted message {}", id);
        } else {
            info!("Transport rejected deleting message {}", id);
        }
        Ok(deleted)
    }

    pub(crate) fn transport(&self) -> &dyn MailTransport {
        self.transport.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::InMemoryTransport;

    fn mailbox_with(transport: &Arc<InMemoryTransport>) -> Mailbox {
        Mailbox::new(transport.clone())
    }

    #[test]
    fn test_get_decodes_message() {
        let transport = Arc::new(InMemoryTransport::new());
        transport
            .insert_rfc822("m1", "From: a@example.com\r\nSubject: Hi\r\n\r\nBody")
            .unwrap();

        let msg = mailbox_with(&transport).get(&MessageId::new("m1")).unwrap();
        assert_eq!(msg.subject(), "Hi");
        assert_eq!(msg.from(), "a@example.com");
        assert_eq!(msg.body(), "Body");
    }

    #[test]
    fn test_get_is_not_cached() {
        let transport = Arc::new(InMemoryTransport::new());
        transport.insert_rfc822("m1", "Subject: Hi\r\n\r\nBody").unwrap();
        let mailbox = mailbox_with(&transport);

        mailbox.get(&MessageId::new("m1")).unwrap();
        mailbox.get(&MessageId::new("m1")).unwrap();
        assert_eq!(transport.calls().unwrap().fetch_raw, 2);
    }

    #[test]
    fn test_get_missing_is_transport_error() {
        let transport = Arc::new(InMemoryTransport::new());
        let err = mailbox_with(&transport)
            .get(&MessageId::new("missing"))
            .unwrap_err();
        assert!(err.is_transport());
    }

    #[test]
    fn test_get_bad_payload_is_decode_error() {
        let transport = Arc::new(InMemoryTransport::new());
        transport.insert_raw("m1", "%%%").unwrap();
        let err = mailbox_with(&transport).get(&MessageId::new("m1")).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_mark_read_removes_unread() {
        let transport = Arc::new(InMemoryTransport::new());
        transport.insert_rfc822("m1", "Subject: Hi\r\n\r\nBody").unwrap();
        let id = MessageId::new("m1");

        assert!(mailbox_with(&transport).mark_read(&id).unwrap());
        let current = transport.labels(&id).unwrap().unwrap();
        assert_eq!(current, vec!["INBOX"]);
    }

    #[test]
    fn test_mark_read_rejected() {
        let transport = Arc::new(InMemoryTransport::new());
        assert!(!mailbox_with(&transport)
            .mark_read(&MessageId::new("missing"))
            .unwrap());
    }

    #[test]
    fn test_delete() {
        let transport = Arc::new(InMemoryTransport::new());
        transport.insert_rfc822("m1", "Subject: Hi\r\n\r\nBody").unwrap();
        let mailbox = mailbox_with(&transport);
        let id = MessageId::new("m1");

        assert!(mailbox.delete(&id).unwrap());
        assert!(!mailbox.delete(&id).unwrap());
        assert!(transport.is_empty().unwrap());
    }

    #[test]
    fn test_options_defaults_and_clamp() {
        assert_eq!(MailboxOptions::default().effective_page_size(), 100);
        assert_eq!(MailboxOptions { page_size: 0 }.effective_page_size(), 1);
        assert_eq!(MailboxOptions { page_size: 9000 }.effective_page_size(), MAX_PAGE_SIZE);
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: MailboxOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, MailboxOptions::default());

        let options: MailboxOptions = serde_json::from_str(r#"{"page_size": 25}"#).unwrap();
        assert_eq!(options.page_size, 25);
    }
}
