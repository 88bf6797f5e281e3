//! Mail client core - read and triage a remote mailbox
//!
//! This crate provides:
//! - A raw message decoder (base64url RFC 5322 source to [`Message`])
//! - A lazy, paginated [`Mailbox::messages`] iterator
//! - Single-message mutations (mark read, delete)
//! - A [`MailTransport`] seam with Gmail and in-memory implementations
//!
//! The crate is synchronous and has zero UI dependencies.

pub mod config;
pub mod decode;
pub mod error;
pub mod gmail;
pub mod mailbox;
pub mod models;
pub mod transport;

pub use crate::config::GmailCredentials;
pub use decode::{MessageDecoder, RawMessageDecoder, decode_message, html_to_text, parse_message};
pub use error::{Error, Result};
pub use gmail::{GmailApiError, GmailAuth, GmailClient};
pub use mailbox::{DEFAULT_MAX_RESULTS, Mailbox, MailboxOptions, Messages};
pub use models::{Message, MessageBuilder, MessageId, MessagePage, NO_SUBJECT, UNKNOWN_DATE};
pub use transport::{InMemoryTransport, MailTransport, TransportCalls};
