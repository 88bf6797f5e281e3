//! Message model representing a decoded email

use serde::{Deserialize, Serialize};
use std::fmt;

/// Subject used when the message carries no `Subject` header
pub const NO_SUBJECT: &str = "No Subject";

/// Date used when the message carries no `Date` header
pub const UNKNOWN_DATE: &str = "Unknown Date";

/// Unique identifier for a message, assigned by the remote mailbox
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A normalized email message.
///
/// Every field is a plain string. Headers that were absent from the source
/// resolve to sentinel values instead of being optional, so a `Message` is
/// always fully populated. There are no setters: changes such as marking a
/// message read happen on the remote mailbox through [`crate::Mailbox`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    from: String,
    to: String,
    date: String,
    subject: String,
    body: String,
}

impl Message {
    /// Create a new message builder
    pub fn builder(id: impl Into<MessageId>) -> MessageBuilder {
        MessageBuilder::new(id.into())
    }

    pub fn id(&self) -> &MessageId {
        &self.id
    }

    /// Sender as written in the `From` header, or empty
    pub fn from(&self) -> &str {
        &self.from
    }

    /// Recipients as written in the `To` header, or empty
    pub fn to(&self) -> &str {
        &self.to
    }

    /// Send date as `MM/DD/YYYY`
    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Plain text body
    pub fn body(&self) -> &str {
        &self.body
    }
}

/// Builder for creating Message instances
pub struct MessageBuilder {
    id: MessageId,
    from: Option<String>,
    to: Option<String>,
    date: Option<String>,
    subject: Option<String>,
    body: Option<String>,
}

impl MessageBuilder {
    fn new(id: MessageId) -> Self {
        Self {
            id,
            from: None,
            to: None,
            date: None,
            subject: None,
            body: None,
        }
    }

    pub fn from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    pub fn date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn build(self) -> Message {
        Message {
            id: self.id,
            from: self.from.unwrap_or_default(),
            to: self.to.unwrap_or_default(),
            date: self.date.unwrap_or_else(|| UNKNOWN_DATE.to_string()),
            subject: self
                .subject
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| NO_SUBJECT.to_string()),
            body: self.body.unwrap_or_default(),
        }
    }
}
