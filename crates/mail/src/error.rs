//! Error types for the mail client core

/// Errors surfaced by the decoder and the mailbox.
///
/// Transport failures are carried through untouched so callers can still
/// downcast to whatever the concrete transport produced.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The raw payload is not valid base64url
    #[error("Invalid base64url payload: {0}")]
    Decode(#[from] base64::DecodeError),

    /// The decoded bytes are not a usable email document
    #[error("Failed to parse message: {0}")]
    Parse(String),

    /// Failure reported by the transport collaborator
    #[error(transparent)]
    Transport(anyhow::Error),
}

impl Error {
    /// Wrap a transport failure without altering it
    pub fn transport(err: anyhow::Error) -> Self {
        Self::Transport(err)
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<mailparse::MailParseError> for Error {
    fn from(err: mailparse::MailParseError) -> Self {
        Self::Parse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
