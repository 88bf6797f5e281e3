//! One page of a message listing

use super::MessageId;

/// Identifiers returned by a single listing request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagePage {
    /// Message IDs in the order the remote returned them
    pub ids: Vec<MessageId>,
    /// Token for the following page, `None` on the last page
    pub next_page_token: Option<String>,
}

impl MessagePage {
    pub fn new(ids: Vec<MessageId>, next_page_token: Option<String>) -> Self {
        Self {
            ids,
            next_page_token,
        }
    }

    /// A page with no continuation
    pub fn last(ids: Vec<MessageId>) -> Self {
        Self::new(ids, None)
    }

    pub fn is_last(&self) -> bool {
        self.next_page_token.is_none()
    }
}
