//! Lazy message iteration

use log::debug;
use std::collections::VecDeque;
use std::iter::FusedIterator;

use super::Mailbox;
use crate::error::{Error, Result};
use crate::models::{Message, MessageId};

/// Lazy, one-pass sequence of decoded messages.
///
/// Each call to `next` fetches and decodes at most one message, requesting a
/// new listing page only when the IDs from the previous page are used up.
/// Only the current page's IDs are held in memory.
///
/// A failed listing, fetch, or decode is returned as `Some(Err(_))` at the
/// step that hit it, and the sequence ends there. Failed messages are never
/// skipped or retried.
pub struct Messages<'a> {
    mailbox: &'a Mailbox,
    /// Messages still allowed to be yielded
    remaining: usize,
    /// IDs from the current page not yet fetched
    pending: VecDeque<MessageId>,
    next_page_token: Option<String>,
    listing_done: bool,
    finished: bool,
}

impl<'a> Messages<'a> {
    pub(super) fn new(mailbox: &'a Mailbox, max_results: usize) -> Self {
        Self {
            mailbox,
            remaining: max_results,
            pending: VecDeque::new(),
            next_page_token: None,
            listing_done: false,
            finished: max_results == 0,
        }
    }

    /// Next ID to fetch, listing further pages as needed
    fn next_id(&mut self) -> Result<Option<MessageId>> {
        loop {
            if let Some(id) = self.pending.pop_front() {
                return Ok(Some(id));
            }
            if self.listing_done {
                return Ok(None);
            }
            self.fetch_page()?;
        }
    }

    fn fetch_page(&mut self) -> Result<()> {
        let page_size = self
            .remaining
            .min(self.mailbox.options().effective_page_size());
        debug!(
            "Listing up to {} message IDs (page token: {:?})",
            page_size, self.next_page_token
        );

        let page = self
            .mailbox
            .transport()
            .list_ids(self.next_page_token.as_deref(), page_size)
            .map_err(Error::transport)?;

        // An empty page that hands back the same token would loop forever
        let stalled = page.ids.is_empty() && page.next_page_token == self.next_page_token;

        self.listing_done = page.next_page_token.is_none() || stalled;
        self.next_page_token = page.next_page_token;
        self.pending.extend(page.ids);
        Ok(())
    }
}

impl Iterator for Messages<'_> {
    type Item = Result<Message>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let id = match self.next_id() {
            Ok(Some(id)) => id,
            Ok(None) => {
                self.finished = true;
                return None;
            }
            Err(e) => {
                self.finished = true;
                return Some(Err(e));
            }
        };

        self.remaining -= 1;
        let result = self.mailbox.get(&id);
        if result.is_err() || self.remaining == 0 {
            self.finished = true;
        }
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.finished {
            (0, Some(0))
        } else {
            (0, Some(self.remaining))
        }
    }
}

impl FusedIterator for Messages<'_> {}
