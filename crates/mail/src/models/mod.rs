//! Domain models for mail entities

mod message;
mod page;

pub use message::{Message, MessageBuilder, MessageId, NO_SUBJECT, UNKNOWN_DATE};
pub use page::MessagePage;
