//! Raw message decoding
//!
//! Turns the base64url `raw` payload returned by a mail API into a
//! [`Message`]:
//! - base64url decoding (padded or unpadded)
//! - RFC 5322 parsing via `mailparse`
//! - header extraction with sentinel defaults
//! - best-effort plain text body extraction (see [`body`])

mod body;
mod html;

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use chrono::DateTime;
use log::debug;
use mailparse::{MailHeaderMap, ParsedMail};

use crate::error::{Error, Result};
use crate::models::{Message, MessageId, UNKNOWN_DATE};

pub use html::html_to_text;

/// Output format for the `Date` field
const DATE_FORMAT: &str = "%m/%d/%Y";

/// Share of non-printable bytes above which non-UTF-8 input is rejected
const BINARY_THRESHOLD: f64 = 0.5;

/// URL-safe alphabet, padding optional
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Standard alphabet, padding optional
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Converts a remote message payload into a [`Message`].
///
/// [`crate::Mailbox`] takes any implementation, so callers can swap in a
/// decoder for a different payload format without touching the iterator.
pub trait MessageDecoder: Send + Sync {
    fn decode(&self, id: &MessageId, raw: &str) -> Result<Message>;
}

/// Decoder for base64url-encoded RFC 5322 payloads (Gmail `format=raw`)
#[derive(Debug, Default, Clone, Copy)]
pub struct RawMessageDecoder;

impl MessageDecoder for RawMessageDecoder {
    fn decode(&self, id: &MessageId, raw: &str) -> Result<Message> {
        decode_message(id.clone(), raw)
    }
}

/// Decode a base64url-encoded email into a [`Message`]
///
/// # Errors
/// * [`Error::Decode`] if `raw` is not valid base64url
/// * [`Error::Parse`] if the decoded bytes are not an email document
pub fn decode_message(id: impl Into<MessageId>, raw: &str) -> Result<Message> {
    let id = id.into();
    let bytes = decode_base64url(raw).inspect_err(|e| {
        debug!("Message {}: {}", id, e);
    })?;
    parse_message(id, &bytes)
}

/// Parse already-decoded RFC 5322 bytes into a [`Message`]
pub fn parse_message(id: impl Into<MessageId>, bytes: &[u8]) -> Result<Message> {
    let id = id.into();
    validate_document(bytes).inspect_err(|e| {
        debug!("Message {}: {}", id, e);
    })?;

    let parsed = mailparse::parse_mail(bytes)?;
    if parsed.headers.is_empty() && !starts_with_blank_line(bytes) {
        return Err(Error::Parse("no header block found".to_string()));
    }

    let mut builder = Message::builder(id)
        .date(normalize_date(header(&parsed, "Date").as_deref()))
        .body(body::extract_body(&parsed));

    if let Some(from) = header(&parsed, "From") {
        builder = builder.from(from);
    }
    if let Some(to) = header(&parsed, "To") {
        builder = builder.to(to);
    }
    if let Some(subject) = header(&parsed, "Subject") {
        builder = builder.subject(subject);
    }

    Ok(builder.build())
}

/// Decode base64url, falling back to the standard alphabet
fn decode_base64url(raw: &str) -> Result<Vec<u8>> {
    let raw = raw.trim();
    match URL_SAFE_LENIENT.decode(raw) {
        Ok(bytes) => Ok(bytes),
        Err(err) => STANDARD_LENIENT.decode(raw).map_err(|_| Error::Decode(err)),
    }
}

/// Reject input that cannot be an email before handing it to the parser
fn validate_document(bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() {
        return Err(Error::Parse("message is empty".to_string()));
    }
    if is_binary_garbage(bytes) {
        return Err(Error::Parse("message is binary data".to_string()));
    }
    if !starts_with_blank_line(bytes) && !starts_with_header(bytes) {
        return Err(Error::Parse("no header block found".to_string()));
    }
    Ok(())
}

/// True for non-UTF-8 data that is mostly non-printable bytes
fn is_binary_garbage(bytes: &[u8]) -> bool {
    if bytes.is_empty() || std::str::from_utf8(bytes).is_ok() {
        return false;
    }

    let non_printable = bytes
        .iter()
        .filter(|&&b| (b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r')) || b > 0x7e)
        .count();

    non_printable as f64 / bytes.len() as f64 > BINARY_THRESHOLD
}

fn starts_with_blank_line(bytes: &[u8]) -> bool {
    bytes.starts_with(b"\n") || bytes.starts_with(b"\r\n")
}

/// True if the first line is shaped like `Name: value`
fn starts_with_header(bytes: &[u8]) -> bool {
    let first_line = bytes.split(|&b| b == b'\n').next().unwrap_or_default();
    match first_line.iter().position(|&b| b == b':') {
        Some(0) | None => false,
        Some(colon) => first_line[..colon]
            .iter()
            .all(|&b| b.is_ascii_graphic() && b != b':'),
    }
}

/// First value of a header, RFC 2047 decoded and trimmed
fn header(parsed: &ParsedMail<'_>, name: &str) -> Option<String> {
    parsed
        .headers
        .get_first_value(name)
        .map(|value| value.trim().to_string())
}

/// Render a `Date` header as `MM/DD/YYYY`.
///
/// The calendar date is taken in the header's own offset. Values that are
/// neither RFC 2822 nor RFC 3339 are returned as written.
fn normalize_date(raw: Option<&str>) -> String {
    let raw = match raw.map(str::trim) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return UNKNOWN_DATE.to_string(),
    };

    let without_comment = strip_trailing_comment(raw);
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc2822(without_comment))
        .or_else(|_| DateTime::parse_from_rfc3339(without_comment))
        .map(|dt| dt.format(DATE_FORMAT).to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// Drop a trailing `(PST)`-style comment from a date
fn strip_trailing_comment(raw: &str) -> &str {
    match raw.rfind('(') {
        Some(open) if raw.ends_with(')') => raw[..open].trim_end(),
        _ => raw,
    }
}
