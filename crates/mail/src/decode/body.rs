//! Body extraction from a parsed MIME tree

use log::{debug, warn};
use mailparse::{DispositionType, MailHeaderMap, ParsedMail};

use super::html::html_to_text;

/// Extract the best plain text body from a message.
///
/// The tree is walked depth-first and the first non-attachment `text/plain`
/// part wins. Without one, the first `text/html` part is converted to text.
/// Anything else yields an empty body.
pub(super) fn extract_body(mail: &ParsedMail<'_>) -> String {
    if let Some(part) = find_part(mail, "text/plain") {
        return decode_part_text(part, !std::ptr::eq(part, mail));
    }

    if let Some(part) = find_part(mail, "text/html") {
        return html_to_text(&decode_part_text(part, !std::ptr::eq(part, mail)));
    }

    String::new()
}

/// Pre-order search for the first inline part with the given MIME type
fn find_part<'a, 'b>(part: &'b ParsedMail<'a>, mimetype: &str) -> Option<&'b ParsedMail<'a>> {
    if part.ctype.mimetype == mimetype && !is_attachment(part) {
        return Some(part);
    }

    part.subparts
        .iter()
        .find_map(|sub| find_part(sub, mimetype))
}

fn is_attachment(part: &ParsedMail<'_>) -> bool {
    matches!(
        part.get_content_disposition().disposition,
        DispositionType::Attachment
    )
}

/// Undo the transfer encoding and decode the declared charset.
///
/// `nested` parts end with the line break that opens the next boundary
/// delimiter; it is not content and is removed.
fn decode_part_text(part: &ParsedMail<'_>, nested: bool) -> String {
    let mut bytes = match part.get_body_raw() {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("Transfer decoding failed, using raw part body: {}", e);
            raw_body(part.raw_bytes).to_vec()
        }
    };

    // base64 decoding already drops the delimiter's line break
    if nested && !is_base64(part) {
        strip_delimiter_newline(&mut bytes);
    }

    decode_charset(&part.ctype.charset, &bytes)
}

fn is_base64(part: &ParsedMail<'_>) -> bool {
    part.headers
        .get_first_value("Content-Transfer-Encoding")
        .is_some_and(|cte| cte.trim().eq_ignore_ascii_case("base64"))
}

/// Remove exactly one trailing CRLF or LF
fn strip_delimiter_newline(bytes: &mut Vec<u8>) {
    if bytes.ends_with(b"\r\n") {
        bytes.truncate(bytes.len() - 2);
    } else if bytes.ends_with(b"\n") {
        bytes.truncate(bytes.len() - 1);
    }
}

/// Everything after the header block of a raw part
fn raw_body(raw: &[u8]) -> &[u8] {
    if let Some(pos) = find_subslice(raw, b"\r\n\r\n") {
        &raw[pos + 4..]
    } else if let Some(pos) = find_subslice(raw, b"\n\n") {
        &raw[pos + 2..]
    } else {
        &[]
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Decode bytes using a charset label.
///
/// Unknown labels and malformed sequences never fail: they fall back to
/// lossy UTF-8 with replacement characters.
pub(super) fn decode_charset(charset: &str, bytes: &[u8]) -> String {
    let label = charset.trim().to_ascii_lowercase();
    match label.as_str() {
        "" | "utf-8" | "utf8" | "us-ascii" | "ascii" => String::from_utf8_lossy(bytes).into_owned(),
        _ => match encoding_rs::Encoding::for_label(label.as_bytes()) {
            Some(encoding) => {
                let (decoded, _, _) = encoding.decode(bytes);
                decoded.into_owned()
            }
            None => {
                warn!("Unknown charset {:?}, decoding as UTF-8", charset);
                String::from_utf8_lossy(bytes).into_owned()
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_of(raw: &str) -> String {
        let parsed = mailparse::parse_mail(raw.as_bytes()).unwrap();
        extract_body(&parsed)
    }

    #[test]
    fn test_single_part_plain() {
        assert_eq!(body_of("Subject: x\r\n\r\nHello there"), "Hello there");
    }

    #[test]
    fn test_prefers_plain_over_html() {
        let raw = "Content-Type: multipart/alternative; boundary=\"b1\"\r\n\
                   \r\n\
                   --b1\r\n\
                   Content-Type: text/html; charset=utf-8\r\n\
                   \r\n\
                   <p>HTML version</p>\r\n\
                   --b1\r\n\
                   Content-Type: text/plain; charset=utf-8\r\n\
                   \r\n\
                   Plain version\r\n\
                   --b1--\r\n";
        assert_eq!(body_of(raw), "Plain version");
    }

    #[test]
    fn test_html_only_is_stripped() {
        let raw = "Content-Type: multipart/alternative; boundary=\"b1\"\r\n\
                   \r\n\
                   --b1\r\n\
                   Content-Type: text/html\r\n\
                   \r\n\
                   <html><body><p>Hi &amp; welcome</p></body></html>\r\n\
                   --b1--\r\n";
        assert_eq!(body_of(raw), "Hi & welcome");
    }

    #[test]
    fn test_single_part_html_is_stripped() {
        let raw = "Content-Type: text/html\r\n\r\n<b>Bold</b> text";
        assert_eq!(body_of(raw), "Bold text");
    }

    #[test]
    fn test_nested_plain_found_depth_first() {
        let raw = "Content-Type: multipart/mixed; boundary=\"outer\"\r\n\
                   \r\n\
                   --outer\r\n\
                   Content-Type: multipart/alternative; boundary=\"inner\"\r\n\
                   \r\n\
                   --inner\r\n\
                   Content-Type: text/plain\r\n\
                   \r\n\
                   Nested plain\r\n\
                   --inner--\r\n\
                   --outer\r\n\
                   Content-Type: text/plain\r\n\
                   \r\n\
                   Later plain\r\n\
                   --outer--\r\n";
        assert_eq!(body_of(raw), "Nested plain");
    }

    #[test]
    fn test_skips_plain_attachment() {
        let raw = "Content-Type: multipart/mixed; boundary=\"b1\"\r\n\
                   \r\n\
                   --b1\r\n\
                   Content-Type: text/plain\r\n\
                   Content-Disposition: attachment; filename=\"notes.txt\"\r\n\
                   \r\n\
                   attached notes\r\n\
                   --b1\r\n\
                   Content-Type: text/plain\r\n\
                   \r\n\
                   Real body\r\n\
                   --b1--\r\n";
        assert_eq!(body_of(raw), "Real body");
    }

    #[test]
    fn test_no_text_parts_yields_empty() {
        let raw = "Content-Type: multipart/mixed; boundary=\"b1\"\r\n\
                   \r\n\
                   --b1\r\n\
                   Content-Type: application/pdf\r\n\
                   Content-Transfer-Encoding: base64\r\n\
                   \r\n\
                   JVBERi0xLjQK\r\n\
                   --b1--\r\n";
        assert_eq!(body_of(raw), "");
    }

    #[test]
    fn test_quoted_printable_latin1() {
        let raw = "Content-Type: text/plain; charset=iso-8859-1\r\n\
                   Content-Transfer-Encoding: quoted-printable\r\n\
                   \r\n\
                   Caf=E9 cr=E8me";
        assert_eq!(body_of(raw), "Café crème");
    }

    #[test]
    fn test_base64_utf8_part() {
        // "Grüße" in UTF-8
        let raw = "Content-Type: text/plain; charset=utf-8\r\n\
                   Content-Transfer-Encoding: base64\r\n\
                   \r\n\
                   R3LDvMOfZQ==";
        assert_eq!(body_of(raw), "Grüße");
    }

    #[test]
    fn test_only_delimiter_newline_removed() {
        let raw = "Content-Type: multipart/mixed; boundary=\"b1\"\r\n\
                   \r\n\
                   --b1\r\n\
                   Content-Type: text/plain\r\n\
                   \r\n\
                   Line one\r\n\
                   \r\n\
                   --b1--\r\n";
        assert_eq!(body_of(raw), "Line one\r\n");
    }

    #[test]
    fn test_nested_base64_part_keeps_content() {
        // "Hi\n" in base64
        let raw = "Content-Type: multipart/mixed; boundary=\"b1\"\r\n\
                   \r\n\
                   --b1\r\n\
                   Content-Type: text/plain; charset=utf-8\r\n\
                   Content-Transfer-Encoding: base64\r\n\
                   \r\n\
                   SGkK\r\n\
                   --b1--\r\n";
        assert_eq!(body_of(raw), "Hi\n");
    }

    #[test]
    fn test_strip_delimiter_newline() {
        let mut crlf = b"text\r\n\r\n".to_vec();
        strip_delimiter_newline(&mut crlf);
        assert_eq!(crlf, b"text\r\n");

        let mut lf = b"text\n".to_vec();
        strip_delimiter_newline(&mut lf);
        assert_eq!(lf, b"text");

        let mut bare = b"text".to_vec();
        strip_delimiter_newline(&mut bare);
        assert_eq!(bare, b"text");
    }

    #[test]
    fn test_decode_charset_known_label() {
        assert_eq!(decode_charset("windows-1252", &[0x93, b'q', 0x94]), "\u{201c}q\u{201d}");
        assert_eq!(decode_charset("ISO-8859-1", &[0xe9]), "é");
    }

    #[test]
    fn test_decode_charset_unknown_label_is_lossy() {
        assert_eq!(decode_charset("x-made-up", b"plain"), "plain");
        assert_eq!(decode_charset("x-made-up", &[b'a', 0xff]), "a\u{fffd}");
    }

    #[test]
    fn test_decode_charset_invalid_utf8_replaced() {
        assert_eq!(decode_charset("utf-8", &[b'o', b'k', 0xc3]), "ok\u{fffd}");
    }

    #[test]
    fn test_raw_body() {
        assert_eq!(raw_body(b"A: b\r\n\r\nbody"), b"body");
        assert_eq!(raw_body(b"A: b\n\nbody"), b"body");
        assert_eq!(raw_body(b"A: b"), b"");
    }
}
