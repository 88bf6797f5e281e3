//! HTML to plain text conversion for messages without a text/plain part

/// Block-level tags that start a new line
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "br", "tr", "li", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "table",
];

/// Strip markup from an HTML body.
///
/// - `<script>` and `<style>` blocks are removed with their content
/// - block elements become line breaks
/// - common entities are decoded
/// - runs of blank lines collapse to one
pub fn html_to_text(html: &str) -> String {
    let html = remove_tag_block(html, "script");
    let html = remove_tag_block(&html, "style");

    let mut text = String::with_capacity(html.len());
    let mut rest = html.as_str();

    while let Some(start) = rest.find('<') {
        text.push_str(&rest[..start]);
        let Some(len) = rest[start..].find('>') else {
            // Unterminated tag: drop the remainder
            rest = "";
            break;
        };
        if is_block_tag(&rest[start + 1..start + len]) {
            text.push('\n');
        }
        rest = &rest[start + len + 1..];
    }
    text.push_str(rest);

    collapse_blank_lines(&decode_html_entities(&text))
}

/// Tag name of `tag_body` (the text between `<` and `>`) is block-level
fn is_block_tag(tag_body: &str) -> bool {
    let name: String = tag_body
        .trim_start_matches('/')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    BLOCK_TAGS.contains(&name.as_str())
}

/// Remove every `<tag ...>...</tag>` block, case-insensitively
fn remove_tag_block(html: &str, tag: &str) -> String {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    // ASCII lowercasing keeps byte offsets aligned with `html`
    let lower = html.to_ascii_lowercase();

    let mut result = String::with_capacity(html.len());
    let mut pos = 0;
    while let Some(start) = lower[pos..].find(&open) {
        let start = pos + start;
        result.push_str(&html[pos..start]);
        match lower[start..].find(&close) {
            Some(end) => pos = start + end + close.len(),
            None => return result,
        }
    }
    result.push_str(&html[pos..]);
    result
}

/// Decode the HTML entities that show up in mail bodies
fn decode_html_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Trim each line and keep at most one blank line between paragraphs
fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_blank = false;

    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            if !prev_blank && !out.is_empty() {
                out.push('\n');
            }
            prev_blank = true;
        } else {
            out.push_str(line);
            out.push('\n');
            prev_blank = false;
        }
    }

    out.trim().to_string()
}
