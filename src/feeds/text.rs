//! Text cleanup for values pulled out of feed markup.

use regex::Regex;
use std::sync::LazyLock;

static CDATA_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").unwrap());

static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Replaces every CDATA section with its literal contents
pub fn unwrap_cdata(raw: &str) -> String {
    CDATA_PATTERN.replace_all(raw, "$1").into_owned()
}

/// Removes anything that looks like a markup tag
pub fn strip_tags(raw: &str) -> String {
    TAG_PATTERN.replace_all(raw, "").into_owned()
}

/// Decodes the five standard HTML entities.
///
/// `&amp;` goes last so `&amp;lt;` becomes `&lt;` and not `<`.
pub fn decode_entities(raw: &str) -> String {
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Full cleanup applied to every extracted field:
/// unwrap CDATA, strip tags, decode entities, trim.
pub fn clean_text(raw: &str) -> String {
    let unwrapped = unwrap_cdata(raw);
    let stripped = strip_tags(&unwrapped);
    decode_entities(&stripped).trim().to_string()
}

/// Markup-preserving variant used when looking for inline images
pub fn html_fragment(raw: &str) -> String {
    decode_entities(&unwrap_cdata(raw))
}

/// Truncates to at most `max_chars` characters, never splitting a code point
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
