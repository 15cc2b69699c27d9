//! Tolerant RSS/Atom item extraction.
//!
//! External feeds are frequently malformed, so items are pulled out with
//! tag-level patterns instead of a strict XML parser. A document that an XML
//! parser would reject still yields whatever well-formed items it contains.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;
use uuid::Uuid;

use crate::feeds::text::{clean_text, html_fragment, truncate_chars};
use crate::models::NewFeedItem;

/// Max items taken from one document
pub const DEFAULT_MAX_ITEMS: usize = 20;

/// Max characters kept in an item summary
pub const DEFAULT_SUMMARY_MAX_CHARS: usize = 500;

type Pattern = LazyLock<Regex>;

static ITEM_BLOCK: Pattern = LazyLock::new(|| block_pattern("item"));
static ENTRY_BLOCK: Pattern = LazyLock::new(|| block_pattern("entry"));

static TITLE: Pattern = LazyLock::new(|| element_pattern("title"));
static LINK: Pattern = LazyLock::new(|| element_pattern("link"));
static DESCRIPTION: Pattern = LazyLock::new(|| element_pattern("description"));
static SUMMARY: Pattern = LazyLock::new(|| element_pattern("summary"));
static CONTENT_ENCODED: Pattern = LazyLock::new(|| element_pattern("content:encoded"));
static CONTENT: Pattern = LazyLock::new(|| element_pattern("content"));
static PUB_DATE: Pattern = LazyLock::new(|| element_pattern("pubDate"));
static PUBLISHED: Pattern = LazyLock::new(|| element_pattern("published"));
static UPDATED: Pattern = LazyLock::new(|| element_pattern("updated"));
static DC_DATE: Pattern = LazyLock::new(|| element_pattern("dc:date"));
static AUTHOR: Pattern = LazyLock::new(|| element_pattern("author"));
static DC_CREATOR: Pattern = LazyLock::new(|| element_pattern("dc:creator"));
static NAME: Pattern = LazyLock::new(|| element_pattern("name"));

static LINK_TAG: Pattern = LazyLock::new(|| open_tag_pattern("link"));
static MEDIA_CONTENT_TAG: Pattern = LazyLock::new(|| open_tag_pattern("media:content"));
static ENCLOSURE_TAG: Pattern = LazyLock::new(|| open_tag_pattern("enclosure"));
static IMG_TAG: Pattern = LazyLock::new(|| open_tag_pattern("img"));

static HREF_ATTR: Pattern = LazyLock::new(|| attr_pattern("href"));
static REL_ATTR: Pattern = LazyLock::new(|| attr_pattern("rel"));
static URL_ATTR: Pattern = LazyLock::new(|| attr_pattern("url"));
static SRC_ATTR: Pattern = LazyLock::new(|| attr_pattern("src"));

/// `<tag ...>body</tag>` container, body in group 1
fn block_pattern(tag: &str) -> Regex {
    let tag = regex::escape(tag);
    Regex::new(&format!(r"(?is)<{tag}(?:\s[^>]*)?>(.*?)</{tag}\s*>")).unwrap()
}

/// Non-self-closing element, body in group 1
fn element_pattern(tag: &str) -> Regex {
    let tag = regex::escape(tag);
    Regex::new(&format!(
        r"(?is)<{tag}(?:\s+[^>]*[^/>\s])?\s*>(.*?)</{tag}\s*>"
    ))
    .unwrap()
}

/// Opening (or self-closing) tag, attributes in group 1
fn open_tag_pattern(tag: &str) -> Regex {
    let tag = regex::escape(tag);
    Regex::new(&format!(r"(?is)<{tag}(\s[^>]*)?/?>")).unwrap()
}

fn attr_pattern(name: &str) -> Regex {
    let name = regex::escape(name);
    Regex::new(&format!(r#"(?i)(?:^|\s){name}\s*=\s*["']([^"']*)["']"#)).unwrap()
}

/// Item extracted from a feed document, not yet tied to a source
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedItem {
    pub title: String,
    pub link: String,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
}

impl ParsedItem {
    pub fn into_new_item(self, source_id: Uuid) -> NewFeedItem {
        NewFeedItem {
            source_id,
            title: self.title,
            link: self.link,
            summary: self.summary,
            content: self.content,
            author: self.author,
            image_url: self.image_url,
            published_at: self.published_at,
        }
    }
}

/// RSS/Atom item parser
#[derive(Debug, Clone)]
pub struct FeedParser {
    max_items: usize,
    summary_max_chars: usize,
}

impl Default for FeedParser {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ITEMS, DEFAULT_SUMMARY_MAX_CHARS)
    }
}

impl FeedParser {
    pub fn new(max_items: usize, summary_max_chars: usize) -> Self {
        Self {
            max_items,
            summary_max_chars,
        }
    }

    /// Extracts up to `max_items` valid items in document order.
    ///
    /// Items without a title or a link are dropped before the cap applies.
    /// `now` stands in for missing or unparsable publish dates.
    pub fn parse(&self, document: &str, now: DateTime<Utc>) -> Vec<ParsedItem> {
        let mut blocks: Vec<&str> = item_blocks(&ITEM_BLOCK, document);
        if blocks.is_empty() {
            blocks = item_blocks(&ENTRY_BLOCK, document);
        }

        blocks
            .into_iter()
            .filter_map(|block| self.parse_item(block, now))
            .take(self.max_items)
            .collect()
    }

    fn parse_item(&self, block: &str, now: DateTime<Utc>) -> Option<ParsedItem> {
        let title = first_text(block, &[&TITLE])?;
        let link = first_text(block, &[&LINK]).or_else(|| atom_link(block))?;

        let raw_description = first_element(block, &[&DESCRIPTION, &SUMMARY]);
        let raw_content = first_element(block, &[&CONTENT_ENCODED, &CONTENT]);

        let description = raw_description.map(clean_text).filter(|s| !s.is_empty());
        let content = raw_content
            .map(clean_text)
            .filter(|s| !s.is_empty())
            .or_else(|| description.clone());
        let summary = description
            .as_deref()
            .map(|d| truncate_chars(d, self.summary_max_chars).to_string());

        let published_at = first_text(block, &[&PUB_DATE, &PUBLISHED, &UPDATED, &DC_DATE])
            .and_then(|raw| parse_date(&raw))
            .unwrap_or(now);

        Some(ParsedItem {
            title,
            link,
            summary,
            content,
            author: extract_author(block),
            image_url: extract_image(block, raw_content, raw_description),
            published_at,
        })
    }
}

fn item_blocks<'a>(pattern: &Regex, document: &'a str) -> Vec<&'a str> {
    pattern
        .captures_iter(document)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect()
}

/// Raw body of the first element matching any pattern, tried in order
fn first_element<'a>(block: &'a str, patterns: &[&Pattern]) -> Option<&'a str> {
    patterns.iter().find_map(|pattern| {
        pattern
            .captures(block)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    })
}

/// Cleaned text of the first element with non-empty content
fn first_text(block: &str, patterns: &[&Pattern]) -> Option<String> {
    patterns.iter().find_map(|pattern| {
        pattern
            .captures(block)
            .and_then(|caps| caps.get(1))
            .map(|m| clean_text(m.as_str()))
            .filter(|s| !s.is_empty())
    })
}

fn attr_value(attrs: &str, pattern: &Regex) -> Option<String> {
    pattern
        .captures(attrs)
        .and_then(|caps| caps.get(1))
        .map(|m| clean_text(m.as_str()))
        .filter(|s| !s.is_empty())
}

/// First attribute value found on any tag matched by `tag`
fn first_attr(text: &str, tag: &Regex, attr: &Regex) -> Option<String> {
    tag.captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .find_map(|attrs| attr_value(attrs.as_str(), attr))
}

/// Atom `<link href="..."/>`, preferring the alternate (or unlabelled) link
fn atom_link(block: &str) -> Option<String> {
    let mut fallback = None;

    for attrs in LINK_TAG.captures_iter(block).filter_map(|caps| caps.get(1)) {
        let Some(href) = attr_value(attrs.as_str(), &HREF_ATTR) else {
            continue;
        };
        match attr_value(attrs.as_str(), &REL_ATTR).as_deref() {
            None | Some("alternate") => return Some(href),
            Some(_) => {
                fallback.get_or_insert(href);
            }
        }
    }

    fallback
}

fn extract_author(block: &str) -> Option<String> {
    if let Some(raw) = first_element(block, &[&AUTHOR]) {
        // Atom wraps the author in <name>/<email>
        if let Some(name) = first_text(raw, &[&NAME]) {
            return Some(name);
        }
    }
    first_text(block, &[&AUTHOR, &DC_CREATOR])
}

/// Image priority: media:content, then enclosure, then the first inline
/// `<img>` in the content or the description.
fn extract_image(
    block: &str,
    raw_content: Option<&str>,
    raw_description: Option<&str>,
) -> Option<String> {
    first_attr(block, &MEDIA_CONTENT_TAG, &URL_ATTR)
        .or_else(|| first_attr(block, &ENCLOSURE_TAG, &URL_ATTR))
        .or_else(|| {
            [raw_content, raw_description]
                .into_iter()
                .flatten()
                .find_map(|raw| first_attr(&html_fragment(raw), &IMG_TAG, &SRC_ATTR))
        })
}

/// RFC 2822 (RSS) or RFC 3339 (Atom)
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}
