use crate::content::extract_content;
use crate::storage::PostRecord;
use crate::util::{normalize_whitespace, strip_control_chars};
use feed_rs::model::Entry;
use feed_rs::parser;
use thiserror::Error;

/// The retrieved document is not a usable RSS/Atom feed.
#[derive(Debug, Error)]
#[error("Malformed feed: {0}")]
pub struct ParseError(String);

/// Why a single feed entry could not become a [`PostRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryError {
    /// Neither a link nor an http(s) id to use as the post's identity
    #[error("entry has no permalink")]
    MissingLink,
}

/// Parses RSS or Atom bytes into raw entries, in document order.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<Entry>, ParseError> {
    let feed = parser::parse(bytes).map_err(|e| ParseError(e.to_string()))?;
    Ok(feed.entries)
}

/// Converts one feed entry into a post record.
///
/// - title: entry title, `"Untitled"` when missing or blank
/// - url: first link, else the entry id when it is an http(s) URL
/// - published: published (or updated) date as RFC 2822, empty when absent
/// - content/images: extracted from the content body, falling back to the summary
pub fn entry_to_record(entry: Entry) -> Result<PostRecord, EntryError> {
    let url = entry
        .links
        .first()
        .map(|l| l.href.trim().to_string())
        .filter(|href| !href.is_empty())
        .or_else(|| {
            let id = entry.id.trim();
            (id.starts_with("http://") || id.starts_with("https://")).then(|| id.to_string())
        })
        .ok_or(EntryError::MissingLink)?;

    let title = entry
        .title
        .map(|t| normalize_whitespace(&strip_control_chars(&t.content)).replace('\n', " "))
        .unwrap_or_default();

    let published = entry
        .published
        .or(entry.updated)
        .map(|dt| dt.to_rfc2822())
        .unwrap_or_default();

    let html = entry
        .content
        .and_then(|c| c.body)
        .filter(|body| !body.trim().is_empty())
        .or_else(|| entry.summary.map(|s| s.content))
        .unwrap_or_default();

    let extracted = extract_content(&html);

    Ok(PostRecord::new(
        title,
        url,
        published,
        extracted.text,
        extracted.images,
    ))
}
