use crate::storage::PostRecord;
use crate::util::normalize_whitespace;

/// Characters reserved for the title marker, separators and "read more" footer.
pub const FOOTER_RESERVE: usize = 50;

/// A partial paragraph is only appended when more than this many characters remain.
pub const MIN_FRAGMENT: usize = 10;

pub const ELLIPSIS: &str = "...";

const PARAGRAPH_BREAK: &str = "\n\n";
const TITLE_MARKER: &str = "🔹";
const READ_MORE: &str = "📖 Read more:";
const IMAGES_HEADER: &str = "📷 Images:";

/// A post body ready to paste, plus the images to attach alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedPost {
    pub body: String,
    pub images: Vec<String>,
}

/// Formats a stored post as a length-bounded social post.
///
/// The body is laid out as
///
/// ```text
/// 🔹 {title}
///
/// {content, truncated to the budget}
///
/// 📖 Read more: {url}
///
/// 📷 Images:
/// - Image 1: {image}
/// ```
///
/// Only the content is shortened; see [`body_budget`] and [`fit_to_budget`].
/// The image section is never truncated and is omitted when there are no images.
pub fn format_post(record: &PostRecord, max_length: usize) -> FormattedPost {
    let content = normalize_whitespace(&record.content);
    let budget = body_budget(max_length, &record.title, &record.url);
    let text = fit_to_budget(&content, budget);

    if text.len() < content.len() {
        tracing::debug!(
            url = %record.url,
            budget = budget,
            original_chars = content.chars().count(),
            kept_chars = text.chars().count(),
            "Truncated post content"
        );
    }

    let mut body = format!("{TITLE_MARKER} {}{PARAGRAPH_BREAK}", record.title);
    if !text.is_empty() {
        body.push_str(&text);
        body.push_str(PARAGRAPH_BREAK);
    }
    body.push_str(READ_MORE);
    body.push(' ');
    body.push_str(&record.url);

    if !record.images.is_empty() {
        body.push_str(PARAGRAPH_BREAK);
        body.push_str(IMAGES_HEADER);
        for (i, image) in record.images.iter().enumerate() {
            body.push_str(&format!("\n- Image {}: {}", i + 1, image));
        }
    }

    FormattedPost {
        body,
        images: record.images.clone(),
    }
}

/// Characters left for content once the title, url and footer are reserved.
///
/// Lengths count Unicode scalar values. A title or url longer than
/// `max_length` leaves no budget rather than failing.
pub fn body_budget(max_length: usize, title: &str, url: &str) -> usize {
    let reserved = title
        .chars()
        .count()
        .saturating_add(url.chars().count())
        .saturating_add(FOOTER_RESERVE);
    max_length.saturating_sub(reserved)
}

/// Shortens normalized content to at most `budget` characters.
///
/// Content that fits is returned unchanged. Otherwise whole paragraphs are kept
/// while they fit (each costs its length plus a blank-line separator). The first
/// paragraph that does not fit is cut at a word boundary and ends in
/// [`ELLIPSIS`], unless no more than [`MIN_FRAGMENT`] characters remain.
pub fn fit_to_budget(content: &str, budget: usize) -> String {
    if content.chars().count() <= budget {
        return content.to_string();
    }

    let separator_len = PARAGRAPH_BREAK.len();
    let mut out = String::new();
    let mut used = 0usize;

    for paragraph in content.split(PARAGRAPH_BREAK) {
        let len = paragraph.chars().count();
        if used + len + separator_len <= budget {
            out.push_str(paragraph);
            out.push_str(PARAGRAPH_BREAK);
            used += len + separator_len;
            continue;
        }

        let remaining = budget - used;
        if remaining > MIN_FRAGMENT {
            out.push_str(&truncate_at_word(paragraph, remaining));
        }
        break;
    }

    out.truncate(out.trim_end().len());
    out
}

/// Cuts `paragraph` so that the result plus ellipsis is at most `max_chars`.
///
/// Backs up to the last whitespace when the cut would split a word; a single
/// word longer than the limit is cut mid-word.
fn truncate_at_word(paragraph: &str, max_chars: usize) -> String {
    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let cut = paragraph
        .char_indices()
        .nth(keep)
        .map_or(paragraph.len(), |(idx, _)| idx);

    let head = &paragraph[..cut];
    let splits_word = paragraph[cut..]
        .chars()
        .next()
        .is_some_and(|c| !c.is_whitespace());

    let head = match head.rfind(char::is_whitespace) {
        Some(idx) if splits_word && idx > 0 => &head[..idx],
        _ => head,
    };

    format!("{}{}", head.trim_end(), ELLIPSIS)
}
