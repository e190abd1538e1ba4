use crate::util::{normalize_whitespace, strip_control_chars};
use scraper::{ElementRef, Html};

/// Elements that start a new paragraph.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "details", "dl", "div", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "main",
    "nav", "ol", "p", "pre", "section", "summary", "table", "ul",
];

/// Elements that start a new line within the current paragraph.
const LINE_ELEMENTS: &[&str] = &["br", "dd", "dt", "li", "tr"];

/// Elements whose text never reaches the reader.
const HIDDEN_ELEMENTS: &[&str] = &["head", "noscript", "script", "style", "template"];

/// Plain text and image sources pulled out of an entry's HTML body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedContent {
    pub text: String,
    pub images: Vec<String>,
}

#[derive(Default)]
struct Walk {
    text: String,
    images: Vec<String>,
    hidden_depth: usize,
    pre_depth: usize,
}

/// Converts entry HTML into normalized plain text plus image URLs.
///
/// Block elements become blank-line separated paragraphs, `<br>` and list items
/// become line breaks, and whitespace inside text follows HTML rules (collapsed)
/// except under `<pre>`. Image URLs are every non-blank `img[src]` in document
/// order, including images inside hidden elements.
pub fn extract_content(html: &str) -> ExtractedContent {
    if html.trim().is_empty() {
        return ExtractedContent::default();
    }

    let fragment = Html::parse_fragment(html);
    let mut walk = Walk::default();
    visit(fragment.root_element(), &mut walk);

    ExtractedContent {
        text: normalize_whitespace(&strip_control_chars(&walk.text)),
        images: walk.images,
    }
}

fn visit(element: ElementRef<'_>, walk: &mut Walk) {
    for child in element.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            let name = child_el.value().name();

            if name == "img" {
                if let Some(src) = child_el.value().attr("src").map(str::trim) {
                    if !src.is_empty() {
                        walk.images.push(src.to_string());
                    }
                }
            }

            let block = BLOCK_ELEMENTS.contains(&name);
            let hidden = HIDDEN_ELEMENTS.contains(&name);
            let pre = name == "pre";

            if block {
                walk.text.push_str("\n\n");
            } else if LINE_ELEMENTS.contains(&name) {
                // Breaks before itself only, so siblings stay on adjacent lines
                walk.text.push('\n');
            }
            walk.hidden_depth += usize::from(hidden);
            walk.pre_depth += usize::from(pre);

            visit(child_el, walk);

            walk.hidden_depth -= usize::from(hidden);
            walk.pre_depth -= usize::from(pre);
            if block {
                walk.text.push_str("\n\n");
            }
        } else if let Some(text) = child.value().as_text() {
            if walk.hidden_depth > 0 {
                continue;
            }
            if walk.pre_depth > 0 {
                walk.text.push_str(text);
            } else {
                // Source line breaks inside running text are plain spaces in HTML
                walk.text
                    .extend(text.chars().map(|c| if c.is_whitespace() { ' ' } else { c }));
            }
        }
    }
}
