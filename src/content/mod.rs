//! Turning feed HTML into postable text.
//!
//! - [`extract_content`] converts an entry's HTML body into normalized plain text
//!   and collects its image URLs (used while fetching).
//! - [`format_post`] lays a stored record out as a social post whose content is
//!   cut to fit a character budget, paragraph by paragraph.

mod formatter;
mod html;

pub use formatter::{
    body_budget, fit_to_budget, format_post, FormattedPost, ELLIPSIS, FOOTER_RESERVE,
    MIN_FRAGMENT,
};
pub use html::{extract_content, ExtractedContent};
