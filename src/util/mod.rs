//! Utility functions shared by the feed and content modules.
//!
//! - **URL validation**: the configured feed URL must be absolute http(s)
//! - **Text processing**: terminal-safe sanitizing and whitespace normalization
//!
//! # Examples
//!
//! ```
//! use feedpost::util::{normalize_whitespace, strip_control_chars, validate_url};
//!
//! let url = validate_url("https://example.com/feed/").unwrap();
//! assert_eq!(url.path(), "/feed/");
//!
//! assert_eq!(normalize_whitespace("a   b\n\n\n\nc"), "a b\n\nc");
//! assert_eq!(strip_control_chars("\x1b[1mbold\x1b[0m"), "bold");
//! ```

mod text;
mod url_validator;

pub use text::{normalize_whitespace, strip_control_chars};
pub use url_validator::{validate_url, UrlValidationError};
