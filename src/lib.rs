//! Blog feed ingestion and social-post formatting.
//!
//! - [`feed`] retrieves a syndication feed through a ladder of candidate URLs and
//!   turns its entries into [`storage::PostRecord`]s.
//! - [`content`] converts entry HTML to plain text and formats a record into a
//!   length-bounded post body.
//! - [`storage`] persists records as a JSON document.
//! - [`config`] loads the TOML configuration consumed by the binary.

pub mod config;
pub mod content;
pub mod feed;
pub mod storage;
pub mod util;
