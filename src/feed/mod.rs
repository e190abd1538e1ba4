//! Feed retrieval and entry normalization.
//!
//! - `candidates`: the ladder of URL variants derived from the base feed URL
//! - `parser`: RSS/Atom parsing via `feed-rs` and entry → [`PostRecord`] conversion
//! - `fetcher`: the [`FeedSource`] seam, its reqwest implementation, and
//!   [`fetch_posts`], which walks the ladder until a candidate yields posts
//!
//! # Example
//!
//! ```ignore
//! use feedpost::feed::{fetch_posts, FetchOutcome, FetchPolicy, HttpFeedSource};
//!
//! let source = HttpFeedSource::new(reqwest::Client::new());
//! let report = fetch_posts(&source, "https://blog.example.com/feed/", 50, &FetchPolicy::default(), false).await;
//! match report.outcome {
//!     FetchOutcome::Found(posts) => println!("{} posts", posts.len()),
//!     FetchOutcome::Unreachable => eprintln!("feed unreachable"),
//! }
//! ```
//!
//! [`PostRecord`]: crate::storage::PostRecord

mod candidates;
mod fetcher;
mod parser;

pub use candidates::{CandidateStrategy, FetchPolicy};
pub use fetcher::{
    fetch_posts, CandidateAttempt, CandidateStatus, EntrySkip, FeedSource, FetchError,
    FetchLog, FetchOutcome, FetchReport, HttpFeedSource, SkipReason, SkippedEntry,
};
pub use parser::{entry_to_record, parse_feed, EntryError, ParseError};
