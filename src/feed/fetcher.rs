use crate::feed::candidates::FetchPolicy;
use crate::feed::parser::{entry_to_record, parse_feed, EntryError};
use crate::storage::PostRecord;
use feed_rs::model::Entry;
use futures::StreamExt;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Transport-level failures while retrieving one candidate URL.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

/// Where feed documents come from.
///
/// The fetcher only needs "bytes for this URL or a transport error"; keeping that
/// behind a trait lets the candidate ladder run against scripted sources.
#[allow(async_fn_in_trait)]
pub trait FeedSource {
    async fn retrieve(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// [`FeedSource`] backed by a reqwest client.
///
/// One GET per call: no retries, a per-request timeout and a 10MB body cap.
#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFeedSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl FeedSource for HttpFeedSource {
    async fn retrieve(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = tokio::time::timeout(self.timeout, self.client.get(url).send())
            .await
            .map_err(|_| FetchError::Timeout)?
            .map_err(FetchError::Network)?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        read_limited_bytes(response, MAX_FEED_SIZE).await
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    if let Some(len) = expected_length {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}

// ============================================================================
// Fetch Outcome and Log
// ============================================================================

/// Result of a whole fetch.
///
/// `Found(vec![])` means at least one candidate answered but none had usable
/// entries; `Unreachable` means every candidate failed before parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Found(Vec<PostRecord>),
    Unreachable,
}

impl FetchOutcome {
    pub fn records(&self) -> Option<&[PostRecord]> {
        match self {
            Self::Found(records) => Some(records),
            Self::Unreachable => None,
        }
    }

    pub fn into_records(self) -> Option<Vec<PostRecord>> {
        match self {
            Self::Found(records) => Some(records),
            Self::Unreachable => None,
        }
    }
}

/// Why a candidate URL was passed over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Retrieval failed before any parsing
    Transport(String),
    /// The document did not parse as RSS/Atom
    Malformed(String),
    /// The feed parsed but had no entries
    Empty,
    /// Entries were present but none produced a record
    NoUsableEntries { entries: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateStatus {
    Accepted { entries: usize, records: usize },
    Skipped(SkipReason),
}

/// One tried candidate, in the order it was tried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateAttempt {
    pub url: String,
    pub status: CandidateStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntrySkip {
    /// An earlier entry in the batch already used this url
    Duplicate { url: String },
    Invalid(EntryError),
}

/// An entry of a processed candidate that did not make it into the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub candidate: String,
    /// Position of the entry in the feed document
    pub index: usize,
    pub cause: EntrySkip,
}

/// Everything that happened during a fetch, for callers and tests to inspect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchLog {
    pub candidates: Vec<CandidateAttempt>,
    pub skipped_entries: Vec<SkippedEntry>,
}

impl FetchLog {
    /// Number of retrievals performed.
    pub fn attempts(&self) -> usize {
        self.candidates.len()
    }

    /// URL of the candidate whose entries were used, if any.
    pub fn accepted_url(&self) -> Option<&str> {
        self.candidates
            .iter()
            .find(|c| matches!(c.status, CandidateStatus::Accepted { .. }))
            .map(|c| c.url.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchReport {
    pub outcome: FetchOutcome,
    pub log: FetchLog,
}

// ============================================================================
// Fetching
// ============================================================================

/// Fetches posts from `base_url`, walking the candidate ladder of `policy`.
///
/// Candidates are retrieved one at a time in priority order. A candidate is
/// skipped when retrieval fails, the document is malformed, it has no entries,
/// or none of its entries yields a record. The first candidate that yields at
/// least one record ends the walk; later candidates are never retrieved.
///
/// Records are deduplicated by url (first occurrence wins). Entries that cannot
/// be converted are skipped and recorded in the log.
///
/// `debug` only adds per-entry diagnostic events; the returned data is the same.
pub async fn fetch_posts<S: FeedSource>(
    source: &S,
    base_url: &str,
    posts_per_page: u32,
    policy: &FetchPolicy,
    debug: bool,
) -> FetchReport {
    let candidates = policy.candidate_urls(base_url, posts_per_page);
    let mut log = FetchLog::default();
    let mut reached_any = false;

    tracing::info!(
        base_url = %base_url,
        posts_per_page = posts_per_page,
        candidates = candidates.len(),
        "Fetching posts"
    );

    for url in candidates {
        let bytes = match source.retrieve(&url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Candidate unreachable, trying next");
                log.candidates.push(CandidateAttempt {
                    url,
                    status: CandidateStatus::Skipped(SkipReason::Transport(e.to_string())),
                });
                continue;
            }
        };
        reached_any = true;

        let entries = match parse_feed(&bytes) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Candidate returned a malformed feed, trying next");
                log.candidates.push(CandidateAttempt {
                    url,
                    status: CandidateStatus::Skipped(SkipReason::Malformed(e.to_string())),
                });
                continue;
            }
        };

        if entries.is_empty() {
            tracing::warn!(url = %url, "Candidate feed has no entries, trying next");
            log.candidates.push(CandidateAttempt {
                url,
                status: CandidateStatus::Skipped(SkipReason::Empty),
            });
            continue;
        }

        let entry_count = entries.len();
        let records = collect_records(&url, entries, &mut log, debug);

        if records.is_empty() {
            tracing::warn!(url = %url, entries = entry_count, "No usable entries in candidate, trying next");
            log.candidates.push(CandidateAttempt {
                url,
                status: CandidateStatus::Skipped(SkipReason::NoUsableEntries {
                    entries: entry_count,
                }),
            });
            continue;
        }

        tracing::info!(
            url = %url,
            entries = entry_count,
            posts = records.len(),
            attempts = log.candidates.len() + 1,
            "Fetched posts"
        );
        log.candidates.push(CandidateAttempt {
            url,
            status: CandidateStatus::Accepted {
                entries: entry_count,
                records: records.len(),
            },
        });

        return FetchReport {
            outcome: FetchOutcome::Found(records),
            log,
        };
    }

    let outcome = if reached_any {
        tracing::warn!(base_url = %base_url, "Feed reachable but no candidate yielded posts");
        FetchOutcome::Found(Vec::new())
    } else {
        tracing::error!(base_url = %base_url, attempts = log.candidates.len(), "Feed unreachable");
        FetchOutcome::Unreachable
    };

    FetchReport { outcome, log }
}

/// Converts one candidate's entries, deduplicating by url.
fn collect_records(
    candidate: &str,
    entries: Vec<Entry>,
    log: &mut FetchLog,
    debug: bool,
) -> Vec<PostRecord> {
    let mut seen: HashSet<String> = HashSet::with_capacity(entries.len());
    let mut records = Vec::with_capacity(entries.len());

    for (index, entry) in entries.into_iter().enumerate() {
        let cause = match entry_to_record(entry) {
            Ok(record) if seen.insert(record.url.clone()) => {
                if debug {
                    tracing::info!(
                        index = index,
                        title = %record.title,
                        url = %record.url,
                        published = %record.published,
                        content_chars = record.content.chars().count(),
                        images = record.images.len(),
                        "Parsed entry"
                    );
                }
                records.push(record);
                continue;
            }
            Ok(record) => {
                tracing::debug!(index = index, url = %record.url, "Duplicate entry skipped");
                EntrySkip::Duplicate { url: record.url }
            }
            Err(e) => {
                tracing::warn!(candidate = %candidate, index = index, error = %e, "Skipping entry");
                EntrySkip::Invalid(e)
            }
        };

        log.skipped_entries.push(SkippedEntry {
            candidate: candidate.to_string(),
            index,
            cause,
        });
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::candidates::CandidateStrategy;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const BASE: &str = "https://blog.example.com/feed/";

    const MALFORMED: &str = "<html><body>Maintenance</body></html>";

    const EMPTY_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Empty</title></channel></rss>"#;

    fn rss(items: &[(&str, &str)]) -> String {
        let items: String = items
            .iter()
            .map(|(title, link)| {
                format!(
                    "<item><title>{title}</title><link>{link}</link>\
                     <description>&lt;p&gt;About {title}&lt;/p&gt;</description></item>"
                )
            })
            .collect();
        format!(
            r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Blog</title>{items}</channel></rss>"#
        )
    }

    fn three_posts() -> String {
        rss(&[
            ("One", "https://blog.example.com/one"),
            ("Two", "https://blog.example.com/two"),
            ("Three", "https://blog.example.com/three"),
        ])
    }

    /// Serves fixed bodies per URL; unknown URLs fail at the transport level.
    #[derive(Default)]
    struct ScriptedSource {
        bodies: HashMap<String, String>,
        fallback: Option<String>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedSource {
        fn serving_everything(body: impl Into<String>) -> Self {
            Self {
                fallback: Some(body.into()),
                ..Self::default()
            }
        }

        fn with(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
            self.bodies.insert(url.into(), body.into());
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl FeedSource for ScriptedSource {
        async fn retrieve(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            self.calls.lock().unwrap().push(url.to_string());
            self.bodies
                .get(url)
                .or(self.fallback.as_ref())
                .map(|body| body.clone().into_bytes())
                .ok_or(FetchError::HttpStatus(503))
        }
    }

    fn candidate(index: usize) -> String {
        FetchPolicy::default().candidate_urls(BASE, 50)[index].clone()
    }

    async fn fetch(source: &ScriptedSource) -> FetchReport {
        fetch_posts(source, BASE, 50, &FetchPolicy::default(), false).await
    }

    fn urls(report: &FetchReport) -> Vec<String> {
        report
            .outcome
            .records()
            .unwrap_or_default()
            .iter()
            .map(|r| r.url.clone())
            .collect()
    }

    #[tokio::test]
    async fn test_stops_at_first_candidate_with_entries() {
        let source = ScriptedSource::serving_everything(three_posts());
        let report = fetch(&source).await;

        assert_eq!(source.calls(), vec![candidate(0)]);
        assert_eq!(report.log.attempts(), 1);
        assert_eq!(report.log.accepted_url(), Some(candidate(0).as_str()));
        assert_eq!(urls(&report).len(), 3);
    }

    #[tokio::test]
    async fn test_malformed_candidates_fall_through() {
        let source = ScriptedSource::default()
            .with(candidate(0), MALFORMED)
            .with(candidate(1), "<not valid xml")
            .with(candidate(2), three_posts())
            .with(candidate(3), rss(&[("Late", "https://blog.example.com/late")]));

        let report = fetch(&source).await;

        assert_eq!(source.calls().len(), 3);
        assert_eq!(
            urls(&report),
            vec![
                "https://blog.example.com/one",
                "https://blog.example.com/two",
                "https://blog.example.com/three",
            ]
        );
        assert!(matches!(
            report.log.candidates[0].status,
            CandidateStatus::Skipped(SkipReason::Malformed(_))
        ));
        assert!(matches!(
            report.log.candidates[1].status,
            CandidateStatus::Skipped(SkipReason::Malformed(_))
        ));
        assert_eq!(
            report.log.candidates[2].status,
            CandidateStatus::Accepted {
                entries: 3,
                records: 3
            }
        );
    }

    #[tokio::test]
    async fn test_empty_feed_treated_like_malformed() {
        let source = ScriptedSource::default()
            .with(candidate(0), EMPTY_RSS)
            .with(candidate(1), three_posts());

        let report = fetch(&source).await;

        assert_eq!(source.calls(), vec![candidate(0), candidate(1)]);
        assert_eq!(
            report.log.candidates[0].status,
            CandidateStatus::Skipped(SkipReason::Empty)
        );
        assert_eq!(urls(&report).len(), 3);
    }

    #[tokio::test]
    async fn test_all_transport_failures_is_unreachable() {
        let source = ScriptedSource::default();
        let report = fetch(&source).await;

        assert_eq!(report.outcome, FetchOutcome::Unreachable);
        assert_eq!(source.calls().len(), 7);
        assert!(report
            .log
            .candidates
            .iter()
            .all(|c| matches!(c.status, CandidateStatus::Skipped(SkipReason::Transport(_)))));
    }

    #[tokio::test]
    async fn test_reachable_but_empty_is_found_nothing() {
        let source = ScriptedSource::serving_everything(EMPTY_RSS);
        let report = fetch(&source).await;

        assert_eq!(report.outcome, FetchOutcome::Found(Vec::new()));
        assert_eq!(source.calls().len(), 7);
    }

    #[tokio::test]
    async fn test_mixed_failures_are_not_unreachable() {
        let source = ScriptedSource::default().with(candidate(4), MALFORMED);
        let report = fetch(&source).await;

        assert_eq!(report.outcome, FetchOutcome::Found(Vec::new()));
    }

    #[tokio::test]
    async fn test_duplicate_urls_deduplicated_first_wins() {
        let body = rss(&[
            ("First", "https://blog.example.com/a"),
            ("Second", "https://blog.example.com/b"),
            ("First again", "https://blog.example.com/a"),
        ]);
        let source = ScriptedSource::serving_everything(body);
        let report = fetch(&source).await;

        let records = report.outcome.records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "First");
        assert_eq!(
            report.log.skipped_entries,
            vec![SkippedEntry {
                candidate: candidate(0),
                index: 2,
                cause: EntrySkip::Duplicate {
                    url: "https://blog.example.com/a".to_string()
                },
            }]
        );
    }

    #[tokio::test]
    async fn test_invalid_entries_skipped_batch_continues() {
        let body = r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Blog</title>
            <item><title>Linkless</title><guid isPermaLink="false">x-1</guid></item>
            <item><title>Good</title><link>https://blog.example.com/good</link></item>
        </channel></rss>"#;
        let source = ScriptedSource::serving_everything(body);
        let report = fetch(&source).await;

        assert_eq!(urls(&report), vec!["https://blog.example.com/good"]);
        assert_eq!(
            report.log.skipped_entries[0].cause,
            EntrySkip::Invalid(EntryError::MissingLink)
        );
    }

    #[tokio::test]
    async fn test_candidate_without_usable_entries_falls_through() {
        let linkless = r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Blog</title>
            <item><title>Linkless</title><guid isPermaLink="false">x-1</guid></item>
        </channel></rss>"#;
        let source = ScriptedSource::default()
            .with(candidate(0), linkless)
            .with(candidate(1), three_posts());

        let report = fetch(&source).await;

        assert_eq!(
            report.log.candidates[0].status,
            CandidateStatus::Skipped(SkipReason::NoUsableEntries { entries: 1 })
        );
        assert_eq!(urls(&report).len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_is_idempotent() {
        let source = ScriptedSource::default()
            .with(candidate(0), MALFORMED)
            .with(candidate(1), three_posts());

        let first: HashSet<String> = urls(&fetch(&source).await).into_iter().collect();
        let second: HashSet<String> = urls(&fetch(&source).await).into_iter().collect();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_debug_does_not_change_results() {
        let source = ScriptedSource::serving_everything(three_posts());
        let quiet = fetch_posts(&source, BASE, 50, &FetchPolicy::default(), false).await;
        let verbose = fetch_posts(&source, BASE, 50, &FetchPolicy::default(), true).await;
        assert_eq!(quiet, verbose);
    }

    #[tokio::test]
    async fn test_custom_policy_order() {
        let source = ScriptedSource::default().with(BASE, three_posts());
        let policy = FetchPolicy::new(vec![CandidateStrategy::FixedCount(10), CandidateStrategy::Raw]);

        let report = fetch_posts(&source, BASE, 50, &policy, false).await;

        assert_eq!(
            source.calls(),
            vec![format!("{BASE}?posts_per_rss=10"), BASE.to_string()]
        );
        assert_eq!(urls(&report).len(), 3);
    }

    #[tokio::test]
    async fn test_records_carry_extracted_content() {
        let source = ScriptedSource::serving_everything(three_posts());
        let report = fetch(&source).await;
        let first = &report.outcome.records().unwrap()[0];
        assert_eq!(first.title, "One");
        assert_eq!(first.content, "About One");
        assert_eq!(first.linkedin_date, "");
    }
}
