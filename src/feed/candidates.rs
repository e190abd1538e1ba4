use serde::{Deserialize, Serialize};
use url::Url;

/// Query parameter WordPress-style feeds read as the number of items to return.
const PER_PAGE_PARAM: &str = "posts_per_rss";

/// One rung of the candidate ladder: a way to derive a retrieval URL from the
/// configured base feed URL.
///
/// Deserializes from snake_case names, e.g. `"merged_query"` or
/// `{ fixed_count = 100 }` in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStrategy {
    /// `posts_per_rss`, `orderby=date` and `order=DESC` merged into the existing query.
    MergedQuery,
    /// `?posts_per_rss=<posts_per_page>` appended verbatim.
    PerPage,
    /// `?posts_per_rss=<n>` appended verbatim.
    FixedCount(u32),
    /// `/feed/` rewritten to `/feed/rss2/`.
    Rss2Path,
    /// The `/feed/rss2/` rewrite with `?posts_per_rss=<posts_per_page>` appended.
    Rss2PathPerPage,
    /// The base URL untouched.
    Raw,
}

impl CandidateStrategy {
    pub fn build(&self, base_url: &str, posts_per_page: u32) -> String {
        match self {
            Self::MergedQuery => merge_query(
                base_url,
                &[
                    (PER_PAGE_PARAM, posts_per_page.to_string()),
                    ("orderby", "date".to_string()),
                    ("order", "DESC".to_string()),
                ],
            ),
            Self::PerPage => append_per_page(base_url, posts_per_page),
            Self::FixedCount(count) => append_per_page(base_url, *count),
            Self::Rss2Path => rss2_path(base_url),
            Self::Rss2PathPerPage => append_per_page(&rss2_path(base_url), posts_per_page),
            Self::Raw => base_url.to_string(),
        }
    }
}

/// Ordered list of candidate strategies tried by the fetcher.
///
/// Many blog hosts cap feeds at a small default item count and honor the
/// `posts_per_rss` override inconsistently, so the default ladder goes from the
/// variant most likely to return everything down to the bare URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FetchPolicy {
    pub ladder: Vec<CandidateStrategy>,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            ladder: vec![
                CandidateStrategy::MergedQuery,
                CandidateStrategy::PerPage,
                CandidateStrategy::FixedCount(100),
                CandidateStrategy::FixedCount(200),
                CandidateStrategy::Rss2Path,
                CandidateStrategy::Rss2PathPerPage,
                CandidateStrategy::Raw,
            ],
        }
    }
}

impl FetchPolicy {
    pub fn new(ladder: Vec<CandidateStrategy>) -> Self {
        Self { ladder }
    }

    /// Expands the ladder into retrieval URLs in priority order.
    ///
    /// A URL produced by more than one rung (e.g. the `/feed/rss2/` rewrite of a
    /// base URL without `/feed/`) keeps only its first position.
    pub fn candidate_urls(&self, base_url: &str, posts_per_page: u32) -> Vec<String> {
        let mut urls: Vec<String> = Vec::with_capacity(self.ladder.len());
        for strategy in &self.ladder {
            let url = strategy.build(base_url, posts_per_page);
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
        urls
    }
}

fn append_per_page(base_url: &str, count: u32) -> String {
    format!("{base_url}?{PER_PAGE_PARAM}={count}")
}

fn rss2_path(base_url: &str) -> String {
    base_url.replace("/feed/", "/feed/rss2/")
}

/// Sets `overrides` in the URL's query string, keeping every other parameter
/// in place. An overridden key keeps the position of its first occurrence.
///
/// The query is rebuilt as `application/x-www-form-urlencoded`, so existing
/// values keep their meaning but not their bytes (`%20` comes back as `+`).
fn merge_query(base_url: &str, overrides: &[(&str, String)]) -> String {
    let Ok(mut url) = Url::parse(base_url) else {
        // Unparseable base: fall back to appending, the retrieval will report it
        let query: Vec<String> = overrides.iter().map(|(k, v)| format!("{k}={v}")).collect();
        return format!("{base_url}?{}", query.join("&"));
    };

    let mut merged: Vec<(String, String)> = Vec::new();
    for (key, value) in url.query_pairs() {
        let key = key.into_owned();
        if merged.iter().any(|(k, _)| *k == key) && overrides.iter().any(|(k, _)| *k == key) {
            continue;
        }
        let value = overrides
            .iter()
            .find(|(k, _)| *k == key)
            .map_or_else(|| value.into_owned(), |(_, v)| v.clone());
        merged.push((key, value));
    }
    for (key, value) in overrides {
        if !merged.iter().any(|(k, _)| k == *key) {
            merged.push((key.to_string(), value.clone()));
        }
    }

    url.query_pairs_mut().clear().extend_pairs(merged.iter());
    url.to_string()
}
