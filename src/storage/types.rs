use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised by the JSON post store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access posts file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in posts file: {0}")]
    Parse(#[from] serde_json::Error),

    /// LinkedIn dates must be empty or `YYYY-MM-DD`.
    #[error("Invalid date '{0}': use YYYY-MM-DD format")]
    InvalidDate(String),

    #[error("Post not found: {0}")]
    PostNotFound(String),

    #[error("Post index {index} out of range ({len} posts stored)")]
    IndexOutOfRange { index: usize, len: usize },
}

// ============================================================================
// Data Structures
// ============================================================================

/// Title used when a feed entry has no usable title.
pub const UNTITLED: &str = "Untitled";

/// One blog post as fetched from the feed and stored on disk.
///
/// `url` is the identity key. `linkedin_date` starts empty and is the only
/// field changed after the record is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub published: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub linkedin_date: String,
}

impl PostRecord {
    /// Builds a freshly fetched record. Blank titles fall back to [`UNTITLED`].
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        published: impl Into<String>,
        content: impl Into<String>,
        images: Vec<String>,
    ) -> Self {
        let title = title.into();
        let title = if title.trim().is_empty() {
            UNTITLED.to_string()
        } else {
            title.trim().to_string()
        };

        Self {
            title,
            url: url.into(),
            published: published.into(),
            content: content.into(),
            images,
            linkedin_date: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_title_defaults_to_untitled() {
        let record = PostRecord::new("  ", "https://example.com/a", "", "", Vec::new());
        assert_eq!(record.title, UNTITLED);
        assert!(record.linkedin_date.is_empty());
    }

    #[test]
    fn test_json_shape() {
        let record = PostRecord::new(
            "Hello",
            "https://example.com/a",
            "Mon, 01 Jan 2024 10:00:00 +0000",
            "Body",
            vec!["https://example.com/a.png".to_string()],
        );
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["title"], "Hello");
        assert_eq!(value["url"], "https://example.com/a");
        assert_eq!(value["images"][0], "https://example.com/a.png");
        assert_eq!(value["linkedin_date"], "");
    }

    #[test]
    fn test_missing_optional_fields_deserialize() {
        let json = r#"{"title": "Old", "url": "https://example.com/old"}"#;
        let record: PostRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.title, "Old");
        assert!(record.images.is_empty());
        assert!(record.linkedin_date.is_empty());
    }
}
