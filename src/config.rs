//! Configuration file parser for ~/.config/feedpost/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are accepted (with `deny_unknown_fields` off) but logged as a
//! warning since they are usually typos. Environment variables are applied on
//! top of the file, then the result is validated.
use crate::feed::FetchPolicy;
use crate::util::validate_url;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base RSS/Atom feed URL the candidate ladder is derived from.
    pub feed_url: String,

    /// Number of posts requested through `posts_per_rss`.
    pub posts_per_page: u32,

    /// Maximum length of a formatted post, in characters.
    pub max_length: usize,

    /// Verbose diagnostics. Never changes fetched or formatted data.
    pub debug: bool,

    /// JSON file holding fetched posts.
    pub posts_file: PathBuf,

    /// Candidate ladder, highest priority first.
    pub ladder: FetchPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_url: "https://blog.mmlogistix.com/feed/".to_string(),
            posts_per_page: 50,
            max_length: 2500,
            debug: false,
            posts_file: PathBuf::from("data/posts.json"),
            ladder: FetchPolicy::default(),
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 6] = [
        "feed_url",
        "posts_per_page",
        "max_length",
        "debug",
        "posts_file",
        "ladder",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let mut config: Config = toml::from_str(&content)?;
        config.feed_url = config.feed_url.trim().to_string();
        tracing::info!(path = %path.display(), feed_url = %config.feed_url, "Loaded configuration");
        Ok(config)
    }

    /// Applies `RSS_FEED_URL`, `POSTS_PER_PAGE`, `MAX_LINKEDIN_LENGTH` and
    /// `FEEDPOST_DEBUG` from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`, keyed by environment variable name.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("RSS_FEED_URL").filter(|v| !v.trim().is_empty()) {
            self.feed_url = url.trim().to_string();
        }

        if let Some(raw) = lookup("POSTS_PER_PAGE") {
            self.posts_per_page = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "POSTS_PER_PAGE",
                reason: format!("'{raw}' is not a positive integer"),
            })?;
        }

        if let Some(raw) = lookup("MAX_LINKEDIN_LENGTH") {
            self.max_length = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "MAX_LINKEDIN_LENGTH",
                reason: format!("'{raw}' is not a positive integer"),
            })?;
        }

        if let Some(raw) = lookup("FEEDPOST_DEBUG") {
            self.debug = is_debug_flag(&raw);
        }

        Ok(())
    }

    /// Checks values the fetcher and formatter rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_url(&self.feed_url).map_err(|e| ConfigError::Invalid {
            key: "feed_url",
            reason: e.to_string(),
        })?;

        if self.posts_per_page == 0 {
            return Err(ConfigError::Invalid {
                key: "posts_per_page",
                reason: "must be at least 1".to_string(),
            });
        }

        if self.max_length == 0 {
            return Err(ConfigError::Invalid {
                key: "max_length",
                reason: "must be at least 1".to_string(),
            });
        }

        if self.ladder.ladder.is_empty() {
            return Err(ConfigError::Invalid {
                key: "ladder",
                reason: "needs at least one candidate strategy".to_string(),
            });
        }

        Ok(())
    }
}

/// `FEEDPOST_DEBUG` is on for `1` or `true` (any case).
pub fn is_debug_flag(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "1" | "true")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::CandidateStrategy;
    use std::collections::HashMap;

    fn write_config(name: &str, content: &str) -> (PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(format!("feedpost_config_test_{name}"));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.posts_per_page, 50);
        assert_eq!(config.max_length, 2500);
        assert!(!config.debug);
        assert_eq!(config.posts_file, PathBuf::from("data/posts.json"));
        assert_eq!(config.ladder, FetchPolicy::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/feedpost_test_nonexistent_config.toml");
        assert_eq!(Config::load(path).unwrap(), Config::default());
    }

    #[test]
    fn test_whitespace_only_file_returns_default() {
        let (dir, path) = write_config("whitespace", "   \n  \n  ");
        assert_eq!(Config::load(&path).unwrap(), Config::default());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let (dir, path) = write_config("partial", "max_length = 1300\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.max_length, 1300);
        assert_eq!(config.posts_per_page, 50);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_full_config_with_ladder() {
        let content = r#"
feed_url = "https://example.com/feed/"
posts_per_page = 20
max_length = 3000
debug = true
posts_file = "/var/lib/feedpost/posts.json"
ladder = ["per_page", { fixed_count = 300 }, "raw"]
"#;
        let (dir, path) = write_config("full", content);
        let config = Config::load(&path).unwrap();
        assert_eq!(config.feed_url, "https://example.com/feed/");
        assert_eq!(config.posts_per_page, 20);
        assert_eq!(config.max_length, 3000);
        assert!(config.debug);
        assert_eq!(config.posts_file, PathBuf::from("/var/lib/feedpost/posts.json"));
        assert_eq!(
            config.ladder.ladder,
            vec![
                CandidateStrategy::PerPage,
                CandidateStrategy::FixedCount(300),
                CandidateStrategy::Raw
            ]
        );
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let (dir, path) = write_config("invalid", "this is not [valid toml");
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let (dir, path) = write_config("bad_ladder", "ladder = [\"sideways\"]\n");
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let (dir, path) = write_config("unknown", "max_length = 100\nsecret_key = \"x\"\n");
        assert_eq!(Config::load(&path).unwrap().max_length, 100);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_too_large_file_rejected() {
        let (dir, path) = write_config("too_large", &"a".repeat(1_048_577));
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("RSS_FEED_URL", " https://other.example.com/feed/ "),
            ("MAX_LINKEDIN_LENGTH", "1200"),
            ("POSTS_PER_PAGE", "10"),
            ("FEEDPOST_DEBUG", "TRUE"),
        ]);
        let mut config = Config::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.feed_url, "https://other.example.com/feed/");
        assert_eq!(config.max_length, 1200);
        assert_eq!(config.posts_per_page, 10);
        assert!(config.debug);
    }

    #[test]
    fn test_feed_url_whitespace_trimmed_on_load() {
        let (dir, path) = write_config("padded_url", "feed_url = \"  https://example.com/feed/ \"\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.feed_url, "https://example.com/feed/");
        assert_eq!(
            config.ladder.candidate_urls(&config.feed_url, 50)[1],
            "https://example.com/feed/?posts_per_rss=50"
        );
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_debug_flag_values() {
        assert!(is_debug_flag("1"));
        assert!(is_debug_flag(" True "));
        assert!(!is_debug_flag("yes"));
        assert!(!is_debug_flag("0"));
        assert!(!is_debug_flag(""));

        let mut config = Config::default();
        config.debug = true;
        config
            .apply_overrides(|key| (key == "FEEDPOST_DEBUG").then(|| "yes".to_string()))
            .unwrap();
        assert!(!config.debug);
    }

    #[test]
    fn test_env_override_rejects_non_numeric_length() {
        let mut config = Config::default();
        let result = config.apply_overrides(|key| {
            (key == "MAX_LINKEDIN_LENGTH").then(|| "lots".to_string())
        });
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                key: "MAX_LINKEDIN_LENGTH",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.feed_url = "ftp://example.com/feed".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.posts_per_page = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.max_length = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.ladder = FetchPolicy::new(Vec::new());
        assert!(config.validate().is_err());
    }
}
