use super::types::{PostRecord, StoreError};
use chrono::NaiveDate;
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

/// JSON-file backed list of [`PostRecord`]s.
///
/// The whole document is read and rewritten on every operation. Writes go to a
/// temporary sibling file that is renamed over the target, so a crash never
/// leaves a half-written posts file behind.
#[derive(Debug, Clone)]
pub struct PostStore {
    path: PathBuf,
}

impl PostStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads all stored posts. A missing file is an empty store.
    pub fn load(&self) -> Result<Vec<PostRecord>, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No posts file yet, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let posts: Vec<PostRecord> = serde_json::from_str(&content)?;
        tracing::debug!(path = %self.path.display(), posts = posts.len(), "Loaded posts");
        Ok(posts)
    }

    /// Replaces the stored document with `posts`.
    pub fn save(&self, posts: &[PostRecord]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let json = serde_json::to_string_pretty(posts)?;

        // Randomized suffix so a stale temp file from an earlier crash never collides
        use std::time::{SystemTime, UNIX_EPOCH};
        let random_suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let temp_path = self.path.with_extension(format!("tmp.{:016x}", random_suffix));

        let write_temp = || -> std::io::Result<()> {
            let mut file = std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&temp_path)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()
        };

        if let Err(e) = write_temp() {
            let _ = std::fs::remove_file(&temp_path);
            return Err(self.io_error(e));
        }

        #[cfg(windows)]
        if self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                let _ = std::fs::remove_file(&temp_path);
                return Err(self.io_error(e));
            }
        }

        if let Err(e) = std::fs::rename(&temp_path, &self.path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(self.io_error(e));
        }

        tracing::debug!(path = %self.path.display(), posts = posts.len(), "Saved posts");
        Ok(())
    }

    /// Returns the post at `index` in stored order.
    pub fn get(&self, index: usize) -> Result<PostRecord, StoreError> {
        let mut posts = self.load()?;
        let len = posts.len();
        if index >= len {
            return Err(StoreError::IndexOutOfRange { index, len });
        }
        Ok(posts.swap_remove(index))
    }

    /// Sets (or clears, with an empty string) the LinkedIn date of the post
    /// identified by `url`, then persists the store.
    pub fn set_linkedin_date(&self, url: &str, date: &str) -> Result<(), StoreError> {
        let date = date.trim();
        validate_date(date)?;

        let mut posts = self.load()?;
        let post = posts
            .iter_mut()
            .find(|p| p.url == url)
            .ok_or_else(|| StoreError::PostNotFound(url.to_string()))?;
        post.linkedin_date = date.to_string();

        self.save(&posts)?;
        tracing::info!(url = %url, date = %date, "Updated LinkedIn date");
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Appends every fetched post whose url is not already stored.
///
/// Returns the number of posts added. Order of both lists is preserved.
pub fn merge_new_posts(existing: &mut Vec<PostRecord>, fetched: Vec<PostRecord>) -> usize {
    let mut known: HashSet<String> = existing.iter().map(|p| p.url.clone()).collect();
    let before = existing.len();

    for post in fetched {
        if known.insert(post.url.clone()) {
            existing.push(post);
        }
    }

    existing.len() - before
}

/// Accepts an empty string or a calendar date in `YYYY-MM-DD` form.
pub fn validate_date(date: &str) -> Result<(), StoreError> {
    if date.is_empty() {
        return Ok(());
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| StoreError::InvalidDate(date.to_string()))
}
