//! Term → entries cache that lets a rerun skip names already scraped.
//!
//! Loaded once at start, mutated in memory during the run, saved once at the
//! end. The process assumes it is the only writer of the file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use imenik_common::{Entry, Result};

use crate::store::{to_json, write_atomic};

#[derive(Debug, Clone)]
pub struct ResultCache {
    path: PathBuf,
    entries: BTreeMap<String, Vec<Entry>>,
}

impl ResultCache {
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Load the cache file. A missing file is a cold start; an unreadable or
    /// malformed one is logged and treated the same way.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No cache file, starting cold");
                return Self::empty(path);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read cache, starting cold");
                return Self::empty(path);
            }
        };

        match serde_json::from_str::<BTreeMap<String, Vec<Entry>>>(&raw) {
            Ok(entries) => {
                info!(path = %path.display(), terms = entries.len(), "Cache loaded");
                Self { path, entries }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to parse cache, starting cold");
                Self::empty(path)
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keys match exactly and case-sensitively.
    pub fn get(&self, term: &str) -> Option<&[Entry]> {
        self.entries.get(term).map(Vec::as_slice)
    }

    pub fn contains(&self, term: &str) -> bool {
        self.entries.contains_key(term)
    }

    pub fn insert(&mut self, term: impl Into<String>, entries: Vec<Entry>) {
        self.entries.insert(term.into(), entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub async fn save(&self) -> Result<()> {
        let json = to_json(&self.entries, false)?;
        write_atomic(&self.path, &json).await?;
        info!(path = %self.path.display(), terms = self.entries.len(), "Cache saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> Entry {
        Entry {
            telephone_number: "091 234 5678".into(),
            street: String::new(),
            city: "Zagreb".into(),
            full_name: name.into(),
        }
    }

    #[tokio::test]
    async fn missing_file_is_empty_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResultCache::load(dir.path().join("cache.json")).await;
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn malformed_file_is_empty_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let cache = ResultCache::load(&path).await;

        assert!(cache.is_empty());
        assert_eq!(cache.path(), path.as_path());
    }

    #[tokio::test]
    async fn save_then_load_restores_terms() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let mut cache = ResultCache::empty(&path);
        cache.insert("Ivan", vec![entry("Ivan Horvat"), entry("Ivan Kovač")]);
        cache.save().await.unwrap();

        let reloaded = ResultCache::load(&path).await;
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get("Ivan").unwrap().len(), 2);
        assert_eq!(reloaded.get("Ivan").unwrap()[1].full_name, "Ivan Kovač");
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let mut cache = ResultCache::empty("cache.json");
        cache.insert("Ivan", vec![entry("Ivan Horvat")]);
        assert!(cache.contains("Ivan"));
        assert!(!cache.contains("ivan"));
        assert!(cache.get("IVAN").is_none());
    }
}
