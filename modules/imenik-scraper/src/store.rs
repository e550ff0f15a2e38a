//! JSON files on disk: the input name list and the output entry list.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use imenik_common::{Entry, Result};

/// Read the search terms from a JSON array of strings.
pub async fn load_names(path: &Path) -> Result<Vec<String>> {
    let raw = tokio::fs::read_to_string(path).await?;
    let names: Vec<String> = serde_json::from_str(&raw)?;
    info!(path = %path.display(), count = names.len(), "Loaded names");
    Ok(names)
}

/// Trim terms, drop blank ones and exact duplicates. First occurrence wins.
pub fn dedupe_terms(names: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

pub async fn read_entries(path: &Path) -> Result<Vec<Entry>> {
    let raw = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&raw)?)
}

/// Serialize to JSON, two-space indented unless `minify`.
pub fn to_json<T: Serialize + ?Sized>(value: &T, minify: bool) -> Result<String> {
    if minify {
        Ok(serde_json::to_string(value)?)
    } else {
        Ok(serde_json::to_string_pretty(value)?)
    }
}

/// Replace `path` with `contents` via a sibling temp file, so a crash mid-write
/// leaves the previous version intact.
pub async fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, contents).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Writes the running entry list, replacing the whole file each time.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    path: PathBuf,
    minify: bool,
}

impl OutputWriter {
    pub fn new(path: impl Into<PathBuf>, minify: bool) -> Self {
        Self {
            path: path.into(),
            minify,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn write(&self, entries: &[Entry]) -> Result<()> {
        let json = to_json(entries, self.minify)?;
        write_atomic(&self.path, &json).await?;
        debug!(path = %self.path.display(), entries = entries.len(), "Output written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, phone: &str) -> Entry {
        Entry {
            telephone_number: phone.into(),
            street: "Ilica 1".into(),
            city: "Zagreb".into(),
            full_name: name.into(),
        }
    }

    #[test]
    fn dedupe_keeps_first_occurrence_and_drops_blanks() {
        let names = vec![
            "Ivan".to_string(),
            " Ana ".to_string(),
            "".to_string(),
            "Ivan".to_string(),
            "ivan".to_string(),
            "   ".to_string(),
            "Ana".to_string(),
        ];
        assert_eq!(dedupe_terms(names), vec!["Ivan", "Ana", "ivan"]);
    }

    #[test]
    fn pretty_output_uses_two_space_indent() {
        let json = to_json(&[entry("Ivan", "091")], false).unwrap();
        assert!(json.contains("\n  {\n    \"telephoneNumber\": \"091\""));
    }

    #[test]
    fn minified_output_has_no_whitespace() {
        let json = to_json(&[entry("Ivan", "091")], true).unwrap();
        assert!(!json.contains('\n'));
        assert!(!json.contains(": "));
    }

    #[tokio::test]
    async fn output_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(dir.path().join("out").join("imenik-results.json"), false);
        let entries = vec![entry("Ivan Horvat", "091 234 5678"), entry("Ana Kovač", "098 1")];

        writer.write(&entries).await.unwrap();

        assert_eq!(read_entries(writer.path()).await.unwrap(), entries);
    }

    #[tokio::test]
    async fn load_names_rejects_non_string_arrays() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("names.json");
        tokio::fs::write(&path, r#"[1, 2]"#).await.unwrap();

        assert!(load_names(&path).await.is_err());
    }

    #[tokio::test]
    async fn load_names_reads_string_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("names.json");
        tokio::fs::write(&path, r#"["Ivan", "Ana"]"#).await.unwrap();

        assert_eq!(load_names(&path).await.unwrap(), vec!["Ivan", "Ana"]);
    }
}
