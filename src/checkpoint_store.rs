use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CrawlError;
use crate::text_manipulators::sanitize_file_stem;

/// One discovered tournament link and whether it has been fully processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontierEntry {
    #[serde(rename = "Link")]
    pub link: String,
    #[serde(rename = "Checked", deserialize_with = "lenient_bool")]
    pub checked: bool,
}

impl FrontierEntry {
    pub fn unchecked(link: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            checked: false,
        }
    }
}

// Accepts `true`/`True`/`TRUE`, and the same for false.
fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" | "" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "expected a boolean, found '{other}'"
        ))),
    }
}

/// Builds a fresh frontier, one unchecked entry per distinct link.
pub fn frontier_from_links<I, S>(links: I) -> Vec<FrontierEntry>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    links
        .into_iter()
        .map(Into::into)
        .filter(|link: &String| seen.insert(link.clone()))
        .map(FrontierEntry::unchecked)
        .collect()
}

/// Persists each query's frontier as `<dir>/<query>.csv` with columns
/// `Link,Checked`.
///
/// Every save is a full rewrite through a temp file and a rename, so the file
/// on disk is always either the old or the new frontier.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, query_key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.csv", sanitize_file_stem(query_key)))
    }

    pub fn exists(&self, query_key: &str) -> bool {
        self.path_for(query_key).is_file()
    }

    /// The stored frontier, or an empty one if nothing was saved yet.
    pub fn load(&self, query_key: &str) -> Result<Vec<FrontierEntry>, CrawlError> {
        let path = self.path_for(query_key);
        if !path.is_file() {
            return Ok(Vec::new());
        }
        let checkpoint_err = |source: io::Error| CrawlError::Checkpoint {
            path: path.clone(),
            source,
        };

        let mut reader = csv::Reader::from_path(&path).map_err(|e| checkpoint_err(e.into()))?;
        let mut entries = Vec::new();
        for record in reader.deserialize::<FrontierEntry>() {
            entries.push(record.map_err(|e| checkpoint_err(e.into()))?);
        }
        debug!("Loaded {} frontier entries from {}", entries.len(), path.display());
        Ok(entries)
    }

    pub fn save(&self, query_key: &str, entries: &[FrontierEntry]) -> Result<(), CrawlError> {
        let path = self.path_for(query_key);
        write_atomically(&path, entries).map_err(|source| CrawlError::Checkpoint {
            path: path.clone(),
            source,
        })
    }

    /// Flags `link` as done and rewrites the whole checkpoint.
    ///
    /// Returns false if the link is not in the stored frontier.
    pub fn mark_checked(&self, query_key: &str, link: &str) -> Result<bool, CrawlError> {
        let mut entries = self.load(query_key)?;
        let mut found = false;
        for entry in entries.iter_mut().filter(|entry| entry.link == link) {
            entry.checked = true;
            found = true;
        }
        if found {
            self.save(query_key, &entries)?;
        }
        Ok(found)
    }
}

fn write_atomically(path: &Path, entries: &[FrontierEntry]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp = path.with_extension("csv.tmp");
    {
        let mut writer = csv::Writer::from_path(&tmp)?;
        if entries.is_empty() {
            writer.write_record(["Link", "Checked"])?;
        }
        for entry in entries {
            writer.serialize(entry)?;
        }
        writer.flush()?;
        writer
            .into_inner()
            .map_err(|e| io::Error::other(e.to_string()))?
            .sync_all()?;
    }
    fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_checkpoint_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        assert!(!store.exists("World Youth"));
        assert!(store.load("World Youth").unwrap().is_empty());
    }

    #[test]
    fn save_then_load_keeps_order_and_flags() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("nested"));
        let mut entries = frontier_from_links(["https://a", "https://b"]);
        entries[1].checked = true;

        store.save("European Youth", &entries).unwrap();

        assert!(store.exists("European Youth"));
        assert_eq!(store.load("European Youth").unwrap(), entries);
        let text = fs::read_to_string(store.path_for("European Youth")).unwrap();
        assert!(text.starts_with("Link,Checked\n"));
    }

    #[test]
    fn empty_frontier_still_counts_as_a_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        store.save("q", &[]).unwrap();
        assert!(store.exists("q"));
        assert!(store.load("q").unwrap().is_empty());
    }

    #[test]
    fn mark_checked_rewrites_only_that_link() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        store
            .save("q", &frontier_from_links(["https://a", "https://b", "https://c"]))
            .unwrap();

        assert!(store.mark_checked("q", "https://b").unwrap());
        assert!(!store.mark_checked("q", "https://zzz").unwrap());

        let flags: Vec<bool> = store.load("q").unwrap().iter().map(|e| e.checked).collect();
        assert_eq!(flags, vec![false, true, false]);
    }

    #[test]
    fn discovered_duplicates_collapse() {
        let entries = frontier_from_links(vec!["https://a", "https://b", "https://a"]);
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| !e.checked));
    }

    #[test]
    fn capitalized_booleans_from_other_tools_are_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        fs::write(
            store.path_for("q"),
            "Link,Checked\nhttps://a,True\nhttps://b,False\n",
        )
        .unwrap();
        let entries = store.load("q").unwrap();
        assert!(entries[0].checked);
        assert!(!entries[1].checked);
    }

    #[test]
    fn garbage_checkpoint_is_a_checkpoint_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        fs::write(store.path_for("q"), "Link,Checked\nhttps://a,maybe\n").unwrap();
        assert!(matches!(store.load("q"), Err(CrawlError::Checkpoint { .. })));
    }
}
