// file: src/catalogue/index.rs
// description: hash-keyed, append-only catalogue of harvested documents
// reference: json metadata store persisted once per run

use crate::error::{HarvestError, Result};
use crate::models::{CatalogueEntry, Sighting};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// First sighting of the hash; the entry was stored as given.
    Inserted,
    /// Known hash; only the source reference was appended.
    Appended,
}

/// Mapping from content hash to catalogue entry.
///
/// Keys are kept sorted so the persisted document diffs cleanly between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogueIndex {
    entries: BTreeMap<String, CatalogueEntry>,
}

impl CatalogueIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a persisted index. An absent or unreadable file yields an empty index.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            debug!("No catalogue index at {}, starting empty", path.display());
            return Self::new();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(
                    "Failed to read catalogue index {}, starting empty: {}",
                    path.display(),
                    e
                );
                return Self::new();
            }
        };

        match serde_json::from_str::<BTreeMap<String, CatalogueEntry>>(&contents) {
            Ok(entries) => {
                info!(
                    "Loaded {} catalogue entries from {}",
                    entries.len(),
                    path.display()
                );
                Self { entries }
            }
            Err(e) => {
                warn!(
                    "Failed to parse catalogue index {}, starting empty: {}",
                    path.display(),
                    e
                );
                Self::new()
            }
        }
    }

    /// Inserts a new hash, or appends the sighting's source to the existing entry.
    ///
    /// `integrations`, `stored_at` and `licence` of an existing entry are never touched.
    pub fn upsert(&mut self, sighting: Sighting) -> UpsertOutcome {
        if let Some(existing) = self.entries.get_mut(&sighting.hash) {
            existing.sources.push(sighting.source);
            return UpsertOutcome::Appended;
        }

        let (hash, entry) = sighting.into_entry();
        self.entries.insert(hash, entry);
        UpsertOutcome::Inserted
    }

    /// Writes the whole index to `path` via a sibling temp file and rename.
    pub fn persist(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| HarvestError::file_operation(parent, e))?;
        }

        let mut contents = serde_json::to_string_pretty(&self.entries)?;
        contents.push('\n');

        let tmp = temp_path(path);
        fs::write(&tmp, contents).map_err(|e| HarvestError::file_operation(&tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| HarvestError::file_operation(path, e))?;

        info!(
            "Persisted {} catalogue entries to {}",
            self.entries.len(),
            path.display()
        );
        Ok(())
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.entries.contains_key(hash)
    }

    pub fn get(&self, hash: &str) -> Option<&CatalogueEntry> {
        self.entries.get(hash)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &CatalogueEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of source references across all entries.
    pub fn sighting_count(&self) -> usize {
        self.entries.values().map(|e| e.sources.len()).sum()
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "index.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}
