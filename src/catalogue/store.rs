// file: src/catalogue/store.rs
// description: deduplicated canonical documents in by-source and by-integration views
// reference: ingested/ directory layout

use crate::content::hash_prefix;
use crate::error::{HarvestError, Result};
use crate::utils::Validator;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const BY_SOURCE_DIR: &str = "by-source";
pub const BY_INTEGRATION_DIR: &str = "by-integration";

/// Writes canonical bytes under `<root>/<ingested>/`.
///
/// Stored paths are reported relative to `root` with `/` separators so the
/// catalogue stays portable.
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
    ingested: PathBuf,
}

/// What a single `store` call wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub stored_at: String,
    pub files_written: usize,
    pub bytes_written: u64,
}

impl ContentStore {
    pub fn new(root: impl Into<PathBuf>, ingested: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ingested: ingested.into(),
        }
    }

    /// Writes one copy into the by-source view and one per tag into the
    /// by-integration view. Callers invoke this only for hashes new to the index.
    pub fn store(
        &self,
        hash: &str,
        canonical: &[u8],
        group_key: &str,
        remote_path: &str,
        integrations: &[String],
    ) -> Result<StoredDocument> {
        let file_name = format!(
            "{}.{}.json",
            Validator::document_stem(remote_path),
            hash_prefix(hash)
        );

        let relative = self
            .ingested
            .join(BY_SOURCE_DIR)
            .join(Validator::sanitize_component(group_key))
            .join(&file_name);
        self.write(&relative, canonical)?;

        for tag in integrations {
            let copy = self
                .ingested
                .join(BY_INTEGRATION_DIR)
                .join(Validator::sanitize_component(tag))
                .join(&file_name);
            self.write(&copy, canonical)?;
        }

        let files_written = 1 + integrations.len();
        Ok(StoredDocument {
            stored_at: display_relative(&relative),
            files_written,
            bytes_written: (canonical.len() * files_written) as u64,
        })
    }

    pub fn ingested_dir(&self) -> PathBuf {
        self.root.join(&self.ingested)
    }

    fn write(&self, relative: &Path, bytes: &[u8]) -> Result<()> {
        let target = self.root.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| HarvestError::file_operation(parent, e))?;
        }
        fs::write(&target, bytes).map_err(|e| HarvestError::file_operation(&target, e))?;
        debug!("Wrote {} ({} bytes)", target.display(), bytes.len());
        Ok(())
    }
}

fn display_relative(path: &Path) -> String {
    Validator::sanitize_file_path(&path.to_string_lossy())
}
