// file: src/models/entry.rs
// description: catalogue entries and the per-file sightings merged into them
// reference: persisted catalogue index layout

use crate::models::SourceReference;
use serde::{Deserialize, Serialize};

pub const DEFAULT_LICENCE: &str = "unknown";

/// One unique content hash and everything known about it.
///
/// `sources` only ever grows. `integrations`, `stored_at` and `licence`
/// are fixed by the first sighting of the hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogueEntry {
    #[serde(default)]
    pub sources: Vec<SourceReference>,
    #[serde(default)]
    pub integrations: Vec<String>,
    #[serde(default)]
    pub stored_at: Option<String>,
    #[serde(default = "default_licence")]
    pub licence: String,
}

fn default_licence() -> String {
    DEFAULT_LICENCE.to_string()
}

/// A single file observation, upserted into the index under `hash`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sighting {
    pub hash: String,
    pub source: SourceReference,
    pub integrations: Vec<String>,
    pub stored_at: Option<String>,
    pub licence: String,
}

impl Sighting {
    pub fn new(hash: String, source: SourceReference) -> Self {
        Self {
            hash,
            source,
            integrations: Vec::new(),
            stored_at: None,
            licence: default_licence(),
        }
    }

    pub fn into_entry(self) -> (String, CatalogueEntry) {
        (
            self.hash,
            CatalogueEntry {
                sources: vec![self.source],
                integrations: self.integrations,
                stored_at: self.stored_at,
                licence: self.licence,
            },
        )
    }
}
