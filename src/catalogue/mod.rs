// file: src/catalogue/mod.rs
// description: catalogue index and content store module exports
// reference: internal module structure

pub mod index;
pub mod store;

pub use index::{CatalogueIndex, UpsertOutcome};
pub use store::{BY_INTEGRATION_DIR, BY_SOURCE_DIR, ContentStore, StoredDocument};
