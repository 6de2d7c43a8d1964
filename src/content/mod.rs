// file: src/content/mod.rs
// description: document canonicalization and classification module exports
// reference: internal module structure

pub mod canonical;
pub mod classifier;

pub use canonical::{HASH_PREFIX_LEN, canonicalize, content_hash, hash_prefix};
pub use classifier::{IntegrationClassifier, UNCATEGORISED};
