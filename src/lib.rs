// file: src/lib.rs
// description: library entry point and public api exports
// reference: rust library patterns
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/readme.md"))]

pub mod catalogue;
pub mod config;
pub mod content;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod remote;
pub mod utils;

pub use catalogue::{CatalogueIndex, ContentStore, StoredDocument, UpsertOutcome};
pub use config::{Config, GitHubConfig, IntegrationRule, StorageConfig, load_sources};
pub use content::{IntegrationClassifier, canonicalize, content_hash};
pub use error::{HarvestError, Result};
pub use models::{CatalogueEntry, Sighting, SourceDescriptor, SourceMode, SourceReference};
pub use pipeline::{HarvestOptions, Harvester, PipelineStats, ProgressTracker, run_from_config};
pub use remote::{FileDiscoverer, GitHubClient, RemoteRepository, ResilientFetcher, TreeEntry};
pub use utils::{OperationTimer, Validator};
