// file: src/models/mod.rs
// description: data models module exports
// reference: internal module structure

pub mod entry;
pub mod source;

pub use entry::{CatalogueEntry, Sighting, DEFAULT_LICENCE};
pub use source::{CandidateFile, SourceDescriptor, SourceMode, SourceReference};
