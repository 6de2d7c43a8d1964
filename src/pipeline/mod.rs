// file: src/pipeline/mod.rs
// description: pipeline module exports and public api
// reference: pipeline orchestration

mod orchestrator;
mod progress;

pub use orchestrator::{HarvestOptions, Harvester, run_from_config};
pub use progress::{PipelineStats, ProgressTracker};
