// file: src/remote/mod.rs
// description: remote repository access module exports
// reference: internal module structure

pub mod discovery;
pub mod fetcher;
pub mod github;

pub use discovery::{CandidateFiles, FileDiscoverer, IncludeFilter};
pub use fetcher::{
    Clock, HttpResponse, RateLimit, ResilientFetcher, SystemClock, Transport, backoff_delay,
    rate_limit_wait,
};
pub use github::{GitHubClient, RemoteRepository, ReqwestTransport, TreeEntry};
