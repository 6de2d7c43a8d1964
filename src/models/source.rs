// file: src/models/source.rs
// description: source descriptors and the references they produce
// reference: sources.yaml records and GitHub tree items

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceMode {
    /// Fetch, canonicalize, classify and store every matching file.
    Full,
    /// Catalogue the file URL only; nothing is fetched or stored.
    LinkOnly,
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceMode::Full => write!(f, "full"),
            SourceMode::LinkOnly => write!(f, "link-only"),
        }
    }
}

/// One upstream repository to harvest, as configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub owner: String,
    pub repo: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    pub mode: SourceMode,
    #[serde(default)]
    pub include: Vec<String>,
}

fn default_branch() -> String {
    "main".to_string()
}

impl SourceDescriptor {
    pub fn new(owner: &str, repo: &str, mode: SourceMode) -> Self {
        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            branch: default_branch(),
            mode,
            include: Vec::new(),
        }
    }

    pub fn with_branch(mut self, branch: &str) -> Self {
        self.branch = branch.to_string();
        self
    }

    pub fn with_include(mut self, patterns: &[&str]) -> Self {
        self.include = patterns.iter().map(|p| p.to_string()).collect();
        self
    }

    /// `owner/repo`, used in log lines.
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// Directory name of this source in the by-source view.
    pub fn group_key(&self) -> String {
        format!("{}-{}", self.owner, self.repo)
    }

    pub fn file_url(&self, web_base: &str, path: &str) -> String {
        format!(
            "{}/{}/{}/blob/{}/{}",
            web_base.trim_end_matches('/'),
            self.owner,
            self.repo,
            self.branch,
            path
        )
    }
}

/// A file found under a source's ref during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub path: String,
    pub blob_sha: String,
}

/// The remote location that produced a catalogued hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReference {
    pub owner: String,
    pub repo: String,
    pub path: String,
    pub url: String,
    pub blob_sha: String,
}

impl SourceReference {
    pub fn new(source: &SourceDescriptor, file: &CandidateFile, url: String) -> Self {
        Self {
            owner: source.owner.clone(),
            repo: source.repo.clone(),
            path: file.path.clone(),
            url,
            blob_sha: file.blob_sha.clone(),
        }
    }
}
