// file: src/remote/discovery.rs
// description: candidate file discovery over a repository tree with include filtering
// reference: https://docs.rs/globset

use crate::error::{HarvestError, Result};
use crate::models::{CandidateFile, SourceDescriptor};
use crate::remote::github::{RemoteRepository, TreeEntry};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::debug;

pub const TARGET_EXTENSION: &str = ".json";

/// Include patterns for one source. An empty pattern list admits every path.
///
/// Patterns are matched against the whole path and against every trailing
/// run of its components, so `*.json` matches `a/b/flow.json` while
/// `workflows/*.json` only matches files directly inside a `workflows` directory.
#[derive(Debug, Clone)]
pub struct IncludeFilter {
    set: Option<GlobSet>,
}

impl IncludeFilter {
    pub fn new(patterns: &[String]) -> Result<Self> {
        if patterns.is_empty() {
            return Ok(Self { set: None });
        }

        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map_err(|e| HarvestError::Pattern(format!("{}: {}", pattern, e)))?;
            builder.add(glob);
        }

        let set = builder
            .build()
            .map_err(|e| HarvestError::Pattern(e.to_string()))?;
        Ok(Self { set: Some(set) })
    }

    pub fn matches(&self, path: &str) -> bool {
        let Some(set) = &self.set else {
            return true;
        };

        let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        (0..components.len()).any(|start| set.is_match(components[start..].join("/")))
    }
}

pub struct FileDiscoverer<'a, R: ?Sized> {
    remote: &'a R,
}

impl<'a, R: RemoteRepository + ?Sized> FileDiscoverer<'a, R> {
    pub fn new(remote: &'a R) -> Self {
        Self { remote }
    }

    /// Lists the source's tree once and yields matching files in listing order.
    pub fn discover(&self, source: &SourceDescriptor) -> Result<CandidateFiles> {
        let filter = IncludeFilter::new(&source.include)?;
        let entries = self
            .remote
            .list_tree(&source.owner, &source.repo, &source.branch)?;

        debug!(
            "Discovering {} files in {} ({} tree entries)",
            TARGET_EXTENSION,
            source.slug(),
            entries.len()
        );

        Ok(CandidateFiles {
            entries: entries.into_iter(),
            filter,
        })
    }
}

/// Lazy, single-pass sequence of candidate files for one source.
pub struct CandidateFiles {
    entries: std::vec::IntoIter<TreeEntry>,
    filter: IncludeFilter,
}

impl Iterator for CandidateFiles {
    type Item = CandidateFile;

    fn next(&mut self) -> Option<Self::Item> {
        for entry in self.entries.by_ref() {
            if !entry.is_blob() || !entry.path.ends_with(TARGET_EXTENSION) {
                continue;
            }
            if !self.filter.matches(&entry.path) {
                debug!("Skipping {} (no include pattern matched)", entry.path);
                continue;
            }
            return Some(CandidateFile {
                path: entry.path,
                blob_sha: entry.sha,
            });
        }
        None
    }
}
