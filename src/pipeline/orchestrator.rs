// file: src/pipeline/orchestrator.rs
// description: coordinates discovery, fetching, classification, storage and cataloguing
// reference: sequential per-source, per-file harvest loop

use crate::catalogue::{CatalogueIndex, ContentStore, UpsertOutcome};
use crate::config::Config;
use crate::content::{IntegrationClassifier, canonicalize, content_hash};
use crate::error::Result;
use crate::models::{CandidateFile, Sighting, SourceDescriptor, SourceMode, SourceReference};
use crate::pipeline::progress::{PipelineStats, ProgressTracker};
use crate::remote::{FileDiscoverer, GitHubClient, RemoteRepository};
use serde_json::Value;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct HarvestOptions {
    /// Base of the canonical file URLs recorded in the catalogue.
    pub web_base: String,
    /// Cap on candidate files processed per source.
    pub limit: Option<usize>,
    pub show_progress: bool,
}

impl HarvestOptions {
    pub fn new(web_base: &str) -> Self {
        Self {
            web_base: web_base.to_string(),
            limit: None,
            show_progress: false,
        }
    }
}

pub struct Harvester<'a, R: ?Sized> {
    remote: &'a R,
    classifier: IntegrationClassifier,
    store: ContentStore,
    options: HarvestOptions,
}

impl<'a, R: RemoteRepository + ?Sized> Harvester<'a, R> {
    pub fn new(
        remote: &'a R,
        classifier: IntegrationClassifier,
        store: ContentStore,
        options: HarvestOptions,
    ) -> Self {
        Self {
            remote,
            classifier,
            store,
            options,
        }
    }

    /// Harvests every source in order, upserting one sighting per file.
    ///
    /// Per-file failures are logged and skipped; a source whose tree cannot
    /// be listed is abandoned and the run moves on to the next source.
    pub fn run(&self, sources: &[SourceDescriptor], index: &mut CatalogueIndex) -> PipelineStats {
        let progress = ProgressTracker::new(self.options.show_progress);
        let mut stats = PipelineStats::new();

        for (i, source) in sources.iter().enumerate() {
            progress.start_source(&source.slug(), i + 1, sources.len());
            info!(
                "Harvesting {} (branch {}, mode {})",
                source.slug(),
                source.branch,
                source.mode
            );

            match self.harvest_source(source, index, &mut stats, &progress) {
                Ok(()) => stats.sources_processed += 1,
                Err(e) => {
                    stats.sources_failed += 1;
                    error!("Failed to list files for {}: {}", source.slug(), e);
                }
            }
        }

        stats.duration_secs = progress.elapsed().as_secs_f64();
        info!(
            "Processed {} files across {} sources",
            progress.files_done(),
            sources.len()
        );
        progress.finish();
        stats
    }

    fn harvest_source(
        &self,
        source: &SourceDescriptor,
        index: &mut CatalogueIndex,
        stats: &mut PipelineStats,
        progress: &ProgressTracker,
    ) -> Result<()> {
        let files = FileDiscoverer::new(self.remote).discover(source)?;

        for file in files.take(self.options.limit.unwrap_or(usize::MAX)) {
            stats.files_seen += 1;
            let url = source.file_url(&self.options.web_base, &file.path);
            let reference = SourceReference::new(source, &file, url);

            let outcome = match source.mode {
                SourceMode::LinkOnly => {
                    stats.link_only += 1;
                    let hash = content_hash(reference.url.as_bytes());
                    Ok(index.upsert(Sighting::new(hash, reference)))
                }
                SourceMode::Full => self.ingest_file(source, &file, reference, index, stats),
            };

            match outcome {
                Ok(UpsertOutcome::Inserted) => {
                    stats.files_catalogued += 1;
                    stats.new_entries += 1;
                }
                Ok(UpsertOutcome::Appended) => {
                    stats.files_catalogued += 1;
                    stats.duplicate_sightings += 1;
                }
                Err(e) => {
                    stats.files_failed += 1;
                    warn!("Skipping {}:{}: {}", source.slug(), file.path, e);
                }
            }
            progress.file_done(&file.path);
        }

        Ok(())
    }

    fn ingest_file(
        &self,
        source: &SourceDescriptor,
        file: &CandidateFile,
        reference: SourceReference,
        index: &mut CatalogueIndex,
        stats: &mut PipelineStats,
    ) -> Result<UpsertOutcome> {
        let raw = self
            .remote
            .get_content(&source.owner, &source.repo, &file.path, &source.branch)?;
        let document: Value = serde_json::from_slice(&raw)?;

        let canonical = canonicalize(&document);
        let mut sighting = Sighting::new(content_hash(&canonical), reference);
        sighting.integrations = self.classifier.classify_sorted(&document);

        if !index.contains(&sighting.hash) {
            let stored = self.store.store(
                &sighting.hash,
                &canonical,
                &source.group_key(),
                &file.path,
                &sighting.integrations,
            )?;
            stats.bytes_stored += stored.bytes_written;
            sighting.stored_at = Some(stored.stored_at);
        }

        Ok(index.upsert(sighting))
    }
}

/// Loads the index, harvests `sources` from GitHub and persists the index.
pub fn run_from_config(
    config: &Config,
    sources: &[SourceDescriptor],
    limit: Option<usize>,
    show_progress: bool,
) -> Result<PipelineStats> {
    let index_path = config.storage.catalogue_file();
    let mut index = CatalogueIndex::load(&index_path);

    let client = GitHubClient::from_config(&config.github)?;
    let classifier = IntegrationClassifier::with_extra(&config.classification.extra_integrations)?;
    let store = ContentStore::new(&config.storage.root, &config.storage.ingested_dir);
    let options = HarvestOptions {
        web_base: config.github.web_base.clone(),
        limit,
        show_progress,
    };

    let harvester = Harvester::new(&client, classifier, store, options);
    let stats = harvester.run(sources, &mut index);

    index.persist(&index_path)?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HarvestError;
    use crate::remote::TreeEntry;
    use std::cell::Cell;
    use tempfile::TempDir;

    struct OneFile {
        body: &'static [u8],
        fetches: Cell<usize>,
    }

    impl RemoteRepository for OneFile {
        fn list_tree(&self, _owner: &str, _repo: &str, _reference: &str) -> Result<Vec<TreeEntry>> {
            Ok(vec![TreeEntry::blob("flows/one.json", "sha1")])
        }

        fn get_content(&self, _: &str, _: &str, _: &str, _: &str) -> Result<Vec<u8>> {
            self.fetches.set(self.fetches.get() + 1);
            Ok(self.body.to_vec())
        }
    }

    struct NoTree;

    impl RemoteRepository for NoTree {
        fn list_tree(&self, _owner: &str, _repo: &str, _reference: &str) -> Result<Vec<TreeEntry>> {
            Err(HarvestError::Http {
                status: 404,
                url: "tree".to_string(),
            })
        }

        fn get_content(&self, _: &str, _: &str, _: &str, _: &str) -> Result<Vec<u8>> {
            unreachable!()
        }
    }

    fn harvester<'a, R: RemoteRepository + ?Sized>(remote: &'a R, root: &TempDir) -> Harvester<'a, R> {
        Harvester::new(
            remote,
            IntegrationClassifier::new(),
            ContentStore::new(root.path(), "ingested"),
            HarvestOptions::new("https://github.com"),
        )
    }

    #[test]
    fn test_full_mode_stores_and_catalogues() {
        let temp = TempDir::new().unwrap();
        let remote = OneFile {
            body: br#"{"nodes":[{"type":"n8n-nodes-base.telegram"}]}"#,
            fetches: Cell::new(0),
        };
        let mut index = CatalogueIndex::new();
        let sources = vec![SourceDescriptor::new("acme", "flows", SourceMode::Full)];

        let stats = harvester(&remote, &temp).run(&sources, &mut index);

        assert_eq!(stats.files_catalogued, 1);
        assert_eq!(stats.new_entries, 1);
        assert_eq!(index.len(), 1);
        let (_, entry) = index.entries().next().unwrap();
        assert_eq!(entry.integrations, vec!["telegram".to_string()]);
        let stored_at = entry.stored_at.clone().unwrap();
        assert!(stored_at.starts_with("ingested/by-source/acme-flows/one."));
        assert!(temp.path().join(&stored_at).exists());
        assert_eq!(
            entry.sources[0].url,
            "https://github.com/acme/flows/blob/main/flows/one.json"
        );
    }

    #[test]
    fn test_repeat_sighting_skips_store_write() {
        let temp = TempDir::new().unwrap();
        let remote = OneFile {
            body: br#"{"nodes":[]}"#,
            fetches: Cell::new(0),
        };
        let mut index = CatalogueIndex::new();
        let sources = vec![
            SourceDescriptor::new("acme", "flows", SourceMode::Full),
            SourceDescriptor::new("acme", "mirror", SourceMode::Full),
        ];

        let stats = harvester(&remote, &temp).run(&sources, &mut index);

        assert_eq!(stats.new_entries, 1);
        assert_eq!(stats.duplicate_sightings, 1);
        assert_eq!(remote.fetches.get(), 2);
        assert!(!temp.path().join("ingested/by-source/acme-mirror").exists());
        let (_, entry) = index.entries().next().unwrap();
        assert_eq!(entry.sources.len(), 2);
        assert_eq!(entry.sources[1].repo, "mirror");
    }

    #[test]
    fn test_link_only_hashes_url_without_fetch() {
        let temp = TempDir::new().unwrap();
        let remote = OneFile {
            body: b"unused",
            fetches: Cell::new(0),
        };
        let mut index = CatalogueIndex::new();
        let sources = vec![SourceDescriptor::new("acme", "flows", SourceMode::LinkOnly)];

        let stats = harvester(&remote, &temp).run(&sources, &mut index);

        assert_eq!(remote.fetches.get(), 0);
        assert_eq!(stats.link_only, 1);
        let url = "https://github.com/acme/flows/blob/main/flows/one.json";
        let entry = index.get(&content_hash(url.as_bytes())).unwrap();
        assert!(entry.integrations.is_empty());
        assert_eq!(entry.stored_at, None);
        assert!(!temp.path().join("ingested").exists());
    }

    #[test]
    fn test_listing_failure_abandons_only_that_source() {
        let temp = TempDir::new().unwrap();
        let mut index = CatalogueIndex::new();
        let sources = vec![SourceDescriptor::new("gone", "repo", SourceMode::Full)];

        let stats = harvester(&NoTree, &temp).run(&sources, &mut index);

        assert_eq!(stats.sources_failed, 1);
        assert_eq!(stats.sources_processed, 0);
        assert!(index.is_empty());
    }

    #[test]
    fn test_unparsable_file_is_skipped() {
        let temp = TempDir::new().unwrap();
        let remote = OneFile {
            body: b"{ truncated",
            fetches: Cell::new(0),
        };
        let mut index = CatalogueIndex::new();
        let sources = vec![SourceDescriptor::new("acme", "flows", SourceMode::Full)];

        let stats = harvester(&remote, &temp).run(&sources, &mut index);

        assert_eq!(stats.files_failed, 1);
        assert_eq!(stats.sources_processed, 1);
        assert!(index.is_empty());
    }
}
