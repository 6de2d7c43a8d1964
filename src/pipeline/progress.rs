// file: src/pipeline/progress.rs
// description: progress reporting and statistics for harvest runs
// reference: uses indicatif for progress spinners and tracks processing metrics

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineStats {
    pub sources_processed: usize,
    pub sources_failed: usize,
    pub files_seen: usize,
    pub files_catalogued: usize,
    pub files_failed: usize,
    pub link_only: usize,
    pub new_entries: usize,
    pub duplicate_sightings: usize,
    pub bytes_stored: u64,
    pub duration_secs: f64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files_per_second(&self) -> f64 {
        if self.duration_secs <= 0.0 {
            return 0.0;
        }
        self.files_seen as f64 / self.duration_secs
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.files_catalogued + self.files_failed;
        if total == 0 {
            return 0.0;
        }
        (self.files_catalogued as f64 / total as f64) * 100.0
    }
}

/// Spinner showing the current source and file while a harvest runs.
pub struct ProgressTracker {
    bar: ProgressBar,
    start_time: Instant,
}

impl ProgressTracker {
    pub fn new(visible: bool) -> Self {
        let bar = ProgressBar::new_spinner();
        if visible {
            bar.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {pos} files {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            bar.enable_steady_tick(Duration::from_millis(120));
        } else {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }

        Self {
            bar,
            start_time: Instant::now(),
        }
    }

    pub fn hidden() -> Self {
        Self::new(false)
    }

    pub fn start_source(&self, slug: &str, step: usize, total: usize) {
        self.bar.set_message(format!("[{}/{}] {}", step, total, slug));
    }

    pub fn file_done(&self, path: &str) {
        self.bar.inc(1);
        self.bar.set_message(path.to_string());
    }

    pub fn files_done(&self) -> u64 {
        self.bar.position()
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Drop for ProgressTracker {
    fn drop(&mut self) {
        self.finish();
    }
}
