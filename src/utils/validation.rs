// file: src/utils/validation.rs
// description: data validation utilities and helpers
// reference: input validation patterns

use crate::error::{HarvestError, Result};
use std::path::Path;

pub struct Validator;

impl Validator {
    pub fn validate_url(url: &str) -> Result<()> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(HarvestError::Validation(format!(
                "Invalid URL format: {}",
                url
            )));
        }
        Ok(())
    }

    /// Owner and repo names become URL segments and directory names.
    pub fn validate_repo_segment(field: &str, value: &str) -> Result<()> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(HarvestError::Validation(format!("Source {} is empty", field)));
        }

        if trimmed != value || value.contains('/') || value.contains('\\') || value == ".." {
            return Err(HarvestError::Validation(format!(
                "Source {} is not a single path segment: {:?}",
                field, value
            )));
        }

        Ok(())
    }

    pub fn sanitize_file_path(path: &str) -> String {
        path.replace('\\', "/")
            .replace("//", "/")
            .trim()
            .to_string()
    }

    /// Makes a label usable as exactly one path component.
    ///
    /// Only separators and control characters are replaced; spaces, unicode
    /// and punctuation are kept. Empty, `.` and `..` become `_`.
    pub fn sanitize_component(label: &str) -> String {
        let cleaned: String = label
            .trim()
            .chars()
            .map(|c| match c {
                '/' | '\\' => '_',
                c if c.is_control() => '_',
                c => c,
            })
            .collect();

        if matches!(cleaned.as_str(), "" | "." | "..") {
            "_".to_string()
        } else {
            cleaned
        }
    }

    /// File stem of a remote path, unchanged (`a/b/flow.v2.json` -> `flow.v2`).
    pub fn document_stem(path: &str) -> String {
        Path::new(path)
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|stem| match stem {
                "." | ".." => "_".to_string(),
                _ => stem.to_string(),
            })
            .unwrap_or_else(|| "_".to_string())
    }

    pub fn truncate_text(text: &str, max_length: usize) -> String {
        match text.char_indices().nth(max_length) {
            None => text.to_string(),
            Some((idx, _)) => format!("{}...", &text[..idx]),
        }
    }
}
