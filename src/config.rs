// file: src/config.rs
// description: application configuration management with toml support
// reference: https://docs.rs/config

use crate::error::{HarvestError, Result};
use crate::models::SourceDescriptor;
use crate::remote::discovery::IncludeFilter;
use crate::remote::fetcher::DEFAULT_ATTEMPTS;
use crate::utils::Validator;
use dotenvy::dotenv;
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub github: GitHubConfig,
    pub storage: StorageConfig,
    pub sources: SourcesConfig,
    #[serde(default)]
    pub classification: ClassificationConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GitHubConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_web_base")]
    pub web_base: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_catalogue_path")]
    pub catalogue_path: PathBuf,
    #[serde(default = "default_ingested_dir")]
    pub ingested_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourcesConfig {
    #[serde(default = "default_sources_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ClassificationConfig {
    #[serde(default)]
    pub extra_integrations: Vec<IntegrationRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct IntegrationRule {
    pub name: String,
    pub pattern: String,
}

#[derive(Debug, Deserialize)]
struct SourcesFile {
    #[serde(default)]
    sources: Vec<SourceDescriptor>,
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}
fn default_web_base() -> String {
    "https://github.com".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_attempts() -> u32 {
    DEFAULT_ATTEMPTS
}
fn default_user_agent() -> String {
    concat!("workflow_harvest/", env!("CARGO_PKG_VERSION")).to_string()
}
fn default_root() -> PathBuf {
    PathBuf::from(".")
}
fn default_catalogue_path() -> PathBuf {
    PathBuf::from("catalogue/index.json")
}
fn default_ingested_dir() -> PathBuf {
    PathBuf::from("ingested")
}
fn default_sources_path() -> PathBuf {
    PathBuf::from("sources.yaml")
}

impl GitHubConfig {
    /// Configured token, falling back to `GH_TOKEN`.
    pub fn resolved_token(&self) -> Option<String> {
        self.token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| std::env::var("GH_TOKEN").ok())
            .filter(|t| !t.trim().is_empty())
    }
}

impl StorageConfig {
    pub fn catalogue_file(&self) -> PathBuf {
        self.root.join(&self.catalogue_path)
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv().ok();

        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        } else {
            builder = builder.add_source(config::File::from(Path::new("config/default.toml")));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("HARVEST")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| HarvestError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| HarvestError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            github: GitHubConfig {
                api_base: default_api_base(),
                web_base: default_web_base(),
                token: None,
                timeout_secs: default_timeout_secs(),
                max_attempts: default_max_attempts(),
                user_agent: default_user_agent(),
            },
            storage: StorageConfig {
                root: default_root(),
                catalogue_path: default_catalogue_path(),
                ingested_dir: default_ingested_dir(),
            },
            sources: SourcesConfig {
                path: default_sources_path(),
            },
            classification: ClassificationConfig::default(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.github.max_attempts == 0 {
            return Err(HarvestError::Config(
                "github.max_attempts must be greater than 0".to_string(),
            ));
        }

        if self.github.timeout_secs == 0 {
            return Err(HarvestError::Config(
                "github.timeout_secs must be greater than 0".to_string(),
            ));
        }

        Validator::validate_url(&self.github.api_base)?;
        Validator::validate_url(&self.github.web_base)?;

        for rule in &self.classification.extra_integrations {
            if rule.name.trim().is_empty() {
                return Err(HarvestError::Config(
                    "classification.extra_integrations entries need a name".to_string(),
                ));
            }
            RegexBuilder::new(&rule.pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| HarvestError::Pattern(format!("{}: {}", rule.name, e)))?;
        }

        Ok(())
    }
}

/// Reads the list of sources to harvest. Format follows the file extension.
pub fn load_sources(path: &Path) -> Result<Vec<SourceDescriptor>> {
    if !path.exists() {
        return Err(HarvestError::Config(format!(
            "Sources file not found: {}",
            path.display()
        )));
    }

    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .build()
        .map_err(|e| HarvestError::Config(format!("{}: {}", path.display(), e)))?;

    let file: SourcesFile = settings
        .try_deserialize()
        .map_err(|e| HarvestError::Config(format!("{}: {}", path.display(), e)))?;

    for source in &file.sources {
        validate_source(source)?;
    }

    debug!("Loaded {} sources from {}", file.sources.len(), path.display());
    Ok(file.sources)
}

fn validate_source(source: &SourceDescriptor) -> Result<()> {
    Validator::validate_repo_segment("owner", &source.owner)?;
    Validator::validate_repo_segment("repo", &source.repo)?;

    if source.branch.trim().is_empty() {
        return Err(HarvestError::Validation(format!(
            "Source {} has an empty branch",
            source.slug()
        )));
    }

    IncludeFilter::new(&source.include)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceMode;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default_config();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.storage.catalogue_file(),
            PathBuf::from("./catalogue/index.json")
        );
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = Config::default_config();
        config.github.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_integration_pattern() {
        let mut config = Config::default_config();
        config.classification.extra_integrations.push(IntegrationRule {
            name: "broken".to_string(),
            pattern: "(unclosed".to_string(),
        });
        assert!(matches!(config.validate(), Err(HarvestError::Pattern(_))));
    }

    #[test]
    fn test_load_from_toml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("harvest.toml");
        fs::write(
            &path,
            r#"
[github]
max_attempts = 3

[storage]
root = "/srv/harvest"

[sources]
path = "repos.yaml"

[[classification.extra_integrations]]
name = "hubspot"
pattern = "hub ?spot"
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.github.max_attempts, 3);
        assert_eq!(config.github.api_base, "https://api.github.com");
        assert_eq!(config.storage.root, PathBuf::from("/srv/harvest"));
        assert_eq!(config.storage.ingested_dir, PathBuf::from("ingested"));
        assert_eq!(config.classification.extra_integrations.len(), 1);
    }

    #[test]
    fn test_load_sources_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sources.yaml");
        fs::write(
            &path,
            r#"
sources:
  - owner: acme
    repo: flows
    mode: full
    include: ["workflows/*.json"]
  - owner: other
    repo: mirror
    branch: master
    mode: link-only
"#,
        )
        .unwrap();

        let sources = load_sources(&path).unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].mode, SourceMode::Full);
        assert_eq!(sources[0].branch, "main");
        assert_eq!(sources[0].include, vec!["workflows/*.json".to_string()]);
        assert_eq!(sources[1].mode, SourceMode::LinkOnly);
        assert_eq!(sources[1].branch, "master");
    }

    #[test]
    fn test_load_sources_rejects_bad_owner() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sources.yaml");
        fs::write(
            &path,
            "sources:\n  - owner: \"a/b\"\n    repo: flows\n    mode: full\n",
        )
        .unwrap();

        assert!(load_sources(&path).is_err());
    }

    #[test]
    fn test_load_sources_missing_file() {
        let temp = TempDir::new().unwrap();
        assert!(load_sources(&temp.path().join("absent.yaml")).is_err());
    }
}
