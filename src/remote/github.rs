// file: src/remote/github.rs
// description: GitHub REST client for tree listings and file contents
// reference: https://docs.github.com/en/rest/git/trees and /rest/repos/contents

use crate::config::GitHubConfig;
use crate::error::{HarvestError, Result};
use crate::remote::fetcher::{
    Clock, HttpResponse, RateLimit, ResilientFetcher, SystemClock, Transport,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::blocking::Client;
use reqwest::Url;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// One item of a recursive tree listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TreeEntry {
    #[serde(default)]
    pub path: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub sha: String,
}

impl TreeEntry {
    pub fn blob(path: &str, sha: &str) -> Self {
        Self {
            path: path.to_string(),
            kind: "blob".to_string(),
            sha: sha.to_string(),
        }
    }

    pub fn is_blob(&self) -> bool {
        self.kind == "blob"
    }
}

/// The remote repository capability the pipeline depends on.
pub trait RemoteRepository {
    fn list_tree(&self, owner: &str, repo: &str, reference: &str) -> Result<Vec<TreeEntry>>;

    /// Raw (decoded) bytes of one file at `reference`.
    fn get_content(&self, owner: &str, repo: &str, path: &str, reference: &str)
    -> Result<Vec<u8>>;
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );

        if let Some(token) = config.resolved_token() {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| HarvestError::Config(format!("Invalid GitHub token: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        } else {
            debug!("No GitHub token configured, using unauthenticated requests");
        }

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| HarvestError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn get(&self, url: &str, params: &[(&str, &str)]) -> Result<HttpResponse> {
        let transport_error = |e: reqwest::Error| HarvestError::Transport {
            url: url.to_string(),
            message: e.to_string(),
            transient: e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
        };

        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let rate_limit = RateLimit {
            remaining: header_number(response.headers(), "x-ratelimit-remaining"),
            reset: header_number(response.headers(), "x-ratelimit-reset"),
        };
        let body = response.bytes().map_err(transport_error)?.to_vec();

        Ok(HttpResponse {
            status,
            rate_limit,
            body,
        })
    }
}

fn header_number<N: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<N> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

pub struct GitHubClient<T, C = SystemClock> {
    fetcher: ResilientFetcher<T, C>,
    api_base: String,
}

impl GitHubClient<ReqwestTransport, SystemClock> {
    pub fn from_config(config: &GitHubConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config)?;
        Ok(Self::new(
            ResilientFetcher::new(transport, config.max_attempts),
            &config.api_base,
        ))
    }
}

impl<T: Transport, C: Clock> GitHubClient<T, C> {
    pub fn new(fetcher: ResilientFetcher<T, C>, api_base: &str) -> Self {
        Self {
            fetcher,
            api_base: api_base.to_string(),
        }
    }

    /// `{api_base}/repos/{owner}/{repo}/{tail...}`, each segment percent-encoded.
    /// `/` inside a tail item separates segments.
    fn repo_url(&self, owner: &str, repo: &str, tail: &[&str]) -> Result<Url> {
        let invalid = |message: String| HarvestError::Config(format!("api_base: {}", message));

        let mut url = Url::parse(&self.api_base).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid(format!("{} cannot be a base URL", self.api_base)))?
            .pop_if_empty()
            .push("repos")
            .push(owner)
            .push(repo)
            .extend(tail.iter().flat_map(|item| item.split('/')));
        Ok(url)
    }
}

impl<T: Transport, C: Clock> RemoteRepository for GitHubClient<T, C> {
    fn list_tree(&self, owner: &str, repo: &str, reference: &str) -> Result<Vec<TreeEntry>> {
        let url = self.repo_url(owner, repo, &["git", "trees", reference])?;
        let response: TreeResponse = self
            .fetcher
            .get_json(url.as_str(), &[("recursive", "1")])?;

        if response.truncated {
            warn!(
                "Tree listing for {}/{}@{} was truncated by the API; some files will be missed",
                owner, repo, reference
            );
        }

        debug!(
            "Listed {} tree entries for {}/{}@{}",
            response.tree.len(),
            owner,
            repo,
            reference
        );
        Ok(response.tree)
    }

    fn get_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        reference: &str,
    ) -> Result<Vec<u8>> {
        let url = self.repo_url(owner, repo, &["contents", path])?;
        let response: ContentResponse = self.fetcher.get_json(url.as_str(), &[("ref", reference)])?;
        decode_content(url.as_str(), response)
    }
}

fn decode_content(url: &str, response: ContentResponse) -> Result<Vec<u8>> {
    match response.encoding.as_deref() {
        Some("base64") | None => {}
        Some(other) => {
            return Err(HarvestError::Decode {
                context: url.to_string(),
                message: format!("unsupported content encoding '{}'", other),
            });
        }
    }

    let content = response.content.ok_or_else(|| HarvestError::Decode {
        context: url.to_string(),
        message: "response has no content field".to_string(),
    })?;

    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD.decode(compact).map_err(|e| HarvestError::Decode {
        context: url.to_string(),
        message: e.to_string(),
    })
}
