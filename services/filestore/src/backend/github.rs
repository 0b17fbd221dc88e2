use super::{
    domain_url, encode_key_path, object_key, read_body, read_file, Backend, StorageError,
    UploadBody,
};
use crate::config::{ConfigError, GitHubConfig};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, instrument};

const PROVIDER: &str = "GitHub";
const DEFAULT_API_BASE: &str = "https://api.github.com";
const RAW_CONTENT_BASE: &str = "https://raw.githubusercontent.com";

/// Content creation request body
#[derive(Debug, Serialize)]
struct CreateContent<'a> {
    message: String,
    content: String,
    branch: &'a str,
}

/// Stores files as commits in a GitHub repository.
///
/// There is no signing: content is public once committed.
pub struct GitHubBackend {
    client: reqwest::Client,
    token: String,
    owner: String,
    repo: String,
    branch: String,
    path: String,
    domain: Option<String>,
    api_base: String,
}

impl GitHubBackend {
    pub fn new(config: &GitHubConfig) -> Result<Self, ConfigError> {
        if config.token.is_empty() {
            return Err(ConfigError::MissingField(
                "FSM_GITHUB_TOKEN (GitHub access token cannot be empty)".to_string(),
            ));
        }
        if config.owner.is_empty() || config.repo.is_empty() {
            return Err(ConfigError::MissingField(
                "FSM_GITHUB_OWNER / FSM_GITHUB_REPO".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;

        let branch = if config.branch.is_empty() {
            "main".to_string()
        } else {
            config.branch.clone()
        };

        info!(
            owner = %config.owner,
            repo = %config.repo,
            branch = %branch,
            "GitHub backend initialized"
        );

        Ok(Self {
            client,
            token: config.token.clone(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            branch,
            path: normalize_path(&config.path),
            domain: config.domain.clone(),
            api_base: DEFAULT_API_BASE.to_string(),
        })
    }

    /// Override the API base URL (GitHub Enterprise, tests)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Public URL of a committed file
    fn public_url(&self, full_path: &str) -> String {
        let encoded = encode_key_path(full_path);
        match self.domain {
            Some(ref domain) => domain_url(domain, &encoded),
            None => format!(
                "{}/{}/{}/{}/{}",
                RAW_CONTENT_BASE, self.owner, self.repo, self.branch, encoded
            ),
        }
    }

    async fn put(&self, data: Vec<u8>, key: &str) -> Result<String, StorageError> {
        let key = object_key(key);
        let full_path = format!("{}{}", self.path, key);
        let file_name = Path::new(&key)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&key);

        let url = format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_base,
            self.owner,
            self.repo,
            encode_key_path(&full_path)
        );
        let body = CreateContent {
            message: format!("Upload {}", file_name),
            content: STANDARD.encode(&data),
            branch: &self.branch,
        };

        let response = self
            .client
            .put(&url)
            .header(AUTHORIZATION, format!("token {}", self.token))
            .header(ACCEPT, "application/vnd.github.v3+json")
            .header(USER_AGENT, "file-store")
            .json(&body)
            .send()
            .await
            .map_err(|e| StorageError::Upload {
                provider: PROVIDER,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Api {
                provider: PROVIDER,
                status: status.as_u16(),
                body,
            });
        }

        debug!(path = %full_path, branch = %self.branch, "File committed to GitHub");

        Ok(self.public_url(&full_path))
    }
}

#[async_trait]
impl Backend for GitHubBackend {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    #[instrument(skip(self), fields(repo = %self.repo))]
    async fn upload_file(&self, path: &Path, key: &str) -> Result<String, StorageError> {
        let data = read_file(path).await?;
        self.put(data, key).await
    }

    #[instrument(skip(self, body), fields(repo = %self.repo))]
    async fn upload(&self, body: UploadBody, key: &str) -> Result<String, StorageError> {
        let data = read_body(body).await?;
        self.put(data, key).await
    }
}

/// Repository directory with a trailing slash, or empty for the root
fn normalize_path(path: &str) -> String {
    let path = path.trim().trim_start_matches('/');
    if path.is_empty() || path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}
