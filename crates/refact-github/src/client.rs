//! GitHub REST API client

use crate::sync::{CommitRef, RemoteSync, RepoInfo};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use refact_core::{RefactError, Result};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = "refact";

/// GitHub client authenticated with a single user token
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    base_url: Url,
    token: String,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RepoResponse {
    name: String,
    owner: UserResponse,
    html_url: String,
    clone_url: String,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    commit: CommitInfo,
}

#[derive(Debug, Deserialize)]
struct CommitInfo {
    sha: String,
    #[serde(default)]
    html_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    entry_type: String,
    sha: String,
}

#[derive(Debug, Deserialize)]
struct BlobResponse {
    content: String,
    encoding: String,
}

impl GitHubClient {
    /// Create a client against `base_url` (e.g. `https://api.github.com`)
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| RefactError::Config(format!("Invalid GitHub URL {}: {}", base_url, e)))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            token: token.into(),
        })
    }

    /// Build an API URL from path segments; each segment is percent-encoded
    fn url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                RefactError::Config(format!("GitHub URL cannot be a base: {}", self.base_url))
            })?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    fn contents_url(&self, owner: &str, repo: &str, path: &str) -> Result<Url> {
        let segments = ["repos", owner, repo, "contents"]
            .into_iter()
            .chain(path.split('/'));
        self.url(segments)
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(&self.token)
            .header("accept", "application/vnd.github+json")
            .header("x-github-api-version", API_VERSION)
            .header("user-agent", USER_AGENT)
    }

    /// Send a request and decode a JSON body, mapping non-2xx to `Upstream`
    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| RefactError::transport(format!("GitHub request failed: {}", e)))?;
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown".to_string());
            return Err(upstream_error(status, body));
        }

        response.json().await.map_err(|e| RefactError::Upstream {
            status: status.as_u16(),
            body: format!("Failed to parse GitHub response: {}", e),
        })
    }

    /// Blob sha of an existing file, if any
    async fn existing_sha(&self, owner: &str, repo: &str, path: &str) -> Result<Option<String>> {
        let url = self.contents_url(owner, repo, path)?;
        match self
            .send::<ContentResponse>(self.request(Method::GET, url))
            .await
        {
            Ok(content) => Ok(Some(content.sha)),
            Err(RefactError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl RemoteSync for GitHubClient {
    #[instrument(skip(self, content), fields(bytes = content.len()))]
    async fn commit(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        content: &str,
    ) -> Result<CommitRef> {
        let sha = self.existing_sha(owner, repo, path).await?;
        let message = commit_message(if sha.is_some() { "Update" } else { "Create" }, path);

        let mut body = json!({
            "message": message,
            "content": STANDARD.encode(content.as_bytes()),
        });
        if let Some(sha) = sha {
            body["sha"] = json!(sha);
        }

        let url = self.contents_url(owner, repo, path)?;
        let response: CommitResponse = self
            .send(self.request(Method::PUT, url).json(&body))
            .await?;

        debug!("Committed {} to {}/{} ({})", path, owner, repo, response.commit.sha);
        Ok(CommitRef {
            path: path.to_string(),
            sha: response.commit.sha,
            url: response.commit.html_url,
        })
    }

    #[instrument(skip(self))]
    async fn delete(&self, owner: &str, repo: &str, path: &str) -> Result<CommitRef> {
        let sha = self
            .existing_sha(owner, repo, path)
            .await?
            .ok_or_else(|| RefactError::NotFound(format!("{}/{}:{}", owner, repo, path)))?;

        let body = json!({
            "message": commit_message("Delete", path),
            "sha": sha,
        });

        let url = self.contents_url(owner, repo, path)?;
        let response: CommitResponse = self
            .send(self.request(Method::DELETE, url).json(&body))
            .await?;

        Ok(CommitRef {
            path: path.to_string(),
            sha: response.commit.sha,
            url: response.commit.html_url,
        })
    }

    #[instrument(skip(self))]
    async fn create_repository(&self, name: &str, private: bool) -> Result<RepoInfo> {
        let body = json!({
            "name": name,
            "private": private,
            "auto_init": true,
            "description": "Created by refact",
        });

        let url = self.url(["user", "repos"])?;
        let repo: RepoResponse = self.send(self.request(Method::POST, url).json(&body)).await?;

        info!("Created repository {}/{}", repo.owner.login, repo.name);
        Ok(RepoInfo {
            owner: repo.owner.login,
            name: repo.name,
            html_url: repo.html_url,
            clone_url: repo.clone_url,
        })
    }

    #[instrument(skip(self))]
    async fn snapshot(&self, owner: &str, repo: &str) -> Result<Vec<(String, String)>> {
        let mut url = self.url(["repos", owner, repo, "git", "trees", "HEAD"])?;
        url.query_pairs_mut().append_pair("recursive", "1");

        let tree: TreeResponse = match self.send(self.request(Method::GET, url)).await {
            Ok(tree) => tree,
            // An empty repository has no HEAD yet
            Err(RefactError::Upstream { status: 409, .. }) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        if tree.truncated {
            warn!("Tree listing for {}/{} was truncated by GitHub", owner, repo);
        }

        let mut files = Vec::new();
        for entry in tree.tree.into_iter().filter(|e| e.entry_type == "blob") {
            let url = self.url(["repos", owner, repo, "git", "blobs", entry.sha.as_str()])?;
            let blob: BlobResponse = self.send(self.request(Method::GET, url)).await?;

            match decode_blob(&blob) {
                Some(content) => files.push((entry.path, content)),
                None => debug!("Skipping non-text file {}", entry.path),
            }
        }

        info!("Fetched {} files from {}/{}", files.len(), owner, repo);
        Ok(files)
    }

    async fn authenticated_user(&self) -> Result<String> {
        let url = self.url(["user"])?;
        let user: UserResponse = self.send(self.request(Method::GET, url)).await?;
        Ok(user.login)
    }
}

fn upstream_error(status: StatusCode, body: String) -> RefactError {
    if status == StatusCode::NOT_FOUND {
        RefactError::NotFound(body)
    } else {
        RefactError::Upstream {
            status: status.as_u16(),
            body,
        }
    }
}

fn commit_message(verb: &str, path: &str) -> String {
    format!("{} {}", verb, path)
}

/// Decode a base64 blob into UTF-8 text; binary files yield `None`
fn decode_blob(blob: &BlobResponse) -> Option<String> {
    if blob.encoding != "base64" {
        return Some(blob.content.clone());
    }
    let compact: String = blob
        .content
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = STANDARD.decode(compact).ok()?;
    String::from_utf8(bytes).ok()
}
