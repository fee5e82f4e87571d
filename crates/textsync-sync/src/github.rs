//! GitHub contents-API client for pushing locale files.
//!
//! Create-or-replace is keyed by a SHA precondition: each push fetches the
//! file's current blob SHA (if any) and sends it back with the PUT, so a
//! concurrent change on the branch rejects the write instead of being
//! clobbered.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::json;
use textsync_core::GitHubTarget;
use thiserror::Error;
use tracing::info;

use crate::export::LocaleFile;

const API_BASE: &str = "https://api.github.com";

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("base64 decode error: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("file content is not UTF-8")]
    NotUtf8,
}

/// A file as it currently exists on the branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub sha: String,
    pub content: String,
}

#[derive(Deserialize)]
struct ContentsResponse {
    sha: String,
    content: String,
}

/// Client for one repository target.
pub struct GitHubClient {
    client: reqwest::Client,
    api_base: String,
    owner: String,
    repo: String,
    branch: String,
    token: String,
}

impl GitHubClient {
    /// Create a client for the given repository target.
    pub fn new(target: &GitHubTarget) -> Result<Self, SyncError> {
        Self::with_base(target, API_BASE)
    }

    /// Create a client against a non-default API base (used by tests).
    pub fn with_base(target: &GitHubTarget, api_base: &str) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder().user_agent("textsync").build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            owner: target.owner.clone(),
            repo: target.repo.clone(),
            branch: target.branch.clone(),
            token: target.token.clone(),
        })
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_base, self.owner, self.repo, path
        )
    }

    /// Fetch a file's current SHA and decoded content; `None` when the
    /// file does not exist yet on the branch.
    pub async fn get_file(&self, path: &str) -> Result<Option<RemoteFile>, SyncError> {
        let url = format!("{}?ref={}", self.contents_url(path), self.branch);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github.v3+json")
            .send()
            .await?;

        if resp.status().as_u16() == 404 {
            return Ok(None);
        }
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ContentsResponse = resp.json().await?;
        Ok(Some(RemoteFile {
            content: decode_content(&parsed.content)?,
            sha: parsed.sha,
        }))
    }

    /// Create or replace a file on the branch.
    ///
    /// Pass the current blob `sha` when replacing; omit it for a new file.
    pub async fn put_file(
        &self,
        path: &str,
        content: &str,
        message: &str,
        sha: Option<&str>,
    ) -> Result<(), SyncError> {
        let body = put_body(content, message, &self.branch, sha);
        let resp = self
            .client
            .put(self.contents_url(path))
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github.v3+json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::Server {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    /// Push each locale file, fetching its current SHA first. Returns how
    /// many files were written.
    pub async fn push_locales(
        &self,
        files: &[LocaleFile],
        message: &str,
    ) -> Result<usize, SyncError> {
        for file in files {
            let existing = self.get_file(&file.path).await?;
            if existing.as_ref().is_some_and(|f| f.content == file.content) {
                info!(path = %file.path, "unchanged, not pushed");
                continue;
            }
            info!(path = %file.path, keys = file.keys, "pushing locale file");
            self.put_file(
                &file.path,
                &file.content,
                message,
                existing.as_ref().map(|f| f.sha.as_str()),
            )
            .await?;
        }
        info!(count = files.len(), "sync complete");
        Ok(files.len())
    }
}

/// Request body for a contents PUT; `sha` is present only when replacing.
fn put_body(content: &str, message: &str, branch: &str, sha: Option<&str>) -> serde_json::Value {
    let mut body = json!({
        "message": message,
        "content": STANDARD.encode(content.as_bytes()),
        "branch": branch,
    });
    if let Some(sha) = sha
        && let Some(map) = body.as_object_mut()
    {
        map.insert("sha".to_string(), json!(sha));
    }
    body
}

/// Decode the contents API's base64 payload, which arrives with embedded
/// newlines.
fn decode_content(raw: &str) -> Result<String, SyncError> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD.decode(compact)?;
    String::from_utf8(bytes).map_err(|_| SyncError::NotUtf8)
}
