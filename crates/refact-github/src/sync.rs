//! Remote sync abstraction

use async_trait::async_trait;
use refact_core::{RefactError, Result};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Reference to one upstream commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRef {
    pub path: String,
    pub sha: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl std::fmt::Display for CommitRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.path, self.sha)
    }
}

/// A hosted repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoInfo {
    pub owner: String,
    pub name: String,
    pub html_url: String,
    pub clone_url: String,
}

/// Trait for mirroring workspace files to a repository host (allows mocking in tests)
#[async_trait]
pub trait RemoteSync: Send + Sync {
    /// Create or overwrite one file as its own commit
    async fn commit(&self, owner: &str, repo: &str, path: &str, content: &str)
        -> Result<CommitRef>;

    /// Delete one file as its own commit
    async fn delete(&self, owner: &str, repo: &str, path: &str) -> Result<CommitRef>;

    /// Create a repository owned by the authenticated user
    async fn create_repository(&self, name: &str, private: bool) -> Result<RepoInfo>;

    /// Every text file on the default branch, as `(path, content)`
    async fn snapshot(&self, owner: &str, repo: &str) -> Result<Vec<(String, String)>>;

    /// Login of the authenticated user
    async fn authenticated_user(&self) -> Result<String>;
}

/// One call observed by [`RecordingRemoteSync`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    Commit {
        owner: String,
        repo: String,
        path: String,
        content: String,
    },
    Delete {
        owner: String,
        repo: String,
        path: String,
    },
    CreateRepository {
        name: String,
    },
}

/// In-memory remote sync that records every call
///
/// Paths listed with [`RecordingRemoteSync::failing`] fail their commit or delete.
#[derive(Debug, Clone)]
pub struct RecordingRemoteSync {
    login: String,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    files: Arc<Mutex<Vec<(String, String)>>>,
    failing: Vec<String>,
}

impl Default for RecordingRemoteSync {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingRemoteSync {
    pub fn new() -> Self {
        Self {
            login: "octocat".to_string(),
            calls: Arc::new(Mutex::new(Vec::new())),
            files: Arc::new(Mutex::new(Vec::new())),
            failing: Vec::new(),
        }
    }

    /// Make mirrors of `path` fail
    pub fn failing(mut self, path: &str) -> Self {
        self.failing.push(path.to_string());
        self
    }

    /// Seed the snapshot returned for any repository
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.lock_files().push((path.to_string(), content.to_string()));
        self
    }

    /// Calls observed so far, in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn record(&self, call: RecordedCall) {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(call);
    }

    fn lock_files(&self) -> std::sync::MutexGuard<'_, Vec<(String, String)>> {
        self.files
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(&self, path: &str) -> Result<()> {
        if self.failing.iter().any(|p| p == path) {
            return Err(RefactError::Upstream {
                status: 409,
                body: format!("simulated failure for {}", path),
            });
        }
        Ok(())
    }

    fn next_sha(&self) -> String {
        format!("sha{}", self.calls().len())
    }
}

#[async_trait]
impl RemoteSync for RecordingRemoteSync {
    async fn commit(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        content: &str,
    ) -> Result<CommitRef> {
        self.record(RecordedCall::Commit {
            owner: owner.to_string(),
            repo: repo.to_string(),
            path: path.to_string(),
            content: content.to_string(),
        });
        self.check(path)?;
        Ok(CommitRef {
            path: path.to_string(),
            sha: self.next_sha(),
            url: None,
        })
    }

    async fn delete(&self, owner: &str, repo: &str, path: &str) -> Result<CommitRef> {
        self.record(RecordedCall::Delete {
            owner: owner.to_string(),
            repo: repo.to_string(),
            path: path.to_string(),
        });
        self.check(path)?;
        Ok(CommitRef {
            path: path.to_string(),
            sha: self.next_sha(),
            url: None,
        })
    }

    async fn create_repository(&self, name: &str, _private: bool) -> Result<RepoInfo> {
        self.record(RecordedCall::CreateRepository {
            name: name.to_string(),
        });
        Ok(RepoInfo {
            owner: self.login.clone(),
            name: name.to_string(),
            html_url: format!("https://github.com/{}/{}", self.login, name),
            clone_url: format!("https://github.com/{}/{}.git", self.login, name),
        })
    }

    async fn snapshot(&self, _owner: &str, _repo: &str) -> Result<Vec<(String, String)>> {
        Ok(self.lock_files().clone())
    }

    async fn authenticated_user(&self) -> Result<String> {
        Ok(self.login.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_ref_display() {
        let commit = CommitRef {
            path: "src/a.js".to_string(),
            sha: "abc".to_string(),
            url: None,
        };
        assert_eq!(commit.to_string(), "src/a.js@abc");
    }

    #[tokio::test]
    async fn test_recording_sync_records_in_order() {
        let sync = RecordingRemoteSync::new();
        sync.commit("o", "r", "a.js", "1").await.unwrap();
        sync.delete("o", "r", "b.js").await.unwrap();

        let calls = sync.calls();
        assert_eq!(calls.len(), 2);
        assert!(matches!(&calls[0], RecordedCall::Commit { path, .. } if path == "a.js"));
        assert!(matches!(&calls[1], RecordedCall::Delete { path, .. } if path == "b.js"));
    }

    #[tokio::test]
    async fn test_recording_sync_failure_still_recorded() {
        let sync = RecordingRemoteSync::new().failing("bad.js");
        assert!(sync.commit("o", "r", "bad.js", "x").await.is_err());
        assert_eq!(sync.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_recording_sync_snapshot() {
        let sync = RecordingRemoteSync::new().with_file("README.md", "# hi");
        let files = sync.snapshot("o", "r").await.unwrap();
        assert_eq!(files, vec![("README.md".to_string(), "# hi".to_string())]);
    }
}
