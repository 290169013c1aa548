//! # refact-github
//!
//! Remote sync for refact workspaces.
//!
//! Every file is committed with its own network call. There is no batching
//! and no atomicity across files: a multi-file edit set shows up upstream as
//! one commit per file, and a failure halfway leaves the earlier commits in
//! place.

mod client;
mod sync;

pub use client::GitHubClient;
pub use sync::{CommitRef, RecordedCall, RecordingRemoteSync, RemoteSync, RepoInfo};
