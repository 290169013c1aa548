//! Workspace storage

use crate::path::validate_path;
use crate::query::{self, FileRelevance, SearchHit, SymbolMatch};
use crate::tree::Tree;
use refact_core::{Edit, RefactError, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Effect of applying one edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Created,
    Updated,
    Deleted,
    /// The edit left the workspace as it was
    Unchanged,
}

impl Change {
    pub fn as_str(&self) -> &'static str {
        match self {
            Change::Created => "created",
            Change::Updated => "updated",
            Change::Deleted => "deleted",
            Change::Unchanged => "unchanged",
        }
    }
}

/// In-memory snapshot of a project's files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workspace {
    files: BTreeMap<String, String>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a workspace from `(path, content)` pairs, validating each path
    pub fn from_files<I, P, C>(files: I) -> Result<Self>
    where
        I: IntoIterator<Item = (P, C)>,
        P: AsRef<str>,
        C: Into<String>,
    {
        let mut workspace = Self::new();
        for (path, content) in files {
            let path = validate_path(path.as_ref())?;
            workspace.files.insert(path, content.into());
        }
        Ok(workspace)
    }

    /// Apply one edit. Create and update overwrite; delete of a missing path is a no-op.
    pub fn apply(&mut self, edit: &Edit) -> Result<Change> {
        let path = validate_path(edit.path())?;

        let change = match edit {
            Edit::Create { content, .. } | Edit::Update { content, .. } => {
                match self.files.insert(path, content.clone()) {
                    None => Change::Created,
                    Some(previous) if previous == *content => Change::Unchanged,
                    Some(_) => Change::Updated,
                }
            }
            Edit::Delete { .. } => match self.files.remove(&path) {
                Some(_) => Change::Deleted,
                None => Change::Unchanged,
            },
        };

        debug!("Applied {} {} -> {:?}", edit.kind(), edit.path(), change);
        Ok(change)
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Iterate `(path, content)` in path order
    pub fn files(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn tree(&self) -> Tree {
        Tree::from_paths(self.paths())
    }

    /// Read the requested paths; absent paths are omitted
    pub fn read<S: AsRef<str>>(&self, paths: &[S]) -> BTreeMap<String, String> {
        paths
            .iter()
            .filter_map(|p| {
                let p = p.as_ref();
                self.files.get(p).map(|c| (p.to_string(), c.clone()))
            })
            .collect()
    }
}

/// Process-wide owner of all workspaces, keyed by project id
///
/// Cloning yields another handle to the same store.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceStore {
    workspaces: Arc<RwLock<HashMap<String, Workspace>>>,
}

impl WorkspaceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a project's workspace
    pub async fn get(&self, project_id: &str) -> Result<Workspace> {
        self.workspaces
            .read()
            .await
            .get(project_id)
            .cloned()
            .ok_or_else(|| RefactError::NotFound(format!("Workspace {}", project_id)))
    }

    /// Replace a project's workspace wholesale
    pub async fn put(&self, project_id: &str, workspace: Workspace) {
        info!(
            "Storing workspace {} ({} files)",
            project_id,
            workspace.len()
        );
        self.workspaces
            .write()
            .await
            .insert(project_id.to_string(), workspace);
    }

    pub async fn contains(&self, project_id: &str) -> bool {
        self.workspaces.read().await.contains_key(project_id)
    }

    /// Apply one edit in place
    pub async fn apply_edit(&self, project_id: &str, edit: &Edit) -> Result<Change> {
        let mut workspaces = self.workspaces.write().await;
        let workspace = workspaces
            .get_mut(project_id)
            .ok_or_else(|| RefactError::NotFound(format!("Workspace {}", project_id)))?;
        workspace.apply(edit)
    }

    /// Apply edits sequentially, stopping at the first invalid one
    ///
    /// Edits applied before a failure stay applied.
    pub async fn apply_edits(&self, project_id: &str, edits: &[Edit]) -> Result<Vec<Change>> {
        let mut changes = Vec::with_capacity(edits.len());
        for edit in edits {
            changes.push(self.apply_edit(project_id, edit).await?);
        }
        Ok(changes)
    }

    pub async fn list_tree(&self, project_id: &str) -> Result<Tree> {
        self.with_workspace(project_id, Workspace::tree).await
    }

    pub async fn search(&self, project_id: &str, query: &str) -> Result<Vec<SearchHit>> {
        self.with_workspace(project_id, |ws| query::search(ws, query))
            .await
    }

    pub async fn read<S: AsRef<str> + Sync>(
        &self,
        project_id: &str,
        paths: &[S],
    ) -> Result<BTreeMap<String, String>> {
        self.with_workspace(project_id, |ws| ws.read(paths)).await
    }

    pub async fn locate(&self, project_id: &str, task: &str) -> Result<Vec<FileRelevance>> {
        self.with_workspace(project_id, |ws| query::locate(ws, task))
            .await
    }

    pub async fn definitions(&self, project_id: &str, symbol: &str) -> Result<Vec<SymbolMatch>> {
        self.with_workspace(project_id, |ws| query::definitions(ws, symbol))
            .await
    }

    pub async fn references(&self, project_id: &str, symbol: &str) -> Result<Vec<SymbolMatch>> {
        self.with_workspace(project_id, |ws| query::references(ws, symbol))
            .await
    }

    async fn with_workspace<T, F>(&self, project_id: &str, f: F) -> Result<T>
    where
        F: FnOnce(&Workspace) -> T,
    {
        let workspaces = self.workspaces.read().await;
        let workspace = workspaces
            .get(project_id)
            .ok_or_else(|| RefactError::NotFound(format!("Workspace {}", project_id)))?;
        Ok(f(workspace))
    }
}
