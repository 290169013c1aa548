//! # refact-workspace
//!
//! The agent's view of a repository's working tree.
//!
//! A [`Workspace`] is a flat map from forward-slash relative path to file
//! content. The [`WorkspaceStore`] owns every workspace in the process and
//! is handed explicitly to whoever needs it; nothing here is global.
//!
//! The store takes a lock only to keep individual reads and writes
//! memory-safe. Two agent runs against the same project can still
//! interleave their edits.

mod path;
mod query;
mod store;
mod tree;

pub use path::validate_path;
pub use query::{
    definitions, locate, references, search, FileRelevance, SearchHit, SymbolMatch,
};
pub use store::{Change, Workspace, WorkspaceStore};
pub use tree::{Tree, TreeNode};
