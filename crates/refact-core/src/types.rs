//! Core type definitions for refact

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::{RefactError, Result};

/// Separator between owner and repository in a project id
const PROJECT_ID_SEPARATOR: &str = "--";

/// Identifies a project and the hosted repository backing it.
///
/// Rendered as `<owner>--<repo>` so it fits in a single URL path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectId {
    pub owner: String,
    pub repo: String,
}

impl ProjectId {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Parse `<owner>--<repo>`, splitting on the first separator
    pub fn parse(s: &str) -> Result<Self> {
        match s.split_once(PROJECT_ID_SEPARATOR) {
            Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() => {
                Ok(Self::new(owner, repo))
            }
            _ => Err(RefactError::InvalidRequest(format!(
                "Invalid project id '{}': expected <owner>{}<repo>",
                s, PROJECT_ID_SEPARATOR
            ))),
        }
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.owner, PROJECT_ID_SEPARATOR, self.repo)
    }
}

impl std::str::FromStr for ProjectId {
    type Err = RefactError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A single create/update/delete instruction against a workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Edit {
    Create { path: String, content: String },
    Update { path: String, content: String },
    Delete { path: String },
}

impl Edit {
    /// Path this edit targets
    pub fn path(&self) -> &str {
        match self {
            Edit::Create { path, .. } | Edit::Update { path, .. } | Edit::Delete { path } => path,
        }
    }

    /// New content, if this edit writes the file
    pub fn content(&self) -> Option<&str> {
        match self {
            Edit::Create { content, .. } | Edit::Update { content, .. } => Some(content),
            Edit::Delete { .. } => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Edit::Create { .. } => "create",
            Edit::Update { .. } => "update",
            Edit::Delete { .. } => "delete",
        }
    }
}

/// One information need declared by a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRequest {
    pub tool: String,
    #[serde(default, deserialize_with = "target_text")]
    pub target: String,
}

/// Accept whatever shape a model gives a target.
///
/// A list of strings becomes a comma-separated list (`cat`'s format), other
/// structured values are kept as JSON text (`patch`'s format), and a null
/// target is empty.
fn target_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(text) => text,
        serde_json::Value::Array(items) if items.iter().all(|v| v.is_string()) => items
            .iter()
            .filter_map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    })
}

/// Structured breakdown of a task produced by the planning call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Ordered information requests, resolved against the tool set
    #[serde(default)]
    pub understanding: Vec<ToolRequest>,
    /// Free-form analysis, dependencies and risks
    #[serde(default)]
    pub planning: serde_json::Value,
    /// Free-form intended actions
    #[serde(default)]
    pub execution: serde_json::Value,
}

/// Concrete edits produced by the execution call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditSet {
    pub edits: Vec<Edit>,
    #[serde(default)]
    pub reasoning: String,
}

/// Outcome of one agent workflow invocation
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionResult {
    Applied {
        edits: Vec<Edit>,
        reasoning: String,
        remote_refs: Vec<String>,
    },
    Failed {
        error: String,
        raw: String,
    },
}

impl ExecutionResult {
    pub fn failed(error: impl Into<String>, raw: impl Into<String>) -> Self {
        ExecutionResult::Failed {
            error: error.into(),
            raw: raw.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Applied { .. })
    }
}

impl Serialize for ExecutionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ExecutionResult::Applied {
                edits,
                reasoning,
                remote_refs,
            } => {
                let mut map = serializer.serialize_map(Some(4))?;
                map.serialize_entry("success", &true)?;
                map.serialize_entry("edits", edits)?;
                map.serialize_entry("reasoning", reasoning)?;
                map.serialize_entry("remote_refs", remote_refs)?;
                map.end()
            }
            ExecutionResult::Failed { error, raw } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("success", &false)?;
                map.serialize_entry("error", error)?;
                map.serialize_entry("raw", raw)?;
                map.end()
            }
        }
    }
}

/// Scaffold size for a newly created project
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    #[default]
    Simple,
    Complex,
}

impl std::str::FromStr for Complexity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "simple" => Ok(Complexity::Simple),
            "complex" => Ok(Complexity::Complex),
            _ => Err(format!("Invalid complexity: {}. Use simple or complex.", s)),
        }
    }
}

/// What a free-text chat message asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Approve,
    Deploy,
    Modify,
    General,
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Intent::Approve => write!(f, "approve"),
            Intent::Deploy => write!(f, "deploy"),
            Intent::Modify => write!(f, "modify"),
            Intent::General => write!(f, "general"),
        }
    }
}

/// Author of a persisted chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A chat session bound to one project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub project_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One persisted chat turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMessage {
    pub id: String,
    pub session_id: String,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub intent: Option<Intent>,
    pub created_at: DateTime<Utc>,
}
