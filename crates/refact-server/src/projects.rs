//! Project endpoints: creation, agent runs, chat and tree

use crate::error::{ApiError, ApiResult};
use crate::scaffold::scaffold;
use crate::state::{AppState, SharedState};
use axum::extract::{Path, State};
use axum::response::Json;
use refact_agent::{mirror_edits, run_workflow};
use refact_core::{Complexity, Edit, ExecutionResult, Intent, ProjectId, RefactError, Result, Role};
use refact_github::RemoteSync;
use refact_llm::{ChatMessage, ChatRequest};
use refact_workspace::Tree;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub project_name: String,
    pub github_token: String,
    #[serde(default)]
    pub complexity: Complexity,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateProjectResponse {
    pub project_id: String,
    pub repo: String,
    pub repo_url: String,
    pub files: Vec<String>,
    pub commits: Vec<String>,
    /// Chat session opened for `user_id`, when one was given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AgentRequest {
    pub task: String,
    pub github_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatTurnRequest {
    pub message: String,
    pub github_token: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatTurnResponse {
    pub session_id: String,
    pub intent: Intent,
    pub reply: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ExecutionResult>,
}

fn require(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RefactError::InvalidRequest(format!("{} is required", field)));
    }
    Ok(())
}

/// GitHub repository names: ASCII letters, digits, `-`, `_` and `.`
fn validate_repo_name(name: &str) -> Result<()> {
    require(name, "project_name")?;
    let valid = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !valid {
        return Err(RefactError::InvalidRequest(format!(
            "Invalid project name '{}': use letters, digits, '-', '_' or '.'",
            name
        )));
    }
    Ok(())
}

/// POST /v1/projects/create
pub async fn create_project(
    State(app): State<SharedState>,
    Json(request): Json<CreateProjectRequest>,
) -> ApiResult<Json<CreateProjectResponse>> {
    validate_repo_name(&request.project_name)?;
    let remote = app.remote(&request.github_token)?;

    let repo = remote
        .create_repository(&request.project_name, false)
        .await?;
    let project = ProjectId::new(&repo.owner, &repo.name);
    info!("Created repository {} ({:?})", project, request.complexity);

    let workspace = scaffold(&request.project_name, request.complexity)?;
    let edits: Vec<Edit> = workspace
        .files()
        .map(|(path, content)| Edit::Create {
            path: path.to_string(),
            content: content.to_string(),
        })
        .collect();
    let files: Vec<String> = workspace.paths().map(str::to_string).collect();
    app.workspaces().put(&project.to_string(), workspace).await;

    let (commits, _) = mirror_edits(remote.as_ref(), &project, &edits).await;

    let session_id = match request.user_id.as_deref() {
        Some(user_id) => Some(
            app.sessions
                .create_session(&project.to_string(), Some(user_id))
                .await?
                .id,
        ),
        None => None,
    };

    Ok(Json(CreateProjectResponse {
        project_id: project.to_string(),
        repo: repo.name,
        repo_url: repo.html_url,
        files,
        commits,
        session_id,
    }))
}

/// POST /v1/projects/:id/agent
pub async fn run_agent(
    State(app): State<SharedState>,
    Path(id): Path<String>,
    Json(request): Json<AgentRequest>,
) -> ApiResult<Json<ExecutionResult>> {
    let project = ProjectId::parse(&id)?;
    require(&request.task, "task")?;
    let remote = app.remote(&request.github_token)?;

    let result = modify(&app, &project, remote.as_ref(), &request.task).await?;
    Ok(Json(result))
}

/// GET /v1/projects/:id/tree
pub async fn tree(
    State(app): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Tree>> {
    let project = ProjectId::parse(&id)?;
    let tree = app.workspaces().list_tree(&project.to_string()).await?;
    Ok(Json(tree))
}

/// POST /v1/projects/:id/chat
///
/// Classifies the message, routes it, and persists both turns.
pub async fn chat(
    State(app): State<SharedState>,
    Path(id): Path<String>,
    Json(request): Json<ChatTurnRequest>,
) -> ApiResult<Json<ChatTurnResponse>> {
    let project = ProjectId::parse(&id)?;
    require(&request.message, "message")?;
    let project_id = project.to_string();

    let session = match request.session_id.as_deref() {
        Some(session_id) => app.sessions.get_session(session_id).await?,
        None => {
            let user = session_user(&app, &request.github_token).await;
            app.sessions
                .create_session(&project_id, user.as_deref())
                .await?
        }
    };
    if session.project_id != project_id {
        return Err(ApiError(RefactError::InvalidRequest(format!(
            "Session {} belongs to another project",
            session.id
        ))));
    }

    let intent = app.classifier.classify(&request.message);
    info!("Chat turn on {} classified as {}", project_id, intent);
    app.sessions
        .append_message(&session.id, Role::User, &request.message, Some(intent))
        .await?;

    // Every user turn gets an answer, even when routing fails
    let (reply, result) = match respond(&app, &project, &session.id, intent, &request).await {
        Ok(answer) => answer,
        Err(e) => {
            app.sessions
                .append_message(&session.id, Role::Assistant, &format!("Error: {}", e), None)
                .await?;
            return Err(e.into());
        }
    };

    app.sessions
        .append_message(&session.id, Role::Assistant, &reply, None)
        .await?;

    Ok(Json(ChatTurnResponse {
        session_id: session.id,
        intent,
        reply,
        result,
    }))
}

/// Route one classified chat turn
async fn respond(
    app: &AppState,
    project: &ProjectId,
    session_id: &str,
    intent: Intent,
    request: &ChatTurnRequest,
) -> Result<(String, Option<ExecutionResult>)> {
    match intent {
        Intent::Approve => {
            let remote = app.remote(&request.github_token)?;
            let result = approve(app, project, remote.as_ref()).await?;
            Ok((summarize(&result), Some(result)))
        }
        Intent::Deploy => Ok((deploy_instructions(project), None)),
        Intent::Modify => {
            let remote = app.remote(&request.github_token)?;
            let result = modify(app, project, remote.as_ref(), &request.message).await?;
            Ok((summarize(&result), Some(result)))
        }
        Intent::General => Ok((converse(app, project, session_id).await?, None)),
    }
}

/// Login behind the caller's token, used to attribute new sessions
async fn session_user(app: &AppState, token: &str) -> Option<String> {
    let remote = app.remote(token).ok()?;
    match remote.authenticated_user().await {
        Ok(login) => Some(login),
        Err(e) => {
            warn!("Could not resolve the GitHub user for a new session: {}", e);
            None
        }
    }
}

async fn modify(
    app: &AppState,
    project: &ProjectId,
    remote: &dyn RemoteSync,
    task: &str,
) -> Result<ExecutionResult> {
    app.ensure_workspace(project, remote).await?;
    run_workflow(&app.tools, remote, project, task).await
}

/// Commit every workspace file as it stands
async fn approve(
    app: &AppState,
    project: &ProjectId,
    remote: &dyn RemoteSync,
) -> Result<ExecutionResult> {
    app.ensure_workspace(project, remote).await?;
    let workspace = app.workspaces().get(&project.to_string()).await?;
    let edits: Vec<Edit> = workspace
        .files()
        .map(|(path, content)| Edit::Update {
            path: path.to_string(),
            content: content.to_string(),
        })
        .collect();

    let (remote_refs, failed) = mirror_edits(remote, project, &edits).await;
    Ok(ExecutionResult::Applied {
        reasoning: format!(
            "Committed {} of {} files to {}/{}",
            edits.len() - failed,
            edits.len(),
            project.owner,
            project.repo
        ),
        edits,
        remote_refs,
    })
}

/// Plain conversation over the session history
async fn converse(app: &AppState, project: &ProjectId, session_id: &str) -> Result<String> {
    let messages = app
        .sessions
        .list_messages(session_id)
        .await?
        .into_iter()
        .map(|m| match m.role {
            Role::User => ChatMessage::user(m.content),
            Role::Assistant => ChatMessage::assistant(m.content),
        })
        .collect();

    let request = ChatRequest {
        messages,
        system: Some(format!(
            "You are refact, a coding assistant for the project {}/{}. \
             Answer questions about it concisely. To change files the user \
             describes the change (e.g. \"add a footer\").",
            project.owner, project.repo
        )),
        ..ChatRequest::default()
    };

    let completion = app.gateway().chat(request).await?;
    completion
        .message()
        .map(|m| m.content.clone())
        .ok_or_else(|| RefactError::Upstream {
            status: 200,
            body: "No choices in response".to_string(),
        })
}

fn summarize(result: &ExecutionResult) -> String {
    match result {
        ExecutionResult::Applied {
            edits, reasoning, ..
        } if reasoning.is_empty() => format!("Applied {} edits.", edits.len()),
        ExecutionResult::Applied {
            edits, reasoning, ..
        } => format!("{} ({} edits)", reasoning, edits.len()),
        ExecutionResult::Failed { error, .. } => {
            format!("I couldn't apply that change: {}", error)
        }
    }
}

fn deploy_instructions(project: &ProjectId) -> String {
    format!(
        "To deploy {owner}/{repo}:\n\
         1. Import https://github.com/{owner}/{repo} into your hosting provider \
         (Vercel, Netlify or GitHub Pages).\n\
         2. Use `npm start` as the start command.\n\
         3. Changes made here are committed to the default branch, so each one \
         triggers a redeploy.",
        owner = project.owner,
        repo = project.repo
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_repo_name() {
        assert!(validate_repo_name("my-site_2.0").is_ok());
        assert!(validate_repo_name("").is_err());
        assert!(validate_repo_name("my site").is_err());
        assert!(validate_repo_name("../etc").is_err());
    }

    #[test]
    fn test_summarize() {
        let applied = ExecutionResult::Applied {
            edits: vec![Edit::Delete {
                path: "a.js".to_string(),
            }],
            reasoning: String::new(),
            remote_refs: vec![],
        };
        assert_eq!(summarize(&applied), "Applied 1 edits.");

        let failed = ExecutionResult::failed("Parse error: bad", "raw");
        assert!(summarize(&failed).contains("Parse error: bad"));
    }

    #[test]
    fn test_deploy_instructions_name_repo() {
        let text = deploy_instructions(&ProjectId::new("acme", "site"));
        assert!(text.contains("https://github.com/acme/site"));
    }
}
