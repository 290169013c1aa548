//! Plan → gather → execute → apply
//!
//! Two LLM calls per invocation. The first asks for a plan naming the tools
//! to run; their outputs become the context for the second call, which
//! returns the edits. Edits are applied to the workspace store in order and
//! then mirrored to the remote one commit per edit.
//!
//! Nothing here locks a project across invocations. Two concurrent runs on
//! the same project interleave their edits.

use crate::parse::{parse_edit_set, parse_plan};
use crate::prompt::{build_execution_prompt, build_planning_prompt};
use crate::state_machine::{transition, Action, Event, State};
use crate::tools::{ToolOutput, ToolSet};
use refact_core::{Edit, ExecutionResult, Plan, ProjectId, RefactError, Result};
use refact_github::RemoteSync;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// One tool result recorded during gathering
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextEntry {
    pub target: String,
    pub output: ToolOutput,
}

/// Tool outputs keyed by tool name, in request order per tool
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct GatheredContext(BTreeMap<String, Vec<ContextEntry>>);

impl GatheredContext {
    pub fn record(&mut self, tool: &str, target: &str, output: ToolOutput) {
        self.0.entry(tool.to_string()).or_default().push(ContextEntry {
            target: target.to_string(),
            output,
        });
    }

    pub fn get(&self, tool: &str) -> Option<&[ContextEntry]> {
        self.0.get(tool).map(Vec::as_slice)
    }

    /// Total number of recorded entries
    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Run the agent on `task` against the project's workspace
///
/// Returns `Err` only when the project has no workspace. LLM failures,
/// unusable replies and rejected edits all come back as
/// `ExecutionResult::Failed`; mirror failures are logged and recorded as
/// `<path>@failed` refs.
pub async fn run_workflow(
    tools: &ToolSet,
    remote: &dyn RemoteSync,
    project: &ProjectId,
    task: &str,
) -> Result<ExecutionResult> {
    let project_id = project.to_string();
    if !tools.store().contains(&project_id).await {
        return Err(RefactError::NotFound(format!("Workspace {}", project_id)));
    }

    let state = advance(
        State::Idle,
        Event::Start {
            task: task.to_string(),
        },
    );

    // Planning
    let raw_plan = match tools.gateway().complete(&build_planning_prompt(task)).await {
        Ok(reply) => reply.content,
        Err(e) => return Ok(reject(state, e, String::new())),
    };
    debug!("Planning reply: {} chars", raw_plan.len());
    let plan = match parse_plan(&raw_plan) {
        Ok(plan) => plan,
        Err(e) => return Ok(reject(state, e, raw_plan)),
    };
    let state = advance(
        state,
        Event::PlanReady {
            requests: plan.understanding.len(),
        },
    );

    // Gathering
    let context = gather(tools, &project_id, &plan).await;
    let state = advance(
        state,
        Event::ContextReady {
            entries: context.len(),
        },
    );

    // Executing
    let prompt = build_execution_prompt(task, &plan, &context);
    debug!("Execution prompt: {} chars", prompt.len());
    let raw_edits = match tools.gateway().complete(&prompt).await {
        Ok(reply) => reply.content,
        Err(e) => return Ok(reject(state, e, String::new())),
    };
    let edit_set = match parse_edit_set(&raw_edits) {
        Ok(edit_set) => edit_set,
        Err(e) => return Ok(reject(state, e, raw_edits)),
    };
    let state = advance(
        state,
        Event::EditsReady {
            edits: edit_set.edits.len(),
        },
    );

    // Applying
    if let Err(e) = tools
        .store()
        .apply_edits(&project_id, &edit_set.edits)
        .await
    {
        return Ok(reject(state, e, raw_edits));
    }
    let (remote_refs, failed) = mirror_edits(remote, project, &edit_set.edits).await;
    let state = advance(
        state,
        Event::Synced {
            committed: edit_set.edits.len() - failed,
            failed,
        },
    );

    Ok(match state {
        State::Applied { .. } => ExecutionResult::Applied {
            edits: edit_set.edits,
            reasoning: edit_set.reasoning,
            remote_refs,
        },
        other => finish(other),
    })
}

/// Dispatch every plan request; unknown tools are skipped
async fn gather(tools: &ToolSet, project_id: &str, plan: &Plan) -> GatheredContext {
    let mut context = GatheredContext::default();
    for request in &plan.understanding {
        if let Some(output) = tools.dispatch(project_id, request).await {
            context.record(&request.tool.to_lowercase(), &request.target, output);
        }
    }
    context
}

/// Mirror edits in order, one commit each
///
/// Returns one ref per edit (`<path>@<sha>`, or `<path>@failed` for a
/// mirror that failed and was skipped) and the number of failures.
pub async fn mirror_edits(
    remote: &dyn RemoteSync,
    project: &ProjectId,
    edits: &[Edit],
) -> (Vec<String>, usize) {
    let mut refs = Vec::with_capacity(edits.len());
    let mut failed = 0;

    for edit in edits {
        let outcome = match edit {
            Edit::Create { path, content } | Edit::Update { path, content } => {
                remote
                    .commit(&project.owner, &project.repo, path, content)
                    .await
            }
            Edit::Delete { path } => remote.delete(&project.owner, &project.repo, path).await,
        };

        match outcome {
            Ok(commit) => refs.push(commit.to_string()),
            Err(e) => {
                warn!("Mirroring {} to {} failed: {}", edit.path(), project, e);
                refs.push(format!("{}@failed", edit.path()));
                failed += 1;
            }
        }
    }

    (refs, failed)
}

fn advance(state: State, event: Event) -> State {
    let (next, actions) = transition(state, event);
    for action in actions {
        match action {
            Action::Log { message } => info!("{}", message),
            Action::Warn { message } => warn!("{}", message),
        }
    }
    next
}

fn reject(state: State, error: RefactError, raw: String) -> ExecutionResult {
    finish(advance(
        state,
        Event::Rejected {
            error: error.to_string(),
            raw,
        },
    ))
}

fn finish(state: State) -> ExecutionResult {
    match state {
        State::Failed { error, raw } => ExecutionResult::failed(error, raw),
        other => ExecutionResult::failed(
            format!("Workflow stopped while {}", other.name()),
            String::new(),
        ),
    }
}
