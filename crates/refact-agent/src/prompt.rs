//! Prompt builders for the agent's LLM calls
//!
//! - Planning: task in, structured plan out
//! - Execution: task, plan and gathered context in, edit list out
//! - Think: free-form reasoning used by the `think` tool

use crate::tools::Tool;
use crate::workflow::GatheredContext;
use refact_core::Plan;

/// Build the planning prompt for a task
pub fn build_planning_prompt(task: &str) -> String {
    let mut prompt = String::new();

    prompt.push_str("# REFACT AGENT - Planning\n\n");

    prompt.push_str("## TASK\n\n");
    prompt.push_str(task);
    prompt.push_str("\n\n");

    prompt.push_str("## AVAILABLE TOOLS\n\n");
    prompt.push_str("Request information about the project with these tools:\n\n");
    for tool in Tool::ALL {
        prompt.push_str(&format!("- `{}`: {}\n", tool.name(), tool.description()));
    }
    prompt.push('\n');

    prompt.push_str("## OUTPUT\n\n");
    prompt.push_str("Respond with ONLY a JSON object of this shape:\n\n");
    prompt.push_str("```json\n");
    prompt.push_str(
        r#"{
  "understanding": [{"tool": "<tool name>", "target": "<query, path or url>"}],
  "planning": {"analysis": "...", "dependencies": ["..."], "risks": ["..."]},
  "execution": {"actions": ["..."]}
}"#,
    );
    prompt.push_str("\n```\n");

    prompt
}

/// Build the execution prompt from the task, its plan and the gathered context
pub fn build_execution_prompt(task: &str, plan: &Plan, context: &GatheredContext) -> String {
    let mut prompt = String::new();

    prompt.push_str("# REFACT AGENT - Execution\n\n");

    prompt.push_str("## TASK\n\n");
    prompt.push_str(task);
    prompt.push_str("\n\n");

    prompt.push_str("## PLAN\n\n");
    prompt.push_str("```json\n");
    prompt.push_str(&to_pretty_json(plan));
    prompt.push_str("\n```\n\n");

    prompt.push_str("## CONTEXT\n\n");
    if context.is_empty() {
        prompt.push_str("No context was gathered.\n\n");
    } else {
        prompt.push_str("```json\n");
        prompt.push_str(&to_pretty_json(context));
        prompt.push_str("\n```\n\n");
    }

    prompt.push_str("## OUTPUT\n\n");
    prompt.push_str("Respond with ONLY a JSON object listing the file edits to make:\n\n");
    prompt.push_str("```json\n");
    prompt.push_str(
        r#"{
  "edits": [
    {"kind": "create", "path": "src/components/Example.js", "content": "<full file content>"},
    {"kind": "update", "path": "src/index.js", "content": "<full file content>"},
    {"kind": "delete", "path": "src/old.js"}
  ],
  "reasoning": "<why these edits complete the task>"
}"#,
    );
    prompt.push_str("\n```\n\n");

    prompt.push_str("IMPORTANT:\n");
    prompt.push_str("- Use relative paths from the project root\n");
    prompt.push_str("- Include COMPLETE file content for create and update (not patches)\n");
    prompt.push_str("- Edits are applied in the order listed\n");

    prompt
}

/// Build the prompt for the `think` tool
pub fn build_think_prompt(topic: &str) -> String {
    format!(
        "Think step by step about the following and summarize your conclusions briefly:\n\n{}",
        topic
    )
}

fn to_pretty_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("<unserializable: {}>", e))
}
