//! The agent's tool registry
//!
//! Each tool reads or mutates the workspace store, asks the LLM, or fetches
//! a web page, and returns JSON the workflow can drop straight into the
//! execution prompt. Tool errors are returned as `{"error": ...}` values
//! so the gathering phase never aborts on a single bad request.

use crate::prompt::build_think_prompt;
use crate::web::{fetch_page_text, WebFetcher};
use refact_core::{Edit, RefactError, Result, ToolRequest};
use refact_llm::LlmGateway;
use refact_workspace::WorkspaceStore;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// JSON result of one tool invocation
pub type ToolOutput = Value;

/// Named operations available during context gathering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Search,
    Tree,
    Cat,
    Locate,
    Patch,
    Think,
    Web,
    Definition,
    References,
}

impl Tool {
    pub const ALL: [Tool; 9] = [
        Tool::Search,
        Tool::Tree,
        Tool::Cat,
        Tool::Locate,
        Tool::Patch,
        Tool::Think,
        Tool::Web,
        Tool::Definition,
        Tool::References,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Tool::Search => "search",
            Tool::Tree => "tree",
            Tool::Cat => "cat",
            Tool::Locate => "locate",
            Tool::Patch => "patch",
            Tool::Think => "think",
            Tool::Web => "web",
            Tool::Definition => "definition",
            Tool::References => "references",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Tool::Search => "Case-insensitive text search across all files",
            Tool::Tree => "Directory tree of the project",
            Tool::Cat => "Contents of files (comma-separated paths)",
            Tool::Locate => "Files most relevant to a task description",
            Tool::Patch => "Apply a JSON list of create/update/delete edits",
            Tool::Think => "Reason step by step about a question",
            Tool::Web => "Plain text of a web page",
            Tool::Definition => "Lines declaring a symbol",
            Tool::References => "Lines using a symbol outside its declaration",
        }
    }

    /// Look up a tool by name; unknown names yield `None`
    pub fn from_name(name: &str) -> Option<Tool> {
        let name = name.trim().to_lowercase();
        Tool::ALL.into_iter().find(|t| t.name() == name)
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Patch payloads accepted by the `patch` tool
#[derive(Deserialize)]
#[serde(untagged)]
enum PatchPayload {
    List(Vec<Edit>),
    Wrapped { edits: Vec<Edit> },
    Single(Edit),
}

/// Tool collaborators, injected explicitly
#[derive(Clone)]
pub struct ToolSet {
    store: WorkspaceStore,
    gateway: Arc<dyn LlmGateway>,
    fetcher: Arc<dyn WebFetcher>,
}

impl ToolSet {
    pub fn new(
        store: WorkspaceStore,
        gateway: Arc<dyn LlmGateway>,
        fetcher: Arc<dyn WebFetcher>,
    ) -> Self {
        Self {
            store,
            gateway,
            fetcher,
        }
    }

    pub fn store(&self) -> &WorkspaceStore {
        &self.store
    }

    pub fn gateway(&self) -> &dyn LlmGateway {
        self.gateway.as_ref()
    }

    /// Tool name to one-line description
    pub fn descriptions() -> BTreeMap<&'static str, &'static str> {
        Tool::ALL
            .into_iter()
            .map(|t| (t.name(), t.description()))
            .collect()
    }

    /// Resolve one plan request; unknown tools yield `None`
    pub async fn dispatch(&self, project_id: &str, request: &ToolRequest) -> Option<ToolOutput> {
        let Some(tool) = Tool::from_name(&request.tool) else {
            debug!("Skipping unknown tool '{}'", request.tool);
            return None;
        };
        Some(self.run(tool, project_id, &request.target).await)
    }

    /// Run a tool, folding errors into the output
    pub async fn run(&self, tool: Tool, project_id: &str, target: &str) -> ToolOutput {
        debug!("Running tool {} on '{}'", tool, target);
        match self.try_run(tool, project_id, target).await {
            Ok(output) => output,
            Err(e) => json!({ "error": e.to_string() }),
        }
    }

    async fn try_run(&self, tool: Tool, project_id: &str, target: &str) -> Result<ToolOutput> {
        let output = match tool {
            Tool::Search => json!(self.store.search(project_id, target).await?),
            Tool::Tree => json!(self.store.list_tree(project_id).await?),
            Tool::Cat => {
                let paths: Vec<&str> = target
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .collect();
                json!(self.store.read(project_id, &paths).await?)
            }
            Tool::Locate => json!(self.store.locate(project_id, target).await?),
            Tool::Patch => self.patch(project_id, target).await?,
            Tool::Think => json!(self.think(target).await?),
            Tool::Web => json!(fetch_page_text(self.fetcher.as_ref(), target.trim()).await),
            Tool::Definition => json!(self.store.definitions(project_id, target).await?),
            Tool::References => json!(self.store.references(project_id, target).await?),
        };
        Ok(output)
    }

    async fn patch(&self, project_id: &str, payload: &str) -> Result<ToolOutput> {
        let edits = match serde_json::from_str::<PatchPayload>(payload)
            .map_err(|e| RefactError::Parse(format!("Invalid patch: {}", e)))?
        {
            PatchPayload::List(edits) | PatchPayload::Wrapped { edits } => edits,
            PatchPayload::Single(edit) => vec![edit],
        };

        let changes = self.store.apply_edits(project_id, &edits).await?;
        let applied: Vec<Value> = edits
            .iter()
            .zip(changes)
            .map(|(edit, change)| {
                json!({ "path": edit.path(), "kind": edit.kind(), "change": change.as_str() })
            })
            .collect();
        Ok(json!({ "applied": applied }))
    }

    async fn think(&self, topic: &str) -> Result<String> {
        let reply = self.gateway.complete(&build_think_prompt(topic)).await?;
        Ok(reply.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::StaticFetcher;
    use refact_llm::ScriptedGateway;
    use refact_workspace::Workspace;

    async fn tool_set(gateway: ScriptedGateway) -> ToolSet {
        let store = WorkspaceStore::new();
        store
            .put(
                "p",
                Workspace::from_files([
                    ("src/components/Hero.js", "function Hero() {}\nexport default Hero;"),
                    ("src/index.js", "import Hero from './components/Hero';\nconsole.log(\"hello\");"),
                    ("src/index.css", "body { margin: 0; }"),
                ])
                .unwrap(),
            )
            .await;
        ToolSet::new(
            store,
            Arc::new(gateway),
            Arc::new(StaticFetcher::new().with_page("https://docs", "<p>Docs</p>")),
        )
    }

    fn request(tool: &str, target: &str) -> ToolRequest {
        ToolRequest {
            tool: tool.to_string(),
            target: target.to_string(),
        }
    }

    #[test]
    fn test_tool_from_name() {
        assert_eq!(Tool::from_name("search"), Some(Tool::Search));
        assert_eq!(Tool::from_name(" CAT "), Some(Tool::Cat));
        assert_eq!(Tool::from_name("grep"), None);
        for tool in Tool::ALL {
            assert_eq!(Tool::from_name(tool.name()), Some(tool));
        }
    }

    #[test]
    fn test_descriptions_cover_all_tools() {
        let descriptions = ToolSet::descriptions();
        assert_eq!(descriptions.len(), Tool::ALL.len());
        assert!(descriptions.contains_key("web"));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool() {
        let tools = tool_set(ScriptedGateway::new()).await;
        assert!(tools.dispatch("p", &request("grep", "x")).await.is_none());
    }

    #[tokio::test]
    async fn test_search_and_cat() {
        let tools = tool_set(ScriptedGateway::new()).await;

        let hits = tools.dispatch("p", &request("search", "HELLO")).await.unwrap();
        assert_eq!(hits[0]["file"], "src/index.js");

        let files = tools
            .dispatch("p", &request("cat", "src/index.css, missing.js"))
            .await
            .unwrap();
        assert_eq!(files, json!({"src/index.css": "body { margin: 0; }"}));
    }

    #[tokio::test]
    async fn test_tree_and_locate() {
        let tools = tool_set(ScriptedGateway::new()).await;

        let tree = tools.dispatch("p", &request("tree", "")).await.unwrap();
        assert!(tree["src"]["components"]["Hero.js"].is_null());
        assert!(tree["src"]["components"].is_object());

        let ranked = tools
            .dispatch("p", &request("locate", "add a component"))
            .await
            .unwrap();
        assert_eq!(ranked[0]["file"], "src/components/Hero.js");
    }

    #[tokio::test]
    async fn test_symbol_tools() {
        let tools = tool_set(ScriptedGateway::new()).await;

        let defs = tools
            .dispatch("p", &request("definition", "Hero"))
            .await
            .unwrap();
        assert_eq!(defs.as_array().unwrap().len(), 1);

        let refs = tools
            .dispatch("p", &request("references", "Hero"))
            .await
            .unwrap();
        assert_eq!(refs.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_patch_applies_edits() {
        let tools = tool_set(ScriptedGateway::new()).await;
        let payload = r#"[{"kind":"create","path":"src/Footer.js","content":"x"},{"kind":"delete","path":"src/index.css"}]"#;

        let output = tools.dispatch("p", &request("patch", payload)).await.unwrap();
        assert_eq!(output["applied"][0]["change"], "created");
        assert_eq!(output["applied"][1]["change"], "deleted");

        let ws = tools.store().get("p").await.unwrap();
        assert!(ws.contains("src/Footer.js"));
        assert!(!ws.contains("src/index.css"));
    }

    #[tokio::test]
    async fn test_patch_invalid_payload_is_error_value() {
        let tools = tool_set(ScriptedGateway::new()).await;
        let output = tools
            .dispatch("p", &request("patch", "not json"))
            .await
            .unwrap();
        assert!(output["error"].as_str().unwrap().contains("Invalid patch"));
    }

    #[tokio::test]
    async fn test_think_uses_gateway() {
        let gateway = ScriptedGateway::new().reply("use a flexbox");
        let tools = tool_set(gateway.clone()).await;

        let output = tools
            .dispatch("p", &request("think", "layout options"))
            .await
            .unwrap();
        assert_eq!(output, json!("use a flexbox"));
        assert!(gateway.prompts()[0].contains("layout options"));
    }

    #[tokio::test]
    async fn test_web_degrades_to_string() {
        let tools = tool_set(ScriptedGateway::new()).await;

        let ok = tools.dispatch("p", &request("web", "https://docs")).await.unwrap();
        assert_eq!(ok, json!("Docs"));

        let failed = tools
            .dispatch("p", &request("web", "https://nowhere"))
            .await
            .unwrap();
        assert!(failed.as_str().unwrap().starts_with("Failed to fetch"));
    }

    #[tokio::test]
    async fn test_missing_workspace_is_error_value() {
        let tools = tool_set(ScriptedGateway::new()).await;
        let output = tools.dispatch("other", &request("tree", "")).await.unwrap();
        assert!(output["error"].as_str().unwrap().contains("Not found"));
    }
}
