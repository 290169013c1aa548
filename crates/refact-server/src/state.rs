//! Shared application state

use crate::intent::{IntentClassifier, KeywordClassifier};
use crate::sessions::{InMemorySessionStore, PostgrestSessionStore, SessionStore};
use refact_agent::{HttpFetcher, ToolSet, WebFetcher};
use refact_core::{ProjectId, RefactError, Result, ServerConfig};
use refact_github::{GitHubClient, RemoteSync};
use refact_llm::{AnthropicGateway, LlmGateway, Model};
use refact_workspace::{validate_path, Workspace, WorkspaceStore};
use std::sync::Arc;
use tracing::{info, warn};

/// Builds a remote sync client for a caller-supplied token
pub type RemoteFactory = Arc<dyn Fn(&str) -> Result<Arc<dyn RemoteSync>> + Send + Sync>;

/// Everything a handler needs; created once at startup
pub struct AppState {
    pub config: ServerConfig,
    pub tools: ToolSet,
    pub sessions: Arc<dyn SessionStore>,
    pub classifier: Arc<dyn IntentClassifier>,
    remote: RemoteFactory,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(
        config: ServerConfig,
        gateway: Arc<dyn LlmGateway>,
        fetcher: Arc<dyn WebFetcher>,
        sessions: Arc<dyn SessionStore>,
        remote: RemoteFactory,
    ) -> Self {
        Self {
            config,
            tools: ToolSet::new(WorkspaceStore::new(), gateway, fetcher),
            sessions,
            classifier: Arc::new(KeywordClassifier),
            remote,
        }
    }

    /// Wire the production collaborators described by `config`
    pub fn from_config(config: ServerConfig) -> Result<Self> {
        let model = Model::resolve(&config.model).ok_or_else(|| {
            RefactError::Config(format!("Unknown model: {}", config.model))
        })?;
        if config.api_key.is_none() && std::env::var("ANTHROPIC_API_KEY").is_err() {
            warn!("No Anthropic API key configured; LLM calls will fail");
        }
        let gateway = AnthropicGateway::new(config.anthropic_url.clone(), config.api_key.clone())
            .with_model(model)
            .with_max_tokens(config.max_tokens);

        let sessions: Arc<dyn SessionStore> = match &config.database {
            Some(database) => {
                info!("Persisting chat sessions to {}", database.url);
                Arc::new(PostgrestSessionStore::new(database))
            }
            None => {
                info!("Keeping chat sessions in memory");
                Arc::new(InMemorySessionStore::new())
            }
        };

        let github_url = config.github_url.clone();
        let remote: RemoteFactory = Arc::new(move |token: &str| {
            let client = GitHubClient::new(&github_url, token)?;
            Ok(Arc::new(client) as Arc<dyn RemoteSync>)
        });

        Ok(Self::new(
            config,
            Arc::new(gateway),
            Arc::new(HttpFetcher::new()),
            sessions,
            remote,
        ))
    }

    pub fn workspaces(&self) -> &WorkspaceStore {
        self.tools.store()
    }

    pub fn gateway(&self) -> &dyn LlmGateway {
        self.tools.gateway()
    }

    /// Remote sync for a request's token
    pub fn remote(&self, token: &str) -> Result<Arc<dyn RemoteSync>> {
        if token.trim().is_empty() {
            return Err(RefactError::InvalidRequest(
                "github_token is required".to_string(),
            ));
        }
        (self.remote)(token)
    }

    /// Load the project's workspace from the remote on first use
    pub async fn ensure_workspace(
        &self,
        project: &ProjectId,
        remote: &dyn RemoteSync,
    ) -> Result<()> {
        let project_id = project.to_string();
        if self.workspaces().contains(&project_id).await {
            return Ok(());
        }

        info!("Hydrating workspace {} from remote", project_id);
        let files = remote
            .snapshot(&project.owner, &project.repo)
            .await?
            .into_iter()
            .filter(|(path, _)| match validate_path(path) {
                Ok(_) => true,
                Err(e) => {
                    warn!("Skipping remote file in {}: {}", project_id, e);
                    false
                }
            });
        let workspace = Workspace::from_files(files)?;
        self.workspaces().put(&project_id, workspace).await;
        Ok(())
    }
}
