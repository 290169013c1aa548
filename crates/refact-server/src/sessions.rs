//! Chat session persistence
//!
//! Sessions and their messages live either in process memory or in a hosted
//! PostgREST database (e.g. Supabase) with `sessions` and `messages` tables.

use async_trait::async_trait;
use chrono::Utc;
use refact_core::{DatabaseConfig, Intent, RefactError, Result, Role, Session, SessionMessage};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Storage for chat sessions (allows mocking in tests)
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, project_id: &str, user_id: Option<&str>) -> Result<Session>;

    /// `NotFound` for unknown ids
    async fn get_session(&self, id: &str) -> Result<Session>;

    async fn append_message(
        &self,
        session_id: &str,
        role: Role,
        content: &str,
        intent: Option<Intent>,
    ) -> Result<SessionMessage>;

    /// Messages of a session, oldest first
    async fn list_messages(&self, session_id: &str) -> Result<Vec<SessionMessage>>;
}

fn new_session(project_id: &str, user_id: Option<&str>) -> Session {
    Session {
        id: Uuid::new_v4().to_string(),
        project_id: project_id.to_string(),
        user_id: user_id.map(str::to_string),
        created_at: Utc::now(),
    }
}

fn new_message(
    session_id: &str,
    role: Role,
    content: &str,
    intent: Option<Intent>,
) -> SessionMessage {
    SessionMessage {
        id: Uuid::new_v4().to_string(),
        session_id: session_id.to_string(),
        role,
        content: content.to_string(),
        intent,
        created_at: Utc::now(),
    }
}

fn session_not_found(id: &str) -> RefactError {
    RefactError::NotFound(format!("Session {}", id))
}

#[derive(Debug, Default)]
struct Sessions {
    sessions: HashMap<String, Session>,
    messages: HashMap<String, Vec<SessionMessage>>,
}

/// Process-lifetime session store
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    inner: RwLock<Sessions>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create_session(&self, project_id: &str, user_id: Option<&str>) -> Result<Session> {
        let session = new_session(project_id, user_id);
        let mut inner = self.inner.write().await;
        inner.messages.insert(session.id.clone(), Vec::new());
        inner.sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn get_session(&self, id: &str) -> Result<Session> {
        self.inner
            .read()
            .await
            .sessions
            .get(id)
            .cloned()
            .ok_or_else(|| session_not_found(id))
    }

    async fn append_message(
        &self,
        session_id: &str,
        role: Role,
        content: &str,
        intent: Option<Intent>,
    ) -> Result<SessionMessage> {
        let message = new_message(session_id, role, content, intent);
        let mut inner = self.inner.write().await;
        inner
            .messages
            .get_mut(session_id)
            .ok_or_else(|| session_not_found(session_id))?
            .push(message.clone());
        Ok(message)
    }

    async fn list_messages(&self, session_id: &str) -> Result<Vec<SessionMessage>> {
        self.inner
            .read()
            .await
            .messages
            .get(session_id)
            .cloned()
            .ok_or_else(|| session_not_found(session_id))
    }
}

/// Session store backed by a PostgREST endpoint
#[derive(Debug, Clone)]
pub struct PostgrestSessionStore {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl PostgrestSessionStore {
    pub fn new(config: &DatabaseConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: reqwest::Method, table: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, self.table_url(table))
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let response = request.send().await.map_err(RefactError::transport)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RefactError::Upstream {
                status: status.as_u16(),
                body,
            });
        }
        response.json().await.map_err(RefactError::transport)
    }

    /// Insert one row and return it as stored
    async fn insert<T: Serialize + DeserializeOwned>(&self, table: &str, row: &T) -> Result<T> {
        let rows: Vec<T> = self
            .send(
                self.request(reqwest::Method::POST, table)
                    .header("Prefer", "return=representation")
                    .json(row),
            )
            .await?;
        rows.into_iter().next().ok_or_else(|| RefactError::Upstream {
            status: 200,
            body: format!("Insert into {} returned no rows", table),
        })
    }
}

#[async_trait]
impl SessionStore for PostgrestSessionStore {
    #[instrument(skip(self))]
    async fn create_session(&self, project_id: &str, user_id: Option<&str>) -> Result<Session> {
        self.insert("sessions", &new_session(project_id, user_id))
            .await
    }

    #[instrument(skip(self))]
    async fn get_session(&self, id: &str) -> Result<Session> {
        let filter = format!("eq.{}", id);
        let rows: Vec<Session> = self
            .send(
                self.request(reqwest::Method::GET, "sessions")
                    .query(&[("id", filter.as_str()), ("select", "*")]),
            )
            .await?;
        rows.into_iter().next().ok_or_else(|| session_not_found(id))
    }

    #[instrument(skip(self, content))]
    async fn append_message(
        &self,
        session_id: &str,
        role: Role,
        content: &str,
        intent: Option<Intent>,
    ) -> Result<SessionMessage> {
        debug!("Persisting {} chars", content.len());
        self.insert("messages", &new_message(session_id, role, content, intent))
            .await
    }

    #[instrument(skip(self))]
    async fn list_messages(&self, session_id: &str) -> Result<Vec<SessionMessage>> {
        let filter = format!("eq.{}", session_id);
        self.send(
            self.request(reqwest::Method::GET, "messages").query(&[
                ("session_id", filter.as_str()),
                ("select", "*"),
                ("order", "created_at.asc"),
            ]),
        )
        .await
    }
}
