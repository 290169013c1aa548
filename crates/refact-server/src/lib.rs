//! # refact-server
//!
//! HTTP surface of the refact service.
//!
//! - `GET /health`, `GET /v1/caps`
//! - `POST /v1/chat/completions`: OpenAI-compatible proxy to the LLM gateway
//! - `POST /v1/projects/create`: new repository seeded from a scaffold
//! - `POST /v1/projects/:id/agent`: run the agent workflow
//! - `POST /v1/projects/:id/chat`: intent-routed chat with persisted sessions
//! - `GET /v1/projects/:id/tree`: current workspace tree
//!
//! All collaborators hang off [`AppState`], which is built once at startup
//! and handed to the router.

mod error;
mod intent;
mod projects;
mod scaffold;
mod server;
mod sessions;
mod state;

pub use error::{ApiError, ApiResult};
pub use intent::{IntentClassifier, KeywordClassifier};
pub use projects::{
    AgentRequest, ChatTurnRequest, ChatTurnResponse, CreateProjectRequest, CreateProjectResponse,
};
pub use scaffold::scaffold;
pub use server::{router, serve, SERVICE_NAME};
pub use sessions::{InMemorySessionStore, PostgrestSessionStore, SessionStore};
pub use state::{AppState, RemoteFactory, SharedState};
