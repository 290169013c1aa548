//! End-to-end tests driving the router with stub collaborators

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use refact_agent::StaticFetcher;
use refact_core::{Role, ServerConfig};
use refact_github::{RecordedCall, RecordingRemoteSync, RemoteSync};
use refact_llm::ScriptedGateway;
use refact_server::{router, AppState, InMemorySessionStore, RemoteFactory, SessionStore};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const HERO_PLAN: &str = r#"{"understanding": [{"tool": "tree"}, {"tool": "locate", "target": "component"}]}"#;

const HERO_EDITS: &str = r#"{
    "edits": [
        {"kind": "create", "path": "src/components/Hero.js", "content": "export default function Hero() {}"},
        {"kind": "update", "path": "src/index.js", "content": "import Hero from './components/Hero';"}
    ],
    "reasoning": "Add Hero and render it"
}"#;

struct Harness {
    app: Router,
    gateway: ScriptedGateway,
    remote: RecordingRemoteSync,
    sessions: Arc<InMemorySessionStore>,
}

fn harness(gateway: ScriptedGateway, remote: RecordingRemoteSync) -> Harness {
    let sessions = Arc::new(InMemorySessionStore::new());
    let factory_remote = remote.clone();
    let factory: RemoteFactory =
        Arc::new(move |_token: &str| Ok(Arc::new(factory_remote.clone()) as Arc<dyn RemoteSync>));

    let state = AppState::new(
        ServerConfig::default(),
        Arc::new(gateway.clone()),
        Arc::new(StaticFetcher::new()),
        sessions.clone() as Arc<dyn SessionStore>,
        factory,
    );

    Harness {
        app: router(state),
        gateway,
        remote,
        sessions,
    }
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn committed_paths(remote: &RecordingRemoteSync) -> Vec<String> {
    remote
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            RecordedCall::Commit { path, .. } => Some(path),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_health_is_healthy_without_upstream() {
    let config = ServerConfig {
        anthropic_url: "http://127.0.0.1:1".to_string(),
        ..ServerConfig::default()
    };
    let app = router(AppState::from_config(config).unwrap());

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "refact");
    assert!(body["features"].as_array().unwrap().contains(&json!("agent")));
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_caps_lists_agent_tools() {
    let h = harness(ScriptedGateway::new(), RecordingRemoteSync::new());

    let (status, body) = send(&h.app, "GET", "/v1/caps", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["provider"], "anthropic");
    assert_eq!(body["default_model"], "sonnet");
    assert_eq!(body["max_tokens"], 4000);
    assert_eq!(body["agent_tools"].as_object().unwrap().len(), 9);
    assert!(body["agent_tools"]["locate"].is_string());
}

#[tokio::test]
async fn test_chat_completions_proxy() {
    let h = harness(
        ScriptedGateway::new().reply("Hello there"),
        RecordingRemoteSync::new(),
    );

    let (status, body) = send(
        &h.app,
        "POST",
        "/v1/chat/completions",
        Some(json!({
            "messages": [
                {"role": "system", "content": "Be brief"},
                {"role": "user", "content": "Hi"}
            ]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["choices"][0]["message"]["content"], "Hello there");
    assert_eq!(h.gateway.requests()[0].messages.len(), 2);
}

#[tokio::test]
async fn test_chat_completions_rejects_empty_messages() {
    let h = harness(ScriptedGateway::new(), RecordingRemoteSync::new());

    let (status, body) = send(
        &h.app,
        "POST",
        "/v1/chat/completions",
        Some(json!({ "messages": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("messages"));
}

#[tokio::test]
async fn test_chat_completions_upstream_failure_is_500() {
    let h = harness(
        ScriptedGateway::new().fail(401, "invalid x-api-key"),
        RecordingRemoteSync::new(),
    );

    let (status, body) = send(
        &h.app,
        "POST",
        "/v1/chat/completions",
        Some(json!({ "messages": [{"role": "user", "content": "Hi"}] })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("invalid x-api-key"));
}

#[tokio::test]
async fn test_create_project_mirrors_scaffold() {
    let h = harness(ScriptedGateway::new(), RecordingRemoteSync::new());

    let (status, body) = send(
        &h.app,
        "POST",
        "/v1/projects/create",
        Some(json!({
            "project_name": "site",
            "github_token": "ghp_test",
            "complexity": "complex",
            "user_id": "u1"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["project_id"], "octocat--site");
    assert_eq!(body["repo_url"], "https://github.com/octocat/site");
    assert_eq!(body["files"].as_array().unwrap().len(), 5);
    assert_eq!(body["commits"].as_array().unwrap().len(), 5);
    assert!(body["session_id"].is_string());

    assert!(matches!(
        &h.remote.calls()[0],
        RecordedCall::CreateRepository { name } if name == "site"
    ));
    let files: Vec<String> = body["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f.as_str().unwrap().to_string())
        .collect();
    assert_eq!(committed_paths(&h.remote), files);

    let (status, tree) = send(&h.app, "GET", "/v1/projects/octocat--site/tree", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(tree["src"]["components"]["App.js"].is_null());
    assert!(tree["src"]["styles"].is_object());
}

#[tokio::test]
async fn test_create_project_requires_token() {
    let h = harness(ScriptedGateway::new(), RecordingRemoteSync::new());

    let (status, _) = send(
        &h.app,
        "POST",
        "/v1/projects/create",
        Some(json!({ "project_name": "site", "github_token": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(h.remote.calls().is_empty());
}

#[tokio::test]
async fn test_agent_hydrates_and_commits_each_edit() {
    let h = harness(
        ScriptedGateway::new().reply(HERO_PLAN).reply(HERO_EDITS),
        RecordingRemoteSync::new().with_file("src/index.js", "console.log('hi');"),
    );

    let (status, body) = send(
        &h.app,
        "POST",
        "/v1/projects/octocat--site/agent",
        Some(json!({ "task": "Create a Hero component", "github_token": "ghp_test" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["reasoning"], "Add Hero and render it");
    assert_eq!(
        committed_paths(&h.remote),
        vec!["src/components/Hero.js", "src/index.js"]
    );
    assert_eq!(body["remote_refs"].as_array().unwrap().len(), 2);

    // The hydrated file was visible to the gathering phase
    assert!(h.gateway.prompts()[1].contains("src/index.js"));

    let (_, tree) = send(&h.app, "GET", "/v1/projects/octocat--site/tree", None).await;
    assert!(tree["src"]["components"]["Hero.js"].is_null());
}

#[tokio::test]
async fn test_agent_invalid_plan_returns_raw() {
    let h = harness(
        ScriptedGateway::new().reply("Sorry, no plan today"),
        RecordingRemoteSync::new(),
    );

    let (status, body) = send(
        &h.app,
        "POST",
        "/v1/projects/octocat--site/agent",
        Some(json!({ "task": "Add a footer", "github_token": "ghp_test" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["raw"], "Sorry, no plan today");
    assert!(!body["error"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_bad_project_id_is_400() {
    let h = harness(ScriptedGateway::new(), RecordingRemoteSync::new());

    let (status, body) = send(
        &h.app,
        "POST",
        "/v1/projects/no-separator/agent",
        Some(json!({ "task": "x", "github_token": "t" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_unknown_project_tree_is_404() {
    let h = harness(ScriptedGateway::new(), RecordingRemoteSync::new());

    let (status, body) = send(&h.app, "GET", "/v1/projects/acme--nothing/tree", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("acme--nothing"));
}

#[tokio::test]
async fn test_chat_routes_by_intent_and_persists_turns() {
    let h = harness(
        ScriptedGateway::new().reply("It is a small Node project."),
        RecordingRemoteSync::new(),
    );

    let (status, first) = send(
        &h.app,
        "POST",
        "/v1/projects/octocat--site/chat",
        Some(json!({ "message": "What is this project?", "github_token": "t" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["intent"], "general");
    assert_eq!(first["reply"], "It is a small Node project.");
    assert!(first.get("result").is_none());
    let session_id = first["session_id"].as_str().unwrap().to_string();

    let (status, second) = send(
        &h.app,
        "POST",
        "/v1/projects/octocat--site/chat",
        Some(json!({
            "message": "Let's deploy",
            "github_token": "t",
            "session_id": session_id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["intent"], "deploy");
    assert_eq!(second["session_id"], session_id.as_str());
    assert!(second["reply"]
        .as_str()
        .unwrap()
        .contains("https://github.com/octocat/site"));

    // Deploy answers without the LLM
    assert_eq!(h.gateway.requests().len(), 1);

    let messages = h.sessions.list_messages(&session_id).await.unwrap();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[2].content, "Let's deploy");

    // New sessions are attributed to the token's GitHub user
    let session = h.sessions.get_session(&session_id).await.unwrap();
    assert_eq!(session.user_id.as_deref(), Some("octocat"));
}

#[tokio::test]
async fn test_chat_failure_still_answers_the_turn() {
    let h = harness(
        ScriptedGateway::new().fail(529, "overloaded"),
        RecordingRemoteSync::new(),
    );
    let session = h
        .sessions
        .create_session("octocat--site", None)
        .await
        .unwrap();

    let (status, body) = send(
        &h.app,
        "POST",
        "/v1/projects/octocat--site/chat",
        Some(json!({ "message": "What is this?", "github_token": "t", "session_id": session.id.clone() })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("overloaded"));

    let messages = h.sessions.list_messages(&session.id).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[1].role, Role::Assistant);
    assert!(messages[1].content.contains("overloaded"));
}

#[tokio::test]
async fn test_chat_modify_runs_agent() {
    let h = harness(
        ScriptedGateway::new().reply(HERO_PLAN).reply(HERO_EDITS),
        RecordingRemoteSync::new(),
    );

    let (status, body) = send(
        &h.app,
        "POST",
        "/v1/projects/octocat--site/chat",
        Some(json!({ "message": "Please add a Hero component", "github_token": "t" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["intent"], "modify");
    assert_eq!(body["result"]["success"], true);
    assert!(body["reply"].as_str().unwrap().contains("Add Hero and render it"));
    assert_eq!(committed_paths(&h.remote).len(), 2);
}

#[tokio::test]
async fn test_chat_approve_commits_workspace() {
    let h = harness(
        ScriptedGateway::new(),
        RecordingRemoteSync::new()
            .with_file("README.md", "# site")
            .with_file("src/index.js", "x"),
    );

    let (status, body) = send(
        &h.app,
        "POST",
        "/v1/projects/octocat--site/chat",
        Some(json!({ "message": "LGTM", "github_token": "t" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["intent"], "approve");
    assert_eq!(body["result"]["remote_refs"].as_array().unwrap().len(), 2);
    assert_eq!(committed_paths(&h.remote), vec!["README.md", "src/index.js"]);
}

#[tokio::test]
async fn test_hydration_skips_unsafe_remote_paths() {
    let h = harness(
        ScriptedGateway::new(),
        RecordingRemoteSync::new()
            .with_file("README.md", "# site")
            .with_file("c:notes", "scratch"),
    );

    let (status, body) = send(
        &h.app,
        "POST",
        "/v1/projects/octocat--site/chat",
        Some(json!({ "message": "ship it", "github_token": "t" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["success"], true);
    assert_eq!(committed_paths(&h.remote), vec!["README.md"]);
}

#[tokio::test]
async fn test_chat_unknown_session_is_404() {
    let h = harness(ScriptedGateway::new(), RecordingRemoteSync::new());

    let (status, _) = send(
        &h.app,
        "POST",
        "/v1/projects/octocat--site/chat",
        Some(json!({ "message": "hi", "github_token": "t", "session_id": "missing" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
