//! Contract tests for the HTTP API, driven through the router without a
//! socket.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use ragnet::answer;
use ragnet::config::Config;
use ragnet::server::{build_router, AppState};
use ragnet::{db, migrate};

const TOKEN: &str = "Bearer test-token";

async fn setup() -> (TempDir, Router) {
    setup_with(|_| {}).await
}

async fn setup_with(tweak: impl FnOnce(&mut Config)) -> (TempDir, Router) {
    let tmp = TempDir::new().unwrap();
    let mut config = Config::minimal();
    config.db.path = tmp.path().join("data").join("ragnet.sqlite");
    config.query.delay_ms = 0;
    tweak(&mut config);

    let pool = db::connect(&config).await.unwrap();
    migrate::apply(&pool).await.unwrap();
    (tmp, build_router(AppState::new(config, pool)))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    auth: Option<&str>,
    body: Option<&str>,
) -> (StatusCode, String) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = auth {
        builder = builder.header(header::AUTHORIZATION, token);
    }
    let body = match body {
        Some(b) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(b.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    auth: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let body = body.map(|v| v.to_string());
    let (status, text) = send(app, method, uri, auth, body.as_deref()).await;
    let value = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or_else(|_| panic!("not JSON: {}", text))
    };
    (status, value)
}

// ============ Health ============

#[tokio::test]
async fn test_health() {
    let (_tmp, app) = setup().await;
    let (status, body) = send_json(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

// ============ Auth ============

#[tokio::test]
async fn test_login_returns_mock_token() {
    let (_tmp, app) = setup().await;
    let (status, body) = send_json(
        &app,
        "POST",
        "/api/login",
        None,
        Some(json!({"username": "ada", "password": "pw"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["token"], "mock-jwt-token");
    assert_eq!(body["user"]["username"], "ada");
}

#[tokio::test]
async fn test_login_unparsable_body_is_401() {
    let (_tmp, app) = setup().await;
    let (status, text) = send(&app, "POST", "/api/login", None, Some("{oops")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["message"], "Invalid credentials");
}

#[tokio::test]
async fn test_login_uses_configured_token() {
    let (_tmp, app) = setup_with(|c| c.auth.mock_token = "custom".into()).await;
    let (_, body) = send_json(&app, "POST", "/api/login", None, Some(json!({}))).await;
    assert_eq!(body["token"], "custom");
}

#[tokio::test]
async fn test_register_missing_fields_is_400() {
    let (_tmp, app) = setup().await;
    let (status, body) = send_json(
        &app,
        "POST",
        "/api/register",
        None,
        Some(json!({"email": "ada@example.com", "password": "pw"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing required fields");
}

#[tokio::test]
async fn test_register_success() {
    let (_tmp, app) = setup().await;
    let (status, body) = send_json(
        &app,
        "POST",
        "/api/register",
        None,
        Some(json!({"username": "ada", "email": "ada@example.com", "password": "pw"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token"], "mock-jwt-token");
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert!(body["userId"].is_string());
}

#[tokio::test]
async fn test_register_unparsable_body_is_500() {
    let (_tmp, app) = setup().await;
    let (status, text) = send(&app, "POST", "/api/register", None, Some("nope")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(text.contains("Registration failed"));
}

// ============ Bearer guard ============

#[tokio::test]
async fn test_protected_routes_require_token() {
    let (_tmp, app) = setup().await;
    let cases = [
        ("GET", "/api/get-user-repos"),
        ("GET", "/api/repositories"),
        ("POST", "/api/repositories"),
        ("GET", "/api/repositories/1"),
        ("POST", "/api/ingest"),
        ("GET", "/api/organizations"),
        ("GET", "/api/sources/some-org"),
        ("GET", "/api/conversations/some-org"),
        ("GET", "/api/dashboard/some-org"),
    ];
    for (method, uri) in cases {
        let (status, body) = send_json(&app, method, uri, None, Some(json!({}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);
        assert_eq!(body["message"], "Authentication required");
    }
}

#[tokio::test]
async fn test_empty_bearer_is_rejected() {
    let (_tmp, app) = setup().await;
    let (status, _) = send_json(&app, "GET", "/api/get-user-repos", Some("Bearer "), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_public_routes_need_no_token() {
    let (_tmp, app) = setup().await;
    let (status, _) = send_json(
        &app,
        "POST",
        "/api/query",
        None,
        Some(json!({"repoId": "1", "query": "api?"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", "/api/integrate-discord?repoId=1", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

// ============ Repositories ============

#[tokio::test]
async fn test_list_user_repos() {
    let (_tmp, app) = setup().await;
    let (status, body) = send_json(&app, "GET", "/api/get-user-repos", Some(TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    let repos = body.as_array().unwrap();
    assert_eq!(repos.len(), 5);
    assert_eq!(repos[0]["name"], "API Documentation");
    assert_eq!(repos[0]["dateAdded"], "Jun 15, 2023");
}

#[tokio::test]
async fn test_create_repo_missing_url_is_400() {
    let (_tmp, app) = setup().await;
    let (status, body) =
        send_json(&app, "POST", "/api/repositories", Some(TOKEN), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Repository URL is required");
}

#[tokio::test]
async fn test_create_repo_derives_name() {
    let (_tmp, app) = setup().await;
    let (status, body) = send_json(
        &app,
        "POST",
        "/api/repositories",
        Some(TOKEN),
        Some(json!({"url": "https://github.com/acme/handbook/"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "handbook");
    assert_eq!(body["url"], "https://github.com/acme/handbook/");
    let id = body["id"].as_str().unwrap();
    assert!(id.parse::<i64>().is_ok());
}

#[tokio::test]
async fn test_create_repo_unparsable_body_is_500() {
    let (_tmp, app) = setup().await;
    let (status, text) = send(&app, "POST", "/api/repositories", Some(TOKEN), Some("[")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(text.contains("Failed to create repository"));
}

#[tokio::test]
async fn test_get_repo() {
    let (_tmp, app) = setup().await;
    let (status, body) = send_json(&app, "GET", "/api/repositories/2", Some(TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"id": "2", "name": "User Authentication Flow"}));
}

#[tokio::test]
async fn test_get_unknown_repo_is_404() {
    let (_tmp, app) = setup().await;
    let (status, body) = send_json(&app, "GET", "/api/repositories/99", Some(TOKEN), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Repository not found");
}

// ============ Ingest ============

#[tokio::test]
async fn test_ingest_requires_id_and_url() {
    let (_tmp, app) = setup().await;
    let (status, body) = send_json(
        &app,
        "POST",
        "/api/ingest",
        Some(TOKEN),
        Some(json!({"repoId": "1"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Repository ID and URL are required");
}

#[tokio::test]
async fn test_ingest_success() {
    let (_tmp, app) = setup().await;
    let (status, body) = send_json(
        &app,
        "POST",
        "/api/ingest",
        Some(TOKEN),
        Some(json!({"repoId": "1", "url": "https://github.com/user/api-docs"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Repository data ingested successfully");
}

// ============ Query ============

#[tokio::test]
async fn test_query_api_keyword() {
    let (_tmp, app) = setup().await;
    let (status, body) = send_json(
        &app,
        "POST",
        "/api/query",
        None,
        Some(json!({"repoId": "1", "query": "How does the API work?"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], answer::Topic::Api.answer());
    assert!(body.get("conversationId").is_none());
}

#[tokio::test]
async fn test_query_fallback() {
    let (_tmp, app) = setup().await;
    let (_, body) = send_json(
        &app,
        "POST",
        "/api/query",
        None,
        Some(json!({"repoId": "1", "query": "tell me a joke"})),
    )
    .await;
    assert_eq!(body["answer"], answer::Topic::Unknown.answer());
}

#[tokio::test]
async fn test_query_missing_fields_is_400() {
    let (_tmp, app) = setup().await;
    for payload in [json!({"repoId": "1"}), json!({"query": "api"})] {
        let (status, body) =
            send_json(&app, "POST", "/api/query", None, Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Repository ID and query are required");
    }
}

#[tokio::test]
async fn test_query_unparsable_body_is_500() {
    let (_tmp, app) = setup().await;
    let (status, text) = send(&app, "POST", "/api/query", None, Some("query=api")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(text.contains("Failed to process query"));
}

// ============ Discord ============

#[tokio::test]
async fn test_integrate_discord_requires_repo_id() {
    let (_tmp, app) = setup().await;
    let (status, body) = send_json(&app, "GET", "/api/integrate-discord", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Repository ID is required");
}

#[tokio::test]
async fn test_integrate_discord_returns_html() {
    let (_tmp, app) = setup().await;
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/integrate-discord?repoId=3")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/html"));
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let page = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(page.contains("(ID: 3)"));
}

#[tokio::test]
async fn test_discord_auth_not_configured() {
    let (_tmp, app) = setup().await;
    let (status, body) = send_json(
        &app,
        "POST",
        "/api/sources/discord/auth",
        Some(TOKEN),
        Some(json!({"orgId": "org-1"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Discord integration is not configured");
}

#[tokio::test]
async fn test_discord_auth_url() {
    let (_tmp, app) = setup_with(|c| c.discord.client_id = Some("1234".into())).await;
    let (status, body) = send_json(
        &app,
        "POST",
        "/api/sources/discord/auth",
        Some(TOKEN),
        Some(json!({"orgId": "org-1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let url = body["authUrl"].as_str().unwrap();
    assert!(url.starts_with("https://discord.com/api/oauth2/authorize?"));
    assert!(url.contains("client_id=1234"));
    assert!(url.contains("state=org-1"));
}

// ============ Organizations, sources, conversations ============

async fn create_org(app: &Router, name: &str) -> String {
    let (status, body) = send_json(
        app,
        "POST",
        "/api/organizations",
        Some(TOKEN),
        Some(json!({"name": name, "description": "docs team"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_organizations_roundtrip() {
    let (_tmp, app) = setup().await;
    let (_, empty) = send_json(&app, "GET", "/api/organizations", Some(TOKEN), None).await;
    assert_eq!(empty, json!([]));

    let first = create_org(&app, "Acme").await;
    let second = create_org(&app, "Globex").await;

    let (status, body) = send_json(&app, "GET", "/api/organizations", Some(TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    let orgs = body.as_array().unwrap();
    assert_eq!(orgs.len(), 2);
    assert_eq!(orgs[0]["id"], first.as_str());
    assert_eq!(orgs[1]["id"], second.as_str());
    assert_eq!(orgs[0]["description"], "docs team");
    assert!(orgs[0]["createdAt"].is_string());
}

#[tokio::test]
async fn test_create_org_requires_name() {
    let (_tmp, app) = setup().await;
    let (status, body) = send_json(
        &app,
        "POST",
        "/api/organizations",
        Some(TOKEN),
        Some(json!({"description": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Organization name is required");
}

#[tokio::test]
async fn test_sources_lifecycle() {
    let (_tmp, app) = setup().await;
    let org = create_org(&app, "Acme").await;

    let (status, source) = send_json(
        &app,
        "POST",
        "/api/sources",
        Some(TOKEN),
        Some(json!({
            "name": "Handbook",
            "type": "github",
            "orgId": org,
            "config": {"github": {"url": "https://github.com/acme/handbook"}}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(source["type"], "github");
    assert!(source["last_sync_at"].is_null());
    let source_id = source["id"].as_str().unwrap().to_string();

    // Ingesting by source id stamps the sync time
    let (status, _) = send_json(
        &app,
        "POST",
        "/api/ingest",
        Some(TOKEN),
        Some(json!({"repoId": source_id, "url": "https://github.com/acme/handbook"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send_json(
        &app,
        "GET",
        &format!("/api/sources/{}", org),
        Some(TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let sources = body.as_array().unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0]["id"], source_id.as_str());
    assert_eq!(
        sources[0]["config"]["github"]["url"],
        "https://github.com/acme/handbook"
    );
    assert!(sources[0]["last_sync_at"].is_string());
}

#[tokio::test]
async fn test_source_rejections() {
    let (_tmp, app) = setup().await;
    let org = create_org(&app, "Acme").await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/sources",
        Some(TOKEN),
        Some(json!({"name": "Handbook", "type": "github", "orgId": org, "config": {}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Repository URL is required");

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/sources",
        Some(TOKEN),
        Some(json!({"name": "Chat", "type": "slack", "orgId": org})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Unsupported source type");

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/sources",
        Some(TOKEN),
        Some(json!({
            "name": "Handbook",
            "orgId": "no-such-org",
            "config": {"github": {"url": "https://github.com/acme/handbook"}}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Organization not found");
}

#[tokio::test]
async fn test_org_queries_are_recorded() {
    let (_tmp, app) = setup().await;
    let org = create_org(&app, "Acme").await;

    let (status, first) = send_json(
        &app,
        "POST",
        "/api/query",
        None,
        Some(json!({"orgId": org, "query": "How do I install it?", "anonymousId": "visitor-1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["success"], true);
    assert_eq!(first["response"], first["answer"]);
    let conversation_id = first["conversationId"].as_str().unwrap().to_string();

    // Follow-up lands in the same conversation
    let (_, second) = send_json(
        &app,
        "POST",
        "/api/query",
        None,
        Some(json!({"orgId": org, "query": "and the database?", "conversationId": conversation_id})),
    )
    .await;
    assert_eq!(second["conversationId"], conversation_id.as_str());

    // A different visitor starts a new one
    let (_, third) = send_json(
        &app,
        "POST",
        "/api/query",
        None,
        Some(json!({"orgId": org, "query": "login?", "anonymousId": "visitor-2"})),
    )
    .await;
    assert_ne!(third["conversationId"], conversation_id.as_str());

    let (status, body) = send_json(
        &app,
        "GET",
        &format!("/api/conversations/{}", org),
        Some(TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let conversations = body.as_array().unwrap();
    assert_eq!(conversations.len(), 2);
    let long = conversations
        .iter()
        .find(|c| c["id"] == conversation_id.as_str())
        .unwrap();
    let messages = long["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 4);
    assert_eq!(long["anonymous_id"], "visitor-1");
    assert!(long["user_id"].is_null());

    let (status, body) = send_json(
        &app,
        "GET",
        &format!("/api/dashboard/{}", org),
        Some(TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["analytics"]["totalQueries"], "3");
    assert_eq!(body["analytics"]["totalUsers"], "2");
    assert_eq!(body["analytics"]["averageConversationLength"], 3.0);
}

#[tokio::test]
async fn test_dashboard_empty_org() {
    let (_tmp, app) = setup().await;
    let (status, body) =
        send_json(&app, "GET", "/api/dashboard/nobody", Some(TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["analytics"]["totalQueries"], "0");
    assert_eq!(body["analytics"]["totalUsers"], "0");
    assert_eq!(body["analytics"]["averageConversationLength"], 0.0);
}

#[tokio::test]
async fn test_organizations_trailing_slash() {
    let (_tmp, app) = setup().await;
    let org = create_org(&app, "Acme").await;

    let (status, body) = send_json(&app, "GET", "/api/organizations/", Some(TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["id"], org.as_str());

    let (status, _) = send_json(&app, "GET", "/api/organizations/", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_query_accepts_numeric_repo_id() {
    let (_tmp, app) = setup().await;
    let (status, body) = send_json(
        &app,
        "POST",
        "/api/query",
        None,
        Some(json!({"repoId": 1, "query": "api?"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], answer::Topic::Api.answer());

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/query",
        None,
        Some(json!({"repoId": 0, "query": "api?"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_query_non_string_query_is_500() {
    let (_tmp, app) = setup().await;
    let (status, body) = send_json(
        &app,
        "POST",
        "/api/query",
        None,
        Some(json!({"repoId": "1", "query": 42})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Failed to process query");
}

#[tokio::test]
async fn test_ingest_accepts_numeric_repo_id() {
    let (_tmp, app) = setup().await;
    let (status, body) = send_json(
        &app,
        "POST",
        "/api/ingest",
        Some(TOKEN),
        Some(json!({"repoId": 3, "url": "https://github.com/user/db-schema"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_register_keeps_whitespace_values() {
    let (_tmp, app) = setup().await;
    let (status, body) = send_json(
        &app,
        "POST",
        "/api/register",
        None,
        Some(json!({"username": " ", "email": "ada@example.com", "password": "pw"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], " ");
}

#[tokio::test]
async fn test_source_null_config_is_400() {
    let (_tmp, app) = setup().await;
    let org = create_org(&app, "Acme").await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/sources",
        Some(TOKEN),
        Some(json!({"name": "Handbook", "type": "github", "orgId": org, "config": null})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Repository URL is required");
}
