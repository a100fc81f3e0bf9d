//! HTTP server.
//!
//! Serves the JSON API the Ragnet web client calls. Most routes are mocks:
//! they validate the request shape and answer with fixed or derived data.
//!
//! # Endpoints
//!
//! | Method | Path | Auth | Description |
//! |--------|------|------|-------------|
//! | `GET`  | `/health` | - | Health check (returns version) |
//! | `POST` | `/api/login` | - | Mock login |
//! | `POST` | `/api/register` | - | Mock registration |
//! | `POST` | `/api/query` | - | Canned answer for a query |
//! | `GET`  | `/api/integrate-discord` | - | Discord placeholder page (HTML) |
//! | `GET`  | `/api/get-user-repos` | bearer | Demo repository list |
//! | `GET`  | `/api/repositories` | bearer | Same list |
//! | `POST` | `/api/repositories` | bearer | Derive a repository from a URL |
//! | `GET`  | `/api/repositories/{id}` | bearer | Repository summary |
//! | `POST` | `/api/ingest` | bearer | Mock ingestion |
//! | `GET`  | `/api/organizations` (also `/api/organizations/`) | bearer | List organizations |
//! | `POST` | `/api/organizations` | bearer | Create an organization |
//! | `POST` | `/api/sources` | bearer | Connect a source |
//! | `POST` | `/api/sources/discord/auth` | bearer | Discord authorize URL |
//! | `GET`  | `/api/sources/{org_id}` | bearer | Sources of an organization |
//! | `GET`  | `/api/conversations/{org_id}` | bearer | Conversation log |
//! | `GET`  | `/api/dashboard/{org_id}` | bearer | Dashboard analytics |
//!
//! Errors use the body described in [`crate::error`].
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the browser client can
//! run from a different origin.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    middleware,
    response::Html,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{self, LoginRequest, RegisterRequest};
use crate::config::Config;
use crate::conversations;
use crate::db;
use crate::discord;
use crate::error::{
    bad_request, internal, internal_from, non_blank, non_empty, not_found, parse_body,
    unauthorized,
    AppError,
};
use crate::ingest::{self, IngestRequest};
use crate::migrate;
use crate::models::{Conversation, Organization, Repository, RepositorySummary, Source};
use crate::orgs::{self, NewSource, SourceRejection};
use crate::query::{self, QueryRequest};
use crate::repos;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pool: SqlitePool,
}

impl AppState {
    pub fn new(config: Config, pool: SqlitePool) -> Self {
        Self {
            config: Arc::new(config),
            pool,
        }
    }
}

/// Starts the HTTP server.
///
/// Opens the database (creating the schema if needed), binds to
/// `[server].bind`, and serves until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    migrate::apply(&pool).await?;

    let bind_addr = config.server.bind.clone();
    let app = build_router(AppState::new(config.clone(), pool));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Ragnet server listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the full router. Exposed so tests can drive it without a socket.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let public = Router::new()
        .route("/health", get(handle_health))
        .route("/api/login", post(handle_login))
        .route("/api/register", post(handle_register))
        .route("/api/query", post(handle_query))
        .route("/api/integrate-discord", get(handle_integrate_discord));

    let protected = Router::new()
        .route("/api/get-user-repos", get(handle_list_repos))
        .route(
            "/api/repositories",
            get(handle_list_repos).post(handle_create_repo),
        )
        .route("/api/repositories/{id}", get(handle_get_repo))
        .route("/api/ingest", post(handle_ingest))
        .route(
            "/api/organizations",
            get(handle_list_orgs).post(handle_create_org),
        )
        // the dashboard client fetches the list with a trailing slash
        .route(
            "/api/organizations/",
            get(handle_list_orgs).post(handle_create_org),
        )
        .route("/api/sources", post(handle_create_source))
        .route("/api/sources/discord/auth", post(handle_discord_auth))
        .route("/api/sources/{org_id}", get(handle_list_sources))
        .route("/api/conversations/{org_id}", get(handle_list_conversations))
        .route("/api/dashboard/{org_id}", get(handle_dashboard))
        .route_layer(middleware::from_fn(auth::require_bearer));

    public
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Auth ============

async fn handle_login(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<auth::AuthResponse>, AppError> {
    let req: LoginRequest = parse_body(&body, || unauthorized("Invalid credentials"))?;
    Ok(Json(auth::login(req, &state.config.auth.mock_token)))
}

async fn handle_register(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<auth::AuthResponse>, AppError> {
    let req: RegisterRequest = parse_body(&body, || internal("Registration failed"))?;
    auth::register(req, &state.config.auth.mock_token)
        .map(Json)
        .ok_or_else(|| bad_request("Missing required fields"))
}

// ============ Repositories ============

async fn handle_list_repos() -> Json<Vec<Repository>> {
    Json(repos::catalog())
}

#[derive(Deserialize)]
struct CreateRepoRequest {
    #[serde(default)]
    url: Option<String>,
}

async fn handle_create_repo(body: Bytes) -> Result<Json<Repository>, AppError> {
    let req: CreateRepoRequest =
        parse_body(&body, || internal("Failed to create repository"))?;
    let url = req
        .url
        .filter(|u| !u.is_empty())
        .ok_or_else(|| bad_request("Repository URL is required"))?;
    Ok(Json(repos::new_repository(&url, chrono::Utc::now())))
}

async fn handle_get_repo(Path(id): Path<String>) -> Result<Json<RepositorySummary>, AppError> {
    repos::find_summary(&id)
        .map(Json)
        .ok_or_else(|| not_found("Repository not found"))
}

// ============ POST /api/ingest ============

async fn handle_ingest(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ingest::IngestResponse>, AppError> {
    const FAILED: &str = "Failed to ingest repository data";
    let req: IngestRequest = parse_body(&body, || internal(FAILED))?;
    let job = req
        .into_job()
        .ok_or_else(|| bad_request("Repository ID and URL are required"))?;
    let resp = ingest::run_ingest(&state.pool, &job)
        .await
        .map_err(|e| internal_from(e, FAILED))?;
    Ok(Json(resp))
}

// ============ POST /api/query ============

async fn handle_query(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<query::QueryResponse>, AppError> {
    const FAILED: &str = "Failed to process query";
    let req: QueryRequest = parse_body(&body, || internal(FAILED))?;
    let valid = req
        .validate()
        .ok_or_else(|| bad_request("Repository ID and query are required"))?;
    let resp = query::run_query(&state.pool, state.config.query.delay(), &valid)
        .await
        .map_err(|e| internal_from(e, FAILED))?;
    Ok(Json(resp))
}

// ============ Discord ============

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntegrateDiscordParams {
    #[serde(default)]
    repo_id: Option<String>,
}

async fn handle_integrate_discord(
    Query(params): Query<IntegrateDiscordParams>,
) -> Result<Html<String>, AppError> {
    let repo_id =
        non_empty(&params.repo_id).ok_or_else(|| bad_request("Repository ID is required"))?;
    Ok(Html(discord::placeholder_page(repo_id)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiscordAuthRequest {
    #[serde(default)]
    org_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DiscordAuthResponse {
    auth_url: String,
}

async fn handle_discord_auth(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<DiscordAuthResponse>, AppError> {
    const FAILED: &str = "Failed to initiate Discord authentication";
    let req: DiscordAuthRequest = parse_body(&body, || internal(FAILED))?;
    let org_id = non_blank(&req.org_id).ok_or_else(|| bad_request("Organization ID is required"))?;
    let auth_url = discord::authorize_url(&state.config.discord, org_id)
        .map_err(|e| internal_from(e, FAILED))?
        .ok_or_else(|| bad_request("Discord integration is not configured"))?;
    Ok(Json(DiscordAuthResponse { auth_url }))
}

// ============ Organizations & sources ============

async fn handle_list_orgs(
    State(state): State<AppState>,
) -> Result<Json<Vec<Organization>>, AppError> {
    orgs::list_organizations(&state.pool)
        .await
        .map(Json)
        .map_err(|e| internal_from(e, "Failed to fetch organizations"))
}

#[derive(Deserialize)]
struct CreateOrgRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

async fn handle_create_org(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Organization>, AppError> {
    const FAILED: &str = "Failed to create organization";
    let req: CreateOrgRequest = parse_body(&body, || internal(FAILED))?;
    let name = non_blank(&req.name).ok_or_else(|| bad_request("Organization name is required"))?;
    let description = req.description.as_deref().unwrap_or_default();
    orgs::create_organization(&state.pool, name, description)
        .await
        .map(Json)
        .map_err(|e| internal_from(e, FAILED))
}

async fn handle_create_source(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Source>, AppError> {
    const FAILED: &str = "Failed to add source";
    let req: NewSource = parse_body(&body, || internal(FAILED))?;
    match orgs::create_source(&state.pool, req).await {
        Ok(Ok(source)) => Ok(Json(source)),
        Ok(Err(rejection @ SourceRejection::UnknownOrganization)) => {
            Err(not_found(rejection.message()))
        }
        Ok(Err(rejection)) => Err(bad_request(rejection.message())),
        Err(e) => Err(internal_from(e, FAILED)),
    }
}

async fn handle_list_sources(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
) -> Result<Json<Vec<Source>>, AppError> {
    orgs::list_sources(&state.pool, &org_id)
        .await
        .map(Json)
        .map_err(|e| internal_from(e, "Failed to fetch sources"))
}

// ============ Conversations & dashboard ============

async fn handle_list_conversations(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
) -> Result<Json<Vec<Conversation>>, AppError> {
    conversations::list_conversations(&state.pool, &org_id)
        .await
        .map(Json)
        .map_err(|e| internal_from(e, "Failed to fetch conversations"))
}

#[derive(Serialize)]
struct DashboardResponse {
    analytics: crate::models::DashboardAnalytics,
}

async fn handle_dashboard(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
) -> Result<Json<DashboardResponse>, AppError> {
    conversations::dashboard_analytics(&state.pool, &org_id)
        .await
        .map(|analytics| Json(DashboardResponse { analytics }))
        .map_err(|e| internal_from(e, "Failed to fetch analytics"))
}
