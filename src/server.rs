//! HTTP and MCP server wiring.
//!
//! [`AppState::build`] assembles every component once from configuration.
//! [`router`] exposes the REST surface; [`serve`] runs it on axum with the
//! scheduler mounted as an MCP service at `/mcp`, and [`serve_stdio`] runs the
//! scheduler alone over stdio.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rmcp::ServiceExt;
use serde::Deserialize;

use crate::cats::flaky::AttemptCounter;
use crate::cats::{CatFacts, CatFactsService};
use crate::config::PoochConfig;
use crate::db;
use crate::dogs::adoption::{AdoptionError, Adoptions};
use crate::dogs::listing::{self, DogListing};
use crate::dogs::repository::{DogRepository, SqliteDogRepository};
use crate::dogs::types::ApiVersion;
use crate::error::GateError;
use crate::gate::Gate;
use crate::scheduler::PickupScheduler;
use crate::tools::SchedulerTools;

/// Header carrying the requested listing version.
pub const API_VERSION_HEADER: &str = "API-Version";

/// Everything the HTTP handlers share.
pub struct AppState {
    pub cats: CatFactsService,
    pub repo: Arc<dyn DogRepository>,
    pub adoptions: Adoptions,
}

impl AppState {
    pub fn new(cats: CatFactsService, repo: Arc<dyn DogRepository>) -> Self {
        let adoptions = Adoptions::new(Arc::clone(&repo));
        Self {
            cats,
            repo,
            adoptions,
        }
    }

    /// Open the database, build the gate and the cat facts provider.
    pub fn build(config: &PoochConfig) -> Result<Arc<Self>> {
        let db_path = config.resolved_db_path();
        let conn = db::open_database(&db_path)?;
        tracing::info!(db = %db_path.display(), "database ready");
        let repo: Arc<dyn DogRepository> =
            Arc::new(SqliteDogRepository::new(Arc::new(Mutex::new(conn))));

        let gate = Arc::new(Gate::from_config(&config.gate)?);
        let cats = CatFactsService::from_config(&config.cat_facts, gate, AttemptCounter::new())?;
        tracing::info!(
            provider = %config.cat_facts.provider,
            max_concurrency = config.gate.max_concurrency,
            max_retries = config.gate.max_retries,
            "cat facts ready"
        );

        Ok(Arc::new(Self::new(cats, repo)))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Gate(#[from] GateError),
    #[error(transparent)]
    Adoption(#[from] AdoptionError),
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Gate(GateError::CapacityExceeded { .. }) | Self::Gate(GateError::Closed) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Gate(GateError::Upstream { source, .. }) if source.is_retryable() => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Gate(GateError::Upstream { .. }) => StatusCode::BAD_GATEWAY,
            Self::Gate(GateError::TimedOut(_)) => StatusCode::GATEWAY_TIMEOUT,
            Self::Adoption(AdoptionError::InvalidOwner) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Adoption(AdoptionError::Storage(_)) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        }
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

fn blocking_failed(e: tokio::task::JoinError) -> anyhow::Error {
    anyhow::anyhow!("db task failed: {e}")
}

/// Build the REST router over `state`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/cats", get(cat_facts))
        .route("/dogs", get(list_dogs))
        .route("/dogs/{dog_id}/adoptions", post(adopt))
        .route("/health", get(health))
        .with_state(state)
}

async fn cat_facts(State(state): State<Arc<AppState>>) -> Result<Json<CatFacts>, ApiError> {
    let facts = state.cats.facts().await?;
    Ok(Json(facts))
}

#[derive(Debug, Deserialize)]
struct VersionQuery {
    version: Option<String>,
}

/// Header first, then `?version=`, then the latest version.
fn resolve_version(headers: &HeaderMap, query: Option<&str>) -> Result<ApiVersion, ApiError> {
    let requested = match headers.get(API_VERSION_HEADER) {
        Some(value) => Some(
            value
                .to_str()
                .map_err(|_| ApiError::BadRequest("API-Version header is not valid text".into()))?,
        ),
        None => query,
    };
    match requested {
        Some(v) => v.parse().map_err(ApiError::BadRequest),
        None => Ok(ApiVersion::default()),
    }
}

async fn list_dogs(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<VersionQuery>,
) -> Result<Json<DogListing>, ApiError> {
    let version = resolve_version(&headers, query.version.as_deref())?;
    let repo = Arc::clone(&state.repo);
    let listing = tokio::task::spawn_blocking(move || listing::list_dogs(repo.as_ref(), version))
        .await
        .map_err(blocking_failed)??;
    Ok(Json(listing))
}

#[derive(Debug, Deserialize)]
struct AdoptionQuery {
    owner: String,
}

async fn adopt(
    State(state): State<Arc<AppState>>,
    Path(dog_id): Path<i64>,
    query: Result<Query<AdoptionQuery>, QueryRejection>,
) -> Result<StatusCode, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    tracing::info!(dog_id, owner = %query.owner, "adoption requested");
    tokio::task::spawn_blocking(move || state.adoptions.adopt(dog_id, &query.owner))
        .await
        .map_err(blocking_failed)??;
    Ok(StatusCode::NO_CONTENT)
}

async fn health(State(state): State<Arc<AppState>>) -> Result<Json<serde_json::Value>, ApiError> {
    let repo = Arc::clone(&state.repo);
    let dogs = tokio::task::spawn_blocking(move || repo.find_all().map(|d| d.len()))
        .await
        .map_err(blocking_failed)??;
    let gate = state.cats.gate();
    Ok(Json(serde_json::json!({
        "status": "ok",
        "in_flight": gate.in_flight(),
        "queued": gate.queued(),
        "dogs": dogs,
    })))
}

/// Start the HTTP server: REST routes plus the scheduler at `/mcp`.
pub async fn serve(config: PoochConfig) -> Result<()> {
    let bind_addr = config.bind_addr();
    tracing::info!(addr = %bind_addr, "starting Pooch Palace server");

    let state = AppState::build(&config)?;
    let scheduler = Arc::new(PickupScheduler::from_config(&config.scheduler));

    let mcp = rmcp::transport::streamable_http_server::StreamableHttpService::new(
        move || Ok(SchedulerTools::new(scheduler.clone())),
        rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default()
            .into(),
        Default::default(),
    );

    let app = router(Arc::clone(&state)).nest_service("/mcp", mcp);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "listening at http://{bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down HTTP server");
            state.cats.gate().close();
        })
        .await?;

    Ok(())
}

/// Run the pickup scheduler as an MCP server over stdio.
pub async fn serve_stdio(config: PoochConfig) -> Result<()> {
    tracing::info!("starting Pooch Palace scheduler on stdio");

    let scheduler = Arc::new(PickupScheduler::from_config(&config.scheduler));
    let tools = SchedulerTools::new(scheduler);
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running, waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    Ok(())
}
