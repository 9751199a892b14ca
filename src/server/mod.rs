//! HTTP and SSE transport.
//!
//! A thin axum surface over the store and the orchestrator: case and
//! evidence registration, run triggering, a live progress stream, and
//! retrieval of the persisted analysis. Transport failures never touch a
//! run in flight; a dropped SSE subscriber only drops its own receiver.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::{AppResult, StorageError};
use crate::pipeline::Orchestrator;
use crate::progress::RunRegistry;
use crate::storage::{Case, CaseAnalysis, CaseStatus, EvidenceItem, EvidenceKind, EvidenceStore};

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Persistence, shared with the pipeline.
    pub store: Arc<dyn EvidenceStore>,
    /// The pipeline driver.
    pub orchestrator: Arc<Orchestrator>,
    /// Active runs and their progress buses.
    pub runs: RunRegistry,
    /// SSE keep-alive interval.
    pub heartbeat_interval_ms: u64,
}

/// Transport-level error with a JSON body of the shape
/// `{"error": {"code", "message"}}`.
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "not_found",
            message: message.into(),
        }
    }

    fn conflict(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            code: "conflict",
            message: message.into(),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::CaseNotFound { .. } | StorageError::EvidenceNotFound { .. } => {
                ApiError::not_found(e.to_string())
            }
            other => ApiError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "storage_error",
                message: other.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": { "code": self.code, "message": self.message }
        });
        (self.status, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct CreateCaseRequest {
    name: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AddEvidenceRequest {
    filename: String,
    kind: EvidenceKind,
    storage_url: String,
}

#[derive(Debug, Serialize)]
struct AnalyzeAccepted {
    message: String,
    #[serde(rename = "caseId")]
    case_id: String,
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/cases", post(create_case))
        .route("/cases/:id", get(get_case))
        .route("/cases/:id/evidence", post(add_evidence))
        .route("/cases/:id/analyze", post(start_analysis))
        .route("/cases/:id/analyze/stream", get(stream_progress))
        .route("/cases/:id/analysis", get(get_analysis))
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn run_server(config: &ServerConfig, state: AppState) -> AppResult<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .map_err(|e| crate::error::AppError::Internal {
            message: format!("failed to bind {}: {}", config.bind, e),
        })?;
    info!(bind = %config.bind, "HTTP server listening");
    axum::serve(listener, router)
        .await
        .map_err(|e| crate::error::AppError::Internal {
            message: format!("server error: {}", e),
        })?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn create_case(
    State(state): State<AppState>,
    Json(req): Json<CreateCaseRequest>,
) -> Result<(StatusCode, Json<Case>), ApiError> {
    let mut case = Case::new(req.name);
    if let Some(description) = req.description {
        case = case.with_description(description);
    }
    state.store.create_case(&case).await?;
    info!(case_id = %case.id, "Case created");
    Ok((StatusCode::CREATED, Json(case)))
}

async fn get_case(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Case>, ApiError> {
    let case = state
        .store
        .get_case(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Case not found: {id}")))?;
    Ok(Json(case))
}

async fn add_evidence(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AddEvidenceRequest>,
) -> Result<(StatusCode, Json<EvidenceItem>), ApiError> {
    state
        .store
        .get_case(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Case not found: {id}")))?;

    let item = EvidenceItem::new(&id, req.kind, req.filename, req.storage_url);
    state.store.create_evidence(&item).await?;
    info!(case_id = %id, evidence_id = %item.id, kind = %item.kind, "Evidence registered");
    Ok((StatusCode::CREATED, Json(item)))
}

async fn start_analysis(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<AnalyzeAccepted>), ApiError> {
    state
        .store
        .get_case(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Case not found: {id}")))?;

    let bus = state
        .runs
        .begin(&id)
        .ok_or_else(|| ApiError::conflict(format!("Analysis already running for case {id}")))?;

    // The case reads as running from the moment the ack goes out, not from
    // whenever the spawned task gets scheduled.
    if let Err(e) = state
        .store
        .set_case_status(&id, CaseStatus::Running)
        .await
    {
        state.runs.finish(&id);
        return Err(e.into());
    }

    let orchestrator = Arc::clone(&state.orchestrator);
    let runs = state.runs.clone();
    let case_id = id.clone();
    tokio::spawn(async move {
        if let Err(e) = orchestrator.run(&case_id, &bus).await {
            warn!(case_id = %case_id, error = %e, "Background analysis run failed");
        }
        runs.finish(&case_id);
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(AnalyzeAccepted {
            message: "Analysis started".to_string(),
            case_id: id,
        }),
    ))
}

async fn stream_progress(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let rx = state
        .runs
        .subscribe(&id)
        .ok_or_else(|| ApiError::not_found(format!("No active analysis for case {id}")))?;
    let mut events = BroadcastStream::new(rx);

    let stream = async_stream::stream! {
        yield Ok(Event::default().data(json!({"type": "connected"}).to_string()));

        while let Some(next) = events.next().await {
            match next {
                Ok(progress) => {
                    let terminal = progress.is_terminal();
                    let failed = progress.error.clone();
                    if let Ok(body) = serde_json::to_string(&progress) {
                        yield Ok(Event::default().data(body));
                    }
                    if terminal {
                        let frame = match failed {
                            Some(message) => json!({"type": "error", "error": message}),
                            None => json!({"type": "complete"}),
                        };
                        yield Ok(Event::default().data(frame.to_string()));
                        break;
                    }
                }
                // A slow subscriber skips missed events and keeps going.
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(case_id = %id, skipped, "SSE subscriber lagged");
                }
            }
        }
    };

    let keep_alive = KeepAlive::new()
        .interval(std::time::Duration::from_millis(state.heartbeat_interval_ms))
        .event(Event::default().data(json!({"type": "heartbeat"}).to_string()));

    Ok(Sse::new(stream).keep_alive(keep_alive))
}

async fn get_analysis(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CaseAnalysis>, ApiError> {
    let analysis = state
        .store
        .get_analysis(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No analysis for case {id}")))?;
    Ok(Json(analysis))
}
