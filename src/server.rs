//! HTTP reporting surface.

use crate::error::AnalysisError;
use crate::ingest;
use crate::service::{BotAnalysisService, TrackRequest};
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, warn};

type AppState = Arc<BotAnalysisService>;

#[derive(Debug, Deserialize)]
struct WindowQuery {
    days: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassifyBody {
    user_agent: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackBody {
    path: String,
    session_id: Option<String>,
}

impl IntoResponse for AnalysisError {
    fn into_response(self) -> Response {
        let status = match &self {
            AnalysisError::InvalidWindow(_) => StatusCode::BAD_REQUEST,
            AnalysisError::IpNotFound(_) => StatusCode::NOT_FOUND,
            AnalysisError::Store(e) => {
                error!(error = %e, "Visit store query failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

/// Build the router for the analysis service.
pub fn router(service: Arc<BotAnalysisService>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/bot-analysis", get(report_handler))
        .route("/api/bot-analysis/ip/:ip", get(ip_handler))
        .route("/api/classify", post(classify_handler))
        .route("/api/track", post(track_handler))
        .with_state(service)
}

async fn health_handler() -> &'static str {
    "OK"
}

async fn report_handler(
    State(service): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> Result<Response, AnalysisError> {
    let window = service.parse_window(query.days.as_deref())?;
    let report = service.report(window).await?;
    Ok(Json(report).into_response())
}

async fn ip_handler(
    State(service): State<AppState>,
    Path(ip): Path<String>,
    Query(query): Query<WindowQuery>,
) -> Result<Response, AnalysisError> {
    let window = service.parse_window(query.days.as_deref())?;
    let profile = service.ip_profile(&ip, window).await?;
    Ok(Json(profile).into_response())
}

async fn classify_handler(
    State(service): State<AppState>,
    Json(body): Json<ClassifyBody>,
) -> Response {
    Json(service.classify(body.user_agent.as_deref())).into_response()
}

async fn track_handler(
    State(service): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(body): Json<TrackBody>,
) -> StatusCode {
    let trust_proxy = service.config().server.trust_proxy_headers;
    let request = TrackRequest {
        path: body.path,
        ip: ingest::client_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr), trust_proxy),
        user_agent: ingest::user_agent(&headers),
        session_id: body.session_id,
    };

    match service.track(request).await {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(e) => {
            warn!(error = %e, "Failed to record visit");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
