//! Common routes: health, readiness, version.

use crate::extractors::RequestId;
use crate::response::{success_ok, Envelope};
use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

#[derive(Serialize)]
struct ReadyBody {
    status: &'static str,
    database: &'static str,
}

#[derive(Serialize)]
struct VersionBody {
    name: &'static str,
    version: &'static str,
}

async fn health(RequestId(request_id): RequestId) -> impl IntoResponse {
    success_ok(request_id, HealthBody { status: "ok" })
}

async fn ready(State(state): State<AppState>, RequestId(request_id): RequestId) -> impl IntoResponse {
    if let Err(e) = sqlx::query("SELECT 1").fetch_optional(&state.pool).await {
        tracing::warn!(error = %e, "readiness probe failed");
        let status = StatusCode::SERVICE_UNAVAILABLE;
        let body = ReadyBody {
            status: "degraded",
            database: "unavailable",
        };
        return (status, Json(Envelope::new(status, Some(request_id), Some(body))));
    }
    success_ok(
        request_id,
        ReadyBody {
            status: "ok",
            database: "ok",
        },
    )
}

async fn version(RequestId(request_id): RequestId) -> impl IntoResponse {
    success_ok(
        request_id,
        VersionBody {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
        },
    )
}

/// GET /health, GET /ready (database probe), GET /version.
pub fn common_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/version", get(version))
        .with_state(state)
}
