//! Router assembly.

mod auth;
mod common;
mod entity;

pub use auth::auth_routes;
pub use common::common_routes;
pub use entity::entity_routes;

use crate::error::AppError;
use crate::extractors::stamp_request_id;
use crate::state::AppState;
use axum::{middleware, Router};

async fn no_route() -> AppError {
    AppError::NotFound("route".into())
}

/// Common routes at the root; auth (when configured) and entities under `api_prefix`.
/// Unmatched paths and every error response carry the enveloped request id.
pub fn app_router(state: AppState, api_prefix: &str) -> Router {
    let mut api = Router::new();
    if let Some(auth) = state.auth.clone() {
        api = api.nest("/auth", auth_routes(state.clone(), auth));
    }
    let api = api.merge(entity_routes(state.clone()));
    let router = common_routes(state);
    let router = if api_prefix.is_empty() || api_prefix == "/" {
        router.merge(api)
    } else {
        router.nest(api_prefix, api)
    };
    router.fallback(no_route).layer(middleware::from_fn(stamp_request_id))
}
