//! `/auth` routes; `/auth/me` sits behind `require_auth`.

use crate::auth::{require_auth, Auth};
use crate::handlers::auth::{login, logout, me};
use crate::state::AppState;
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub fn auth_routes(state: AppState, auth: Arc<Auth>) -> Router {
    let protected = Router::new()
        .route("/me", get(me))
        .route_layer(from_fn_with_state(auth, require_auth));
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .merge(protected)
        .with_state(state)
}
