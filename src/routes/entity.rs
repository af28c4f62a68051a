//! Entity CRUD routes. Handlers resolve the entity from the first path segment.

use crate::handlers::entity::{create, delete, delete_bulk, list, read, update, update_bulk};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn entity_routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/:entity",
            get(list).post(create).patch(update_bulk).delete(delete_bulk),
        )
        .route("/:entity/:primary_key", get(read).patch(update).delete(delete))
        .with_state(state)
}
