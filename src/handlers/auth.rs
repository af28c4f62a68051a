//! Login, logout and current-user handlers.

use crate::auth::{Auth, CurrentUser, LoginForm};
use crate::error::AppError;
use crate::extractors::{ApiForm, RequestId};
use crate::response::success_ok;
use crate::state::AppState;
use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

fn auth(state: &AppState) -> Result<&Arc<Auth>, AppError> {
    state
        .auth
        .as_ref()
        .ok_or_else(|| AppError::NotFound("auth is not configured".into()))
}

pub async fn login(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    ApiForm(form): ApiForm<LoginForm>,
) -> Result<Response, AppError> {
    auth(&state)?.login(&request_id, &form).await
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    auth(&state)?.logout(&headers).await
}

/// The caller as resolved by `require_auth`; never includes the password hash.
pub async fn me(RequestId(request_id): RequestId, CurrentUser(user): CurrentUser) -> impl IntoResponse {
    success_ok(request_id, user)
}
