//! Request gating for axum routers.

use crate::auth::facade::Auth;
use crate::auth::user::AuthUser;
use crate::auth::Requirements;
use crate::error::AppError;
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// The authenticated user, placed in request extensions by [`require_auth`].
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

/// Reject unauthenticated requests; use with `axum::middleware::from_fn_with_state(auth, require_auth)`.
pub async fn require_auth(State(auth): State<Arc<Auth>>, mut req: Request, next: Next) -> Result<Response, AppError> {
    let user = auth.current_user(req.headers(), &Requirements::none()).await?;
    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}
