//! Request id from the `x-request-id` header, or a fresh UUID when absent.

use crate::error::ErrorMessage;
use crate::response::Envelope;
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone, Debug)]
pub struct RequestId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RequestId(
            header_id(&parts.headers).unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        ))
    }
}

fn header_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Pins one request id per request (header or fresh UUID) so handlers and error
/// envelopes agree, stamps it into error bodies, and echoes it on the response.
pub async fn stamp_request_id(mut req: Request, next: Next) -> Response {
    let id = match header_id(req.headers()) {
        Some(id) => id,
        None => {
            let id = uuid::Uuid::new_v4().to_string();
            if let Ok(v) = HeaderValue::from_str(&id) {
                req.headers_mut().insert(REQUEST_ID_HEADER, v);
            }
            id
        }
    };

    let mut response = next.run(req).await;
    if let Some(ErrorMessage(message)) = response.extensions_mut().remove::<ErrorMessage>() {
        let status = response.status();
        let headers = std::mem::take(response.headers_mut());
        response = (status, Json(Envelope::<()>::error(status, Some(id.clone()), message))).into_response();
        for (name, value) in headers.iter() {
            if name != header::CONTENT_LENGTH && name != header::CONTENT_TYPE {
                response.headers_mut().append(name.clone(), value.clone());
            }
        }
    }
    if let Ok(v) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, v);
    }
    response
}
