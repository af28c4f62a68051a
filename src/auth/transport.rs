//! How a token travels between client and server.

use crate::error::AuthError;
use crate::response::Envelope;
use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

pub trait Transport: Send + Sync {
    fn extract_token(&self, headers: &HeaderMap) -> Option<String>;

    fn login_response(&self, request_id: &str, token: &str) -> Response;

    /// `AuthError::LogoutNotSupported` when the transport has nothing to clear.
    fn logout_response(&self) -> Result<Response, AuthError>;
}

#[derive(Debug, Serialize)]
pub struct BearerBody {
    pub access_token: String,
    pub token_type: &'static str,
}

/// `Authorization: Bearer <token>`.
#[derive(Clone, Debug, Default)]
pub struct BearerTransport;

impl Transport for BearerTransport {
    fn extract_token(&self, headers: &HeaderMap) -> Option<String> {
        let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        let (scheme, token) = value.split_once(' ')?;
        let token = token.trim();
        (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
    }

    fn login_response(&self, request_id: &str, token: &str) -> Response {
        let body = BearerBody {
            access_token: token.to_string(),
            token_type: "bearer",
        };
        Json(Envelope::new(StatusCode::OK, Some(request_id.to_string()), Some(body))).into_response()
    }

    fn logout_response(&self) -> Result<Response, AuthError> {
        Err(AuthError::LogoutNotSupported)
    }
}

/// Token in an HttpOnly cookie.
#[derive(Clone, Debug)]
pub struct CookieTransport {
    pub name: String,
    pub max_age: i64,
    pub secure: bool,
}

impl CookieTransport {
    pub fn new(name: impl Into<String>, max_age: i64, secure: bool) -> Self {
        CookieTransport {
            name: name.into(),
            max_age,
            secure,
        }
    }

    fn set_cookie(&self, value: &str, max_age: i64) -> Response {
        let mut cookie = format!(
            "{}={}; Max-Age={}; Path=/; HttpOnly; SameSite=Lax",
            self.name, value, max_age
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        let mut response = StatusCode::NO_CONTENT.into_response();
        match HeaderValue::from_str(&cookie) {
            Ok(v) => {
                response.headers_mut().insert(header::SET_COOKIE, v);
            }
            Err(e) => tracing::error!(error = %e, "cookie value is not a valid header"),
        }
        response
    }
}

impl Transport for CookieTransport {
    fn extract_token(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, value)| *name == self.name && !value.is_empty())
            .map(|(_, value)| value.to_string())
    }

    fn login_response(&self, _request_id: &str, token: &str) -> Response {
        self.set_cookie(token, self.max_age)
    }

    fn logout_response(&self) -> Result<Response, AuthError> {
        Ok(self.set_cookie("", 0))
    }
}
