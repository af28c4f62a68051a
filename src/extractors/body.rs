//! `Json`, `Query` and `Form` whose rejections render as `AppError` envelopes.

use crate::error::AppError;
use async_trait::async_trait;
use axum::{
    extract::{
        rejection::{FormRejection, JsonRejection, QueryRejection},
        FromRequest, FromRequestParts, Request,
    },
    http::{request::Parts, StatusCode},
    Form, Json,
};
use serde::de::DeserializeOwned;

fn rejection(status: StatusCode, text: String) -> AppError {
    if status == StatusCode::UNPROCESSABLE_ENTITY {
        AppError::Validation(text)
    } else {
        AppError::BadRequest(text)
    }
}

impl From<JsonRejection> for AppError {
    fn from(r: JsonRejection) -> Self {
        rejection(r.status(), r.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(r: QueryRejection) -> Self {
        rejection(r.status(), r.body_text())
    }
}

impl From<FormRejection> for AppError {
    fn from(r: FormRejection) -> Self {
        rejection(r.status(), r.body_text())
    }
}

pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let axum::extract::Query(value) = axum::extract::Query::<T>::from_request_parts(parts, state).await?;
        Ok(ApiQuery(value))
    }
}

pub struct ApiForm<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiForm<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Form(value) = Form::<T>::from_request(req, state).await?;
        Ok(ApiForm(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::header;
    use serde_json::Value;

    #[tokio::test]
    async fn query_type_mismatch_is_a_bad_request() {
        #[derive(serde::Deserialize)]
        struct Page {
            #[allow(dead_code)]
            page: u32,
        }
        let (mut parts, _) = Request::builder().uri("/x?page=two").body(()).unwrap().into_parts();
        let err = ApiQuery::<Page>::from_request_parts(&mut parts, &()).await.err().unwrap();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let req = Request::builder()
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{oops"))
            .unwrap();
        let err = ApiJson::<Value>::from_request(req, &()).await.err().unwrap();
        assert!(matches!(err, AppError::BadRequest(_)));

        let req = Request::builder().body(Body::from("[]")).unwrap();
        let err = ApiJson::<Value>::from_request(req, &()).await.err().unwrap();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
