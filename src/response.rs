//! Standard response envelope: `{request_id, code, message, data}` with nulls omitted.

use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Mirrors the HTTP status of the response.
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn new(status: StatusCode, request_id: Option<String>, data: Option<T>) -> Self {
        Envelope {
            request_id,
            code: status.as_u16(),
            message: Some(String::new()),
            data,
        }
    }

    pub fn error(status: StatusCode, request_id: Option<String>, message: String) -> Self {
        Envelope {
            request_id,
            code: status.as_u16(),
            message: Some(message),
            data: None,
        }
    }
}

/// List payload shared by create, list, update and delete responses.
#[derive(Debug, Serialize)]
pub struct ItemsData<T> {
    pub items: Vec<T>,
    /// Row count, or -1 when the caller did not ask for a total.
    pub total: i64,
}

impl<T> ItemsData<T> {
    pub fn counted(items: Vec<T>) -> Self {
        let total = items.len() as i64;
        ItemsData { items, total }
    }
}

pub fn success_ok<T: Serialize>(request_id: String, data: T) -> (StatusCode, Json<Envelope<T>>) {
    (
        StatusCode::OK,
        Json(Envelope::new(StatusCode::OK, Some(request_id), Some(data))),
    )
}

pub fn success_created<T: Serialize>(request_id: String, data: T) -> (StatusCode, Json<Envelope<T>>) {
    (
        StatusCode::CREATED,
        Json(Envelope::new(StatusCode::CREATED, Some(request_id), Some(data))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_fields_are_omitted() {
        let body: Envelope<()> = Envelope::error(StatusCode::NOT_FOUND, None, "not found: 7".into());
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v, json!({ "code": 404, "message": "not found: 7" }));
    }

    #[test]
    fn success_envelope_mirrors_status() {
        let (status, Json(body)) = success_created("req-1".into(), ItemsData::counted(vec![json!({ "id": 1 })]));
        assert_eq!(status, StatusCode::CREATED);
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["code"], 201);
        assert_eq!(v["request_id"], "req-1");
        assert_eq!(v["data"]["total"], 1);
        assert_eq!(v["data"]["items"][0]["id"], 1);
    }
}
