//! Entity CRUD handlers: create, list, read, update, delete, with bulk update and delete.

use crate::auth::CurrentUser;
use crate::config::EntityDef;
use crate::error::{AppError, ConfigError};
use crate::extractors::{ApiJson, ApiQuery, RequestId};
use crate::query::{Paginator, Selector, PRIMARY_KEY_PARAM};
use crate::response::{success_created, success_ok, ItemsData};
use crate::service::RequestContext;
use crate::state::{AppState, EntityRuntime};
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
};
use serde_json::Value;
use std::collections::HashMap;

fn runtime<'a>(state: &'a AppState, name: &str, operation: &str) -> Result<&'a EntityRuntime, AppError> {
    let runtime = state.entity(name)?;
    if !runtime.engine.entity().allows(operation) {
        return Err(AppError::BadRequest(format!("{} not allowed on {}", operation, name)));
    }
    Ok(runtime)
}

/// Resolve the caller, enforcing the entity's access requirements when it declares any.
async fn context(
    state: &AppState,
    entity: &EntityDef,
    headers: &HeaderMap,
    user: Option<CurrentUser>,
    request_id: String,
) -> Result<RequestContext, AppError> {
    let mut user = user.map(|CurrentUser(u)| u);
    if let Some(requirements) = &entity.auth {
        let auth = state.auth.as_ref().ok_or_else(|| {
            ConfigError::Validation(format!("entity '{}' requires auth but none is configured", entity.name))
        })?;
        user = Some(auth.current_user(headers, requirements).await?);
    }
    Ok(RequestContext { request_id, user })
}

fn bulk_keys(runtime: &EntityRuntime, params: &HashMap<String, String>) -> Result<Vec<Value>, AppError> {
    let raw = params
        .get(PRIMARY_KEY_PARAM)
        .ok_or_else(|| AppError::BadRequest(format!("{} query parameter is required", PRIMARY_KEY_PARAM)))?;
    runtime.engine.parse_primary_keys(raw)
}

fn path_key(runtime: &EntityRuntime, raw: &str) -> Result<Value, AppError> {
    let pk = runtime.engine.entity().primary_key();
    pk.field_type
        .coerce_str(raw)
        .map_err(|e| AppError::Validation(format!("{}: {}", pk.name, e)))
}

pub async fn create(
    State(state): State<AppState>,
    Path(name): Path<String>,
    RequestId(request_id): RequestId,
    user: Option<CurrentUser>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<Value>,
) -> Result<impl IntoResponse, AppError> {
    let runtime = runtime(&state, &name, "create")?;
    let ctx = context(&state, runtime.engine.entity(), &headers, user, request_id).await?;
    let Value::Array(items) = body else {
        return Err(AppError::BadRequest("body must be a JSON array".into()));
    };
    let created = runtime.engine.create_items(&ctx, &items).await?;
    Ok(success_created(ctx.request_id, ItemsData::counted(created)))
}

pub async fn list(
    State(state): State<AppState>,
    Path(name): Path<String>,
    RequestId(request_id): RequestId,
    user: Option<CurrentUser>,
    headers: HeaderMap,
    ApiQuery(params): ApiQuery<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let runtime = runtime(&state, &name, "read")?;
    let ctx = context(&state, runtime.engine.entity(), &headers, user, request_id).await?;
    let selector = Selector::bind(&runtime.selector, &params)?;
    let paginator = Paginator::from_query(&state.paginator, &params)?;
    let (items, total) = runtime.engine.read_items(&selector, &paginator).await?;
    Ok(success_ok(ctx.request_id, ItemsData { items, total }))
}

pub async fn read(
    State(state): State<AppState>,
    Path((name, key)): Path<(String, String)>,
    RequestId(request_id): RequestId,
    user: Option<CurrentUser>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let runtime = runtime(&state, &name, "read")?;
    let ctx = context(&state, runtime.engine.entity(), &headers, user, request_id).await?;
    let key = path_key(runtime, &key)?;
    let item = runtime.engine.read_item_by_primary_key(&key).await?;
    Ok(success_ok(ctx.request_id, item))
}

pub async fn update(
    State(state): State<AppState>,
    Path((name, key)): Path<(String, String)>,
    RequestId(request_id): RequestId,
    user: Option<CurrentUser>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<Value>,
) -> Result<impl IntoResponse, AppError> {
    let runtime = runtime(&state, &name, "update")?;
    let ctx = context(&state, runtime.engine.entity(), &headers, user, request_id).await?;
    let keys = vec![path_key(runtime, &key)?];
    let updated = runtime.engine.update_items(&ctx, &keys, &body).await?;
    Ok(success_ok(ctx.request_id, ItemsData::counted(updated)))
}

/// `PATCH /{entity}?primary_key=1,2,3`
pub async fn update_bulk(
    State(state): State<AppState>,
    Path(name): Path<String>,
    RequestId(request_id): RequestId,
    user: Option<CurrentUser>,
    headers: HeaderMap,
    ApiQuery(params): ApiQuery<HashMap<String, String>>,
    ApiJson(body): ApiJson<Value>,
) -> Result<impl IntoResponse, AppError> {
    let runtime = runtime(&state, &name, "update")?;
    let ctx = context(&state, runtime.engine.entity(), &headers, user, request_id).await?;
    let keys = bulk_keys(runtime, &params)?;
    let updated = runtime.engine.update_items(&ctx, &keys, &body).await?;
    Ok(success_ok(ctx.request_id, ItemsData::counted(updated)))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((name, key)): Path<(String, String)>,
    RequestId(request_id): RequestId,
    user: Option<CurrentUser>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let runtime = runtime(&state, &name, "delete")?;
    let ctx = context(&state, runtime.engine.entity(), &headers, user, request_id).await?;
    let keys = vec![path_key(runtime, &key)?];
    let deleted = runtime.engine.delete_items(&ctx, &keys).await?;
    Ok(success_ok(ctx.request_id, ItemsData::counted(deleted)))
}

/// `DELETE /{entity}?primary_key=1,2,3`
pub async fn delete_bulk(
    State(state): State<AppState>,
    Path(name): Path<String>,
    RequestId(request_id): RequestId,
    user: Option<CurrentUser>,
    headers: HeaderMap,
    ApiQuery(params): ApiQuery<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let runtime = runtime(&state, &name, "delete")?;
    let ctx = context(&state, runtime.engine.entity(), &headers, user, request_id).await?;
    let keys = bulk_keys(runtime, &params)?;
    let deleted = runtime.engine.delete_items(&ctx, &keys).await?;
    Ok(success_ok(ctx.request_id, ItemsData::counted(deleted)))
}
