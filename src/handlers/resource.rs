//! Resource CRUD handlers: create, list, read, update, delete, restore.

use crate::error::AppError;
use crate::extractors::MaybePrincipal;
use crate::response;
use crate::service::ResourceController;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

type Controller = State<Arc<ResourceController>>;

pub async fn create(
    State(ctl): Controller,
    MaybePrincipal(principal): MaybePrincipal,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(body) = body?;
    let created = ctl.create(principal.as_ref(), body).await?;
    Ok(response::created(created))
}

pub async fn list(
    State(ctl): Controller,
    MaybePrincipal(principal): MaybePrincipal,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let (rows, pagination) = ctl.list(principal.as_ref(), &params).await?;
    Ok(response::page(rows, pagination))
}

pub async fn read(
    State(ctl): Controller,
    MaybePrincipal(principal): MaybePrincipal,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let doc = ctl.get(principal.as_ref(), &id).await?;
    Ok(response::success(doc))
}

/// PUT and PATCH share partial-merge semantics.
pub async fn update(
    State(ctl): Controller,
    MaybePrincipal(principal): MaybePrincipal,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(body) = body?;
    ctl.update(principal.as_ref(), &id, body).await?;
    Ok(response::success(json!({ "updated": true })))
}

pub async fn delete(
    State(ctl): Controller,
    MaybePrincipal(principal): MaybePrincipal,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    ctl.delete(principal.as_ref(), &id).await?;
    Ok(response::success(json!({ "deleted": true })))
}

pub async fn restore(
    State(ctl): Controller,
    MaybePrincipal(principal): MaybePrincipal,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    ctl.restore(principal.as_ref(), &id).await?;
    Ok(response::success(json!({ "restored": true })))
}
