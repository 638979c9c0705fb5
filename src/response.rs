//! Standard response envelope helpers.

use crate::pagination::PageInfo;
use axum::{http::StatusCode, Json};
use serde::Serialize;

/// `{"success": bool, "data"?: any, "message"?: string}` shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// List envelope: the page of records plus pagination metadata.
#[derive(Debug, Serialize)]
pub struct PageEnvelope<T> {
    pub success: bool,
    pub data: Vec<T>,
    pub pagination: PageInfo,
}

pub fn success<T: Serialize>(data: T) -> (StatusCode, Json<Envelope<T>>) {
    with_status(StatusCode::OK, data)
}

pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<Envelope<T>>) {
    with_status(StatusCode::CREATED, data)
}

pub fn with_status<T: Serialize>(status: StatusCode, data: T) -> (StatusCode, Json<Envelope<T>>) {
    (
        status,
        Json(Envelope {
            success: true,
            data: Some(data),
            message: None,
        }),
    )
}

pub fn page<T: Serialize>(data: Vec<T>, pagination: PageInfo) -> (StatusCode, Json<PageEnvelope<T>>) {
    (
        StatusCode::OK,
        Json(PageEnvelope {
            success: true,
            data,
            pagination,
        }),
    )
}

pub fn failure(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<Envelope<()>>) {
    (
        status,
        Json(Envelope {
            success: false,
            data: None,
            message: Some(message.into()),
        }),
    )
}

/// Raw failure body, for places that build responses by hand (middleware).
pub fn failure_body(message: &str) -> serde_json::Value {
    serde_json::json!({
        "success": false,
        "message": message
    })
}
