//! Shared helpers: routers over `MemoryStore`, driven with `oneshot`.
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use resource_kit::{
    resource_routes, Access, DocumentStore, Environment, MemoryStore, ResourceConfig, ResourceController,
    RuleValidator, ServiceBootstrap, ServiceConfig, ValidationRule,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub fn test_config() -> ServiceConfig {
    ServiceConfig::new("test-service", 0).with_environment(Environment::Test)
}

pub fn customers() -> ResourceConfig {
    let rules = vec![
        (
            "name".to_string(),
            ValidationRule {
                required: Some(true),
                ..Default::default()
            },
        ),
        (
            "email".to_string(),
            ValidationRule {
                required: Some(true),
                format: Some("email".into()),
                ..Default::default()
            },
        ),
    ];
    ResourceConfig::new("customers")
        .display_name("Customer")
        .owned_by("userId")
        .soft_delete()
        .searchable(["name", "email", "company"])
        .unique(["email"])
        .validate_create(RuleValidator::for_create(rules.clone()))
        .validate_update(RuleValidator::for_update(rules))
        .augment_query(resource_kit::ExactMatch::new(["status"]))
}

pub async fn controller(store: &Arc<dyn DocumentStore>, config: ResourceConfig) -> Arc<ResourceController> {
    let ctl = Arc::new(ResourceController::new(store.clone(), config).unwrap());
    ctl.ensure_collection().await.unwrap();
    ctl
}

/// Customers (authenticated, soft delete), notes (authenticated, hard delete),
/// articles (public read), accounts + contacts (populate).
pub async fn app() -> Router {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    let customers = controller(&store, customers()).await;
    let notes = controller(&store, ResourceConfig::new("notes").display_name("Note").owned_by("userId")).await;
    let articles = controller(
        &store,
        ResourceConfig::new("articles")
            .display_name("Article")
            .owned_by("authorId")
            .public_read(true),
    )
    .await;
    let accounts = controller(&store, ResourceConfig::new("accounts").display_name("Account")).await;
    let contacts = controller(
        &store,
        ResourceConfig::new("contacts")
            .display_name("Contact")
            .populate("accountId", "accounts"),
    )
    .await;

    ServiceBootstrap::new(test_config())
        .with_store(store)
        .mount("/customers", resource_routes(customers), Access::Authenticated)
        .mount("/notes", resource_routes(notes), Access::Authenticated)
        .mount("/articles", resource_routes(articles), Access::Public)
        .mount("/accounts", resource_routes(accounts), Access::Public)
        .mount("/contacts", resource_routes(contacts), Access::Public)
        .build()
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub async fn call(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    TestResponse { status, headers, body }
}

/// JSON request as `user` (sent in `x-user-id`), or anonymous.
pub async fn send(app: &Router, method: Method, uri: &str, user: Option<&str>, body: Option<Value>) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    call(app, request).await
}

/// Create and return the new id.
pub async fn create(app: &Router, uri: &str, user: Option<&str>, body: Value) -> String {
    let res = send(app, Method::POST, uri, user, Some(body)).await;
    assert_eq!(res.status, StatusCode::CREATED, "create failed: {}", res.body);
    res.body["data"]["id"].as_str().unwrap().to_string()
}
