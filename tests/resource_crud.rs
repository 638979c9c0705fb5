mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use common::{app, call, create, send};
use serde_json::json;

#[tokio::test]
async fn create_then_get_stamps_bookkeeping() {
    let app = app().await;
    let res = send(
        &app,
        Method::POST,
        "/customers",
        Some("alice"),
        Some(json!({"name": "Bob", "email": "bob@acme.com", "createdBy": "mallory"})),
    )
    .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["success"], true);
    let id = res.body["data"]["id"].as_str().unwrap();

    let res = send(&app, Method::GET, &format!("/customers/{}", id), Some("alice"), None).await;
    assert_eq!(res.status, StatusCode::OK);
    let doc = &res.body["data"];
    assert_eq!(doc["id"], id);
    assert_eq!(doc["userId"], "alice");
    assert_eq!(doc["createdBy"], "alice");
    assert_eq!(doc["updatedBy"], "alice");
    assert!(doc["createdAt"].as_str().unwrap().ends_with('Z'));
    assert_eq!(doc["createdAt"], doc["updatedAt"]);
}

#[tokio::test]
async fn other_owners_cannot_see_or_touch_records() {
    let app = app().await;
    let id = create(&app, "/customers", Some("alice"), json!({"name": "A", "email": "a@x.com"})).await;
    let path = format!("/customers/{}", id);

    assert_eq!(send(&app, Method::GET, &path, Some("bob"), None).await.status, StatusCode::NOT_FOUND);
    let list = send(&app, Method::GET, "/customers", Some("bob"), None).await;
    assert_eq!(list.body["data"], json!([]));
    assert_eq!(list.body["pagination"]["total"], 0);

    let patch = send(&app, Method::PATCH, &path, Some("bob"), Some(json!({"name": "Hijacked"}))).await;
    assert_eq!(patch.status, StatusCode::NOT_FOUND);
    assert_eq!(patch.body["message"], "Customer not found");
    assert_eq!(send(&app, Method::DELETE, &path, Some("bob"), None).await.status, StatusCode::NOT_FOUND);

    let res = send(&app, Method::GET, &path, Some("alice"), None).await;
    assert_eq!(res.body["data"]["name"], "A");
}

#[tokio::test]
async fn create_ignores_client_supplied_owner() {
    let app = app().await;
    let id = create(
        &app,
        "/customers",
        Some("alice"),
        json!({"name": "A", "email": "a@x.com", "userId": "bob"}),
    )
    .await;
    let path = format!("/customers/{}", id);

    let res = send(&app, Method::GET, &path, Some("alice"), None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["userId"], "alice");
    assert_eq!(send(&app, Method::GET, &path, Some("bob"), None).await.status, StatusCode::NOT_FOUND);
    let list = send(&app, Method::GET, "/customers", Some("bob"), None).await;
    assert_eq!(list.body["pagination"]["total"], 0);

    let anonymous = send(&app, Method::POST, "/articles", None, Some(json!({"title": "x", "authorId": "bob"}))).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn search_is_case_insensitive_across_fields() {
    let app = app().await;
    create(&app, "/customers", Some("u"), json!({"name": "Acme Corp", "email": "ops@acme.com"})).await;
    create(&app, "/customers", Some("u"), json!({"name": "Globex", "email": "g@globex.com", "company": "ACME Holdings"})).await;
    create(&app, "/customers", Some("u"), json!({"name": "Initech", "email": "i@initech.com"})).await;

    let res = send(&app, Method::GET, "/customers?search=acme", Some("u"), None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"].as_array().unwrap().len(), 2);
    assert_eq!(res.body["pagination"]["total"], 2);
}

#[tokio::test]
async fn duplicate_unique_field_is_conflict_naming_field() {
    let app = app().await;
    create(&app, "/customers", Some("u"), json!({"name": "A", "email": "dup@x.com"})).await;
    let res = send(
        &app,
        Method::POST,
        "/customers",
        Some("u"),
        Some(json!({"name": "B", "email": "dup@x.com"})),
    )
    .await;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.body, json!({"success": false, "message": "email already exists"}));
}

#[tokio::test]
async fn update_ignores_forged_identifiers() {
    let app = app().await;
    let id = create(&app, "/customers", Some("u"), json!({"name": "A", "email": "a@x.com"})).await;
    let path = format!("/customers/{}", id);

    let res = send(
        &app,
        Method::PATCH,
        &path,
        Some("u"),
        Some(json!({"_id": "forged", "id": "forged", "createdAt": "1970-01-01T00:00:00.000Z", "name": "New"})),
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"], json!({"updated": true}));

    let doc = send(&app, Method::GET, &path, Some("u"), None).await.body["data"].clone();
    assert_eq!(doc["id"], id.as_str());
    assert_eq!(doc["name"], "New");
    assert!(doc.get("_id").is_none());
    assert_ne!(doc["createdAt"], "1970-01-01T00:00:00.000Z");
}

#[tokio::test]
async fn put_merges_like_patch() {
    let app = app().await;
    let id = create(&app, "/customers", Some("u"), json!({"name": "A", "email": "a@x.com", "phone": "1"})).await;
    let path = format!("/customers/{}", id);
    let res = send(&app, Method::PUT, &path, Some("u"), Some(json!({"phone": "2"}))).await;
    assert_eq!(res.status, StatusCode::OK);
    let doc = send(&app, Method::GET, &path, Some("u"), None).await.body["data"].clone();
    assert_eq!(doc["phone"], "2");
    assert_eq!(doc["name"], "A");
}

#[tokio::test]
async fn restore_without_soft_delete_is_bad_request() {
    let app = app().await;
    let res = send(&app, Method::POST, "/notes/not-a-uuid/restore", Some("u"), None).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["message"], "Restore is not enabled for notes");
}

#[tokio::test]
async fn hard_delete_twice_is_ok_then_not_found() {
    let app = app().await;
    let id = create(&app, "/notes", Some("u"), json!({"text": "hi"})).await;
    let path = format!("/notes/{}", id);
    let first = send(&app, Method::DELETE, &path, Some("u"), None).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["data"], json!({"deleted": true}));
    let second = send(&app, Method::DELETE, &path, Some("u"), None).await;
    assert_eq!(second.status, StatusCode::NOT_FOUND);
    assert_eq!(second.body["message"], "Note not found");
}

#[tokio::test]
async fn soft_delete_and_restore_round_trip() {
    let app = app().await;
    let id = create(
        &app,
        "/customers",
        Some("u"),
        json!({"name": "A", "email": "a@x.com", "tags": ["vip"], "address": {"city": "Oslo"}}),
    )
    .await;
    let path = format!("/customers/{}", id);
    let mut before = send(&app, Method::GET, &path, Some("u"), None).await.body["data"].clone();

    assert_eq!(send(&app, Method::DELETE, &path, Some("u"), None).await.status, StatusCode::OK);
    assert_eq!(send(&app, Method::GET, &path, Some("u"), None).await.status, StatusCode::NOT_FOUND);
    assert_eq!(send(&app, Method::DELETE, &path, Some("u"), None).await.status, StatusCode::NOT_FOUND);
    let patch = send(&app, Method::PATCH, &path, Some("u"), Some(json!({"name": "B"}))).await;
    assert_eq!(patch.status, StatusCode::NOT_FOUND);

    let hidden = send(&app, Method::GET, "/customers", Some("u"), None).await;
    assert_eq!(hidden.body["pagination"]["total"], 0);
    let shown = send(&app, Method::GET, "/customers?includeDeleted=true", Some("u"), None).await;
    let rows = shown.body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0]["deletedAt"].is_string());
    assert_eq!(rows[0]["deletedBy"], "u");

    let restore = send(&app, Method::POST, &format!("{}/restore", path), Some("u"), None).await;
    assert_eq!(restore.status, StatusCode::OK);
    assert_eq!(restore.body["data"], json!({"restored": true}));

    let mut doc = send(&app, Method::GET, &path, Some("u"), None).await.body["data"].clone();
    assert!(doc.get("deletedAt").is_none());
    assert!(doc.get("deletedBy").is_none());
    assert!(doc["updatedAt"].as_str().unwrap() >= before["updatedAt"].as_str().unwrap());
    before.as_object_mut().unwrap().remove("updatedAt");
    doc.as_object_mut().unwrap().remove("updatedAt");
    assert_eq!(doc, before);

    let again = send(&app, Method::POST, &format!("{}/restore", path), Some("u"), None).await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn pagination_metadata() {
    let app = app().await;
    for i in 0..5 {
        create(&app, "/customers", Some("u"), json!({"name": format!("c{}", i), "email": format!("c{}@x.com", i)})).await;
    }

    let first = send(&app, Method::GET, "/customers?limit=2", Some("u"), None).await;
    assert_eq!(first.body["data"].as_array().unwrap().len(), 2);
    assert_eq!(
        first.body["pagination"],
        json!({"page": 1, "limit": 2, "total": 5, "totalPages": 3, "hasNextPage": true, "hasPrevPage": false})
    );

    let last = send(&app, Method::GET, "/customers?limit=2&page=3", Some("u"), None).await;
    assert_eq!(last.body["data"].as_array().unwrap().len(), 1);
    assert_eq!(last.body["pagination"]["hasNextPage"], false);
    assert_eq!(last.body["pagination"]["hasPrevPage"], true);

    let clamped = send(&app, Method::GET, "/customers?limit=1000&page=abc", Some("u"), None).await;
    assert_eq!(clamped.body["pagination"]["limit"], 100);
    assert_eq!(clamped.body["pagination"]["page"], 1);
}

#[tokio::test]
async fn explicit_sort_orders_results() {
    let app = app().await;
    for name in ["b", "c", "a"] {
        create(&app, "/customers", Some("u"), json!({"name": name, "email": format!("{}@x.com", name)})).await;
    }
    let res = send(&app, Method::GET, "/customers?sort=name", Some("u"), None).await;
    let names: Vec<&str> = res.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["a", "b", "c"]);

    let res = send(&app, Method::GET, "/customers?sort=-name", Some("u"), None).await;
    assert_eq!(res.body["data"][0]["name"], "c");

    let bad = send(&app, Method::GET, "/customers?sort=name;drop", Some("u"), None).await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn exact_match_filter_from_query() {
    let app = app().await;
    create(&app, "/customers", Some("u"), json!({"name": "A", "email": "a@x.com", "status": "active"})).await;
    create(&app, "/customers", Some("u"), json!({"name": "B", "email": "b@x.com", "status": "lead"})).await;
    let res = send(&app, Method::GET, "/customers?status=lead", Some("u"), None).await;
    let rows = res.body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "B");
}

#[tokio::test]
async fn authenticated_mount_requires_principal() {
    let app = app().await;
    let res = send(&app, Method::GET, "/customers", None, None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body, json!({"success": false, "message": "Authentication required"}));
}

#[tokio::test]
async fn public_read_mount_still_scopes_writes() {
    let app = app().await;
    let id = create(&app, "/articles", Some("author"), json!({"title": "Hello"})).await;
    let path = format!("/articles/{}", id);

    let anon = send(&app, Method::GET, &path, None, None).await;
    assert_eq!(anon.status, StatusCode::OK);
    assert_eq!(anon.body["data"]["authorId"], "author");
    let list = send(&app, Method::GET, "/articles", Some("reader"), None).await;
    assert_eq!(list.body["pagination"]["total"], 1);

    let anon_write = send(&app, Method::PATCH, &path, None, Some(json!({"title": "x"}))).await;
    assert_eq!(anon_write.status, StatusCode::UNAUTHORIZED);
    let other_write = send(&app, Method::DELETE, &path, Some("reader"), None).await;
    assert_eq!(other_write.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_ids_and_bodies_are_bad_requests() {
    let app = app().await;
    let res = send(&app, Method::GET, "/customers/123", Some("u"), None).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["message"], "Invalid Customer id");

    let res = send(&app, Method::POST, "/customers", Some("u"), Some(json!(["not", "an", "object"]))).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/customers")
        .header("x-user-id", "u")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"name\": "))
        .unwrap();
    let res = call(&app, request).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["success"], false);
}

#[tokio::test]
async fn validator_verdict_is_reported() {
    let app = app().await;
    let res = send(&app, Method::POST, "/customers", Some("u"), Some(json!({"name": "A"}))).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["message"], "email is required");

    let id = create(&app, "/customers", Some("u"), json!({"name": "A", "email": "a@x.com"})).await;
    let res = send(
        &app,
        Method::PATCH,
        &format!("/customers/{}", id),
        Some("u"),
        Some(json!({"email": "not-an-email"})),
    )
    .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["message"], "email must be a valid email");
}

#[tokio::test]
async fn populate_expands_references() {
    let app = app().await;
    let account = create(&app, "/accounts", None, json!({"name": "Acme"})).await;
    let contact = create(&app, "/contacts", None, json!({"name": "Wile", "accountId": account})).await;

    let res = send(&app, Method::GET, &format!("/contacts/{}", contact), None, None).await;
    assert_eq!(res.body["data"]["accountId"]["name"], "Acme");
    assert_eq!(res.body["data"]["accountId"]["id"], account.as_str());

    let list = send(&app, Method::GET, "/contacts", None, None).await;
    assert_eq!(list.body["data"][0]["accountId"]["name"], "Acme");
}
