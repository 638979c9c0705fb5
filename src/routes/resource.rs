//! CRUD routes for one resource, mounted under a prefix by the bootstrap.

use crate::handlers::resource::{create, delete as delete_handler, list, read, restore, update};
use crate::service::ResourceController;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// `/` list + create, `/:id` read/update/delete, `/:id/restore`.
pub fn resource_routes(controller: Arc<ResourceController>) -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route(
            "/:id",
            get(read).put(update).patch(update).delete(delete_handler),
        )
        .route("/:id/restore", post(restore))
        .with_state(controller)
}
