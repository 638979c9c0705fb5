//! Router builders: process endpoints and per-resource CRUD.

mod common;
mod resource;

pub use common::{common_routes, READY_TIMEOUT};
pub use resource::resource_routes;
