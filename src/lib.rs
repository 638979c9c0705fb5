//! resource-kit: configuration-driven CRUD resources and a service bootstrap on axum.
//!
//! A [`ResourceController`] serves create/list/get/update/delete/restore for one document
//! collection; [`ServiceBootstrap`] wraps mounted routers in the standard middleware
//! pipeline, health endpoints and graceful shutdown.

pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod pagination;
pub mod query;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use auth::{Authenticator, Principal, TrustedHeaders};
pub use bootstrap::{init_tracing, Access, ServiceBootstrap, ShutdownOutcome};
pub use config::{DeleteMode, Environment, ResourceConfig, ServiceConfig, ValidationRule};
pub use error::{AppError, BootstrapError, ConfigError};
pub use pagination::PageInfo;
pub use query::{Condition, Filter, Sort};
pub use routes::{common_routes, resource_routes};
pub use service::{
    Chain, CreateShaper, DateRange, ExactMatch, QueryAugmenter, ResourceController, RuleValidator, Validator,
    Verdict,
};
pub use state::ServiceState;
pub use store::{DocumentStore, MemoryStore, PgStore};
