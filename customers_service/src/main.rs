//! Customers service: one owned, soft-deletable resource on resource-kit.
//!
//! Run from repo root: `cargo run -p customers-service`

use resource_kit::{
    init_tracing, resource_routes, Access, BootstrapError, Chain, DateRange, DocumentStore, ExactMatch, PgStore,
    ResourceConfig, ResourceController, RuleValidator, ServiceBootstrap, ServiceConfig, ShutdownOutcome, ValidationRule,
};
use std::process::ExitCode;
use std::sync::Arc;

const DEFAULT_NAME: &str = "customers-service";
const DEFAULT_PORT: u16 = 3002;

fn customer_rules() -> Vec<(String, ValidationRule)> {
    vec![
        (
            "name".into(),
            ValidationRule {
                required: Some(true),
                min_length: Some(1),
                max_length: Some(200),
                ..Default::default()
            },
        ),
        (
            "email".into(),
            ValidationRule {
                required: Some(true),
                format: Some("email".into()),
                max_length: Some(254),
                ..Default::default()
            },
        ),
        (
            "status".into(),
            ValidationRule {
                allowed: Some(vec!["active".into(), "inactive".into(), "lead".into()]),
                ..Default::default()
            },
        ),
    ]
}

fn customer_resource() -> ResourceConfig {
    ResourceConfig::new("customers")
        .display_name("Customer")
        .owned_by("userId")
        .soft_delete()
        .searchable(["name", "email", "company"])
        .unique(["email"])
        .validate_create(RuleValidator::for_create(customer_rules()))
        .validate_update(RuleValidator::for_update(customer_rules()))
        .augment_query(Chain(vec![
            Box::new(ExactMatch::new(["status"])),
            Box::new(DateRange::new("createdAt")),
        ]))
}

async fn run() -> Result<ShutdownOutcome, BootstrapError> {
    let config = ServiceConfig::load(DEFAULT_NAME, DEFAULT_PORT)?;
    init_tracing(&config);

    let mut bootstrap = ServiceBootstrap::new(config);
    let pool = bootstrap.connect().await?;
    let store: Arc<dyn DocumentStore> = Arc::new(PgStore::new(pool));

    let customers = Arc::new(ResourceController::new(store, customer_resource())?);
    customers.ensure_collection().await?;

    bootstrap
        .mount("/customers", resource_routes(customers), Access::Authenticated)
        .serve()
        .await
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(ShutdownOutcome::Drained) => ExitCode::SUCCESS,
        Ok(ShutdownOutcome::Forced) => {
            tracing::error!("forced shutdown after grace period");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!(error = %e, "service failed");
            eprintln!("{}: {}", DEFAULT_NAME, e);
            ExitCode::FAILURE
        }
    }
}
