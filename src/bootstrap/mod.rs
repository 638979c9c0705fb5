//! ServiceBootstrap: middleware pipeline, process endpoints, router mounts, database, shutdown.

mod middleware;
mod shutdown;

pub use middleware::{cors_layer, BODY_LIMIT, SECURITY_HEADERS};
pub use shutdown::{shutdown_signal, ShutdownOutcome, SHUTDOWN_GRACE};

use crate::auth::{optional_auth, require_auth, Authenticator, TrustedHeaders};
use crate::config::{Environment, ServiceConfig};
use crate::error::BootstrapError;
use crate::routes::common_routes;
use crate::state::ServiceState;
use crate::store::{ensure_database_exists, DocumentStore, PgStore};
use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{HeaderName, HeaderValue},
    middleware::{from_fn_with_state, map_response_with_state},
    Router,
};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;

pub const DB_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Whether a mounted router requires an authenticated principal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    /// Principal attached when resolvable; never rejected.
    Public,
    /// 401 unless the authenticator resolves a principal.
    Authenticated,
}

struct Mount {
    prefix: String,
    router: Router,
    access: Access,
}

type RouterHook = Box<dyn FnOnce(Router) -> Router + Send>;

pub struct ServiceBootstrap {
    config: ServiceConfig,
    store: Option<Arc<dyn DocumentStore>>,
    authenticator: Arc<dyn Authenticator>,
    mounts: Vec<Mount>,
    hooks: Vec<RouterHook>,
    grace: Duration,
}

impl ServiceBootstrap {
    pub fn new(config: ServiceConfig) -> Self {
        ServiceBootstrap {
            config,
            store: None,
            authenticator: Arc::new(TrustedHeaders),
            mounts: Vec::new(),
            hooks: Vec::new(),
            grace: SHUTDOWN_GRACE,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Connect to `DATABASE_URL`, creating the database if missing. The pool backs the
    /// store returned by [`ServiceBootstrap::store`] and the readiness probe.
    pub async fn connect(&mut self) -> Result<PgPool, BootstrapError> {
        let url = self
            .config
            .database_url
            .clone()
            .ok_or(BootstrapError::MissingDatabaseUrl)?;
        ensure_database_exists(&url).await?;
        let pool = PgPoolOptions::new()
            .max_connections(self.config.max_connections)
            .acquire_timeout(DB_ACQUIRE_TIMEOUT)
            .connect(&url)
            .await?;
        tracing::info!(max_connections = self.config.max_connections, "database connected");
        self.store = Some(Arc::new(PgStore::new(pool.clone())));
        Ok(pool)
    }

    pub fn with_pool(self, pool: PgPool) -> Self {
        self.with_store(Arc::new(PgStore::new(pool)))
    }

    pub fn with_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// The attached store, for building controllers.
    pub fn store(&self) -> Option<Arc<dyn DocumentStore>> {
        self.store.clone()
    }

    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = authenticator;
        self
    }

    /// Custom router additions, applied inside the fixed pipeline.
    pub fn with_middleware(mut self, hook: impl FnOnce(Router) -> Router + Send + 'static) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn mount(mut self, prefix: impl Into<String>, router: Router, access: Access) -> Self {
        self.mounts.push(Mount {
            prefix: prefix.into(),
            router,
            access,
        });
        self
    }

    /// Assemble the application router.
    ///
    /// Request flow: request id, request logging (not in `test`), panic catching, CORS,
    /// compression, security headers, error envelopes, body limit, routes.
    pub fn build(self) -> Router {
        let environment = self.config.environment;
        let mut state = ServiceState::new(self.config.service_name.clone(), environment);
        state.store = self.store.clone();

        let mut app = common_routes(state);
        for mount in self.mounts {
            let router = match mount.access {
                Access::Authenticated => mount
                    .router
                    .layer(from_fn_with_state(self.authenticator.clone(), require_auth)),
                Access::Public => mount
                    .router
                    .layer(from_fn_with_state(self.authenticator.clone(), optional_auth)),
            };
            let prefix = mount.prefix.trim_end_matches('/');
            app = if prefix.is_empty() {
                app.merge(router)
            } else {
                app.nest(prefix, router)
            };
        }
        app = app.fallback(middleware::route_not_found);
        for hook in self.hooks {
            app = hook(app);
        }

        app = app
            .layer(DefaultBodyLimit::max(BODY_LIMIT))
            .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
            .layer(map_response_with_state(environment, middleware::format_errors));
        for &(name, value) in SECURITY_HEADERS {
            app = app.layer(SetResponseHeaderLayer::if_not_present(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            ));
        }
        app = app
            .layer(CompressionLayer::new())
            .layer(cors_layer(&self.config))
            .layer(CatchPanicLayer::custom(middleware::panic_response));
        if environment != Environment::Test {
            app = app.layer(TraceLayer::new_for_http().make_span_with(|req: &Request| {
                let request_id = req
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!("request", method = %req.method(), uri = %req.uri(), request_id = %request_id)
            }));
        }
        app.layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Bind `0.0.0.0:PORT` and serve until SIGINT or SIGTERM.
    pub async fn serve(self) -> Result<ShutdownOutcome, BootstrapError> {
        let listener = TcpListener::bind(("0.0.0.0", self.config.port)).await?;
        self.serve_with_shutdown(listener, shutdown_signal()).await
    }

    /// Serve on `listener` until `signal` resolves, then drain.
    pub async fn serve_with_shutdown<F>(self, listener: TcpListener, signal: F) -> Result<ShutdownOutcome, BootstrapError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let grace = self.grace;
        tracing::info!(
            service = %self.config.service_name,
            environment = %self.config.environment,
            addr = %listener.local_addr()?,
            "listening"
        );
        let app = self.build();
        shutdown::serve_until(listener, app, signal, grace).await
    }
}

/// Install the global subscriber. `RUST_LOG` wins; otherwise `info` in production, `debug` elsewhere.
pub fn init_tracing(config: &ServiceConfig) {
    let default = match config.environment {
        Environment::Production => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
