//! Process configuration read from the environment.

use crate::error::ConfigError;
use std::fmt;
use std::str::FromStr;

/// Execution environment. Affects logging verbosity, CORS defaults and error detail.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            other => Err(ConfigError::InvalidEnvironment(other.to_string())),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub service_name: String,
    pub port: u16,
    pub database_url: Option<String>,
    /// Allowed CORS origins. Empty = environment default.
    pub cors_origins: Vec<String>,
    pub environment: Environment,
    pub max_connections: u32,
}

impl ServiceConfig {
    pub fn new(service_name: impl Into<String>, port: u16) -> Self {
        ServiceConfig {
            service_name: service_name.into(),
            port,
            database_url: None,
            cors_origins: Vec::new(),
            environment: Environment::Development,
            max_connections: 5,
        }
    }

    /// Load `.env` (if present) then read the process environment.
    pub fn load(default_name: &str, default_port: u16) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_env(default_name, default_port)
    }

    pub fn from_env(default_name: &str, default_port: u16) -> Result<Self, ConfigError> {
        Self::from_lookup(default_name, default_port, |key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Reads `SERVICE_NAME`, `PORT`, `DATABASE_URL`,
    /// `CORS_ORIGINS`, `APP_ENV` and `DB_MAX_CONNECTIONS`.
    pub fn from_lookup(
        default_name: &str,
        default_port: u16,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut config = ServiceConfig::new(non_empty("SERVICE_NAME").unwrap_or_else(|| default_name.into()), default_port);
        if let Some(port) = non_empty("PORT") {
            config.port = port.parse().map_err(|_| ConfigError::InvalidPort(port))?;
        }
        config.database_url = non_empty("DATABASE_URL");
        config.cors_origins = non_empty("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        if let Some(env) = non_empty("APP_ENV") {
            config.environment = env.parse()?;
        }
        if let Some(n) = non_empty("DB_MAX_CONNECTIONS").and_then(|n| n.parse().ok()) {
            config.max_connections = n;
        }
        Ok(config)
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_cors_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cors_origins = origins.into_iter().map(Into::into).collect();
        self
    }
}
