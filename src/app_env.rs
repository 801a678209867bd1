use crate::domain::todo::Ownership;
use anyhow::{Context, bail};
use std::env;

/// URL for accessing the PostrgeSQL database (should contain a schema name in the path)
pub const DB_URL: &str = "DATABASE_URL";
/// Log level configuration for the application. For formatting info, see [tracing_subscriber's documentation](https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html)
pub const LOG_LEVEL: &str = "LOG_LEVEL";
/// Address the HTTP server binds to. Defaults to [DEFAULT_LISTEN_ADDR] when unset.
pub const LISTEN_ADDR: &str = "LISTEN_ADDR";
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

/// Shared HS256 secret used by the identity provider to sign access tokens. Required when
/// running in multi-user mode.
pub const AUTH_JWT_SECRET: &str = "AUTH_JWT_SECRET";
/// Either "multi_user" (the default) or "single_user". Single-user mode stores todos without
/// an owner and never filters by user.
pub const OWNERSHIP_MODE: &str = "OWNERSHIP_MODE";

/// OpenTelemetry span export URL. Should be http://localhost:4317 by default, as the service should
/// have an OpenTelemetry collector sidecar which directs metrics to the correct place
pub const OTEL_SPAN_EXPORT_URL: &str = "OTEL_SPAN_EXPORT_URL";
/// OpenTelemetry metrics export URL. Should be http://localhost:4317 by default, as the service should
/// have an OpenTelemetry collector sidecar which directs metrics to the correct place
pub const OTEL_METRIC_EXPORT_URL: &str = "OTEL_METRIC_EXPORT_URL";

/// Server settings read from the environment at startup
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub db_url: String,
    pub listen_addr: String,
    pub ownership: Ownership,
    /// Always present in multi-user mode
    pub jwt_secret: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, anyhow::Error> {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let db_url = read(DB_URL).with_context(|| format!("{DB_URL} must be set"))?;
        let listen_addr = read(LISTEN_ADDR).unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_owned());
        let ownership = match read(OWNERSHIP_MODE) {
            Some(mode) => mode.parse()?,
            None => Ownership::default(),
        };
        let jwt_secret = read(AUTH_JWT_SECRET);
        if ownership == Ownership::MultiUser && jwt_secret.is_none() {
            bail!("{AUTH_JWT_SECRET} must be set unless {OWNERSHIP_MODE} is single_user");
        }

        Ok(AppConfig {
            db_url,
            listen_addr,
            ownership,
            jwt_secret,
        })
    }
}
