use anyhow::Context;
use dotenv::dotenv;
use owned_todos::app_env::{self, AppConfig};
use owned_todos::domain::todo::TodoService;
use owned_todos::identity::JwtTokenVerifier;
use owned_todos::{SharedData, build_router, db, logging, persistence};
use std::env;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let dotenv_loaded = dotenv().is_ok();

    let env_filter = logging::init_env_filter()?;
    let otel_exporters = match (
        env::var(app_env::OTEL_SPAN_EXPORT_URL),
        env::var(app_env::OTEL_METRIC_EXPORT_URL),
    ) {
        (Ok(span_url), Ok(metric_url)) => Some(logging::init_exporters(&span_url, &metric_url)?),
        _ => None,
    };
    logging::setup_logging_and_tracing(env_filter, otel_exporters);
    if !dotenv_loaded {
        info!("No .env file found, reading configuration from the environment only");
    }

    let config = AppConfig::from_env()?;
    info!(ownership = ?config.ownership, "Loaded configuration");

    let db_pool = db::connect_sqlx(&config.db_url).await?;
    db::migrate(&db_pool).await?;

    let shared_data = Arc::new(SharedData::new(
        persistence::ExternalConnectivity::new(db_pool),
        TodoService::new(config.ownership),
        config.jwt_secret.as_deref().map(JwtTokenVerifier::new),
    ));
    let router = build_router(shared_data);

    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("binding to {}", config.listen_addr))?;
    info!("Todo service listening on {}", config.listen_addr);
    axum::serve(listener, router)
        .await
        .context("serving HTTP")?;

    Ok(())
}
