use std::sync::Arc;

use anyhow::Context;
use axum::http::{header::CONTENT_TYPE, HeaderValue, Method};
use reqwest::Client;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};

use studyhive_backend::{
    config::{is_production, Config, SessionBackend},
    db::{
        establish_connection, postgres_support_report_repository::PostgresSupportReportRepository,
        support_report_repository::SupportReportRepository,
    },
    routes::app_router,
    services::mailer::{Mailer, PluggableMailer},
    session::{MemorySessionStore, PostgresSessionStore, SessionStore},
    telemetry::{self, LogFormat},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if !is_production() {
        dotenv::dotenv().ok();
    }
    telemetry::init(LogFormat::parse(std::env::var("LOG_FORMAT").ok().as_deref()));

    let config = match Config::from_env() {
        Ok(config) => Arc::new(config),
        Err(err) => {
            error!(error = %err, "invalid configuration");
            std::process::exit(1);
        }
    };

    let pool = establish_connection(&config)
        .await
        .context("failed to connect to the database")?;

    let reports = PostgresSupportReportRepository::new(pool.clone());
    reports
        .ensure_schema()
        .await
        .context("failed to create support_reports table")?;
    let reports = Arc::new(reports) as Arc<dyn SupportReportRepository>;

    let sessions: Arc<dyn SessionStore> = match config.session_backend {
        SessionBackend::Postgres => {
            let store = PostgresSessionStore::new(pool.clone());
            store
                .ensure_schema()
                .await
                .context("failed to create admin_sessions table")?;
            Arc::new(store)
        }
        SessionBackend::Memory => Arc::new(MemorySessionStore::new()),
    };

    let mailer = PluggableMailer::from_settings(&config.mail, &Client::new());
    info!(provider = mailer.provider_name(), "mail provider ready");
    let mailer = Arc::new(mailer) as Arc<dyn Mailer>;

    let state = AppState {
        reports,
        sessions,
        mailer,
        config: config.clone(),
    };

    let app = app_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config)?);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "StudyHive listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}

fn cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    Ok(match &config.cors_origin {
        Some(origin) => layer
            .allow_origin(
                origin
                    .parse::<HeaderValue>()
                    .with_context(|| format!("invalid CORS_ORIGIN {origin}"))?,
            )
            .allow_credentials(true),
        None => layer.allow_origin(Any),
    })
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
