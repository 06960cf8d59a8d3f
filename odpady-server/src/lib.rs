//! Actix-Web API server for odpady.
//!
//! Municipal staff authenticate with their Supabase session token and request
//! the quarterly waste report; the server aggregates the recorded collections,
//! renders CSV, ISOH XML, and XLSX artifacts, stores them, and serves stored
//! artifacts for later download.

pub mod config;
pub mod error;
mod handlers;
pub mod models;

use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

use actix_web::{App, HttpServer, middleware, web};
use anyhow::Context as _;
use log::{info, warn};
use odpady_core::{Backend, ReportService, WasteCodeTable};
use odpady_store_memory::MemoryStore;
use odpady_supabase::SupabaseClient;
use reqwest::Client;

use crate::config::{BackendConfig, ServerConfig};
use crate::error::ApiError;

/// Shared application state.
pub struct AppState {
    /// Report generation and retrieval.
    pub service: ReportService,
}

impl AppState {
    /// Wrap a configured service.
    #[must_use]
    pub fn new(service: ReportService) -> Self {
        Self { service }
    }
}

/// Register the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(web::PathConfig::default().error_handler(|err, _req| {
                ApiError::InvalidPath(err.to_string()).into()
            }))
            .route("/health", web::get().to(handlers::health))
            .route("/reports", web::get().to(handlers::list_reports))
            .route("/reports/generate", web::post().to(handlers::generate_report))
            .route(
                "/reports/{year}/{quarter}/{format}",
                web::get().to(handlers::download_report),
            ),
    );
}

/// Build the data backend selected by the configuration.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built, the Supabase key is
/// not a valid header value, or the memory seed file cannot be read.
pub fn build_backend(config: &BackendConfig) -> anyhow::Result<Backend> {
    match config {
        BackendConfig::Supabase { url, service_key } => {
            let client = Client::builder()
                .user_agent(concat!("odpady/", env!("CARGO_PKG_VERSION")))
                .build()
                .context("Failed to build HTTP client")?;
            let supabase = SupabaseClient::new(client, url, service_key)?;
            info!("Using Supabase backend at {url}");
            Ok(Backend::from_shared(Arc::new(supabase)))
        }
        BackendConfig::Memory { seed: Some(path) } => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open seed file {}", path.display()))?;
            let store = MemoryStore::from_json(BufReader::new(file))
                .with_context(|| format!("Failed to load seed file {}", path.display()))?;
            info!("Using in-memory backend seeded from {}", path.display());
            Ok(Backend::from_shared(Arc::new(store)))
        }
        BackendConfig::Memory { seed: None } => {
            warn!("Using an empty in-memory backend; no account can authenticate");
            Ok(Backend::from_shared(Arc::new(MemoryStore::new())))
        }
    }
}

/// Starts the odpady API server.
///
/// Loads `.env` if present, initialises logging from `RUST_LOG`, reads the
/// configuration, and serves until the process is stopped.
///
/// # Errors
///
/// Returns an error for invalid configuration, an unusable backend, or when
/// the HTTP server fails to bind or run.
pub async fn run_server() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();
    pretty_env_logger::init_custom_env("RUST_LOG");
    match dotenv {
        Ok(path) => info!("Loaded environment from {}", path.display()),
        Err(err) if err.not_found() => {}
        Err(err) => warn!("Ignoring unreadable .env file: {err}"),
    }

    let config = ServerConfig::from_env().context("Invalid configuration")?;
    let backend = build_backend(&config.backend)?;
    let service = ReportService::new(
        backend,
        Arc::new(WasteCodeTable::slovak_defaults()),
        odpady_export::encoders(),
    );
    let state = web::Data::new(AppState::new(service));

    info!("Starting server on {}:{}", config.bind_addr, config.port);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.bind_addr.as_str(), config.port))
    .with_context(|| format!("Failed to bind {}:{}", config.bind_addr, config.port))?
    .run()
    .await
    .context("HTTP server failed")
}
