//! Web layer
//!
//! Thin axum handlers over the catalog and validation services. Handlers
//! read the current catalog through the shared [`CatalogStore`] and never
//! mutate it; rebuilds go through [`CatalogService`].

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::catalog::CatalogStore;
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::services::{CatalogService, ValidationService};

pub mod handlers;
pub mod responses;

pub use responses::{handle_error, handle_result, ApiResponse};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: CatalogStore,
    pub catalog_service: Arc<CatalogService>,
    /// `None` when stream validation is disabled
    pub validation: Option<Arc<ValidationService>>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        catalog_service: Arc<CatalogService>,
        validation: Option<Arc<ValidationService>>,
    ) -> Self {
        Self {
            config,
            store: catalog_service.store().clone(),
            catalog_service,
            validation,
        }
    }

    pub(crate) fn require_validation(&self) -> AppResult<&Arc<ValidationService>> {
        self.validation
            .as_ref()
            .ok_or_else(|| AppError::validation("Stream validation is disabled"))
    }
}

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(state: AppState) -> AppResult<Self> {
        let addr: SocketAddr = format!("{}:{}", state.config.web.host, state.config.web.port)
            .parse()
            .map_err(|e| AppError::configuration(format!("Invalid listen address: {e}")))?;
        let app = Self::create_router(state);
        Ok(Self { app, addr })
    }

    /// Build the router with all routes and middleware
    pub fn create_router(state: AppState) -> Router {
        let static_dir = state.config.web.static_dir.clone();

        let router = Router::new()
            .route("/api/health", get(handlers::health::health_check))
            .route("/api/channels", get(handlers::channels::list_channels))
            .route(
                "/api/channel/{id}/alternatives",
                get(handlers::channels::get_alternatives),
            )
            .route("/api/categories", get(handlers::categories::list_categories))
            .route("/api/sources", get(handlers::sources::list_sources))
            .route(
                "/api/validation-status",
                get(handlers::validation::validation_status),
            )
            .route(
                "/api/validation/start",
                post(handlers::validation::start_validation),
            )
            .route(
                "/api/catalog/refresh",
                post(handlers::catalog::refresh_catalog),
            );

        let router = match static_dir {
            Some(dir) => router.fallback_service(static_assets(&dir)),
            None => router,
        };

        router
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    pub fn router(&self) -> Router {
        self.app.clone()
    }

    pub async fn serve(self) -> AppResult<()> {
        let listener = TcpListener::bind(self.addr).await?;
        info!("Web server listening on http://{}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

/// Client assets, with `index.html` answering unknown paths
fn static_assets(dir: &Path) -> ServeDir<ServeFile> {
    ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
