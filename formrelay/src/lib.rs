//! # formrelay: Contract Form PDF Relay
//!
//! `formrelay` implements a single-purpose business form workflow: a contract
//! form is captured as a [`document::FormSnapshot`] (or a raster capture of
//! the rendered form), assembled into a paginated PDF, and relayed to a
//! Google Drive folder through a server-side endpoint.
//!
//! ## Architecture
//!
//! Three collaborating pieces, none with internal sub-architecture:
//!
//! - The **document assembler** ([`document`]) paginates either a tall pixel
//!   capture or a fixed, ordered list of form sections into A4 pages and
//!   serializes them with `printpdf`.
//! - The **upload relay** ([`api`]) is an [Axum](https://github.com/tokio-rs/axum)
//!   service exposing `POST /api/upload`: it parses a single-file multipart
//!   body, authenticates to Google Drive through the [`storage`] provider
//!   seam, optionally verifies access to the configured folder, and forwards
//!   the file. A connectivity probe lives at `/api/test`.
//! - The **status reporter** ([`reporter`]) drives one submission round trip
//!   client-side, rendering progress through injected collaborators.
//!
//! Requests are handled independently and statelessly; nothing is persisted
//! server-side, and a failed attempt is simply resubmitted by the client.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use formrelay::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = formrelay::config::Args::parse();
//!     let config = Config::load(&args)?;
//!     formrelay::telemetry::init();
//!
//!     let app = Application::new(config)?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await
//! }
//! ```

use axum::Router;
use axum::extract::DefaultBodyLimit;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

pub mod api;
pub mod config;
pub mod document;
pub mod errors;
pub mod reporter;
pub mod storage;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::Config;
pub use errors::{Error, Result};

use storage::StorageProvider;

/// Shared per-request state: the configuration loaded at startup and the
/// storage provider behind the trait seam.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub storage: Arc<dyn StorageProvider>,
}

/// Permissive CORS: the form is served from arbitrary origins and the relay
/// carries no end-user authentication.
fn create_cors_layer() -> CorsLayer {
    CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
}

/// Build the application router: the two API routes, a body limit sized
/// above the upload cap (the handler enforces the precise limit itself so it
/// can answer with a JSON 413), CORS, and request tracing.
pub fn build_router(state: AppState) -> Router {
    let body_limit = (state.config.max_upload_bytes as usize).saturating_mul(2);
    api::routes()
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(create_cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub struct Application {
    router: Router,
    config: Arc<Config>,
}

impl Application {
    /// Create an application instance backed by the real Google Drive client.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let storage = storage::create_provider()?;
        Ok(Self::with_storage(config, storage))
    }

    /// Create an application instance with an explicit storage provider.
    /// Tests use this to substitute a recording stub.
    pub fn with_storage(config: Config, storage: Arc<dyn StorageProvider>) -> Self {
        let config = Arc::new(config);
        let state = AppState {
            config: config.clone(),
            storage,
        };
        Self {
            router: build_router(state),
            config,
        }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Start serving until the shutdown future resolves.
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("contract relay listening on http://{bind_addr}");

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}
