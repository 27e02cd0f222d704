//! HTTP JSON API over the relational store.
//!
//! Axum router exposing the server catalog and the caller's connection
//! history. Callers identify themselves with the `x-tunnelsim-user` header.

pub mod error;
mod handlers;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::store::Storage;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
}

/// API routes, mounted under `/api`.
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/servers", get(handlers::list_servers))
        .route("/connection-history", get(handlers::connection_history))
        .route("/connect", post(handlers::connect))
        .route("/disconnect", post(handlers::disconnect))
}

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", api_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The API server.
pub struct ApiServer {
    bind: SocketAddr,
    state: AppState,
}

impl ApiServer {
    pub fn new(bind: SocketAddr, storage: Arc<dyn Storage>) -> Self {
        Self {
            bind,
            state: AppState { storage },
        }
    }

    /// Serves until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot bind or the server fails.
    pub async fn run<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.bind).await?;
        info!("API listening on http://{}", listener.local_addr()?);

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("API server stopped");
        Ok(())
    }
}
