//! REST API server module
//!
//! Exposes batch resolution over HTTP. Progress is streamed back as NDJSON
//! while the batch runs; results are persisted once it ends.

use crate::{Resolver, Result};
use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use std::future::Future;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router
///
/// # Routes
///
/// - `POST /api/v1/resolve` - Resolve a batch, streaming NDJSON progress
/// - `GET /api/v1/health` - Liveness check
/// - `GET /api/v1/openapi.json` - OpenAPI specification
pub fn create_router(resolver: Resolver) -> Router {
    let api_config = resolver.config().server.api.clone();
    let state = AppState::new(resolver);

    let api = Router::new()
        .route("/resolve", post(routes::resolve_links))
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        .with_state(state);

    // Auth is innermost so that CORS preflights are answered without a key
    let api = if api_config.api_key.is_some() {
        api.layer(middleware::from_fn_with_state(
            api_config.api_key.clone(),
            auth::require_api_key,
        ))
    } else {
        api
    };

    let router = Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http());

    if api_config.cors_enabled {
        router.layer(build_cors_layer(&api_config.cors_origins))
    } else {
        router
    }
}

/// Build a CORS layer from the configured origins ("*" allows any)
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address
///
/// Runs until the server fails; see [`serve`] for a stoppable variant.
///
/// # Example
///
/// ```no_run
/// use link_resolver::{Config, Resolver};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let resolver = Resolver::new(Config::default())?;
/// link_resolver::api::start_api_server(resolver).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(resolver: Resolver) -> Result<()> {
    let bind_address = resolver.config().server.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    serve(listener, resolver, std::future::pending()).await
}

/// Serve the API on `listener` until `shutdown` completes
///
/// In-flight progress streams are allowed to finish before this returns.
pub async fn serve<F>(listener: TcpListener, resolver: Resolver, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(address) = listener.local_addr() {
        tracing::info!(address = %address, "API server listening");
    }

    let app = create_router(resolver);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
