mod handlers;
mod state;

use axum::http::{header, HeaderValue};
use axum::routing::get;
use axum::Router;
use state::AppState;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{info, warn};

use crate::location::LocationResolver;

pub fn build_router(resolver: LocationResolver) -> Router {
    let state = Arc::new(AppState { resolver });

    Router::new()
        .route("/api/status", get(handlers::status))
        .route("/api/autocomplete", get(handlers::autocomplete))
        .route("/api/select", get(handlers::select))
        .route("/api/click", get(handlers::click))
        .route("/api/timezone", get(handlers::timezone))
        .route("/api/format", get(handlers::format_address))
        .route("/api/typed", get(handlers::typed))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start(host: &str, port: u16, resolver: LocationResolver) -> std::io::Result<()> {
    let provider = resolver.provider_name().to_string();
    let available = resolver.is_available();
    let app = build_router(resolver);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(%addr, %provider, available, "venue locator listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
