use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::error_handling::HandleErrorLayer;
use axum::routing::get;
use keygate::LimiterConfig;
use keygate::Registry;
use tower::BoxError;
use tower::ServiceBuilder;
use tower_keygate::AdmissionLayer;
use tower_keygate::PeerIp;
use tower_keygate::handle_error;
use tower_keygate::spawn_sweeper;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // 1. One token bucket per client address
    let registry = Arc::new(Registry::new(LimiterConfig::default_token_bucket())?);

    // 2. Drop limiters of clients idle for ten minutes
    let _sweeper = spawn_sweeper(
        registry.clone(),
        Duration::from_secs(60),
        Duration::from_secs(600),
    );

    // 3. Build the Router
    let app = Router::new()
        .route("/", get(|| async { "Request allowed!" }))
        .layer(
            ServiceBuilder::new()
                // The outermost layer: catches BoxError and returns Response
                .layer(HandleErrorLayer::new(handle_error))
                .layer(AdmissionLayer::new(registry, PeerIp))
                // Converts the Route's Infallible to BoxError
                .map_err(BoxError::from),
        );

    // 4. Serve, recording peer addresses for PeerIp
    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
    tracing::info!("listening on http://127.0.0.1:3000");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
