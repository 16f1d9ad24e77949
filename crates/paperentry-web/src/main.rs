use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

mod handlers;
mod models;
mod state;
mod template;
mod upload;

use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("paperentry_core=info,paperentry_web=info,tower_http=info")
            }),
        )
        .init();

    let config = paperentry_core::Config::resolve();
    tracing::debug!(?config, "resolved configuration");

    let capability = config.build_capability()?;
    let addr: SocketAddr = config
        .bind
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address {:?}: {}", config.bind, e))?;

    // Room for the document plus multipart framing.
    let body_limit =
        axum::extract::DefaultBodyLimit::max(config.max_document_bytes() + 1024 * 1024);

    let state = Arc::new(AppState { config, capability });

    let app = axum::Router::new()
        .route("/", axum::routing::get(handlers::index::index))
        .route(
            "/convert/stream",
            axum::routing::post(handlers::stream::stream),
        )
        .route("/health", axum::routing::get(handlers::health::health))
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("Listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
