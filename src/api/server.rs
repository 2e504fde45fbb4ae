//! HTTP server implementation

use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::handlers::AppState;
use crate::api::routes;
use crate::Result;

/// Start the API server with pre-built application state.
///
/// State construction happens at startup in the caller so a store that
/// failed to connect leaves the service running with retrieval disabled
/// instead of aborting here.
pub async fn serve_api(state: AppState, host: &str, port: u16, enable_cors: bool) -> Result<()> {
    info!("Starting ragline API server...");

    if state.store.is_none() {
        info!("Knowledge store not connected - retrieval and upsert are disabled");
    }

    let mut app = Router::new()
        .nest("/api", routes::api_routes(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new());

    if enable_cors {
        info!("CORS enabled");
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("API server listening on http://{addr}");
    info!("Available endpoints:");
    info!("  GET  /api/health               - Health check");
    info!("  POST /api/assistant            - Assistant message");
    info!("  POST /api/assistant/knowledge  - Add knowledge document");
    info!("  GET  /api/debug/inference      - Provider diagnostics");
    info!("  GET  /api/stats                - Corpus statistics");

    axum::serve(listener, app).await?;

    Ok(())
}
