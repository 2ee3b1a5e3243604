pub mod handlers;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

pub use handlers::ApiState;

/// The full HTTP surface, with every route nested under `/api`.
pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/status", get(handlers::handle_status))
        .route(
            "/endpoints",
            get(handlers::handle_endpoints_list).post(handlers::handle_endpoints_add),
        )
        .route("/endpoints/remove", post(handlers::handle_endpoints_remove))
        .route("/endpoints/save", post(handlers::handle_endpoints_save))
        .route("/endpoints/reload", post(handlers::handle_endpoints_reload))
        .route("/servers", get(handlers::handle_servers))
        .route("/servers/cached", get(handlers::handle_servers_cached))
        .route("/online", get(handlers::handle_online))
        .route("/prune", post(handlers::handle_prune))
        .route("/daemon/shutdown", post(handlers::handle_shutdown))
        .with_state(state);

    Router::new().nest("/api", api_routes).layer(cors)
}

pub async fn serve(state: ApiState, port: u16) -> anyhow::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!(port, "API listening on 127.0.0.1");
    axum::serve(listener, app).await?;
    Ok(())
}
