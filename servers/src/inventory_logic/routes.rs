use crate::inventory_logic::config::Config;
use crate::inventory_logic::state::AppState;
use crate::inventory_logic::{agenda, articles, personal, postits, pubs, stats, ws};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
};
use std::net::SocketAddr;
use tokio::sync::broadcast;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

pub async fn run(config: Config, app_state: AppState, mut shutdown: broadcast::Receiver<()>) -> anyhow::Result<()> {
    let app = app(app_state, config.cors_origins(), config.body_limit());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port()));
    log::info!("Inventory server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.recv().await.ok();
            log::info!("Inventory server shutting down.");
        })
        .await?;
    Ok(())
}

/// The full application: `/api` routes, body size cap, CORS, shared state.
pub fn app(app_state: AppState, cors_origins: &str, body_limit: usize) -> Router {
    Router::new()
        .nest("/api", api())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer(cors_origins))
        .with_state(app_state)
}

fn api() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws::ws_handler))
        .route("/articles", get(articles::list).post(articles::create))
        .route("/articles/public", get(articles::list_public))
        .route("/articles/generate-sku", get(articles::generate_sku))
        .route("/articles/{id}", put(articles::update).delete(articles::remove))
        .route("/articles/{id}/quantity", post(articles::adjust_quantity))
        .route("/articles/{id}/view", post(stats::track_view))
        .route("/stats/articles", get(stats::article_stats))
        .route("/memo", get(personal::get_memo).put(personal::put_memo))
        .route("/todos", get(personal::get_todos).put(personal::put_todos))
        .route("/postits", get(postits::list).post(postits::create))
        .route("/postits/{id}", axum::routing::delete(postits::remove))
        .route("/postits/{id}/check", post(postits::check))
        .route("/agenda", get(agenda::list).post(agenda::create))
        .route("/agenda/{id}", axum::routing::delete(agenda::remove))
        .route("/pubs", get(pubs::list_active).post(pubs::create))
        .route("/pubs/{id}", axum::routing::delete(pubs::remove))
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// `*` allows any origin; otherwise a comma separated allow-list.
pub fn cors_layer(origins: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.trim() == "*" {
        return layer.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                log::warn!("Ignoring invalid CORS origin '{}'", o);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}
