use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::api;
use crate::auth;
use crate::config::{AppConfig, ServerConfig};
use crate::error::ApiError;
use crate::state::sqlite::SqliteStateStore;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SqliteStateStore>,
    pub config: Arc<AppConfig>,
}

/// Authenticated user id, inserted into request extensions by
/// `require_access_token`.
#[derive(Debug, Clone, Copy)]
pub struct AuthedUser(pub i64);

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/signup", post(api::auth::signup))
        .route("/login", post(api::auth::login))
        .route("/token/refresh", post(api::auth::refresh_access_token))
        .route("/verify-token", post(api::auth::verify_token))
        .route("/logout", post(api::auth::logout));

    let user_routes = Router::new().route(
        "/me",
        get(api::users::get_profile)
            .patch(api::users::update_profile)
            .delete(api::users::delete_account),
    );

    let connection_routes = Router::new()
        .route("/", get(api::connections::list_connections))
        .route("/create", post(api::connections::create_connection))
        .route("/id/:id", get(api::connections::connection_details))
        .route("/edit/:id", put(api::connections::update_connection))
        .route("/:id", delete(api::connections::delete_connection))
        .route("/search/:query", get(api::connections::search_connections))
        .route("/:id/reached-out", post(api::connections::mark_reached_out));

    let protected = Router::new()
        .nest("/api/users", user_routes)
        .nest("/api/connections", connection_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_access_token,
        ));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api/auth", auth_routes)
        .merge(protected)
        .with_state(state)
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

// ---------------------------------------------------------------------------
// Auth middleware
// ---------------------------------------------------------------------------

async fn require_access_token(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user_id = auth::bearer_token(request.headers())
        .and_then(|token| auth::verify_access_token(&state.config.auth, token))
        .ok_or(ApiError::Unauthorized)?;

    request.extensions_mut().insert(AuthedUser(user_id));
    Ok(next.run(request).await)
}

// ---------------------------------------------------------------------------
// Startup
// ---------------------------------------------------------------------------

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    info!("Initializing state...");
    let store = Arc::new(SqliteStateStore::new(&config.state.db_path).await?);
    let state = AppState {
        store,
        config: Arc::new(config),
    };

    let cors = build_cors(&state.config.server);
    let app = build_router(state.clone()).layer(cors);

    let address = format!("{}:{}", state.config.server.bind, state.config.server.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

fn build_cors(server: &ServerConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    if server.allowed_origins.is_empty() {
        // Credentials (the refresh cookie) are only honored for explicitly
        // configured origins.
        cors.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = server
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        cors.allow_origin(origins).allow_credentials(true)
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
