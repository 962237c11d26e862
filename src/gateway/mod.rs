//! Axum-based HTTP boundary for the authenticator.
//!
//! Exposes the authentication contract to browser and local clients:
//! - `GET /{token}` logs in with a URL-embedded transport token, then
//!   redirects to `/` so the token leaves the visible URL
//! - JSON endpoints under `/api/auth/*` for key, token, and demo logins
//! - Request body limits (64KB) and timeouts on every route

pub mod route;

pub use route::{extract_candidate_token, resolve_route, RouteOutcome};

use crate::auth::{Authenticator, SessionMonitor};
use crate::config::Config;
use anyhow::Result;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Redirect},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Maximum request body size (64KB).
pub const MAX_BODY_SIZE: usize = 65_536;
/// Request timeout. Every handler is local storage I/O.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<Authenticator>,
}

type AuthResponse = (StatusCode, Json<serde_json::Value>);

#[derive(Deserialize)]
struct KeyLoginBody {
    key: String,
}

#[derive(Deserialize)]
struct TokenLoginBody {
    token: String,
}

#[derive(Deserialize)]
struct DemoLoginBody {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct DemoRegisterBody {
    email: String,
    password: String,
    name: String,
}

/// Whether `host` would expose the gateway beyond this machine.
pub fn is_public_bind(host: &str) -> bool {
    !matches!(host, "127.0.0.1" | "localhost" | "::1" | "[::1]")
}

/// Build the router. Split out from [`run_gateway`] so tests can drive it
/// without a socket.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/api/auth/status", get(handle_status))
        .route("/api/auth/login", post(handle_key_login))
        .route("/api/auth/token", post(handle_token_login))
        .route("/api/auth/demo/login", post(handle_demo_login))
        .route("/api/auth/demo/register", post(handle_demo_register))
        .route("/api/auth/logout", post(handle_logout))
        .route("/{token}", get(handle_token_route))
        .with_state(state)
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        ))
}

/// Serve the gateway until Ctrl-C.
pub async fn run_gateway(
    host: &str,
    port: u16,
    config: &Config,
    auth: Arc<Authenticator>,
) -> Result<()> {
    if is_public_bind(host) && !config.gateway.allow_public_bind {
        anyhow::bail!(
            "Refusing to bind to {host}: the gateway would be reachable from other machines.\n\
             Fix: use --host 127.0.0.1 (default), or set\n\
             [gateway] allow_public_bind = true in config.toml."
        );
    }

    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_port = listener.local_addr()?.port();

    let monitor = SessionMonitor::spawn(auth.clone(), config.auth.recheck_interval());
    let app = build_router(AppState { auth });

    tracing::info!("Gateway listening on http://{host}:{actual_port}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down gateway");
        })
        .await?;

    monitor.shutdown().await;
    Ok(())
}

// ══════════════════════════════════════════════════════════════════════════════
// AXUM HANDLERS
// ══════════════════════════════════════════════════════════════════════════════

fn status_response(state: &AppState, code: StatusCode) -> AuthResponse {
    let status = state.auth.status();
    (code, Json(serde_json::json!(status)))
}

fn error_response(code: StatusCode, message: &str) -> AuthResponse {
    (code, Json(serde_json::json!({ "error": message })))
}

fn invalid_body(e: &JsonRejection) -> AuthResponse {
    error_response(StatusCode::BAD_REQUEST, &format!("Invalid request: {e}"))
}

/// GET / — application root; reports the current state.
async fn handle_root(State(state): State<AppState>) -> AuthResponse {
    status_response(&state, StatusCode::OK)
}

/// GET /health — always public
async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /api/auth/status
async fn handle_status(State(state): State<AppState>) -> AuthResponse {
    status_response(&state, StatusCode::OK)
}

/// POST /api/auth/login
async fn handle_key_login(
    State(state): State<AppState>,
    body: Result<Json<KeyLoginBody>, JsonRejection>,
) -> AuthResponse {
    let body = match body {
        Ok(Json(b)) => b,
        Err(e) => return invalid_body(&e),
    };

    if state.auth.login(&body.key) {
        status_response(&state, StatusCode::OK)
    } else {
        error_response(StatusCode::UNAUTHORIZED, "Invalid access key")
    }
}

/// POST /api/auth/token
async fn handle_token_login(
    State(state): State<AppState>,
    body: Result<Json<TokenLoginBody>, JsonRejection>,
) -> AuthResponse {
    let body = match body {
        Ok(Json(b)) => b,
        Err(e) => return invalid_body(&e),
    };

    if state.auth.login_with_hex(&body.token) {
        status_response(&state, StatusCode::OK)
    } else {
        error_response(StatusCode::UNAUTHORIZED, "Invalid or expired link")
    }
}

/// POST /api/auth/demo/login
async fn handle_demo_login(
    State(state): State<AppState>,
    body: Result<Json<DemoLoginBody>, JsonRejection>,
) -> AuthResponse {
    let body = match body {
        Ok(Json(b)) => b,
        Err(e) => return invalid_body(&e),
    };

    if state.auth.login_demo(&body.email, &body.password) {
        status_response(&state, StatusCode::OK)
    } else {
        error_response(StatusCode::UNAUTHORIZED, "Invalid email or password")
    }
}

/// POST /api/auth/demo/register
async fn handle_demo_register(
    State(state): State<AppState>,
    body: Result<Json<DemoRegisterBody>, JsonRejection>,
) -> AuthResponse {
    let body = match body {
        Ok(Json(b)) => b,
        Err(e) => return invalid_body(&e),
    };

    if state
        .auth
        .register_demo(&body.email, &body.password, &body.name)
    {
        status_response(&state, StatusCode::OK)
    } else {
        error_response(StatusCode::CONFLICT, "Email is already registered")
    }
}

/// POST /api/auth/logout
async fn handle_logout(State(state): State<AppState>) -> AuthResponse {
    state.auth.logout();
    status_response(&state, StatusCode::OK)
}

/// GET /{token} — URL login. Always lands on `/` so the token never stays
/// in the address bar; `/` reports whether it worked.
async fn handle_token_route(
    State(state): State<AppState>,
    Path(segment): Path<String>,
) -> Redirect {
    let path = format!("/{segment}");
    match resolve_route(&state.auth, &path) {
        RouteOutcome::RedirectToRoot => tracing::info!("URL token accepted"),
        RouteOutcome::Authenticated | RouteOutcome::LoginRequired => {}
    }
    Redirect::to("/")
}
