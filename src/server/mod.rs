//! HTTP surface of the agent.
//!
//! Two endpoints under `/cluster/api/v1.0`:
//! - `POST /join` trades a join token for the node's credential bundle
//! - `POST /configure` applies a configuration document, gated by the
//!   callback token
//!
//! The agent core is synchronous; handlers hand each call to the blocking
//! pool.

pub mod extract;
pub mod protocol;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{ConnectInfo, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::json;
use tracing::{error, info, warn};

use crate::agent::Agent;
use crate::config::ResolvedSettings;
use crate::credentials::CredentialBundle;
use crate::{Error, Result};

pub use extract::{FormBody, JsonOrForm};
pub use protocol::{ConfigureRequest, JoinRequest, PortField};

/// Prefix every route is served under.
pub const API_BASE: &str = "/cluster/api/v1.0";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<Agent>,
}

/// Error response of a handler.
#[derive(Debug)]
pub enum ApiError {
    /// The body could not be read or decoded.
    BadRequest(String),
    Agent(Error),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError::Agent(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(reason) => {
                warn!(reason = %reason, "rejected request body");
                (StatusCode::BAD_REQUEST, reason)
            }
            ApiError::Agent(Error::InvalidCredential) => {
                warn!("request with invalid token");
                (StatusCode::UNAUTHORIZED, Error::InvalidCredential.to_string())
            }
            ApiError::Agent(e @ (Error::InvalidDocument(_) | Error::InvalidInput(_))) => {
                warn!(error = %e, "rejected configuration");
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            // Paths and command lines stay in the log
            ApiError::Agent(e) => {
                error!(error = %e, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Build the API router.
pub fn router(agent: Arc<Agent>) -> Router {
    let api = Router::new()
        .route("/join", post(join))
        .route("/configure", post(configure));

    Router::new()
        .nest(API_BASE, api)
        .with_state(AppState { agent })
}

/// Serve the API until Ctrl-C.
pub async fn start_server(settings: &ResolvedSettings, agent: Arc<Agent>) -> Result<()> {
    let addr = settings.bind_address()?;
    let app = router(agent);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        %addr,
        listen_source = %settings.listen.source,
        port_source = %settings.port.source,
        "cluster agent listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("cluster agent stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

/// Run a synchronous agent call on the blocking pool.
async fn blocking<T, F>(call: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(call)
        .await
        .map_err(|e| Error::Other(format!("agent task failed: {}", e)))?
}

async fn join(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    JsonOrForm(request): JsonOrForm<JoinRequest>,
) -> std::result::Result<Json<CredentialBundle>, ApiError> {
    let observed = peer.ip().to_canonical().to_string();
    info!(hostname = %request.hostname, %observed, "join request");

    let agent = state.agent.clone();
    let bundle =
        blocking(move || agent.join(&request.token, &request.hostname, &observed)).await?;
    Ok(Json(bundle))
}

async fn configure(
    State(state): State<AppState>,
    JsonOrForm(request): JsonOrForm<ConfigureRequest>,
) -> std::result::Result<Json<serde_json::Value>, ApiError> {
    info!("configure request");

    let agent = state.agent.clone();
    blocking(move || agent.configure(&request.callback, request.document)).await?;
    Ok(Json(json!({ "result": "ok" })))
}
