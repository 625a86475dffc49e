use std::{fs, net::SocketAddr, path::PathBuf};

use axum::{
    Router,
    middleware,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use super::{
    auth::{auth_middleware, load_or_create_token},
    rpc::{
        blob_upload, config_get, message_get, sandbox_list, thread_create, thread_delete, thread_get,
        thread_list, thread_load_messages, thread_update,
    },
    state::GatewayState,
    ws::ws_handler,
};

const DEFAULT_PORT: u16 = 18790;
const MAX_PORT_ATTEMPTS: u16 = 10;

/// Path to the PID file written on daemon start.
pub fn pid_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".agentstart")
        .join("daemon.pid")
}

/// Start the HTTP gateway daemon, binding to `127.0.0.1` starting at port
/// [`DEFAULT_PORT`]. If that port is taken, increments up to
/// [`MAX_PORT_ATTEMPTS`] times before returning an error.
///
/// Writes `daemon.pid` on successful bind. Blocks until the server shuts down.
pub async fn start_gateway(state: GatewayState) -> Result<(), String> {
    // Ensure the token exists before accepting connections.
    load_or_create_token()?;

    let protected = Router::new()
        .route("/api/v1/rpc/thread.list", post(thread_list))
        .route("/api/v1/rpc/thread.create", post(thread_create))
        .route("/api/v1/rpc/thread.get", post(thread_get))
        .route("/api/v1/rpc/thread.update", post(thread_update))
        .route("/api/v1/rpc/thread.delete", post(thread_delete))
        .route("/api/v1/rpc/thread.loadMessages", post(thread_load_messages))
        .route("/api/v1/rpc/message.get", post(message_get))
        .route("/api/v1/rpc/blob.upload", post(blob_upload))
        .route("/api/v1/rpc/config.get", get(config_get))
        .route("/api/v1/rpc/sandbox.list", post(sandbox_list))
        .route("/api/v1/ws", get(ws_handler))
        .layer(middleware::from_fn(auth_middleware))
        .with_state(state);

    let public = Router::new().route("/api/v1/health", get(health));

    let app = Router::new()
        .merge(public)
        .merge(protected)
        .layer(CorsLayer::permissive()); // host embedding this runtime restricts origins at its own reverse proxy

    let listener = bind_with_fallback(DEFAULT_PORT).await?;
    let addr = listener.local_addr().map_err(|e| e.to_string())?;

    write_pid_file(addr.port())?;
    tracing::info!(%addr, "gateway daemon listening");

    axum::serve(listener, app).await.map_err(|e| format!("daemon error: {e}"))
}

async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok", "service": "agentstart-daemon" }))
}

async fn bind_with_fallback(start_port: u16) -> Result<TcpListener, String> {
    for offset in 0..MAX_PORT_ATTEMPTS {
        let port = start_port + offset;
        let addr: SocketAddr = format!("127.0.0.1:{port}").parse().expect("valid addr");
        match TcpListener::bind(addr).await {
            Ok(listener) => return Ok(listener),
            Err(_) if offset + 1 < MAX_PORT_ATTEMPTS => continue,
            Err(e) => {
                return Err(format!(
                    "could not bind to any port in {start_port}–{}: {e}",
                    start_port + MAX_PORT_ATTEMPTS - 1
                ));
            }
        }
    }
    unreachable!()
}

fn write_pid_file(port: u16) -> Result<(), String> {
    let path = pid_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| format!("failed to create .agentstart dir: {e}"))?;
    }
    let content = format!("{}\n{}\n", std::process::id(), port);
    fs::write(&path, content).map_err(|e| format!("failed to write PID file: {e}"))
}
