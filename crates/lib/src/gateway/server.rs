//! Gateway HTTP server (single port) and the wiring of serial link, store, and channels.

use crate::background::Background;
use crate::channels::{ConfigFileChannels, Notifier, SenderRegistry};
use crate::config::{self, Config};
use crate::gateway::protocol::{
    ApiError, MessagesQuery, SendSmsRequest, SendSmsResponse, SetFlymodeRequest,
};
use crate::modem::{CommandError, ModemService};
use crate::serial;
use crate::store::JsonMessageStore;
use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncWrite};

const DEFAULT_MESSAGE_LIMIT: usize = 50;
const MAX_MESSAGE_LIMIT: usize = 500;

/// Shared state for the HTTP handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    pub modem: Arc<ModemService>,
    /// When Some, /api requests must carry `Authorization: Bearer <token>`.
    pub required_token: Option<String>,
}

/// When auth mode is token and a token is configured, returns it for request validation.
fn require_api_token(config: &Config) -> Option<String> {
    if config.gateway.auth.mode == config::GatewayAuthMode::Token {
        config::resolve_gateway_token(config)
    } else {
        None
    }
}

/// Open the configured serial device and run the gateway on it until shutdown (Ctrl+C / SIGTERM).
pub async fn run_gateway(config: Config, config_path: PathBuf) -> Result<()> {
    let device = config::resolve_serial_device(&config).context(
        "no serial device configured (set serial.device in the config or SMSGATE_SERIAL_DEVICE)",
    )?;
    let baud_rate = config.serial.baud_rate;
    let (reader, writer) = serial::open_device(&device, baud_rate)
        .await
        .with_context(|| format!("opening serial device {}", device.display()))?;
    log::info!("serial link opened on {} at {} baud", device.display(), baud_rate);
    serve(config, config_path, reader, writer).await
}

/// Run the gateway over an already-open link: `reader` yields module output, `writer` takes commands.
/// When bind is not loopback, a gateway token must be configured or startup fails.
pub async fn serve<R, W>(config: Config, config_path: PathBuf, reader: R, writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let bind = config.gateway.bind.trim().to_string();
    if !config::is_loopback_bind(&bind) {
        let token = config::resolve_gateway_token(&config);
        if token.is_none() || config.gateway.auth.mode != config::GatewayAuthMode::Token {
            anyhow::bail!(
                "refusing to bind gateway to {} without auth (set gateway.auth.mode to \"token\" and gateway.auth.token or SMSGATE_GATEWAY_TOKEN)",
                bind
            );
        }
    }

    let storage_path = config::resolve_storage_path(&config, &config_path);
    let store = JsonMessageStore::open(&storage_path)
        .await
        .with_context(|| format!("opening message store {}", storage_path.display()))?;
    let senders = SenderRegistry::with_defaults().context("building notification HTTP client")?;
    let notifier = Arc::new(Notifier::new(
        Arc::new(ConfigFileChannels::new(&config_path)),
        senders,
    ));

    let background = Background::tracked();
    let (commands, writer_task) = serial::spawn_writer(writer);
    let modem = Arc::new(
        ModemService::new(Arc::new(store), notifier, commands, background.clone())
            .with_command_timeout(Duration::from_secs(config.serial.command_timeout_secs)),
    );

    let message_router = modem.router();
    let decode_task = tokio::spawn(async move {
        if let Err(e) = serial::run_decode_loop(reader, &message_router).await {
            log::error!("serial: decode loop failed: {}", e);
        }
    });
    modem.request_status_update();

    let state = GatewayState {
        config: Arc::new(config.clone()),
        modem,
        required_token: require_api_token(&config),
    };
    let app = router(state);

    let bind_addr = format!("{}:{}", bind, config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;

    decode_task.abort();
    background.wait_idle().await;
    writer_task.abort();
    log::info!("gateway stopped");
    Ok(())
}

/// HTTP routes over `state`.
pub fn router(state: GatewayState) -> Router {
    let api = Router::new()
        .route("/serial/sms", post(send_sms))
        .route("/serial/status", get(device_status))
        .route("/serial/flymode", post(set_flymode))
        .route("/serial/reboot", post(reboot))
        .route("/messages", get(list_messages))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

    Router::new()
        .route("/", get(health_http))
        .nest("/api", api)
        .with_state(state)
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining background work");
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (status, Json(ApiError::new(error))).into_response()
}

fn command_error_response(e: CommandError) -> Response {
    let status = match e {
        CommandError::Invalid(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, e.to_string())
}

/// Rejects /api requests without the configured bearer token.
async fn require_token(State(state): State<GatewayState>, req: Request, next: Next) -> Response {
    if let Some(ref expected) = state.required_token {
        let provided = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .unwrap_or("");
        if provided != expected.as_str() {
            return error_response(StatusCode::UNAUTHORIZED, "missing or invalid token");
        }
    }
    next.run(req).await
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "port": state.config.gateway.port,
    }))
}

/// POST /api/serial/sms: queue an SMS; answers with the request id the send result will carry.
async fn send_sms(
    State(state): State<GatewayState>,
    body: Result<Json<SendSmsRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(req)) = body else {
        return error_response(StatusCode::BAD_REQUEST, "invalid request body");
    };
    match state.modem.send_sms(&req.to, &req.content).await {
        Ok(request_id) => Json(SendSmsResponse { request_id }).into_response(),
        Err(e) => {
            log::error!("api: send sms failed: {}", e);
            command_error_response(e)
        }
    }
}

/// GET /api/serial/status: cached module state; also asks the module for a fresh report.
async fn device_status(State(state): State<GatewayState>) -> Response {
    state.modem.request_status_update();
    Json(state.modem.device().snapshot()).into_response()
}

/// POST /api/serial/flymode: waits for the module to confirm.
async fn set_flymode(
    State(state): State<GatewayState>,
    body: Result<Json<SetFlymodeRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(req)) = body else {
        return error_response(StatusCode::BAD_REQUEST, "invalid request body");
    };
    match state.modem.set_flymode(req.enabled).await {
        Ok(()) => {
            state.modem.request_status_update();
            Json(json!({})).into_response()
        }
        Err(e) => {
            log::error!("api: set flymode failed: {}", e);
            command_error_response(e)
        }
    }
}

/// POST /api/serial/reboot
async fn reboot(State(state): State<GatewayState>) -> Response {
    match state.modem.reboot().await {
        Ok(()) => Json(json!({})).into_response(),
        Err(e) => {
            log::error!("api: reboot failed: {}", e);
            command_error_response(e)
        }
    }
}

/// GET /api/messages?limit=N: newest first.
async fn list_messages(
    State(state): State<GatewayState>,
    Query(query): Query<MessagesQuery>,
) -> Response {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_MESSAGE_LIMIT)
        .clamp(1, MAX_MESSAGE_LIMIT);
    match state.modem.store().list(limit).await {
        Ok(records) => Json(records).into_response(),
        Err(e) => {
            log::error!("api: listing messages failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
