use std::{net::SocketAddr, sync::Arc};

use {
    axum::{
        Router,
        extract::State,
        http::header,
        response::{IntoResponse, Json},
        routing::{get, post},
    },
    tower_http::{
        cors::{Any, CorsLayer},
        trace::TraceLayer,
    },
    tracing::{debug, info, warn},
};

use {
    hubgate_client::XmlRpcClient,
    hubgate_config::HubgateConfig,
    hubgate_protocol::{Fault, wire},
    hubgate_sessions::SessionStore,
};

use crate::{codec::MethodCodec, handlers::HandlerRegistry, state::GatewayState};

/// The single inbound XML-RPC endpoint.
pub const RPC_PATH: &str = "/hub/rpc/api";

// ── Shared app state ─────────────────────────────────────────────────────────

#[derive(Clone)]
struct AppState {
    gateway: Arc<GatewayState>,
    codec: Arc<MethodCodec>,
    handlers: Arc<HandlerRegistry>,
}

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the gateway router (shared between production startup and tests).
pub fn build_gateway_app(
    gateway: Arc<GatewayState>,
    codec: Arc<MethodCodec>,
    handlers: Arc<HandlerRegistry>,
) -> Router {
    let app_state = AppState {
        gateway,
        codec,
        handlers,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route(RPC_PATH, post(rpc_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Start the gateway HTTP server.
pub async fn start_gateway(config: &HubgateConfig) -> anyhow::Result<()> {
    let executor = Arc::new(XmlRpcClient::new(
        config.hub.connect_timeout(),
        config.hub.request_timeout(),
    )?);
    let sessions = Arc::new(SessionStore::new());
    let state = GatewayState::new(config.hub.api_url.clone(), executor, sessions);
    let codec = Arc::new(MethodCodec::with_default_routes());
    let handlers = Arc::new(HandlerRegistry::new());

    let app = build_gateway_app(Arc::clone(&state), codec, handlers);

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(version = %state.version, hub = %state.hub_url, %addr, path = RPC_PATH, "gateway listening");

    axum::serve(listener, app).await?;
    Ok(())
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn rpc_handler(State(app): State<AppState>, body: String) -> impl IntoResponse {
    let xml = process_call(&app, &body).await;
    ([(header::CONTENT_TYPE, "text/xml; charset=utf-8")], xml)
}

/// Decode, route, dispatch, encode. Decode errors are serialized as
/// faults like any other error — nothing bypasses fault formatting.
async fn process_call(app: &AppState, body: &str) -> String {
    let request_id = uuid::Uuid::new_v4();

    let call = match wire::parse_call(body) {
        Ok(call) => call,
        Err(fault) => {
            warn!(%request_id, code = fault.code, "malformed request envelope");
            return wire::encode_fault(&fault);
        },
    };

    let handler = app.codec.resolve(&call.method);
    let Some(parser) = app.codec.parser_for(&handler) else {
        warn!(%request_id, method = %call.method, "method not found");
        return wire::encode_fault(&Fault::method_not_found(&call.method));
    };

    let request = match parser(&call) {
        Ok(request) => request,
        Err(fault) => {
            warn!(%request_id, method = %call.method, code = fault.code, "argument decode failed");
            return wire::encode_fault(&fault);
        },
    };

    debug!(%request_id, method = %call.method, handler = %handler, "dispatching call");
    match app
        .handlers
        .dispatch(Arc::clone(&app.gateway), &handler, request)
        .await
    {
        Ok(value) => wire::encode_response(&value),
        Err(err) => {
            let fault = err.to_fault();
            warn!(%request_id, method = %call.method, code = fault.code, "call failed");
            wire::encode_fault(&fault)
        },
    }
}

async fn health_handler(State(app): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": app.gateway.version,
        "hub": app.gateway.hub_url,
    }))
}
