//! Handler registry: the internal operations the codec routes to.

use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc};

use tracing::{debug, warn};

use {
    hubgate_protocol::{Fault, Value},
    hubgate_sessions::LoginMode,
};

use crate::{error::GatewayError, relay::LoginOutcome, request::Request, state::GatewayState};

pub type HandlerResult = Result<Value, GatewayError>;

/// A boxed async handler bound to one routing key.
pub type HandlerFn = Box<
    dyn Fn(Arc<GatewayState>, Request) -> Pin<Box<dyn Future<Output = HandlerResult> + Send>>
        + Send
        + Sync,
>;

/// Routing keys for the internal handlers. Explicit wire methods map to
/// these through casing normalization; the namespaced and fallback
/// routes are bound directly.
pub mod handler_names {
    pub const LOGIN: &str = "hub.Login";
    pub const LOGIN_AUTOCONNECT: &str = "hub.LoginWithAutoconnectMode";
    pub const LOGIN_AUTH_RELAY: &str = "hub.LoginWithAuthRelayMode";
    pub const LOGOUT: &str = "hub.Logout";
    pub const ATTACH_TO_SERVERS: &str = "hub.AttachToServers";
    pub const LIST_SERVER_IDS: &str = "hub.ListServerIds";
    pub const MULTICAST: &str = "gateway.Multicast";
    pub const UNICAST: &str = "gateway.Unicast";
    pub const PROXY: &str = "gateway.ProxyCallToHub";
}

pub struct HandlerRegistry {
    handlers: HashMap<String, HandlerFn>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            handlers: HashMap::new(),
        };
        registry.register_defaults();
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, handler: HandlerFn) {
        self.handlers.insert(name.into(), handler);
    }

    pub async fn dispatch(
        &self,
        state: Arc<GatewayState>,
        name: &str,
        request: Request,
    ) -> HandlerResult {
        let Some(handler) = self.handlers.get(name) else {
            warn!(handler = name, "no handler bound");
            return Err(Fault::method_not_found(name).into());
        };
        debug!(handler = name, "dispatching");
        handler(state, request).await
    }

    fn register_defaults(&mut self) {
        self.register_login(handler_names::LOGIN, LoginMode::Manual);
        self.register_login(handler_names::LOGIN_AUTOCONNECT, LoginMode::Autoconnect);
        self.register_login(handler_names::LOGIN_AUTH_RELAY, LoginMode::AuthRelay);

        self.register(
            handler_names::LOGOUT,
            Box::new(|state, request| {
                Box::pin(async move {
                    let Request::SessionKey(req) = request else {
                        return Err(mismatch());
                    };
                    state.services.relay.logout(&req.hub_session_key).await?;
                    Ok(Value::Int(1))
                })
            }),
        );

        self.register(
            handler_names::ATTACH_TO_SERVERS,
            Box::new(|state, request| {
                Box::pin(async move {
                    let Request::AttachToServers(req) = request else {
                        return Err(mismatch());
                    };
                    let result = state
                        .services
                        .relay
                        .attach_to_servers(
                            &req.hub_session_key,
                            &req.server_ids,
                            req.credentials.as_deref(),
                        )
                        .await?;
                    Ok(result.to_value())
                })
            }),
        );

        self.register(
            handler_names::LIST_SERVER_IDS,
            Box::new(|state, request| {
                Box::pin(async move {
                    let Request::SessionKey(req) = request else {
                        return Err(mismatch());
                    };
                    let ids = state
                        .services
                        .topology
                        .list_server_ids(&state.hub_url, &req.hub_session_key)
                        .await?;
                    Ok(Value::Array(ids.into_iter().map(Value::Int).collect()))
                })
            }),
        );

        self.register(
            handler_names::MULTICAST,
            Box::new(|state, request| {
                Box::pin(async move {
                    let Request::Multicast(req) = request else {
                        return Err(mismatch());
                    };
                    let result = state
                        .services
                        .multicaster
                        .multicast(&req.hub_session_key, &req.method, &req.args)
                        .await;
                    Ok(result.to_value())
                })
            }),
        );

        self.register(
            handler_names::UNICAST,
            Box::new(|state, request| {
                Box::pin(async move {
                    let Request::Unicast(req) = request else {
                        return Err(mismatch());
                    };
                    state
                        .services
                        .unicaster
                        .unicast(&req.hub_session_key, &req.method, req.server_id, &req.args)
                        .await
                })
            }),
        );

        self.register(
            handler_names::PROXY,
            Box::new(|state, request| {
                Box::pin(async move {
                    let Request::Proxy(req) = request else {
                        return Err(mismatch());
                    };
                    state
                        .services
                        .proxy
                        .proxy_call_to_hub(&req.method, &req.args)
                        .await
                })
            }),
        );
    }

    fn register_login(&mut self, name: &str, mode: LoginMode) {
        self.register(
            name,
            Box::new(move |state, request| {
                Box::pin(async move {
                    let Request::Login(req) = request else {
                        return Err(mismatch());
                    };
                    let outcome = state
                        .services
                        .relay
                        .login(mode, &req.username, &req.password)
                        .await?;
                    Ok(login_value(outcome))
                })
            }),
        );
    }
}

fn mismatch() -> GatewayError {
    Fault::internal("request does not match handler").into()
}

/// Login responses carry the hub session key alongside the per-server
/// attach aggregation.
fn login_value(outcome: LoginOutcome) -> Value {
    let mut members = outcome.servers.to_members();
    members.insert(
        "SessionKey".to_string(),
        Value::String(outcome.hub_session_key),
    );
    Value::Struct(members)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{request::SessionKeyRequest, test_support::MockExecutor};
    use hubgate_sessions::SessionStore;

    fn state() -> Arc<GatewayState> {
        let executor = Arc::new(MockExecutor::new(|_, _, _| Ok(Value::Bool(true))));
        GatewayState::new(
            "http://hub.example.org/rpc/api",
            executor,
            Arc::new(SessionStore::new()),
        )
    }

    #[tokio::test]
    async fn unknown_handler_is_method_not_found() {
        let registry = HandlerRegistry::new();
        let err = registry
            .dispatch(
                state(),
                "no.SuchHandler",
                Request::SessionKey(SessionKeyRequest {
                    hub_session_key: "hub-key".into(),
                }),
            )
            .await
            .unwrap_err();
        assert_eq!(
            err.to_fault().code,
            hubgate_protocol::fault_codes::METHOD_NOT_FOUND
        );
    }

    #[tokio::test]
    async fn mismatched_request_is_guarded_not_a_panic() {
        let registry = HandlerRegistry::new();
        let err = registry
            .dispatch(
                state(),
                handler_names::UNICAST,
                Request::SessionKey(SessionKeyRequest {
                    hub_session_key: "hub-key".into(),
                }),
            )
            .await
            .unwrap_err();
        assert_eq!(
            err.to_fault().code,
            hubgate_protocol::fault_codes::INTERNAL_ERROR
        );
    }
}
