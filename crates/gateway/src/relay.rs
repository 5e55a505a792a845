//! Authentication relay: hub login in its three modes, peripheral-server
//! attachment, and logout with cascading session removal.

use std::{collections::HashMap, sync::Arc};

use tracing::{info, warn};

use {
    hubgate_client::CallExecutor,
    hubgate_protocol::{Fault, Value},
    hubgate_sessions::{HubSession, LoginMode, ServerSession, SessionStore},
};

use crate::{aggregate::AggregatedResult, error::GatewayError, topology::TopologyRetriever};

const AUTH_LOGIN: &str = "auth.login";
const AUTH_LOGOUT: &str = "auth.logout";

/// What a login call yields: the hub session key plus the per-server
/// attach aggregation.
#[derive(Debug)]
pub struct LoginOutcome {
    pub hub_session_key: String,
    pub servers: AggregatedResult,
}

pub struct AuthRelay {
    hub_url: String,
    executor: Arc<dyn CallExecutor>,
    topology: Arc<TopologyRetriever>,
    sessions: Arc<SessionStore>,
}

impl AuthRelay {
    pub fn new(
        hub_url: impl Into<String>,
        executor: Arc<dyn CallExecutor>,
        topology: Arc<TopologyRetriever>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            hub_url: hub_url.into(),
            executor,
            topology,
            sessions,
        }
    }

    /// Authenticate against the hub, store the hub session, discover the
    /// target server set for `mode`, and authenticate against each
    /// discovered server. A hub authentication failure returns verbatim
    /// and leaves no session behind.
    pub async fn login(
        &self,
        mode: LoginMode,
        username: &str,
        password: &str,
    ) -> Result<LoginOutcome, GatewayError> {
        let hub_key = self.authenticate_hub(username, password).await?;
        let hub_session = HubSession::new(hub_key.clone(), username, password, mode);
        self.sessions.save_hub_session(hub_session.clone());
        info!(user = username, ?mode, "hub login");

        let server_ids = match mode {
            LoginMode::Autoconnect => {
                self.topology
                    .list_user_server_ids(&self.hub_url, &hub_key, username)
                    .await?
            },
            LoginMode::Manual | LoginMode::AuthRelay => {
                self.topology.list_server_ids(&self.hub_url, &hub_key).await?
            },
        };

        let servers = self
            .authenticate_servers(&hub_session, &server_ids, None)
            .await;
        Ok(LoginOutcome {
            hub_session_key: hub_key,
            servers,
        })
    }

    /// Attach the caller's hub session to an explicit set of servers.
    /// Without explicit credential pairs the hub session's stored
    /// credentials are relayed — which manual-mode sessions refuse.
    pub async fn attach_to_servers(
        &self,
        hub_key: &str,
        server_ids: &[i64],
        credentials: Option<&[(String, String)]>,
    ) -> Result<AggregatedResult, GatewayError> {
        let Some(hub_session) = self.sessions.retrieve_hub_session(hub_key) else {
            return Err(Fault::invalid_session_key().into());
        };
        if credentials.is_none() && hub_session.mode == LoginMode::Manual {
            return Err(Fault::invalid_params(
                "credentials are required for sessions established with plain login",
            )
            .into());
        }
        Ok(self
            .authenticate_servers(&hub_session, server_ids, credentials)
            .await)
    }

    /// Invalidate the hub session and everything under it. The hub-side
    /// logout is best-effort: its failure never prevents local removal.
    pub async fn logout(&self, hub_key: &str) -> Result<(), GatewayError> {
        if self.sessions.retrieve_hub_session(hub_key).is_none() {
            return Err(Fault::invalid_session_key().into());
        }
        if let Err(e) = self
            .executor
            .execute(&self.hub_url, AUTH_LOGOUT, &[Value::String(hub_key.into())])
            .await
        {
            warn!(error = %e, "hub-side logout failed, removing session anyway");
        }
        self.sessions.remove_hub_session(hub_key);
        info!("hub logout");
        Ok(())
    }

    async fn authenticate_hub(
        &self,
        username: &str,
        password: &str,
    ) -> Result<String, GatewayError> {
        let response = self
            .executor
            .execute(
                &self.hub_url,
                AUTH_LOGIN,
                &[Value::String(username.into()), Value::String(password.into())],
            )
            .await?;
        session_key_from(response)
    }

    /// Resolve endpoints for the server set and log in to each resolved
    /// server, storing a server session per success. Resolution failures
    /// carry forward into the aggregation and skip the login step.
    async fn authenticate_servers(
        &self,
        hub_session: &HubSession,
        server_ids: &[i64],
        credentials: Option<&[(String, String)]>,
    ) -> AggregatedResult {
        let mut result = AggregatedResult::default();
        let resolution = self
            .topology
            .resolve_server_endpoints(&self.hub_url, &hub_session.key, server_ids)
            .await;
        result.absorb_failures(resolution.failed);

        // Explicit credential pairs are index-aligned with the id list.
        let explicit: Option<HashMap<i64, &(String, String)>> =
            credentials.map(|pairs| server_ids.iter().copied().zip(pairs.iter()).collect());

        for &server_id in server_ids {
            let Some(endpoint) = resolution.endpoints.get(&server_id) else {
                continue;
            };
            let (username, password) = match explicit.as_ref().and_then(|m| m.get(&server_id)) {
                Some((user, pass)) => (user.as_str(), pass.as_str()),
                None => (hub_session.username.as_str(), hub_session.password.as_str()),
            };

            match self.login_to_server(endpoint, username, password).await {
                Ok(session_key) => {
                    self.sessions.save_server_session(
                        &hub_session.key,
                        ServerSession::new(
                            server_id,
                            endpoint.clone(),
                            session_key,
                            hub_session.key.clone(),
                        ),
                    );
                    // Confirmation only — server session keys stay inside
                    // the store.
                    result.record_success(server_id, Value::Bool(true));
                },
                Err(e) => {
                    warn!(server_id, error = %e, "server authentication failed");
                    result.record_failure(server_id, e.to_string());
                },
            }
        }
        result
    }

    async fn login_to_server(
        &self,
        endpoint: &str,
        username: &str,
        password: &str,
    ) -> Result<String, GatewayError> {
        let response = self
            .executor
            .execute(
                endpoint,
                AUTH_LOGIN,
                &[Value::String(username.into()), Value::String(password.into())],
            )
            .await?;
        session_key_from(response)
    }
}

fn session_key_from(response: Value) -> Result<String, GatewayError> {
    match response {
        Value::String(key) if !key.is_empty() => Ok(key),
        _ => Err(GatewayError::Fault(Fault::internal(
            "login response is not a session key",
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::test_support::MockExecutor;
    use hubgate_client::CallError;

    fn system_entry(id: i64) -> Value {
        let mut members = BTreeMap::new();
        members.insert("id".to_string(), Value::Int(id));
        Value::Struct(members)
    }

    /// Scripted hub + peripheral backend for relay tests.
    fn scripted_executor(failing_login_server: Option<i64>) -> Arc<MockExecutor> {
        Arc::new(MockExecutor::new(move |endpoint, method, args| {
            match method {
                "auth.login" if endpoint.contains("hub") => {
                    match args[1].as_str() {
                        Some("secret") => Ok(Value::String("hub-key".into())),
                        _ => Err(CallError::Fault {
                            code: 2950,
                            message: "Either the password or username is incorrect".into(),
                        }),
                    }
                },
                "auth.login" => {
                    let id: i64 = endpoint
                        .split("server-")
                        .nth(1)
                        .and_then(|s| s.split('.').next())
                        .and_then(|s| s.parse().ok())
                        .unwrap_or_default();
                    if failing_login_server == Some(id) {
                        Err(CallError::Fault {
                            code: 2950,
                            message: "server rejected credentials".into(),
                        })
                    } else {
                        Ok(Value::String(format!("server-key-{id}")))
                    }
                },
                "auth.logout" => Ok(Value::Int(1)),
                "system.listSystems" => {
                    Ok(Value::Array(vec![system_entry(1), system_entry(2)]))
                },
                "system.listUserSystems" => Ok(Value::Array(vec![system_entry(2)])),
                "system.listFqdns" => match args[1].as_int() {
                    Some(id) => Ok(Value::Array(vec![Value::String(format!(
                        "server-{id}.example.org"
                    ))])),
                    None => panic!("missing server id"),
                },
                other => panic!("unexpected backend method {other}"),
            }
        }))
    }

    fn relay_with(executor: Arc<MockExecutor>) -> (AuthRelay, Arc<SessionStore>) {
        let sessions = Arc::new(SessionStore::new());
        let executor: Arc<dyn CallExecutor> = executor;
        let topology = Arc::new(TopologyRetriever::new(Arc::clone(&executor)));
        let relay = AuthRelay::new(
            "http://hub.example.org/rpc/api",
            executor,
            topology,
            Arc::clone(&sessions),
        );
        (relay, sessions)
    }

    #[tokio::test]
    async fn login_stores_hub_and_server_sessions() {
        let (relay, sessions) = relay_with(scripted_executor(None));

        let outcome = relay
            .login(LoginMode::Manual, "admin", "secret")
            .await
            .unwrap();
        assert_eq!(outcome.hub_session_key, "hub-key");
        assert_eq!(outcome.servers.successes.len(), 2);
        assert!(outcome.servers.failures.is_empty());

        assert!(sessions.retrieve_hub_session("hub-key").is_some());
        for id in [1, 2] {
            let session = sessions.retrieve_server_session("hub-key", id).unwrap();
            assert_eq!(session.session_key, format!("server-key-{id}"));
            assert_eq!(
                session.endpoint,
                format!("http://server-{id}.example.org/rpc/api")
            );
        }
    }

    #[tokio::test]
    async fn failed_hub_login_creates_no_session() {
        let (relay, sessions) = relay_with(scripted_executor(None));

        let err = relay
            .login(LoginMode::Manual, "admin", "wrong")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Either the password or username is incorrect");
        assert!(sessions.retrieve_hub_session("hub-key").is_none());
    }

    #[tokio::test]
    async fn per_server_login_failures_accumulate() {
        let (relay, sessions) = relay_with(scripted_executor(Some(2)));

        let outcome = relay
            .login(LoginMode::AuthRelay, "admin", "secret")
            .await
            .unwrap();
        assert!(outcome.servers.successes.contains_key(&1));
        assert_eq!(
            outcome.servers.failures[&2],
            "server rejected credentials"
        );
        assert_eq!(outcome.servers.len(), 2);
        assert!(sessions.retrieve_server_session("hub-key", 2).is_none());
    }

    #[tokio::test]
    async fn autoconnect_scopes_discovery_to_the_user() {
        let (relay, sessions) = relay_with(scripted_executor(None));

        let outcome = relay
            .login(LoginMode::Autoconnect, "admin", "secret")
            .await
            .unwrap();
        assert_eq!(outcome.servers.len(), 1);
        assert!(sessions.retrieve_server_session("hub-key", 2).is_some());
        assert!(sessions.retrieve_server_session("hub-key", 1).is_none());
    }

    #[tokio::test]
    async fn attach_requires_a_known_hub_session() {
        let (relay, _) = relay_with(scripted_executor(None));

        let err = relay
            .attach_to_servers("nobody", &[1], None)
            .await
            .unwrap_err();
        assert_eq!(err.to_fault(), Fault::invalid_session_key());
    }

    #[tokio::test]
    async fn manual_sessions_refuse_credentialless_attach() {
        let (relay, sessions) = relay_with(scripted_executor(None));
        sessions.save_hub_session(HubSession::new(
            "hub-key",
            "admin",
            "secret",
            LoginMode::Manual,
        ));

        let err = relay.attach_to_servers("hub-key", &[1], None).await.unwrap_err();
        assert_eq!(
            err.to_fault().code,
            hubgate_protocol::fault_codes::INVALID_PARAMS
        );
    }

    #[tokio::test]
    async fn attach_with_explicit_credentials_logs_in_per_server() {
        let (relay, sessions) = relay_with(scripted_executor(None));
        sessions.save_hub_session(HubSession::new(
            "hub-key",
            "admin",
            "secret",
            LoginMode::Manual,
        ));

        let creds = vec![("one".to_string(), "pw".to_string())];
        let result = relay
            .attach_to_servers("hub-key", &[1], Some(&creds))
            .await
            .unwrap();
        assert!(result.successes.contains_key(&1));
        assert!(sessions.retrieve_server_session("hub-key", 1).is_some());
    }

    #[tokio::test]
    async fn logout_cascades_even_when_the_hub_call_fails() {
        let executor = Arc::new(MockExecutor::new(|_, method, _| match method {
            "auth.logout" => Err(CallError::Fault {
                code: -1,
                message: "hub down".into(),
            }),
            other => panic!("unexpected backend method {other}"),
        }));
        let (relay, sessions) = relay_with(executor);
        sessions.save_hub_session(HubSession::new(
            "hub-key",
            "admin",
            "secret",
            LoginMode::AuthRelay,
        ));
        sessions.save_server_session(
            "hub-key",
            ServerSession::new(1, "http://server-1.example.org/rpc/api", "sk", "hub-key"),
        );

        relay.logout("hub-key").await.unwrap();
        assert!(sessions.retrieve_hub_session("hub-key").is_none());
        assert!(sessions.retrieve_server_session("hub-key", 1).is_none());
    }

    #[tokio::test]
    async fn logout_of_unknown_session_is_an_auth_fault() {
        let (relay, _) = relay_with(scripted_executor(None));
        let err = relay.logout("nobody").await.unwrap_err();
        assert_eq!(err.to_fault(), Fault::invalid_session_key());
    }
}
