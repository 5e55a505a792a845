use std::sync::Arc;

use {hubgate_client::CallExecutor, hubgate_protocol::{Fault, Value}, hubgate_sessions::SessionStore};

use crate::error::GatewayError;

/// Routes one call to exactly one peripheral server.
pub struct Unicaster {
    executor: Arc<dyn CallExecutor>,
    sessions: Arc<SessionStore>,
}

impl Unicaster {
    pub fn new(executor: Arc<dyn CallExecutor>, sessions: Arc<SessionStore>) -> Self {
        Self { executor, sessions }
    }

    /// Execute `method` against the server held under `(hub_key,
    /// server_id)`. Session validity is checked before any backend round
    /// trip; the backend's response or error passes through verbatim.
    pub async fn unicast(
        &self,
        hub_key: &str,
        method: &str,
        server_id: i64,
        args: &[Value],
    ) -> Result<Value, GatewayError> {
        let Some(session) = self.sessions.retrieve_server_session(hub_key, server_id) else {
            return Err(Fault::invalid_session_key().into());
        };

        let mut call_args = Vec::with_capacity(args.len() + 1);
        call_args.push(Value::String(session.session_key));
        call_args.extend_from_slice(args);

        Ok(self
            .executor
            .execute(&session.endpoint, method, &call_args)
            .await?)
    }
}
