use std::sync::Arc;

use futures::{StreamExt, stream};
use tracing::warn;

use {hubgate_client::CallExecutor, hubgate_protocol::Value, hubgate_sessions::SessionStore};

use crate::aggregate::AggregatedResult;

/// How many peripheral servers a single multicast hits at once.
const FANOUT_LIMIT: usize = 8;

/// Fans one call out to every peripheral server reachable under a hub
/// session.
pub struct Multicaster {
    executor: Arc<dyn CallExecutor>,
    sessions: Arc<SessionStore>,
}

impl Multicaster {
    pub fn new(executor: Arc<dyn CallExecutor>, sessions: Arc<SessionStore>) -> Self {
        Self { executor, sessions }
    }

    /// Execute `method` against every server session under `hub_key`,
    /// each call carrying that server's session key as its first
    /// argument. Completes only once every target answered; a failing
    /// target is recorded and never affects the others. No sessions
    /// means an empty result, not an error.
    pub async fn multicast(&self, hub_key: &str, method: &str, args: &[Value]) -> AggregatedResult {
        let sessions = self.sessions.list_server_sessions(hub_key);

        let calls = sessions.into_iter().map(|session| {
            let executor = Arc::clone(&self.executor);
            let method = method.to_string();
            let mut call_args = Vec::with_capacity(args.len() + 1);
            call_args.push(Value::String(session.session_key.clone()));
            call_args.extend_from_slice(args);
            async move {
                let outcome = executor.execute(&session.endpoint, &method, &call_args).await;
                (session.server_id, outcome)
            }
        });

        let mut result = AggregatedResult::default();
        let mut responses = stream::iter(calls).buffer_unordered(FANOUT_LIMIT);
        while let Some((server_id, outcome)) = responses.next().await {
            match outcome {
                Ok(value) => result.record_success(server_id, value),
                Err(e) => {
                    warn!(server_id, error = %e, "multicast target failed");
                    result.record_failure(server_id, e.to_string());
                },
            }
        }
        result
    }
}
