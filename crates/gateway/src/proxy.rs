use std::sync::Arc;

use {hubgate_client::CallExecutor, hubgate_protocol::Value};

use crate::error::GatewayError;

/// Forwards hub-native calls straight to the hub: no session lookup, no
/// argument rewriting.
pub struct HubProxy {
    hub_url: String,
    executor: Arc<dyn CallExecutor>,
}

impl HubProxy {
    pub fn new(hub_url: impl Into<String>, executor: Arc<dyn CallExecutor>) -> Self {
        Self {
            hub_url: hub_url.into(),
            executor,
        }
    }

    pub async fn proxy_call_to_hub(
        &self,
        method: &str,
        args: &[Value],
    ) -> Result<Value, GatewayError> {
        Ok(self.executor.execute(&self.hub_url, method, args).await?)
    }
}
