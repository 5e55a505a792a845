use async_trait::async_trait;

use {
    hubgate_client::{CallError, CallExecutor},
    hubgate_protocol::Value,
};

type RespondFn = dyn Fn(&str, &str, &[Value]) -> Result<Value, CallError> + Send + Sync;

/// Scripted call executor for dispatcher and relay tests.
pub struct MockExecutor {
    respond: Box<RespondFn>,
}

impl MockExecutor {
    pub fn new(
        respond: impl Fn(&str, &str, &[Value]) -> Result<Value, CallError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            respond: Box::new(respond),
        }
    }
}

#[async_trait]
impl CallExecutor for MockExecutor {
    async fn execute(
        &self,
        endpoint: &str,
        method: &str,
        args: &[Value],
    ) -> Result<Value, CallError> {
        (self.respond)(endpoint, method, args)
    }
}
