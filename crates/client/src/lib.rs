//! Outbound call execution.
//!
//! Everything the gateway sends to a backend — hub or peripheral server —
//! goes through the single [`CallExecutor`] capability. [`XmlRpcClient`]
//! is the one production implementation; dispatcher tests substitute
//! their own.

use std::time::Duration;

use {
    async_trait::async_trait,
    reqwest::header::CONTENT_TYPE,
    thiserror::Error,
    tracing::{debug, warn},
};

use hubgate_protocol::{
    Value,
    wire::{self, MethodResponse},
};

/// An error from executing a backend call.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected HTTP status {0}")]
    Http(u16),
    /// A fault raised by the backend itself.
    #[error("{message}")]
    Fault { code: i32, message: String },
    #[error("malformed response: {0}")]
    Decode(String),
}

/// The single backend-call capability consumed by every dispatcher and
/// the authentication relay.
#[async_trait]
pub trait CallExecutor: Send + Sync {
    async fn execute(
        &self,
        endpoint: &str,
        method: &str,
        args: &[Value],
    ) -> Result<Value, CallError>;
}

/// XML-RPC call executor over HTTP.
///
/// Timeouts are the gateway's only cancellation mechanism; there is no
/// retry layer here.
pub struct XmlRpcClient {
    http: reqwest::Client,
}

impl XmlRpcClient {
    pub fn new(connect_timeout: Duration, request_timeout: Duration) -> Result<Self, CallError> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl CallExecutor for XmlRpcClient {
    async fn execute(
        &self,
        endpoint: &str,
        method: &str,
        args: &[Value],
    ) -> Result<Value, CallError> {
        let body = wire::encode_call(method, args);
        debug!(endpoint, method, "executing backend call");

        let response = self
            .http
            .post(endpoint)
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(endpoint, method, status = status.as_u16(), "backend returned HTTP error");
            return Err(CallError::Http(status.as_u16()));
        }

        let text = response.text().await?;
        match wire::parse_response(&text) {
            Ok(MethodResponse::Success(value)) => Ok(value),
            Ok(MethodResponse::Fault(fault)) => {
                debug!(endpoint, method, code = fault.code, "backend raised fault");
                Err(CallError::Fault {
                    code: fault.code,
                    message: fault.message,
                })
            },
            Err(fault) => Err(CallError::Decode(fault.message)),
        }
    }
}
