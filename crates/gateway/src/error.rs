use thiserror::Error;

use {hubgate_client::CallError, hubgate_protocol::Fault};

/// A handler-level error: a structured protocol fault, or an opaque
/// backend error surfaced verbatim.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Fault(#[from] Fault),
    #[error("{0}")]
    Backend(#[from] CallError),
}

impl GatewayError {
    /// The fault that represents this error on the wire. Faults pass
    /// through structurally; anything else becomes the application
    /// fault with the original message appended.
    pub fn to_fault(&self) -> Fault {
        match self {
            GatewayError::Fault(fault) => fault.clone(),
            GatewayError::Backend(err) => Fault::application(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hubgate_protocol::fault_codes;

    #[test]
    fn faults_pass_through_unwrapped() {
        let err = GatewayError::from(Fault::invalid_session_key());
        assert_eq!(err.to_fault(), Fault::invalid_session_key());
    }

    #[test]
    fn backend_errors_become_application_faults() {
        let err = GatewayError::from(CallError::Fault {
            code: -1,
            message: "call_error".into(),
        });
        let fault = err.to_fault();
        assert_eq!(fault.code, fault_codes::APPLICATION_ERROR);
        assert_eq!(fault.message, "Application error: call_error");
    }
}
