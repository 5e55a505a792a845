use thiserror::Error;

/// Protocol fault codes.
///
/// The negative codes follow the conventional XML-RPC fault ranges; the
/// positive code is the hub's own authentication failure code.
pub mod fault_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    pub const APPLICATION_ERROR: i32 = -32500;
    pub const INVALID_SESSION_KEY: i32 = 2950;
}

/// A structured, caller-visible protocol fault: code plus description.
///
/// Faults serialize as an XML-RPC `<fault>` response. Any non-fault
/// handler error is wrapped into [`Fault::application`] before it reaches
/// the wire.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct Fault {
    pub code: i32,
    pub message: String,
}

impl Fault {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn parse_error(detail: impl std::fmt::Display) -> Self {
        Self::new(fault_codes::PARSE_ERROR, format!("parse error: {detail}"))
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            fault_codes::METHOD_NOT_FOUND,
            format!("requested method not found: {method}"),
        )
    }

    pub fn invalid_params(detail: impl std::fmt::Display) -> Self {
        Self::new(
            fault_codes::INVALID_PARAMS,
            format!("invalid method parameters: {detail}"),
        )
    }

    pub fn wrong_argument_count() -> Self {
        Self::new(fault_codes::INVALID_PARAMS, "wrong number of arguments")
    }

    pub fn internal(detail: impl std::fmt::Display) -> Self {
        Self::new(fault_codes::INTERNAL_ERROR, format!("internal error: {detail}"))
    }

    pub fn application(detail: impl std::fmt::Display) -> Self {
        Self::new(
            fault_codes::APPLICATION_ERROR,
            format!("Application error: {detail}"),
        )
    }

    pub fn invalid_session_key() -> Self {
        Self::new(
            fault_codes::INVALID_SESSION_KEY,
            "Authentication error: provided session key is invalid",
        )
    }
}
