use hubgate_protocol::Value;

/// A typed, parsed inbound request.
///
/// One variant per handler argument shape. Parsers produce these;
/// handlers consume the variant they are bound to.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Login(LoginRequest),
    SessionKey(SessionKeyRequest),
    AttachToServers(AttachRequest),
    Unicast(UnicastRequest),
    Multicast(MulticastRequest),
    Proxy(ProxyRequest),
}

/// `[username, password]` — the three login modes.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// `[hubSessionKey]` — logout and server-id listing.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionKeyRequest {
    pub hub_session_key: String,
}

/// `[hubSessionKey, serverIds, usernames?, passwords?]`.
///
/// The credential arrays are index-aligned with the server ids; parsed
/// into per-server pairs so mismatched lengths fail at the door.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachRequest {
    pub hub_session_key: String,
    pub server_ids: Vec<i64>,
    pub credentials: Option<Vec<(String, String)>>,
}

/// `[hubSessionKey, serverID, ...args]`; the call is the wire method
/// minus the `unicast.` prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct UnicastRequest {
    pub hub_session_key: String,
    pub server_id: i64,
    pub method: String,
    pub args: Vec<Value>,
}

/// `[hubSessionKey, ...args]`; the call is the wire method minus the
/// `multicast.` prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct MulticastRequest {
    pub hub_session_key: String,
    pub method: String,
    pub args: Vec<Value>,
}

/// Forwarded to the hub untouched: original method, original args.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyRequest {
    pub method: String,
    pub args: Vec<Value>,
}
