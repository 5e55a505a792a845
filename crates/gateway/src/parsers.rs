//! Per-handler argument parsers.
//!
//! Each parser validates positional argument count and types and
//! produces one typed [`Request`] variant; violations come back as
//! invalid-params or wrong-argument-count faults before any dispatch
//! happens.

use hubgate_protocol::{Fault, Value, wire::MethodCall};

use crate::request::{
    AttachRequest, LoginRequest, MulticastRequest, ProxyRequest, Request, SessionKeyRequest,
    UnicastRequest,
};

pub fn parse_login(call: &MethodCall) -> Result<Request, Fault> {
    if call.params.len() != 2 {
        return Err(Fault::wrong_argument_count());
    }
    Ok(Request::Login(LoginRequest {
        username: string_arg(&call.params, 0)?,
        password: string_arg(&call.params, 1)?,
    }))
}

pub fn parse_session_key(call: &MethodCall) -> Result<Request, Fault> {
    if call.params.len() != 1 {
        return Err(Fault::wrong_argument_count());
    }
    Ok(Request::SessionKey(SessionKeyRequest {
        hub_session_key: string_arg(&call.params, 0)?,
    }))
}

pub fn parse_attach_to_servers(call: &MethodCall) -> Result<Request, Fault> {
    if call.params.len() != 2 && call.params.len() != 4 {
        return Err(Fault::wrong_argument_count());
    }
    let hub_session_key = string_arg(&call.params, 0)?;
    let server_ids = int_array_arg(&call.params, 1)?;

    let credentials = if call.params.len() == 4 {
        let usernames = string_array_arg(&call.params, 2)?;
        let passwords = string_array_arg(&call.params, 3)?;
        if usernames.len() != server_ids.len() || passwords.len() != server_ids.len() {
            return Err(Fault::invalid_params(
                "credential arrays must match the server id list",
            ));
        }
        Some(usernames.into_iter().zip(passwords).collect())
    } else {
        None
    };

    Ok(Request::AttachToServers(AttachRequest {
        hub_session_key,
        server_ids,
        credentials,
    }))
}

pub fn parse_unicast(call: &MethodCall) -> Result<Request, Fault> {
    if call.params.len() < 2 {
        return Err(Fault::wrong_argument_count());
    }
    Ok(Request::Unicast(UnicastRequest {
        hub_session_key: string_arg(&call.params, 0)?,
        server_id: int_arg(&call.params, 1)?,
        method: strip_namespace(&call.method)?,
        args: call.params[2..].to_vec(),
    }))
}

pub fn parse_multicast(call: &MethodCall) -> Result<Request, Fault> {
    if call.params.is_empty() {
        return Err(Fault::wrong_argument_count());
    }
    Ok(Request::Multicast(MulticastRequest {
        hub_session_key: string_arg(&call.params, 0)?,
        method: strip_namespace(&call.method)?,
        args: call.params[1..].to_vec(),
    }))
}

pub fn parse_proxy(call: &MethodCall) -> Result<Request, Fault> {
    Ok(Request::Proxy(ProxyRequest {
        method: call.method.clone(),
        args: call.params.clone(),
    }))
}

/// The remainder of a namespaced wire method after its first dot.
fn strip_namespace(method: &str) -> Result<String, Fault> {
    match method.split_once('.') {
        Some((_, rest)) if !rest.is_empty() => Ok(rest.to_string()),
        _ => Err(Fault::invalid_params(format!(
            "method {method} carries no call after the namespace"
        ))),
    }
}

fn string_arg(args: &[Value], index: usize) -> Result<String, Fault> {
    args.get(index)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Fault::invalid_params(format!("argument {index} must be a string")))
}

fn int_arg(args: &[Value], index: usize) -> Result<i64, Fault> {
    args.get(index)
        .and_then(Value::as_int)
        .ok_or_else(|| Fault::invalid_params(format!("argument {index} must be an integer")))
}

fn int_array_arg(args: &[Value], index: usize) -> Result<Vec<i64>, Fault> {
    let items = args
        .get(index)
        .and_then(Value::as_array)
        .ok_or_else(|| Fault::invalid_params(format!("argument {index} must be an array")))?;
    items
        .iter()
        .map(|v| {
            v.as_int().ok_or_else(|| {
                Fault::invalid_params(format!("argument {index} must contain only integers"))
            })
        })
        .collect()
}

fn string_array_arg(args: &[Value], index: usize) -> Result<Vec<String>, Fault> {
    let items = args
        .get(index)
        .and_then(Value::as_array)
        .ok_or_else(|| Fault::invalid_params(format!("argument {index} must be an array")))?;
    items
        .iter()
        .map(|v| {
            v.as_str().map(str::to_string).ok_or_else(|| {
                Fault::invalid_params(format!("argument {index} must contain only strings"))
            })
        })
        .collect()
}
