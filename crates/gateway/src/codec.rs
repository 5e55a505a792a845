//! Method-routing codec: maps an inbound wire method name to the
//! internal handler that should run and the parser for its arguments.

use std::collections::{HashMap, HashSet};

use hubgate_protocol::{Fault, wire::MethodCall};

use crate::request::Request;

/// Converts a parsed wire call into one typed [`Request`] variant.
pub type ParserFn = fn(&MethodCall) -> Result<Request, Fault>;

pub struct MethodCodec {
    /// Explicitly registered wire method names.
    methods: HashSet<String>,
    /// Handler for every method under a namespace (`multicast`, `unicast`).
    namespace_defaults: HashMap<String, String>,
    /// Handler for methods nothing else matched (hub pass-through).
    default_handler: Option<String>,
    /// Parser per resolved handler name — exactly one each.
    parsers: HashMap<String, ParserFn>,
}

impl Default for MethodCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl MethodCodec {
    pub fn new() -> Self {
        Self {
            methods: HashSet::new(),
            namespace_defaults: HashMap::new(),
            default_handler: None,
            parsers: HashMap::new(),
        }
    }

    /// The codec with the gateway's route table registered.
    pub fn with_default_routes() -> Self {
        use crate::{handlers::handler_names, parsers};

        let mut codec = Self::new();
        codec.register_method("hub.login", parsers::parse_login);
        codec.register_method("hub.loginWithAutoconnectMode", parsers::parse_login);
        codec.register_method("hub.loginWithAuthRelayMode", parsers::parse_login);
        codec.register_method("hub.logout", parsers::parse_session_key);
        codec.register_method("hub.attachToServers", parsers::parse_attach_to_servers);
        codec.register_method("hub.listServerIds", parsers::parse_session_key);

        codec.register_namespace_default(
            "multicast",
            handler_names::MULTICAST,
            parsers::parse_multicast,
        );
        codec.register_namespace_default("unicast", handler_names::UNICAST, parsers::parse_unicast);
        codec.register_default(handler_names::PROXY, parsers::parse_proxy);
        codec
    }

    /// Register an explicit wire method; its routing key is the
    /// casing-normalized form of the wire name.
    pub fn register_method(&mut self, method: &str, parser: ParserFn) {
        self.methods.insert(method.to_string());
        let resolved = self.resolve(method);
        self.parsers.insert(resolved, parser);
    }

    /// Register the handler for every method under `namespace`. The
    /// method text itself travels on inside the parsed request.
    pub fn register_namespace_default(&mut self, namespace: &str, handler: &str, parser: ParserFn) {
        self.namespace_defaults
            .insert(namespace.to_string(), handler.to_string());
        self.parsers.insert(handler.to_string(), parser);
    }

    /// Register the handler for methods nothing else matched.
    pub fn register_default(&mut self, handler: &str, parser: ParserFn) {
        self.default_handler = Some(handler.to_string());
        self.parsers.insert(handler.to_string(), parser);
    }

    /// Resolve a wire method name to its routing key.
    ///
    /// Priority: explicit method (casing-normalized), namespace default,
    /// global default, then the original name unresolved — parser lookup
    /// for an unresolved name misses and the request fails with
    /// method-not-found rather than anything worse.
    pub fn resolve(&self, wire_method: &str) -> String {
        let (namespace, rest) = split_method(wire_method);
        if self.methods.contains(wire_method) {
            capitalize_method(namespace, rest)
        } else if let Some(handler) = self.namespace_defaults.get(namespace) {
            handler.clone()
        } else if let Some(handler) = &self.default_handler {
            handler.clone()
        } else {
            wire_method.to_string()
        }
    }

    pub fn parser_for(&self, handler: &str) -> Option<ParserFn> {
        self.parsers.get(handler).copied()
    }
}

/// Split on the first dot. A name with no dot has neither namespace nor
/// remainder.
fn split_method(method: &str) -> (&str, &str) {
    method.split_once('.').unwrap_or(("", ""))
}

/// Routing keys capitalize the first letter after the namespace dot.
fn capitalize_method(namespace: &str, method: &str) -> String {
    if namespace.is_empty() || method.is_empty() {
        return format!("{namespace}.{method}");
    }
    let mut chars = method.chars();
    match chars.next() {
        Some(first) => format!("{namespace}.{}{}", first.to_uppercase(), chars.as_str()),
        None => format!("{namespace}."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{handlers::handler_names, parsers};

    #[test]
    fn explicit_methods_resolve_to_normalized_keys() {
        let codec = MethodCodec::with_default_routes();
        assert_eq!(codec.resolve("hub.login"), "hub.Login");
        assert_eq!(codec.resolve("hub.listServerIds"), "hub.ListServerIds");
        assert_eq!(
            codec.resolve("hub.loginWithAutoconnectMode"),
            "hub.LoginWithAutoconnectMode"
        );
        assert!(codec.parser_for("hub.Login").is_some());
    }

    #[test]
    fn capitalization_is_idempotent_for_upper_case_registrations() {
        let mut codec = MethodCodec::new();
        codec.register_method("hub.Logout", parsers::parse_session_key);
        assert_eq!(codec.resolve("hub.Logout"), "hub.Logout");
    }

    #[test]
    fn namespaced_methods_hit_the_namespace_default() {
        let codec = MethodCodec::with_default_routes();
        assert_eq!(
            codec.resolve("multicast.system.schedule.reboot"),
            handler_names::MULTICAST
        );
        assert_eq!(
            codec.resolve("unicast.system.listSystems"),
            handler_names::UNICAST
        );
    }

    #[test]
    fn unmatched_methods_fall_back_to_the_global_default() {
        let codec = MethodCodec::with_default_routes();
        assert_eq!(codec.resolve("api.getVersion"), handler_names::PROXY);
        assert_eq!(codec.resolve("noDotAtAll"), handler_names::PROXY);
    }

    #[test]
    fn without_a_default_the_name_stays_unresolved() {
        let mut codec = MethodCodec::new();
        codec.register_method("hub.login", parsers::parse_login);
        assert_eq!(codec.resolve("api.getVersion"), "api.getVersion");
        // No parser exists for an unresolved name.
        assert!(codec.parser_for("api.getVersion").is_none());
    }

    #[test]
    fn registration_order_does_not_shadow_namespaces() {
        let mut codec = MethodCodec::new();
        codec.register_namespace_default("unicast", handler_names::UNICAST, parsers::parse_unicast);
        // Explicit registration under the same namespace still wins for
        // its exact name.
        codec.register_method("unicast.ping", parsers::parse_session_key);
        assert_eq!(codec.resolve("unicast.ping"), "unicast.Ping");
        assert_eq!(
            codec.resolve("unicast.anything.else"),
            handler_names::UNICAST
        );
    }
}
