use std::{collections::HashMap, time::SystemTime};

use dashmap::DashMap;
use tracing::debug;

/// How a hub session was established. Determines whether the gateway may
/// relay the stored credentials to peripheral servers on attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginMode {
    /// Caller must supply per-server credentials explicitly on attach.
    Manual,
    /// Credentials are relayed to every discovered server.
    AuthRelay,
    /// Credentials are relayed to the user's own servers at login time.
    Autoconnect,
}

/// An authenticated caller at the hub.
///
/// The credentials are kept so the relay can authenticate against
/// peripheral servers on the caller's behalf; they never leave the
/// gateway.
#[derive(Debug, Clone)]
pub struct HubSession {
    pub key: String,
    pub username: String,
    pub password: String,
    pub mode: LoginMode,
    pub created_at: SystemTime,
}

impl HubSession {
    pub fn new(
        key: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        mode: LoginMode,
    ) -> Self {
        Self {
            key: key.into(),
            username: username.into(),
            password: password.into(),
            mode,
            created_at: SystemTime::now(),
        }
    }
}

/// An authenticated caller at one peripheral server, derived from a hub
/// session. Unique per (hub session key, server id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSession {
    pub server_id: i64,
    pub endpoint: String,
    pub session_key: String,
    pub hub_key: String,
}

impl ServerSession {
    pub fn new(
        server_id: i64,
        endpoint: impl Into<String>,
        session_key: impl Into<String>,
        hub_key: impl Into<String>,
    ) -> Self {
        Self {
            server_id,
            endpoint: endpoint.into(),
            session_key: session_key.into(),
            hub_key: hub_key.into(),
        }
    }
}

/// Concurrent store for hub and server sessions.
///
/// Every operation is individually atomic; there is no cross-operation
/// transaction. A `remove_hub_session` racing a `save_server_session`
/// for the same hub key has unspecified interleaving.
///
/// Server sessions nest under their hub key, so cascade removal and
/// per-hub listing touch a single map entry. Lookups clone the session
/// out — no store entry is ever held across a backend call.
#[derive(Default)]
pub struct SessionStore {
    hub_sessions: DashMap<String, HubSession>,
    server_sessions: DashMap<String, HashMap<i64, ServerSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_hub_session(&self, session: HubSession) {
        debug!(hub_key = %session.key, user = %session.username, "saving hub session");
        self.hub_sessions.insert(session.key.clone(), session);
    }

    pub fn retrieve_hub_session(&self, key: &str) -> Option<HubSession> {
        self.hub_sessions.get(key).map(|s| s.clone())
    }

    /// Remove a hub session and every server session it owns.
    pub fn remove_hub_session(&self, key: &str) -> Option<HubSession> {
        let owned = self
            .server_sessions
            .remove(key)
            .map(|(_, sessions)| sessions.len())
            .unwrap_or(0);
        let removed = self.hub_sessions.remove(key).map(|(_, session)| session);
        if removed.is_some() {
            debug!(hub_key = %key, cascaded = owned, "removed hub session");
        }
        removed
    }

    pub fn save_server_session(&self, hub_key: &str, session: ServerSession) {
        self.server_sessions
            .entry(hub_key.to_string())
            .or_default()
            .insert(session.server_id, session);
    }

    pub fn retrieve_server_session(&self, hub_key: &str, server_id: i64) -> Option<ServerSession> {
        self.server_sessions
            .get(hub_key)
            .and_then(|sessions| sessions.get(&server_id).cloned())
    }

    /// All server sessions under a hub key. An unknown key yields an
    /// empty list, not an error.
    pub fn list_server_sessions(&self, hub_key: &str) -> Vec<ServerSession> {
        self.server_sessions
            .get(hub_key)
            .map(|sessions| sessions.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hub_session(key: &str) -> HubSession {
        HubSession::new(key, "admin", "secret", LoginMode::Manual)
    }

    fn server_session(hub_key: &str, id: i64) -> ServerSession {
        ServerSession::new(
            id,
            format!("http://server-{id}.example.org/rpc/api"),
            format!("server-key-{id}"),
            hub_key,
        )
    }

    #[test]
    fn hub_session_roundtrip() {
        let store = SessionStore::new();
        store.save_hub_session(hub_session("hub-key"));

        let found = store.retrieve_hub_session("hub-key").unwrap();
        assert_eq!(found.username, "admin");
        assert_eq!(found.mode, LoginMode::Manual);
        assert!(store.retrieve_hub_session("other-key").is_none());
    }

    #[test]
    fn server_session_roundtrip() {
        let store = SessionStore::new();
        store.save_hub_session(hub_session("hub-key"));
        store.save_server_session("hub-key", server_session("hub-key", 1234));

        let found = store.retrieve_server_session("hub-key", 1234).unwrap();
        assert_eq!(found, server_session("hub-key", 1234));
        assert!(store.retrieve_server_session("hub-key", -1).is_none());
        assert!(store.retrieve_server_session("missing", 1234).is_none());
    }

    #[test]
    fn save_overwrites_per_server_id() {
        let store = SessionStore::new();
        store.save_server_session("hub-key", server_session("hub-key", 1));
        let mut replacement = server_session("hub-key", 1);
        replacement.session_key = "rotated".into();
        store.save_server_session("hub-key", replacement.clone());

        assert_eq!(
            store.retrieve_server_session("hub-key", 1).unwrap(),
            replacement
        );
        assert_eq!(store.list_server_sessions("hub-key").len(), 1);
    }

    #[test]
    fn remove_hub_session_cascades() {
        let store = SessionStore::new();
        store.save_hub_session(hub_session("hub-key"));
        for id in [1, 2, 3] {
            store.save_server_session("hub-key", server_session("hub-key", id));
        }

        assert!(store.remove_hub_session("hub-key").is_some());
        assert!(store.retrieve_hub_session("hub-key").is_none());
        for id in [1, 2, 3] {
            assert!(store.retrieve_server_session("hub-key", id).is_none());
        }
        assert!(store.list_server_sessions("hub-key").is_empty());
    }

    #[test]
    fn remove_leaves_other_hub_sessions_alone() {
        let store = SessionStore::new();
        store.save_hub_session(hub_session("one"));
        store.save_hub_session(hub_session("two"));
        store.save_server_session("one", server_session("one", 1));
        store.save_server_session("two", server_session("two", 2));

        store.remove_hub_session("one");
        assert!(store.retrieve_hub_session("two").is_some());
        assert!(store.retrieve_server_session("two", 2).is_some());
    }

    #[test]
    fn list_is_empty_for_unknown_key() {
        let store = SessionStore::new();
        assert!(store.list_server_sessions("nobody").is_empty());
    }

    #[test]
    fn concurrent_saves_are_all_visible() {
        let store = std::sync::Arc::new(SessionStore::new());
        std::thread::scope(|scope| {
            for worker in 0..8 {
                let store = std::sync::Arc::clone(&store);
                scope.spawn(move || {
                    for id in 0..50 {
                        let hub_key = format!("hub-{worker}");
                        store.save_hub_session(hub_session(&hub_key));
                        store.save_server_session(&hub_key, server_session(&hub_key, id));
                    }
                });
            }
        });
        for worker in 0..8 {
            assert_eq!(
                store.list_server_sessions(&format!("hub-{worker}")).len(),
                50
            );
        }
    }
}
