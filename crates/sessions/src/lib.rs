//! Session storage for the gateway.
//!
//! Two kinds of sessions share a lifetime boundary: a hub session (the
//! caller's authenticated handle at the hub) and the server sessions
//! derived from it, one per peripheral server. Removing a hub session
//! cascades to every server session it owns.

pub mod store;

pub use store::{HubSession, LoginMode, ServerSession, SessionStore};
