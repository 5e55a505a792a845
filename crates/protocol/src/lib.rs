//! Wire protocol: the XML-RPC value model, the fault taxonomy, and the
//! methodCall/methodResponse envelope codec.
//!
//! Everything above this crate works with [`Value`] and [`Fault`]; only
//! `wire` knows the angle brackets.

pub mod fault;
pub mod value;
pub mod wire;

pub use fault::{Fault, fault_codes};
pub use value::Value;
