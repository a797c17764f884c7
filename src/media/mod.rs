//! Media resource handles
//!
//! Thin, clonable (`Arc`) handles over engine-side transports, producers and
//! consumers. Each handle remembers whether it was closed so that a second
//! close never reaches the engine, and so that lookups can tell a live stream
//! from a stale one.

pub mod stream;
pub mod transport;

pub use stream::{Consumer, Producer};
pub use transport::{Transport, TransportRole};
