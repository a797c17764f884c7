//! Client signaling
//!
//! Transport-agnostic: whatever carries messages to and from clients calls
//! [`Dispatcher::connect`] once per connection, forwards each decoded
//! [`Request`] to [`Dispatcher::dispatch`], drains the connection's
//! [`Notification`] receiver, and calls [`Dispatcher::disconnect`] when the
//! client goes away.

pub mod dispatcher;
pub mod message;

pub use dispatcher::{Connection, Dispatcher};
pub use message::{Notification, RemoteProducer, Request, Response, TransportDirection};
