//! Peer registry
//!
//! ```text
//!                    Arc<SessionDirectory>
//!               ┌─────────────────────────────┐
//!               │ peers: HashMap<id, Peer {   │
//!               │   send/recv transports,     │
//!               │   producers, consumers,     │
//!               │   packaging session,        │
//!               │ }>                          │
//!               └──────────────┬──────────────┘
//!                              │
//!        ┌─────────────────────┼─────────────────────┐
//!        ▼                     ▼                     ▼
//!   [Dispatcher]         [RelayServer]          [Dispatcher]
//!   connect/remove       engine events          remote producer
//!                        → owning peer          lookup
//! ```
//!
//! Each [`Peer`] serializes its own mutations; the directory only guards
//! membership.

pub mod peer;
pub mod store;

pub use peer::Peer;
pub use store::SessionDirectory;
