//! Session orchestration for an SFU media relay with live HLS packaging
//!
//! Clients negotiate WebRTC transports through the signaling [`Dispatcher`],
//! publish audio and video producers, and consume each other's producers. The
//! media plane itself lives in an external engine behind [`MediaEngine`].
//! Once a peer publishes one producer of each kind, a [`PackagingSession`]
//! forwards both over plain RTP to two encoder processes and publishes an HLS
//! master playlist; out-of-band viewers follow live peers through the
//! [`EventBroadcaster`].
//!
//! ```text
//!   client ──signaling──► Dispatcher ──► SessionDirectory ──► Peer
//!                              │                               │
//!                              ▼                               ▼
//!                         MediaEngine ◄──────────────── PackagingSession
//!                              │                          │        │
//!                              └──RTP──► encoder ◄────────┘        ▼
//!                                           │               EventBroadcaster
//!                                           ▼
//!                                     <live>/<peer>.m3u8
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use hls_relay::{FfmpegLauncher, MediaEngine, RelayConfig, RelayServer};
//!
//! async fn serve(engine: Arc<dyn MediaEngine>) -> hls_relay::Result<()> {
//!     let config = RelayConfig::from_env()?;
//!     let launcher = Arc::new(FfmpegLauncher::new(config.packaging.encoder_program.clone()));
//!     let server = RelayServer::new(config, engine, launcher)?;
//!
//!     server
//!         .run_until(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await
//! }
//! ```

pub mod engine;
pub mod error;
pub mod events;
pub mod media;
pub mod packaging;
pub mod ports;
pub mod registry;
pub mod server;
pub mod signaling;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::{EngineError, EngineEvent, MediaEngine, MediaKind};
pub use error::{Error, Result};
pub use events::{EventBroadcaster, LiveEvent, Subscription};
pub use media::{Consumer, Producer, Transport, TransportRole};
pub use packaging::{FfmpegLauncher, PackagingConfig, PackagingSession, PackagingState};
pub use ports::PortAllocator;
pub use registry::{Peer, SessionDirectory};
pub use server::{RelayConfig, RelayServer};
pub use signaling::{Connection, Dispatcher, Notification, Request, Response};
