//! Media engine boundary
//!
//! The relay never performs ICE, DTLS, SRTP or RTP routing itself. All of that
//! happens inside an external media engine reached through the [`MediaEngine`]
//! trait. One engine instance is constructed by the process entry point and
//! injected as `Arc<dyn MediaEngine>` into every component that needs it:
//!
//! ```text
//!                  Arc<dyn MediaEngine>
//!          ┌──────────────┼──────────────────┐
//!          ▼              ▼                  ▼
//!     Dispatcher    PackagingSession    RelayServer
//!   (webrtc xports,  (plain sinks,      (engine event loop,
//!    produce/consume) sink consumers)    fatal on Died)
//! ```
//!
//! Errors returned by the engine are opaque: they are wrapped in
//! [`EngineError`] and propagated without interpretation.

pub mod types;

use std::net::IpAddr;

use async_trait::async_trait;
use tokio::sync::broadcast;

pub use types::{
    ConsumerId, ConsumerInfo, EngineEvent, MediaKind, ProducerId, RtpCapabilities,
    RtpCodecParameters, RtpParameters, TransportConnectParams, TransportId, WebRtcTransportInfo,
};

/// Opaque failure reported by the media engine
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct EngineError {
    message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result of a single engine call
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Calls the relay makes into the external media engine
///
/// Every async method is a suspend point awaiting the engine. Implementations
/// must be safe to call concurrently from many peers.
#[async_trait]
pub trait MediaEngine: Send + Sync + 'static {
    /// RTP capabilities of the router
    fn rtp_capabilities(&self) -> RtpCapabilities;

    /// Whether the router can deliver `producer` to an endpoint with `capabilities`
    fn can_consume(&self, producer: &ProducerId, capabilities: &RtpCapabilities) -> bool;

    /// Subscribe to asynchronous engine notifications
    ///
    /// The relay keeps its peer maps in step with the engine through these
    /// events only. A receiver that lags loses the skipped ones: resources the
    /// engine closed in that stretch stay registered, and keep being listed to
    /// other peers, until their owner disconnects. Size the channel for the
    /// engine's peak close rate.
    fn events(&self) -> broadcast::Receiver<EngineEvent>;

    /// Create a WebRTC transport for a client
    async fn create_webrtc_transport(&self) -> EngineResult<WebRtcTransportInfo>;

    /// Create a plain RTP transport listening on `listen_ip`
    async fn create_plain_transport(&self, listen_ip: IpAddr) -> EngineResult<TransportId>;

    /// Connect a transport to its remote endpoint
    async fn connect_transport(
        &self,
        transport: &TransportId,
        params: TransportConnectParams,
    ) -> EngineResult<()>;

    /// Start receiving media from a client on `transport`
    async fn produce(
        &self,
        transport: &TransportId,
        kind: MediaKind,
        rtp_parameters: RtpParameters,
    ) -> EngineResult<ProducerId>;

    /// Start sending `producer`'s media out of `transport`
    async fn consume(
        &self,
        transport: &TransportId,
        producer: &ProducerId,
        capabilities: &RtpCapabilities,
        paused: bool,
    ) -> EngineResult<ConsumerInfo>;

    async fn pause_producer(&self, producer: &ProducerId) -> EngineResult<()>;

    async fn resume_producer(&self, producer: &ProducerId) -> EngineResult<()>;

    async fn close_producer(&self, producer: &ProducerId) -> EngineResult<()>;

    async fn pause_consumer(&self, consumer: &ConsumerId) -> EngineResult<()>;

    async fn resume_consumer(&self, consumer: &ConsumerId) -> EngineResult<()>;

    async fn close_consumer(&self, consumer: &ConsumerId) -> EngineResult<()>;

    /// Close a transport; the engine closes its producers and consumers with it
    async fn close_transport(&self, transport: &TransportId) -> EngineResult<()>;
}
