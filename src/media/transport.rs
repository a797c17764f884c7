//! Transport handle

use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::engine::{
    MediaEngine, MediaKind, ProducerId, RtpCapabilities, RtpParameters, TransportConnectParams,
    TransportId, WebRtcTransportInfo,
};
use crate::error::{Error, Result};

use super::stream::{Consumer, Producer};

/// Role of a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportRole {
    /// Client-to-relay WebRTC transport carrying producers
    Send,
    /// Relay-to-client WebRTC transport carrying consumers
    Recv,
    /// Plain RTP transport feeding a local encoder
    PlainSink,
}

/// A transport owned by a peer or a packaging session
pub struct Transport {
    id: TransportId,
    role: TransportRole,
    engine: Arc<dyn MediaEngine>,
    closed: AtomicBool,
}

impl Transport {
    /// Create a client WebRTC transport
    pub async fn webrtc(
        engine: &Arc<dyn MediaEngine>,
        role: TransportRole,
    ) -> Result<(Arc<Self>, WebRtcTransportInfo)> {
        let info = engine.create_webrtc_transport().await?;
        let transport = Arc::new(Self::from_parts(info.id.clone(), role, Arc::clone(engine)));

        tracing::debug!(transport = %info.id, role = ?role, "WebRTC transport created");
        Ok((transport, info))
    }

    /// Create a plain RTP sink transport listening on `listen_ip`
    pub async fn plain_sink(engine: &Arc<dyn MediaEngine>, listen_ip: IpAddr) -> Result<Arc<Self>> {
        let id = engine.create_plain_transport(listen_ip).await?;
        tracing::debug!(transport = %id, "Plain sink transport created");
        Ok(Arc::new(Self::from_parts(
            id,
            TransportRole::PlainSink,
            Arc::clone(engine),
        )))
    }

    pub(crate) fn from_parts(
        id: TransportId,
        role: TransportRole,
        engine: Arc<dyn MediaEngine>,
    ) -> Self {
        Self {
            id,
            role,
            engine,
            closed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &TransportId {
        &self.id
    }

    pub fn role(&self) -> TransportRole {
        self.role
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(Error::not_found("transport", &self.id))
        } else {
            Ok(())
        }
    }

    /// Connect to the remote endpoint
    pub async fn connect(&self, params: TransportConnectParams) -> Result<()> {
        self.ensure_open()?;
        self.engine.connect_transport(&self.id, params).await?;
        Ok(())
    }

    /// Receive a new producer on this transport
    pub async fn produce(
        &self,
        kind: MediaKind,
        rtp_parameters: RtpParameters,
    ) -> Result<Arc<Producer>> {
        self.ensure_open()?;
        let id = self.engine.produce(&self.id, kind, rtp_parameters).await?;

        Ok(Arc::new(Producer::new(
            id,
            kind,
            self.id.clone(),
            Arc::clone(&self.engine),
        )))
    }

    /// Deliver `producer` out of this transport
    pub async fn consume(
        &self,
        producer: &ProducerId,
        capabilities: &RtpCapabilities,
        paused: bool,
    ) -> Result<Arc<Consumer>> {
        self.ensure_open()?;
        let info = self
            .engine
            .consume(&self.id, producer, capabilities, paused)
            .await?;

        Ok(Arc::new(Consumer::new(
            info,
            self.id.clone(),
            paused,
            Arc::clone(&self.engine),
        )))
    }

    /// Close the transport
    ///
    /// Only the first call reaches the engine. Returns whether this call
    /// performed the close.
    pub async fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }

        if let Err(e) = self.engine.close_transport(&self.id).await {
            tracing::warn!(transport = %self.id, error = %e, "Engine failed to close transport");
        }
        true
    }

    /// Record a close that already happened on the engine side
    pub(crate) fn mark_closed(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("closed", &self.is_closed())
            .finish()
    }
}
