//! Producer and consumer handles

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::engine::{
    ConsumerId, ConsumerInfo, MediaEngine, MediaKind, ProducerId, RtpParameters, TransportId,
};
use crate::error::{Error, Result};

/// An inbound media stream contributed by a peer
pub struct Producer {
    id: ProducerId,
    kind: MediaKind,
    transport_id: TransportId,
    paused: AtomicBool,
    closed: AtomicBool,
    engine: Arc<dyn MediaEngine>,
}

impl Producer {
    pub(crate) fn new(
        id: ProducerId,
        kind: MediaKind,
        transport_id: TransportId,
        engine: Arc<dyn MediaEngine>,
    ) -> Self {
        Self {
            id,
            kind,
            transport_id,
            paused: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            engine,
        }
    }

    pub fn id(&self) -> &ProducerId {
        &self.id
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Transport this producer arrived on
    pub fn transport_id(&self) -> &TransportId {
        &self.transport_id
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub async fn pause(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::not_found("producer", &self.id));
        }
        self.engine.pause_producer(&self.id).await?;
        self.paused.store(true, Ordering::Release);
        Ok(())
    }

    pub async fn resume(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::not_found("producer", &self.id));
        }
        self.engine.resume_producer(&self.id).await?;
        self.paused.store(false, Ordering::Release);
        Ok(())
    }

    /// Close the producer; only the first call reaches the engine
    pub async fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        if let Err(e) = self.engine.close_producer(&self.id).await {
            tracing::warn!(producer = %self.id, error = %e, "Engine failed to close producer");
        }
        true
    }

    /// Record a close performed by the engine (transport closed, etc.)
    pub(crate) fn mark_closed(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

impl std::fmt::Debug for Producer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Producer")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("paused", &self.is_paused())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// An outbound media stream delivered to a peer or to a packaging sink
pub struct Consumer {
    id: ConsumerId,
    kind: MediaKind,
    producer_id: ProducerId,
    transport_id: TransportId,
    rtp_parameters: RtpParameters,
    paused: AtomicBool,
    closed: AtomicBool,
    engine: Arc<dyn MediaEngine>,
}

impl Consumer {
    pub(crate) fn new(
        info: ConsumerInfo,
        transport_id: TransportId,
        paused: bool,
        engine: Arc<dyn MediaEngine>,
    ) -> Self {
        Self {
            id: info.id,
            kind: info.kind,
            producer_id: info.producer_id,
            transport_id,
            rtp_parameters: info.rtp_parameters,
            paused: AtomicBool::new(paused),
            closed: AtomicBool::new(false),
            engine,
        }
    }

    pub fn id(&self) -> &ConsumerId {
        &self.id
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Producer this consumer delivers
    pub fn producer_id(&self) -> &ProducerId {
        &self.producer_id
    }

    pub fn transport_id(&self) -> &TransportId {
        &self.transport_id
    }

    /// Parameters negotiated by the engine for this consumer
    pub fn rtp_parameters(&self) -> &RtpParameters {
        &self.rtp_parameters
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub async fn pause(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::not_found("consumer", &self.id));
        }
        self.engine.pause_consumer(&self.id).await?;
        self.paused.store(true, Ordering::Release);
        Ok(())
    }

    pub async fn resume(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::not_found("consumer", &self.id));
        }
        self.engine.resume_consumer(&self.id).await?;
        self.paused.store(false, Ordering::Release);
        Ok(())
    }

    /// Close the consumer; only the first call reaches the engine
    pub async fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        if let Err(e) = self.engine.close_consumer(&self.id).await {
            tracing::warn!(consumer = %self.id, error = %e, "Engine failed to close consumer");
        }
        true
    }

    pub(crate) fn mark_closed(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

impl std::fmt::Debug for Consumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Consumer")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("producer_id", &self.producer_id)
            .field("paused", &self.is_paused())
            .field("closed", &self.is_closed())
            .finish()
    }
}
