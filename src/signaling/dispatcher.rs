//! Signaling dispatcher
//!
//! Turns client requests into operations on the peer's resources and fans
//! notifications out to the other peers. Every request runs on the caller's
//! task; a failure is reported to the requesting client only.

use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::engine::{MediaEngine, MediaKind, ProducerId, RtpCapabilities, RtpParameters};
use crate::engine::{ConsumerId, TransportConnectParams, TransportId};
use crate::error::{Error, Result};
use crate::media::{Producer, Transport, TransportRole};
use crate::packaging::{PackagingContext, PackagingSession};
use crate::registry::{Peer, SessionDirectory};

use super::message::{Notification, RemoteProducer, Request, Response, TransportDirection};

/// A freshly connected client
#[derive(Debug)]
pub struct Connection {
    pub peer_id: String,
    /// Notifications to forward to the client
    pub notifications: mpsc::Receiver<Notification>,
}

/// Routes signaling requests for every connected peer
pub struct Dispatcher {
    engine: Arc<dyn MediaEngine>,
    directory: Arc<SessionDirectory>,
    packaging: PackagingContext,
    notification_buffer: usize,
}

impl Dispatcher {
    pub fn new(
        engine: Arc<dyn MediaEngine>,
        directory: Arc<SessionDirectory>,
        packaging: PackagingContext,
        notification_buffer: usize,
    ) -> Self {
        Self {
            engine,
            directory,
            packaging,
            notification_buffer: notification_buffer.max(1),
        }
    }

    pub fn directory(&self) -> &Arc<SessionDirectory> {
        &self.directory
    }

    /// Register a new client
    ///
    /// The client is told its id, and every other peer learns that it joined.
    pub async fn connect(&self) -> Connection {
        let peer_id = Uuid::new_v4().to_string();
        let (tx, notifications) = mpsc::channel(self.notification_buffer);
        let peer = Arc::new(Peer::new(peer_id.clone(), tx));

        self.directory.add(Arc::clone(&peer)).await;
        peer.notify(Notification::ConnectionSuccess {
            peer_id: peer_id.clone(),
        });
        self.notify_others(&peer_id, Notification::PeerJoined {
            peer_id: peer_id.clone(),
        })
        .await;

        tracing::info!(peer = %peer_id, "Client connected");
        Connection {
            peer_id,
            notifications,
        }
    }

    /// Tear a client down
    ///
    /// Unknown ids are ignored, so a disconnect racing another disconnect is
    /// harmless.
    pub async fn disconnect(&self, peer_id: &str) {
        if self.directory.remove(peer_id).await.is_none() {
            return;
        }

        self.notify_others(peer_id, Notification::PeerLeft {
            peer_id: peer_id.to_string(),
        })
        .await;
        tracing::info!(peer = %peer_id, "Client disconnected");
    }

    /// Handle one request, turning any failure into an error response
    pub async fn dispatch(&self, peer_id: &str, request: Request) -> Response {
        let name = request.name();
        match self.handle(peer_id, request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(peer = %peer_id, request = name, error = %e, "Request failed");
                Response::Error {
                    message: e.to_string(),
                }
            }
        }
    }

    async fn handle(&self, peer_id: &str, request: Request) -> Result<Response> {
        tracing::debug!(peer = %peer_id, request = request.name(), "Handling request");

        match request {
            Request::GetRouterRtpCapabilities => Ok(Response::RtpCapabilities {
                rtp_capabilities: self.engine.rtp_capabilities(),
            }),
            Request::CreateWebRtcTransport { direction } => {
                self.create_transport(peer_id, direction).await
            }
            Request::ConnectTransport {
                transport_id,
                dtls_parameters,
            } => {
                self.connect_transport(peer_id, &transport_id, dtls_parameters)
                    .await
            }
            Request::Produce {
                kind,
                rtp_parameters,
            } => self.produce(peer_id, kind, rtp_parameters).await,
            Request::Consume {
                producer_id,
                rtp_capabilities,
            } => self.consume(peer_id, &producer_id, &rtp_capabilities).await,
            Request::ResumeConsumer { consumer_id } => {
                self.resume_consumer(peer_id, &consumer_id).await
            }
            Request::GetProducers => self.remote_producers(peer_id).await,
            Request::PauseProducer { kind } => self.set_producer_paused(peer_id, kind, true).await,
            Request::ResumeProducer { kind } => {
                self.set_producer_paused(peer_id, kind, false).await
            }
        }
    }

    async fn peer(&self, peer_id: &str) -> Result<Arc<Peer>> {
        self.directory
            .get(peer_id)
            .await
            .ok_or_else(|| Error::not_found("peer", peer_id))
    }

    async fn create_transport(&self, peer_id: &str, direction: TransportDirection) -> Result<Response> {
        let peer = self.peer(peer_id).await?;
        let role = match direction {
            TransportDirection::Send => TransportRole::Send,
            TransportDirection::Recv => TransportRole::Recv,
        };

        let (transport, info) = Transport::webrtc(&self.engine, role).await?;
        match peer.set_transport(Arc::clone(&transport)).await {
            Ok(Some(previous)) => {
                tracing::debug!(peer = %peer_id, transport = %previous.id(), "Replacing transport");
                previous.close().await;
            }
            Ok(None) => {}
            Err(e) => {
                transport.close().await;
                return Err(e);
            }
        }

        Ok(Response::TransportCreated { params: info })
    }

    async fn connect_transport(
        &self,
        peer_id: &str,
        transport_id: &TransportId,
        dtls_parameters: serde_json::Value,
    ) -> Result<Response> {
        let peer = self.peer(peer_id).await?;
        let transport = peer
            .find_transport(transport_id)
            .await
            .ok_or_else(|| Error::not_found("transport", transport_id))?;

        transport
            .connect(TransportConnectParams::WebRtc { dtls_parameters })
            .await?;
        Ok(Response::Ack)
    }

    async fn produce(
        &self,
        peer_id: &str,
        kind: MediaKind,
        rtp_parameters: RtpParameters,
    ) -> Result<Response> {
        let peer = self.peer(peer_id).await?;
        let transport = peer
            .transport(TransportRole::Send)
            .await
            .ok_or(Error::TransportNotReady("send transport"))?;

        let producer = transport.produce(kind, rtp_parameters).await?;
        if let Err(e) = peer.add_producer(Arc::clone(&producer)).await {
            producer.close().await;
            return Err(e);
        }

        self.notify_others(peer_id, Notification::NewProducer {
            peer_id: peer_id.to_string(),
            producer_id: producer.id().clone(),
            kind,
        })
        .await;

        self.maybe_start_packaging(&peer).await;

        Ok(Response::Produced {
            producer_id: producer.id().clone(),
        })
    }

    /// Start packaging in the background once the peer has both kinds
    ///
    /// A session retiring after its source producer closed holds the peer's
    /// output files, so its successor is started only once it is `Closed`.
    async fn maybe_start_packaging(&self, peer: &Arc<Peer>) {
        if let Some((session, video, audio)) = peer.begin_packaging(&self.packaging).await {
            tokio::spawn(run_packaging(session, video, audio));
            return;
        }

        let Some(retiring) = peer.retiring_packaging().await else {
            return;
        };
        tracing::debug!(peer = %peer.id(), "Packaging deferred until the retiring session closes");

        let peer = Arc::clone(peer);
        let ctx = self.packaging.clone();
        tokio::spawn(async move {
            retiring.wait_closed().await;
            if let Some((session, video, audio)) = peer.begin_packaging(&ctx).await {
                run_packaging(session, video, audio).await;
            }
        });
    }

    async fn consume(
        &self,
        peer_id: &str,
        producer_id: &ProducerId,
        capabilities: &RtpCapabilities,
    ) -> Result<Response> {
        let peer = self.peer(peer_id).await?;
        let transport = peer
            .transport(TransportRole::Recv)
            .await
            .ok_or(Error::TransportNotReady("receive transport"))?;

        let (owner, producer) = self
            .directory
            .find_producer(peer_id, producer_id)
            .await
            .ok_or_else(|| Error::not_found("producer", producer_id))?;

        if !self.engine.can_consume(producer.id(), capabilities) {
            return Err(Error::CannotConsume(producer_id.to_string()));
        }

        let consumer = transport.consume(producer.id(), capabilities, true).await?;
        if let Err(e) = peer.add_consumer(Arc::clone(&consumer)).await {
            consumer.close().await;
            return Err(e);
        }

        Ok(Response::Consumed {
            id: consumer.id().clone(),
            producer_id: producer.id().clone(),
            peer_id: owner.id().to_string(),
            kind: consumer.kind(),
            rtp_parameters: consumer.rtp_parameters().clone(),
        })
    }

    async fn resume_consumer(&self, peer_id: &str, consumer_id: &ConsumerId) -> Result<Response> {
        let peer = self.peer(peer_id).await?;
        let consumer = peer
            .consumer(consumer_id)
            .await
            .ok_or_else(|| Error::not_found("consumer", consumer_id))?;

        consumer.resume().await?;
        Ok(Response::Ack)
    }

    async fn remote_producers(&self, peer_id: &str) -> Result<Response> {
        let producers = self
            .directory
            .remote_producers(peer_id)
            .await
            .into_iter()
            .map(|(owner, producer)| RemoteProducer {
                peer_id: owner.id().to_string(),
                producer_id: producer.id().clone(),
                kind: producer.kind(),
            })
            .collect();

        Ok(Response::Producers { producers })
    }

    async fn set_producer_paused(&self, peer_id: &str, kind: MediaKind, paused: bool) -> Result<Response> {
        let peer = self.peer(peer_id).await?;
        let producer = peer
            .producer_by_kind(kind)
            .await
            .ok_or_else(|| Error::not_found("producer", kind))?;

        if paused {
            producer.pause().await?;
        } else {
            producer.resume().await?;
        }

        let change = Notification::ProducerChange {
            peer_id: peer_id.to_string(),
            kind,
            paused,
        };
        for peer in self.directory.all().await {
            peer.notify(change.clone());
        }

        Ok(Response::Ack)
    }

    async fn notify_others(&self, peer_id: &str, notification: Notification) {
        for peer in self.directory.others(peer_id).await {
            peer.notify(notification.clone());
        }
    }
}

async fn run_packaging(session: Arc<PackagingSession>, video: Arc<Producer>, audio: Arc<Producer>) {
    match session.start(&video, &audio).await {
        Ok(()) => {}
        Err(Error::Cancelled) => {
            tracing::debug!(peer = %session.peer_id(), "Packaging cancelled by teardown")
        }
        Err(e) => {
            tracing::warn!(peer = %session.peer_id(), error = %e, "Packaging failed, peer continues without it")
        }
    }
}
