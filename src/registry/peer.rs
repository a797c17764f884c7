//! Per-peer resource registry

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::engine::{ConsumerId, MediaKind, ProducerId, TransportId};
use crate::error::{Error, Result};
use crate::media::{Consumer, Producer, Transport, TransportRole};
use crate::packaging::{PackagingContext, PackagingSession};
use crate::signaling::Notification;

/// Everything a peer owns
#[derive(Default)]
struct PeerState {
    /// Once set, the close path is the only writer
    closed: bool,
    send_transport: Option<Arc<Transport>>,
    recv_transport: Option<Arc<Transport>>,
    producers: HashMap<ProducerId, Arc<Producer>>,
    consumers: HashMap<ConsumerId, Arc<Consumer>>,
    packaging: Option<Arc<PackagingSession>>,
    /// Session stopping because a source producer closed; its successor waits for it
    retiring: Option<Arc<PackagingSession>>,
}

impl PeerState {
    fn ensure_open(&self, peer_id: &str) -> Result<()> {
        if self.closed {
            Err(Error::PeerClosed(peer_id.to_string()))
        } else {
            Ok(())
        }
    }

    /// Retire the packaging session if removing producers left it without a source
    fn orphaned_packaging(&mut self, removed_producer: bool) -> Option<Arc<PackagingSession>> {
        let active = self
            .packaging
            .as_ref()
            .is_some_and(|session| !session.state().is_terminating());
        if !(removed_producer && active) {
            return None;
        }

        let session = self.packaging.take()?;
        self.retiring = Some(Arc::clone(&session));
        Some(session)
    }
}

/// Resources that became unreachable and still need closing
#[derive(Default)]
struct Released {
    transports: Vec<Arc<Transport>>,
    producers: Vec<Arc<Producer>>,
    consumers: Vec<Arc<Consumer>>,
    packaging: Vec<Arc<PackagingSession>>,
}

impl Released {
    fn is_empty(&self) -> bool {
        self.transports.is_empty()
            && self.producers.is_empty()
            && self.consumers.is_empty()
            && self.packaging.is_empty()
    }
}

/// One connected participant and the media resources it owns
///
/// All mutations are serialized through one lock per peer; peers never block
/// each other.
pub struct Peer {
    id: String,
    notifier: mpsc::Sender<Notification>,
    state: Mutex<PeerState>,
}

impl Peer {
    /// Create a peer delivering its notifications into `notifier`
    pub fn new(id: impl Into<String>, notifier: mpsc::Sender<Notification>) -> Self {
        Self {
            id: id.into(),
            notifier,
            state: Mutex::new(PeerState::default()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Queue a notification for this peer's client
    ///
    /// Never waits; a full or closed channel drops the notification.
    pub fn notify(&self, notification: Notification) -> bool {
        match self.notifier.try_send(notification) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(n)) => {
                tracing::warn!(peer = %self.id, notification = n.name(), "Notification queue full, dropping");
                false
            }
            Err(mpsc::error::TrySendError::Closed(n)) => {
                tracing::debug!(peer = %self.id, notification = n.name(), "Client gone, dropping notification");
                false
            }
        }
    }

    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }

    /// Attach a client transport
    ///
    /// Returns the transport previously held in the same role, which the
    /// caller should close. Fails with [`Error::PeerClosed`] once closing has
    /// begun; the caller then owns `transport` and must close it.
    pub async fn set_transport(&self, transport: Arc<Transport>) -> Result<Option<Arc<Transport>>> {
        let mut state = self.state.lock().await;
        state.ensure_open(&self.id)?;

        let slot = match transport.role() {
            TransportRole::Send => &mut state.send_transport,
            TransportRole::Recv => &mut state.recv_transport,
            TransportRole::PlainSink => return Err(Error::TransportNotReady("client transport")),
        };

        tracing::debug!(peer = %self.id, transport = %transport.id(), role = ?transport.role(), "Transport attached");
        Ok(slot.replace(transport))
    }

    /// Client transport in `role`
    pub async fn transport(&self, role: TransportRole) -> Option<Arc<Transport>> {
        let state = self.state.lock().await;
        match role {
            TransportRole::Send => state.send_transport.clone(),
            TransportRole::Recv => state.recv_transport.clone(),
            TransportRole::PlainSink => None,
        }
    }

    /// Client transport with the given id
    pub async fn find_transport(&self, id: &TransportId) -> Option<Arc<Transport>> {
        let state = self.state.lock().await;
        let candidates = [state.send_transport.clone(), state.recv_transport.clone()];
        drop(state);

        candidates.into_iter().flatten().find(|t| t.id() == id)
    }

    /// Register a producer
    ///
    /// A second producer of a kind already present is rejected with
    /// [`Error::DuplicateProducer`]. On any error the caller still owns
    /// `producer` and must close it.
    pub async fn add_producer(&self, producer: Arc<Producer>) -> Result<()> {
        let mut state = self.state.lock().await;
        state.ensure_open(&self.id)?;

        if state.producers.values().any(|p| p.kind() == producer.kind()) {
            return Err(Error::DuplicateProducer(producer.kind()));
        }

        tracing::info!(peer = %self.id, producer = %producer.id(), kind = %producer.kind(), "Producer added");
        state.producers.insert(producer.id().clone(), producer);
        Ok(())
    }

    /// Register a consumer; on error the caller must close it
    pub async fn add_consumer(&self, consumer: Arc<Consumer>) -> Result<()> {
        let mut state = self.state.lock().await;
        state.ensure_open(&self.id)?;

        tracing::debug!(
            peer = %self.id,
            consumer = %consumer.id(),
            producer = %consumer.producer_id(),
            "Consumer added"
        );
        state.consumers.insert(consumer.id().clone(), consumer);
        Ok(())
    }

    pub async fn producer(&self, id: &ProducerId) -> Option<Arc<Producer>> {
        self.state.lock().await.producers.get(id).cloned()
    }

    pub async fn consumer(&self, id: &ConsumerId) -> Option<Arc<Consumer>> {
        self.state.lock().await.consumers.get(id).cloned()
    }

    pub async fn producer_by_kind(&self, kind: MediaKind) -> Option<Arc<Producer>> {
        self.state
            .lock()
            .await
            .producers
            .values()
            .find(|p| p.kind() == kind)
            .cloned()
    }

    /// Snapshot of the producers
    pub async fn producers(&self) -> Vec<Arc<Producer>> {
        self.state.lock().await.producers.values().cloned().collect()
    }

    /// Snapshot of the consumers
    pub async fn consumers(&self) -> Vec<Arc<Consumer>> {
        self.state.lock().await.consumers.values().cloned().collect()
    }

    /// Current packaging session, or the retiring one if none replaced it yet
    pub async fn packaging(&self) -> Option<Arc<PackagingSession>> {
        let state = self.state.lock().await;
        state.packaging.clone().or_else(|| state.retiring.clone())
    }

    /// Session still stopping after losing a source producer
    ///
    /// While one exists [`begin_packaging`](Self::begin_packaging) declines;
    /// wait for it to close and ask again.
    pub async fn retiring_packaging(&self) -> Option<Arc<PackagingSession>> {
        self.state
            .lock()
            .await
            .retiring
            .as_ref()
            .filter(|session| !session.state().is_closed())
            .cloned()
    }

    /// Create this peer's packaging session if it is due
    ///
    /// Due means one open producer of each kind and no session other than a
    /// `Closed` one, retiring sessions included. The check and the
    /// installation happen under the peer lock, so concurrent producer
    /// arrivals yield at most one session. A replaced session's pending file
    /// removal is cancelled because its successor writes the same files. The
    /// caller starts the returned session with the returned (video, audio)
    /// producers.
    pub async fn begin_packaging(
        &self,
        ctx: &PackagingContext,
    ) -> Option<(Arc<PackagingSession>, Arc<Producer>, Arc<Producer>)> {
        let mut state = self.state.lock().await;
        if state.closed {
            return None;
        }
        let busy = [&state.packaging, &state.retiring]
            .into_iter()
            .flatten()
            .any(|existing| !existing.state().is_closed());
        if busy {
            return None;
        }

        let by_kind = |kind| {
            state
                .producers
                .values()
                .find(|p| p.kind() == kind && !p.is_closed())
                .cloned()
        };
        let video = by_kind(MediaKind::Video)?;
        let audio = by_kind(MediaKind::Audio)?;

        for replaced in [state.packaging.take(), state.retiring.take()].into_iter().flatten() {
            replaced.cancel_file_removal();
        }

        let session = Arc::new(PackagingSession::new(self.id.clone(), ctx.clone()));
        state.packaging = Some(Arc::clone(&session));
        tracing::debug!(peer = %self.id, "Packaging session created");

        Some((session, video, audio))
    }

    /// The engine closed one of this peer's transports
    ///
    /// Drops the transport and everything that ran over it. Returns whether
    /// the transport belonged to this peer.
    pub async fn on_transport_closed(&self, id: &TransportId) -> bool {
        let orphaned = {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;

            let mut owned = false;
            for slot in [&mut state.send_transport, &mut state.recv_transport] {
                if slot.as_ref().is_some_and(|t| t.id() == id) {
                    if let Some(transport) = slot.take() {
                        transport.mark_closed();
                    }
                    owned = true;
                }
            }
            if !owned {
                return false;
            }

            let before = state.producers.len();
            state.producers.retain(|_, p| {
                let keep = p.transport_id() != id;
                if !keep {
                    p.mark_closed();
                }
                keep
            });
            let removed_producer = state.producers.len() != before;

            state.consumers.retain(|_, c| {
                let keep = c.transport_id() != id;
                if !keep {
                    c.mark_closed();
                }
                keep
            });

            tracing::info!(peer = %self.id, transport = %id, "Transport closed by engine");
            state.orphaned_packaging(removed_producer)
        };

        if let Some(session) = orphaned {
            self.stop_packaging_later(session);
        }
        true
    }

    /// A producer closed somewhere on the engine
    ///
    /// Removes it if it is ours, and removes our consumers of it either way.
    pub async fn on_producer_closed(&self, id: &ProducerId) -> bool {
        let orphaned = {
            let mut state = self.state.lock().await;

            let removed_producer = match state.producers.remove(id) {
                Some(producer) => {
                    producer.mark_closed();
                    tracing::info!(peer = %self.id, producer = %id, "Producer closed by engine");
                    true
                }
                None => false,
            };

            let before = state.consumers.len();
            state.consumers.retain(|_, c| {
                let keep = c.producer_id() != id;
                if !keep {
                    c.mark_closed();
                }
                keep
            });
            let removed_consumers = before - state.consumers.len();

            if !removed_producer && removed_consumers == 0 {
                return false;
            }
            state.orphaned_packaging(removed_producer)
        };

        if let Some(session) = orphaned {
            self.stop_packaging_later(session);
        }
        true
    }

    /// A consumer closed on the engine side
    pub async fn on_consumer_closed(&self, id: &ConsumerId) -> bool {
        let mut state = self.state.lock().await;
        match state.consumers.remove(id) {
            Some(consumer) => {
                consumer.mark_closed();
                true
            }
            None => false,
        }
    }

    fn stop_packaging_later(&self, session: Arc<PackagingSession>) {
        tracing::info!(peer = %self.id, "Source producer gone, stopping packaging");
        tokio::spawn(async move { session.stop().await });
    }

    /// Close every resource this peer owns
    ///
    /// Idempotent and total: the first call marks the peer closed, empties
    /// all mappings, stops packaging and closes producers, consumers and
    /// transports. Later calls find nothing left and return `false`.
    pub async fn close(&self) -> bool {
        let released = {
            let mut state = self.state.lock().await;
            let first = !state.closed;
            state.closed = true;

            let released = Released {
                transports: state
                    .send_transport
                    .take()
                    .into_iter()
                    .chain(state.recv_transport.take())
                    .collect(),
                producers: state.producers.drain().map(|(_, p)| p).collect(),
                consumers: state.consumers.drain().map(|(_, c)| c).collect(),
                packaging: state
                    .packaging
                    .take()
                    .into_iter()
                    .chain(state.retiring.take())
                    .collect(),
            };

            if !first && released.is_empty() {
                return false;
            }
            released
        };

        tracing::info!(
            peer = %self.id,
            producers = released.producers.len(),
            consumers = released.consumers.len(),
            transports = released.transports.len(),
            packaging = released.packaging.len(),
            "Closing peer"
        );

        for session in released.packaging {
            session.stop().await;
        }
        for consumer in released.consumers {
            consumer.close().await;
        }
        for producer in released.producers {
            producer.close().await;
        }
        for transport in released.transports {
            transport.close().await;
        }

        true
    }
}

impl std::fmt::Debug for Peer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Peer").field("id", &self.id).finish()
    }
}
