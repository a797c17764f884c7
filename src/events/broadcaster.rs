//! Live-stream event fan-out

use std::collections::BTreeSet;

use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::mpsc;

/// Handle identifying one subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Event delivered to out-of-band subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveEvent {
    /// Snapshot sent first to every new subscriber
    Init { live_peers: Vec<String> },
    /// A peer's packaged stream became playable
    PeerLive { peer_id: String },
    /// A previously live peer went away
    PeerLeft { peer_id: String },
}

impl LiveEvent {
    /// Event name on the wire
    pub fn name(&self) -> &'static str {
        match self {
            LiveEvent::Init { .. } => "init",
            LiveEvent::PeerLive { .. } => "peerLive",
            LiveEvent::PeerLeft { .. } => "peerLeft",
        }
    }

    /// JSON payload
    pub fn payload(&self) -> serde_json::Value {
        match self {
            LiveEvent::Init { live_peers } => json!({
                "livePeers": live_peers
                    .iter()
                    .map(|peer_id| json!({ "peerId": peer_id }))
                    .collect::<Vec<_>>()
            }),
            LiveEvent::PeerLive { peer_id } | LiveEvent::PeerLeft { peer_id } => {
                json!({ "peerId": peer_id })
            }
        }
    }

    /// Encode as one Server-Sent Events frame
    pub fn to_sse(&self) -> Bytes {
        Bytes::from(format!("event: {}\ndata: {}\n\n", self.name(), self.payload()))
    }
}

/// Receiving side of a subscription
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    rx: mpsc::Receiver<LiveEvent>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Next event, or `None` once unsubscribed
    pub async fn recv(&mut self) -> Option<LiveEvent> {
        self.rx.recv().await
    }

    /// Next event if one is already queued
    pub fn try_recv(&mut self) -> Option<LiveEvent> {
        self.rx.try_recv().ok()
    }
}

struct BroadcasterState {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, mpsc::Sender<LiveEvent>)>,
    live: BTreeSet<String>,
}

/// Fan-out notifier for live/left transitions
///
/// Independent of the per-peer signaling channels. Delivery is synchronous
/// and in registration order; every subscriber has its own bounded queue, so a
/// slow subscriber only loses its own events and a dropped one is pruned.
pub struct EventBroadcaster {
    state: Mutex<BroadcasterState>,
    capacity: usize,
}

impl EventBroadcaster {
    /// Create a broadcaster whose subscribers queue up to `capacity` events
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(BroadcasterState {
                next_id: 1,
                subscribers: Vec::new(),
                live: BTreeSet::new(),
            }),
            capacity: capacity.max(1),
        }
    }

    /// Register a subscriber
    ///
    /// The current live set is queued before the subscriber becomes visible
    /// to [`broadcast`](Self::broadcast), so nothing can overtake it.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.capacity);
        let mut state = self.state.lock();

        let id = SubscriptionId(state.next_id);
        state.next_id += 1;

        let snapshot = LiveEvent::Init {
            live_peers: state.live.iter().cloned().collect(),
        };
        // Fresh channel with capacity >= 1 always has room
        let _ = tx.try_send(snapshot);

        state.subscribers.push((id, tx));
        tracing::info!(subscribers = state.subscribers.len(), "Live-event subscriber added");

        Subscription { id, rx }
    }

    /// Remove a subscriber; unknown ids are ignored
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut state = self.state.lock();
        let before = state.subscribers.len();
        state.subscribers.retain(|(sid, _)| *sid != id);

        if state.subscribers.len() != before {
            tracing::info!(subscribers = state.subscribers.len(), "Live-event subscriber removed");
        }
    }

    /// Deliver an event to every subscriber
    pub fn broadcast(&self, event: LiveEvent) {
        let mut state = self.state.lock();
        Self::deliver(&mut state, event);
    }

    /// Record a peer as live and announce it
    ///
    /// Returns `false` if the peer was already live.
    pub fn mark_live(&self, peer_id: &str) -> bool {
        let mut state = self.state.lock();
        if !state.live.insert(peer_id.to_string()) {
            return false;
        }
        Self::deliver(
            &mut state,
            LiveEvent::PeerLive {
                peer_id: peer_id.to_string(),
            },
        );
        true
    }

    /// Remove a peer from the live set and announce it
    ///
    /// Peers that were never live produce no event.
    pub fn mark_left(&self, peer_id: &str) -> bool {
        let mut state = self.state.lock();
        if !state.live.remove(peer_id) {
            return false;
        }
        Self::deliver(
            &mut state,
            LiveEvent::PeerLeft {
                peer_id: peer_id.to_string(),
            },
        );
        true
    }

    pub fn is_live(&self, peer_id: &str) -> bool {
        self.state.lock().live.contains(peer_id)
    }

    pub fn live_peers(&self) -> Vec<String> {
        self.state.lock().live.iter().cloned().collect()
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }

    fn deliver(state: &mut BroadcasterState, event: LiveEvent) {
        tracing::debug!(
            event = event.name(),
            subscribers = state.subscribers.len(),
            "Broadcasting live event"
        );

        state.subscribers.retain(|(id, tx)| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(subscriber = id.0, event = event.name(), "Subscriber lagging, event dropped");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(subscriber = id.0, "Subscriber gone, pruning");
                false
            }
        });
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(64)
    }
}
