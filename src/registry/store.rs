//! Session directory
//!
//! Process-wide map from peer id to [`Peer`]. Mutated only by connect and
//! disconnect; every other access works on a snapshot of the entries so that
//! no peer lock is ever taken while the map lock is held.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::RwLock;

use crate::engine::{EngineEvent, ProducerId};
use crate::media::Producer;

use super::peer::Peer;

/// Directory of connected peers
#[derive(Default)]
pub struct SessionDirectory {
    peers: RwLock<HashMap<String, Arc<Peer>>>,
}

impl SessionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a peer
    ///
    /// A peer already registered under the same id is replaced and closed.
    pub async fn add(&self, peer: Arc<Peer>) {
        let replaced = {
            let mut peers = self.peers.write().await;
            let replaced = peers.insert(peer.id().to_string(), Arc::clone(&peer));
            tracing::info!(peer = %peer.id(), peers = peers.len(), "Peer registered");
            replaced
        };

        if let Some(old) = replaced {
            tracing::warn!(peer = %old.id(), "Peer id reused, closing previous peer");
            old.close().await;
        }
    }

    /// Close a peer and drop it from the directory
    ///
    /// Absent ids are ignored. The entry is removed before closing, so
    /// lookups stop returning the peer as soon as its teardown begins.
    pub async fn remove(&self, id: &str) -> Option<Arc<Peer>> {
        let peer = {
            let mut peers = self.peers.write().await;
            let peer = peers.remove(id)?;
            tracing::info!(peer = %id, peers = peers.len(), "Peer unregistered");
            peer
        };

        peer.close().await;
        Some(peer)
    }

    pub async fn get(&self, id: &str) -> Option<Arc<Peer>> {
        self.peers.read().await.get(id).cloned()
    }

    /// Every peer except `exclude`
    pub async fn others(&self, exclude: &str) -> Vec<Arc<Peer>> {
        self.peers
            .read()
            .await
            .values()
            .filter(|peer| peer.id() != exclude)
            .cloned()
            .collect()
    }

    /// Every peer
    pub async fn all(&self) -> Vec<Arc<Peer>> {
        self.peers.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.peers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.peers.read().await.is_empty()
    }

    /// Resolve a producer owned by any peer except `exclude`
    pub async fn find_producer(
        &self,
        exclude: &str,
        id: &ProducerId,
    ) -> Option<(Arc<Peer>, Arc<Producer>)> {
        for peer in self.others(exclude).await {
            if let Some(producer) = peer.producer(id).await {
                if !producer.is_closed() {
                    return Some((peer, producer));
                }
            }
        }
        None
    }

    /// Open producers of every peer except `exclude`, with their owners
    pub async fn remote_producers(&self, exclude: &str) -> Vec<(Arc<Peer>, Arc<Producer>)> {
        let mut found = Vec::new();
        for peer in self.others(exclude).await {
            for producer in peer.producers().await {
                if !producer.is_closed() {
                    found.push((Arc::clone(&peer), producer));
                }
            }
        }
        found
    }

    /// Apply an engine notification to the peers it concerns
    ///
    /// Returns the number of peers that held the closed resource.
    pub async fn route_engine_event(&self, event: &EngineEvent) -> usize {
        let peers = self.all().await;
        let mut affected = 0;

        for peer in &peers {
            let hit = match event {
                EngineEvent::TransportClosed(id) => peer.on_transport_closed(id).await,
                EngineEvent::ProducerClosed(id) => peer.on_producer_closed(id).await,
                EngineEvent::ConsumerClosed(id) => peer.on_consumer_closed(id).await,
                EngineEvent::Died => false,
            };
            if hit {
                affected += 1;
            }
        }

        tracing::debug!(event = ?event, affected = affected, "Engine event routed");
        affected
    }

    /// Close and drop every peer
    pub async fn close_all(&self) {
        let peers: Vec<Arc<Peer>> = {
            let mut peers = self.peers.write().await;
            peers.drain().map(|(_, peer)| peer).collect()
        };

        if peers.is_empty() {
            return;
        }

        tracing::info!(peers = peers.len(), "Closing all peers");
        join_all(peers.iter().map(|peer| peer.close())).await;
    }
}
