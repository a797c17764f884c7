//! Relay server
//!
//! Owns the process-wide pieces (port allocator, peer directory, live-event
//! broadcaster, signaling dispatcher) and drives the engine event loop.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::engine::{EngineEvent, MediaEngine};
use crate::error::{Error, Result};
use crate::events::EventBroadcaster;
use crate::packaging::{EncoderLauncher, PackagingContext};
use crate::ports::{PortAllocator, UdpBindProbe};
use crate::registry::SessionDirectory;
use crate::server::config::RelayConfig;
use crate::signaling::Dispatcher;

/// Media relay with HLS packaging
pub struct RelayServer {
    config: RelayConfig,
    engine: Arc<dyn MediaEngine>,
    ports: Arc<PortAllocator>,
    directory: Arc<SessionDirectory>,
    broadcaster: Arc<EventBroadcaster>,
    dispatcher: Arc<Dispatcher>,
}

impl RelayServer {
    /// Create a relay around an engine and an encoder launcher
    ///
    /// Ports are probed with UDP binds on the configured sink address.
    pub fn new(
        config: RelayConfig,
        engine: Arc<dyn MediaEngine>,
        launcher: Arc<dyn EncoderLauncher>,
    ) -> Result<Self> {
        let ports = Arc::new(PortAllocator::with_probe(
            config.port_range.clone(),
            config.packaging.sink_ip,
            Arc::new(UdpBindProbe),
        ));
        Self::with_ports(config, engine, launcher, ports)
    }

    /// Create a relay with a custom port allocator
    pub fn with_ports(
        config: RelayConfig,
        engine: Arc<dyn MediaEngine>,
        launcher: Arc<dyn EncoderLauncher>,
        ports: Arc<PortAllocator>,
    ) -> Result<Self> {
        config.validate()?;

        let directory = Arc::new(SessionDirectory::new());
        let broadcaster = Arc::new(EventBroadcaster::new(config.subscriber_buffer));
        let packaging = PackagingContext {
            engine: Arc::clone(&engine),
            ports: Arc::clone(&ports),
            launcher,
            broadcaster: Arc::clone(&broadcaster),
            config: Arc::new(config.packaging.clone()),
        };
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&engine),
            Arc::clone(&directory),
            packaging,
            config.notification_buffer,
        ));

        Ok(Self {
            config,
            engine,
            ports,
            directory,
            broadcaster,
            dispatcher,
        })
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Signaling entry point for client connections
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn directory(&self) -> &Arc<SessionDirectory> {
        &self.directory
    }

    /// Live-event feed for out-of-band subscribers
    pub fn broadcaster(&self) -> &Arc<EventBroadcaster> {
        &self.broadcaster
    }

    pub fn ports(&self) -> &Arc<PortAllocator> {
        &self.ports
    }

    /// Run until the media engine dies
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run until `shutdown` resolves or the media engine dies
    ///
    /// Every peer is closed before returning. Engine death is the only error
    /// that ends the loop.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::fs::create_dir_all(&self.config.packaging.live_dir).await?;
        let mut events = self.engine.events();

        tracing::info!(
            live_dir = %self.config.packaging.live_dir.display(),
            sink_ip = %self.config.packaging.sink_ip,
            ports = ?self.config.port_range,
            "Relay running"
        );

        let result = tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.event_loop(&mut events) => result,
        };

        self.directory.close_all().await;
        tracing::info!("Relay stopped");

        result
    }

    async fn event_loop(&self, events: &mut broadcast::Receiver<EngineEvent>) -> Result<()> {
        loop {
            match events.recv().await {
                Ok(EngineEvent::Died) => {
                    tracing::error!("Media engine died");
                    return Err(Error::EngineDied);
                }
                Ok(event) => {
                    self.directory.route_engine_event(&event).await;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // Closes in the gap are not replayed; their handles linger until the owners leave
                    tracing::warn!(
                        skipped = skipped,
                        "Engine events lagged, resources closed meanwhile stay registered"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::error!("Engine event stream closed");
                    return Err(Error::EngineDied);
                }
            }
        }
    }
}
