//! Packaging session
//!
//! Supervises the pipeline that republishes one peer's audio and video as HLS:
//!
//! ```text
//!  Producer(video) ──► sink Transport ──RTP──► :port0/:port1 ──► encoder ──► <peer>-video.m3u8
//!  Producer(audio) ──► sink Transport ──RTP──► :port2/:port3 ──► encoder ──► <peer>-audio.m3u8
//!                                                                   └──────► <peer>.m3u8
//! ```
//!
//! Every resource is recorded in the session as soon as it exists. Teardown
//! takes whatever has been recorded, so it can run at any point of startup,
//! and a startup step that finishes after teardown began disposes of its own
//! result instead of recording it.

use std::path::Path;
use std::sync::Arc;

use futures::future::join_all;
use tokio::io::AsyncWriteExt;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::engine::{MediaEngine, MediaKind, TransportConnectParams};
use crate::error::{Error, Result};
use crate::events::EventBroadcaster;
use crate::media::{Consumer, Producer, Transport};
use crate::ports::PortAllocator;

use super::config::PackagingConfig;
use super::encoder::{stop_encoder, EncoderJob, EncoderLauncher, EncoderProcess};
use super::paths::OutputPaths;
use super::playlist::render_master;
use super::sdp::SessionDescription;
use super::state::PackagingState;

/// Ports per session: RTP + RTCP for each of video and audio
const PORTS_PER_SESSION: usize = 4;

/// Collaborators shared by all packaging sessions
#[derive(Clone)]
pub struct PackagingContext {
    pub engine: Arc<dyn MediaEngine>,
    pub ports: Arc<PortAllocator>,
    pub launcher: Arc<dyn EncoderLauncher>,
    pub broadcaster: Arc<EventBroadcaster>,
    pub config: Arc<PackagingConfig>,
}

/// Resources currently owned by a session
struct Resources {
    state: PackagingState,
    ports: Vec<u16>,
    transports: Vec<Arc<Transport>>,
    consumers: Vec<Arc<Consumer>>,
    encoders: Vec<Box<dyn EncoderProcess>>,
    /// Files may exist in the live directory
    wrote_output: bool,
}

/// Per-peer HLS packaging pipeline
pub struct PackagingSession {
    peer_id: String,
    ctx: PackagingContext,
    paths: OutputPaths,
    inner: Mutex<Resources>,
    state_tx: watch::Sender<PackagingState>,
    file_removal: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl PackagingSession {
    pub fn new(peer_id: impl Into<String>, ctx: PackagingContext) -> Self {
        let peer_id = peer_id.into();
        let paths = OutputPaths::new(ctx.config.live_dir.clone(), &peer_id);
        let (state_tx, _) = watch::channel(PackagingState::Idle);

        Self {
            peer_id,
            ctx,
            paths,
            inner: Mutex::new(Resources {
                state: PackagingState::Idle,
                ports: Vec::new(),
                transports: Vec::new(),
                consumers: Vec::new(),
                encoders: Vec::new(),
                wrote_output: false,
            }),
            state_tx,
            file_removal: parking_lot::Mutex::new(None),
        }
    }

    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    pub fn paths(&self) -> &OutputPaths {
        &self.paths
    }

    pub fn state(&self) -> PackagingState {
        *self.state_tx.borrow()
    }

    /// Watch state changes
    pub fn watch_state(&self) -> watch::Receiver<PackagingState> {
        self.state_tx.subscribe()
    }

    /// Ports currently leased by this session
    pub async fn leased_ports(&self) -> Vec<u16> {
        self.inner.lock().await.ports.clone()
    }

    /// Wait until the session reaches `Closed`
    pub async fn wait_closed(&self) {
        let mut rx = self.state_tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait
        let _ = rx.wait_for(|state| state.is_closed()).await;
    }

    /// Bring the pipeline up to `Live`
    ///
    /// Fails fast with [`Error::InvalidTransition`] unless the session is
    /// `Idle`. Any other failure rolls back every resource acquired so far and
    /// leaves the session `Closed`. [`Error::Cancelled`] means a concurrent
    /// [`stop`](Self::stop) won.
    pub async fn start(&self, video: &Producer, audio: &Producer) -> Result<()> {
        {
            let mut res = self.inner.lock().await;
            self.transition(&mut res, PackagingState::Allocating)?;
        }

        tracing::info!(
            peer = %self.peer_id,
            video = %video.id(),
            audio = %audio.id(),
            "Starting packaging session"
        );

        match self.bring_up(video, audio).await {
            Ok(()) => Ok(()),
            // A step failing after teardown began lost its resources to that teardown
            Err(e) if matches!(e, Error::Cancelled) || self.state().is_terminating() => {
                tracing::debug!(peer = %self.peer_id, error = %e, "Packaging startup abandoned, session stopped");
                Err(Error::Cancelled)
            }
            Err(e) => {
                tracing::warn!(peer = %self.peer_id, error = %e, "Packaging startup failed, rolling back");
                self.stop().await;
                Err(e)
            }
        }
    }

    async fn bring_up(&self, video: &Producer, audio: &Producer) -> Result<()> {
        let config = &self.ctx.config;

        let ports = self.ctx.ports.lease_many(PORTS_PER_SESSION).await?;
        {
            let mut res = self.inner.lock().await;
            if res.state.is_terminating() {
                drop(res);
                self.ctx.ports.release_all(&ports);
                return Err(Error::Cancelled);
            }
            res.ports.extend_from_slice(&ports);
            self.transition(&mut res, PackagingState::Consuming)?;
        }

        let capabilities = self.ctx.engine.rtp_capabilities();
        let mut sinks = Vec::with_capacity(2);
        for (producer, rtp_port, rtcp_port) in [(video, ports[0], ports[1]), (audio, ports[2], ports[3])] {
            let transport = Transport::plain_sink(&self.ctx.engine, config.sink_ip).await?;
            self.adopt_transport(&transport).await?;

            transport
                .connect(TransportConnectParams::Plain {
                    ip: config.sink_ip,
                    port: rtp_port,
                    rtcp_port,
                })
                .await?;

            let consumer = transport.consume(producer.id(), &capabilities, true).await?;
            self.adopt_consumer(&consumer).await?;

            sinks.push((producer.kind(), consumer, rtp_port, rtcp_port));
        }

        {
            let mut res = self.inner.lock().await;
            self.ensure_active(&res)?;
            self.transition(&mut res, PackagingState::Encoding)?;
            res.wrote_output = true;
        }

        tokio::fs::create_dir_all(self.paths.dir()).await?;
        for (kind, consumer, rtp_port, rtcp_port) in &sinks {
            let description = SessionDescription::from_rtp_parameters(
                *kind,
                consumer.rtp_parameters(),
                config.sink_ip,
                *rtp_port,
                *rtcp_port,
            )?;
            let path = self.paths.description(*kind);
            write_durably(&path, description.render()).await?;
            tracing::debug!(peer = %self.peer_id, path = %path.display(), "Session description written");
        }

        for (_, consumer, _, _) in &sinks {
            consumer.resume().await?;
        }

        for (kind, _, _, _) in &sinks {
            let job = EncoderJob::new(&self.peer_id, *kind, &self.paths);
            let process = self.ctx.launcher.launch(&job).await?;
            self.adopt_encoder(process).await?;
        }

        self.await_first_output().await?;

        let master = render_master(
            &self.paths.playlist_name(MediaKind::Video),
            &self.paths.playlist_name(MediaKind::Audio),
        );
        write_durably(&self.paths.master(), master).await?;

        {
            let mut res = self.inner.lock().await;
            self.ensure_active(&res)?;
            self.transition(&mut res, PackagingState::Live)?;
            // Announced under the lock so a concurrent stop sees a consistent live set
            self.ctx.broadcaster.mark_live(&self.peer_id);
        }

        tracing::info!(
            peer = %self.peer_id,
            master = %self.paths.master().display(),
            "Packaged stream is live"
        );
        Ok(())
    }

    /// Wait for both per-kind playlists, bounded by the settle timeout
    async fn await_first_output(&self) -> Result<()> {
        let config = &self.ctx.config;
        let deadline = tokio::time::Instant::now() + config.settle_timeout;
        let mut state_rx = self.state_tx.subscribe();

        loop {
            if self.outputs_present().await {
                tracing::debug!(peer = %self.peer_id, "Encoder output detected");
                return Ok(());
            }

            let now = tokio::time::Instant::now();
            if now >= deadline {
                tracing::warn!(
                    peer = %self.peer_id,
                    settle_ms = config.settle_timeout.as_millis() as u64,
                    "No encoder output before settle timeout, announcing anyway"
                );
                return Ok(());
            }

            let pause = config.readiness_poll_interval.min(deadline - now);
            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                changed = state_rx.changed() => {
                    if changed.is_err() || state_rx.borrow().is_terminating() {
                        return Err(Error::Cancelled);
                    }
                }
            }
        }
    }

    async fn outputs_present(&self) -> bool {
        for kind in [MediaKind::Video, MediaKind::Audio] {
            if tokio::fs::metadata(self.paths.playlist(kind)).await.is_err() {
                return false;
            }
        }
        true
    }

    /// Tear the session down and release everything it holds
    ///
    /// Safe to call at any time and any number of times; concurrent callers
    /// all return once the session is `Closed`.
    pub async fn stop(&self) {
        let (was_live, wrote_output, ports, transports, consumers, encoders) = {
            let mut res = self.inner.lock().await;
            match res.state {
                PackagingState::Closed => return,
                PackagingState::Cleaning => {
                    drop(res);
                    self.wait_closed().await;
                    return;
                }
                _ => {}
            }

            let was_live = res.state == PackagingState::Live;
            self.transition(&mut res, PackagingState::Cleaning)
                .unwrap_or_else(|e| tracing::error!(peer = %self.peer_id, error = %e, "Unexpected state during cleanup"));

            (
                was_live,
                res.wrote_output,
                std::mem::take(&mut res.ports),
                std::mem::take(&mut res.transports),
                std::mem::take(&mut res.consumers),
                std::mem::take(&mut res.encoders),
            )
        };

        tracing::info!(
            peer = %self.peer_id,
            encoders = encoders.len(),
            ports = ports.len(),
            "Cleaning up packaging session"
        );

        if was_live {
            self.ctx.broadcaster.mark_left(&self.peer_id);
        }

        let grace = self.ctx.config.termination_grace;
        let results = join_all(encoders.into_iter().map(|process| stop_encoder(process, grace))).await;
        for result in results {
            if let Err(e) = result {
                tracing::warn!(peer = %self.peer_id, error = %e, "Encoder did not stop cleanly");
            }
        }

        for consumer in consumers {
            consumer.close().await;
        }
        for transport in transports {
            transport.close().await;
        }

        self.ctx.ports.release_all(&ports);

        if wrote_output {
            self.schedule_file_removal();
        }

        let mut res = self.inner.lock().await;
        self.transition(&mut res, PackagingState::Closed)
            .unwrap_or_else(|e| tracing::error!(peer = %self.peer_id, error = %e, "Unexpected state during cleanup"));
        tracing::info!(peer = %self.peer_id, "Packaging session closed");
    }

    fn transition(&self, res: &mut Resources, next: PackagingState) -> Result<()> {
        let from = res.state;
        if !from.can_transition_to(next) {
            return Err(Error::InvalidTransition { from, to: next });
        }

        res.state = next;
        self.state_tx.send_replace(next);
        tracing::debug!(peer = %self.peer_id, from = ?from, to = ?next, "Packaging state changed");
        Ok(())
    }

    fn ensure_active(&self, res: &Resources) -> Result<()> {
        if res.state.is_terminating() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    async fn adopt_transport(&self, transport: &Arc<Transport>) -> Result<()> {
        let mut res = self.inner.lock().await;
        if res.state.is_terminating() {
            drop(res);
            transport.close().await;
            return Err(Error::Cancelled);
        }
        res.transports.push(Arc::clone(transport));
        Ok(())
    }

    async fn adopt_consumer(&self, consumer: &Arc<Consumer>) -> Result<()> {
        let mut res = self.inner.lock().await;
        if res.state.is_terminating() {
            drop(res);
            consumer.close().await;
            return Err(Error::Cancelled);
        }
        res.consumers.push(Arc::clone(consumer));
        Ok(())
    }

    async fn adopt_encoder(&self, process: Box<dyn EncoderProcess>) -> Result<()> {
        let mut res = self.inner.lock().await;
        if res.state.is_terminating() {
            drop(res);
            if let Err(e) = stop_encoder(process, self.ctx.config.termination_grace).await {
                tracing::warn!(peer = %self.peer_id, error = %e, "Late encoder did not stop cleanly");
            }
            return Err(Error::Cancelled);
        }
        res.encoders.push(process);
        Ok(())
    }

    /// Keep this session's files on disk
    ///
    /// Used when a successor session for the same peer takes over the file
    /// names. Returns whether a pending removal was cancelled.
    pub fn cancel_file_removal(&self) -> bool {
        match self.file_removal.lock().take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                tracing::debug!(peer = %self.peer_id, "Pending file removal cancelled");
                true
            }
            _ => false,
        }
    }

    /// Delete this peer's files once in-flight downloads have had time to finish
    fn schedule_file_removal(&self) {
        let paths = self.paths.clone();
        let cooldown = self.ctx.config.file_cooldown;
        let peer_id = self.peer_id.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(cooldown).await;
            match remove_owned_files(&paths).await {
                Ok(removed) => {
                    tracing::debug!(peer = %peer_id, removed = removed, "Packaging files removed")
                }
                Err(e) => {
                    tracing::error!(peer = %peer_id, error = %e, "Failed to read live directory")
                }
            }
        });
        *self.file_removal.lock() = Some(handle);
    }
}

impl std::fmt::Debug for PackagingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackagingSession")
            .field("peer_id", &self.peer_id)
            .field("state", &self.state())
            .finish()
    }
}

async fn write_durably(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(contents.as_ref()).await?;
    file.sync_all().await?;
    Ok(())
}

async fn remove_owned_files(paths: &OutputPaths) -> std::io::Result<usize> {
    let mut entries = tokio::fs::read_dir(paths.dir()).await?;
    let mut removed = 0;

    while let Some(entry) = entries.next_entry().await? {
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if !paths.owns(name) {
            continue;
        }

        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!(file = name, error = %e, "Failed to delete packaging file"),
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::events::LiveEvent;
    use crate::testing::{Harness, LaunchBehavior};

    async fn live_session(harness: &Harness, peer: &str) -> Arc<PackagingSession> {
        let (video, audio) = harness.producer_pair().await;
        let session = Arc::new(PackagingSession::new(peer, harness.packaging_context()));
        session.start(&video, &audio).await.unwrap();
        session
    }

    #[tokio::test]
    async fn test_start_reaches_live() {
        let harness = Harness::new();
        let mut sub = harness.broadcaster.subscribe();
        assert_eq!(sub.recv().await, Some(LiveEvent::Init { live_peers: vec![] }));

        let session = live_session(&harness, "p1").await;

        assert_eq!(session.state(), PackagingState::Live);
        assert_eq!(session.leased_ports().await.len(), 4);
        assert_eq!(harness.ports.leased_count(), 4);
        assert_eq!(harness.launcher.launched().len(), 2);
        assert_eq!(harness.engine.resumed_consumers().len(), 2);
        assert_eq!(sub.recv().await, Some(LiveEvent::PeerLive { peer_id: "p1".into() }));

        let paths = session.paths();
        assert!(paths.description(MediaKind::Video).exists());
        assert!(paths.description(MediaKind::Audio).exists());
        let master = std::fs::read_to_string(paths.master()).unwrap();
        assert_eq!(master.matches(".m3u8").count(), 2);
        assert!(master.contains("p1-video.m3u8"));
        assert!(master.contains("p1-audio.m3u8"));
    }

    #[tokio::test]
    async fn test_descriptions_use_leased_ports() {
        let harness = Harness::new();
        let session = live_session(&harness, "p1").await;
        let ports = session.leased_ports().await;

        let video = std::fs::read_to_string(session.paths().description(MediaKind::Video)).unwrap();
        let audio = std::fs::read_to_string(session.paths().description(MediaKind::Audio)).unwrap();

        assert!(video.contains(&format!("m=video {} RTP/AVP", ports[0])));
        assert!(video.contains(&format!("a=rtcp:{} ", ports[1])));
        assert!(audio.contains(&format!("m=audio {} RTP/AVP", ports[2])));
        assert!(audio.contains(&format!("a=rtcp:{} ", ports[3])));
    }

    #[tokio::test]
    async fn test_second_start_fails_fast() {
        let harness = Harness::new();
        let (video, audio) = harness.producer_pair().await;
        let session = live_session(&harness, "p1").await;

        let result = session.start(&video, &audio).await;
        assert!(matches!(
            result,
            Err(Error::InvalidTransition {
                from: PackagingState::Live,
                to: PackagingState::Allocating
            })
        ));
        assert_eq!(harness.launcher.launched().len(), 2);
        assert_eq!(harness.ports.leased_count(), 4);
    }

    #[tokio::test]
    async fn test_consume_failure_rolls_back() {
        let harness = Harness::new();
        let (video, audio) = harness.producer_pair().await;
        harness.engine.fail_consume_call(2);

        let session = PackagingSession::new("p1", harness.packaging_context());
        let result = session.start(&video, &audio).await;

        assert!(matches!(result, Err(Error::Engine(_))));
        assert_eq!(session.state(), PackagingState::Closed);
        assert_eq!(harness.ports.leased_count(), 0);
        assert!(harness.launcher.launched().is_empty());
        assert_eq!(harness.engine.open_plain_transports(), 0);
        assert!(!harness.broadcaster.is_live("p1"));
    }

    #[tokio::test]
    async fn test_port_exhaustion_closes_session() {
        let harness = Harness::with_port_range(7100..=7102);
        let (video, audio) = harness.producer_pair().await;

        let session = PackagingSession::new("p1", harness.packaging_context());
        let result = session.start(&video, &audio).await;

        assert!(matches!(result, Err(Error::ResourceExhausted { .. })));
        assert_eq!(session.state(), PackagingState::Closed);
        assert_eq!(harness.ports.leased_count(), 0);
        assert_eq!(harness.engine.plain_transports_created(), 0);
    }

    #[tokio::test]
    async fn test_spawn_failure_stops_first_encoder() {
        let harness = Harness::with_launch_behavior(LaunchBehavior::FailSecondLaunch);
        let (video, audio) = harness.producer_pair().await;

        let session = PackagingSession::new("p1", harness.packaging_context());
        let result = session.start(&video, &audio).await;

        assert!(matches!(result, Err(Error::ProcessSpawnFailed(_))));
        assert_eq!(session.state(), PackagingState::Closed);
        assert_eq!(harness.launcher.launched().len(), 1);
        assert_eq!(harness.launcher.interrupted(), 1);
        assert_eq!(harness.ports.leased_count(), 0);
    }

    #[tokio::test]
    async fn test_stop_after_live_releases_everything() {
        let harness = Harness::new();
        let session = live_session(&harness, "p1").await;
        let ports = session.leased_ports().await;

        session.stop().await;

        assert_eq!(session.state(), PackagingState::Closed);
        assert_eq!(harness.launcher.interrupted(), 2);
        assert_eq!(harness.launcher.killed(), 0);
        assert_eq!(harness.engine.open_plain_transports(), 0);
        assert!(!harness.broadcaster.is_live("p1"));
        for port in ports {
            assert!(!harness.ports.is_leased(port));
        }
        assert!(session.leased_ports().await.is_empty());
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let harness = Harness::new();
        let session = live_session(&harness, "p1").await;

        session.stop().await;
        session.stop().await;

        assert_eq!(harness.launcher.interrupted(), 2);
        assert_eq!(harness.engine.close_transport_calls(), 2);
    }

    #[tokio::test]
    async fn test_stubborn_encoder_is_killed() {
        let harness = Harness::with_launch_behavior(LaunchBehavior::IgnoreInterrupt);
        let session = live_session(&harness, "p1").await;

        session.stop().await;

        assert_eq!(harness.launcher.killed(), 2);
        assert_eq!(session.state(), PackagingState::Closed);
    }

    #[tokio::test]
    async fn test_files_removed_only_after_cooldown() {
        let harness = Harness::new();
        let session = live_session(&harness, "p1").await;
        let master = session.paths().master();

        session.stop().await;
        assert!(master.exists(), "files must survive the cooldown window");

        tokio::time::sleep(harness.config.file_cooldown * 4).await;
        assert!(!master.exists());
        assert!(!session.paths().description(MediaKind::Video).exists());
        assert!(!session.paths().playlist(MediaKind::Audio).exists());
    }

    #[tokio::test]
    async fn test_cancelled_removal_keeps_files() {
        let harness = Harness::new();
        let session = live_session(&harness, "p1").await;
        assert!(!session.cancel_file_removal());

        session.stop().await;
        assert!(session.cancel_file_removal());
        tokio::time::sleep(harness.config.file_cooldown * 4).await;

        assert!(session.paths().master().exists());
        assert!(!session.cancel_file_removal());
    }

    #[tokio::test]
    async fn test_other_peers_files_survive_removal() {
        let harness = Harness::new();
        let first = live_session(&harness, "p1").await;
        let second = live_session(&harness, "p2").await;

        first.stop().await;
        tokio::time::sleep(harness.config.file_cooldown * 4).await;

        assert!(!first.paths().master().exists());
        assert!(second.paths().master().exists());
    }

    #[tokio::test]
    async fn test_readiness_falls_back_to_settle_timeout() {
        let harness = Harness::with_launch_behavior(LaunchBehavior::NoOutput);
        let (video, audio) = harness.producer_pair().await;
        let session = PackagingSession::new("p1", harness.packaging_context());

        let started = tokio::time::Instant::now();
        session.start(&video, &audio).await.unwrap();

        assert_eq!(session.state(), PackagingState::Live);
        assert!(started.elapsed() >= harness.config.settle_timeout);
    }

    #[tokio::test]
    async fn test_stop_during_consuming_cancels_startup() {
        let harness = Harness::new();
        let (video, audio) = harness.producer_pair().await;
        harness.engine.set_consume_delay(Duration::from_millis(100));

        let session = Arc::new(PackagingSession::new("p1", harness.packaging_context()));
        let mut state = session.watch_state();

        let starter = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.start(&video, &audio).await })
        };

        state
            .wait_for(|s| *s == PackagingState::Consuming)
            .await
            .unwrap();
        session.stop().await;

        let result = starter.await.unwrap();
        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(session.state(), PackagingState::Closed);
        assert_eq!(harness.ports.leased_count(), 0);
        assert!(harness.launcher.launched().is_empty());
        assert_eq!(harness.engine.open_plain_transports(), 0);
        assert_eq!(harness.engine.open_consumers(), 0);
    }

    #[tokio::test]
    async fn test_stop_during_encoding_never_announces() {
        let harness = Harness::with_launch_behavior(LaunchBehavior::NoOutput);
        let (video, audio) = harness.producer_pair().await;

        let session = Arc::new(PackagingSession::new("p1", harness.packaging_context()));
        let mut state = session.watch_state();
        let starter = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.start(&video, &audio).await })
        };

        state
            .wait_for(|s| *s == PackagingState::Encoding)
            .await
            .unwrap();
        session.stop().await;

        assert!(matches!(starter.await.unwrap(), Err(Error::Cancelled)));
        assert!(!harness.broadcaster.is_live("p1"));
        assert!(!session.paths().master().exists());
        assert_eq!(harness.ports.leased_count(), 0);
    }
}
