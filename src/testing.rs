//! In-memory stand-ins for the media engine, encoder processes and port probe

use std::collections::{BTreeSet, HashMap};
use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::{broadcast, watch};

use crate::engine::{
    ConsumerId, ConsumerInfo, EngineError, EngineEvent, EngineResult, MediaEngine, MediaKind,
    ProducerId, RtpCapabilities, RtpCodecParameters, RtpParameters, TransportConnectParams,
    TransportId, WebRtcTransportInfo,
};
use crate::error::{Error, Result};
use crate::events::EventBroadcaster;
use crate::media::{Producer, Transport, TransportRole};
use crate::packaging::{EncoderJob, EncoderLauncher, EncoderProcess, PackagingConfig, PackagingContext};
use crate::ports::{PortAllocator, PortProbe};

/// Install a test subscriber once; `RUST_LOG` selects the level
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Typical negotiated parameters: H264 for video, Opus for audio
pub(crate) fn rtp_parameters(kind: MediaKind) -> RtpParameters {
    let codec = match kind {
        MediaKind::Video => RtpCodecParameters {
            mime_type: "video/H264".into(),
            payload_type: 125,
            clock_rate: 90000,
            channels: None,
            parameters: json!({ "packetization-mode": 1, "profile-level-id": "42e01f" })
                .as_object()
                .cloned()
                .unwrap_or_default(),
        },
        MediaKind::Audio => RtpCodecParameters {
            mime_type: "audio/opus".into(),
            payload_type: 100,
            clock_rate: 48000,
            channels: Some(2),
            parameters: Default::default(),
        },
    };

    RtpParameters {
        mid: None,
        codecs: vec![codec],
        ..Default::default()
    }
}

/// Every port is bindable
pub(crate) struct AlwaysFree;

#[async_trait]
impl PortProbe for AlwaysFree {
    async fn is_free(&self, _ip: IpAddr, _port: u16) -> bool {
        true
    }
}

/// Listed ports are held by someone outside the allocator
pub(crate) struct BusyPorts(BTreeSet<u16>);

impl BusyPorts {
    pub(crate) fn new(ports: impl IntoIterator<Item = u16>) -> Self {
        Self(ports.into_iter().collect())
    }
}

#[async_trait]
impl PortProbe for BusyPorts {
    async fn is_free(&self, _ip: IpAddr, port: u16) -> bool {
        !self.0.contains(&port)
    }
}

struct FakeProducer {
    transport: TransportId,
    kind: MediaKind,
    rtp_parameters: RtpParameters,
}

#[derive(Default)]
struct FakeEngineState {
    /// Open transports, flagged true for plain sinks
    transports: HashMap<TransportId, bool>,
    producers: HashMap<ProducerId, FakeProducer>,
    consumers: HashMap<ConsumerId, TransportId>,
    plain_created: usize,
    close_transport_calls: usize,
    closed_producers: usize,
    resumed_consumers: Vec<ConsumerId>,
    consume_calls: usize,
    fail_consume_call: Option<usize>,
    consume_delay: Duration,
    cannot_consume: bool,
}

/// Media engine keeping its objects in maps
pub(crate) struct FakeEngine {
    next_id: AtomicU64,
    events: broadcast::Sender<EngineEvent>,
    state: Mutex<FakeEngineState>,
}

impl FakeEngine {
    pub(crate) fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            next_id: AtomicU64::new(1),
            events,
            state: Mutex::new(FakeEngineState::default()),
        })
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Publish an engine notification
    pub(crate) fn emit(&self, event: EngineEvent) {
        let _ = self.events.send(event);
    }

    pub(crate) fn event_receivers(&self) -> usize {
        self.events.receiver_count()
    }

    /// Make the `n`th consume call (1-based) fail
    pub(crate) fn fail_consume_call(&self, n: usize) {
        self.state.lock().fail_consume_call = Some(n);
    }

    pub(crate) fn set_consume_delay(&self, delay: Duration) {
        self.state.lock().consume_delay = delay;
    }

    pub(crate) fn set_can_consume(&self, allowed: bool) {
        self.state.lock().cannot_consume = !allowed;
    }

    pub(crate) fn close_transport_calls(&self) -> usize {
        self.state.lock().close_transport_calls
    }

    pub(crate) fn plain_transports_created(&self) -> usize {
        self.state.lock().plain_created
    }

    pub(crate) fn open_plain_transports(&self) -> usize {
        self.state.lock().transports.values().filter(|plain| **plain).count()
    }

    pub(crate) fn open_consumers(&self) -> usize {
        self.state.lock().consumers.len()
    }

    pub(crate) fn closed_producers(&self) -> usize {
        self.state.lock().closed_producers
    }

    pub(crate) fn resumed_consumers(&self) -> Vec<ConsumerId> {
        self.state.lock().resumed_consumers.clone()
    }

    fn require_transport(state: &FakeEngineState, id: &TransportId) -> EngineResult<()> {
        if state.transports.contains_key(id) {
            Ok(())
        } else {
            Err(EngineError::new(format!("transport {} not found", id)))
        }
    }
}

#[async_trait]
impl MediaEngine for FakeEngine {
    fn rtp_capabilities(&self) -> RtpCapabilities {
        RtpCapabilities(json!({ "codecs": [{ "mimeType": "audio/opus" }, { "mimeType": "video/H264" }] }))
    }

    fn can_consume(&self, producer: &ProducerId, _capabilities: &RtpCapabilities) -> bool {
        let state = self.state.lock();
        !state.cannot_consume && state.producers.contains_key(producer)
    }

    fn events(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    async fn create_webrtc_transport(&self) -> EngineResult<WebRtcTransportInfo> {
        let id = TransportId::new(self.next_id("webrtc"));
        self.state.lock().transports.insert(id.clone(), false);

        Ok(WebRtcTransportInfo {
            id,
            ice_parameters: json!({ "usernameFragment": "frag", "password": "pwd" }),
            ice_candidates: json!([]),
            dtls_parameters: json!({ "role": "auto", "fingerprints": [] }),
        })
    }

    async fn create_plain_transport(&self, _listen_ip: IpAddr) -> EngineResult<TransportId> {
        let id = TransportId::new(self.next_id("plain"));
        let mut state = self.state.lock();
        state.transports.insert(id.clone(), true);
        state.plain_created += 1;
        Ok(id)
    }

    async fn connect_transport(
        &self,
        transport: &TransportId,
        _params: TransportConnectParams,
    ) -> EngineResult<()> {
        Self::require_transport(&self.state.lock(), transport)
    }

    async fn produce(
        &self,
        transport: &TransportId,
        kind: MediaKind,
        rtp_parameters: RtpParameters,
    ) -> EngineResult<ProducerId> {
        let mut state = self.state.lock();
        Self::require_transport(&state, transport)?;

        let id = ProducerId::new(self.next_id("producer"));
        state.producers.insert(
            id.clone(),
            FakeProducer {
                transport: transport.clone(),
                kind,
                rtp_parameters,
            },
        );
        Ok(id)
    }

    async fn consume(
        &self,
        transport: &TransportId,
        producer: &ProducerId,
        _capabilities: &RtpCapabilities,
        _paused: bool,
    ) -> EngineResult<ConsumerInfo> {
        let delay = {
            let mut state = self.state.lock();
            state.consume_calls += 1;
            if state.fail_consume_call == Some(state.consume_calls) {
                return Err(EngineError::new("injected consume failure"));
            }
            state.consume_delay
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        let (kind, rtp_parameters) = match state.producers.get(producer) {
            Some(p) => (p.kind, p.rtp_parameters.clone()),
            None => return Err(EngineError::new(format!("producer {} not found", producer))),
        };

        let id = ConsumerId::new(self.next_id("consumer"));
        state.consumers.insert(id.clone(), transport.clone());

        Ok(ConsumerInfo {
            id,
            producer_id: producer.clone(),
            kind,
            rtp_parameters,
        })
    }

    async fn pause_producer(&self, producer: &ProducerId) -> EngineResult<()> {
        if self.state.lock().producers.contains_key(producer) {
            Ok(())
        } else {
            Err(EngineError::new("producer not found"))
        }
    }

    async fn resume_producer(&self, producer: &ProducerId) -> EngineResult<()> {
        self.pause_producer(producer).await
    }

    async fn close_producer(&self, producer: &ProducerId) -> EngineResult<()> {
        {
            let mut state = self.state.lock();
            state.producers.remove(producer);
            state.closed_producers += 1;
        }
        self.emit(EngineEvent::ProducerClosed(producer.clone()));
        Ok(())
    }

    async fn pause_consumer(&self, consumer: &ConsumerId) -> EngineResult<()> {
        if self.state.lock().consumers.contains_key(consumer) {
            Ok(())
        } else {
            Err(EngineError::new("consumer not found"))
        }
    }

    async fn resume_consumer(&self, consumer: &ConsumerId) -> EngineResult<()> {
        let mut state = self.state.lock();
        if !state.consumers.contains_key(consumer) {
            return Err(EngineError::new("consumer not found"));
        }
        state.resumed_consumers.push(consumer.clone());
        Ok(())
    }

    async fn close_consumer(&self, consumer: &ConsumerId) -> EngineResult<()> {
        self.state.lock().consumers.remove(consumer);
        Ok(())
    }

    async fn close_transport(&self, transport: &TransportId) -> EngineResult<()> {
        let closed_producers: Vec<ProducerId> = {
            let mut state = self.state.lock();
            state.close_transport_calls += 1;
            state.transports.remove(transport);
            state.consumers.retain(|_, t| t != transport);

            let ids: Vec<ProducerId> = state
                .producers
                .iter()
                .filter(|(_, p)| &p.transport == transport)
                .map(|(id, _)| id.clone())
                .collect();
            for id in &ids {
                state.producers.remove(id);
            }
            ids
        };

        self.emit(EngineEvent::TransportClosed(transport.clone()));
        for id in closed_producers {
            self.emit(EngineEvent::ProducerClosed(id));
        }
        Ok(())
    }
}

/// How fake encoder processes behave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LaunchBehavior {
    /// Write a playlist right away and exit on interrupt
    Normal,
    /// Never write output
    NoOutput,
    /// Only exit when killed
    IgnoreInterrupt,
    /// The second launch fails to spawn
    FailSecondLaunch,
}

/// Records launched jobs instead of spawning processes
pub(crate) struct FakeLauncher {
    behavior: LaunchBehavior,
    attempts: AtomicUsize,
    launched: Mutex<Vec<EncoderJob>>,
    interrupted: Arc<AtomicUsize>,
    killed: Arc<AtomicUsize>,
}

impl FakeLauncher {
    pub(crate) fn new() -> Arc<Self> {
        Self::with_behavior(LaunchBehavior::Normal)
    }

    pub(crate) fn with_behavior(behavior: LaunchBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            attempts: AtomicUsize::new(0),
            launched: Mutex::new(Vec::new()),
            interrupted: Arc::new(AtomicUsize::new(0)),
            killed: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub(crate) fn launched(&self) -> Vec<EncoderJob> {
        self.launched.lock().clone()
    }

    pub(crate) fn interrupted(&self) -> usize {
        self.interrupted.load(Ordering::SeqCst)
    }

    pub(crate) fn killed(&self) -> usize {
        self.killed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EncoderLauncher for FakeLauncher {
    async fn launch(&self, job: &EncoderJob) -> Result<Box<dyn EncoderProcess>> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.behavior == LaunchBehavior::FailSecondLaunch && attempt == 2 {
            return Err(Error::ProcessSpawnFailed(io::Error::new(
                io::ErrorKind::NotFound,
                "encoder binary missing",
            )));
        }

        self.launched.lock().push(job.clone());

        if self.behavior != LaunchBehavior::NoOutput {
            // Output directories only exist for session tests
            let _ = tokio::fs::write(&job.playlist, "#EXTM3U\n").await;
            let segment = job.segment_template.to_string_lossy().replace("%03d", "000");
            let _ = tokio::fs::write(segment, b"").await;
        }

        let (exited, _) = watch::channel(false);
        Ok(Box::new(FakeProcess {
            pid: 10_000 + attempt as u32,
            ignore_interrupt: self.behavior == LaunchBehavior::IgnoreInterrupt,
            exited,
            interrupted: Arc::clone(&self.interrupted),
            killed: Arc::clone(&self.killed),
        }))
    }
}

struct FakeProcess {
    pid: u32,
    ignore_interrupt: bool,
    exited: watch::Sender<bool>,
    interrupted: Arc<AtomicUsize>,
    killed: Arc<AtomicUsize>,
}

#[async_trait]
impl EncoderProcess for FakeProcess {
    fn pid(&self) -> Option<u32> {
        Some(self.pid)
    }

    fn interrupt(&mut self) -> Result<()> {
        self.interrupted.fetch_add(1, Ordering::SeqCst);
        if !self.ignore_interrupt {
            self.exited.send_replace(true);
        }
        Ok(())
    }

    async fn wait(&mut self) -> Result<()> {
        let mut rx = self.exited.subscribe();
        let _ = rx.wait_for(|exited| *exited).await;
        Ok(())
    }

    async fn kill(&mut self) -> Result<()> {
        self.killed.fetch_add(1, Ordering::SeqCst);
        self.exited.send_replace(true);
        Ok(())
    }
}

/// Packaging collaborators wired to fakes, writing into a temporary directory
pub(crate) struct Harness {
    pub engine: Arc<FakeEngine>,
    pub ports: Arc<PortAllocator>,
    pub launcher: Arc<FakeLauncher>,
    pub broadcaster: Arc<EventBroadcaster>,
    pub config: Arc<PackagingConfig>,
    _live_dir: TempDir,
}

impl Harness {
    pub(crate) fn new() -> Self {
        Self::build(40000..=40063, LaunchBehavior::Normal)
    }

    pub(crate) fn with_port_range(range: RangeInclusive<u16>) -> Self {
        Self::build(range, LaunchBehavior::Normal)
    }

    pub(crate) fn with_launch_behavior(behavior: LaunchBehavior) -> Self {
        Self::build(40000..=40063, behavior)
    }

    fn build(range: RangeInclusive<u16>, behavior: LaunchBehavior) -> Self {
        init_tracing();

        let live_dir = tempfile::tempdir().expect("create temp live dir");
        let config = PackagingConfig::default()
            .live_dir(live_dir.path())
            .settle_timeout(Duration::from_millis(300))
            .readiness_poll_interval(Duration::from_millis(10))
            .termination_grace(Duration::from_millis(100))
            .file_cooldown(Duration::from_millis(100));

        Self {
            engine: FakeEngine::new(),
            ports: Arc::new(PortAllocator::with_probe(
                range,
                IpAddr::V4(Ipv4Addr::LOCALHOST),
                Arc::new(AlwaysFree),
            )),
            launcher: FakeLauncher::with_behavior(behavior),
            broadcaster: Arc::new(EventBroadcaster::new(16)),
            config: Arc::new(config),
            _live_dir: live_dir,
        }
    }

    pub(crate) fn packaging_context(&self) -> PackagingContext {
        PackagingContext {
            engine: self.engine.clone(),
            ports: Arc::clone(&self.ports),
            launcher: self.launcher.clone(),
            broadcaster: Arc::clone(&self.broadcaster),
            config: Arc::clone(&self.config),
        }
    }

    /// A (video, audio) producer pair on a fresh send transport
    pub(crate) async fn producer_pair(&self) -> (Arc<Producer>, Arc<Producer>) {
        let engine: Arc<dyn MediaEngine> = self.engine.clone();
        let (transport, _) = Transport::webrtc(&engine, TransportRole::Send)
            .await
            .expect("create send transport");

        let video = transport
            .produce(MediaKind::Video, rtp_parameters(MediaKind::Video))
            .await
            .expect("produce video");
        let audio = transport
            .produce(MediaKind::Audio, rtp_parameters(MediaKind::Audio))
            .await
            .expect("produce audio");
        (video, audio)
    }
}
