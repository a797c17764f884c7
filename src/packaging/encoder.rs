//! External encoder processes
//!
//! Each packaging session runs one encoder per media kind. The encoder reads
//! RTP described by a session description file and writes a rolling HLS
//! playlist plus numbered MPEG-TS segments.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};

use crate::engine::MediaKind;
use crate::error::{Error, Result};

use super::paths::OutputPaths;

/// Inputs and outputs of one encoder run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderJob {
    pub peer_id: String,
    pub kind: MediaKind,
    /// Session description to read
    pub description: PathBuf,
    /// Rolling index file to write
    pub playlist: PathBuf,
    /// printf-style segment file template
    pub segment_template: PathBuf,
}

impl EncoderJob {
    pub fn new(peer_id: &str, kind: MediaKind, paths: &OutputPaths) -> Self {
        Self {
            peer_id: peer_id.to_string(),
            kind,
            description: paths.description(kind),
            playlist: paths.playlist(kind),
            segment_template: paths.segment_template(kind),
        }
    }
}

/// Starts encoder processes
#[async_trait]
pub trait EncoderLauncher: Send + Sync + 'static {
    async fn launch(&self, job: &EncoderJob) -> Result<Box<dyn EncoderProcess>>;
}

/// A running encoder
#[async_trait]
pub trait EncoderProcess: Send + 'static {
    /// OS process id, if still known
    fn pid(&self) -> Option<u32>;

    /// Ask the encoder to finish its playlist and exit
    fn interrupt(&mut self) -> Result<()>;

    /// Wait for the process to exit
    async fn wait(&mut self) -> Result<()>;

    /// Terminate immediately
    async fn kill(&mut self) -> Result<()>;
}

/// Interrupt an encoder and force-kill it if it outlives `grace`
///
/// Returns [`Error::Timeout`] when the force kill was needed; the process is
/// gone either way.
pub async fn stop_encoder(mut process: Box<dyn EncoderProcess>, grace: Duration) -> Result<()> {
    let pid = process.pid();

    if let Err(e) = process.interrupt() {
        tracing::debug!(pid = ?pid, error = %e, "Interrupt failed, process may have exited");
    }

    let waited = tokio::time::timeout(grace, process.wait()).await;
    match waited {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(pid = ?pid, grace_ms = grace.as_millis() as u64, "Encoder ignored interrupt, killing");
            process.kill().await?;
            Err(Error::Timeout(grace))
        }
    }
}

/// Command line for an ffmpeg encoder
pub fn ffmpeg_args(job: &EncoderJob) -> Vec<String> {
    let description = job.description.to_string_lossy().into_owned();
    let playlist = job.playlist.to_string_lossy().into_owned();
    let segments = job.segment_template.to_string_lossy().into_owned();

    let mut args: Vec<String> = vec!["-protocol_whitelist".into(), "file,udp,rtp".into()];

    match job.kind {
        MediaKind::Video => {
            args.extend(
                [
                    "-fflags", "+genpts+igndts",
                    "-avoid_negative_ts", "make_zero",
                    "-f", "sdp",
                    "-i", description.as_str(),
                    "-c:v", "libx264",
                    "-preset", "ultrafast",
                    "-tune", "zerolatency",
                    "-profile:v", "baseline",
                    "-g", "15",
                    "-keyint_min", "15",
                    "-sc_threshold", "0",
                    "-r", "15",
                    "-max_muxing_queue_size", "1024",
                    "-an",
                    "-f", "hls",
                    "-hls_time", "1",
                    "-hls_list_size", "3",
                    "-hls_flags", "delete_segments+independent_segments",
                    "-hls_segment_type", "mpegts",
                    "-hls_segment_filename", segments.as_str(),
                    "-force_key_frames", "expr:gte(t,n_forced*1)",
                    playlist.as_str(),
                ]
                .map(String::from),
            );
        }
        MediaKind::Audio => {
            args.extend(
                [
                    "-f", "sdp",
                    "-i", description.as_str(),
                    "-c:a", "aac",
                    "-b:a", "128k",
                    "-ar", "48000",
                    "-ac", "2",
                    "-f", "hls",
                    "-hls_time", "2",
                    "-hls_list_size", "5",
                    "-hls_flags", "delete_segments",
                    "-hls_segment_filename", segments.as_str(),
                    playlist.as_str(),
                ]
                .map(String::from),
            );
        }
    }

    args
}

/// Launches ffmpeg as a child process
#[derive(Debug, Clone)]
pub struct FfmpegLauncher {
    program: PathBuf,
}

impl FfmpegLauncher {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for FfmpegLauncher {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl EncoderLauncher for FfmpegLauncher {
    async fn launch(&self, job: &EncoderJob) -> Result<Box<dyn EncoderProcess>> {
        let mut child = Command::new(&self.program)
            .args(ffmpeg_args(job))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(Error::ProcessSpawnFailed)?;

        tracing::info!(
            peer = %job.peer_id,
            kind = %job.kind,
            pid = ?child.id(),
            "Encoder spawned"
        );

        // ffmpeg reports progress and errors on stderr
        if let Some(stderr) = child.stderr.take() {
            let peer = job.peer_id.clone();
            let kind = job.kind;
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!(target: "hls_relay::encoder", peer = %peer, kind = %kind, "{}", line);
                }
            });
        }

        Ok(Box::new(FfmpegProcess {
            child,
            peer_id: job.peer_id.clone(),
            kind: job.kind,
        }))
    }
}

struct FfmpegProcess {
    child: Child,
    peer_id: String,
    kind: MediaKind,
}

#[async_trait]
impl EncoderProcess for FfmpegProcess {
    fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    fn interrupt(&mut self) -> Result<()> {
        let Some(pid) = self.child.id() else {
            return Ok(());
        };

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            kill(Pid::from_raw(pid as i32), Signal::SIGINT).map_err(std::io::Error::from)?;
        }

        #[cfg(not(unix))]
        {
            let _ = pid;
            self.child.start_kill()?;
        }

        Ok(())
    }

    async fn wait(&mut self) -> Result<()> {
        let status = self.child.wait().await?;
        tracing::info!(
            peer = %self.peer_id,
            kind = %self.kind,
            status = %status,
            "Encoder exited"
        );
        Ok(())
    }

    async fn kill(&mut self) -> Result<()> {
        self.child.kill().await?;
        Ok(())
    }
}
