//! Packaging configuration

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

/// Settings for packaging sessions
#[derive(Debug, Clone)]
pub struct PackagingConfig {
    /// Directory receiving description files, playlists and segments
    pub live_dir: PathBuf,

    /// Address the sink transports send RTP to (and the encoder listens on)
    pub sink_ip: IpAddr,

    /// Encoder executable
    pub encoder_program: PathBuf,

    /// Upper bound on waiting for the encoders' first playlists
    pub settle_timeout: Duration,

    /// How often to look for encoder output while waiting
    pub readiness_poll_interval: Duration,

    /// How long an encoder may take to exit after the stop signal
    pub termination_grace: Duration,

    /// Delay before a stopped session's files are deleted
    pub file_cooldown: Duration,
}

impl Default for PackagingConfig {
    fn default() -> Self {
        Self {
            live_dir: PathBuf::from("public/live"),
            sink_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            encoder_program: PathBuf::from("ffmpeg"),
            settle_timeout: Duration::from_secs(5),
            readiness_poll_interval: Duration::from_millis(200),
            termination_grace: Duration::from_secs(5),
            file_cooldown: Duration::from_secs(15),
        }
    }
}

impl PackagingConfig {
    /// Set the output directory
    pub fn live_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.live_dir = dir.into();
        self
    }

    /// Set the sink address
    pub fn sink_ip(mut self, ip: IpAddr) -> Self {
        self.sink_ip = ip;
        self
    }

    /// Set the encoder executable
    pub fn encoder_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.encoder_program = program.into();
        self
    }

    /// Set the readiness fallback
    pub fn settle_timeout(mut self, timeout: Duration) -> Self {
        self.settle_timeout = timeout;
        self
    }

    pub fn readiness_poll_interval(mut self, interval: Duration) -> Self {
        self.readiness_poll_interval = interval;
        self
    }

    /// Set the encoder termination grace period
    pub fn termination_grace(mut self, grace: Duration) -> Self {
        self.termination_grace = grace;
        self
    }

    /// Set the file deletion cooldown
    pub fn file_cooldown(mut self, cooldown: Duration) -> Self {
        self.file_cooldown = cooldown;
        self
    }
}
