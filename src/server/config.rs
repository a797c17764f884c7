//! Relay configuration

use std::net::IpAddr;
use std::ops::RangeInclusive;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::packaging::PackagingConfig;

/// Relay configuration options
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Ports leased to packaging sessions for RTP and RTCP
    pub port_range: RangeInclusive<u16>,

    /// Queue length of each client's notification channel
    pub notification_buffer: usize,

    /// Queue length of each live-event subscriber
    pub subscriber_buffer: usize,

    /// Packaging settings, including the live directory and sink address
    pub packaging: PackagingConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port_range: 6000..=7000,
            notification_buffer: 256,
            subscriber_buffer: 64,
            packaging: PackagingConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Defaults overlaid with `RELAY_*` environment variables
    ///
    /// Recognized: `RELAY_LISTEN_IP`, `RELAY_PORT_MIN`, `RELAY_PORT_MAX`,
    /// `RELAY_LIVE_DIR`. The result is validated.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(ip) = lookup("RELAY_LISTEN_IP") {
            let ip: IpAddr = ip
                .parse()
                .map_err(|_| Error::Config(format!("RELAY_LISTEN_IP: invalid address {:?}", ip)))?;
            config = config.listen_ip(ip);
        }

        let min = parse_port(&lookup, "RELAY_PORT_MIN")?.unwrap_or(*config.port_range.start());
        let max = parse_port(&lookup, "RELAY_PORT_MAX")?.unwrap_or(*config.port_range.end());
        config.port_range = min..=max;

        if let Some(dir) = lookup("RELAY_LIVE_DIR") {
            config = config.live_dir(dir);
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the relay cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.port_range.is_empty() {
            return Err(Error::Config(format!(
                "empty port range {}-{}",
                self.port_range.start(),
                self.port_range.end()
            )));
        }
        if *self.port_range.start() == 0 {
            return Err(Error::Config("port range must not include port 0".into()));
        }
        if self.packaging.live_dir.as_os_str().is_empty() {
            return Err(Error::Config("live directory must be set".into()));
        }
        Ok(())
    }

    /// Set the sink address (also used to probe ports)
    pub fn listen_ip(mut self, ip: IpAddr) -> Self {
        self.packaging.sink_ip = ip;
        self
    }

    /// Set the leasable port range
    pub fn port_range(mut self, range: RangeInclusive<u16>) -> Self {
        self.port_range = range;
        self
    }

    /// Set the output directory
    pub fn live_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.packaging.live_dir = dir.into();
        self
    }

    pub fn notification_buffer(mut self, size: usize) -> Self {
        self.notification_buffer = size;
        self
    }

    pub fn subscriber_buffer(mut self, size: usize) -> Self {
        self.subscriber_buffer = size;
        self
    }

    /// Replace the packaging settings
    pub fn packaging(mut self, packaging: PackagingConfig) -> Self {
        self.packaging = packaging;
        self
    }
}

fn parse_port(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<u16>> {
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{}: invalid port {:?}", key, value))),
        None => Ok(None),
    }
}
