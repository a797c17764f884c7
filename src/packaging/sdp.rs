//! Session description files for the encoders
//!
//! The encoder learns where to listen and how to depacketize from a small SDP
//! document derived from the sink consumer's negotiated RTP parameters.

use std::net::IpAddr;

use crate::engine::{MediaKind, RtpParameters};
use crate::error::{Error, Result};

/// Default channel count when an audio codec does not state one
const DEFAULT_AUDIO_CHANNELS: u8 = 2;

/// Session name written into every description
const SESSION_NAME: &str = "Relay RTP Sink";

/// Everything needed to render one description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    pub kind: MediaKind,
    pub address: IpAddr,
    pub rtp_port: u16,
    pub rtcp_port: u16,
    pub payload_type: u8,
    pub codec_name: String,
    pub clock_rate: u32,
    pub channels: Option<u8>,
    pub framerate: Option<String>,
}

impl SessionDescription {
    /// Build from a consumer's RTP parameters bound to the leased ports
    pub fn from_rtp_parameters(
        kind: MediaKind,
        params: &RtpParameters,
        address: IpAddr,
        rtp_port: u16,
        rtcp_port: u16,
    ) -> Result<Self> {
        let codec = params
            .primary_codec()
            .ok_or(Error::TransportNotReady("negotiated codec"))?;

        let channels = match kind {
            MediaKind::Audio => Some(codec.channels.unwrap_or(DEFAULT_AUDIO_CHANNELS)),
            MediaKind::Video => None,
        };

        Ok(Self {
            kind,
            address,
            rtp_port,
            rtcp_port,
            payload_type: codec.payload_type,
            codec_name: codec.codec_name().to_string(),
            clock_rate: codec.clock_rate,
            channels,
            framerate: codec.framerate(),
        })
    }

    /// Render the SDP text
    pub fn render(&self) -> String {
        let ip_version = match self.address {
            IpAddr::V4(_) => "IP4",
            IpAddr::V6(_) => "IP6",
        };

        let mut rtpmap = format!(
            "{} {}/{}",
            self.payload_type, self.codec_name, self.clock_rate
        );
        if let Some(channels) = self.channels {
            rtpmap.push_str(&format!("/{}", channels));
        }

        let mut lines = vec![
            "v=0".to_string(),
            format!("o=- 0 0 IN {} {}", ip_version, self.address),
            format!("s={}", SESSION_NAME),
            format!("c=IN {} {}", ip_version, self.address),
            "t=0 0".to_string(),
            format!("m={} {} RTP/AVP {}", self.kind, self.rtp_port, self.payload_type),
            format!("a=rtpmap:{}", rtpmap),
            "a=recvonly".to_string(),
            format!("a=rtcp:{} IN {} {}", self.rtcp_port, ip_version, self.address),
        ];
        if let Some(ref framerate) = self.framerate {
            lines.push(format!("a=framerate:{}", framerate));
        }

        let mut sdp = lines.join("\n");
        sdp.push('\n');
        sdp
    }
}
