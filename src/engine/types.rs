//! Identifier and parameter types exchanged with the media engine

use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an engine-issued identifier
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Engine-issued transport identifier
    TransportId
);
string_id!(
    /// Engine-issued producer identifier
    ProducerId
);
string_id!(
    /// Engine-issued consumer identifier
    ConsumerId
);

/// Media kind of a producer or consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One negotiated codec inside a set of RTP parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtpCodecParameters {
    /// MIME type, e.g. `video/H264` or `audio/opus`
    pub mime_type: String,
    pub payload_type: u8,
    pub clock_rate: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<u8>,
    /// Codec-specific format parameters
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl RtpCodecParameters {
    /// Codec name: the MIME subtype (`H264` for `video/H264`)
    pub fn codec_name(&self) -> &str {
        self.mime_type
            .split_once('/')
            .map(|(_, name)| name)
            .unwrap_or(&self.mime_type)
    }

    /// Media kind derived from the MIME type prefix
    pub fn kind(&self) -> Option<MediaKind> {
        let (prefix, _) = self.mime_type.split_once('/')?;
        if prefix.eq_ignore_ascii_case("video") {
            Some(MediaKind::Video)
        } else if prefix.eq_ignore_ascii_case("audio") {
            Some(MediaKind::Audio)
        } else {
            None
        }
    }

    /// Framerate hint from the format parameters, if the sender provided one
    pub fn framerate(&self) -> Option<String> {
        match self.parameters.get("framerate")? {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }
}

/// RTP parameters of a producer or consumer
///
/// Only the codec list is interpreted here; everything else is carried through
/// to the client untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtpParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mid: Option<String>,
    pub codecs: Vec<RtpCodecParameters>,
    #[serde(default)]
    pub header_extensions: Vec<Value>,
    #[serde(default)]
    pub encodings: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtcp: Option<Value>,
}

impl RtpParameters {
    /// The primary (first) codec
    pub fn primary_codec(&self) -> Option<&RtpCodecParameters> {
        self.codecs.first()
    }
}

/// Opaque RTP capabilities of the router or of a client device
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RtpCapabilities(pub Value);

/// Negotiation data a client needs to set up its side of a WebRTC transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebRtcTransportInfo {
    pub id: TransportId,
    pub ice_parameters: Value,
    pub ice_candidates: Value,
    pub dtls_parameters: Value,
}

/// Remote endpoint parameters for `connect`
#[derive(Debug, Clone, PartialEq)]
pub enum TransportConnectParams {
    /// DTLS parameters from the client
    WebRtc { dtls_parameters: Value },
    /// Where a plain sink transport sends RTP and RTCP
    Plain {
        ip: IpAddr,
        port: u16,
        rtcp_port: u16,
    },
}

/// Description of a consumer created by the engine
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumerInfo {
    pub id: ConsumerId,
    pub producer_id: ProducerId,
    pub kind: MediaKind,
    pub rtp_parameters: RtpParameters,
}

/// Asynchronous notification from the engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A transport closed on the engine side (DTLS closed, ICE failure, explicit close)
    TransportClosed(TransportId),
    /// A producer closed; consumers of it are gone too
    ProducerClosed(ProducerId),
    /// A consumer closed on the engine side
    ConsumerClosed(ConsumerId),
    /// The engine process died; nothing further will work
    Died,
}
