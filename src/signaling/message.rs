//! Signaling messages
//!
//! JSON objects tagged by a `type` field, field names in camelCase.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::{
    ConsumerId, MediaKind, ProducerId, RtpCapabilities, RtpParameters, TransportId,
    WebRtcTransportInfo,
};

/// Direction of a client WebRTC transport, from the client's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportDirection {
    /// Client sends media to the relay
    Send,
    /// Client receives media from the relay
    Recv,
}

/// Request from a connected client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Request {
    GetRouterRtpCapabilities,

    CreateWebRtcTransport { direction: TransportDirection },

    #[serde(rename_all = "camelCase")]
    ConnectTransport {
        transport_id: TransportId,
        dtls_parameters: Value,
    },

    /// Publish a track on the client's send transport
    #[serde(rename_all = "camelCase")]
    Produce {
        kind: MediaKind,
        rtp_parameters: RtpParameters,
    },

    /// Receive another peer's producer on the client's receive transport
    #[serde(rename_all = "camelCase")]
    Consume {
        producer_id: ProducerId,
        rtp_capabilities: RtpCapabilities,
    },

    #[serde(rename_all = "camelCase")]
    ResumeConsumer { consumer_id: ConsumerId },

    /// List every producer of every other peer
    GetProducers,

    PauseProducer { kind: MediaKind },

    ResumeProducer { kind: MediaKind },
}

impl Request {
    /// Message type, for logging
    pub fn name(&self) -> &'static str {
        match self {
            Request::GetRouterRtpCapabilities => "getRouterRtpCapabilities",
            Request::CreateWebRtcTransport { .. } => "createWebRtcTransport",
            Request::ConnectTransport { .. } => "connectTransport",
            Request::Produce { .. } => "produce",
            Request::Consume { .. } => "consume",
            Request::ResumeConsumer { .. } => "resumeConsumer",
            Request::GetProducers => "getProducers",
            Request::PauseProducer { .. } => "pauseProducer",
            Request::ResumeProducer { .. } => "resumeProducer",
        }
    }
}

/// A producer owned by another peer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteProducer {
    pub peer_id: String,
    pub producer_id: ProducerId,
    pub kind: MediaKind,
}

/// Reply to a [`Request`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Response {
    #[serde(rename_all = "camelCase")]
    RtpCapabilities { rtp_capabilities: RtpCapabilities },

    TransportCreated { params: WebRtcTransportInfo },

    #[serde(rename_all = "camelCase")]
    Produced { producer_id: ProducerId },

    #[serde(rename_all = "camelCase")]
    Consumed {
        id: ConsumerId,
        producer_id: ProducerId,
        peer_id: String,
        kind: MediaKind,
        rtp_parameters: RtpParameters,
    },

    Producers { producers: Vec<RemoteProducer> },

    /// Request succeeded with nothing to return
    Ack,

    Error { message: String },
}

/// Unsolicited message pushed to a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Notification {
    /// First message on every connection, carrying the client's own id
    #[serde(rename_all = "camelCase")]
    ConnectionSuccess { peer_id: String },

    #[serde(rename_all = "camelCase")]
    PeerJoined { peer_id: String },

    #[serde(rename_all = "camelCase")]
    NewProducer {
        peer_id: String,
        producer_id: ProducerId,
        kind: MediaKind,
    },

    /// A peer paused or resumed one of its producers
    #[serde(rename_all = "camelCase")]
    ProducerChange {
        peer_id: String,
        kind: MediaKind,
        paused: bool,
    },

    #[serde(rename_all = "camelCase")]
    PeerLeft { peer_id: String },
}

impl Notification {
    pub fn name(&self) -> &'static str {
        match self {
            Notification::ConnectionSuccess { .. } => "connectionSuccess",
            Notification::PeerJoined { .. } => "peerJoined",
            Notification::NewProducer { .. } => "newProducer",
            Notification::ProducerChange { .. } => "producerChange",
            Notification::PeerLeft { .. } => "peerLeft",
        }
    }
}
