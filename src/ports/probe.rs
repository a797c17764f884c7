//! OS-level port probes

use std::net::{IpAddr, SocketAddr};

use async_trait::async_trait;
use tokio::net::UdpSocket;

/// Checks whether a port can actually be bound right now
///
/// The allocator only tracks its own leases; the probe catches sockets held by
/// anything else on the host.
#[async_trait]
pub trait PortProbe: Send + Sync + 'static {
    async fn is_free(&self, ip: IpAddr, port: u16) -> bool;
}

/// Probe that binds (and immediately drops) a UDP socket
#[derive(Debug, Clone, Copy, Default)]
pub struct UdpBindProbe;

#[async_trait]
impl PortProbe for UdpBindProbe {
    async fn is_free(&self, ip: IpAddr, port: u16) -> bool {
        match UdpSocket::bind(SocketAddr::new(ip, port)).await {
            Ok(_socket) => true,
            Err(e) => {
                tracing::trace!(port = port, error = %e, "Port probe failed");
                false
            }
        }
    }
}
