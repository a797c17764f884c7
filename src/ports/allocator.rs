//! Port allocator implementation

use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv4Addr};
use std::ops::RangeInclusive;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Error, Result};

use super::probe::{PortProbe, UdpBindProbe};

/// Leases ports from a fixed inclusive range
///
/// A port is reserved in the lease set *before* it is probed, so two
/// concurrent callers can never walk away with the same number. The lock is
/// never held across the probe.
pub struct PortAllocator {
    range: RangeInclusive<u16>,
    probe_ip: IpAddr,
    probe: Arc<dyn PortProbe>,
    leased: Mutex<BTreeSet<u16>>,
}

impl PortAllocator {
    /// Create an allocator probing with UDP binds on 127.0.0.1
    pub fn new(range: RangeInclusive<u16>) -> Self {
        Self::with_probe(
            range,
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            Arc::new(UdpBindProbe),
        )
    }

    /// Create an allocator with a custom probe
    pub fn with_probe(range: RangeInclusive<u16>, probe_ip: IpAddr, probe: Arc<dyn PortProbe>) -> Self {
        Self {
            range,
            probe_ip,
            probe,
            leased: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn range(&self) -> &RangeInclusive<u16> {
        &self.range
    }

    /// Lease one port
    ///
    /// Scans the whole range once. Fails with [`Error::ResourceExhausted`] if
    /// every port is either leased or not bindable; the allocator stays usable.
    /// Dropping the future mid-probe leases nothing.
    pub async fn lease(&self) -> Result<u16> {
        let mut reservation = Reservation::new(self);
        let port = self.reserve_next(&mut reservation).await?;
        reservation.keep();
        Ok(port)
    }

    /// Lease `count` ports, all or nothing
    pub async fn lease_many(&self, count: usize) -> Result<Vec<u16>> {
        let mut reservation = Reservation::new(self);
        for _ in 0..count {
            self.reserve_next(&mut reservation).await?;
        }
        Ok(reservation.keep())
    }

    async fn reserve_next(&self, reservation: &mut Reservation<'_>) -> Result<u16> {
        for port in self.range.clone() {
            if !self.leased.lock().insert(port) {
                continue;
            }
            reservation.ports.push(port);

            if self.probe.is_free(self.probe_ip, port).await {
                tracing::debug!(port = port, leased = self.leased_count(), "Port leased");
                return Ok(port);
            }

            reservation.ports.pop();
            self.leased.lock().remove(&port);
        }

        tracing::warn!(
            min = *self.range.start(),
            max = *self.range.end(),
            "Port range exhausted"
        );
        Err(Error::ResourceExhausted {
            min: *self.range.start(),
            max: *self.range.end(),
        })
    }

    /// Release a port. Releasing a port that is not leased is a no-op.
    pub fn release(&self, port: u16) {
        let mut leased = self.leased.lock();
        if leased.remove(&port) {
            tracing::debug!(port = port, leased = leased.len(), "Port released");
        }
    }

    pub fn release_all(&self, ports: &[u16]) {
        for &port in ports {
            self.release(port);
        }
    }

    pub fn is_leased(&self, port: u16) -> bool {
        self.leased.lock().contains(&port)
    }

    /// Currently leased ports, ascending
    pub fn leased(&self) -> Vec<u16> {
        self.leased.lock().iter().copied().collect()
    }

    pub fn leased_count(&self) -> usize {
        self.leased.lock().len()
    }

}

/// Ports taken into the lease set but not yet handed to the caller
///
/// Dropped without [`keep`](Reservation::keep), it releases them again.
struct Reservation<'a> {
    allocator: &'a PortAllocator,
    ports: Vec<u16>,
}

impl<'a> Reservation<'a> {
    fn new(allocator: &'a PortAllocator) -> Self {
        Self {
            allocator,
            ports: Vec::new(),
        }
    }

    fn keep(mut self) -> Vec<u16> {
        std::mem::take(&mut self.ports)
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        self.allocator.release_all(&self.ports);
    }
}

impl std::fmt::Debug for PortAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortAllocator")
            .field("range", &self.range)
            .field("leased", &self.leased_count())
            .finish()
    }
}
