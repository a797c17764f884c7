//! Port leasing for plain RTP sinks
//!
//! Packaging pipelines need local UDP ports for the encoder to listen on. The
//! [`PortAllocator`] is the single, internally synchronized owner of the
//! configured port range; every lease must eventually be released.

pub mod allocator;
pub mod probe;

pub use allocator::PortAllocator;
pub use probe::{PortProbe, UdpBindProbe};
