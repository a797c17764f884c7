//! Packaging session state machine
//!
//! ```text
//!   Idle ─► Allocating ─► Consuming ─► Encoding ─► Live
//!    │          │             │            │         │
//!    └──────────┴─────────────┴─────┬──────┴─────────┘
//!                                   ▼
//!                               Cleaning ─► Closed
//! ```
//!
//! Failures at any startup step and explicit stops both go through
//! `Cleaning`, which is where resources are released.

/// Lifecycle state of a packaging session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackagingState {
    /// Created, not started
    Idle,
    /// Leasing sink ports
    Allocating,
    /// Creating sink transports and paused consumers
    Consuming,
    /// Description files written, encoders running, waiting for output
    Encoding,
    /// Master playlist written and announced
    Live,
    /// Tearing down
    Cleaning,
    /// Terminal; every resource has been released
    Closed,
}

impl PackagingState {
    /// Whether `self -> next` is an allowed transition
    pub fn can_transition_to(self, next: PackagingState) -> bool {
        use PackagingState::*;

        matches!(
            (self, next),
            (Idle, Allocating)
                | (Allocating, Consuming)
                | (Consuming, Encoding)
                | (Encoding, Live)
                | (Idle | Allocating | Consuming | Encoding | Live, Cleaning)
                | (Cleaning, Closed)
        )
    }

    /// Startup is in progress
    pub fn is_starting(self) -> bool {
        matches!(
            self,
            PackagingState::Allocating | PackagingState::Consuming | PackagingState::Encoding
        )
    }

    /// Teardown has begun or finished
    pub fn is_terminating(self) -> bool {
        matches!(self, PackagingState::Cleaning | PackagingState::Closed)
    }

    pub fn is_closed(self) -> bool {
        self == PackagingState::Closed
    }
}
