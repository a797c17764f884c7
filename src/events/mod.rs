//! Out-of-band live-stream notifications
//!
//! Viewers that are not signaling participants (a stream directory page, for
//! example) subscribe here to learn which peers currently have a playable
//! packaged stream.

pub mod broadcaster;

pub use broadcaster::{EventBroadcaster, LiveEvent, Subscription, SubscriptionId};
