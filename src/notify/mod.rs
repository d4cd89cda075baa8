//! Keyed publish/subscribe used to signal off-screen mount completion.
//!
//! - [`channel`]: `NotificationChannel`, `EventKey`, subscriptions

pub mod channel;

pub use channel::{EventKey, NotificationChannel, SubscriptionId, MOUNT_EVENT};
