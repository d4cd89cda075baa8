//! Notification channel keyed by `[identification, event]`.
//!
//! The provider only ever emits [`MOUNT_EVENT`], once per entry per mount,
//! after the entry's off-screen subtree has committed. Subscribers are either
//! synchronous callbacks or unbounded tokio channels for async consumers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::cache::entry::Identification;

/// Event name signalling that an entry's off-screen DOM is stable.
pub const MOUNT_EVENT: &str = "mounted";

/// Composite subscription key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EventKey {
    pub identification: Identification,
    pub event: String,
}

impl EventKey {
    pub fn new(identification: impl Into<Identification>, event: impl Into<String>) -> Self {
        Self {
            identification: identification.into(),
            event: event.into(),
        }
    }

    /// Key for the mount notification of `identification`.
    pub fn mounted(identification: impl Into<Identification>) -> Self {
        Self::new(identification, MOUNT_EVENT)
    }
}

pub type SubscriptionId = u64;

type Handler = Arc<dyn Fn(&[Value]) + Send + Sync>;

#[derive(Clone)]
enum Subscriber {
    Callback(Handler),
    Channel(mpsc::UnboundedSender<Vec<Value>>),
}

impl Subscriber {
    fn deliver(&self, args: &[Value]) -> bool {
        match self {
            Subscriber::Callback(handler) => {
                handler(args);
                true
            }
            Subscriber::Channel(tx) => tx.send(args.to_vec()).is_ok(),
        }
    }

    fn is_closed(&self) -> bool {
        matches!(self, Subscriber::Channel(tx) if tx.is_closed())
    }
}

#[derive(Default)]
struct Registry {
    next_id: SubscriptionId,
    subscribers: HashMap<EventKey, Vec<(SubscriptionId, Subscriber)>>,
}

/// Cloneable handle to a shared subscriber registry.
#[derive(Clone, Default)]
pub struct NotificationChannel {
    inner: Arc<Mutex<Registry>>,
}

impl NotificationChannel {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        // A panicking handler never runs under the lock, so poisoning leaves the map intact.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn insert(&self, key: EventKey, subscriber: Subscriber) -> SubscriptionId {
        let mut registry = self.registry();
        registry.next_id += 1;
        let id = registry.next_id;
        registry
            .subscribers
            .entry(key)
            .or_default()
            .push((id, subscriber));
        id
    }

    /// Register a callback for `key`.
    pub fn subscribe(
        &self,
        key: EventKey,
        handler: impl Fn(&[Value]) + Send + Sync + 'static,
    ) -> SubscriptionId {
        trace!(identification = %key.identification, event = %key.event, "Subscribed");
        self.insert(key, Subscriber::Callback(Arc::new(handler)))
    }

    /// Register an async receiver for `key`. Dropping the receiver unsubscribes it.
    pub fn subscribe_channel(&self, key: EventKey) -> mpsc::UnboundedReceiver<Vec<Value>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.insert(key, Subscriber::Channel(tx));
        rx
    }

    /// Remove a subscription. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, key: &EventKey, id: SubscriptionId) -> bool {
        let mut registry = self.registry();
        let Some(list) = registry.subscribers.get_mut(key) else {
            return false;
        };

        let before = list.len();
        list.retain(|(sub_id, _)| *sub_id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            registry.subscribers.remove(key);
        }
        removed
    }

    /// Deliver `args` to every subscriber of `key`. Returns the number reached.
    pub fn emit(&self, key: &EventKey, args: &[Value]) -> usize {
        let targets: Vec<Subscriber> = match self.registry().subscribers.get(key) {
            Some(list) => list.iter().map(|(_, sub)| sub.clone()).collect(),
            None => return 0,
        };

        // Handlers run outside the lock so they may subscribe or emit themselves.
        let delivered = targets.iter().filter(|sub| sub.deliver(args)).count();

        let mut registry = self.registry();
        if let Some(list) = registry.subscribers.get_mut(key) {
            list.retain(|(_, sub)| !sub.is_closed());
            if list.is_empty() {
                registry.subscribers.remove(key);
            }
        }

        debug!(
            identification = %key.identification,
            event = %key.event,
            delivered,
            "Emitted notification"
        );
        delivered
    }

    /// Emit the mount event for each identification, in order.
    pub fn emit_mounted(&self, identifications: &[Identification]) -> usize {
        identifications
            .iter()
            .map(|id| self.emit(&EventKey::mounted(id.as_str()), &[]))
            .sum()
    }

    /// Number of live subscriptions for `key`.
    pub fn subscriber_count(&self, key: &EventKey) -> usize {
        self.registry()
            .subscribers
            .get(key)
            .map(|list| list.iter().filter(|(_, sub)| !sub.is_closed()).count())
            .unwrap_or(0)
    }
}

impl std::fmt::Debug for NotificationChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.registry();
        f.debug_struct("NotificationChannel")
            .field("keys", &registry.subscribers.len())
            .finish()
    }
}
