//! In-process fan-out of state-change events to subscribers.

use helixer_core::{StateChange, StateChangedEvent};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::mpsc;

/// Which entities a subscriber wants to see.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EntityFilter {
    /// Every entity
    #[default]
    All,
    /// Only entities whose domain (the part before the first `.`) is listed
    Domains(Vec<String>),
}

impl EntityFilter {
    /// Build a domain filter, ignoring blank entries.
    pub fn domains<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let domains: Vec<String> = domains
            .into_iter()
            .map(|d| d.as_ref().trim().to_string())
            .filter(|d| !d.is_empty())
            .collect();

        if domains.is_empty() {
            Self::All
        } else {
            Self::Domains(domains)
        }
    }

    /// Check whether an entity domain passes the filter.
    #[must_use]
    pub fn matches(&self, domain: &str) -> bool {
        match self {
            Self::All => true,
            Self::Domains(domains) => domains.iter().any(|d| d == domain),
        }
    }
}

struct Subscriber {
    filter: EntityFilter,
    tx: mpsc::Sender<StateChange>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    subscribers: HashMap<u64, Subscriber>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Event hub distributing state changes to filtered subscribers.
#[derive(Clone)]
pub struct EventHub {
    registry: Arc<Mutex<Registry>>,
    capacity: usize,
}

impl EventHub {
    /// Create a hub whose subscriber queues hold `capacity` pending changes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::default())),
            capacity: capacity.max(1),
        }
    }

    /// Register a subscriber.
    #[must_use]
    pub fn subscribe(&self, filter: EntityFilter) -> Subscription {
        let (tx, rx) = mpsc::channel(self.capacity);
        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.subscribers.insert(id, Subscriber { filter, tx });

        tracing::debug!(subscription = id, "Subscriber registered");

        Subscription {
            id,
            rx,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        lock(&self.registry).subscribers.len()
    }

    /// Deliver an event to every matching subscriber.
    ///
    /// Events without a new state are dropped. Waits for queue space, so a
    /// slow subscriber applies backpressure to the caller. Returns the number
    /// of subscribers that received the change.
    pub async fn dispatch(&self, event: StateChangedEvent) -> usize {
        let Some(change) = event.into_change() else {
            tracing::trace!("Dropping event without new state");
            return 0;
        };

        let targets: Vec<(u64, mpsc::Sender<StateChange>)> = {
            let registry = lock(&self.registry);
            registry
                .subscribers
                .iter()
                .filter(|(_, sub)| sub.filter.matches(change.domain()))
                .map(|(id, sub)| (*id, sub.tx.clone()))
                .collect()
        };

        let mut delivered = 0;
        let mut closed = Vec::new();

        for (id, tx) in targets {
            if tx.send(change.clone()).await.is_ok() {
                delivered += 1;
            } else {
                closed.push(id);
            }
        }

        if !closed.is_empty() {
            let mut registry = lock(&self.registry);
            for id in closed {
                registry.subscribers.remove(&id);
                tracing::debug!(subscription = id, "Pruned closed subscriber");
            }
        }

        delivered
    }
}

/// Handle for receiving changes from an [`EventHub`].
///
/// Dropping the handle unsubscribes.
pub struct Subscription {
    id: u64,
    rx: mpsc::Receiver<StateChange>,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Wait for the next change. Returns `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<StateChange> {
        self.rx.recv().await
    }

    /// Take a queued change without waiting.
    pub fn try_recv(&mut self) -> Option<StateChange> {
        self.rx.try_recv().ok()
    }

    /// Stop receiving changes.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).subscribers.remove(&self.id);
            tracing::debug!(subscription = self.id, "Subscriber removed");
        }
    }
}
