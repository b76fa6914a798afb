//! Broadcast invalidation signals for derived-data caches.
//!
//! The bus is a trait so tests and embedders can supply their own transport;
//! [`LocalBus`] is the in-process implementation backed by `mpsc` channels.

use std::sync::{Mutex, PoisonError, mpsc};

/// "The dataset named here changed; re-read it."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invalidation {
    pub dataset: String,
}

/// Publish/subscribe transport for invalidation signals.
pub trait InvalidationBus: Send + Sync {
    /// Deliver an invalidation to every live subscriber. Returns how many
    /// subscribers received it.
    fn publish(&self, dataset: &str) -> usize;

    /// Register a new subscriber.
    fn subscribe(&self) -> Subscription;
}

/// Receiving end held by one mounted consumer.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::Receiver<Invalidation>,
}

impl Subscription {
    /// Wrap a raw receiver; used by custom [`InvalidationBus`] implementations.
    #[must_use]
    pub const fn new(rx: mpsc::Receiver<Invalidation>) -> Self {
        Self { rx }
    }

    /// Drain all queued signals, returning true if any named `dataset`.
    ///
    /// Several signals received between two renders collapse into one.
    pub fn take(&self, dataset: &str) -> bool {
        let mut hit = false;
        while let Ok(signal) = self.rx.try_recv() {
            hit |= signal.dataset == dataset;
        }
        hit
    }
}

/// In-process bus; subscribers that were dropped are pruned on publish.
#[derive(Debug, Default)]
pub struct LocalBus {
    subscribers: Mutex<Vec<mpsc::Sender<Invalidation>>>,
}

impl LocalBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered subscribers (including not-yet-pruned dead ones).
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl InvalidationBus for LocalBus {
    fn publish(&self, dataset: &str) -> usize {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| {
            tx.send(Invalidation {
                dataset: dataset.to_string(),
            })
            .is_ok()
        });
        tracing::debug!(dataset, delivered = subscribers.len(), "published invalidation");
        subscribers.len()
    }

    fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        Subscription::new(rx)
    }
}
