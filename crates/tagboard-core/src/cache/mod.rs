//! Process-local derived-data cache with request coalescing.
//!
//! Each [`DerivedCache`] holds one small reference dataset (for example the
//! hashtag color table) and moves through:
//!
//! ```text
//! EMPTY --get--> LOADING --ok--> READY
//!   ^               |              |
//!   +-----err-------+              +--invalidation (per consumer)--> LOADING
//! ```
//!
//! - consumers arriving while LOADING wait on the same in-flight fetch
//! - a failed fetch leaves no snapshot behind; the next consumer retries
//! - an invalidation is broadcast on an [`InvalidationBus`]; every mounted
//!   [`Consumer`] re-fetches on its own at its next render (no coalescing
//!   across the invalidation boundary)
//!
//! A snapshot never expires on a timer.

pub mod bus;
pub mod colors;

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

pub use bus::{Invalidation, InvalidationBus, LocalBus, Subscription};

/// A fetch failure delivered to every consumer attached to the fetch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("fetch of `{dataset}` failed: {message}")]
pub struct FetchError {
    pub dataset: String,
    pub message: String,
}

impl FetchError {
    #[must_use]
    pub fn new(dataset: impl Into<String>, message: impl fmt::Display) -> Self {
        Self {
            dataset: dataset.into(),
            message: message.to_string(),
        }
    }
}

/// The underlying read a cache coalesces.
pub trait Fetcher<T>: Send + Sync {
    /// Perform one full fetch of the dataset.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] if the dataset could not be read.
    fn fetch(&self) -> Result<T, FetchError>;
}

impl<T, F> Fetcher<T> for F
where
    F: Fn() -> Result<T, FetchError> + Send + Sync,
{
    fn fetch(&self) -> Result<T, FetchError> {
        self()
    }
}

/// Observable cache state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Empty,
    Loading,
    Ready,
}

type Outcome<T> = Result<Arc<T>, FetchError>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|msg| (*msg).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .map_or_else(|| "fetcher panicked".to_string(), |msg| format!("fetcher panicked: {msg}"))
}

/// Shared handle for one fetch in progress.
struct InFlight<T> {
    outcome: Mutex<Option<Outcome<T>>>,
    done: Condvar,
    waiting: AtomicUsize,
}

impl<T> InFlight<T> {
    const fn new() -> Self {
        Self {
            outcome: Mutex::new(None),
            done: Condvar::new(),
            waiting: AtomicUsize::new(0),
        }
    }

    fn wait(&self) -> Outcome<T> {
        let mut outcome = lock(&self.outcome);
        loop {
            if let Some(result) = outcome.as_ref() {
                let result = result.clone();
                self.waiting.fetch_sub(1, Ordering::SeqCst);
                return result;
            }
            outcome = self
                .done
                .wait(outcome)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn complete(&self, result: Outcome<T>) {
        *lock(&self.outcome) = Some(result);
        self.done.notify_all();
    }
}

enum Slot<T> {
    Empty,
    Loading(Arc<InFlight<T>>),
    Ready(Arc<T>),
}

enum Role<T> {
    Leader(Arc<InFlight<T>>),
    Waiter(Arc<InFlight<T>>),
}

/// Coalescing cache for one named dataset.
pub struct DerivedCache<T> {
    dataset: String,
    slot: Mutex<Slot<T>>,
    fetcher: Box<dyn Fetcher<T>>,
    fetches: AtomicUsize,
}

impl<T> fmt::Debug for DerivedCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedCache")
            .field("dataset", &self.dataset)
            .field("state", &self.state())
            .field("fetches", &self.fetch_count())
            .finish_non_exhaustive()
    }
}

impl<T: Send + Sync> DerivedCache<T> {
    /// Create an EMPTY cache. Nothing is fetched until the first consumer asks.
    pub fn new(dataset: impl Into<String>, fetcher: impl Fetcher<T> + 'static) -> Arc<Self> {
        Arc::new(Self {
            dataset: dataset.into(),
            slot: Mutex::new(Slot::Empty),
            fetcher: Box::new(fetcher),
            fetches: AtomicUsize::new(0),
        })
    }
}

impl<T> DerivedCache<T> {
    /// Dataset name used on the invalidation bus.
    #[must_use]
    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    #[must_use]
    pub fn state(&self) -> CacheState {
        match &*lock(&self.slot) {
            Slot::Empty => CacheState::Empty,
            Slot::Loading(_) => CacheState::Loading,
            Slot::Ready(_) => CacheState::Ready,
        }
    }

    /// The READY snapshot, if any. Never triggers a fetch.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<T>> {
        match &*lock(&self.slot) {
            Slot::Ready(value) => Some(Arc::clone(value)),
            Slot::Empty | Slot::Loading(_) => None,
        }
    }

    /// Number of underlying fetches issued so far.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Consumers currently parked on the in-flight fetch.
    #[must_use]
    pub fn waiting_consumers(&self) -> usize {
        match &*lock(&self.slot) {
            Slot::Loading(flight) => flight.waiting.load(Ordering::SeqCst),
            Slot::Empty | Slot::Ready(_) => 0,
        }
    }

    /// Return the snapshot, fetching it if needed.
    ///
    /// Concurrent callers while LOADING share one fetch. The slot decision is
    /// made under the mutex, so two callers in the same turn never both lead.
    ///
    /// # Errors
    ///
    /// Returns the shared [`FetchError`] when the in-flight fetch fails.
    pub fn get(&self) -> Result<Arc<T>, FetchError> {
        let role = {
            let mut slot = lock(&self.slot);
            match &*slot {
                Slot::Ready(value) => return Ok(Arc::clone(value)),
                Slot::Loading(flight) => {
                    flight.waiting.fetch_add(1, Ordering::SeqCst);
                    Role::Waiter(Arc::clone(flight))
                }
                Slot::Empty => {
                    let flight = Arc::new(InFlight::new());
                    *slot = Slot::Loading(Arc::clone(&flight));
                    Role::Leader(flight)
                }
            }
        };

        match role {
            Role::Waiter(flight) => flight.wait(),
            Role::Leader(flight) => self.lead(&flight),
        }
    }

    /// Start a fresh fetch regardless of current state; used by a consumer
    /// that observed an invalidation.
    ///
    /// The stale snapshot stops being served immediately: callers of
    /// [`get`](Self::get) arriving meanwhile wait for this fetch instead.
    ///
    /// # Errors
    ///
    /// Returns the [`FetchError`] from this fetch.
    pub fn refetch(&self) -> Result<Arc<T>, FetchError> {
        let flight = Arc::new(InFlight::new());
        *lock(&self.slot) = Slot::Loading(Arc::clone(&flight));
        self.lead(&flight)
    }

    fn lead(&self, flight: &Arc<InFlight<T>>) -> Outcome<T> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        // A panicking fetcher settles the flight as a failure.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.fetcher.fetch()))
            .unwrap_or_else(|payload| {
                Err(FetchError::new(self.dataset.as_str(), panic_message(&*payload)))
            })
            .map(Arc::new);

        {
            let mut slot = lock(&self.slot);
            // A newer refetch may have replaced this flight; it owns the slot.
            if matches!(&*slot, Slot::Loading(current) if Arc::ptr_eq(current, flight)) {
                *slot = match &outcome {
                    Ok(value) => Slot::Ready(Arc::clone(value)),
                    Err(_) => Slot::Empty,
                };
            }
        }

        match &outcome {
            Ok(_) => tracing::debug!(dataset = %self.dataset, "cache fetch completed"),
            Err(error) => {
                tracing::warn!(dataset = %self.dataset, error = %error, "cache fetch failed");
            }
        }
        flight.complete(outcome.clone());
        outcome
    }
}

/// One mounted reader of a cache, subscribed to invalidations.
pub struct Consumer<T> {
    cache: Arc<DerivedCache<T>>,
    subscription: Subscription,
}

impl<T> fmt::Debug for Consumer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("dataset", &self.cache.dataset)
            .finish_non_exhaustive()
    }
}

impl<T> Consumer<T> {
    /// Mount a consumer: subscribe to the bus. Fetching waits for the first render.
    pub fn mount(cache: &Arc<DerivedCache<T>>, bus: &dyn InvalidationBus) -> Self {
        Self {
            cache: Arc::clone(cache),
            subscription: bus.subscribe(),
        }
    }

    /// Data for this render: a fresh fetch if an invalidation arrived since
    /// the last render, otherwise the shared (coalesced) snapshot.
    ///
    /// # Errors
    ///
    /// Returns the [`FetchError`] of whichever fetch served this render.
    pub fn render(&self) -> Result<Arc<T>, FetchError> {
        if self.subscription.take(self.cache.dataset()) {
            self.cache.refetch()
        } else {
            self.cache.get()
        }
    }
}
