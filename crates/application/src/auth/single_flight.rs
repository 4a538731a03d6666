//! Sharing one in-flight operation between concurrent callers.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;

type Flight<T> = (u64, Shared<BoxFuture<'static, T>>);

/// At most one execution of an operation runs at a time; callers arriving
/// while it runs await the same result instead of starting another.
pub struct SingleFlight<T: Clone + Send + Sync + 'static> {
    slot: Mutex<Option<Flight<T>>>,
    next_id: AtomicU64,
}

impl<T: Clone + Send + Sync + 'static> SingleFlight<T> {
    /// Create an idle guard.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            next_id: AtomicU64::new(0),
        }
    }

    /// Join the running flight, or start one with `start`.
    ///
    /// The flight keeps running if its starter is dropped; whichever caller
    /// is still waiting drives it to completion.
    pub async fn run<F, Fut>(&self, start: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (id, flight) = {
            let mut slot = self.slot.lock();
            if let Some((id, flight)) = slot.as_ref() {
                tracing::debug!(flight = id, "joining in-flight operation");
                (*id, flight.clone())
            } else {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let flight = start().boxed().shared();
                *slot = Some((id, flight.clone()));
                (id, flight)
            }
        };

        let output = flight.await;

        let mut slot = self.slot.lock();
        if slot.as_ref().is_some_and(|(current, _)| *current == id) {
            *slot = None;
        }
        output
    }
}

impl<T: Clone + Send + Sync + 'static> Default for SingleFlight<T> {
    fn default() -> Self {
        Self::new()
    }
}
