//! Single-flight session refreshing.

use crate::{endpoints, ClientError, UnauthenticatedClient};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::{
    future::Future,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard, PoisonError, Weak,
    },
    time::Duration,
};

/// The outcome every caller waiting on a refresh attempt receives.
pub type RefreshOutcome = Result<(), Arc<ClientError>>;

/// A handle on an operation which may be shared with other callers.
pub type Flight<T> = Shared<BoxFuture<'static, T>>;

/// Lets concurrent callers share one execution of an operation.
///
/// While an operation is in flight, anyone else asking for it gets a handle
/// to the same future instead of starting their own. The slot is emptied when
/// the operation completes, so the next caller starts a new one.
pub struct SingleFlight<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

struct Slot<T> {
    generation: u64,
    in_flight: Option<(u64, Flight<T>)>,
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        SingleFlight {
            slot: Arc::new(Mutex::new(Slot {
                generation: 0,
                in_flight: None,
            })),
        }
    }

    /// Join the in-flight operation, or start a new one using `start`.
    ///
    /// `start` is only invoked when nothing is in flight.
    pub fn run<F, Fut>(&self, start: F) -> Flight<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let mut slot = lock(&self.slot);

        if let Some((generation, flight)) = &slot.in_flight {
            log::trace!("Joining in-flight operation #{}", generation);
            return flight.clone();
        }

        slot.generation += 1;
        let generation = slot.generation;
        let work = start();
        let weak_slot = Arc::downgrade(&self.slot);

        let flight = async move {
            let outcome = work.await;
            finish(&weak_slot, generation);
            outcome
        }
        .boxed()
        .shared();

        slot.in_flight = Some((generation, flight.clone()));
        flight
    }

    pub fn is_in_flight(&self) -> bool {
        lock(&self.slot).in_flight.is_some()
    }
}

impl<T> Default for SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self { SingleFlight::new() }
}

fn finish<T>(slot: &Weak<Mutex<Slot<T>>>, generation: u64) {
    let slot = match slot.upgrade() {
        Some(slot) => slot,
        None => return,
    };
    let mut slot = lock(&slot);

    let is_current = matches!(
        slot.in_flight,
        Some((current, _)) if current == generation
    );
    if is_current {
        slot.in_flight = None;
    }
}

// Nothing panics while holding the lock, but a poisoned slot is still usable.
fn lock<T>(slot: &Mutex<Slot<T>>) -> MutexGuard<'_, Slot<T>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Makes sure at most one call to the refresh endpoint is outstanding.
pub struct RefreshCoordinator {
    client: UnauthenticatedClient,
    timeout: Duration,
    flight: SingleFlight<RefreshOutcome>,
    attempts: Arc<AtomicUsize>,
}

impl RefreshCoordinator {
    pub fn new(client: UnauthenticatedClient, timeout: Duration) -> Self {
        RefreshCoordinator {
            client,
            timeout,
            flight: SingleFlight::new(),
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Ask the server for a renewed session, sharing the outcome with anyone
    /// else who asks while the request is outstanding.
    pub async fn refresh(&self) -> RefreshOutcome {
        let client = self.client.clone();
        let timeout = self.timeout;
        let attempts = Arc::clone(&self.attempts);

        let flight = self.flight.run(move || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            log::debug!("Starting session refresh #{}", attempt);

            async move {
                let refreshed = endpoints::refresh(&client);
                let outcome = tokio::time::timeout(timeout, refreshed)
                    .await
                    .unwrap_or_else(|_| Err(ClientError::TimedOut(timeout)));

                match outcome {
                    Ok(()) => {
                        log::debug!("Session refresh #{} succeeded", attempt);
                        Ok(())
                    },
                    Err(e) => {
                        log::error!(
                            "Session refresh #{} failed: {}",
                            attempt,
                            e
                        );
                        Err(Arc::new(e))
                    },
                }
            }
        });

        flight.await
    }

    /// How many refresh requests have been started so far.
    pub fn attempts(&self) -> usize { self.attempts.load(Ordering::SeqCst) }

    pub fn is_refreshing(&self) -> bool { self.flight.is_in_flight() }
}
