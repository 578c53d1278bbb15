//! Counted completion barrier backing [`Limiter::join`](crate::Limiter::join).

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

type Observer = Box<dyn Fn(usize) + Send + Sync>;

/// A counter of unfinished work with an async "reached zero" wait.
///
/// The count lives in a `watch` channel, so increments, decrements and the
/// zero check in [`wait`](WaitGroup::wait) all go through the same lock and a
/// waiter can never miss the final decrement.
pub struct WaitGroup {
    shared: Arc<Shared>,
}

struct Shared {
    count: watch::Sender<usize>,
    // Sees every new count while the channel lock is held, so its calls
    // arrive in the same order as the updates.
    observer: Option<Observer>,
}

impl Shared {
    fn update(&self, modify: impl FnOnce(&mut usize)) {
        self.count.send_modify(|n| {
            modify(n);
            if let Some(observer) = &self.observer {
                observer(*n);
            }
        });
    }
}

impl WaitGroup {
    /// Creates a wait group with nothing outstanding.
    pub fn new() -> Self {
        Self::from_observer(None)
    }

    /// Creates a wait group that reports every change of the count to
    /// `observer`.
    #[cfg_attr(not(any(test, feature = "metrics")), allow(dead_code))]
    pub(crate) fn with_observer<F>(observer: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        Self::from_observer(Some(Box::new(observer)))
    }

    fn from_observer(observer: Option<Observer>) -> Self {
        let (count, _rx) = watch::channel(0);
        Self {
            shared: Arc::new(Shared { count, observer }),
        }
    }

    /// Registers one unit of work.
    ///
    /// The count is incremented before this returns. Dropping the returned
    /// guard marks the work done, on every exit path including unwinding.
    pub fn add(&self) -> CompletionGuard {
        self.shared.update(|n| *n += 1);
        CompletionGuard {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Returns the number of registered units not yet done.
    pub fn count(&self) -> usize {
        *self.shared.count.borrow()
    }

    /// Waits until the count is observed at zero.
    ///
    /// Returns immediately when nothing is outstanding. Work added while
    /// waiting extends the wait if it is registered before the count drops
    /// to zero.
    pub async fn wait(&self) {
        let mut rx = self.shared.count.subscribe();
        // The sender outlives `self`, so the channel cannot close under us.
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

impl Default for WaitGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WaitGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitGroup")
            .field("count", &self.count())
            .finish()
    }
}

/// Marks one unit of [`WaitGroup`] work done when dropped.
#[must_use = "dropping the guard immediately marks the work done"]
pub struct CompletionGuard {
    shared: Arc<Shared>,
}

impl fmt::Debug for CompletionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionGuard").finish_non_exhaustive()
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.shared.update(|n| *n = n.saturating_sub(1));
    }
}
