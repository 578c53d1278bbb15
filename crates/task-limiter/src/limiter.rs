//! The limiter: a slot pool plus a completion tracker.

use crate::config::{LimiterConfig, LimiterConfigBuilder};
use crate::error::LimiterError;
use crate::events::TaskEvent;
use crate::wait_group::{CompletionGuard, WaitGroup};
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
#[cfg(feature = "metrics")]
use std::sync::{Mutex, Once, PoisonError};

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

/// Caps how many tasks run at once and lets callers wait for all of them.
///
/// Cloning a `Limiter` is cheap; clones share the same slots and the same
/// set of outstanding submissions.
#[derive(Clone)]
pub struct Limiter {
    inner: Arc<Inner>,
}

struct Inner {
    semaphore: Arc<Semaphore>,
    outstanding: WaitGroup,
    config: LimiterConfig,
    /// Serializes reads of the pool with writes of the slots gauge, so the
    /// last write always reflects the last release.
    #[cfg(feature = "metrics")]
    slots_gauge: Mutex<()>,
}

impl Limiter {
    /// Creates a limiter with `capacity` slots and default settings.
    ///
    /// `capacity` may be zero; that limiter never admits anything. Values
    /// above [`Semaphore::MAX_PERMITS`] are clamped to it.
    pub fn new(capacity: usize) -> Self {
        Self::builder().capacity(capacity).build()
    }

    /// Creates a new builder for configuring a limiter.
    ///
    /// # Examples
    ///
    /// ```
    /// use task_limiter::Limiter;
    /// use std::time::Duration;
    ///
    /// let limiter = Limiter::builder()
    ///     .capacity(8)
    ///     .name("thumbnails")
    ///     .max_wait_duration(Some(Duration::from_secs(5)))
    ///     .build();
    ///
    /// assert_eq!(limiter.capacity(), 8);
    /// assert_eq!(limiter.available_slots(), 8);
    /// ```
    pub fn builder() -> LimiterConfigBuilder {
        #[cfg(feature = "metrics")]
        {
            METRICS_INIT.call_once(|| {
                describe_counter!(
                    "limiter_tasks_submitted_total",
                    "Total number of tasks submitted to the limiter"
                );
                describe_counter!(
                    "limiter_tasks_finished_total",
                    "Total number of submitted tasks that completed normally"
                );
                describe_counter!(
                    "limiter_tasks_panicked_total",
                    "Total number of submitted tasks that panicked"
                );
                describe_counter!(
                    "limiter_slots_rejected_total",
                    "Total number of bounded slot acquisitions that gave up"
                );
                describe_gauge!("limiter_slots_in_use", "Current number of held slots");
                describe_gauge!(
                    "limiter_outstanding_tasks",
                    "Current number of submitted tasks not yet finished"
                );
                describe_histogram!(
                    "limiter_wait_duration_seconds",
                    "Time spent waiting to acquire a slot"
                );
                describe_histogram!(
                    "limiter_task_duration_seconds",
                    "Time submitted tasks spent holding a slot"
                );
            });
        }
        LimiterConfigBuilder::new()
    }

    pub(crate) fn from_config(mut config: LimiterConfig) -> Self {
        config.capacity = config.capacity.min(Semaphore::MAX_PERMITS);

        #[cfg(feature = "metrics")]
        let outstanding = {
            let name = config.name.clone();
            WaitGroup::with_observer(move |count| {
                gauge!("limiter_outstanding_tasks", "limiter" => name.clone()).set(count as f64);
            })
        };
        #[cfg(not(feature = "metrics"))]
        let outstanding = WaitGroup::new();

        Self {
            inner: Arc::new(Inner {
                semaphore: Arc::new(Semaphore::new(config.capacity)),
                outstanding,
                config,
                #[cfg(feature = "metrics")]
                slots_gauge: Mutex::new(()),
            }),
        }
    }

    /// Returns the configured number of slots.
    pub fn capacity(&self) -> usize {
        self.inner.config.capacity
    }

    /// Returns the name of this limiter.
    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    /// Returns the number of slots currently free.
    ///
    /// This exceeds [`capacity`](Self::capacity) only after an unmatched
    /// [`release`](Self::release).
    pub fn available_slots(&self) -> usize {
        self.inner.semaphore.available_permits()
    }

    /// Returns the number of slots currently held.
    pub fn slots_in_use(&self) -> usize {
        self.capacity().saturating_sub(self.available_slots())
    }

    /// Returns the number of submissions that have not fully finished.
    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.count()
    }

    pub(crate) fn config(&self) -> &LimiterConfig {
        &self.inner.config
    }

    /// Runs `task` on its own Tokio task once a slot is free.
    ///
    /// The submission is counted before this returns, so a [`join`](Self::join)
    /// issued right after always waits for it. This never waits for a slot
    /// itself; the spawned task does.
    ///
    /// A panicking task still gives back its slot and still counts as done.
    ///
    /// # Panics
    ///
    /// Panics if no runtime was configured and this is called outside a
    /// Tokio runtime.
    pub fn submit<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let completion = self.track();
        self.on_submitted();

        let limiter = self.clone();
        self.spawn(async move {
            let slot = limiter.acquire_slot().await;
            let started = Instant::now();
            let outcome = AssertUnwindSafe(task).catch_unwind().await;
            drop(slot);
            limiter.on_task_done(started.elapsed(), outcome.is_err());
            drop(completion);
        });
    }

    /// Runs the synchronous `task` on the blocking thread pool once a slot
    /// is free.
    ///
    /// Same contract as [`submit`](Self::submit); use this for closures that
    /// block or burn CPU.
    ///
    /// A closure already running on the blocking pool cannot be cancelled.
    /// If the runtime shuts down while it runs, its slot and its submission
    /// are released at shutdown even though the closure keeps going until it
    /// returns on its own.
    pub fn submit_blocking<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let completion = self.track();
        self.on_submitted();

        let limiter = self.clone();
        self.spawn(async move {
            let slot = limiter.acquire_slot().await;
            let started = Instant::now();
            let outcome = tokio::task::spawn_blocking(task).await;
            drop(slot);
            let panicked = matches!(&outcome, Err(e) if e.is_panic());
            limiter.on_task_done(started.elapsed(), panicked);
            drop(completion);
        });
    }

    /// Waits until every submission made so far has finished.
    ///
    /// Submissions racing with this call may or may not be waited for.
    /// Calls made through a [`LimiterLayer`](crate::LimiterLayer) count as
    /// submissions too.
    pub async fn join(&self) {
        let start = Instant::now();
        self.inner.outstanding.wait().await;
        let waited = start.elapsed();

        #[cfg(feature = "tracing")]
        tracing::debug!(limiter = %self.name(), ?waited, "limiter join completed");

        self.emit(|| TaskEvent::JoinCompleted {
            limiter_name: self.name().to_string(),
            timestamp: Instant::now(),
            waited,
        });
    }

    /// Waits for a free slot and keeps it until [`release`](Self::release)
    /// is called.
    ///
    /// Dropping the returned future before it completes takes nothing from
    /// the pool. Prefer [`acquire_slot`](Self::acquire_slot) unless the
    /// acquire and release happen in unrelated places.
    pub async fn acquire(&self) {
        self.acquire_slot().await.forget();
    }

    /// Frees one slot taken with [`acquire`](Self::acquire).
    ///
    /// Nothing checks that a slot is actually held: calling this without a
    /// matching `acquire` grows the pool beyond its capacity for good.
    ///
    /// # Panics
    ///
    /// Panics if the pool would grow past [`Semaphore::MAX_PERMITS`] free
    /// slots. Only unmatched releases on a limiter whose capacity is already
    /// near that bound can get there.
    pub fn release(&self) {
        self.inner.semaphore.add_permits(1);
        self.record_slots_in_use();
    }

    /// Waits for a free slot and returns a guard that frees it on drop.
    pub async fn acquire_slot(&self) -> SlotGuard {
        let start = Instant::now();
        let permit = match Arc::clone(&self.inner.semaphore).acquire_owned().await {
            Ok(permit) => permit,
            // The semaphore is never closed; if it were, no slot could ever
            // be granted again, which is the same as waiting forever.
            Err(_) => std::future::pending().await,
        };
        self.on_acquired(start.elapsed());
        SlotGuard::new(permit, self.clone())
    }

    /// Takes a free slot without waiting.
    ///
    /// Fails with [`LimiterError::Full`] when every slot is held.
    pub fn try_acquire_slot(&self) -> Result<SlotGuard, LimiterError> {
        match Arc::clone(&self.inner.semaphore).try_acquire_owned() {
            Ok(permit) => {
                self.on_acquired(Duration::ZERO);
                Ok(SlotGuard::new(permit, self.clone()))
            }
            Err(TryAcquireError::NoPermits) | Err(TryAcquireError::Closed) => {
                self.on_rejected();
                Err(LimiterError::Full {
                    capacity: self.capacity(),
                })
            }
        }
    }

    /// Waits at most `max_wait` for a free slot.
    ///
    /// Fails with [`LimiterError::Timeout`] if none frees up in time. A
    /// timed-out wait leaves the pool exactly as it found it.
    pub async fn acquire_slot_timeout(
        &self,
        max_wait: Duration,
    ) -> Result<SlotGuard, LimiterError> {
        let start = Instant::now();
        match tokio::time::timeout(max_wait, self.acquire_slot()).await {
            Ok(slot) => Ok(slot),
            Err(_) => {
                self.on_rejected();
                Err(LimiterError::Timeout {
                    waited: start.elapsed(),
                })
            }
        }
    }

    /// Registers one unit of outstanding work without spawning anything.
    pub(crate) fn track(&self) -> CompletionGuard {
        self.inner.outstanding.add()
    }

    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        // Detached: completion is reported through the wait group.
        match &self.inner.config.runtime {
            Some(handle) => drop(handle.spawn(future)),
            None => drop(tokio::spawn(future)),
        }
    }

    fn emit(&self, make: impl FnOnce() -> TaskEvent) {
        self.inner.config.event_listeners.emit_with(make);
    }

    fn on_submitted(&self) {
        let outstanding = self.outstanding();

        #[cfg(feature = "tracing")]
        tracing::trace!(limiter = %self.name(), outstanding, "task submitted");

        #[cfg(feature = "metrics")]
        counter!("limiter_tasks_submitted_total", "limiter" => self.name().to_string())
            .increment(1);

        self.emit(|| TaskEvent::TaskSubmitted {
            limiter_name: self.name().to_string(),
            timestamp: Instant::now(),
            outstanding,
        });
    }

    fn on_acquired(&self, waited: Duration) {
        let slots_in_use = self.slots_in_use();

        #[cfg(feature = "tracing")]
        tracing::trace!(limiter = %self.name(), slots_in_use, ?waited, "slot acquired");

        #[cfg(feature = "metrics")]
        histogram!("limiter_wait_duration_seconds", "limiter" => self.name().to_string())
            .record(waited.as_secs_f64());
        self.record_slots_in_use();

        self.emit(|| TaskEvent::SlotAcquired {
            limiter_name: self.name().to_string(),
            timestamp: Instant::now(),
            slots_in_use,
            waited,
        });
    }

    fn on_rejected(&self) {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            limiter = %self.name(),
            capacity = self.capacity(),
            "slot acquisition rejected"
        );

        #[cfg(feature = "metrics")]
        counter!("limiter_slots_rejected_total", "limiter" => self.name().to_string())
            .increment(1);

        self.emit(|| TaskEvent::SlotRejected {
            limiter_name: self.name().to_string(),
            timestamp: Instant::now(),
            capacity: self.capacity(),
        });
    }

    fn on_task_done(&self, duration: Duration, panicked: bool) {
        #[cfg(feature = "metrics")]
        histogram!("limiter_task_duration_seconds", "limiter" => self.name().to_string())
            .record(duration.as_secs_f64());

        if panicked {
            #[cfg(feature = "tracing")]
            tracing::warn!(limiter = %self.name(), ?duration, "submitted task panicked");

            #[cfg(feature = "metrics")]
            counter!("limiter_tasks_panicked_total", "limiter" => self.name().to_string())
                .increment(1);

            self.emit(|| TaskEvent::TaskPanicked {
                limiter_name: self.name().to_string(),
                timestamp: Instant::now(),
                duration,
            });
        } else {
            #[cfg(feature = "tracing")]
            tracing::trace!(limiter = %self.name(), ?duration, "submitted task finished");

            #[cfg(feature = "metrics")]
            counter!("limiter_tasks_finished_total", "limiter" => self.name().to_string())
                .increment(1);

            self.emit(|| TaskEvent::TaskFinished {
                limiter_name: self.name().to_string(),
                timestamp: Instant::now(),
                duration,
            });
        }
    }

    fn record_slots_in_use(&self) {
        #[cfg(feature = "metrics")]
        {
            let _serialized = self
                .inner
                .slots_gauge
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            gauge!("limiter_slots_in_use", "limiter" => self.name().to_string())
                .set(self.slots_in_use() as f64);
        }
    }
}

impl fmt::Debug for Limiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Limiter")
            .field("name", &self.name())
            .field("capacity", &self.capacity())
            .field("available_slots", &self.available_slots())
            .field("outstanding", &self.outstanding())
            .finish()
    }
}

/// A held slot. Dropping it frees the slot.
#[must_use = "dropping the guard immediately frees the slot"]
pub struct SlotGuard {
    // `None` once forgotten.
    permit: Option<OwnedSemaphorePermit>,
    limiter: Limiter,
}

impl SlotGuard {
    fn new(permit: OwnedSemaphorePermit, limiter: Limiter) -> Self {
        Self {
            permit: Some(permit),
            limiter,
        }
    }

    /// Keeps the slot held after the guard is gone.
    ///
    /// The slot must later be given back with [`Limiter::release`].
    pub fn forget(mut self) {
        if let Some(permit) = self.permit.take() {
            permit.forget();
        }
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        if let Some(permit) = self.permit.take() {
            drop(permit);
            self.limiter.record_slots_in_use();
        }
    }
}

impl fmt::Debug for SlotGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotGuard")
            .field("limiter", &self.limiter.name())
            .field("held", &self.permit.is_some())
            .finish()
    }
}
