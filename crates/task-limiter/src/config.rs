//! Configuration for a limiter.

use crate::events::TaskEvent;
use crate::limiter::Limiter;
use std::time::Duration;
use task_limiter_core::events::{EventListeners, FnListener};
use tokio::runtime::Handle;

/// Configuration for a [`Limiter`].
#[derive(Clone, Debug)]
pub struct LimiterConfig {
    /// Maximum number of tasks holding a slot at once.
    pub(crate) capacity: usize,
    /// Maximum time a layered service call waits for a slot.
    pub(crate) max_wait_duration: Option<Duration>,
    /// Name of this limiter instance.
    pub(crate) name: String,
    /// Runtime submitted tasks are spawned on. `None` means the ambient one.
    pub(crate) runtime: Option<Handle>,
    /// Event listeners.
    pub(crate) event_listeners: EventListeners<TaskEvent>,
}

impl LimiterConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> LimiterConfigBuilder {
        LimiterConfigBuilder::new()
    }
}

/// Builder for limiter configuration.
pub struct LimiterConfigBuilder {
    capacity: usize,
    max_wait_duration: Option<Duration>,
    name: String,
    runtime: Option<Handle>,
    event_listeners: EventListeners<TaskEvent>,
}

impl LimiterConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            capacity: 25,
            max_wait_duration: None,
            name: "limiter".to_string(),
            runtime: None,
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the number of slots.
    ///
    /// A capacity of zero is accepted: such a limiter never hands out a slot,
    /// so every acquisition and every submitted task waits forever.
    ///
    /// Default: 25
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets how long a call through [`LimiterLayer`](crate::LimiterLayer)
    /// may wait for a slot before failing with a timeout.
    ///
    /// If `None`, calls wait indefinitely. Submitted tasks always wait
    /// indefinitely regardless of this setting.
    /// Default: None
    pub fn max_wait_duration(mut self, duration: Option<Duration>) -> Self {
        self.max_wait_duration = duration;
        self
    }

    /// Sets the name of this limiter instance.
    ///
    /// Default: "limiter"
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Spawns submitted tasks on the given runtime instead of the one that is
    /// current at submission time.
    ///
    /// Without this, `submit` must be called from inside a Tokio runtime.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Registers a callback when a task is submitted.
    ///
    /// # Callback Signature
    /// `Fn(usize)` - Called with the number of outstanding submissions,
    /// including the one just registered.
    pub fn on_task_submitted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let TaskEvent::TaskSubmitted { outstanding, .. } = event {
                f(*outstanding);
            }
        }));
        self
    }

    /// Registers a callback when a slot is handed out.
    ///
    /// This fires for every acquisition: slots taken by submitted tasks,
    /// by layered service calls, and by direct `acquire` calls.
    ///
    /// # Callback Signature
    /// `Fn(usize, Duration)` - Called with the number of slots in use after
    /// the acquisition and the time spent waiting for it.
    ///
    /// # Example
    /// ```rust,no_run
    /// use task_limiter::LimiterConfig;
    ///
    /// let limiter = LimiterConfig::builder()
    ///     .capacity(4)
    ///     .on_slot_acquired(|in_use, waited| {
    ///         println!("{} slots in use (waited {:?})", in_use, waited);
    ///     })
    ///     .build();
    /// ```
    pub fn on_slot_acquired<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let TaskEvent::SlotAcquired {
                slots_in_use,
                waited,
                ..
            } = event
            {
                f(*slots_in_use, *waited);
            }
        }));
        self
    }

    /// Registers a callback when a bounded acquisition gives up.
    ///
    /// # Callback Signature
    /// `Fn(usize)` - Called with the limiter's capacity.
    pub fn on_slot_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let TaskEvent::SlotRejected { capacity, .. } = event {
                f(*capacity);
            }
        }));
        self
    }

    /// Registers a callback when a submitted task completes normally.
    ///
    /// # Callback Signature
    /// `Fn(Duration)` - Called with the time the task held its slot.
    pub fn on_task_finished<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let TaskEvent::TaskFinished { duration, .. } = event {
                f(*duration);
            }
        }));
        self
    }

    /// Registers a callback when a submitted task panics.
    ///
    /// The task's slot has already been released and its submission counted
    /// as done by the time a `join` observes it; the callback only reports.
    ///
    /// # Callback Signature
    /// `Fn(Duration)` - Called with the time the task ran before panicking.
    ///
    /// # Example
    /// ```rust,no_run
    /// use task_limiter::LimiterConfig;
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    /// use std::sync::Arc;
    ///
    /// let panics = Arc::new(AtomicUsize::new(0));
    /// let counter = Arc::clone(&panics);
    ///
    /// let limiter = LimiterConfig::builder()
    ///     .on_task_panicked(move |_| {
    ///         counter.fetch_add(1, Ordering::SeqCst);
    ///     })
    ///     .build();
    /// ```
    pub fn on_task_panicked<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let TaskEvent::TaskPanicked { duration, .. } = event {
                f(*duration);
            }
        }));
        self
    }

    /// Registers a callback when a `join` returns.
    ///
    /// # Callback Signature
    /// `Fn(Duration)` - Called with how long the join waited.
    pub fn on_join_completed<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let TaskEvent::JoinCompleted { waited, .. } = event {
                f(*waited);
            }
        }));
        self
    }

    /// Builds the configuration and returns a [`Limiter`].
    pub fn build(self) -> Limiter {
        let config = LimiterConfig {
            capacity: self.capacity,
            max_wait_duration: self.max_wait_duration,
            name: self.name,
            runtime: self.runtime,
            event_listeners: self.event_listeners,
        };
        Limiter::from_config(config)
    }
}

impl Default for LimiterConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
