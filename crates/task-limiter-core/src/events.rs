//! Event system for concurrency limiters.
//!
//! Every limiter reports what happens to its slots and submissions through
//! [`EventListeners`]. Listeners are plain callbacks; they run inline on the
//! task that produced the event, so keep them short.
//!
//! A limiter emits from the middle of its own accounting: a slot event fires
//! right after the slot changes hands, and a completion event fires before
//! the submission stops counting toward a join. So by the time a join
//! returns, every listener call for the tasks it waited on has finished.
//! Listeners may call back into the limiter's read-only accessors. They
//! should not wait on the limiter, because the emitting task may be holding
//! the slot they would wait for.
//!
//! Most events carry the limiter's name as an owned string. Use
//! [`EventListeners::emit_with`] so that nothing is built when nobody is
//! listening.
//!
//! # Examples
//!
//! ```
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use std::time::Instant;
//! use task_limiter_core::events::{EventListeners, FnListener, LimiterEvent};
//!
//! #[derive(Debug)]
//! struct SlotTaken {
//!     limiter: String,
//!     at: Instant,
//! }
//!
//! impl LimiterEvent for SlotTaken {
//!     fn event_type(&self) -> &'static str {
//!         "slot_taken"
//!     }
//!     fn timestamp(&self) -> Instant {
//!         self.at
//!     }
//!     fn limiter_name(&self) -> &str {
//!         &self.limiter
//!     }
//! }
//!
//! let taken = Arc::new(AtomicUsize::new(0));
//! let mut listeners = EventListeners::new();
//! let t = Arc::clone(&taken);
//! listeners.add(FnListener::new(move |_: &SlotTaken| {
//!     t.fetch_add(1, Ordering::SeqCst);
//! }));
//!
//! listeners.emit_with(|| SlotTaken {
//!     limiter: "uploads".to_string(),
//!     at: Instant::now(),
//! });
//! assert_eq!(taken.load(Ordering::SeqCst), 1);
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Trait for events emitted by a limiter.
pub trait LimiterEvent: Send + Sync + fmt::Debug {
    /// Returns the type of event (e.g., "task_submitted", "slot_acquired").
    fn event_type(&self) -> &'static str;

    /// Returns when this event occurred.
    fn timestamp(&self) -> Instant;

    /// Returns the name of the limiter instance that emitted this event.
    fn limiter_name(&self) -> &str;
}

/// Trait for listening to limiter events.
pub trait EventListener<E: LimiterEvent>: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: &E);
}

/// Type alias for boxed event listeners.
pub type BoxedEventListener<E> = Arc<dyn EventListener<E>>;

/// A collection of event listeners.
#[derive(Clone)]
pub struct EventListeners<E: LimiterEvent> {
    listeners: Vec<BoxedEventListener<E>>,
}

impl<E: LimiterEvent> EventListeners<E> {
    /// Creates a new empty event listener collection.
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Adds a listener to the collection.
    pub fn add<L>(&mut self, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Emits an event to all registered listeners.
    ///
    /// A panicking listener is caught and the remaining listeners still run.
    /// Emission happens on the limiter's own bookkeeping paths, so a listener
    /// must never be able to strand a slot or a pending join.
    pub fn emit(&self, event: &E) {
        for listener in &self.listeners {
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener.on_event(event);
            }));
        }
    }

    /// Builds an event with `make` and emits it, unless there are no
    /// listeners, in which case `make` is never called.
    pub fn emit_with<F>(&self, make: F)
    where
        F: FnOnce() -> E,
    {
        if !self.listeners.is_empty() {
            self.emit(&make());
        }
    }

    /// Returns true if there are no listeners.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Returns the number of listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl<E: LimiterEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: LimiterEvent> fmt::Debug for EventListeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListeners")
            .field("len", &self.listeners.len())
            .finish()
    }
}

/// A simple function-based event listener.
pub struct FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    f: F,
    _phantom: std::marker::PhantomData<fn(&E)>,
}

impl<E, F> FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    /// Creates a new function-based listener.
    pub fn new(f: F) -> Self {
        Self {
            f,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<E, F> EventListener<E> for FnListener<E, F>
where
    E: LimiterEvent,
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        (self.f)(event)
    }
}
