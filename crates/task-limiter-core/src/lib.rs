//! Core infrastructure for task-limiter.
//!
//! This crate holds the pieces that are independent of the limiter itself:
//! - Event trait implemented by everything a limiter reports
//! - Listener collection with panic isolation
//! - Closure-backed listeners

pub mod events;

pub use events::{EventListener, EventListeners, FnListener, LimiterEvent};
