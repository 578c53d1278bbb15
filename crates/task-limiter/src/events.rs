//! Events emitted by a [`Limiter`](crate::Limiter).

use std::time::{Duration, Instant};
use task_limiter_core::events::LimiterEvent;

/// Events emitted over the life of submissions and slots.
#[derive(Debug, Clone)]
pub enum TaskEvent {
    /// A task was registered through `submit` or `submit_blocking`.
    TaskSubmitted {
        limiter_name: String,
        timestamp: Instant,
        /// Outstanding submissions, including this one.
        outstanding: usize,
    },
    /// A slot was handed out.
    SlotAcquired {
        limiter_name: String,
        timestamp: Instant,
        /// Slots held right after this acquisition.
        slots_in_use: usize,
        /// Time spent waiting for the slot.
        waited: Duration,
    },
    /// A bounded acquisition gave up, either immediately or after a timeout.
    SlotRejected {
        limiter_name: String,
        timestamp: Instant,
        capacity: usize,
    },
    /// A submitted task ran to completion.
    TaskFinished {
        limiter_name: String,
        timestamp: Instant,
        /// Time the task spent holding its slot.
        duration: Duration,
    },
    /// A submitted task panicked. Its slot and completion were still released.
    TaskPanicked {
        limiter_name: String,
        timestamp: Instant,
        duration: Duration,
    },
    /// A `join` call observed zero outstanding submissions.
    JoinCompleted {
        limiter_name: String,
        timestamp: Instant,
        waited: Duration,
    },
}

impl LimiterEvent for TaskEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TaskEvent::TaskSubmitted { .. } => "task_submitted",
            TaskEvent::SlotAcquired { .. } => "slot_acquired",
            TaskEvent::SlotRejected { .. } => "slot_rejected",
            TaskEvent::TaskFinished { .. } => "task_finished",
            TaskEvent::TaskPanicked { .. } => "task_panicked",
            TaskEvent::JoinCompleted { .. } => "join_completed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            TaskEvent::TaskSubmitted { timestamp, .. }
            | TaskEvent::SlotAcquired { timestamp, .. }
            | TaskEvent::SlotRejected { timestamp, .. }
            | TaskEvent::TaskFinished { timestamp, .. }
            | TaskEvent::TaskPanicked { timestamp, .. }
            | TaskEvent::JoinCompleted { timestamp, .. } => *timestamp,
        }
    }

    fn limiter_name(&self) -> &str {
        match self {
            TaskEvent::TaskSubmitted { limiter_name, .. }
            | TaskEvent::SlotAcquired { limiter_name, .. }
            | TaskEvent::SlotRejected { limiter_name, .. }
            | TaskEvent::TaskFinished { limiter_name, .. }
            | TaskEvent::TaskPanicked { limiter_name, .. }
            | TaskEvent::JoinCompleted { limiter_name, .. } => limiter_name,
        }
    }
}
