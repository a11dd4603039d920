//! Play time accounting
//!
//! Accumulates the time a session spends Running. Registered as a lifecycle
//! observer so it never needs the session lock.

use crate::hooks::{HookId, LifecycleEvent, LifecycleHooks};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Span {
    since: Option<Instant>,
    total: Duration,
}

/// Running-time accumulator for one session's content
#[derive(Debug, Default)]
pub struct PlayTimeTracker {
    span: Mutex<Span>,
}

impl PlayTimeTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Observe every transition of the session owning `hooks`
    pub fn attach(self: &Arc<Self>, hooks: &LifecycleHooks) -> HookId {
        let tracker = Arc::clone(self);
        hooks.add_observer(move |event| tracker.observe(event))
    }

    pub fn observe(&self, event: LifecycleEvent) {
        self.observe_at(event, Instant::now());
    }

    pub fn observe_at(&self, event: LifecycleEvent, now: Instant) {
        let mut span = self.span.lock();
        match event {
            LifecycleEvent::Started | LifecycleEvent::Resumed => {
                if span.since.is_none() {
                    span.since = Some(now);
                }
            }
            LifecycleEvent::Paused | LifecycleEvent::Stopped => {
                if let Some(since) = span.since.take() {
                    span.total += now.saturating_duration_since(since);
                    tracing::debug!("Play time now {:?}", span.total);
                }
            }
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.span.lock().since.is_some()
    }

    /// Accumulated play time, including the span in progress
    pub fn total(&self) -> Duration {
        self.total_at(Instant::now())
    }

    pub fn total_at(&self, now: Instant) -> Duration {
        let span = self.span.lock();
        let current = span
            .since
            .map(|since| now.saturating_duration_since(since))
            .unwrap_or_default();
        span.total + current
    }
}
