//! Scope activity monitor.
//!
//! Tracks when each scope last showed a liveness signal and reports
//! transitions between active and inactive. However many scopes are
//! registered, at most one wake timer is outstanding: it is always armed for
//! the earliest deadline (plus a small slack), and each wake sweeps every
//! expired scope and re-arms for the next one.
//!
//! # Architecture
//!
//! - `note` / `clear` are the only mutators; both run under the monitor's own
//!   lock and never await.
//! - A single long-lived loop task waits on a [`Notify`] and performs sweeps.
//! - The wake timer is a plain delayed task that only signals the loop.
//!   Re-arming earlier aborts it and starts a new one; re-arming later is a
//!   no-op because the pending wake will re-arm itself after sweeping.

use crate::config::Timing;
use crate::metrics;
use parking_lot::Mutex;
use queuewarden_proto::ScopeId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, broadcast};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

/// Capacity of the observation channel; slow subscribers see `Lagged`.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// An activity transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityEvent {
    /// A previously unknown scope showed a liveness signal.
    Started(ScopeId),
    /// A scope's activity window lapsed, or it was cleared.
    Ended(ScopeId),
    /// A sweep left no active scope at all.
    Silence,
}

struct PendingWake {
    at: Instant,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct Schedule {
    last_active: HashMap<ScopeId, Instant>,
    pending: Option<PendingWake>,
}

struct Inner {
    timing: Timing,
    schedule: Mutex<Schedule>,
    awaken: Notify,
    events: broadcast::Sender<ActivityEvent>,
}

/// Handle to the activity monitor. Cheap to clone.
#[derive(Clone)]
pub struct ActivityMonitor {
    inner: Arc<Inner>,
}

impl ActivityMonitor {
    /// Create the monitor and spawn its sweep loop.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(timing: Timing) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let inner = Arc::new(Inner {
            timing,
            schedule: Mutex::new(Schedule::default()),
            awaken: Notify::new(),
            events,
        });

        tokio::spawn(run_monitor(Arc::clone(&inner)));

        Self { inner }
    }

    /// Subscribe to activity transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<ActivityEvent> {
        self.inner.events.subscribe()
    }

    /// Record a live liveness signal for `scope`.
    pub fn note(&self, scope: ScopeId) {
        self.note_at(scope, Instant::now());
    }

    /// Record a liveness signal that happened `age` ago.
    ///
    /// Signals older than the activity window are discarded.
    pub fn note_age(&self, scope: ScopeId, age: Duration) {
        if age >= self.inner.timing.active_window {
            debug!(scope = %scope, age_secs = age.as_secs(), "discarding stale activity signal");
            return;
        }
        let now = Instant::now();
        let at = now.checked_sub(age).unwrap_or(now);
        self.note_at(scope, at);
    }

    /// Record a liveness signal at an explicit monotonic time.
    pub fn note_at(&self, scope: ScopeId, at: Instant) {
        let timing = self.inner.timing;
        if Instant::now().saturating_duration_since(at) >= timing.active_window {
            debug!(scope = %scope, "discarding stale activity signal");
            return;
        }

        let mut schedule = self.inner.schedule.lock();
        let fresh = match schedule.last_active.get_mut(&scope) {
            Some(last) => {
                // replays arrive newest first; never move a scope backwards
                if at > *last {
                    *last = at;
                }
                false
            }
            None => {
                schedule.last_active.insert(scope, at);
                true
            }
        };

        if fresh {
            info!(scope = %scope, "scope has become active");
            metrics::set_active_scopes(schedule.last_active.len());
            self.inner.publish(ActivityEvent::Started(scope));
            let wake_at = at + timing.active_window + timing.epsilon;
            self.inner.arm(&mut schedule, wake_at);
        }
    }

    /// Forget a scope unconditionally.
    pub fn clear(&self, scope: ScopeId) {
        let mut schedule = self.inner.schedule.lock();
        if schedule.last_active.remove(&scope).is_some() {
            info!(scope = %scope, "scope has gone inactive");
            metrics::set_active_scopes(schedule.last_active.len());
            self.inner.publish(ActivityEvent::Ended(scope));
        }
    }

    pub fn is_active(&self, scope: ScopeId) -> bool {
        self.inner.schedule.lock().last_active.contains_key(&scope)
    }

    /// Currently active scopes, in no particular order.
    pub fn active_scopes(&self) -> Vec<ScopeId> {
        self.inner
            .schedule
            .lock()
            .last_active
            .keys()
            .copied()
            .collect()
    }

    /// Last liveness signal recorded for `scope`.
    pub fn last_active(&self, scope: ScopeId) -> Option<Instant> {
        self.inner.schedule.lock().last_active.get(&scope).copied()
    }

    /// When the single outstanding wake is due, if one is armed.
    pub fn pending_wake(&self) -> Option<Instant> {
        self.inner.schedule.lock().pending.as_ref().map(|p| p.at)
    }
}

impl Inner {
    fn publish(&self, event: ActivityEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Arm the wake timer for `at` unless an earlier (or equal) one is pending.
    fn arm(self: &Arc<Self>, schedule: &mut Schedule, at: Instant) {
        if let Some(pending) = &schedule.pending {
            if pending.at <= at {
                return;
            }
            pending.task.abort();
        }

        let weak = Arc::downgrade(self);
        let task = tokio::spawn(async move {
            tokio::time::sleep_until(at).await;
            if let Some(inner) = weak.upgrade() {
                inner.awaken.notify_one();
            }
        });
        schedule.pending = Some(PendingWake { at, task });
    }

    fn sweep(self: &Arc<Self>) {
        let now = Instant::now();
        let window = self.timing.active_window;
        let mut schedule = self.schedule.lock();

        // Whatever woke us, the pending timer is now superseded by the
        // deadline computed below.
        if let Some(pending) = schedule.pending.take() {
            pending.task.abort();
        }

        let mut gone_inactive = Vec::new();
        let mut next: Option<Duration> = None;
        schedule.last_active.retain(|scope, at| {
            let deadline = *at + window;
            if deadline <= now {
                gone_inactive.push(*scope);
                false
            } else {
                let remaining = deadline - now;
                next = Some(next.map_or(remaining, |n| n.min(remaining)));
                true
            }
        });

        for scope in gone_inactive {
            info!(scope = %scope, "scope has gone inactive");
            self.publish(ActivityEvent::Ended(scope));
        }
        metrics::set_active_scopes(schedule.last_active.len());

        match next {
            Some(remaining) => {
                let at = now + remaining + self.timing.epsilon;
                self.arm(&mut schedule, at);
            }
            None => {
                info!("all scopes have gone inactive");
                self.publish(ActivityEvent::Silence);
            }
        }
    }
}

async fn run_monitor(inner: Arc<Inner>) {
    loop {
        inner.awaken.notified().await;
        inner.sweep();
    }
}
