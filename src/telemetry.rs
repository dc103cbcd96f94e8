//! Telemetry utilities for event timing and span correlation.

use std::time::Instant;

/// Guard for timing event dispatch and recording metrics.
///
/// Records latency when dropped.
pub struct EventTimer {
    event: &'static str,
    start: Instant,
}

impl EventTimer {
    /// Start timing an event.
    pub fn new(event: &'static str) -> Self {
        Self {
            event,
            start: Instant::now(),
        }
    }
}

impl Drop for EventTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_event(self.event, duration);
    }
}

/// Standardized span constructors.
pub mod spans {
    use queuewarden_proto::{ChannelId, ItemId, MemberId, ScopeId};
    use tracing::{Span, info_span};

    /// Span for an item or reaction change.
    pub fn item_event(scope: ScopeId, channel: ChannelId, item: ItemId) -> Span {
        info_span!("item_event", scope = %scope, channel = %channel, item = %item)
    }

    /// Span for a voice presence change.
    pub fn presence_event(scope: ScopeId, member: MemberId) -> Span {
        info_span!("presence_event", scope = %scope, member = %member)
    }

    /// Span for scope availability changes and history replay.
    pub fn scope_event(scope: ScopeId) -> Span {
        info_span!("scope_event", scope = %scope)
    }

    /// Span for a reclamation pass.
    pub fn reclaim(scope: ScopeId) -> Span {
        info_span!("reclaim", scope = %scope)
    }

    /// Span for a teacher advancing a queue.
    pub fn next(scope: ScopeId, channel: ChannelId, teacher: MemberId) -> Span {
        info_span!("next", scope = %scope, channel = %channel, teacher = %teacher)
    }
}
