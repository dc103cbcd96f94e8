//! Reconciliation of observed item state into tracked entity state.
//!
//! Two entry points, both of which require the entity lock (they take
//! `&mut Tracked`):
//!
//! - [`Reconciler::reconcile_item`] folds one item notification into the
//!   member's tracked record.
//! - [`Reconciler::reannotate_member`] recomputes which annotation every
//!   tracked item of the member should carry and applies it.
//!
//! Stale upstream references never escape as errors; they are garbage
//! collected from the record instead.

mod member;

pub use member::desired_annotation;

use crate::classify::QueueClassifier;
use crate::error::{PlatformError, QueueResult};
use crate::metrics;
use crate::platform::{Platform, apply_annotation};
use crate::state::{ActivityMonitor, Tracked};
use chrono::Utc;
use queuewarden_proto::{Annotation, AnnotationSet, ChannelId, Item, ItemId, ScopeId};
use std::sync::Arc;
use tracing::{debug, warn};

/// Where a notification comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replay {
    /// Happening now.
    Live,
    /// Backfilled from channel history; activity is dated by the item itself.
    Historical,
}

/// What a reconciliation step did to the tracked record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The record changed.
    Changed,
    /// Nothing to do.
    Unchanged,
    /// A second live item in an occupied channel was marked ignored.
    Rejected,
}

impl ReconcileOutcome {
    pub fn is_changed(self) -> bool {
        self == Self::Changed
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Changed => "changed",
            Self::Unchanged => "unchanged",
            Self::Rejected => "rejected",
        }
    }
}

/// Stateless reconciliation logic bound to its collaborators.
#[derive(Clone)]
pub struct Reconciler {
    platform: Arc<dyn Platform>,
    activity: ActivityMonitor,
    classifier: QueueClassifier,
}

impl Reconciler {
    pub fn new(
        platform: Arc<dyn Platform>,
        activity: ActivityMonitor,
        classifier: QueueClassifier,
    ) -> Self {
        Self {
            platform,
            activity,
            classifier,
        }
    }

    /// Fold an item notification into `tracked`.
    ///
    /// The item's reactions are read as a set over the annotation spectrum.
    /// At most one item is tracked per channel: a new item only displaces the
    /// tracked one when that one is finished or gone upstream, otherwise the
    /// newcomer is marked ignored.
    pub async fn reconcile_item(
        &self,
        tracked: &mut Tracked,
        scope: ScopeId,
        item: &Item,
        replay: Replay,
    ) -> QueueResult<ReconcileOutcome> {
        let observed = item.annotations();
        let channel = item.channel;

        let outcome = if observed.contains(Annotation::Ignored) {
            if tracked.untrack_item(channel, item.id) {
                ReconcileOutcome::Changed
            } else {
                ReconcileOutcome::Unchanged
            }
        } else {
            match tracked.tracked_in(channel) {
                Some(current) if current == item.id => {
                    let finished = observed.contains(Annotation::Finished)
                        && !observed.contains(Annotation::Active);
                    if tracked.set_finished(item.id, finished) {
                        ReconcileOutcome::Changed
                    } else {
                        ReconcileOutcome::Unchanged
                    }
                }
                Some(old) => {
                    if self.evict(tracked, scope, channel, old).await? {
                        tracked.track(channel, item.id, observed.contains(Annotation::Finished));
                        ReconcileOutcome::Changed
                    } else {
                        debug!(scope = %scope, channel = %channel, item = %item.id, standing = %old, "rejecting second item");
                        apply_annotation(
                            self.platform.as_ref(),
                            scope,
                            item,
                            AnnotationSet::only(Annotation::Ignored),
                        )
                        .await?;
                        ReconcileOutcome::Rejected
                    }
                }
                None => {
                    tracked.track(channel, item.id, observed.contains(Annotation::Finished));
                    ReconcileOutcome::Changed
                }
            }
        };

        metrics::record_reconcile(outcome.as_str());
        if outcome.is_changed() {
            tracked.touch();
            self.note_activity(scope, item, replay);
        }
        Ok(outcome)
    }

    /// Try to evict `old` from `channel`.
    ///
    /// Succeeds when `old` no longer resolves upstream, or when it is finished,
    /// in which case it is acknowledged with the ignored annotation.
    async fn evict(
        &self,
        tracked: &mut Tracked,
        scope: ScopeId,
        channel: ChannelId,
        old: ItemId,
    ) -> QueueResult<bool> {
        let Some(old_item) = resolve(self.platform.fetch_item(scope, channel, old).await)? else {
            debug!(scope = %scope, channel = %channel, item = %old, "tracked item vanished");
            tracked.untrack(channel);
            return Ok(true);
        };

        if !tracked.is_finished(old) {
            return Ok(false);
        }
        tracked.untrack(channel);
        // The channel is already handed over; a failed mark only loses the acknowledgement.
        if let Err(e) = apply_annotation(
            self.platform.as_ref(),
            scope,
            &old_item,
            AnnotationSet::only(Annotation::Ignored),
        )
        .await
        {
            warn!(scope = %scope, channel = %channel, item = %old, error = %e, "could not mark evicted item");
        }
        Ok(true)
    }

    fn note_activity(&self, scope: ScopeId, item: &Item, replay: Replay) {
        match replay {
            Replay::Live => self.activity.note(scope),
            Replay::Historical => {
                // Wall-clock time is converted to an age here and nowhere else.
                let age = (Utc::now() - item.created_at).to_std().unwrap_or_default();
                self.activity.note_age(scope, age);
            }
        }
    }
}

/// Collapse "unresolvable" into `None` and keep other failures.
pub(crate) fn resolve<T>(
    result: Result<T, PlatformError>,
) -> Result<Option<T>, PlatformError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_stale() => {
            metrics::record_stale_item();
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
