//! Member-wide re-annotation.

use super::{Reconciler, resolve};
use crate::classify::Presence;
use crate::error::QueueResult;
use crate::platform::{AnnotationOutcome, apply_annotation};
use crate::state::Tracked;
use queuewarden_proto::{Annotation, AnnotationSet, MemberId, ScopeId};
use tracing::debug;

/// The single annotation an item should carry.
///
/// Being served elsewhere wins over everything; otherwise a finished item
/// shows as finished, and a waiting member who left voice shows as astray.
pub fn desired_annotation(presence: Presence, finished: bool) -> Option<Annotation> {
    match presence {
        Presence::Elsewhere => Some(Annotation::Active),
        _ if finished => Some(Annotation::Finished),
        Presence::OffScope => Some(Annotation::Astray),
        Presence::Designated => None,
    }
}

impl Reconciler {
    /// Re-annotate every item `member` has tracked in `scope`.
    ///
    /// With `allow_finish`, a member who turns up elsewhere while nothing is
    /// finished yet is deemed done in the first queue channel (platform
    /// order) where they have an item. Items whose channel stopped being a
    /// queue, or that no longer resolve, are dropped after the pass.
    pub async fn reannotate_member(
        &self,
        tracked: &mut Tracked,
        scope: ScopeId,
        member: MemberId,
        presence: Presence,
        allow_finish: bool,
    ) -> QueueResult<()> {
        let Some(channels) = resolve(self.platform.channels(scope).await)? else {
            debug!(scope = %scope, member = %member, "scope vanished before re-annotation");
            return Ok(());
        };

        if presence == Presence::Elsewhere {
            if allow_finish && !tracked.has_finished() {
                let first = self
                    .classifier
                    .queue_channels(&channels)
                    .find_map(|c| tracked.tracked_in(c.id));
                if let Some(item) = first {
                    debug!(scope = %scope, member = %member, item = %item, "auto-finishing first queue item");
                    tracked.set_finished(item, true);
                }
            }
            self.activity.note(scope);
        }

        let mut garbage = Vec::new();
        for (channel, item_id) in tracked.items() {
            let still_queue = channels
                .iter()
                .any(|c| c.id == channel && self.classifier.is_queue_text(c));
            if !still_queue {
                garbage.push((channel, item_id));
                continue;
            }

            let Some(item) = resolve(self.platform.fetch_item(scope, channel, item_id).await)?
            else {
                garbage.push((channel, item_id));
                continue;
            };

            let desired = desired_annotation(presence, tracked.is_finished(item_id));
            let outcome = apply_annotation(
                self.platform.as_ref(),
                scope,
                &item,
                AnnotationSet::from(desired),
            )
            .await?;
            if outcome == AnnotationOutcome::Vanished {
                garbage.push((channel, item_id));
            }
        }

        for (channel, item) in garbage {
            debug!(scope = %scope, member = %member, channel = %channel, item = %item, "dropping stale item");
            tracked.untrack_item(channel, item);
        }
        tracked.touch();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elsewhere_always_active() {
        assert_eq!(desired_annotation(Presence::Elsewhere, true), Some(Annotation::Active));
        assert_eq!(desired_annotation(Presence::Elsewhere, false), Some(Annotation::Active));
    }

    #[test]
    fn finished_beats_astray() {
        assert_eq!(desired_annotation(Presence::OffScope, true), Some(Annotation::Finished));
        assert_eq!(desired_annotation(Presence::Designated, true), Some(Annotation::Finished));
    }

    #[test]
    fn waiting_states() {
        assert_eq!(desired_annotation(Presence::OffScope, false), Some(Annotation::Astray));
        assert_eq!(desired_annotation(Presence::Designated, false), None);
    }
}
