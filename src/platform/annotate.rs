//! Idempotent annotation writes.
//!
//! The engine states which spectrum reactions an item *should* carry; this
//! module diffs that against what the item carries now and issues only the
//! writes that differ.

use super::Platform;
use crate::error::PlatformError;
use crate::metrics;
use queuewarden_proto::{Annotation, AnnotationSet, ChannelId, Item, ItemId, ScopeId};
use tracing::debug;

/// Result of an annotation write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationOutcome {
    /// The item already carried exactly the desired set.
    Unchanged,
    /// Reactions were added and/or cleared.
    Updated,
    /// The item (or its channel) is gone or forbidden upstream.
    Vanished,
}

/// Reconcile `item`'s spectrum reactions with `desired`.
///
/// Spectrum reactions not in `desired` are cleared; desired ones are added
/// unless the engine already placed them. Reactions outside the spectrum are
/// left alone. Stale references are reported as [`AnnotationOutcome::Vanished`]
/// instead of an error.
pub async fn apply_annotation(
    platform: &dyn Platform,
    scope: ScopeId,
    item: &Item,
    desired: AnnotationSet,
) -> Result<AnnotationOutcome, PlatformError> {
    let me = platform.self_id();
    let mut to_add = desired;
    let mut to_clear = AnnotationSet::empty();

    for reaction in &item.reactions {
        let Some(annotation) = Annotation::from_emoji(&reaction.emoji) else {
            continue;
        };
        if desired.contains(annotation) {
            if reaction.placed_by(me) {
                to_add.remove(annotation);
            }
        } else {
            to_clear.insert(annotation);
        }
    }

    if to_add.is_empty() && to_clear.is_empty() {
        return Ok(AnnotationOutcome::Unchanged);
    }

    let result = write_diff(platform, scope, item, to_add, to_clear).await;
    match result {
        Ok(()) => Ok(AnnotationOutcome::Updated),
        Err(e) if e.is_stale() => {
            debug!(scope = %scope, item = %item.id, error = %e, "item vanished while annotating");
            metrics::record_stale_item();
            Ok(AnnotationOutcome::Vanished)
        }
        Err(e) => Err(e),
    }
}

async fn write_diff(
    platform: &dyn Platform,
    scope: ScopeId,
    item: &Item,
    to_add: AnnotationSet,
    to_clear: AnnotationSet,
) -> Result<(), PlatformError> {
    for annotation in to_add.iter() {
        platform
            .add_reaction(scope, item.channel, item.id, annotation)
            .await?;
        metrics::record_annotation(annotation);
    }
    for annotation in to_clear.iter() {
        platform
            .clear_reaction(scope, item.channel, item.id, annotation)
            .await?;
    }
    Ok(())
}

/// Fetch an item by reference and force it to carry exactly `annotation`.
///
/// Used by defacement, where only the ids survive in state.
pub async fn force_annotation(
    platform: &dyn Platform,
    scope: ScopeId,
    channel: ChannelId,
    item: ItemId,
    annotation: Annotation,
) -> Result<AnnotationOutcome, PlatformError> {
    let item = match platform.fetch_item(scope, channel, item).await {
        Ok(item) => item,
        Err(e) if e.is_stale() => {
            metrics::record_stale_item();
            return Ok(AnnotationOutcome::Vanished);
        }
        Err(e) => return Err(e),
    };
    apply_annotation(platform, scope, &item, AnnotationSet::only(annotation)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryPlatform;
    use chrono::Utc;
    use queuewarden_proto::{ChannelInfo, ChannelKind, MemberId, ScopeSetup};

    const SCOPE: ScopeId = ScopeId(1);
    const CHANNEL: ChannelId = ChannelId(100);
    const BOT: MemberId = MemberId(1);
    const STUDENT: MemberId = MemberId(10);

    fn platform() -> MemoryPlatform {
        let platform = MemoryPlatform::new(BOT);
        platform.add_scope(ScopeSetup {
            scope: SCOPE,
            name: "Lab".into(),
            channels: vec![ChannelInfo {
                id: CHANNEL,
                name: "очередь".into(),
                kind: ChannelKind::Text,
                category: None,
            }],
            members: vec![],
        });
        platform
            .post_item(
                SCOPE,
                Item {
                    id: ItemId(7),
                    channel: CHANNEL,
                    author: STUDENT,
                    created_at: Utc::now(),
                    content: String::new(),
                    reactions: vec![],
                },
            )
            .unwrap();
        platform
    }

    fn fetch(platform: &MemoryPlatform) -> Item {
        platform.item(SCOPE, CHANNEL, ItemId(7)).unwrap()
    }

    #[tokio::test]
    async fn adds_then_stays_idempotent() {
        let platform = platform();
        let desired = AnnotationSet::only(Annotation::Astray);

        let outcome = apply_annotation(&platform, SCOPE, &fetch(&platform), desired)
            .await
            .unwrap();
        assert_eq!(outcome, AnnotationOutcome::Updated);
        assert_eq!(fetch(&platform).annotations(), desired);

        let writes = platform.reaction_writes();
        let outcome = apply_annotation(&platform, SCOPE, &fetch(&platform), desired)
            .await
            .unwrap();
        assert_eq!(outcome, AnnotationOutcome::Unchanged);
        assert_eq!(platform.reaction_writes(), writes);
    }

    #[tokio::test]
    async fn replaces_other_spectrum_reactions_but_keeps_foreign_ones() {
        let platform = platform();
        platform
            .react(SCOPE, CHANNEL, ItemId(7), STUDENT, Annotation::Finished.emoji())
            .unwrap();
        platform
            .react(SCOPE, CHANNEL, ItemId(7), STUDENT, "\u{2705}")
            .unwrap();

        apply_annotation(
            &platform,
            SCOPE,
            &fetch(&platform),
            AnnotationSet::only(Annotation::Active),
        )
        .await
        .unwrap();

        let item = fetch(&platform);
        assert_eq!(item.annotations(), AnnotationSet::only(Annotation::Active));
        assert!(item.reactions.iter().any(|r| r.emoji == "\u{2705}"));
    }

    #[tokio::test]
    async fn desired_reaction_placed_by_someone_else_is_claimed() {
        let platform = platform();
        platform
            .react(SCOPE, CHANNEL, ItemId(7), STUDENT, Annotation::Finished.emoji())
            .unwrap();

        let outcome = apply_annotation(
            &platform,
            SCOPE,
            &fetch(&platform),
            AnnotationSet::only(Annotation::Finished),
        )
        .await
        .unwrap();

        assert_eq!(outcome, AnnotationOutcome::Updated);
        let item = fetch(&platform);
        assert!(item.reaction(Annotation::Finished).unwrap().placed_by(BOT));
    }

    #[tokio::test]
    async fn vanished_item_is_reported_not_raised() {
        let platform = platform();
        let snapshot = fetch(&platform);
        platform.delete_item(SCOPE, CHANNEL, ItemId(7));

        let outcome = apply_annotation(
            &platform,
            SCOPE,
            &snapshot,
            AnnotationSet::only(Annotation::Ignored),
        )
        .await
        .unwrap();
        assert_eq!(outcome, AnnotationOutcome::Vanished);

        let outcome = force_annotation(&platform, SCOPE, CHANNEL, ItemId(7), Annotation::Ignored)
            .await
            .unwrap();
        assert_eq!(outcome, AnnotationOutcome::Vanished);
    }
}
