//! Item and reaction notifications.

use crate::engine::Engine;
use crate::error::QueueResult;
use crate::reconcile::{Replay, resolve};
use crate::telemetry::spans;
use queuewarden_proto::{Annotation, ChannelId, Item, ItemId, MemberId, ScopeId};
use tracing::{Instrument, debug};

impl Engine {
    /// A new item appeared (or is being replayed from history).
    ///
    /// Returns whether the author's tracked record changed. Live changes are
    /// followed by a re-annotation of the author under the same lock.
    pub async fn on_item_event(
        &self,
        scope: ScopeId,
        item: &Item,
        replay: Replay,
    ) -> QueueResult<bool> {
        let span = spans::item_event(scope, item.channel, item.id);

        async move {
            if item.author == self.platform.self_id() {
                return Ok(false);
            }
            let Some(member) = resolve(self.platform.member(scope, item.author).await)? else {
                debug!(author = %item.author, "author is no longer a member");
                return Ok(false);
            };
            if self.classifier.is_teacher(&member) {
                return Ok(false);
            }
            let Some(channel) = resolve(self.platform.channel(scope, item.channel).await)? else {
                return Ok(false);
            };
            if !self.classifier.is_queue_text(&channel) {
                return Ok(false);
            }

            let entity = self.table.get_or_create(scope, member.id).await;
            let mut tracked = entity.lock().await;
            let outcome = self
                .reconciler
                .reconcile_item(&mut tracked, scope, item, replay)
                .await?;
            debug!(member = %member.id, outcome = outcome.as_str(), "item reconciled");

            if outcome.is_changed() && replay == Replay::Live {
                let presence = self.presence_of(scope, &member).await?;
                self.reconciler
                    .reannotate_member(&mut tracked, scope, member.id, presence, false)
                    .await?;
            }
            Ok(outcome.is_changed())
        }
        .instrument(span)
        .await
    }

    /// A reaction was added to or removed from an item.
    ///
    /// The item is re-fetched so reconciliation sees every reaction it now
    /// carries, spectrum or not: a human reacting to an item the engine has
    /// not seen yet is how that item gets adopted. Reactions placed by the
    /// engine itself are not echoed back.
    pub async fn on_reaction_event(
        &self,
        scope: ScopeId,
        channel: ChannelId,
        item: ItemId,
        reactor: MemberId,
        emoji: &str,
        added: bool,
    ) -> QueueResult<bool> {
        if added && reactor == self.platform.self_id() {
            return Ok(false);
        }
        let annotation = Annotation::from_emoji(emoji);
        debug!(scope = %scope, item = %item, emoji, ?annotation, added, "reaction changed");
        self.refresh_item(scope, channel, item).await
    }

    /// Every reaction was stripped from an item at once.
    pub async fn on_reactions_cleared(
        &self,
        scope: ScopeId,
        channel: ChannelId,
        item: ItemId,
    ) -> QueueResult<bool> {
        debug!(scope = %scope, item = %item, "reactions cleared");
        self.refresh_item(scope, channel, item).await
    }

    async fn refresh_item(&self, scope: ScopeId, channel: ChannelId, item: ItemId) -> QueueResult<bool> {
        let Some(item) = resolve(self.platform.fetch_item(scope, channel, item).await)? else {
            return Ok(false);
        };
        self.on_item_event(scope, &item, Replay::Live).await
    }
}
