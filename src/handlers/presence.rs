//! Voice presence changes.

use crate::classify::Presence;
use crate::engine::Engine;
use crate::error::QueueResult;
use crate::reconcile::resolve;
use crate::telemetry::spans;
use queuewarden_proto::{ChannelId, MemberId, ScopeId};
use tracing::{Instrument, debug};

impl Engine {
    /// A member moved between voice channels (or joined/left voice).
    ///
    /// `after` is the member's voice channel once the move completed.
    pub async fn on_presence_event(
        &self,
        scope: ScopeId,
        member: MemberId,
        before: Option<ChannelId>,
        after: Option<ChannelId>,
    ) -> QueueResult<()> {
        if before == after {
            return Ok(());
        }
        let span = spans::presence_event(scope, member);

        async move {
            let Some(mut info) = resolve(self.platform.member(scope, member).await)? else {
                return Ok(());
            };
            if self.classifier.is_teacher(&info) {
                return Ok(());
            }
            info.voice = after;
            let presence = self.presence_of(scope, &info).await?;
            debug!(?presence, "presence changed");
            self.update_presence(scope, member, presence, true).await
        }
        .instrument(span)
        .await
    }

    /// Re-annotate everything `member` tracks for the given presence.
    ///
    /// Members with nothing tracked only contribute a liveness signal.
    pub async fn update_presence(
        &self,
        scope: ScopeId,
        member: MemberId,
        presence: Presence,
        allow_finish: bool,
    ) -> QueueResult<()> {
        let Some(entity) = self.table.get(scope, member).await else {
            if presence == Presence::Elsewhere {
                self.activity.note(scope);
            }
            return Ok(());
        };
        let mut tracked = entity.lock().await;
        self.reconciler
            .reannotate_member(&mut tracked, scope, member, presence, allow_finish)
            .await
    }
}
