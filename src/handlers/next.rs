//! A teacher calling the next member of a queue.

use crate::classify::Presence;
use crate::engine::Engine;
use crate::error::QueueResult;
use crate::reconcile::resolve;
use crate::telemetry::spans;
use queuewarden_proto::{ChannelId, ItemId, MemberId, ScopeId};
use tracing::{Instrument, info};

/// Result of [`Engine::advance_queue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextOutcome {
    /// The member was moved into the teacher's voice channel.
    Moved { member: MemberId, item: ItemId },
    /// Nobody is waiting.
    QueueEmpty,
    /// The first waiting member is not in voice; nothing was done.
    MemberAbsent(MemberId),
    /// The caller is not a teacher, or the channel is not a queue.
    NotPermitted,
    TeacherNotInVoice,
    /// Teachers must call from outside the queue's own voice channels.
    TeacherInQueueVoice,
}

impl Engine {
    /// Move the first waiting member of `channel` to `teacher`'s voice channel
    /// and mark their item finished.
    ///
    /// Waiting order is item order: the oldest tracked, unfinished item wins.
    pub async fn advance_queue(
        &self,
        scope: ScopeId,
        channel: ChannelId,
        teacher: MemberId,
    ) -> QueueResult<NextOutcome> {
        let span = spans::next(scope, channel, teacher);

        async move {
            let Some(teacher) = resolve(self.platform.member(scope, teacher).await)? else {
                return Ok(NextOutcome::NotPermitted);
            };
            if !self.classifier.is_teacher(&teacher) {
                return Ok(NextOutcome::NotPermitted);
            }
            let Some(queue) = resolve(self.platform.channel(scope, channel).await)? else {
                return Ok(NextOutcome::NotPermitted);
            };
            if !self.classifier.is_queue_text(&queue) {
                return Ok(NextOutcome::NotPermitted);
            }

            let Some(history) = resolve(self.platform.history(scope, channel).await)? else {
                return Ok(NextOutcome::QueueEmpty);
            };

            let me = self.platform.self_id();
            let mut first = None;
            for item in history.iter().rev() {
                if item.author == me {
                    continue;
                }
                let Some(member) = resolve(self.platform.member(scope, item.author).await)? else {
                    continue;
                };
                if self.classifier.is_teacher(&member) {
                    continue;
                }
                let Some(entity) = self.table.get(scope, member.id).await else {
                    continue;
                };
                {
                    let tracked = entity.lock().await;
                    if tracked.tracked_in(channel) != Some(item.id) || tracked.is_finished(item.id) {
                        continue;
                    }
                }
                if member.voice.is_none() {
                    return Ok(NextOutcome::MemberAbsent(member.id));
                }
                first = Some((member.id, item.id, entity));
                break;
            }
            let Some((member, item, entity)) = first else {
                return Ok(NextOutcome::QueueEmpty);
            };

            let Some(voice) = teacher.voice else {
                return Ok(NextOutcome::TeacherNotInVoice);
            };
            let Some(voice) = resolve(self.platform.channel(scope, voice).await)? else {
                return Ok(NextOutcome::TeacherNotInVoice);
            };
            if self.classifier.is_queue_voice(&voice) {
                return Ok(NextOutcome::TeacherInQueueVoice);
            }

            let mut tracked = entity.lock().await;
            self.platform.move_member(scope, member, voice.id).await?;
            tracked.set_finished(item, true);
            tracked.touch();
            info!(member = %member, item = %item, voice = %voice.id, "member called");
            self.reconciler
                .reannotate_member(&mut tracked, scope, member, Presence::Elsewhere, false)
                .await?;
            Ok(NextOutcome::Moved { member, item })
        }
        .instrument(span)
        .await
    }
}
