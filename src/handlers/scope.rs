//! Scope availability.

use crate::engine::Engine;
use crate::error::{PlatformError, QueueResult};
use crate::reconcile::{Replay, resolve};
use crate::state::EntityState;
use crate::telemetry::spans;
use chrono::Utc;
use futures_util::future::join_all;
use queuewarden_proto::{ChannelInfo, ScopeId};
use tracing::{Instrument, debug, info, warn};

impl Engine {
    /// A scope became available: rebuild state from channel history, then
    /// bring every known member's annotations up to date.
    pub async fn on_scope_available(&self, scope: ScopeId) -> QueueResult<()> {
        let span = spans::scope_event(scope);

        async move {
            info!("scope available");
            let Some(channels) = resolve(self.platform.channels(scope).await)? else {
                return Ok(());
            };

            if self.startup.replay_history {
                for channel in self.classifier.queue_channels(&channels) {
                    self.replay_channel(scope, channel).await?;
                }
            }

            // Snapshot first; the table lock must not be held while members
            // are locked below. Members are independent, so they are
            // re-annotated concurrently.
            let members = self.table.members(scope).await;
            let results = join_all(members.iter().map(|entity| self.refresh_member(entity))).await;
            for (entity, result) in members.iter().zip(results) {
                if let Err(e) = result {
                    warn!(member = %entity.member(), error = %e, "failed to re-annotate member");
                }
            }
            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn refresh_member(&self, entity: &EntityState) -> QueueResult<()> {
        let scope = entity.scope();
        let Some(member) = resolve(self.platform.member(scope, entity.member()).await)? else {
            return Ok(());
        };
        let presence = self.presence_of(scope, &member).await?;
        let mut tracked = entity.lock().await;
        self.reconciler
            .reannotate_member(&mut tracked, scope, member.id, presence, false)
            .await
    }

    /// Replay one queue channel's history, newest first.
    ///
    /// Items older than the reclamation threshold still count, but only up to
    /// the configured limit; past it the walk stops.
    async fn replay_channel(&self, scope: ScopeId, channel: &ChannelInfo) -> QueueResult<()> {
        let history = match self.platform.history(scope, channel.id).await {
            Ok(history) => history,
            Err(PlatformError::Forbidden(_)) => {
                debug!(channel = %channel.id, "history forbidden, skipping");
                return Ok(());
            }
            Err(e) if e.is_stale() => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let clean_after = chrono::Duration::from_std(self.timing.clean_after)
            .unwrap_or(chrono::Duration::MAX);
        let prehistoric = Utc::now()
            .checked_sub_signed(clean_after)
            .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);
        let mut prehistoric_seen = 0;
        let mut replayed = 0;

        for item in &history {
            if item.created_at <= prehistoric {
                prehistoric_seen += 1;
                if prehistoric_seen > self.startup.prehistoric_limit {
                    break;
                }
            }
            match self.on_item_event(scope, item, Replay::Historical).await {
                Ok(_) => replayed += 1,
                Err(e) if e.is_stale() => {}
                Err(e) => {
                    warn!(channel = %channel.id, item = %item.id, error = %e, "failed to replay item");
                }
            }
        }
        debug!(channel = %channel.id, replayed, "channel replayed");
        Ok(())
    }

    /// A scope became unavailable: forget it entirely.
    pub async fn on_scope_unavailable(&self, scope: ScopeId) {
        info!(scope = %scope, "scope unavailable");
        self.table.clear_scope(scope).await;
        self.activity.clear(scope);
    }
}
