//! Newline-delimited JSON event source.
//!
//! Drives an [`Engine`] from a stream of [`UpstreamEvent`]s, keeping a
//! [`MemoryPlatform`] in step so the engine sees the world the events
//! describe. Every event is isolated: a malformed line or a failing handler
//! is logged and counted, and the stream carries on.

use crate::engine::Engine;
use crate::error::QueueResult;
use crate::metrics;
use crate::platform::MemoryPlatform;
use crate::reconcile::Replay;
use crate::telemetry::EventTimer;
use queuewarden_proto::{Annotation, UpstreamEvent};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, error, info, warn};

/// Counters for one replay run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub applied: usize,
    pub failed: usize,
    pub malformed: usize,
}

/// Read events line by line until EOF.
pub async fn run<R>(engine: &Engine, platform: &MemoryPlatform, reader: R) -> std::io::Result<ReplayStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = ReplayStats::default();
    let mut lines = reader.lines();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let event: UpstreamEvent = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                warn!(line = line_no, error = %e, "malformed event");
                stats.malformed += 1;
                continue;
            }
        };

        let kind = event.kind();
        let _timer = EventTimer::new(kind);
        match apply(engine, platform, event).await {
            Ok(()) => stats.applied += 1,
            Err(e) => {
                error!(line = line_no, event = kind, error = %e, "event failed");
                metrics::record_event_error(e.error_code());
                stats.failed += 1;
            }
        }
    }

    info!(
        applied = stats.applied,
        failed = stats.failed,
        malformed = stats.malformed,
        "event stream drained"
    );
    Ok(stats)
}

/// Apply one event to the platform, then let the engine react to it.
pub async fn apply(
    engine: &Engine,
    platform: &MemoryPlatform,
    event: UpstreamEvent,
) -> QueueResult<()> {
    match event {
        UpstreamEvent::Setup(setup) => {
            debug!(scope = %setup.scope, name = %setup.name, "scope declared");
            platform.add_scope(setup);
        }
        UpstreamEvent::Item { scope, item } => {
            let (channel, id) = (item.channel, item.id);
            platform.post_item(scope, item)?;
            // The stored snapshot may carry reactions kept across an edit.
            if let Some(stored) = platform.item(scope, channel, id) {
                engine.on_item_event(scope, &stored, Replay::Live).await?;
            }
        }
        UpstreamEvent::ItemDeleted {
            scope,
            channel,
            item,
        } => {
            platform.delete_item(scope, channel, item);
        }
        UpstreamEvent::Reaction {
            scope,
            channel,
            item,
            member,
            emoji,
            added,
        } => {
            let emoji = reaction_emoji(emoji)?;
            if added {
                platform.react(scope, channel, item, member, &emoji)?;
            } else {
                platform.unreact(scope, channel, item, member, &emoji)?;
            }
            engine
                .on_reaction_event(scope, channel, item, member, &emoji, added)
                .await?;
        }
        UpstreamEvent::ReactionsCleared {
            scope,
            channel,
            item,
        } => {
            platform.clear_reactions(scope, channel, item)?;
            engine.on_reactions_cleared(scope, channel, item).await?;
        }
        UpstreamEvent::Presence {
            scope,
            member,
            voice,
        } => {
            let before = platform.set_voice(scope, member, voice)?;
            engine.on_presence_event(scope, member, before, voice).await?;
        }
        UpstreamEvent::ScopeAvailable { scope } => {
            engine.on_scope_available(scope).await?;
        }
        UpstreamEvent::ScopeUnavailable { scope } => {
            engine.on_scope_unavailable(scope).await;
        }
        UpstreamEvent::Next {
            scope,
            channel,
            teacher,
        } => {
            let outcome = engine.advance_queue(scope, channel, teacher).await?;
            info!(scope = %scope, channel = %channel, ?outcome, "next");
        }
        UpstreamEvent::Sleep { secs } => {
            if secs.is_finite() && secs > 0.0 {
                tokio::time::sleep(Duration::from_secs_f64(secs)).await;
            }
        }
    }
    Ok(())
}

/// Event streams may name an annotation instead of spelling its emoji.
///
/// Plain words must name a spectrum annotation; anything else is taken as
/// the literal emoji a human placed.
fn reaction_emoji(raw: String) -> QueueResult<String> {
    if raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        let annotation: Annotation = raw.parse()?;
        return Ok(annotation.emoji().to_string());
    }
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use queuewarden_proto::{ChannelId, ItemId, MemberId, ScopeId};
    use std::sync::Arc;

    const EVENTS: &str = r#"
# one student joins the queue
{"type":"setup","scope":1,"name":"Lab","channels":[{"id":100,"name":"очередь-1","kind":"text"},{"id":500,"name":"очередь","kind":"voice"},{"id":600,"name":"аудитория","kind":"voice"}],"members":[{"id":10,"name":"student"},{"id":20,"name":"teacher","roles":["Преподаватель"]}]}
{"type":"item","scope":1,"item":{"id":7,"channel":100,"author":10,"created_at":"2024-03-01T10:00:00Z"}}
{"type":"presence","scope":1,"member":10,"voice":500}
not json
{"type":"reaction","scope":1,"channel":100,"item":7,"member":10,"emoji":"finished","added":true}
{"type":"reaction","scope":1,"channel":100,"item":7,"member":10,"emoji":"👍","added":true}
{"type":"reaction","scope":1,"channel":100,"item":7,"member":10,"emoji":"thumbs_up","added":true}
"#;

    #[tokio::test]
    async fn replays_stream_and_isolates_failures() {
        let platform = Arc::new(MemoryPlatform::new(MemberId(1)));
        let engine = Engine::new(platform.clone(), &Config::default());

        let stats = run(&engine, &platform, EVENTS.as_bytes()).await.unwrap();
        assert_eq!(
            stats,
            ReplayStats {
                applied: 5,
                failed: 1,
                malformed: 1,
            }
        );

        let entity = engine.table().get(ScopeId(1), MemberId(10)).await.unwrap();
        let tracked = entity.lock().await;
        assert_eq!(tracked.tracked_in(ChannelId(100)), Some(ItemId(7)));
        assert!(tracked.is_finished(ItemId(7)));
    }
}
