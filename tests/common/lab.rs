//! A small lab scope: two queue channels, a queue category, a waiting room,
//! a classroom, three students and a teacher.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use queuewarden::config::Config;
use queuewarden::platform::MemoryPlatform;
use queuewarden::replay;
use queuewarden::{Engine, NextOutcome, QueueResult};
use queuewarden_proto::{
    Annotation, AnnotationSet, ChannelId, ChannelInfo, ChannelKind, Item, ItemId, MemberId,
    MemberInfo, ScopeId, ScopeSetup, UpstreamEvent,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub const SCOPE: ScopeId = ScopeId(1);

pub const QUEUE_A: ChannelId = ChannelId(100);
pub const QUEUE_B: ChannelId = ChannelId(101);
pub const GENERAL: ChannelId = ChannelId(102);
/// A queue channel by virtue of its category only.
pub const LAB_3: ChannelId = ChannelId(103);
pub const WAITING_ROOM: ChannelId = ChannelId(500);
pub const CLASSROOM: ChannelId = ChannelId(600);

pub const BOT: MemberId = MemberId(1);
pub const ALICE: MemberId = MemberId(10);
pub const BOB: MemberId = MemberId(11);
pub const CAROL: MemberId = MemberId(12);
pub const TEACHER: MemberId = MemberId(20);

fn channel(id: ChannelId, name: &str, kind: ChannelKind, category: Option<&str>) -> ChannelInfo {
    ChannelInfo {
        id,
        name: name.into(),
        kind,
        category: category.map(Into::into),
    }
}

fn member(id: MemberId, name: &str, roles: &[&str]) -> MemberInfo {
    MemberInfo {
        id,
        name: name.into(),
        roles: roles.iter().map(|r| r.to_string()).collect(),
        voice: None,
    }
}

pub fn setup() -> ScopeSetup {
    ScopeSetup {
        scope: SCOPE,
        name: "Programming lab".into(),
        channels: vec![
            channel(QUEUE_A, "очередь-питон", ChannelKind::Text, None),
            channel(QUEUE_B, "Очередь-си", ChannelKind::Text, None),
            channel(GENERAL, "general", ChannelKind::Text, None),
            channel(LAB_3, "lab-3", ChannelKind::Text, Some("Очередь: лабы")),
            channel(WAITING_ROOM, "очередь-голос", ChannelKind::Voice, None),
            channel(CLASSROOM, "аудитория", ChannelKind::Voice, None),
        ],
        members: vec![
            member(ALICE, "alice", &["студент"]),
            member(BOB, "bob", &[]),
            member(CAROL, "carol", &[]),
            member(TEACHER, "teacher", &["Преподаватель"]),
        ],
    }
}

/// Configuration with short timings: 60s activity window, 600s reclamation,
/// one second of slack.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.timing.active_window_secs = 60;
    config.timing.clean_after_secs = 600;
    config.timing.epsilon_ms = 1000;
    config
}

pub struct Lab {
    pub platform: Arc<MemoryPlatform>,
    pub engine: Arc<Engine>,
    next_id: AtomicU64,
}

impl Lab {
    /// Build the lab. Must be called inside a Tokio runtime.
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let platform = Arc::new(MemoryPlatform::new(BOT));
        platform.add_scope(setup());
        let engine = Engine::new(platform.clone(), &config);
        Self {
            platform,
            engine,
            next_id: AtomicU64::new(1000),
        }
    }

    pub async fn send(&self, event: UpstreamEvent) -> QueueResult<()> {
        replay::apply(&self.engine, &self.platform, event).await
    }

    fn new_item(&self, channel: ChannelId, author: MemberId, created_at: DateTime<Utc>) -> Item {
        Item {
            id: ItemId(self.next_id.fetch_add(1, Ordering::Relaxed)),
            channel,
            author,
            created_at,
            content: "lab 1, please".into(),
            reactions: vec![],
        }
    }

    /// Post a live item and let the engine see it.
    pub async fn post(&self, channel: ChannelId, author: MemberId) -> ItemId {
        let item = self.new_item(channel, author, Utc::now());
        let id = item.id;
        self.send(UpstreamEvent::Item { scope: SCOPE, item })
            .await
            .unwrap();
        id
    }

    /// Seed an item upstream without notifying the engine (history).
    pub fn seed(&self, channel: ChannelId, author: MemberId, created_at: DateTime<Utc>) -> ItemId {
        let item = self.new_item(channel, author, created_at);
        let id = item.id;
        self.platform.post_item(SCOPE, item).unwrap();
        id
    }

    pub async fn react(
        &self,
        channel: ChannelId,
        item: ItemId,
        member: MemberId,
        annotation: Annotation,
        added: bool,
    ) {
        self.send(UpstreamEvent::Reaction {
            scope: SCOPE,
            channel,
            item,
            member,
            emoji: annotation.as_str().into(),
            added,
        })
        .await
        .unwrap();
    }

    pub async fn move_to(&self, member: MemberId, voice: Option<ChannelId>) {
        self.send(UpstreamEvent::Presence {
            scope: SCOPE,
            member,
            voice,
        })
        .await
        .unwrap();
    }

    pub async fn next(&self, channel: ChannelId, teacher: MemberId) -> NextOutcome {
        self.engine
            .advance_queue(SCOPE, channel, teacher)
            .await
            .unwrap()
    }

    pub fn annotations(&self, channel: ChannelId, item: ItemId) -> AnnotationSet {
        self.platform
            .item(SCOPE, channel, item)
            .map(|i| i.annotations())
            .unwrap_or_default()
    }

    /// Everything `member` has tracked, or `None` when no entity exists.
    pub async fn tracked(&self, member: MemberId) -> Option<Vec<(ChannelId, ItemId)>> {
        let entity = self.engine.table().get(SCOPE, member).await?;
        let tracked = entity.lock().await;
        Some(tracked.items())
    }

    pub async fn is_finished(&self, member: MemberId, item: ItemId) -> bool {
        match self.engine.table().get(SCOPE, member).await {
            Some(entity) => entity.lock().await.is_finished(item),
            None => false,
        }
    }

    pub async fn voice_of(&self, member: MemberId) -> Option<ChannelId> {
        use queuewarden::platform::Platform;
        self.platform.member(SCOPE, member).await.unwrap().voice
    }
}

pub fn only(annotation: Annotation) -> AnnotationSet {
    AnnotationSet::only(annotation)
}
