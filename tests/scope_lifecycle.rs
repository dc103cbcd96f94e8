//! Integration tests for scope availability: history replay and teardown.

mod common;

use chrono::{Duration, Utc};
use common::*;
use queuewarden_proto::{Annotation, Reaction, UpstreamEvent};

#[tokio::test]
async fn history_is_replayed_when_scope_becomes_available() {
    let lab = Lab::new();
    let now = Utc::now();
    let older = lab.seed(QUEUE_A, ALICE, now - Duration::seconds(30));
    let newer = lab.seed(QUEUE_A, ALICE, now - Duration::seconds(20));
    let bobs = lab.seed(QUEUE_B, BOB, now - Duration::seconds(10));
    lab.seed(QUEUE_A, TEACHER, now - Duration::seconds(1));

    lab.send(UpstreamEvent::ScopeAvailable { scope: SCOPE })
        .await
        .unwrap();

    // Newest first: the newer item wins, the older duplicate is rejected.
    assert_eq!(lab.tracked(ALICE).await, Some(vec![(QUEUE_A, newer)]));
    assert_eq!(lab.annotations(QUEUE_A, older), only(Annotation::Ignored));
    assert_eq!(lab.tracked(BOB).await, Some(vec![(QUEUE_B, bobs)]));
    assert_eq!(lab.tracked(TEACHER).await, None);

    // Members are re-annotated once replay is done; nobody is in voice.
    assert_eq!(lab.annotations(QUEUE_A, newer), only(Annotation::Astray));
    assert_eq!(lab.annotations(QUEUE_B, bobs), only(Annotation::Astray));

    // Recent history counts as activity.
    assert!(lab.engine.activity().is_active(SCOPE));
}

#[tokio::test]
async fn finished_reactions_survive_replay() {
    let lab = Lab::new();
    let item = lab.seed(QUEUE_A, ALICE, Utc::now());
    lab.platform
        .react(SCOPE, QUEUE_A, item, BOT, Annotation::Finished.emoji())
        .unwrap();

    lab.send(UpstreamEvent::ScopeAvailable { scope: SCOPE })
        .await
        .unwrap();

    assert!(lab.is_finished(ALICE, item).await);
    assert_eq!(lab.annotations(QUEUE_A, item), only(Annotation::Finished));
}

#[tokio::test]
async fn replay_stops_after_prehistoric_limit() {
    let mut config = test_config();
    config.startup.prehistoric_limit = 1;
    let lab = Lab::with_config(config);
    let ancient = Utc::now() - Duration::days(2);

    let alice = lab.seed(QUEUE_A, ALICE, ancient);
    let bob = lab.seed(QUEUE_A, BOB, ancient);
    let carol = lab.seed(QUEUE_A, CAROL, ancient);

    lab.send(UpstreamEvent::ScopeAvailable { scope: SCOPE })
        .await
        .unwrap();

    assert_eq!(lab.tracked(CAROL).await, Some(vec![(QUEUE_A, carol)]));
    assert_eq!(lab.tracked(BOB).await, None);
    assert_eq!(lab.tracked(ALICE).await, None);
    assert!(lab.annotations(QUEUE_A, alice).is_empty());
    assert!(lab.annotations(QUEUE_A, bob).is_empty());

    // Ancient items do not make the scope active.
    assert!(!lab.engine.activity().is_active(SCOPE));
}

#[tokio::test]
async fn forbidden_channels_are_skipped() {
    let lab = Lab::new();
    let a = lab.seed(QUEUE_A, ALICE, Utc::now());
    lab.seed(QUEUE_B, BOB, Utc::now());
    lab.platform.forbid(SCOPE, QUEUE_B);

    lab.send(UpstreamEvent::ScopeAvailable { scope: SCOPE })
        .await
        .unwrap();

    assert_eq!(lab.tracked(ALICE).await, Some(vec![(QUEUE_A, a)]));
    assert_eq!(lab.tracked(BOB).await, None);
}

#[tokio::test]
async fn replay_can_be_disabled() {
    let mut config = test_config();
    config.startup.replay_history = false;
    let lab = Lab::with_config(config);
    lab.seed(QUEUE_A, ALICE, Utc::now());

    lab.send(UpstreamEvent::ScopeAvailable { scope: SCOPE })
        .await
        .unwrap();

    assert_eq!(lab.tracked(ALICE).await, None);
}

#[tokio::test]
async fn bot_items_are_not_replayed() {
    let lab = Lab::new();
    let rules = queuewarden_proto::Item {
        id: queuewarden_proto::ItemId(1),
        channel: QUEUE_A,
        author: BOT,
        created_at: Utc::now(),
        content: "rules".into(),
        reactions: vec![Reaction {
            emoji: Annotation::Active.emoji().into(),
            users: vec![ALICE],
        }],
    };
    lab.platform.post_item(SCOPE, rules).unwrap();

    lab.send(UpstreamEvent::ScopeAvailable { scope: SCOPE })
        .await
        .unwrap();
    assert_eq!(lab.tracked(BOT).await, None);
    assert_eq!(lab.engine.table().len().await, 0);
}

#[tokio::test]
async fn unavailable_scope_is_forgotten() {
    let lab = Lab::new();
    lab.post(QUEUE_A, ALICE).await;
    lab.post(QUEUE_B, BOB).await;
    assert!(lab.engine.activity().is_active(SCOPE));

    lab.send(UpstreamEvent::ScopeUnavailable { scope: SCOPE })
        .await
        .unwrap();

    assert_eq!(lab.engine.table().len().await, 0);
    assert!(!lab.engine.activity().is_active(SCOPE));

    let status = lab.engine.status().await;
    assert!(status.active_scopes.is_empty());
    assert_eq!(status.tracked_entities, 0);
}
