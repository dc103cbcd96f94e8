//! Integration tests for idle-state reclamation on the virtual clock.

mod common;

use common::*;
use queuewarden::state::ActivityEvent;
use queuewarden_proto::Annotation;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn idle_member_is_reclaimed_and_defaced() {
    let lab = Lab::new();
    lab.move_to(ALICE, Some(WAITING_ROOM)).await;
    let a = lab.post(QUEUE_A, ALICE).await;
    let b = lab.post(QUEUE_B, ALICE).await;
    lab.react(QUEUE_B, b, ALICE, Annotation::Finished, true).await;

    // The scope goes quiet long before the member's state is reclaimed.
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert!(!lab.engine.activity().is_active(SCOPE));
    assert!(lab.tracked(ALICE).await.is_some());

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(lab.tracked(ALICE).await, None);
    assert_eq!(lab.annotations(QUEUE_A, a), only(Annotation::Ignored));
    assert_eq!(lab.annotations(QUEUE_B, b), only(Annotation::Ignored));
}

#[tokio::test(start_paused = true)]
async fn activity_postpones_reclamation() {
    let lab = Lab::new();
    lab.move_to(ALICE, Some(WAITING_ROOM)).await;
    let item = lab.post(QUEUE_A, ALICE).await;

    tokio::time::sleep(Duration::from_secs(500)).await;
    lab.move_to(ALICE, None).await;

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(lab.tracked(ALICE).await, Some(vec![(QUEUE_A, item)]));
    assert_eq!(lab.annotations(QUEUE_A, item), only(Annotation::Astray));

    tokio::time::sleep(Duration::from_secs(400)).await;
    assert_eq!(lab.tracked(ALICE).await, None);
    assert_eq!(lab.annotations(QUEUE_A, item), only(Annotation::Ignored));
}

#[tokio::test(start_paused = true)]
async fn reclamation_tolerates_deleted_items() {
    let lab = Lab::new();
    let gone = lab.post(QUEUE_A, ALICE).await;
    let kept = lab.post(QUEUE_B, ALICE).await;
    lab.platform.delete_item(SCOPE, QUEUE_A, gone);

    tokio::time::sleep(Duration::from_secs(700)).await;
    assert_eq!(lab.tracked(ALICE).await, None);
    assert_eq!(lab.annotations(QUEUE_B, kept), only(Annotation::Ignored));
}

#[tokio::test(start_paused = true)]
async fn member_returning_after_reclamation_starts_fresh() {
    let lab = Lab::new();
    lab.move_to(ALICE, Some(WAITING_ROOM)).await;
    let old = lab.post(QUEUE_A, ALICE).await;
    tokio::time::sleep(Duration::from_secs(700)).await;
    assert_eq!(lab.tracked(ALICE).await, None);

    let new = lab.post(QUEUE_A, ALICE).await;
    assert_eq!(lab.tracked(ALICE).await, Some(vec![(QUEUE_A, new)]));
    assert_eq!(lab.annotations(QUEUE_A, old), only(Annotation::Ignored));
    assert!(lab.annotations(QUEUE_A, new).is_empty());
}

#[tokio::test(start_paused = true)]
async fn activity_transitions_are_observable() {
    let lab = Lab::new();
    let mut events = lab.engine.activity().subscribe();

    lab.post(QUEUE_A, ALICE).await;
    assert_eq!(events.recv().await.unwrap(), ActivityEvent::Started(SCOPE));

    assert_eq!(events.recv().await.unwrap(), ActivityEvent::Ended(SCOPE));
    assert_eq!(events.recv().await.unwrap(), ActivityEvent::Silence);
    assert_eq!(lab.engine.activity().pending_wake(), None);
}
