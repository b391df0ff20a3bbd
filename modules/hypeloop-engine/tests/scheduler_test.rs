//! Full-cycle scheduler behaviour against the mocks: publish retry
//! accounting, phase sequencing, quota-bound termination, and teardown.

use std::sync::Arc;
use std::time::Duration;

use hypeloop_common::{ActionError, GenerationError};
use hypeloop_engine::content::PostComposer;
use hypeloop_engine::dispatcher::BatchDispatcher;
use hypeloop_engine::scheduler::{CycleConfig, CycleScheduler};
use hypeloop_engine::store::StateStore;
use hypeloop_engine::testing::{candidate, FixedReply, MockActuator, MockGenerator};
use hypeloop_engine::traits::Generator;
use tokio::sync::watch;

fn test_cfg(max_cycles: u32, posts_per_cycle: u32) -> CycleConfig {
    CycleConfig {
        search_query: "@anoma -from:anoma".to_string(),
        posts_per_cycle,
        max_replies_per_cycle: 20,
        batch_wait: Duration::ZERO,
        post_cycle_wait: Duration::ZERO,
        max_cycles: Some(max_cycles),
        inter_post_delay: (Duration::ZERO, Duration::ZERO),
        publish_retry_delay: (Duration::ZERO, Duration::ZERO),
        inter_cycle_pause: (Duration::ZERO, Duration::ZERO),
        recovery_delay: Duration::ZERO,
    }
}

fn dispatcher(actuator: Arc<MockActuator>) -> BatchDispatcher {
    BatchDispatcher::new(
        actuator,
        Arc::new(FixedReply("love this".to_string())),
        5,
        Duration::ZERO,
        Duration::ZERO,
    )
}

fn composer(generator: MockGenerator) -> PostComposer {
    let generator: Arc<dyn Generator> = Arc::new(generator);
    PostComposer::new(generator, "anoma")
}

fn shutdown_never() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    // Keep the sender alive for the whole test process.
    std::mem::forget(tx);
    rx
}

#[tokio::test]
async fn publish_fails_twice_then_succeeds_counts_one_post_two_errors() {
    let actuator = Arc::new(MockActuator::new().with_publish_script(vec![
        Err(ActionError::Transient("composer not ready".to_string())),
        Err(ActionError::Transient("composer not ready".to_string())),
        Ok(()),
    ]));
    let dir = tempfile::tempdir().unwrap();

    let scheduler = CycleScheduler::new(
        actuator.clone(),
        Some(composer(MockGenerator::always("hyped for @anoma today"))),
        dispatcher(actuator.clone()),
        StateStore::new(dir.path()),
        test_cfg(1, 3),
        50,
        shutdown_never(),
    );
    let stats = scheduler.run().await.unwrap();

    assert_eq!(stats.posts_published, 1);
    assert_eq!(stats.publish_errors, 2);
    assert_eq!(actuator.publish_count(), 1);

    // Persisted day record carries the same counts.
    let (_, days) = StateStore::new(dir.path()).load();
    let today = days.values().next_back().unwrap();
    assert_eq!(today.posts_made, 1);
    assert_eq!(today.errors, 2);
}

#[tokio::test]
async fn generation_failure_is_counted_and_retried_within_phase() {
    let actuator = Arc::new(MockActuator::new());
    let generator = MockGenerator::scripted(
        vec![Err(GenerationError::Failed("rate limited".to_string()))],
        "still hyped about @anoma",
    );
    let dir = tempfile::tempdir().unwrap();

    let scheduler = CycleScheduler::new(
        actuator.clone(),
        Some(composer(generator)),
        dispatcher(actuator.clone()),
        StateStore::new(dir.path()),
        test_cfg(1, 3),
        50,
        shutdown_never(),
    );
    let stats = scheduler.run().await.unwrap();

    // First attempt lost to generation, remaining two published.
    assert_eq!(stats.publish_errors, 1);
    assert_eq!(stats.posts_published, 2);
}

#[tokio::test]
async fn missing_generator_disables_publishing_but_not_replying() {
    let actuator = Arc::new(MockActuator::new().with_fetches(vec![vec![
        candidate("1", "big news", true),
        candidate("2", "more news", true),
    ]]));
    let dir = tempfile::tempdir().unwrap();

    let scheduler = CycleScheduler::new(
        actuator.clone(),
        None,
        dispatcher(actuator.clone()),
        StateStore::new(dir.path()),
        test_cfg(1, 3),
        50,
        shutdown_never(),
    );
    let stats = scheduler.run().await.unwrap();

    assert_eq!(stats.posts_published, 0);
    assert_eq!(actuator.publish_count(), 0);
    assert_eq!(stats.replies_sent, 2);
}

#[tokio::test]
async fn full_cycle_publishes_replies_and_tears_down() {
    let actuator = Arc::new(MockActuator::new().with_fetches(vec![vec![
        candidate("1", "original post", true),
        candidate("2", "a reply", false),
        candidate("3", "another original", true),
    ]]));
    let dir = tempfile::tempdir().unwrap();

    let scheduler = CycleScheduler::new(
        actuator.clone(),
        Some(composer(MockGenerator::always("shipping season @anoma"))),
        dispatcher(actuator.clone()),
        StateStore::new(dir.path()),
        test_cfg(1, 3),
        50,
        shutdown_never(),
    );
    let stats = scheduler.run().await.unwrap();

    assert_eq!(stats.cycles_completed, 1);
    assert_eq!(stats.posts_published, 3);
    assert_eq!(stats.replies_sent, 2);
    assert_eq!(*actuator.sessions_closed.lock().unwrap(), 1);

    // Dedup state flushed for the next run.
    let (ids, days) = StateStore::new(dir.path()).load();
    assert_eq!(ids.len(), 2);
    let today = days.values().next_back().unwrap();
    assert_eq!(today.successes, 2);
    assert_eq!(today.last_actuator_identity, "mock-actuator");
}

#[tokio::test]
async fn quota_exhaustion_ends_the_run_before_max_cycles() {
    let fetches = vec![
        vec![candidate("1", "a", true), candidate("2", "b", true)],
        vec![candidate("3", "c", true)],
    ];
    let actuator = Arc::new(MockActuator::new().with_fetches(fetches));
    let dir = tempfile::tempdir().unwrap();

    let scheduler = CycleScheduler::new(
        actuator.clone(),
        None,
        dispatcher(actuator.clone()),
        StateStore::new(dir.path()),
        test_cfg(5, 3),
        1,
        shutdown_never(),
    );
    let stats = scheduler.run().await.unwrap();

    assert_eq!(stats.replies_sent, 1);
    assert_eq!(stats.cycles_completed, 1, "second cycle never starts");
}

#[tokio::test]
async fn fatal_publish_error_aborts_the_run() {
    let actuator = Arc::new(MockActuator::new().with_publish_script(vec![Err(
        ActionError::Fatal("account locked".to_string()),
    )]));
    let dir = tempfile::tempdir().unwrap();

    let scheduler = CycleScheduler::new(
        actuator.clone(),
        Some(composer(MockGenerator::always("big day for @anoma"))),
        dispatcher(actuator.clone()),
        StateStore::new(dir.path()),
        test_cfg(3, 3),
        50,
        shutdown_never(),
    );
    let result = scheduler.run().await;

    assert!(result.is_err());
    // Teardown still released the session.
    assert_eq!(*actuator.sessions_closed.lock().unwrap(), 1);
}

#[tokio::test]
async fn composer_relocates_leading_mention() {
    let c = composer(MockGenerator::always("@anoma are great"));
    let text = c.compose().await.unwrap();
    assert_eq!(text, "are great @anoma");
}

#[tokio::test]
async fn shutdown_is_honoured_at_the_top_of_the_loop() {
    let actuator = Arc::new(MockActuator::new());
    let dir = tempfile::tempdir().unwrap();

    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();

    let scheduler = CycleScheduler::new(
        actuator.clone(),
        None,
        dispatcher(actuator.clone()),
        StateStore::new(dir.path()),
        test_cfg(5, 3),
        50,
        rx,
    );
    let stats = scheduler.run().await.unwrap();

    assert_eq!(stats.cycles_completed, 0);
    assert_eq!(*actuator.sessions_closed.lock().unwrap(), 1);
}
