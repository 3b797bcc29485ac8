//! Durable execution specs
//!
//! A durable run checkpoints through the storage adapter after every step,
//! so an interrupted execution resumes where it left off after a restart.

use crate::prelude::*;

fn engine(
    executor: FakeExecutor,
    store: MemoryStore,
) -> DurableEngine<FakeExecutor, MemoryStore, SystemClock, SequentialIdGen> {
    DurableEngine::with_parts(executor, store, SystemClock, SequentialIdGen::new("e"))
        .with_retry_policy(RetryPolicy::none())
}

#[tokio::test]
async fn durable_run_records_full_history() {
    let executor = FakeExecutor::new();
    executor.succeed("extract", json!({"rows": 10}));
    executor.succeed("load", json!({"written": 10}));
    let store = MemoryStore::new();
    let engine = engine(executor, store.clone());

    let state = engine
        .execute(
            "etl",
            &[node("extract"), node("load")],
            json!({"source": "s3"}),
            Some(json!({"trigger": "cron"})),
        )
        .await
        .unwrap();

    assert_eq!(state.status, RunStatus::Completed);
    assert_eq!(state.current_step, 2);
    assert_eq!(state.checkpoints.len(), 2);
    assert_eq!(state.metadata, json!({"trigger": "cron"}));

    // The adapter holds the same record
    let persisted = store.load_state(&state.execution_id).await.unwrap().unwrap();
    assert_eq!(persisted, state);
    assert_eq!(
        store.load_checkpoints(&state.execution_id).await.unwrap().len(),
        2
    );
}

#[tokio::test]
async fn interrupted_execution_resumes_after_a_restart() {
    let store = MemoryStore::new();

    // First process: fails on the second step, first step checkpointed
    let executor = FakeExecutor::new();
    executor.fail("load", "connection reset");
    let first = engine(executor, store.clone());
    first
        .execute("etl", &[node("extract"), node("load")], Value::Null, None)
        .await
        .unwrap_err();
    let failed = store.load_state("e-1").await.unwrap().unwrap();
    assert_eq!(failed.status, RunStatus::Failed);
    assert_eq!(failed.checkpoints.len(), 1);

    // Simulated restart mid-run: the state was persisted as running
    let mut interrupted = failed.clone();
    interrupted.mark_running();
    store.save_state(&interrupted).await.unwrap();

    let executor = FakeExecutor::new();
    let second = engine(executor.clone(), store.clone());
    let recovered = second.recover_pending().await.unwrap();

    assert_eq!(recovered.len(), 1);
    assert_eq!(recovered[0].status, RunStatus::Completed);
    // Only the unfinished step is replayed
    assert_eq!(executor.call_count("extract"), 0);
    assert_eq!(executor.call_count("load"), 1);
    assert_eq!(recovered[0].checkpoints.len(), 2);
}

#[tokio::test]
async fn user_cancellation_is_persisted() {
    let store = MemoryStore::new();
    let mut running = WorkflowState::new("etl", "e-9", SystemClock.now());
    running.mark_running();
    store.save_state(&running).await.unwrap();

    let engine = engine(FakeExecutor::new(), store.clone());
    engine.cancel_execution("e-9").await.unwrap();

    let persisted = store.load_state("e-9").await.unwrap().unwrap();
    assert_eq!(persisted.status, RunStatus::Failed);
    assert_eq!(persisted.error.as_deref(), Some("Cancelled by user"));

    // Cancelling again is a no-op, not an error
    engine.cancel_execution("e-9").await.unwrap();
}

#[tokio::test]
async fn retries_are_counted_in_the_durable_record() {
    let executor = FakeExecutor::new();
    executor.fail_times("flaky", 2, json!({"ok": true}));
    let store = MemoryStore::new();
    let engine = DurableEngine::with_parts(
        executor,
        store.clone(),
        SystemClock,
        SequentialIdGen::new("e"),
    )
    .with_retry_policy(RetryPolicy {
        max_retries: 3,
        backoff: BackoffKind::Fixed,
        initial_delay: Duration::from_millis(10),
        max_delay: None,
    });

    let state = engine
        .execute("etl", &[node("flaky")], Value::Null, None)
        .await
        .unwrap();

    assert_eq!(state.status, RunStatus::Completed);
    assert_eq!(state.retry_count, 2);
    assert_eq!(state.steps[0].retry_count, 2);

    let persisted = store.load_state(&state.execution_id).await.unwrap().unwrap();
    assert_eq!(persisted.retry_count, 2);
}
