//! Saga specs
//!
//! A booking-style saga: reserve, charge, confirm. When a later step fails,
//! the compensations of completed steps run and the saga is persisted as
//! failed with the original error.

use crate::prelude::*;
use std::sync::Mutex;

fn runner(store: MemoryStore) -> SagaRunner<MemoryStore, SystemClock, SequentialIdGen> {
    SagaRunner::with_parts(store, SystemClock, SequentialIdGen::new("saga"))
}

#[tokio::test]
async fn successful_booking_records_every_step() {
    let store = MemoryStore::new();
    let runner = runner(store.clone());
    let definition = SagaDefinition::new(vec![
        SagaStep::new("reserve", "reserve seat", |_ctx: SagaContext| async {
            Ok(json!({"seat": "12A"}))
        }),
        SagaStep::new("charge", "charge card", |ctx: SagaContext| async move {
            let seat = ctx
                .output("reserve")
                .and_then(|v| v.get("seat"))
                .cloned()
                .ok_or_else(|| EngineError::Execution("no reservation".into()))?;
            Ok(json!({"charged": true, "seat": seat}))
        }),
        SagaStep::new("confirm", "send confirmation", |_ctx: SagaContext| async {
            Ok(json!({"sent": true}))
        }),
    ]);

    let state = runner
        .execute_saga("booking", &definition, json!({"customer": "c-1"}))
        .await
        .unwrap();

    assert_eq!(state.status, RunStatus::Completed);
    assert_eq!(state.checkpoints.len(), 3);
    assert_eq!(
        state.checkpoints[1].state,
        json!({"charged": true, "seat": "12A"})
    );
    assert!(state.steps.iter().all(|s| s.status == StepStatus::Completed));

    let persisted = store.load_state(&state.execution_id).await.unwrap().unwrap();
    assert_eq!(persisted.status, RunStatus::Completed);
}

#[tokio::test]
async fn failed_booking_compensates_completed_reservations() {
    let undone = Arc::new(Mutex::new(Vec::new()));
    let store = MemoryStore::new();
    let runner = runner(store.clone());

    let track = |id: &'static str, log: &Arc<Mutex<Vec<&'static str>>>| {
        let log = Arc::clone(log);
        move |_output: Value| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(id);
                Ok(())
            }
        }
    };

    let definition = SagaDefinition::new(vec![
        SagaStep::new("reserve", "reserve seat", |_ctx: SagaContext| async {
            Ok(json!({"seat": "12A"}))
        })
        .with_compensation(track("reserve", &undone)),
        SagaStep::new("charge", "charge card", |_ctx: SagaContext| async {
            Ok(json!({"charged": true}))
        })
        .with_compensation(track("charge", &undone)),
        SagaStep::new("confirm", "send confirmation", |_ctx: SagaContext| async move {
            Err(EngineError::Execution("mail gateway down".into()))
        }),
    ]);

    let error = runner
        .execute_saga("booking", &definition, Value::Null)
        .await
        .unwrap_err();

    // Original error surfaces; compensation ran newest-first
    assert!(error.to_string().contains("mail gateway down"));
    assert_eq!(*undone.lock().unwrap(), ["charge", "reserve"]);

    let persisted = store.load_state("saga-1").await.unwrap().unwrap();
    assert_eq!(persisted.status, RunStatus::Failed);
    assert!(persisted
        .error
        .as_deref()
        .unwrap()
        .contains("mail gateway down"));
    assert_eq!(persisted.steps[2].status, StepStatus::Failed);
}

#[tokio::test]
async fn saga_checkpoints_are_queryable_mid_failure() {
    let store = MemoryStore::new();
    let runner = runner(store.clone());
    let definition = SagaDefinition::new(vec![
        SagaStep::new("reserve", "reserve seat", |_ctx: SagaContext| async {
            Ok(json!({"seat": "12A"}))
        }),
        SagaStep::new("charge", "charge card", |_ctx: SagaContext| async move {
            Err(EngineError::Execution("card declined".into()))
        }),
    ]);

    runner
        .execute_saga("booking", &definition, Value::Null)
        .await
        .unwrap_err();

    // The first step's checkpoint survives the failure
    let checkpoints = store.load_checkpoints("saga-1").await.unwrap();
    assert_eq!(checkpoints.len(), 1);
    assert_eq!(checkpoints[0].step_id, "reserve");
    assert_eq!(checkpoints[0].state, json!({"seat": "12A"}));
}
