//! Parallel execution specs
//!
//! Verify the wave scheduler runs dependency graphs the way an embedding
//! application drives it: data flowing along edges, failures isolated to
//! their branch, progress observable from the outside.

use crate::prelude::*;

#[tokio::test]
async fn fan_out_fan_in_pipeline_propagates_data() {
    let executor = FakeExecutor::new();
    executor.succeed("fetch", json!({"rows": 100}));
    executor.succeed("validate", json!({"valid": 90}));
    executor.succeed("enrich", json!({"enriched": 100}));
    let scheduler = WaveScheduler::new(executor.clone(), SchedulerConfig::default());

    let nodes = vec![node("fetch"), node("validate"), node("enrich"), node("store")];
    let edges = vec![
        edge("fetch", "validate"),
        edge("fetch", "enrich"),
        edge("validate", "store"),
        edge("enrich", "store"),
    ];
    let results = scheduler.execute(&nodes, &edges, &ctx()).await.unwrap();

    assert_eq!(results.len(), 4);
    assert!(results.values().all(|r| r.status == NodeStatus::Success));

    // The sink saw both branch outputs, the root saw none
    let inputs = executor.inputs_for("store").unwrap();
    assert_eq!(inputs.get("validate"), Some(&json!({"valid": 90})));
    assert_eq!(inputs.get("enrich"), Some(&json!({"enriched": 100})));
    assert!(executor.inputs_for("fetch").unwrap().is_empty());

    let progress = scheduler.progress();
    assert_eq!(progress.completed, 4);
    assert_eq!(progress.percentage, 100.0);
}

#[tokio::test]
async fn failed_branch_does_not_stop_independent_work() {
    let executor = FakeExecutor::new();
    executor.fail("flaky", "backend unavailable");
    let scheduler = WaveScheduler::new(executor.clone(), SchedulerConfig::default());

    let nodes = vec![node("flaky"), node("downstream"), node("unrelated")];
    let edges = vec![edge("flaky", "downstream")];
    let results = scheduler.execute(&nodes, &edges, &ctx()).await.unwrap();

    assert_eq!(results["flaky"].status, NodeStatus::Error);
    // continueOnError defaults on: downstream still runs
    assert_eq!(results["downstream"].status, NodeStatus::Success);
    assert_eq!(results["unrelated"].status, NodeStatus::Success);
}

#[tokio::test]
async fn strict_mode_cascades_skips_from_a_failed_dependency() {
    let executor = FakeExecutor::new();
    executor.fail("extract", "boom");
    let config = SchedulerConfig {
        continue_on_error: false,
        ..SchedulerConfig::default()
    };
    let scheduler = WaveScheduler::new(executor.clone(), config);

    let nodes = vec![node("extract"), node("transform"), node("load")];
    let edges = vec![edge("extract", "transform"), edge("transform", "load")];
    let results = scheduler.execute(&nodes, &edges, &ctx()).await.unwrap();

    assert_eq!(results["transform"].status, NodeStatus::Skipped);
    assert_eq!(results["transform"].error.as_deref(), Some("Dependency failed"));
    assert_eq!(results["load"].status, NodeStatus::Skipped);
    assert_eq!(executor.call_count("transform"), 0);
}

#[tokio::test]
async fn transient_failures_retry_and_recover_end_to_end() {
    let executor = FakeExecutor::new();
    executor.fail_times("upload", 2, json!({"uploaded": true}));
    let config = SchedulerConfig {
        retry_on_error: 3,
        retry_delay: Duration::from_millis(10),
        ..SchedulerConfig::default()
    };
    let scheduler = WaveScheduler::new(executor.clone(), config);

    let results = scheduler
        .execute(&[node("upload")], &[], &ctx())
        .await
        .unwrap();

    assert_eq!(results["upload"].status, NodeStatus::Success);
    assert_eq!(results["upload"].output, Some(json!({"uploaded": true})));
    assert_eq!(executor.call_count("upload"), 3);
}

#[tokio::test]
async fn context_cancellation_aborts_a_run_in_flight() {
    let executor = FakeExecutor::new();
    executor.delay("slow", Duration::from_secs(5), Value::Null);
    let scheduler = WaveScheduler::new(executor, SchedulerConfig::default());

    let run_ctx = ctx();
    let canceller = run_ctx.clone();
    let nodes = vec![node("slow"), node("after")];
    let edges = vec![edge("slow", "after")];
    let run = tokio::spawn(async move { scheduler.execute(&nodes, &edges, &run_ctx).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    canceller.cancel();
    let results = run.await.unwrap().unwrap();

    for result in results.values() {
        assert_eq!(result.status, NodeStatus::Skipped);
        assert_eq!(result.error.as_deref(), Some("Execution aborted"));
    }
}

#[tokio::test]
async fn results_carry_timing_for_every_settled_node() {
    let executor = FakeExecutor::new();
    executor.delay("work", Duration::from_millis(30), json!({"ok": true}));
    let scheduler = WaveScheduler::new(executor, SchedulerConfig::default());

    let results = scheduler
        .execute(&[node("work")], &[], &ctx())
        .await
        .unwrap();

    let result = &results["work"];
    assert!(result.duration_ms >= 25);
    assert!(result.finished_at >= result.started_at);
}
