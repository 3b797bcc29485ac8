//! Configuration parsing specs
//!
//! Scheduler and retry configuration deserialize from JSON with
//! human-readable durations.

use crate::prelude::*;

#[test]
fn scheduler_config_defaults() {
    let config = SchedulerConfig::default();
    assert_eq!(config.max_parallel, 10);
    assert_eq!(config.node_timeout, Duration::from_secs(30));
    assert!(config.continue_on_error);
    assert_eq!(config.retry_on_error, 0);
    assert_eq!(config.retry_delay, Duration::from_millis(1000));
    assert!(config.priority_nodes.is_empty());
}

#[test]
fn scheduler_config_parses_human_readable_durations() {
    let config: SchedulerConfig = serde_json::from_value(json!({
        "max_parallel": 4,
        "node_timeout": "45s",
        "continue_on_error": false,
        "retry_on_error": 2,
        "retry_delay": "250ms",
        "priority_nodes": ["critical"]
    }))
    .unwrap();

    assert_eq!(config.max_parallel, 4);
    assert_eq!(config.node_timeout, Duration::from_secs(45));
    assert!(!config.continue_on_error);
    assert_eq!(config.retry_on_error, 2);
    assert_eq!(config.retry_delay, Duration::from_millis(250));
    assert_eq!(config.priority_nodes, ["critical"]);
}

#[test]
fn retry_policy_defaults_to_exponential_backoff() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_retries, 3);
    assert_eq!(policy.backoff, BackoffKind::Exponential);
    assert_eq!(policy.initial_delay, Duration::from_secs(1));
    assert_eq!(policy.max_delay, None);
}

#[test]
fn retry_policy_parses_with_a_delay_cap() {
    let policy: RetryPolicy = serde_json::from_value(json!({
        "max_retries": 5,
        "backoff": "exponential",
        "initial_delay": "1s",
        "max_delay": "30s"
    }))
    .unwrap();

    assert_eq!(policy.max_retries, 5);
    assert_eq!(policy.max_delay, Some(Duration::from_secs(30)));
    // The cap bounds exponential growth
    assert_eq!(policy.delay(10), Duration::from_secs(30));
}
