// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-node execution results and run progress

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Terminal outcome of one node in one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Success,
    Error,
    Skipped,
}

/// One record per node per run, immutable once written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub node_id: String,
    pub status: NodeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ExecutionResult {
    pub fn success(
        node_id: impl Into<String>,
        output: Value,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            status: NodeStatus::Success,
            output: Some(output),
            error: None,
            duration_ms: elapsed_ms(started_at, finished_at),
            started_at,
            finished_at,
        }
    }

    pub fn error(
        node_id: impl Into<String>,
        error: impl Into<String>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            status: NodeStatus::Error,
            output: None,
            error: Some(error.into()),
            duration_ms: elapsed_ms(started_at, finished_at),
            started_at,
            finished_at,
        }
    }

    /// A node that was never executed; carries the skip reason
    pub fn skipped(node_id: impl Into<String>, reason: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            node_id: node_id.into(),
            status: NodeStatus::Skipped,
            output: None,
            error: Some(reason.into()),
            duration_ms: 0,
            started_at: at,
            finished_at: at,
        }
    }
}

fn elapsed_ms(started_at: DateTime<Utc>, finished_at: DateTime<Utc>) -> u64 {
    (finished_at - started_at).num_milliseconds().max(0) as u64
}

/// Derived snapshot of a run's state
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ExecutionProgress {
    pub total: usize,
    pub completed: usize,
    pub running: usize,
    pub pending: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Share of nodes in a terminal state, 0.0 to 100.0
    pub percentage: f64,
}

impl ExecutionProgress {
    pub fn settled(&self) -> usize {
        self.completed + self.failed + self.skipped
    }
}
