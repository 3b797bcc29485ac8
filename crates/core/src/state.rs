// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable execution state, steps, and checkpoints
//!
//! `WorkflowState` is the unit of durability. Once saved it is owned by the
//! persistence adapter; engines hold a working copy during a run and re-fetch
//! rather than mutate a cached reference.

use crate::node::WorkflowNode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle of a durable execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Lifecycle of one step inside a durable execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// An immutable, append-only snapshot of step-local progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: String,
    pub step_id: String,
    pub timestamp: DateTime<Utc>,
    pub state: Value,
}

/// One step per node in a durable run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurableStep {
    pub id: String,
    pub node_id: String,
    pub node_type: String,
    pub status: StepStatus,
    /// Snapshot of the node's configuration at submission, so recovery can
    /// rebuild the node without the original node list
    pub input: Value,
    pub retry_count: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
}

impl DurableStep {
    pub fn new(id: impl Into<String>, node: &WorkflowNode) -> Self {
        Self {
            id: id.into(),
            node_id: node.id.clone(),
            node_type: node.node_type.clone(),
            status: StepStatus::Pending,
            input: node.data.clone(),
            retry_count: 0,
            started_at: None,
            completed_at: None,
            duration_ms: None,
        }
    }

    /// A step that is not backed by a graph node (saga steps)
    pub fn standalone(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            node_id: id.clone(),
            id,
            node_type: node_type.into(),
            status: StepStatus::Pending,
            input: Value::Null,
            retry_count: 0,
            started_at: None,
            completed_at: None,
            duration_ms: None,
        }
    }

    pub fn start(&mut self, now: DateTime<Utc>) {
        self.status = StepStatus::Running;
        self.started_at = Some(now);
    }

    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.status = StepStatus::Completed;
        self.completed_at = Some(now);
        self.duration_ms = self
            .started_at
            .map(|started| (now - started).num_milliseconds().max(0) as u64);
    }

    pub fn fail(&mut self, now: DateTime<Utc>) {
        self.status = StepStatus::Failed;
        self.completed_at = Some(now);
        self.duration_ms = self
            .started_at
            .map(|started| (now - started).num_milliseconds().max(0) as u64);
    }

    /// Rebuild the node this step was created from
    pub fn to_node(&self) -> WorkflowNode {
        WorkflowNode::new(&self.node_id, &self.node_type, &self.node_id)
            .with_data(self.input.clone())
    }
}

/// Durable state of one execution, identified by `execution_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub workflow_id: String,
    pub execution_id: String,
    pub status: RunStatus,
    pub current_step: usize,
    pub steps: Vec<DurableStep>,
    pub checkpoints: Vec<Checkpoint>,
    pub started_at: DateTime<Utc>,
    pub retry_count: u32,
    #[serde(default)]
    pub metadata: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkflowState {
    pub fn new(
        workflow_id: impl Into<String>,
        execution_id: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            execution_id: execution_id.into(),
            status: RunStatus::Pending,
            current_step: 0,
            steps: Vec::new(),
            checkpoints: Vec::new(),
            started_at,
            retry_count: 0,
            metadata: Value::Null,
            error: None,
        }
    }

    pub fn mark_running(&mut self) {
        self.status = RunStatus::Running;
    }

    pub fn mark_completed(&mut self) {
        self.status = RunStatus::Completed;
        self.error = None;
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = RunStatus::Failed;
        self.error = Some(error.into());
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, RunStatus::Completed | RunStatus::Failed)
    }

    pub fn last_checkpoint(&self) -> Option<&Checkpoint> {
        self.checkpoints.last()
    }

    /// Index of the first step that has not completed
    pub fn resume_index(&self) -> usize {
        self.steps
            .iter()
            .position(|s| s.status != StepStatus::Completed)
            .unwrap_or(self.steps.len())
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
