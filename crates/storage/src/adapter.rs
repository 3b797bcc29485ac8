// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistence adapter contract for durable execution state

use async_trait::async_trait;
use riptide_core::{Checkpoint, WorkflowState};
use thiserror::Error;

/// Errors from persistence operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("backend error: {0}")]
    Backend(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Adapter for durable state persistence
///
/// Implementations must return deep, independent copies on both save and
/// load: mutating a caller's copy must never affect stored state, and vice
/// versa. All methods must be safe under concurrent access from multiple
/// executions.
#[async_trait]
pub trait StateStore: Clone + Send + Sync + 'static {
    /// Persist the full state of an execution
    async fn save_state(&self, state: &WorkflowState) -> Result<(), StorageError>;

    /// Load an execution's state, `None` if unknown
    async fn load_state(&self, execution_id: &str) -> Result<Option<WorkflowState>, StorageError>;

    /// Append a checkpoint to an execution's log
    async fn save_checkpoint(
        &self,
        execution_id: &str,
        checkpoint: &Checkpoint,
    ) -> Result<(), StorageError>;

    /// All checkpoints recorded for an execution, oldest first
    async fn load_checkpoints(&self, execution_id: &str) -> Result<Vec<Checkpoint>, StorageError>;

    /// Ids of executions persisted as pending or running
    async fn list_pending(&self) -> Result<Vec<String>, StorageError>;

    /// Remove an execution and its checkpoint log
    async fn delete_execution(&self, execution_id: &str) -> Result<(), StorageError>;
}
