// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory reference adapter with snapshot semantics

use crate::adapter::{StateStore, StorageError};
use async_trait::async_trait;
use riptide_core::{Checkpoint, RunStatus, WorkflowState};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Shared {
    states: HashMap<String, WorkflowState>,
    checkpoints: HashMap<String, Vec<Checkpoint>>,
}

/// In-memory state store
///
/// All records are owned value types, so a `clone` at the boundary is a deep
/// copy; no mutable structure is ever shared with a caller.
#[derive(Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Mutex<Shared>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of executions currently stored
    pub fn len(&self) -> usize {
        self.lock().states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().states.is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn save_state(&self, state: &WorkflowState) -> Result<(), StorageError> {
        self.lock()
            .states
            .insert(state.execution_id.clone(), state.clone());
        Ok(())
    }

    async fn load_state(&self, execution_id: &str) -> Result<Option<WorkflowState>, StorageError> {
        Ok(self.lock().states.get(execution_id).cloned())
    }

    async fn save_checkpoint(
        &self,
        execution_id: &str,
        checkpoint: &Checkpoint,
    ) -> Result<(), StorageError> {
        self.lock()
            .checkpoints
            .entry(execution_id.to_string())
            .or_default()
            .push(checkpoint.clone());
        Ok(())
    }

    async fn load_checkpoints(&self, execution_id: &str) -> Result<Vec<Checkpoint>, StorageError> {
        Ok(self
            .lock()
            .checkpoints
            .get(execution_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_pending(&self) -> Result<Vec<String>, StorageError> {
        Ok(self
            .lock()
            .states
            .values()
            .filter(|s| matches!(s.status, RunStatus::Pending | RunStatus::Running))
            .map(|s| s.execution_id.clone())
            .collect())
    }

    async fn delete_execution(&self, execution_id: &str) -> Result<(), StorageError> {
        let mut shared = self.lock();
        shared.states.remove(execution_id);
        shared.checkpoints.remove(execution_id);
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
