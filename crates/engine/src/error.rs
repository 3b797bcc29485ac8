// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the execution engines

use riptide_storage::StorageError;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the wave scheduler, durable engine, and saga runner
#[derive(Debug, Error)]
pub enum EngineError {
    /// An operation referenced an unknown execution or node id
    #[error("validation error: {0}")]
    Validation(String),
    /// A node or step exceeded its allotted time
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    /// The node executor itself failed
    #[error("execution error: {0}")]
    Execution(String),
    /// An upstream dependency did not succeed
    #[error("dependency failed: {0}")]
    DependencyFailure(String),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl EngineError {
    /// Retries apply only to transient faults; a dependency failure is a
    /// skip, not something a retry can fix
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Execution(_))
    }
}
