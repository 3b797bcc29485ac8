// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared execution context passed down every call chain

use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Context shared by every node in one run
///
/// Cancellation is cooperative: the token is checked at well-defined points
/// (before starting a node or step), never by interrupting work that is
/// already executing.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    pub workflow_id: String,
    pub execution_id: String,
    /// Caller-supplied run input, visible to every node
    pub input: Value,
    cancellation: CancellationToken,
}

impl ExecutionContext {
    pub fn new(workflow_id: impl Into<String>, execution_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            execution_id: execution_id.into(),
            input: Value::Null,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_input(mut self, input: Value) -> Self {
        self.input = input;
        self
    }

    /// Request cooperative cancellation of the run
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Resolves once cancellation has been requested
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_shared_across_clones() {
        let ctx = ExecutionContext::new("wf", "exec-1");
        let clone = ctx.clone();
        assert!(!clone.is_cancelled());

        ctx.cancel();
        assert!(clone.is_cancelled());
    }
}
