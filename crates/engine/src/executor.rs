// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node executor contract

use crate::error::EngineError;
use async_trait::async_trait;
use riptide_core::{ExecutionContext, WorkflowNode};
use serde_json::Value;
use std::collections::HashMap;

/// Executes a single node's business logic
///
/// This callback is the only place node-type-specific logic lives; the
/// engines are agnostic to node `type`. `inputs` carries the outputs of the
/// node's direct dependencies, keyed by node id (for the wave scheduler) or
/// the outputs of prior steps, keyed by step id (for the durable engine).
#[async_trait]
pub trait NodeExecutor: Send + Sync + 'static {
    async fn execute(
        &self,
        node: &WorkflowNode,
        inputs: &HashMap<String, Value>,
        ctx: &ExecutionContext,
    ) -> Result<Value, EngineError>;
}
