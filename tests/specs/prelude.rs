//! Shared helpers for the spec suite

pub use riptide_core::*;
pub use riptide_engine::*;
pub use riptide_storage::*;
pub use serde_json::{json, Value};
pub use std::sync::Arc;
pub use std::time::Duration;

pub fn node(id: &str) -> WorkflowNode {
    WorkflowNode::new(id, "task", id)
}

pub fn edge(source: &str, target: &str) -> WorkflowEdge {
    WorkflowEdge::new(format!("{source}-{target}"), source, target)
}

pub fn ctx() -> ExecutionContext {
    ExecutionContext::new("wf", "exec")
}
