//! Fake node executor for testing

use crate::error::EngineError;
use crate::executor::NodeExecutor;
use async_trait::async_trait;
use riptide_core::{ExecutionContext, WorkflowNode};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Configured outcome for a node id
#[derive(Clone)]
enum Behavior {
    Succeed(Value),
    Fail(String),
    FailTimes { failures: u32, then: Value },
    Delay { duration: Duration, then: Value },
    Hang,
}

#[derive(Default)]
struct FakeState {
    behaviors: HashMap<String, Behavior>,
    calls: Vec<String>,
    inputs: HashMap<String, HashMap<String, Value>>,
    attempts: HashMap<String, u32>,
}

/// Call-recording executor with configurable per-node outcomes
///
/// Nodes without a configured behavior succeed with `{"node": <id>}`.
#[derive(Clone, Default)]
pub struct FakeExecutor {
    state: Arc<Mutex<FakeState>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Succeed with `output`
    pub fn succeed(&self, node_id: &str, output: Value) {
        self.set(node_id, Behavior::Succeed(output));
    }

    /// Fail every attempt with `message`
    pub fn fail(&self, node_id: &str, message: &str) {
        self.set(node_id, Behavior::Fail(message.to_string()));
    }

    /// Fail the first `failures` attempts, then succeed with `then`
    pub fn fail_times(&self, node_id: &str, failures: u32, then: Value) {
        self.set(node_id, Behavior::FailTimes { failures, then });
    }

    /// Sleep `duration`, then succeed with `then`
    pub fn delay(&self, node_id: &str, duration: Duration, then: Value) {
        self.set(node_id, Behavior::Delay { duration, then });
    }

    /// Never resolve (for timeout tests)
    pub fn hang(&self, node_id: &str) {
        self.set(node_id, Behavior::Hang);
    }

    /// Node ids in invocation order, one entry per attempt
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Number of times a node was invoked
    pub fn call_count(&self, node_id: &str) -> usize {
        self.lock().calls.iter().filter(|c| *c == node_id).count()
    }

    /// The inputs the node saw on its most recent invocation
    pub fn inputs_for(&self, node_id: &str) -> Option<HashMap<String, Value>> {
        self.lock().inputs.get(node_id).cloned()
    }

    fn set(&self, node_id: &str, behavior: Behavior) {
        self.lock().behaviors.insert(node_id.to_string(), behavior);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl NodeExecutor for FakeExecutor {
    async fn execute(
        &self,
        node: &WorkflowNode,
        inputs: &HashMap<String, Value>,
        _ctx: &ExecutionContext,
    ) -> Result<Value, EngineError> {
        // Record the call and snapshot the behavior without holding the
        // lock across an await point
        let (behavior, attempt) = {
            let mut state = self.lock();
            state.calls.push(node.id.clone());
            state.inputs.insert(node.id.clone(), inputs.clone());
            let counter = state.attempts.entry(node.id.clone()).or_insert(0);
            *counter += 1;
            let attempt = *counter;
            (state.behaviors.get(&node.id).cloned(), attempt)
        };

        match behavior {
            None => Ok(json!({ "node": node.id })),
            Some(Behavior::Succeed(output)) => Ok(output),
            Some(Behavior::Fail(message)) => Err(EngineError::Execution(message)),
            Some(Behavior::FailTimes { failures, then }) => {
                if attempt <= failures {
                    Err(EngineError::Execution(format!(
                        "{} failed on attempt {attempt}",
                        node.id
                    )))
                } else {
                    Ok(then)
                }
            }
            Some(Behavior::Delay { duration, then }) => {
                tokio::time::sleep(duration).await;
                Ok(then)
            }
            Some(Behavior::Hang) => {
                std::future::pending::<()>().await;
                Ok(Value::Null)
            }
        }
    }
}
