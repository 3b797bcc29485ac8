// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable, checkpointed sequential execution
//!
//! Steps run in the order the node list was provided; durability and
//! parallelism are separate concerns, only the wave scheduler parallelizes.
//! The whole state is persisted through the adapter after every step, so an
//! execution survives a process restart and resumes from its last
//! checkpoint.

use crate::error::EngineError;
use crate::executor::NodeExecutor;
use riptide_core::{
    Checkpoint, Clock, ExecutionContext, ExecutionEvent, IdGen, Observer, Observers, RetryPolicy,
    RunStatus, SystemClock, UuidIdGen, WorkflowNode, WorkflowState,
};
use riptide_storage::StateStore;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Checkpointed sequential execution engine
///
/// Multiple `execute` calls may run concurrently against one engine; the
/// adapter is the only shared touch point. Live runs register their
/// cancellation context so `cancel_execution` can reach an in-process
/// driver, not just the persisted record.
pub struct DurableEngine<E, S, C = SystemClock, I = UuidIdGen> {
    executor: Arc<E>,
    store: S,
    policy: RetryPolicy,
    observers: Observers,
    clock: C,
    ids: I,
    active: Arc<Mutex<HashMap<String, ExecutionContext>>>,
}

impl<E, S> DurableEngine<E, S>
where
    E: NodeExecutor,
    S: StateStore,
{
    pub fn new(executor: E, store: S) -> Self {
        Self::with_parts(executor, store, SystemClock, UuidIdGen)
    }
}

impl<E, S, C, I> DurableEngine<E, S, C, I>
where
    E: NodeExecutor,
    S: StateStore,
    C: Clock,
    I: IdGen,
{
    pub fn with_parts(executor: E, store: S, clock: C, ids: I) -> Self {
        Self {
            executor: Arc::new(executor),
            store,
            policy: RetryPolicy::default(),
            observers: Observers::new(),
            clock,
            ids,
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Register an observer; observers are notified in registration order
    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Run `nodes` one at a time, checkpointing after each
    ///
    /// The returned state has status `Completed`; a failed step (after the
    /// retry policy is exhausted) persists the state as `Failed` and returns
    /// the triggering error.
    pub async fn execute(
        &self,
        workflow_id: &str,
        nodes: &[WorkflowNode],
        input: Value,
        metadata: Option<Value>,
    ) -> Result<WorkflowState, EngineError> {
        let execution_id = self.ids.next();
        let mut state = WorkflowState::new(workflow_id, &execution_id, self.clock.now());
        state.metadata = metadata.unwrap_or(Value::Null);
        state.steps = nodes
            .iter()
            .map(|node| riptide_core::DurableStep::new(self.ids.next(), node))
            .collect();
        self.store.save_state(&state).await?;

        self.observers.emit(&ExecutionEvent::ExecutionStarted {
            execution_id: execution_id.clone(),
            workflow_id: workflow_id.to_string(),
        });
        tracing::info!(workflow_id, execution_id, steps = state.steps.len(), "durable execution started");

        let ctx = ExecutionContext::new(workflow_id, &execution_id).with_input(input);
        self.run_from(state, 0, &ctx).await
    }

    /// Resume executions persisted as pending or running
    ///
    /// Called on engine start-up, before accepting new work. A failure
    /// recovering one execution is reported and does not block the others.
    pub async fn recover_pending(&self) -> Result<Vec<WorkflowState>, EngineError> {
        let ids = self.store.list_pending().await?;
        let mut recovered = Vec::new();
        for execution_id in ids {
            self.observers.emit(&ExecutionEvent::ExecutionRecovering {
                execution_id: execution_id.clone(),
            });
            tracing::info!(execution_id, "recovering execution");
            match self.resume(&execution_id).await {
                Ok(state) => recovered.push(state),
                Err(error) => {
                    tracing::warn!(execution_id, error = %error, "recovery failed");
                }
            }
        }
        Ok(recovered)
    }

    /// Cancel a running execution
    ///
    /// Unknown ids are a validation error. Cancelling an execution that is
    /// not running is a silent no-op: no state change, no event. When the
    /// execution is driven by this process, the shared cancellation token
    /// is triggered and the driver persists the cancellation itself before
    /// its next step; only orphaned records (running in the store with no
    /// live driver, e.g. after a crash) are marked failed directly.
    pub async fn cancel_execution(&self, execution_id: &str) -> Result<(), EngineError> {
        let Some(mut state) = self.store.load_state(execution_id).await? else {
            return Err(EngineError::Validation(format!(
                "unknown execution: {execution_id}"
            )));
        };
        if state.status != RunStatus::Running {
            return Ok(());
        }
        if let Some(ctx) = self.live_context(execution_id) {
            ctx.cancel();
            tracing::info!(execution_id, "cancellation requested");
            return Ok(());
        }
        state.mark_failed("Cancelled by user");
        self.store.save_state(&state).await?;
        self.observers.emit(&ExecutionEvent::ExecutionCancelled {
            execution_id: execution_id.to_string(),
        });
        tracing::info!(execution_id, "execution cancelled");
        Ok(())
    }

    /// Load an execution's persisted state
    pub async fn get_execution(&self, execution_id: &str) -> Result<WorkflowState, EngineError> {
        self.store
            .load_state(execution_id)
            .await?
            .ok_or_else(|| EngineError::Validation(format!("unknown execution: {execution_id}")))
    }

    async fn resume(&self, execution_id: &str) -> Result<WorkflowState, EngineError> {
        let state = self.get_execution(execution_id).await?;
        let start = state.resume_index();
        let ctx = ExecutionContext::new(&state.workflow_id, execution_id);
        self.run_from(state, start, &ctx).await
    }

    /// Register the run as live for the duration of the drive loop
    async fn run_from(
        &self,
        state: WorkflowState,
        start: usize,
        ctx: &ExecutionContext,
    ) -> Result<WorkflowState, EngineError> {
        let execution_id = state.execution_id.clone();
        self.lock_active().insert(execution_id.clone(), ctx.clone());
        let result = self.drive(state, start, ctx).await;
        self.lock_active().remove(&execution_id);
        result
    }

    async fn drive(
        &self,
        mut state: WorkflowState,
        start: usize,
        ctx: &ExecutionContext,
    ) -> Result<WorkflowState, EngineError> {
        state.mark_running();
        self.store.save_state(&state).await?;

        // Prior step outputs, reconstructed from checkpoints on resume
        let mut outputs: HashMap<String, Value> = state
            .checkpoints
            .iter()
            .map(|c| (c.step_id.clone(), c.state.clone()))
            .collect();

        for index in start..state.steps.len() {
            if ctx.is_cancelled() {
                return self.halt_cancelled(state).await;
            }

            state.current_step = index;
            let node = state.steps[index].to_node();
            let step_id = state.steps[index].id.clone();
            state.steps[index].start(self.clock.now());
            self.store.save_state(&state).await?;

            let output = match self.run_step(&mut state, index, &node, &outputs, ctx).await {
                Ok(output) => output,
                Err(error) => {
                    state.steps[index].fail(self.clock.now());
                    state.mark_failed(error.to_string());
                    self.store.save_state(&state).await?;
                    self.observers.emit(&ExecutionEvent::ExecutionFailed {
                        execution_id: state.execution_id.clone(),
                        error: error.to_string(),
                    });
                    tracing::error!(
                        execution_id = %state.execution_id,
                        step_id,
                        error = %error,
                        "durable execution failed"
                    );
                    return Err(error);
                }
            };

            let now = self.clock.now();
            state.steps[index].complete(now);
            outputs.insert(step_id.clone(), output.clone());

            let checkpoint = Checkpoint {
                id: self.ids.next(),
                step_id: step_id.clone(),
                timestamp: now,
                state: output,
            };
            self.store
                .save_checkpoint(&state.execution_id, &checkpoint)
                .await?;
            state.checkpoints.push(checkpoint);
            state.current_step = index + 1;
            self.store.save_state(&state).await?;
            self.observers.emit(&ExecutionEvent::CheckpointCreated {
                execution_id: state.execution_id.clone(),
                step_id,
            });
        }

        // A cancellation that lands during the final step must not be
        // overwritten by completion
        if ctx.is_cancelled() {
            return self.halt_cancelled(state).await;
        }

        state.mark_completed();
        self.store.save_state(&state).await?;
        self.observers.emit(&ExecutionEvent::ExecutionCompleted {
            execution_id: state.execution_id.clone(),
        });
        tracing::info!(execution_id = %state.execution_id, "durable execution completed");
        Ok(state)
    }

    async fn halt_cancelled(&self, mut state: WorkflowState) -> Result<WorkflowState, EngineError> {
        state.mark_failed("Cancelled by user");
        self.store.save_state(&state).await?;
        self.observers.emit(&ExecutionEvent::ExecutionCancelled {
            execution_id: state.execution_id.clone(),
        });
        tracing::info!(execution_id = %state.execution_id, "execution cancelled");
        Err(EngineError::Execution("Cancelled by user".into()))
    }

    fn live_context(&self, execution_id: &str) -> Option<ExecutionContext> {
        self.lock_active().get(execution_id).cloned()
    }

    fn lock_active(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<String, ExecutionContext>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// One step's attempt loop under the retry policy
    async fn run_step(
        &self,
        state: &mut WorkflowState,
        index: usize,
        node: &WorkflowNode,
        outputs: &HashMap<String, Value>,
        ctx: &ExecutionContext,
    ) -> Result<Value, EngineError> {
        let mut failures = 0u32;
        loop {
            match self.executor.execute(node, outputs, ctx).await {
                Ok(output) => return Ok(output),
                Err(error) if error.is_retryable() => {
                    failures += 1;
                    if !self.policy.should_retry(failures) {
                        return Err(error);
                    }
                    state.steps[index].retry_count = failures;
                    state.retry_count += 1;
                    self.observers.emit(&ExecutionEvent::StepRetried {
                        execution_id: state.execution_id.clone(),
                        step_id: state.steps[index].id.clone(),
                        attempt: failures,
                    });
                    tracing::warn!(
                        execution_id = %state.execution_id,
                        step_id = %state.steps[index].id,
                        attempt = failures,
                        error = %error,
                        "step failed, retrying"
                    );
                    tokio::time::sleep(self.policy.delay(failures)).await;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

#[cfg(test)]
#[path = "durable_tests.rs"]
mod tests;
