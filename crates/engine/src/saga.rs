// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Saga runner: multi-step transactions with compensating actions
//!
//! Steps run in order; when one fails, the compensations of every already
//! succeeded step are invoked under the definition's ordering strategy.
//! Compensation never suppresses the original failure.

use crate::error::EngineError;
use riptide_core::{
    Checkpoint, Clock, DurableStep, ExecutionEvent, IdGen, Observer, Observers, SystemClock,
    UuidIdGen, WorkflowState,
};
use riptide_storage::StateStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

type SagaAction = Arc<dyn Fn(SagaContext) -> BoxFuture<Result<Value, EngineError>> + Send + Sync>;
type SagaCompensation = Arc<dyn Fn(Value) -> BoxFuture<Result<(), EngineError>> + Send + Sync>;
type CheckpointFn = Arc<dyn Fn(Value) -> BoxFuture<Result<(), EngineError>> + Send + Sync>;

/// Order in which eligible compensations run after a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompensationStrategy {
    /// Most recently succeeded step first, walking back to the first
    #[default]
    Backward,
    /// Original execution order
    Forward,
    /// All at once, no ordering guarantee
    Parallel,
}

/// Context handed to a saga action
pub struct SagaContext {
    /// Outputs of all previously succeeded steps, keyed by step id
    pub outputs: HashMap<String, Value>,
    /// Caller-supplied saga input
    pub input: Value,
    checkpoint: CheckpointFn,
}

impl SagaContext {
    /// Persist intermediate progress without completing the step
    pub async fn checkpoint(&self, partial: Value) -> Result<(), EngineError> {
        (self.checkpoint)(partial).await
    }

    /// A prior step's output, if it succeeded
    pub fn output(&self, step_id: &str) -> Option<&Value> {
        self.outputs.get(step_id)
    }
}

/// One unit of saga work with an optional compensating action
#[derive(Clone)]
pub struct SagaStep {
    pub id: String,
    pub name: String,
    pub timeout: Option<Duration>,
    action: SagaAction,
    compensation: Option<SagaCompensation>,
}

impl SagaStep {
    pub fn new<A, Fut>(id: impl Into<String>, name: impl Into<String>, action: A) -> Self
    where
        A: Fn(SagaContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, EngineError>> + Send + 'static,
    {
        Self {
            id: id.into(),
            name: name.into(),
            timeout: None,
            action: Arc::new(move |ctx| Box::pin(action(ctx))),
            compensation: None,
        }
    }

    /// Attach an action that semantically undoes this step
    ///
    /// The compensation receives the step's recorded output.
    pub fn with_compensation<Cmp, Fut>(mut self, compensation: Cmp) -> Self
    where
        Cmp: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), EngineError>> + Send + 'static,
    {
        self.compensation = Some(Arc::new(move |output| Box::pin(compensation(output))));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn is_compensable(&self) -> bool {
        self.compensation.is_some()
    }
}

/// Ordered steps plus compensation policy
#[derive(Clone, Default)]
pub struct SagaDefinition {
    pub steps: Vec<SagaStep>,
    pub strategy: CompensationStrategy,
    /// Saga-wide deadline shared by all remaining steps
    pub timeout: Option<Duration>,
}

impl SagaDefinition {
    pub fn new(steps: Vec<SagaStep>) -> Self {
        Self {
            steps,
            strategy: CompensationStrategy::default(),
            timeout: None,
        }
    }

    pub fn with_strategy(mut self, strategy: CompensationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Drives saga executions against a state store
pub struct SagaRunner<S, C = SystemClock, I = UuidIdGen> {
    store: S,
    observers: Observers,
    clock: C,
    ids: I,
}

impl<S: StateStore> SagaRunner<S> {
    pub fn new(store: S) -> Self {
        Self::with_parts(store, SystemClock, UuidIdGen)
    }
}

impl<S, C, I> SagaRunner<S, C, I>
where
    S: StateStore,
    C: Clock,
    I: IdGen,
{
    pub fn with_parts(store: S, clock: C, ids: I) -> Self {
        Self {
            store,
            observers: Observers::new(),
            clock,
            ids,
        }
    }

    /// Register an observer; observers are notified in registration order
    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Run the saga's steps in order, compensating on failure
    ///
    /// On success the returned state is `Completed` with one step record per
    /// saga step, each carrying its measured duration. On failure the
    /// compensations of succeeded steps run first, then the triggering
    /// step's error is returned.
    pub async fn execute_saga(
        &self,
        name: &str,
        definition: &SagaDefinition,
        input: Value,
    ) -> Result<WorkflowState, EngineError> {
        let execution_id = self.ids.next();
        let mut state = WorkflowState::new(name, &execution_id, self.clock.now());
        state.steps = definition
            .steps
            .iter()
            .map(|step| DurableStep::standalone(&step.id, "saga"))
            .collect();
        self.store.save_state(&state).await?;
        self.observers.emit(&ExecutionEvent::ExecutionStarted {
            execution_id: execution_id.clone(),
            workflow_id: name.to_string(),
        });
        tracing::info!(saga = name, execution_id, steps = definition.steps.len(), "saga started");

        state.mark_running();
        self.store.save_state(&state).await?;

        let deadline = definition.timeout.map(|t| tokio::time::Instant::now() + t);
        let mut outputs: HashMap<String, Value> = HashMap::new();
        let mut succeeded: Vec<usize> = Vec::new();

        for (index, step) in definition.steps.iter().enumerate() {
            state.current_step = index;
            state.steps[index].start(self.clock.now());
            self.store.save_state(&state).await?;
            self.observers.emit(&ExecutionEvent::NodeStarted {
                node_id: step.id.clone(),
            });

            let ctx = SagaContext {
                outputs: outputs.clone(),
                input: input.clone(),
                checkpoint: self.checkpoint_fn(&execution_id, &step.id),
            };

            match self.run_step(step, ctx, deadline).await {
                Ok(output) => {
                    let now = self.clock.now();
                    state.steps[index].complete(now);
                    outputs.insert(step.id.clone(), output.clone());

                    let checkpoint = Checkpoint {
                        id: self.ids.next(),
                        step_id: step.id.clone(),
                        timestamp: now,
                        state: output,
                    };
                    self.store
                        .save_checkpoint(&execution_id, &checkpoint)
                        .await?;
                    // Pick up any partial checkpoints the action wrote
                    state.checkpoints = self.store.load_checkpoints(&execution_id).await?;
                    self.store.save_state(&state).await?;
                    self.observers.emit(&ExecutionEvent::CheckpointCreated {
                        execution_id: execution_id.clone(),
                        step_id: step.id.clone(),
                    });
                    self.observers.emit(&ExecutionEvent::NodeCompleted {
                        node_id: step.id.clone(),
                        status: riptide_core::NodeStatus::Success,
                    });
                    succeeded.push(index);
                }
                Err(error) => {
                    state.steps[index].fail(self.clock.now());
                    state.mark_failed(error.to_string());
                    self.store.save_state(&state).await?;
                    self.observers.emit(&ExecutionEvent::NodeCompleted {
                        node_id: step.id.clone(),
                        status: riptide_core::NodeStatus::Error,
                    });
                    tracing::warn!(
                        saga = name,
                        execution_id,
                        step_id = %step.id,
                        error = %error,
                        "saga step failed, compensating"
                    );

                    self.compensate(definition, &succeeded, &outputs, &execution_id)
                        .await;

                    self.observers.emit(&ExecutionEvent::ExecutionFailed {
                        execution_id: execution_id.clone(),
                        error: error.to_string(),
                    });
                    return Err(error);
                }
            }
        }

        state.mark_completed();
        self.store.save_state(&state).await?;
        self.observers.emit(&ExecutionEvent::ExecutionCompleted {
            execution_id: execution_id.clone(),
        });
        tracing::info!(saga = name, execution_id, "saga completed");
        Ok(state)
    }

    /// Race the step's action against its timeout budget
    async fn run_step(
        &self,
        step: &SagaStep,
        ctx: SagaContext,
        deadline: Option<tokio::time::Instant>,
    ) -> Result<Value, EngineError> {
        let remaining = deadline.map(|d| d.saturating_duration_since(tokio::time::Instant::now()));
        let limit = match (step.timeout, remaining) {
            (Some(own), Some(rest)) => Some(own.min(rest)),
            (Some(own), None) => Some(own),
            (None, rest) => rest,
        };
        let fut = (step.action)(ctx);
        match limit {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .unwrap_or_else(|_| Err(EngineError::Timeout(limit))),
            None => fut.await,
        }
    }

    /// Run the compensations of succeeded, compensable steps
    ///
    /// A failing compensation is logged and reported through the observer
    /// list; it never overrides the triggering error.
    async fn compensate(
        &self,
        definition: &SagaDefinition,
        succeeded: &[usize],
        outputs: &HashMap<String, Value>,
        execution_id: &str,
    ) {
        let eligible: Vec<&SagaStep> = succeeded
            .iter()
            .map(|index| &definition.steps[*index])
            .filter(|step| step.is_compensable())
            .collect();

        match definition.strategy {
            CompensationStrategy::Backward => {
                for step in eligible.iter().rev() {
                    self.compensate_one(step, outputs, execution_id).await;
                }
            }
            CompensationStrategy::Forward => {
                for step in &eligible {
                    self.compensate_one(step, outputs, execution_id).await;
                }
            }
            CompensationStrategy::Parallel => {
                let mut tasks: JoinSet<(String, Result<(), EngineError>)> = JoinSet::new();
                for step in &eligible {
                    let Some(compensation) = step.compensation.clone() else {
                        continue;
                    };
                    let step_id = step.id.clone();
                    let output = outputs.get(&step.id).cloned().unwrap_or(Value::Null);
                    tasks.spawn(async move {
                        let result = compensation(output).await;
                        (step_id, result)
                    });
                }
                while let Some(joined) = tasks.join_next().await {
                    match joined {
                        Ok((step_id, result)) => {
                            self.report_compensation(&step_id, result, execution_id)
                        }
                        Err(error) => {
                            tracing::warn!(error = %error, "compensation task failed");
                        }
                    }
                }
            }
        }
    }

    async fn compensate_one(
        &self,
        step: &SagaStep,
        outputs: &HashMap<String, Value>,
        execution_id: &str,
    ) {
        let Some(compensation) = &step.compensation else {
            return;
        };
        let output = outputs.get(&step.id).cloned().unwrap_or(Value::Null);
        let result = compensation(output).await;
        self.report_compensation(&step.id, result, execution_id);
    }

    fn report_compensation(
        &self,
        step_id: &str,
        result: Result<(), EngineError>,
        execution_id: &str,
    ) {
        let success = match result {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(execution_id, step_id, error = %error, "compensation failed");
                false
            }
        };
        self.observers.emit(&ExecutionEvent::StepCompensated {
            execution_id: execution_id.to_string(),
            step_id: step_id.to_string(),
            success,
        });
    }

    /// Build the checkpoint callback one step's action may invoke
    fn checkpoint_fn(&self, execution_id: &str, step_id: &str) -> CheckpointFn {
        let store = self.store.clone();
        let ids = self.ids.clone();
        let clock = self.clock.clone();
        let execution_id = execution_id.to_string();
        let step_id = step_id.to_string();
        Arc::new(move |partial: Value| {
            let store = store.clone();
            let execution_id = execution_id.clone();
            let checkpoint = Checkpoint {
                id: ids.next(),
                step_id: step_id.clone(),
                timestamp: clock.now(),
                state: partial,
            };
            Box::pin(async move {
                store
                    .save_checkpoint(&execution_id, &checkpoint)
                    .await
                    .map_err(EngineError::from)
            })
        })
    }
}

#[cfg(test)]
#[path = "saga_tests.rs"]
mod tests;
