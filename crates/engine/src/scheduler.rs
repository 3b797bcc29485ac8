// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parallel wave scheduler over the dependency graph
//!
//! Nodes with in-degree zero are immediately ready; completing a node
//! decrements its dependents' in-degrees and any node that reaches zero
//! joins the ready set. The driver starts ready nodes up to the concurrency
//! bound and is the only place bookkeeping is mutated; node-executor
//! callbacks never touch it.

use crate::error::EngineError;
use crate::executor::NodeExecutor;
use chrono::{DateTime, Utc};
use riptide_core::{
    Clock, DependencyGraph, ExecutionContext, ExecutionEvent, ExecutionProgress, ExecutionResult,
    NodeStatus, Observer, Observers, SystemClock, WorkflowEdge, WorkflowNode,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Scheduler tuning knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Concurrency ceiling
    pub max_parallel: usize,
    /// Per-node execution timeout
    #[serde(with = "humantime_serde")]
    pub node_timeout: Duration,
    /// Keep scheduling downstream nodes when a dependency fails
    pub continue_on_error: bool,
    /// Extra attempts after the first
    pub retry_on_error: u32,
    /// Wait between attempts
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,
    /// Node ids to start first when several become ready together
    #[serde(default)]
    pub priority_nodes: Vec<String>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_parallel: 10,
            node_timeout: Duration::from_secs(30),
            continue_on_error: true,
            retry_on_error: 0,
            retry_delay: Duration::from_millis(1000),
            priority_nodes: Vec::new(),
        }
    }
}

/// Where a node currently stands in the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodePhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

#[derive(Default)]
struct RunState {
    phases: HashMap<String, NodePhase>,
}

/// Parallel dependency-graph scheduler
///
/// Cloning yields a handle onto the same run: `progress()` and `abort()` on
/// a clone observe and control an `execute` in flight on the original.
pub struct WaveScheduler<E, C = SystemClock> {
    config: SchedulerConfig,
    executor: Arc<E>,
    observers: Observers,
    clock: C,
    cancel: CancellationToken,
    run: Arc<Mutex<RunState>>,
}

impl<E, C: Clone> Clone for WaveScheduler<E, C> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            executor: Arc::clone(&self.executor),
            observers: self.observers.clone(),
            clock: self.clock.clone(),
            cancel: self.cancel.clone(),
            run: Arc::clone(&self.run),
        }
    }
}

impl<E: NodeExecutor> WaveScheduler<E> {
    pub fn new(executor: E, config: SchedulerConfig) -> Self {
        Self::with_clock(executor, config, SystemClock)
    }
}

impl<E, C> WaveScheduler<E, C>
where
    E: NodeExecutor,
    C: Clock,
{
    pub fn with_clock(executor: E, config: SchedulerConfig, clock: C) -> Self {
        Self {
            config,
            executor: Arc::new(executor),
            observers: Observers::new(),
            clock,
            cancel: CancellationToken::new(),
            run: Arc::new(Mutex::new(RunState::default())),
        }
    }

    /// Register an observer; observers are notified in registration order
    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Request cooperative cancellation
    ///
    /// No new nodes start after this. In-flight node tasks are cancelled at
    /// their next suspension point and their results discarded; everything
    /// not yet terminal is recorded as skipped.
    pub fn abort(&self) {
        self.cancel.cancel();
    }

    /// Snapshot of the current run's progress
    pub fn progress(&self) -> ExecutionProgress {
        let run = self.run.lock().unwrap_or_else(|e| e.into_inner());
        let mut progress = ExecutionProgress {
            total: run.phases.len(),
            ..ExecutionProgress::default()
        };
        for phase in run.phases.values() {
            match phase {
                NodePhase::Pending => progress.pending += 1,
                NodePhase::Running => progress.running += 1,
                NodePhase::Succeeded => progress.completed += 1,
                NodePhase::Failed => progress.failed += 1,
                NodePhase::Skipped => progress.skipped += 1,
            }
        }
        if progress.total > 0 {
            progress.percentage = (progress.settled() as f64 / progress.total as f64) * 100.0;
        }
        progress
    }

    /// Execute the graph, returning exactly one result per node that reached
    /// a terminal state
    ///
    /// Nodes on a dependency cycle never become ready; the run ends once
    /// nothing is running or ready and those nodes are left without a
    /// result, still `pending` in progress terms.
    pub async fn execute(
        &self,
        nodes: &[WorkflowNode],
        edges: &[WorkflowEdge],
        ctx: &ExecutionContext,
    ) -> Result<HashMap<String, ExecutionResult>, EngineError> {
        let graph = DependencyGraph::build(nodes, edges);
        let node_index: HashMap<&str, &WorkflowNode> =
            nodes.iter().map(|n| (n.id.as_str(), n)).collect();
        {
            let mut run = self.run.lock().unwrap_or_else(|e| e.into_inner());
            run.phases = graph
                .node_ids()
                .iter()
                .map(|id| (id.clone(), NodePhase::Pending))
                .collect();
        }

        let mut in_degree: HashMap<String, usize> = graph
            .node_ids()
            .iter()
            .map(|id| (id.clone(), graph.in_degree(id)))
            .collect();
        let mut ready: VecDeque<String> = graph.roots().into();
        let mut results: HashMap<String, ExecutionResult> = HashMap::new();
        let mut tasks: JoinSet<NodeOutcome> = JoinSet::new();
        let limit = self.config.max_parallel.max(1);

        tracing::info!(
            workflow_id = %ctx.workflow_id,
            nodes = nodes.len(),
            edges = edges.len(),
            max_parallel = limit,
            "starting parallel execution"
        );

        loop {
            // Cancellation is observed before starting new nodes
            if self.cancel.is_cancelled() || ctx.is_cancelled() {
                self.skip_remaining(&graph, &mut results, &mut tasks);
                break;
            }

            while tasks.len() < limit {
                let Some(node_id) = self.pop_ready(&mut ready) else {
                    break;
                };

                let failed_dep = graph.dependencies(&node_id).iter().any(|dep| {
                    matches!(
                        results.get(dep.as_str()).map(|r| r.status),
                        Some(NodeStatus::Error | NodeStatus::Skipped)
                    )
                });
                if failed_dep && !self.config.continue_on_error {
                    let result =
                        ExecutionResult::skipped(&node_id, "Dependency failed", self.clock.now());
                    self.finish_node(&node_id, NodePhase::Skipped, result.status);
                    results.insert(node_id.clone(), result);
                    // Downstream dependents are notified as if it completed
                    Self::advance(&graph, &node_id, &mut in_degree, &mut ready);
                    continue;
                }

                let Some(node) = node_index.get(node_id.as_str()) else {
                    continue;
                };

                let inputs: HashMap<String, Value> = graph
                    .dependencies(&node_id)
                    .iter()
                    .filter_map(|dep| {
                        results
                            .get(dep.as_str())
                            .and_then(|r| r.output.clone())
                            .map(|output| (dep.clone(), output))
                    })
                    .collect();

                self.set_phase(&node_id, NodePhase::Running);
                self.observers.emit(&ExecutionEvent::NodeStarted {
                    node_id: node_id.clone(),
                });
                tasks.spawn(
                    NodeTask {
                        executor: Arc::clone(&self.executor),
                        clock: self.clock.clone(),
                        observers: self.observers.clone(),
                        node: (*node).clone(),
                        inputs,
                        ctx: ctx.clone(),
                        timeout: self.config.node_timeout,
                        attempts: self.config.retry_on_error + 1,
                        retry_delay: self.config.retry_delay,
                    }
                    .run(),
                );
            }

            if tasks.is_empty() {
                // Nothing running and nothing ready: done, or stalled on a cycle
                break;
            }

            let joined = tokio::select! {
                _ = self.cancel.cancelled() => continue,
                _ = ctx.cancelled() => continue,
                joined = tasks.join_next() => joined,
            };
            let Some(joined) = joined else { continue };
            let outcome =
                joined.map_err(|e| EngineError::Execution(format!("node task failed: {e}")))?;

            let result = match outcome.result {
                Ok(output) => ExecutionResult::success(
                    &outcome.node_id,
                    output,
                    outcome.started_at,
                    outcome.finished_at,
                ),
                Err(error) => ExecutionResult::error(
                    &outcome.node_id,
                    error.to_string(),
                    outcome.started_at,
                    outcome.finished_at,
                ),
            };
            let phase = match result.status {
                NodeStatus::Success => NodePhase::Succeeded,
                _ => NodePhase::Failed,
            };
            self.finish_node(&outcome.node_id, phase, result.status);
            results.insert(outcome.node_id.clone(), result);
            Self::advance(&graph, &outcome.node_id, &mut in_degree, &mut ready);
        }

        tracing::info!(
            workflow_id = %ctx.workflow_id,
            settled = results.len(),
            "parallel execution finished"
        );
        Ok(results)
    }

    /// Pop the next ready node, preferring configured priority nodes
    fn pop_ready(&self, ready: &mut VecDeque<String>) -> Option<String> {
        if !self.config.priority_nodes.is_empty() {
            if let Some(pos) = ready
                .iter()
                .position(|id| self.config.priority_nodes.iter().any(|p| p == id))
            {
                return ready.remove(pos);
            }
        }
        ready.pop_front()
    }

    /// Decrement downstream in-degrees; newly unblocked nodes become ready
    fn advance(
        graph: &DependencyGraph,
        node_id: &str,
        in_degree: &mut HashMap<String, usize>,
        ready: &mut VecDeque<String>,
    ) {
        for dependent in graph.dependents(node_id) {
            if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                *degree = degree.saturating_sub(1);
                if *degree == 0 {
                    ready.push_back(dependent.clone());
                }
            }
        }
    }

    /// Mark everything not yet terminal as skipped and drop in-flight tasks
    fn skip_remaining(
        &self,
        graph: &DependencyGraph,
        results: &mut HashMap<String, ExecutionResult>,
        tasks: &mut JoinSet<NodeOutcome>,
    ) {
        tasks.abort_all();
        let now = self.clock.now();
        for node_id in graph.node_ids() {
            if results.contains_key(node_id) {
                continue;
            }
            let result = ExecutionResult::skipped(node_id, "Execution aborted", now);
            self.finish_node(node_id, NodePhase::Skipped, result.status);
            results.insert(node_id.clone(), result);
        }
        tracing::warn!("execution aborted, remaining nodes skipped");
    }

    fn set_phase(&self, node_id: &str, phase: NodePhase) {
        let mut run = self.run.lock().unwrap_or_else(|e| e.into_inner());
        run.phases.insert(node_id.to_string(), phase);
    }

    fn finish_node(&self, node_id: &str, phase: NodePhase, status: NodeStatus) {
        self.set_phase(node_id, phase);
        self.observers.emit(&ExecutionEvent::NodeCompleted {
            node_id: node_id.to_string(),
            status,
        });
    }
}

struct NodeOutcome {
    node_id: String,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    result: Result<Value, EngineError>,
}

/// One node's attempt loop, run as an independent task
struct NodeTask<E, C> {
    executor: Arc<E>,
    clock: C,
    observers: Observers,
    node: WorkflowNode,
    inputs: HashMap<String, Value>,
    ctx: ExecutionContext,
    timeout: Duration,
    attempts: u32,
    retry_delay: Duration,
}

impl<E: NodeExecutor, C: Clock> NodeTask<E, C> {
    async fn run(self) -> NodeOutcome {
        let started_at = self.clock.now();
        let mut attempt = 1u32;
        let result = loop {
            let fut = self.executor.execute(&self.node, &self.inputs, &self.ctx);
            // A callback that resolves after the deadline is discarded
            let outcome = match tokio::time::timeout(self.timeout, fut).await {
                Ok(inner) => inner,
                Err(_) => Err(EngineError::Timeout(self.timeout)),
            };
            match outcome {
                Ok(output) => break Ok(output),
                Err(error) if attempt < self.attempts && error.is_retryable() => {
                    tracing::warn!(
                        node_id = %self.node.id,
                        attempt,
                        error = %error,
                        "node failed, retrying"
                    );
                    self.observers.emit(&ExecutionEvent::StepRetried {
                        execution_id: self.ctx.execution_id.clone(),
                        step_id: self.node.id.clone(),
                        attempt,
                    });
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(error) => break Err(error),
            }
        };
        NodeOutcome {
            node_id: self.node.id,
            started_at,
            finished_at: self.clock.now(),
            result,
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
