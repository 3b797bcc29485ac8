// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! riptide-core: Core library for the riptide workflow execution engine
//!
//! This crate provides:
//! - The node/edge data model shared by every execution strategy
//! - Dependency graph construction and parallel-group analysis
//! - Durable execution state, steps, and checkpoints
//! - Retry/backoff policy and execution lifecycle events

pub mod clock;
pub mod id;

pub mod context;
pub mod event;
pub mod graph;
pub mod node;
pub mod result;
pub mod retry;
pub mod state;

// Re-exports
pub use clock::{Clock, FakeClock, SystemClock};
pub use context::ExecutionContext;
pub use event::{ExecutionEvent, Observer, Observers, RecordingObserver, TracingObserver};
pub use graph::{max_parallelism, parallel_groups, DependencyGraph};
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use node::{WorkflowEdge, WorkflowNode};
pub use result::{ExecutionProgress, ExecutionResult, NodeStatus};
pub use retry::{BackoffKind, RetryPolicy};
pub use state::{Checkpoint, DurableStep, RunStatus, StepStatus, WorkflowState};
