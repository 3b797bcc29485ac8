// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! riptide-engine: the workflow execution engines
//!
//! Three cooperating execution strategies over one node/edge data model:
//! - `WaveScheduler` runs independent nodes concurrently, respecting data
//!   dependencies, with per-node timeout, retry, and priority ordering
//! - `DurableEngine` runs steps sequentially, persisting a checkpoint after
//!   every step and recovering in-flight executions on start-up
//! - `SagaRunner` runs ordered steps with compensating actions invoked on
//!   failure under a selectable ordering strategy
//!
//! Node business logic lives behind the `NodeExecutor` callback; persistence
//! lives behind `riptide_storage::StateStore`. The engines own neither.

pub mod durable;
pub mod error;
pub mod executor;
pub mod fake;
pub mod saga;
pub mod scheduler;

pub use durable::DurableEngine;
pub use error::EngineError;
pub use executor::NodeExecutor;
pub use fake::FakeExecutor;
pub use saga::{
    CompensationStrategy, SagaContext, SagaDefinition, SagaRunner, SagaStep,
};
pub use scheduler::{SchedulerConfig, WaveScheduler};
