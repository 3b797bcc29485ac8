//! Behavioral specifications for the riptide workflow engine.
//!
//! These tests are black-box: they exercise the public API of the engine
//! crates together, the way an embedding application would.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/config.rs"]
mod config;
#[path = "specs/durable.rs"]
mod durable;
#[path = "specs/saga.rs"]
mod saga;
#[path = "specs/scheduler.rs"]
mod scheduler;
