// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! riptide-storage: persistence adapter contract and reference adapter
//!
//! This crate provides:
//! - The `StateStore` trait the engines persist through
//! - `MemoryStore`, the in-memory reference adapter with copy-on-write
//!   snapshot semantics

pub mod adapter;
pub mod memory;

pub use adapter::{StateStore, StorageError};
pub use memory::MemoryStore;
