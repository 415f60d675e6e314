//! Impls - port implementations.
//!
//! - **InMemoryStore**: in-process `SharedStore`, used by the CLI demo and tests
//!
//! Adapters for a real networked store belong in their own crate.

pub mod inmem_store;

pub use self::inmem_store::InMemoryStore;
