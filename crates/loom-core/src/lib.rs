//! loom-core
//!
//! Coordinates interdependent tasks across independent workers using a
//! shared store as the only communication channel.
//!
//! # Modules
//! - **domain**: ids, task types, specs, records, errors
//! - **ports**: `SharedStore` adapter trait, clock, id generation
//! - **impls**: `InMemoryStore`
//! - **keys**: store key layout
//! - **coord**: `Coordinator` (schedule / wait / complete / shutdown / query)
//! - **config**: `CoordinatorConfig`
//! - **observability**: queue counts

pub mod config;
pub mod coord;
pub mod domain;
pub mod impls;
pub mod keys;
pub mod observability;
pub mod ports;

pub use config::CoordinatorConfig;
pub use coord::Coordinator;
pub use domain::{CoordError, ErrorKind, Result, TaskId, TaskRecord, TaskSpec, TaskType};
pub use impls::InMemoryStore;
pub use observability::QueueCounts;
pub use ports::{SharedStore, StoreError};
