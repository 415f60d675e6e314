//! Ports - the seams between the coordinator and the outside world.
//!
//! - `SharedStore`: the networked store all workers share (Redis-shaped)
//! - `Clock` / `IdGenerator`: id minting, swappable in tests

pub mod clock;
pub mod id_generator;
pub mod store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::store::{Op, Reply, SharedStore, StoreError, StoreExt};
