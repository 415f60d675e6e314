//! Domain model (ids, task types, specs, records, errors).

pub mod errors;
pub mod ids;
pub mod record;
pub mod spec;
pub mod task_type;

pub use errors::{CoordError, ErrorKind, Result};
pub use ids::TaskId;
pub use record::TaskRecord;
pub use spec::TaskSpec;
pub use task_type::TaskType;
