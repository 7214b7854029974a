//! Per-owner FIFO task sequencing driven by an external tick source.
//!
//! A host binds a [`Scheduler`] to an [`OwnerId`] and queues work on it. Each
//! tick from the host's [`TickDriver`] runs at most one task, strictly in
//! submission order, on a single logical lane per owner. Distinct owners are
//! independent of each other.

pub mod config;
pub mod driver;
pub mod error;
pub mod global;
pub mod manual;
pub mod owner;
pub mod queue;
pub mod registry;
pub mod scheduler;
pub mod snapshot;
pub mod state;
pub mod task;

pub use config::{MAX_PACING, SchedulerConfig};
pub use driver::{TickCallback, TickDriver, TickHandle};
pub use error::{BoxError, DriverError, FaultKind, SchedulerError, TaskFault};
pub use global::GlobalScheduler;
pub use manual::ManualDriver;
pub use owner::OwnerId;
pub use registry::StateRegistry;
pub use scheduler::Scheduler;
pub use snapshot::SchedulerSnapshot;
pub use state::{AdvanceOutcome, FaultHook, SchedulerState, TaskHook};
pub use task::{Sequence, TaskRecord};
