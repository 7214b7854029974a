use crate::owner::OwnerId;
use crate::task::Sequence;
use thiserror::Error;

/// Boxed error returned by fallible work items.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("tick driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("invalid scheduler config: {0}")]
    InvalidConfig(String),
}

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("tick driver rejected subscription for {owner}: {reason}")]
    Rejected { owner: OwnerId, reason: String },

    #[error("failed to spawn tick source: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("tick driver has been shut down")]
    ShutDown,
}

/// How a work item failed.
#[derive(Error, Debug)]
pub enum FaultKind {
    #[error("panicked: {0}")]
    Panicked(String),

    #[error("failed: {0}")]
    Failed(#[source] BoxError),
}

/// A work item that faulted while running. Its sequence still counts as completed.
#[derive(Error, Debug)]
#[error("task {sequence} of {owner} {kind}")]
pub struct TaskFault {
    pub owner: OwnerId,
    pub sequence: Sequence,
    #[source]
    pub kind: FaultKind,
}
