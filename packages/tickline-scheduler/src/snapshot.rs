use crate::owner::OwnerId;
use crate::task::Sequence;
use serde::Serialize;

/// Point-in-time view of one owner's scheduling state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulerSnapshot {
    pub owner: OwnerId,
    /// Last finished sequence.
    pub completed: Sequence,
    /// Records waiting to run.
    pub pending: usize,
    /// Highest sequence handed out by `queue`.
    pub last_assigned: Sequence,
    /// Whether a tick subscription is registered.
    pub subscribed: bool,
    pub executed: u64,
    pub faulted: u64,
}
