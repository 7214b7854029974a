use crate::driver::TickHandle;
use crate::error::{DriverError, FaultKind, TaskFault};
use crate::owner::OwnerId;
use crate::queue::PendingQueue;
use crate::snapshot::SchedulerSnapshot;
use crate::task::{Sequence, Work, panic_message};
use parking_lot::Mutex;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// Observer of a single sequence number (start or completion).
pub type TaskHook = Arc<dyn Fn(Sequence) + Send + Sync>;

/// Observer of faulted work items.
pub type FaultHook = Arc<dyn Fn(&TaskFault) + Send + Sync>;

/// What a single advance-step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// No record exists for `completed + 1`.
    Idle,
    /// Another advance-step for this owner is still running.
    Busy,
    /// The task ran and returned normally.
    Ran(Sequence),
    /// The task faulted; its sequence is still counted as completed.
    Faulted(Sequence),
}

impl AdvanceOutcome {
    /// Sequence number that was executed, if any.
    pub fn sequence(&self) -> Option<Sequence> {
        match self {
            AdvanceOutcome::Ran(seq) | AdvanceOutcome::Faulted(seq) => Some(*seq),
            AdvanceOutcome::Idle | AdvanceOutcome::Busy => None,
        }
    }
}

#[derive(Default)]
struct StateInner {
    pending: PendingQueue,
    completed: Sequence,
    on_start: Option<TaskHook>,
    on_complete: Option<TaskHook>,
    on_fault: Option<FaultHook>,
    executed: u64,
    faulted: u64,
}

/// Mutable scheduling state of one owner.
///
/// `inner` is only held for short bookkeeping sections. `lane` is held for a whole
/// advance-step, so work and hooks run without `inner` locked and may call back
/// into the state (re-entrant `queue`, introspection).
pub struct SchedulerState {
    owner: OwnerId,
    inner: Mutex<StateInner>,
    lane: Mutex<()>,
    tick_handle: Mutex<Option<TickHandle>>,
}

impl SchedulerState {
    pub(crate) fn new(owner: OwnerId) -> Self {
        Self {
            owner,
            inner: Mutex::new(StateInner::default()),
            lane: Mutex::new(()),
            tick_handle: Mutex::new(None),
        }
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    pub(crate) fn enqueue(&self, work: Work) -> Sequence {
        let sequence = self.inner.lock().pending.push(work);
        trace!(owner = %self.owner, sequence, "queued task");
        sequence
    }

    pub(crate) fn set_on_start(&self, hook: TaskHook) {
        self.inner.lock().on_start = Some(hook);
    }

    pub(crate) fn set_on_complete(&self, hook: TaskHook) {
        self.inner.lock().on_complete = Some(hook);
    }

    pub(crate) fn set_on_fault(&self, hook: FaultHook) {
        self.inner.lock().on_fault = Some(hook);
    }

    /// Sequence of the last finished task, 0 before anything ran.
    pub fn completed(&self) -> Sequence {
        self.inner.lock().completed
    }

    /// Whether the record for `completed + 1` is waiting.
    pub fn has_next(&self) -> bool {
        let inner = self.inner.lock();
        inner.pending.contains(inner.completed + 1)
    }

    pub fn pending_count(&self) -> usize {
        self.inner.lock().pending.len()
    }

    pub fn tick_handle(&self) -> Option<TickHandle> {
        *self.tick_handle.lock()
    }

    /// Store the subscription produced by `subscribe` unless one already exists.
    ///
    /// The slot lock is held across `subscribe`, so concurrent first constructions
    /// register exactly once. A failed attempt leaves the slot empty for a retry.
    pub(crate) fn subscribe_once<F>(&self, subscribe: F) -> Result<TickHandle, DriverError>
    where
        F: FnOnce() -> Result<TickHandle, DriverError>,
    {
        let mut slot = self.tick_handle.lock();
        if let Some(handle) = *slot {
            return Ok(handle);
        }

        let handle = subscribe()?;
        *slot = Some(handle);
        info!(owner = %self.owner, handle = handle.raw(), "registered tick subscription");
        Ok(handle)
    }

    /// Run at most one task: the one numbered `completed + 1`.
    pub fn advance(&self) -> AdvanceOutcome {
        let Some(_lane) = self.lane.try_lock() else {
            trace!(owner = %self.owner, "advance already in flight, skipping tick");
            return AdvanceOutcome::Busy;
        };

        let (record, on_start) = {
            let mut inner = self.inner.lock();
            let next = inner.completed + 1;
            match inner.pending.take(next) {
                Some(record) => (record, inner.on_start.clone()),
                None => return AdvanceOutcome::Idle,
            }
        };

        let sequence = record.sequence();
        debug!(owner = %self.owner, sequence, "running task");

        if let Some(hook) = on_start {
            self.call_hook("on_task_start", &hook, sequence);
        }

        let result = record.run();

        let (on_complete, on_fault) = {
            let mut inner = self.inner.lock();
            inner.completed = sequence;
            inner.executed += 1;
            if result.is_err() {
                inner.faulted += 1;
            }
            (inner.on_complete.clone(), inner.on_fault.clone())
        };

        let outcome = match result {
            Ok(()) => AdvanceOutcome::Ran(sequence),
            Err(kind) => {
                self.report_fault(sequence, kind, on_fault);
                AdvanceOutcome::Faulted(sequence)
            }
        };

        if let Some(hook) = on_complete {
            self.call_hook("on_task_complete", &hook, sequence);
        }

        outcome
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        let subscribed = self.tick_handle.lock().is_some();
        let inner = self.inner.lock();
        SchedulerSnapshot {
            owner: self.owner,
            completed: inner.completed,
            pending: inner.pending.len(),
            last_assigned: inner.pending.last_assigned(),
            subscribed,
            executed: inner.executed,
            faulted: inner.faulted,
        }
    }

    fn call_hook(&self, name: &'static str, hook: &TaskHook, sequence: Sequence) {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| hook(sequence))) {
            warn!(
                owner = %self.owner,
                sequence,
                hook = name,
                "hook panicked: {}",
                panic_message(payload.as_ref())
            );
        }
    }

    fn report_fault(&self, sequence: Sequence, kind: FaultKind, hook: Option<FaultHook>) {
        let fault = TaskFault {
            owner: self.owner,
            sequence,
            kind,
        };
        error!(owner = %fault.owner, sequence, "task faulted: {}", fault.kind);

        if let Some(hook) = hook {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| hook(&fault))) {
                warn!(
                    owner = %self.owner,
                    sequence,
                    hook = "on_task_fault",
                    "hook panicked: {}",
                    panic_message(payload.as_ref())
                );
            }
        }
    }
}
