use crate::error::{BoxError, FaultKind};
use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

/// 1-based, strictly increasing per-owner task number.
pub type Sequence = u64;

/// Type-erased work item. Infallible work is wrapped to return `Ok(())`.
pub type Work = Box<dyn FnOnce() -> Result<(), BoxError> + Send + 'static>;

/// A queued unit of work and the sequence number it was assigned at enqueue time.
pub struct TaskRecord {
    sequence: Sequence,
    work: Work,
}

impl TaskRecord {
    pub fn new(sequence: Sequence, work: Work) -> Self {
        Self { sequence, work }
    }

    pub fn sequence(&self) -> Sequence {
        self.sequence
    }

    /// Run the work to completion. Panics and returned errors both become a [`FaultKind`].
    ///
    /// A panic still passes through the process panic hook before it is caught,
    /// so with the default hook it is printed to stderr as well as reported as a
    /// fault. Hosts that want one report per panic install their own hook with
    /// [`std::panic::set_hook`].
    pub fn run(self) -> Result<(), FaultKind> {
        match catch_unwind(AssertUnwindSafe(self.work)) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(FaultKind::Failed(err)),
            Err(payload) => Err(FaultKind::Panicked(panic_message(payload.as_ref()))),
        }
    }
}

impl fmt::Debug for TaskRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRecord")
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

pub(crate) fn infallible<F>(work: F) -> Work
where
    F: FnOnce() + Send + 'static,
{
    Box::new(move || {
        work();
        Ok(())
    })
}

pub(crate) fn fallible<F, E>(work: F) -> Work
where
    F: FnOnce() -> Result<(), E> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    Box::new(move || work().map_err(|err| Box::new(err) as BoxError))
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
