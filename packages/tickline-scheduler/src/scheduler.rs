use crate::config::SchedulerConfig;
use crate::driver::{TickCallback, TickDriver, TickHandle};
use crate::error::{SchedulerError, TaskFault};
use crate::owner::OwnerId;
use crate::registry::StateRegistry;
use crate::snapshot::SchedulerSnapshot;
use crate::state::{AdvanceOutcome, SchedulerState};
use crate::task::{self, Sequence};
use std::fmt;
use std::ops::ControlFlow;
use std::sync::{Arc, Weak};

/// Public handle on one owner's task stream.
///
/// Every scheduler built for the same owner on the same registry shares one
/// state and one tick subscription. Clones are cheap and can be moved into
/// work items to queue follow-up tasks.
#[derive(Clone)]
pub struct Scheduler {
    state: Arc<SchedulerState>,
}

impl Scheduler {
    /// Bind to `owner` with the default pacing (no delay, one tick every 50 ms).
    pub fn new<D>(
        owner: OwnerId,
        registry: &StateRegistry,
        driver: &D,
    ) -> Result<Self, SchedulerError>
    where
        D: TickDriver + ?Sized,
    {
        Self::with_config(owner, registry, driver, &SchedulerConfig::default())
    }

    /// Bind to `owner`. The first successful construction per owner subscribes the
    /// advance-step with `driver`; later constructions reuse that subscription.
    pub fn with_config<D>(
        owner: OwnerId,
        registry: &StateRegistry,
        driver: &D,
        config: &SchedulerConfig,
    ) -> Result<Self, SchedulerError>
    where
        D: TickDriver + ?Sized,
    {
        config.validate()?;

        let state = registry.get_or_create(owner);
        state.subscribe_once(|| {
            driver.subscribe(
                owner,
                advance_callback(&state),
                config.initial_delay,
                config.period,
            )
        })?;

        Ok(Self { state })
    }

    /// Append `work` to the owner's stream and return its sequence number.
    ///
    /// Never runs `work` here and never waits for a running task.
    pub fn queue<F>(&self, work: F) -> Sequence
    where
        F: FnOnce() + Send + 'static,
    {
        self.state.enqueue(task::infallible(work))
    }

    /// Like [`queue`](Self::queue), for work that reports failure through `Err`.
    pub fn queue_fallible<F, E>(&self, work: F) -> Sequence
    where
        F: FnOnce() -> Result<(), E> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        self.state.enqueue(task::fallible(work))
    }

    /// Replace the start hook, called with each sequence right before it runs.
    pub fn on_task_start<F>(&self, hook: F)
    where
        F: Fn(Sequence) + Send + Sync + 'static,
    {
        self.state.set_on_start(Arc::new(hook));
    }

    /// Replace the completion hook, called with each sequence once it finished.
    pub fn on_task_complete<F>(&self, hook: F)
    where
        F: Fn(Sequence) + Send + Sync + 'static,
    {
        self.state.set_on_complete(Arc::new(hook));
    }

    /// Replace the fault hook. Faults are logged whether or not a hook is set.
    pub fn on_task_fault<F>(&self, hook: F)
    where
        F: Fn(&TaskFault) + Send + Sync + 'static,
    {
        self.state.set_on_fault(Arc::new(hook));
    }

    /// Sequence of the last finished task, 0 if nothing ran yet.
    pub fn current_task(&self) -> Sequence {
        self.state.completed()
    }

    pub fn has_more_tasks(&self) -> bool {
        self.state.has_next()
    }

    pub fn pending_count(&self) -> usize {
        self.state.pending_count()
    }

    pub fn owner(&self) -> OwnerId {
        self.state.owner()
    }

    pub fn tick_handle(&self) -> Option<TickHandle> {
        self.state.tick_handle()
    }

    /// Run one advance-step now, exactly as a tick would.
    pub fn advance(&self) -> AdvanceOutcome {
        self.state.advance()
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        self.state.snapshot()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("owner", &self.state.owner())
            .field("completed", &self.state.completed())
            .field("pending", &self.state.pending_count())
            .finish()
    }
}

/// The driver only keeps a weak reference. Once the registry and all schedulers
/// are dropped the callback asks the driver to release the subscription.
fn advance_callback(state: &Arc<SchedulerState>) -> TickCallback {
    let weak: Weak<SchedulerState> = Arc::downgrade(state);
    Arc::new(move || match weak.upgrade() {
        Some(state) => {
            state.advance();
            ControlFlow::Continue(())
        }
        None => ControlFlow::Break(()),
    })
}
