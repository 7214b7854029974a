use crate::config::SchedulerConfig;
use crate::driver::TickDriver;
use crate::error::SchedulerError;
use crate::owner::OwnerId;
use crate::registry::StateRegistry;
use crate::scheduler::Scheduler;
use crate::snapshot::SchedulerSnapshot;
use crate::task::Sequence;

/// One shared queue and counter for cross-cutting dispatch.
///
/// This is a [`Scheduler`] bound to [`OwnerId::GLOBAL`] with the hooks and the
/// has-more query left out. Every instance built on the same registry feeds the
/// same lane. Faults are still logged.
#[derive(Debug, Clone)]
pub struct GlobalScheduler {
    inner: Scheduler,
}

impl GlobalScheduler {
    pub fn new<D>(registry: &StateRegistry, driver: &D) -> Result<Self, SchedulerError>
    where
        D: TickDriver + ?Sized,
    {
        Self::with_config(registry, driver, &SchedulerConfig::default())
    }

    pub fn with_config<D>(
        registry: &StateRegistry,
        driver: &D,
        config: &SchedulerConfig,
    ) -> Result<Self, SchedulerError>
    where
        D: TickDriver + ?Sized,
    {
        let inner = Scheduler::with_config(OwnerId::GLOBAL, registry, driver, config)?;
        Ok(Self { inner })
    }

    pub fn queue<F>(&self, work: F) -> Sequence
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.queue(work)
    }

    pub fn queue_fallible<F, E>(&self, work: F) -> Sequence
    where
        F: FnOnce() -> Result<(), E> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        self.inner.queue_fallible(work)
    }

    pub fn current_task(&self) -> Sequence {
        self.inner.current_task()
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        self.inner.snapshot()
    }
}
