use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::time::Duration;
use tickline_scheduler::{
    DriverError, MAX_PACING, OwnerId, TickCallback, TickDriver, TickHandle,
};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// `tokio::time::interval` rejects a zero period.
const MIN_PERIOD: Duration = Duration::from_millis(1);
/// Keeps interval deadlines inside tokio's `Instant` range.
const MAX_PERIOD: Duration = MAX_PACING;

#[derive(Default)]
struct TokioInner {
    next_id: u64,
    tasks: FxHashMap<u64, JoinHandle<()>>,
    shut_down: bool,
}

/// Tick source backed by tokio timers.
///
/// One task per subscription. Callbacks run on the blocking pool and each one is
/// awaited before the next tick, so a subscription never overlaps itself. The
/// task ends when its callback returns `Break`.
pub struct TokioDriver {
    handle: Handle,
    inner: Mutex<TokioInner>,
}

impl TokioDriver {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            inner: Mutex::new(TokioInner::default()),
        }
    }

    /// Bind to the runtime of the calling context, if there is one.
    pub fn from_current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }

    /// Number of tick tasks still running.
    pub fn subscription_count(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.tasks.retain(|_, task| !task.is_finished());
        inner.tasks.len()
    }

    /// Abort every tick task. Later subscriptions fail.
    pub fn shutdown(&self) {
        let mut inner = self.inner.lock();
        inner.shut_down = true;
        for (id, task) in inner.tasks.drain() {
            task.abort();
            debug!(id, "tick task aborted");
        }
    }
}

impl Drop for TokioDriver {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl TickDriver for TokioDriver {
    fn subscribe(
        &self,
        owner: OwnerId,
        callback: TickCallback,
        initial_delay: Duration,
        period: Duration,
    ) -> Result<TickHandle, DriverError> {
        let mut inner = self.inner.lock();
        if inner.shut_down {
            return Err(DriverError::ShutDown);
        }
        inner.tasks.retain(|_, task| !task.is_finished());

        let period = period.clamp(MIN_PERIOD, MAX_PERIOD);
        let task = self.handle.spawn(async move {
            tokio::time::sleep(initial_delay).await;

            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let callback = callback.clone();
                match tokio::task::spawn_blocking(move || callback()).await {
                    Ok(flow) if flow.is_break() => break,
                    Ok(_) => {}
                    Err(err) => warn!(%owner, "tick callback failed: {err}"),
                }
            }
            debug!(%owner, "subscriber released");
        });

        inner.next_id += 1;
        let id = inner.next_id;
        inner.tasks.insert(id, task);
        debug!(%owner, id, ?period, "tick task spawned");

        Ok(TickHandle::new(id))
    }
}
