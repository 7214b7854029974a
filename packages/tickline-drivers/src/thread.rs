use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::ops::ControlFlow;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tickline_scheduler::{DriverError, OwnerId, TickCallback, TickDriver, TickHandle};
use tracing::{debug, warn};

/// Shortest period a thread will be paced at.
const MIN_PERIOD: Duration = Duration::from_millis(1);

struct ThreadSubscription {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

#[derive(Default)]
struct ThreadInner {
    next_id: u64,
    subscriptions: FxHashMap<u64, ThreadSubscription>,
    shut_down: bool,
}

/// Tick source backed by one dedicated OS thread per subscription.
///
/// Each thread sleeps `initial_delay`, then invokes its callback every `period`
/// until [`shutdown`](Self::shutdown), drop, or the callback returns `Break`.
/// Pacing is deadline based, so a slow callback delays the next tick instead of
/// overlapping it. A deadline past what `Instant` can represent is never reached;
/// the thread then idles until shutdown.
#[derive(Default)]
pub struct ThreadDriver {
    inner: Mutex<ThreadInner>,
}

impl ThreadDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tick threads still running.
    pub fn subscription_count(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.subscriptions.retain(|_, sub| !sub.thread.is_finished());
        inner.subscriptions.len()
    }

    /// Stop every tick thread and wait for them to exit. Later subscriptions fail.
    pub fn shutdown(&self) {
        let subscriptions: Vec<ThreadSubscription> = {
            let mut inner = self.inner.lock();
            inner.shut_down = true;
            inner.subscriptions.drain().map(|(_, sub)| sub).collect()
        };

        for sub in &subscriptions {
            sub.stop.store(true, Ordering::SeqCst);
            sub.thread.thread().unpark();
        }

        let current = thread::current().id();
        for sub in subscriptions {
            // A callback shutting down its own driver cannot join itself.
            if sub.thread.thread().id() == current {
                continue;
            }
            if sub.thread.join().is_err() {
                warn!("tick thread exited with a panic");
            }
        }
    }
}

impl Drop for ThreadDriver {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl TickDriver for ThreadDriver {
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
        inner.subscriptions.retain(|_, sub| !sub.thread.is_finished());

        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();
        let period = period.max(MIN_PERIOD);
        let thread = thread::Builder::new()
            .name(format!("tickline-{owner}"))
            .spawn(move || run_ticks(owner, &thread_stop, &callback, initial_delay, period))?;

        inner.next_id += 1;
        let id = inner.next_id;
        inner
            .subscriptions
            .insert(id, ThreadSubscription { stop, thread });
        debug!(%owner, id, ?period, "tick thread started");

        Ok(TickHandle::new(id))
    }
}

fn run_ticks(
    owner: OwnerId,
    stop: &AtomicBool,
    callback: &TickCallback,
    initial_delay: Duration,
    period: Duration,
) {
    let mut deadline = Instant::now().checked_add(initial_delay);
    loop {
        if deadline.is_none() {
            warn!(%owner, "tick deadline out of range; idling until shutdown");
        }
        if !wait_until(deadline, stop) {
            break;
        }
        let flow = catch_unwind(AssertUnwindSafe(|| callback())).unwrap_or_else(|_| {
            warn!(%owner, "tick callback panicked");
            ControlFlow::Continue(())
        });
        if flow.is_break() {
            debug!(%owner, "subscriber released");
            break;
        }
        // Fell behind; resume pacing from now rather than bursting.
        let now = Instant::now();
        deadline = deadline
            .and_then(|d| d.checked_add(period))
            .map(|d| d.max(now));
    }
    debug!(%owner, "tick thread stopped");
}

/// Park until `deadline`, or indefinitely when there is none. Returns `false`
/// once `stop` is set.
fn wait_until(deadline: Option<Instant>, stop: &AtomicBool) -> bool {
    loop {
        if stop.load(Ordering::SeqCst) {
            return false;
        }
        match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return true;
                }
                thread::park_timeout(deadline - now);
            }
            None => thread::park(),
        }
    }
}
