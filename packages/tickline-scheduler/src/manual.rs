use crate::driver::{TickCallback, TickDriver, TickHandle};
use crate::error::DriverError;
use crate::owner::OwnerId;
use parking_lot::Mutex;
use slotmap::{Key, SlotMap, new_key_type};
use smallvec::SmallVec;
use std::ops::ControlFlow;
use std::time::Duration;
use tracing::trace;

new_key_type! {
    struct SubscriptionKey;
}

/// Matches the default scheduler period, so every subscription fires on every tick.
const DEFAULT_TICK_LENGTH: Duration = Duration::from_millis(50);

struct Subscription {
    owner: OwnerId,
    callback: TickCallback,
    first_due: u64,
    period_ticks: u64,
}

impl Subscription {
    fn is_due(&self, now: u64) -> bool {
        now >= self.first_due && (now - self.first_due) % self.period_ticks == 0
    }
}

#[derive(Default)]
struct ManualInner {
    subscriptions: SlotMap<SubscriptionKey, Subscription>,
    elapsed: u64,
}

/// A tick source advanced explicitly by the host or a test.
///
/// Durations are converted to whole ticks of `tick_length`, rounding up. A
/// subscription with zero initial delay first fires on the next [`tick`](Self::tick).
/// Callbacks run after the driver lock is released, so they may subscribe again.
pub struct ManualDriver {
    tick_length: Duration,
    inner: Mutex<ManualInner>,
}

impl Default for ManualDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualDriver {
    pub fn new() -> Self {
        Self::with_tick_length(DEFAULT_TICK_LENGTH)
    }

    pub fn with_tick_length(tick_length: Duration) -> Self {
        Self {
            tick_length: tick_length.max(Duration::from_nanos(1)),
            inner: Mutex::new(ManualInner::default()),
        }
    }

    /// Advance one tick. Returns how many callbacks fired.
    pub fn tick(&self) -> usize {
        let due: SmallVec<[(SubscriptionKey, TickCallback); 4]> = {
            let mut inner = self.inner.lock();
            inner.elapsed += 1;
            let now = inner.elapsed;
            inner
                .subscriptions
                .iter()
                .filter(|(_, sub)| sub.is_due(now))
                .map(|(key, sub)| (key, sub.callback.clone()))
                .collect()
        };
        self.fire(due)
    }

    pub fn tick_n(&self, n: usize) -> usize {
        (0..n).map(|_| self.tick()).sum()
    }

    /// Fire only `owner`'s subscriptions, ignoring pacing and without advancing time.
    pub fn tick_owner(&self, owner: OwnerId) -> usize {
        let due: SmallVec<[(SubscriptionKey, TickCallback); 4]> = self
            .inner
            .lock()
            .subscriptions
            .iter()
            .filter(|(_, sub)| sub.owner == owner)
            .map(|(key, sub)| (key, sub.callback.clone()))
            .collect();
        self.fire(due)
    }

    fn fire(&self, due: SmallVec<[(SubscriptionKey, TickCallback); 4]>) -> usize {
        let mut released: SmallVec<[SubscriptionKey; 4]> = SmallVec::new();
        for (key, callback) in &due {
            if callback().is_break() {
                released.push(*key);
            }
        }

        if !released.is_empty() {
            let mut inner = self.inner.lock();
            for key in released {
                if let Some(sub) = inner.subscriptions.remove(key) {
                    trace!(owner = %sub.owner, "manual subscription released");
                }
            }
        }
        due.len()
    }

    pub fn subscription_count(&self) -> usize {
        self.inner.lock().subscriptions.len()
    }

    pub fn elapsed_ticks(&self) -> u64 {
        self.inner.lock().elapsed
    }

    fn ticks_for(&self, duration: Duration) -> u64 {
        let len = self.tick_length.as_nanos();
        let ticks = duration.as_nanos().div_ceil(len);
        u64::try_from(ticks).unwrap_or(u64::MAX)
    }
}

impl TickDriver for ManualDriver {
    fn subscribe(
        &self,
        owner: OwnerId,
        callback: TickCallback,
        initial_delay: Duration,
        period: Duration,
    ) -> Result<TickHandle, DriverError> {
        let delay_ticks = self.ticks_for(initial_delay);
        let period_ticks = self.ticks_for(period).max(1);

        let mut inner = self.inner.lock();
        let first_due = inner.elapsed.saturating_add(delay_ticks).saturating_add(1);
        let key = inner.subscriptions.insert(Subscription {
            owner,
            callback,
            first_due,
            period_ticks,
        });
        trace!(%owner, first_due, period_ticks, "manual subscription added");

        Ok(TickHandle::new(key.data().as_ffi()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, TickCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let cb_count = count.clone();
        let callback: TickCallback = Arc::new(move || {
            cb_count.fetch_add(1, Ordering::SeqCst);
            ControlFlow::Continue(())
        });
        (count, callback)
    }

    #[test]
    fn honours_delay_and_period() {
        let driver = ManualDriver::with_tick_length(Duration::from_millis(10));
        let (count, callback) = counter();
        driver
            .subscribe(
                OwnerId::unique(),
                callback,
                Duration::from_millis(20),
                Duration::from_millis(30),
            )
            .unwrap();

        // Due at ticks 3, 6, 9.
        let fired: Vec<usize> = (0..9)
            .map(|_| {
                driver.tick();
                count.load(Ordering::SeqCst)
            })
            .collect();
        assert_eq!(fired, vec![0, 0, 1, 1, 1, 2, 2, 2, 3]);
        assert_eq!(driver.elapsed_ticks(), 9);
    }

    #[test]
    fn tick_owner_fires_only_that_owner() {
        let driver = ManualDriver::new();
        let a = OwnerId::unique();
        let (count_a, cb_a) = counter();
        let (count_b, cb_b) = counter();
        driver.subscribe(a, cb_a, Duration::ZERO, Duration::from_millis(50)).unwrap();
        driver
            .subscribe(OwnerId::unique(), cb_b, Duration::ZERO, Duration::from_millis(50))
            .unwrap();

        assert_eq!(driver.tick_owner(a), 1);
        assert_eq!(count_a.load(Ordering::SeqCst), 1);
        assert_eq!(count_b.load(Ordering::SeqCst), 0);
        assert_eq!(driver.elapsed_ticks(), 0);
        assert_eq!(driver.subscription_count(), 2);
    }

    #[test]
    fn handles_are_distinct() {
        let driver = ManualDriver::new();
        let owner = OwnerId::unique();
        let (_, cb) = counter();
        let h1 = driver.subscribe(owner, cb.clone(), Duration::ZERO, Duration::ZERO).unwrap();
        let h2 = driver.subscribe(owner, cb, Duration::ZERO, Duration::ZERO).unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn break_releases_the_subscription() {
        let driver = ManualDriver::new();
        let count = Arc::new(AtomicUsize::new(0));
        let cb_count = count.clone();
        let callback: TickCallback = Arc::new(move || {
            if cb_count.fetch_add(1, Ordering::SeqCst) == 1 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        driver
            .subscribe(OwnerId::unique(), callback, Duration::ZERO, Duration::from_millis(50))
            .unwrap();

        assert_eq!(driver.tick(), 1);
        assert_eq!(driver.subscription_count(), 1);
        assert_eq!(driver.tick(), 1);
        assert_eq!(driver.subscription_count(), 0);
        assert_eq!(driver.tick(), 0);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
