use crate::error::DriverError;
use crate::owner::OwnerId;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

/// Callback a driver invokes once per tick.
///
/// `Break` means the subscriber is gone and the driver may drop the subscription.
pub type TickCallback = Arc<dyn Fn() -> ControlFlow<()> + Send + Sync>;

/// Opaque identifier of a registered tick subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickHandle(u64);

impl TickHandle {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u64 {
        self.0
    }
}

/// A periodic callback source owned by the host (game loop, timer thread, runtime).
///
/// Implementations invoke `callback` after `initial_delay` and then every `period`
/// until the host tears the subscription down or a callback returns `Break`.
/// Ticks may arrive on any thread.
pub trait TickDriver: Send + Sync {
    fn subscribe(
        &self,
        owner: OwnerId,
        callback: TickCallback,
        initial_delay: Duration,
        period: Duration,
    ) -> Result<TickHandle, DriverError>;
}

impl<T: TickDriver + ?Sized> TickDriver for Arc<T> {
    fn subscribe(
        &self,
        owner: OwnerId,
        callback: TickCallback,
        initial_delay: Duration,
        period: Duration,
    ) -> Result<TickHandle, DriverError> {
        (**self).subscribe(owner, callback, initial_delay, period)
    }
}

impl<T: TickDriver + ?Sized> TickDriver for &T {
    fn subscribe(
        &self,
        owner: OwnerId,
        callback: TickCallback,
        initial_delay: Duration,
        period: Duration,
    ) -> Result<TickHandle, DriverError> {
        (**self).subscribe(owner, callback, initial_delay, period)
    }
}
