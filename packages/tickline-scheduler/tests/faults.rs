use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tickline_scheduler::{
    AdvanceOutcome, DriverError, FaultKind, ManualDriver, OwnerId, Scheduler, SchedulerConfig,
    SchedulerError, StateRegistry, TickCallback, TickDriver, TickHandle,
};

#[derive(Debug)]
struct QuotaExceeded;

impl fmt::Display for QuotaExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "quota exceeded")
    }
}

impl std::error::Error for QuotaExceeded {}

#[test]
fn test_panicking_task_still_advances() {
    let registry = StateRegistry::new();
    let driver = ManualDriver::new();
    let scheduler = Scheduler::new(OwnerId::unique(), &registry, &driver).unwrap();
    let faults = Arc::new(Mutex::new(Vec::new()));
    let completed = Arc::new(Mutex::new(Vec::new()));
    let third_ran = Arc::new(AtomicBool::new(false));

    {
        let faults = faults.clone();
        scheduler.on_task_fault(move |fault| {
            faults
                .lock()
                .unwrap()
                .push((fault.sequence, fault.kind.to_string()));
        });
    }
    {
        let completed = completed.clone();
        scheduler.on_task_complete(move |seq| completed.lock().unwrap().push(seq));
    }

    scheduler.queue(|| {});
    scheduler.queue(|| panic!("broken item"));
    {
        let third_ran = third_ran.clone();
        scheduler.queue(move || third_ran.store(true, Ordering::SeqCst));
    }

    driver.tick_n(2);
    assert_eq!(scheduler.current_task(), 2);
    assert!(!third_ran.load(Ordering::SeqCst));
    assert_eq!(
        *faults.lock().unwrap(),
        vec![(2, "panicked: broken item".to_string())]
    );

    driver.tick();
    assert_eq!(scheduler.current_task(), 3);
    assert!(third_ran.load(Ordering::SeqCst));
    assert_eq!(*completed.lock().unwrap(), vec![1, 2, 3]);

    let snap = scheduler.snapshot();
    assert_eq!(snap.executed, 3);
    assert_eq!(snap.faulted, 1);
}

#[test]
fn test_failed_task_reports_error() {
    let registry = StateRegistry::new();
    let driver = ManualDriver::new();
    let scheduler = Scheduler::new(OwnerId::unique(), &registry, &driver).unwrap();
    let reported = Arc::new(Mutex::new(None));

    {
        let reported = reported.clone();
        scheduler.on_task_fault(move |fault| {
            let is_failed = matches!(fault.kind, FaultKind::Failed(_));
            *reported.lock().unwrap() = Some((fault.sequence, is_failed, fault.to_string()));
        });
    }

    scheduler.queue_fallible(|| Err(QuotaExceeded));
    scheduler.queue_fallible(|| Ok::<(), QuotaExceeded>(()));

    assert_eq!(scheduler.advance(), AdvanceOutcome::Faulted(1));
    assert_eq!(scheduler.advance(), AdvanceOutcome::Ran(2));

    let (sequence, is_failed, message) = reported.lock().unwrap().clone().unwrap();
    assert_eq!(sequence, 1);
    assert!(is_failed);
    assert!(message.contains("failed: quota exceeded"));
}

#[test]
fn test_panicking_hook_does_not_stall_queue() {
    let registry = StateRegistry::new();
    let driver = ManualDriver::new();
    let scheduler = Scheduler::new(OwnerId::unique(), &registry, &driver).unwrap();
    let runs = Arc::new(AtomicUsize::new(0));

    scheduler.on_task_start(|_| panic!("bad observer"));
    for _ in 0..2 {
        let runs = runs.clone();
        scheduler.queue(move || {
            runs.fetch_add(1, Ordering::SeqCst);
        });
    }

    driver.tick_n(2);
    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert_eq!(scheduler.current_task(), 2);
}

/// Rejects the first `failures` subscriptions, then delegates to a manual driver.
struct FlakyDriver {
    failures: AtomicUsize,
    inner: ManualDriver,
}

impl TickDriver for FlakyDriver {
    fn subscribe(
        &self,
        owner: OwnerId,
        callback: TickCallback,
        initial_delay: Duration,
        period: Duration,
    ) -> Result<TickHandle, DriverError> {
        if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(DriverError::Rejected {
                owner,
                reason: "host not ready".to_string(),
            });
        }
        self.inner.subscribe(owner, callback, initial_delay, period)
    }
}

#[test]
fn test_rejected_subscription_is_retried() {
    let registry = StateRegistry::new();
    let driver = FlakyDriver {
        failures: AtomicUsize::new(1),
        inner: ManualDriver::new(),
    };
    let owner = OwnerId::unique();

    let err = Scheduler::new(owner, &registry, &driver).unwrap_err();
    assert!(matches!(
        err,
        SchedulerError::Driver(DriverError::Rejected { .. })
    ));
    assert!(registry.get(owner).unwrap().tick_handle().is_none());

    let scheduler = Scheduler::new(owner, &registry, &driver).unwrap();
    assert!(scheduler.tick_handle().is_some());
    assert_eq!(driver.inner.subscription_count(), 1);
}

#[test]
fn test_zero_period_is_rejected_before_subscribing() {
    let registry = StateRegistry::new();
    let driver = ManualDriver::new();
    let config = SchedulerConfig::default().with_period(Duration::ZERO);

    let err = Scheduler::with_config(OwnerId::unique(), &registry, &driver, &config).unwrap_err();
    assert!(matches!(err, SchedulerError::InvalidConfig(_)));
    assert_eq!(driver.subscription_count(), 0);
}
