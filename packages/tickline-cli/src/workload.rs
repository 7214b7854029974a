use anyhow::{Result, bail};
use std::time::{Duration, Instant};
use thiserror::Error;
use tickline_scheduler::{
    OwnerId, Scheduler, SchedulerConfig, SchedulerSnapshot, StateRegistry, TickDriver,
};
use tracing::info;

#[derive(Error, Debug)]
#[error("simulated fault in task {0}")]
pub struct SimulatedFault(u64);

pub struct Workload {
    pub owners: u64,
    pub tasks: u64,
    pub work: Duration,
    /// Every n-th task of each owner fails.
    pub fail_every: Option<u64>,
    pub timeout: Duration,
}

/// Queue the workload on `driver` and wait until every owner has drained its stream.
pub async fn run(
    workload: &Workload,
    driver: &dyn TickDriver,
    config: &SchedulerConfig,
) -> Result<Vec<SchedulerSnapshot>> {
    let registry = StateRegistry::new();
    let mut schedulers = Vec::with_capacity(workload.owners as usize);

    for id in 1..=workload.owners {
        let scheduler = Scheduler::with_config(OwnerId::from_raw(id), &registry, driver, config)?;
        let owner = scheduler.owner();
        scheduler.on_task_start(move |seq| info!(%owner, seq, "task started"));
        scheduler.on_task_complete(move |seq| info!(%owner, seq, "task completed"));

        for n in 1..=workload.tasks {
            let work = workload.work;
            let fails = workload.fail_every.is_some_and(|k| k > 0 && n % k == 0);
            scheduler.queue_fallible(move || {
                std::thread::sleep(work);
                if fails {
                    return Err(SimulatedFault(n));
                }
                Ok(())
            });
        }
        schedulers.push(scheduler);
    }

    let started = Instant::now();
    while schedulers
        .iter()
        .any(|s| s.current_task() < workload.tasks)
    {
        if started.elapsed() > workload.timeout {
            bail!(
                "workload did not finish within {:?}: {:?}",
                workload.timeout,
                registry.snapshots()
            );
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    info!(
        owners = workload.owners,
        tasks = workload.tasks,
        elapsed = ?started.elapsed(),
        "workload finished"
    );
    Ok(registry.snapshots())
}
