use crate::owner::OwnerId;
use crate::snapshot::SchedulerSnapshot;
use crate::state::SchedulerState;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Owner → state map shared by every scheduler built on it.
///
/// Entries are created lazily and never removed. Access is synchronised on the
/// map as a whole; per-owner state carries its own locks.
#[derive(Default)]
pub struct StateRegistry {
    states: Mutex<FxHashMap<OwnerId, Arc<SchedulerState>>>,
}

static GLOBAL_REGISTRY: OnceLock<Arc<StateRegistry>> = OnceLock::new();

impl StateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry, created on first use.
    pub fn global() -> Arc<StateRegistry> {
        GLOBAL_REGISTRY
            .get_or_init(|| Arc::new(StateRegistry::new()))
            .clone()
    }

    /// Return the owner's state, inserting a fresh one under the same lock if absent.
    pub fn get_or_create(&self, owner: OwnerId) -> Arc<SchedulerState> {
        let mut states = self.states.lock();
        states
            .entry(owner)
            .or_insert_with(|| {
                debug!(%owner, "creating scheduler state");
                Arc::new(SchedulerState::new(owner))
            })
            .clone()
    }

    pub fn get(&self, owner: OwnerId) -> Option<Arc<SchedulerState>> {
        self.states.lock().get(&owner).cloned()
    }

    pub fn len(&self) -> usize {
        self.states.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.lock().is_empty()
    }

    /// Known owners in ascending order.
    pub fn owners(&self) -> Vec<OwnerId> {
        let mut owners: Vec<OwnerId> = self.states.lock().keys().copied().collect();
        owners.sort();
        owners
    }

    /// Snapshots of every owner, in the same order as [`owners`](Self::owners).
    pub fn snapshots(&self) -> Vec<SchedulerSnapshot> {
        // Collect first so no owner state lock is taken while the map is locked.
        let mut states: Vec<Arc<SchedulerState>> = self.states.lock().values().cloned().collect();
        states.sort_by_key(|state| state.owner());
        states.iter().map(|state| state.snapshot()).collect()
    }
}
