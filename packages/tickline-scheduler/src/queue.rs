use crate::task::{Sequence, TaskRecord, Work};
use rustc_hash::FxHashMap;

/// Pending work of one owner, keyed by sequence number.
///
/// Lookups are by sequence only; insertion order is irrelevant. Numbering comes
/// from `last_assigned`, not from the map, so taking records never reuses a number.
#[derive(Default)]
pub struct PendingQueue {
    records: FxHashMap<Sequence, TaskRecord>,
    last_assigned: Sequence,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, work: Work) -> Sequence {
        let sequence = self.last_assigned + 1;
        self.last_assigned = sequence;
        self.records.insert(sequence, TaskRecord::new(sequence, work));
        sequence
    }

    pub fn take(&mut self, sequence: Sequence) -> Option<TaskRecord> {
        self.records.remove(&sequence)
    }

    pub fn contains(&self, sequence: Sequence) -> bool {
        self.records.contains_key(&sequence)
    }

    pub fn last_assigned(&self) -> Sequence {
        self.last_assigned
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
