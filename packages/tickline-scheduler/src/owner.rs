use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Allocated ids start at 1; 0 is reserved for [`OwnerId::GLOBAL`].
static NEXT_ALLOCATED: AtomicU64 = AtomicU64::new(1);

/// Identity of whoever owns a task stream (a plugin instance, a connection, a session).
///
/// Two kinds of id exist and never compare equal to each other:
/// - allocated ids from [`OwnerId::unique`], each one distinct for the process lifetime;
/// - raw ids from [`OwnerId::from_raw`], wrapping a value the host already keeps stable.
///
/// Ids serialize for snapshots but cannot be decoded, so no value read from
/// outside the process can alias an allocated id:
///
/// ```compile_fail
/// fn decodable<T: serde::de::DeserializeOwned>() {}
/// decodable::<tickline_scheduler::OwnerId>();
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct OwnerId {
    raw: u64,
    allocated: bool,
}

impl OwnerId {
    /// The implicit owner of the process-wide [`GlobalScheduler`](crate::GlobalScheduler).
    pub const GLOBAL: OwnerId = OwnerId {
        raw: 0,
        allocated: true,
    };

    /// Allocate a fresh identity.
    pub fn unique() -> Self {
        Self {
            raw: NEXT_ALLOCATED.fetch_add(1, Ordering::Relaxed),
            allocated: true,
        }
    }

    /// Wrap a host-provided stable identifier.
    pub const fn from_raw(raw: u64) -> Self {
        Self {
            raw,
            allocated: false,
        }
    }

    pub const fn raw(&self) -> u64 {
        self.raw
    }

    pub const fn is_allocated(&self) -> bool {
        self.allocated
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.allocated {
            write!(f, "owner#{}", self.raw)
        } else {
            write!(f, "owner:{}", self.raw)
        }
    }
}
