use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

use crate::model::ObjectId;

/// Source of fresh object identifiers.
pub trait IdAllocator: Send + Sync {
    fn allocate(&self) -> ObjectId;
}

/// Random v4 identifiers.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomIds;

impl IdAllocator for RandomIds {
    fn allocate(&self) -> ObjectId {
        Uuid::new_v4()
    }
}

/// Predictable identifiers `start`, `start + 1`, ... for tests and replays.
#[derive(Debug)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new(1)
    }
}

impl IdAllocator for SequentialIds {
    fn allocate(&self) -> ObjectId {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        Uuid::from_u128(n as u128)
    }
}

/// Timestamp source, in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        chrono::Utc::now().timestamp_millis().max(0) as u64
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now_ms(&self) -> u64 {
        self.0
    }
}
