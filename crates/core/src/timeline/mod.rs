use serde::{Deserialize, Serialize};

/// Page clock in whole milliseconds. Only ever moves forward.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageClock {
    pub now_ms: u64,
}

impl PageClock {
    pub fn advance_to(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTimer<K> {
    pub due_ms: u64,
    pub kind: K,
}

/// Deterministic delayed-action queue, at most one pending timer per kind.
#[derive(Debug)]
pub struct TimerQueue<K> {
    timers: Vec<ScheduledTimer<K>>,
}

impl<K> Default for TimerQueue<K> {
    fn default() -> Self {
        Self { timers: Vec::new() }
    }
}

impl<K: Copy + PartialEq> TimerQueue<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `kind`, replacing any pending timer of the same kind.
    /// Returns true when an earlier timer was superseded.
    pub fn debounce(&mut self, kind: K, due_ms: u64) -> bool {
        let replaced = self.cancel(kind);
        self.insert(ScheduledTimer { due_ms, kind });
        replaced
    }

    /// Schedules `kind` unless one is already pending.
    pub fn schedule_once(&mut self, kind: K, due_ms: u64) -> bool {
        if self.is_pending(kind) {
            return false;
        }
        self.insert(ScheduledTimer { due_ms, kind });
        true
    }

    pub fn cancel(&mut self, kind: K) -> bool {
        let before = self.timers.len();
        self.timers.retain(|timer| timer.kind != kind);
        before != self.timers.len()
    }

    pub fn cancel_all(&mut self) {
        self.timers.clear();
    }

    pub fn is_pending(&self, kind: K) -> bool {
        self.timers.iter().any(|timer| timer.kind == kind)
    }

    pub fn next_due(&self) -> Option<u64> {
        self.timers.first().map(|timer| timer.due_ms)
    }

    /// Removes and returns the earliest timer due at or before `now_ms`.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<ScheduledTimer<K>> {
        match self.timers.first() {
            Some(timer) if timer.due_ms <= now_ms => Some(self.timers.remove(0)),
            _ => None,
        }
    }

    fn insert(&mut self, timer: ScheduledTimer<K>) {
        // stable: equal deadlines fire in scheduling order
        let index = self
            .timers
            .partition_point(|existing| existing.due_ms <= timer.due_ms);
        self.timers.insert(index, timer);
    }
}
