//! Scheduled tasks — one-shot and interval timers with explicit cancellation.
//!
//! The engine is single-threaded and event-driven: nothing here spawns a
//! thread or sleeps. The host pumps `run_due(now_ms)` and the scheduler
//! returns which task kinds came due, in no guaranteed relative order.
//! Teardown is one call: `cancel_all()`.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Cancellation token for a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

#[derive(Debug, Clone, Copy)]
enum Repeat {
    Once,
    Every(i64),
}

#[derive(Debug)]
struct Task<K> {
    id: u64,
    kind: K,
    due_ms: i64,
    repeat: Repeat,
}

/// Deterministic task scheduler keyed by a caller-defined task kind.
pub struct Scheduler<K> {
    tasks: Mutex<Vec<Task<K>>>,
    next_id: AtomicU64,
}

impl<K: Copy> Scheduler<K> {
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Schedule `kind` to fire once at `due_ms`.
    pub fn schedule_once(&self, kind: K, due_ms: i64) -> TaskHandle {
        self.push(kind, due_ms, Repeat::Once)
    }

    /// Schedule `kind` to fire every `interval_ms`, first at
    /// `now_ms + interval_ms`.
    pub fn schedule_every(&self, kind: K, interval_ms: i64, now_ms: i64) -> TaskHandle {
        self.push(kind, now_ms + interval_ms, Repeat::Every(interval_ms))
    }

    fn push(&self, kind: K, due_ms: i64, repeat: Repeat) -> TaskHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.tasks.lock().push(Task { id, kind, due_ms, repeat });
        TaskHandle(id)
    }

    /// Cancel a single task. Unknown/expired handles are a no-op.
    pub fn cancel(&self, handle: TaskHandle) {
        self.tasks.lock().retain(|t| t.id != handle.0);
    }

    /// Drop every scheduled task. Total, immediate teardown.
    pub fn cancel_all(&self) {
        self.tasks.lock().clear();
    }

    /// Collect every task kind due at or before `now_ms`. Interval tasks
    /// that fell multiple periods behind fire once per elapsed period;
    /// one-shots are removed after firing.
    pub fn run_due(&self, now_ms: i64) -> Vec<K> {
        let mut fired = Vec::new();
        let mut tasks = self.tasks.lock();
        tasks.retain_mut(|task| {
            match task.repeat {
                Repeat::Once => {
                    if task.due_ms <= now_ms {
                        fired.push(task.kind);
                        false
                    } else {
                        true
                    }
                }
                Repeat::Every(interval) => {
                    while task.due_ms <= now_ms {
                        fired.push(task.kind);
                        task.due_ms += interval;
                    }
                    true
                }
            }
        });
        fired
    }

    pub fn pending(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Earliest due timestamp among scheduled tasks, if any.
    pub fn next_due_ms(&self) -> Option<i64> {
        self.tasks.lock().iter().map(|t| t.due_ms).min()
    }
}

impl<K: Copy> Default for Scheduler<K> {
    fn default() -> Self {
        Self::new()
    }
}
