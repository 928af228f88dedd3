//! Bounded rings between the main thread and the worker.
//!
//! Each queue sits behind its own mutex; the task queue adds a condition
//! variable signalling "task available". The task ring rejects when full
//! (callers surface `queue-full`); the result ring drops its oldest entry
//! with a warning, since the main thread drains aggressively and results
//! are short-lived.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use core_text::{CoreError, Result};
use tracing::warn;

use crate::task::{Task, TaskKind, TaskResult};
use std::sync::Arc;

/// Capacity of the task ring.
pub const TASK_QUEUE_CAP: usize = 32;
/// Capacity of the result ring.
pub const RESULT_QUEUE_CAP: usize = 64;

pub(crate) struct TaskQueue {
    inner: Mutex<VecDeque<Arc<Task>>>,
    cond: Condvar,
}

impl TaskQueue {
    pub(crate) fn new() -> TaskQueue {
        TaskQueue {
            inner: Mutex::new(VecDeque::with_capacity(TASK_QUEUE_CAP)),
            cond: Condvar::new(),
        }
    }

    pub(crate) fn push(&self, task: Arc<Task>) -> Result<()> {
        let mut q = self.inner.lock().map_err(|_| CoreError::Lock("task queue"))?;
        if q.len() >= TASK_QUEUE_CAP {
            return Err(CoreError::QueueFull);
        }
        q.push_back(task);
        self.cond.notify_one();
        Ok(())
    }

    /// Pop the head, waiting up to `timeout` for a task to arrive.
    pub(crate) fn pop_timeout(&self, timeout: Duration) -> Option<Arc<Task>> {
        let mut q = self.inner.lock().ok()?;
        if q.is_empty() {
            let (guard, _) = self.cond.wait_timeout(q, timeout).ok()?;
            q = guard;
        }
        q.pop_front()
    }

    /// Flag a queued task cancelled; returns whether the id was found.
    pub(crate) fn cancel_id(&self, id: u64) -> bool {
        let Ok(q) = self.inner.lock() else {
            return false;
        };
        match q.iter().find(|t| t.id == id) {
            Some(t) => {
                t.cancel();
                true
            }
            None => false,
        }
    }

    pub(crate) fn cancel_kind(&self, kind: TaskKind) {
        if let Ok(q) = self.inner.lock() {
            for t in q.iter().filter(|t| t.kind() == kind) {
                t.cancel();
            }
        }
    }
}

pub(crate) struct ResultQueue {
    inner: Mutex<VecDeque<TaskResult>>,
}

impl ResultQueue {
    pub(crate) fn new() -> ResultQueue {
        ResultQueue {
            inner: Mutex::new(VecDeque::with_capacity(RESULT_QUEUE_CAP)),
        }
    }

    pub(crate) fn push(&self, result: TaskResult) {
        let Ok(mut q) = self.inner.lock() else {
            return;
        };
        if q.len() >= RESULT_QUEUE_CAP {
            let dropped = q.pop_front();
            warn!(
                target: "worker",
                dropped_id = dropped.map(|r| r.id),
                "result queue overflow, dropping oldest"
            );
        }
        q.push_back(result);
    }

    /// Non-blocking drain step: at most one result per call.
    pub(crate) fn try_pop(&self) -> Option<TaskResult> {
        self.inner.lock().ok()?.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{TaskPayload, TaskResult};

    #[test]
    fn task_queue_rejects_when_full() {
        let q = TaskQueue::new();
        for _ in 0..TASK_QUEUE_CAP {
            q.push(Task::new(TaskPayload::Warm {
                start_row: 0,
                end_row: 0,
            }))
            .unwrap();
        }
        let err = q
            .push(Task::new(TaskPayload::Warm {
                start_row: 0,
                end_row: 0,
            }))
            .unwrap_err();
        assert!(matches!(err, CoreError::QueueFull));
    }

    #[test]
    fn cancel_by_id_flags_queued_task() {
        let q = TaskQueue::new();
        let t = Task::new(TaskPayload::Warm {
            start_row: 0,
            end_row: 10,
        });
        let id = t.id;
        q.push(Arc::clone(&t)).unwrap();
        assert!(q.cancel_id(id));
        assert!(t.is_cancelled());
        assert!(!q.cancel_id(id + 999));
    }

    #[test]
    fn result_queue_drops_oldest_on_overflow() {
        let q = ResultQueue::new();
        for i in 0..RESULT_QUEUE_CAP + 3 {
            q.push(TaskResult {
                id: i as u64,
                kind: TaskKind::Warm,
                error: 0,
                payload: crate::task::ResultPayload::None,
            });
        }
        // The first three were dropped.
        assert_eq!(q.try_pop().unwrap().id, 3);
    }

    #[test]
    fn pop_timeout_returns_none_when_idle() {
        let q = TaskQueue::new();
        assert!(q.pop_timeout(Duration::from_millis(5)).is_none());
    }
}
