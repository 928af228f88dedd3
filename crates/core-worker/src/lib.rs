//! Background worker: one dedicated thread fed by a bounded task ring,
//! reporting through a bounded result ring.
//!
//! Tasks execute in submission order; results arrive in completion order
//! and the main thread treats them as idempotent hints. Cancellation is
//! advisory: flags are observed at row boundaries inside the long task
//! handlers, and a cancelled-but-queued task still yields a result so the
//! main thread can clean up whatever awaited it.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use core_text::{CoreError, LineStore, Result, Snapshot};
use tracing::{debug, trace};

mod queue;
mod search;
mod task;

pub use queue::{RESULT_QUEUE_CAP, TASK_QUEUE_CAP};
pub use search::SEARCH_MATCH_MAX;
pub use task::{
    Match, ReplacePlan, Replacement, ResultPayload, SearchFlags, SearchResults, Task, TaskKind,
    TaskPayload, TaskResult,
};

use queue::{ResultQueue, TaskQueue};
use search::Matcher;

/// Bounded wait of the worker's queue pop; shutdown is checked on timeout.
pub const WORKER_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct Worker {
    tasks: Arc<TaskQueue>,
    results: Arc<ResultQueue>,
    shutdown: Arc<AtomicBool>,
    current: Arc<Mutex<Option<Arc<Task>>>>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Start the worker thread against a shared line store.
    pub fn spawn(store: Arc<LineStore>) -> Result<Worker> {
        let tasks = Arc::new(TaskQueue::new());
        let results = Arc::new(ResultQueue::new());
        let shutdown = Arc::new(AtomicBool::new(false));
        let current = Arc::new(Mutex::new(None));
        let handle = std::thread::Builder::new()
            .name("sable-worker".into())
            .spawn({
                let tasks = Arc::clone(&tasks);
                let results = Arc::clone(&results);
                let shutdown = Arc::clone(&shutdown);
                let current = Arc::clone(&current);
                move || worker_loop(store, tasks, results, shutdown, current)
            })?;
        Ok(Worker {
            tasks,
            results,
            shutdown,
            current,
            handle: Some(handle),
        })
    }

    /// Enqueue a task, returning its fresh id. Fails with `queue-full`.
    pub fn submit(&self, payload: TaskPayload) -> Result<u64> {
        let task = Task::new(payload);
        let id = task.id;
        self.tasks.push(task)?;
        trace!(target: "worker", id, "task submitted");
        Ok(id)
    }

    /// Advisory cancel of a queued or in-flight task.
    pub fn cancel(&self, id: u64) {
        self.tasks.cancel_id(id);
        if let Ok(cur) = self.current.lock()
            && let Some(t) = cur.as_ref()
            && t.id == id
        {
            t.cancel();
        }
    }

    /// Cancel every queued task of `kind`, plus the current one if it
    /// matches.
    pub fn cancel_all_of_kind(&self, kind: TaskKind) {
        self.tasks.cancel_kind(kind);
        if let Ok(cur) = self.current.lock()
            && let Some(t) = cur.as_ref()
            && t.kind() == kind
        {
            t.cancel();
        }
    }

    /// Non-blocking result drain; at most one result per call.
    pub fn try_pop_result(&self) -> Option<TaskResult> {
        self.results.try_pop()
    }

    /// Stop the worker: set the flag, wake it with a sentinel, join.
    /// Calling twice is a no-op.
    pub fn shutdown(&mut self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        // Wake the condition wait; a full queue is fine, the timed wait
        // notices the flag on its own.
        let _ = self.tasks.push(Task::new(TaskPayload::Shutdown));
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        debug!(target: "worker", "worker shut down");
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(
    store: Arc<LineStore>,
    tasks: Arc<TaskQueue>,
    results: Arc<ResultQueue>,
    shutdown: Arc<AtomicBool>,
    current: Arc<Mutex<Option<Arc<Task>>>>,
) {
    debug!(target: "worker", "worker thread started");
    loop {
        let Some(task) = tasks.pop_timeout(WORKER_POLL_INTERVAL) else {
            if shutdown.load(Ordering::SeqCst) {
                break;
            }
            continue;
        };
        if task.kind() == TaskKind::Shutdown {
            break;
        }
        if task.is_cancelled() {
            results.push(TaskResult {
                id: task.id,
                kind: task.kind(),
                error: CoreError::Cancelled.code(),
                payload: ResultPayload::None,
            });
            continue;
        }
        if let Ok(mut cur) = current.lock() {
            *cur = Some(Arc::clone(&task));
        }
        let result = execute(&store, &task);
        if let Ok(mut cur) = current.lock() {
            *cur = None;
        }
        trace!(target: "worker", id = result.id, error = result.error, "task finished");
        results.push(result);
    }
    debug!(target: "worker", "worker thread exiting");
}

fn execute(store: &Arc<LineStore>, task: &Task) -> TaskResult {
    let (error, payload) = match &task.payload {
        TaskPayload::Warm { start_row, end_row } => execute_warm(store, task, *start_row, *end_row),
        TaskPayload::Search {
            pattern,
            flags,
            start_row,
            end_row,
            results,
        } => execute_search(store, task, pattern, *flags, *start_row, *end_row, results),
        TaskPayload::ReplaceAll {
            pattern,
            replacement,
            flags,
            plan,
        } => execute_replace(store, task, pattern, replacement, *flags, plan),
        TaskPayload::Autosave { snapshot } => execute_autosave(snapshot),
        TaskPayload::Shutdown => (0, ResultPayload::None),
    };
    TaskResult {
        id: task.id,
        kind: task.kind(),
        error,
        payload,
    }
}

fn execute_warm(
    store: &Arc<LineStore>,
    task: &Task,
    start_row: usize,
    end_row: usize,
) -> (i32, ResultPayload) {
    let end = end_row.min(store.line_count());
    let mut warmed = 0;
    let mut skipped = 0;
    for row in start_row..end {
        if task.is_cancelled() {
            return (
                CoreError::Cancelled.code(),
                ResultPayload::Warm { warmed, skipped },
            );
        }
        match store.warm_line(row) {
            Ok(true) => warmed += 1,
            Ok(false) => skipped += 1,
            Err(e) => return (e.code(), ResultPayload::Warm { warmed, skipped }),
        }
    }
    (0, ResultPayload::Warm { warmed, skipped })
}

fn execute_search(
    store: &Arc<LineStore>,
    task: &Task,
    pattern: &str,
    flags: SearchFlags,
    start_row: usize,
    end_row: usize,
    results: &Arc<Mutex<SearchResults>>,
) -> (i32, ResultPayload) {
    let matcher = match Matcher::build(pattern, flags) {
        Ok(m) => m,
        Err(e) => {
            return (
                e.code(),
                ResultPayload::Search {
                    matches_found: 0,
                    complete: false,
                },
            );
        }
    };
    let end = if end_row == 0 {
        store.line_count()
    } else {
        end_row.min(store.line_count())
    };
    let mut found = 0usize;
    let mut spans = Vec::new();
    for row in start_row..end {
        if task.is_cancelled() {
            return (
                CoreError::Cancelled.code(),
                ResultPayload::Search {
                    matches_found: found,
                    complete: false,
                },
            );
        }
        let text = match store.row_text(row) {
            Ok(Some(t)) => t,
            Ok(None) => break,
            Err(e) => {
                return (
                    e.code(),
                    ResultPayload::Search {
                        matches_found: found,
                        complete: false,
                    },
                );
            }
        };
        spans.clear();
        matcher.find_in(&text, &mut spans);
        if spans.is_empty() {
            continue;
        }
        // Publish per row so the main thread can paint in-progress hits.
        if let Ok(mut shared) = results.lock() {
            for &(start_col, end_col) in spans.iter() {
                if found >= SEARCH_MATCH_MAX {
                    break;
                }
                shared.matches.push(Match {
                    row,
                    start_col,
                    end_col,
                });
                found += 1;
            }
        }
        if found >= SEARCH_MATCH_MAX {
            break;
        }
    }
    if let Ok(mut shared) = results.lock() {
        shared.complete = true;
    }
    (
        0,
        ResultPayload::Search {
            matches_found: found,
            complete: true,
        },
    )
}

fn execute_replace(
    store: &Arc<LineStore>,
    task: &Task,
    pattern: &str,
    replacement: &str,
    flags: SearchFlags,
    plan: &Arc<Mutex<ReplacePlan>>,
) -> (i32, ResultPayload) {
    let matcher = match Matcher::build(pattern, flags) {
        Ok(m) => m,
        Err(e) => {
            return (
                e.code(),
                ResultPayload::Replace {
                    planned: 0,
                    complete: false,
                },
            );
        }
    };
    let mut planned = 0usize;
    let mut spans = Vec::new();
    for row in 0..store.line_count() {
        if task.is_cancelled() {
            return (
                CoreError::Cancelled.code(),
                ResultPayload::Replace {
                    planned,
                    complete: false,
                },
            );
        }
        let text = match store.row_text(row) {
            Ok(Some(t)) => t,
            Ok(None) => break,
            Err(e) => {
                return (
                    e.code(),
                    ResultPayload::Replace {
                        planned,
                        complete: false,
                    },
                );
            }
        };
        spans.clear();
        matcher.find_in(&text, &mut spans);
        if spans.is_empty() {
            continue;
        }
        let chars: Vec<char> = text.chars().collect();
        if let Ok(mut shared) = plan.lock() {
            for &(start_col, end_col) in spans.iter() {
                let expected: String = chars[start_col..end_col].iter().collect();
                shared.replacements.push(Replacement {
                    row,
                    start_col,
                    end_col,
                    expected,
                    text: matcher.expand(&text, (start_col, end_col), replacement),
                });
                planned += 1;
            }
        }
    }
    if let Ok(mut shared) = plan.lock() {
        shared.complete = true;
    }
    (
        0,
        ResultPayload::Replace {
            planned,
            complete: true,
        },
    )
}

fn execute_autosave(snapshot: &Snapshot) -> (i32, ResultPayload) {
    match write_swap(snapshot) {
        Ok(bytes_written) => (
            0,
            ResultPayload::Autosave {
                path: snapshot.swap_path.clone(),
                bytes_written,
            },
        ),
        Err(e) => (
            e.code(),
            ResultPayload::Autosave {
                path: snapshot.swap_path.clone(),
                bytes_written: 0,
            },
        ),
    }
}

/// Write the snapshot to a temp file beside the swap path, then rename it
/// into place so readers never observe a half-written swap.
fn write_swap(snapshot: &Snapshot) -> Result<u64> {
    let tmp = temp_sibling(&snapshot.swap_path);
    let mut out = BufWriter::new(File::create(&tmp)?);
    let mut written = 0u64;
    for line in &snapshot.lines {
        out.write_all(line.as_bytes())?;
        out.write_all(b"\n")?;
        written += line.len() as u64 + 1;
    }
    out.flush()?;
    drop(out);
    std::fs::rename(&tmp, &snapshot.swap_path)?;
    Ok(written)
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "swap".into());
    name.push(".tmp");
    path.with_file_name(name)
}
