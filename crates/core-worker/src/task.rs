//! Task and result records crossing the worker boundary.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use core_text::Snapshot;

/// Task id generator; ids start at 1 and never repeat within a session.
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn fresh_task_id() -> u64 {
    NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Warm,
    Search,
    ReplaceAll,
    Autosave,
    Shutdown,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SearchFlags {
    pub case_sensitive: bool,
    pub whole_word: bool,
    pub regex: bool,
}

/// One match, in cell columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub row: usize,
    pub start_col: usize,
    pub end_col: usize,
}

/// Shared search output. The worker appends under the mutex while the main
/// thread reads to render in-progress highlights; the pattern identifies
/// which query the matches belong to.
#[derive(Debug, Default)]
pub struct SearchResults {
    pub pattern: String,
    pub matches: Vec<Match>,
    pub complete: bool,
}

impl SearchResults {
    pub fn for_pattern(pattern: &str) -> Arc<Mutex<SearchResults>> {
        Arc::new(Mutex::new(SearchResults {
            pattern: pattern.to_string(),
            matches: Vec::new(),
            complete: false,
        }))
    }
}

/// One planned replacement produced by the replace-all search phase. The
/// apply phase re-checks that the span still holds the expected text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub row: usize,
    pub start_col: usize,
    pub end_col: usize,
    pub expected: String,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct ReplacePlan {
    pub pattern: String,
    pub replacements: Vec<Replacement>,
    pub complete: bool,
}

impl ReplacePlan {
    pub fn for_pattern(pattern: &str) -> Arc<Mutex<ReplacePlan>> {
        Arc::new(Mutex::new(ReplacePlan {
            pattern: pattern.to_string(),
            replacements: Vec::new(),
            complete: false,
        }))
    }
}

#[derive(Debug)]
pub enum TaskPayload {
    /// Warm lines `[start_row, end_row)`.
    Warm { start_row: usize, end_row: usize },
    Search {
        pattern: String,
        flags: SearchFlags,
        start_row: usize,
        /// Zero means "to the end of the buffer".
        end_row: usize,
        results: Arc<Mutex<SearchResults>>,
    },
    ReplaceAll {
        pattern: String,
        replacement: String,
        flags: SearchFlags,
        plan: Arc<Mutex<ReplacePlan>>,
    },
    Autosave { snapshot: Snapshot },
    Shutdown,
}

impl TaskPayload {
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskPayload::Warm { .. } => TaskKind::Warm,
            TaskPayload::Search { .. } => TaskKind::Search,
            TaskPayload::ReplaceAll { .. } => TaskKind::ReplaceAll,
            TaskPayload::Autosave { .. } => TaskKind::Autosave,
            TaskPayload::Shutdown => TaskKind::Shutdown,
        }
    }
}

#[derive(Debug)]
pub struct Task {
    pub id: u64,
    pub payload: TaskPayload,
    cancelled: AtomicBool,
}

impl Task {
    pub(crate) fn new(payload: TaskPayload) -> Arc<Task> {
        Arc::new(Task {
            id: fresh_task_id(),
            payload,
            cancelled: AtomicBool::new(false),
        })
    }

    pub fn kind(&self) -> TaskKind {
        self.payload.kind()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Advisory flag, checked at least once per scanned row.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Error code plus tag-specific counters; results are idempotent hints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResult {
    pub id: u64,
    pub kind: TaskKind,
    /// 0 on success, a negative `CoreError::code` otherwise.
    pub error: i32,
    pub payload: ResultPayload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultPayload {
    Warm { warmed: usize, skipped: usize },
    Search { matches_found: usize, complete: bool },
    Replace { planned: usize, complete: bool },
    Autosave { path: PathBuf, bytes_written: u64 },
    None,
}

impl TaskResult {
    pub fn ok(&self) -> bool {
        self.error == 0
    }
}
