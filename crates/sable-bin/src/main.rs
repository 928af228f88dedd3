//! sable: a terminal text editor.
//!
//! The binary wires the core crates together: it owns the terminal
//! session, the main event loop, and the worker lifecycle. Buffer
//! mutation, annotation, and rendering all live in the core crates; this
//! file only routes events and worker results between them.

use std::io::stdout;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event, MouseButton, MouseEventKind};
use tracing::{debug, info, warn};

use core_render::{Theme, present, render_frame};
use core_state::{Effect, EditorState, action::action_for_key};
use core_text::Buffer;
use core_worker::{
    ReplacePlan, ResultPayload, SearchFlags, SearchResults, TaskKind, TaskPayload, Worker,
};

mod input;
mod terminal;

/// How often a modified buffer gets an autosave snapshot.
const AUTOSAVE_INTERVAL: Duration = Duration::from_secs(30);
/// Input poll timeout; also bounds result-drain latency.
const POLL_TIMEOUT: Duration = Duration::from_millis(50);
/// Double-click window for word selection.
const DOUBLE_CLICK: Duration = Duration::from_millis(400);

#[derive(Parser)]
#[command(name = "sable", about = "A terminal text editor")]
struct Args {
    /// File to open; a missing path starts a new file with that name.
    file: Option<PathBuf>,
}

fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let dir = dirs::cache_dir()?.join("sable");
    std::fs::create_dir_all(&dir).ok()?;
    let appender = tracing_appender::rolling::never(dir, "sable.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Some(guard)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = init_logging();
    let config = core_config::load(None).unwrap_or_default();

    let buffer = match &args.file {
        Some(path) => Buffer::open(path).context("opening file")?,
        None => Buffer::new(),
    };
    let mut state = EditorState::new(buffer);
    state.tab_width = config.tab_width;
    let highlighter = state.highlighter();
    core_syntax::annotate_all(&mut state.buffer, highlighter).context("initial annotation")?;
    info!(
        file = ?state.buffer.file_name,
        lines = state.buffer.line_count(),
        "opened"
    );

    let mut worker = Worker::spawn(state.buffer.store()).context("spawning worker")?;

    terminal::install_panic_hook();
    let mut guard = terminal::TerminalGuard::enter()?;
    let (cols, rows) = crossterm::terminal::size()?;
    state.set_dimensions(rows as usize, cols as usize);

    let run = event_loop(&mut state, &mut worker);

    guard.leave();
    worker.shutdown();
    // Clean exit removes the swap file.
    if let Some(swap) = state.swap_path() {
        let _ = std::fs::remove_file(swap);
    }
    run
}

struct LoopState {
    pending_plan: Option<std::sync::Arc<std::sync::Mutex<ReplacePlan>>>,
    last_autosave: Instant,
    last_click: Option<(Instant, usize, usize)>,
    warmed_around: Option<usize>,
}

fn event_loop(state: &mut EditorState, worker: &mut Worker) -> Result<()> {
    let theme = Theme::dark();
    let mut out = stdout();
    let mut bookkeeping = LoopState {
        pending_plan: None,
        last_autosave: Instant::now(),
        last_click: None,
        warmed_around: None,
    };

    loop {
        state.scroll_to_cursor();
        prewarm_viewport(state, worker, &mut bookkeeping);
        let frame = render_frame(state, &theme, Instant::now())?;
        present(&mut out, &frame)?;

        if event::poll(POLL_TIMEOUT)? {
            match event::read()? {
                Event::Key(key) => {
                    if let Some(input) = input::translate_key(key) {
                        let action = action_for_key(state.mode, input);
                        let effect = state.apply_action(action)?;
                        if handle_effect(state, worker, &mut bookkeeping, effect)? {
                            return Ok(());
                        }
                    }
                }
                Event::Mouse(mouse) => handle_mouse(state, &mut bookkeeping, mouse),
                Event::Resize(cols, rows) => {
                    state.set_dimensions(rows as usize, cols as usize);
                }
                Event::Paste(text) => state.insert_text(&text)?,
                _ => {}
            }
        }

        drain_results(state, worker, &mut bookkeeping)?;
        maybe_autosave(state, worker, &mut bookkeeping)?;
    }
}

/// Keep the viewport and a margin around it warm via the worker.
fn prewarm_viewport(state: &EditorState, worker: &Worker, bk: &mut LoopState) {
    if bk.warmed_around == Some(state.row_offset) {
        return;
    }
    let margin = state.text_rows();
    let start = state.row_offset.saturating_sub(margin);
    let end = (state.row_offset + 2 * margin).min(state.buffer.line_count());
    if start >= end {
        return;
    }
    worker.cancel_all_of_kind(TaskKind::Warm);
    if worker
        .submit(TaskPayload::Warm {
            start_row: start,
            end_row: end,
        })
        .is_ok()
    {
        bk.warmed_around = Some(state.row_offset);
    }
}

fn handle_mouse(state: &mut EditorState, bk: &mut LoopState, mouse: crossterm::event::MouseEvent) {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            let gutter = state.gutter_width();
            let row = state.row_offset + mouse.row as usize;
            let col = state.col_offset + (mouse.column as usize).saturating_sub(gutter);
            let now = Instant::now();
            let is_double = bk.last_click.is_some_and(|(at, r, c)| {
                now.saturating_duration_since(at) <= DOUBLE_CLICK && (r, c) == (row, col)
            });
            if is_double {
                state.select_word_at(row, col);
                bk.last_click = None;
            } else {
                state.click(row, col);
                bk.last_click = Some((now, row, col));
            }
        }
        MouseEventKind::ScrollUp => state.wheel_scroll(-1, Instant::now()),
        MouseEventKind::ScrollDown => state.wheel_scroll(1, Instant::now()),
        _ => {}
    }
}

fn handle_effect(
    state: &mut EditorState,
    worker: &Worker,
    bk: &mut LoopState,
    effect: Effect,
) -> Result<bool> {
    match effect {
        Effect::None => {}
        Effect::Quit => return Ok(true),
        Effect::Saved => {
            if let Some(swap) = state.swap_path() {
                let _ = std::fs::remove_file(swap);
            }
        }
        Effect::SearchChanged => {
            worker.cancel_all_of_kind(TaskKind::Search);
            state.search.results = None;
            state.search.task_id = None;
            state.search.current = None;
            if !state.search.pattern.is_empty() {
                let results = SearchResults::for_pattern(&state.search.pattern);
                state.search.results = Some(results.clone());
                match worker.submit(TaskPayload::Search {
                    pattern: state.search.pattern.clone(),
                    flags: SearchFlags::default(),
                    start_row: 0,
                    end_row: 0,
                    results,
                }) {
                    Ok(id) => state.search.task_id = Some(id),
                    Err(e) => state.status.set(format!("search: {e}")),
                }
            }
        }
        Effect::ReplaceAll => {
            let plan = ReplacePlan::for_pattern(&state.search.pattern);
            match worker.submit(TaskPayload::ReplaceAll {
                pattern: state.search.pattern.clone(),
                replacement: state.search.replacement.clone(),
                flags: SearchFlags::default(),
                plan: plan.clone(),
            }) {
                Ok(_) => bk.pending_plan = Some(plan),
                Err(e) => state.status.set(format!("replace: {e}")),
            }
        }
    }
    Ok(false)
}

fn drain_results(state: &mut EditorState, worker: &Worker, bk: &mut LoopState) -> Result<()> {
    while let Some(result) = worker.try_pop_result() {
        debug!(id = result.id, kind = ?result.kind, error = result.error, "worker result");
        match result.payload {
            ResultPayload::Search {
                matches_found,
                complete,
            } => {
                if Some(result.id) == state.search.task_id && complete {
                    state
                        .status
                        .set(format!("{matches_found} match(es)"));
                }
            }
            ResultPayload::Replace { planned, complete } => {
                if result.ok() && complete {
                    if let Some(plan) = bk.pending_plan.take() {
                        let plan = plan
                            .lock()
                            .map_err(|_| anyhow::anyhow!("replace plan poisoned"))?;
                        let (applied, skipped) = state.apply_replacements(&plan)?;
                        state.status.set(if skipped > 0 {
                            format!("Replaced {applied}, skipped {skipped} stale")
                        } else {
                            format!("Replaced {applied} of {planned}")
                        });
                    }
                } else if !result.ok() {
                    bk.pending_plan = None;
                    state.status.set("Replace cancelled");
                }
            }
            ResultPayload::Autosave { ref path, bytes_written } => {
                if result.ok() {
                    debug!(path = %path.display(), bytes_written, "autosave complete");
                } else {
                    warn!(path = %path.display(), error = result.error, "autosave failed");
                    state.status.set("Autosave failed");
                }
            }
            ResultPayload::Warm { .. } | ResultPayload::None => {}
        }
    }
    Ok(())
}

fn maybe_autosave(state: &mut EditorState, worker: &Worker, bk: &mut LoopState) -> Result<()> {
    if !state.buffer.modified || bk.last_autosave.elapsed() < AUTOSAVE_INTERVAL {
        return Ok(());
    }
    let Some(swap) = state.swap_path() else {
        return Ok(());
    };
    let snapshot = state.buffer.snapshot(swap)?;
    if worker.submit(TaskPayload::Autosave { snapshot }).is_ok() {
        bk.last_autosave = Instant::now();
    }
    Ok(())
}
