//! Editor state: buffer, cursor set, scroll, modes, prompts, and the undo
//! engine.
//!
//! All mutation funnels through `EditorState` so the recomputation policy
//! stays in one place: an edited line gets its neighbor layer and syntax
//! refreshed; an edit that can shift delimiter structure (newline, paste,
//! selection delete, bracket characters) triggers the buffer-wide pair
//! rescan first. Multi-cursor edits apply in position order and remap the
//! remaining cursors through the coordinate maps in `cursor`.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use core_syntax::Highlighter;
use core_text::{Buffer, Result, WrapMode, grapheme, neighbor, width};
use core_worker::{ReplacePlan, SearchResults};
use tracing::debug;

pub mod action;
pub mod cursor;
pub mod scroll;
pub mod undo;

pub use action::{Action, Direction, Effect, KeyInput, LeaderMenu, Mode};
pub use cursor::{Cursor, Cursors, MAX_CURSORS};
pub use scroll::ScrollVelocity;
pub use undo::{UNDO_HISTORY_MAX, UndoEngine};

use cursor::{map_after_delete, map_after_insert, map_after_join, map_after_newline};

/// Status messages stay visible this long.
pub const MESSAGE_TTL: Duration = Duration::from_secs(5);

/// Characters whose insertion or removal can change pair structure.
fn shifts_delimiters(ch: char) -> bool {
    matches!(ch, '(' | ')' | '[' | ']' | '{' | '}' | '/' | '*')
}

#[derive(Debug, Default)]
pub struct StatusMessage {
    text: String,
    set_at: Option<Instant>,
}

impl StatusMessage {
    pub fn set(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.set_at = Some(Instant::now());
    }

    /// The message, unless it has expired.
    pub fn current(&self, now: Instant) -> Option<&str> {
        let set_at = self.set_at?;
        if now.saturating_duration_since(set_at) <= MESSAGE_TTL {
            Some(&self.text)
        } else {
            None
        }
    }
}

/// Incremental search state; the match list itself lives in the shared
/// structure the worker writes into.
#[derive(Default)]
pub struct SearchState {
    pub forward: bool,
    pub replace: bool,
    /// False while the pattern is being typed, true once the prompt has
    /// moved on to the replacement text.
    pub replace_phase: bool,
    pub pattern: String,
    pub replacement: String,
    pub results: Option<Arc<Mutex<SearchResults>>>,
    pub task_id: Option<u64>,
    pub current: Option<usize>,
}

pub struct EditorState {
    pub buffer: Buffer,
    pub cursors: Cursors,
    pub row_offset: usize,
    pub col_offset: usize,
    pub screen_rows: usize,
    pub screen_cols: usize,
    pub tab_width: usize,
    pub wrap_mode: WrapMode,
    pub mode: Mode,
    /// Collapse hideable Markdown punctuation away from the cursor row.
    pub hybrid_markdown: bool,
    pub prompt: String,
    pub status: StatusMessage,
    pub search: SearchState,
    pub undo: UndoEngine,
    pub wheel: ScrollVelocity,
    highlighter: &'static dyn Highlighter,
    insert_run: bool,
}

impl EditorState {
    pub fn new(buffer: Buffer) -> EditorState {
        let highlighter = core_syntax::for_path(buffer.file_name.as_deref());
        EditorState {
            buffer,
            cursors: Cursors::new(),
            row_offset: 0,
            col_offset: 0,
            screen_rows: 24,
            screen_cols: 80,
            tab_width: 8,
            wrap_mode: WrapMode::None,
            mode: Mode::Normal,
            hybrid_markdown: true,
            prompt: String::new(),
            status: StatusMessage::default(),
            search: SearchState::default(),
            undo: UndoEngine::new(),
            wheel: ScrollVelocity::new(),
            highlighter,
            insert_run: false,
        }
    }

    pub fn highlighter(&self) -> &'static dyn Highlighter {
        self.highlighter
    }

    pub fn set_dimensions(&mut self, rows: usize, cols: usize) {
        self.screen_rows = rows;
        self.screen_cols = cols;
        // A new width invalidates every wrap cache.
        for row in 0..self.buffer.line_count() {
            if let Some(line) = self.buffer.line(row) {
                line.invalidate_wrap();
            }
        }
    }

    /// Rows available for text (status + message bars excluded).
    pub fn text_rows(&self) -> usize {
        self.screen_rows.saturating_sub(2).max(1)
    }

    /// Gutter width: digits of the highest line number (min 2) + 1 space.
    pub fn gutter_width(&self) -> usize {
        let mut digits = 0;
        let mut n = self.buffer.line_count().max(1);
        while n > 0 {
            digits += 1;
            n /= 10;
        }
        digits.max(2) + 1
    }

    pub fn text_cols(&self) -> usize {
        self.screen_cols.saturating_sub(self.gutter_width()).max(1)
    }

    fn line_len(&self, row: usize) -> usize {
        self.buffer.line_len(row)
    }

    fn cells_of(&self, row: usize) -> Vec<core_text::Cell> {
        let _ = self.buffer.warm_line(row);
        self.buffer
            .line(row)
            .and_then(|l| l.cells().ok().map(|c| c.clone()))
            .unwrap_or_default()
    }

    // ---- cursor motion -----------------------------------------------------

    fn begin_motion(&mut self, select: bool) {
        for c in self.cursors.iter_mut() {
            if select {
                c.start_selection();
            } else {
                c.clear_selection();
            }
        }
        self.insert_run = false;
    }

    pub fn move_cursors(&mut self, dir: Direction, select: bool, word: bool) {
        self.begin_motion(select);
        let line_count = self.buffer.line_count();
        for i in 0..self.cursors.len() {
            let (row, col) = self.cursors.get(i).pos();
            let (new_row, new_col, keep_goal) = match dir {
                Direction::Left => {
                    let cells = self.cells_for_motion(row);
                    if word {
                        if col == 0 && row > 0 {
                            let prev_len = self.line_len(row - 1);
                            (row - 1, prev_len, false)
                        } else {
                            (row, neighbor::prev_word_start(&cells, col), false)
                        }
                    } else if col > 0 {
                        (row, grapheme::prev_boundary(&cells, col), false)
                    } else if row > 0 {
                        (row - 1, self.line_len(row - 1), false)
                    } else {
                        (row, col, false)
                    }
                }
                Direction::Right => {
                    let cells = self.cells_for_motion(row);
                    let len = cells.len();
                    if word {
                        if col >= len && row + 1 < line_count {
                            (row + 1, 0, false)
                        } else {
                            (row, neighbor::next_word_start(&cells, col), false)
                        }
                    } else if col < len {
                        (row, grapheme::next_boundary(&cells, col), false)
                    } else if row + 1 < line_count {
                        (row + 1, 0, false)
                    } else {
                        (row, col, false)
                    }
                }
                Direction::Up => {
                    if row == 0 {
                        (row, col, true)
                    } else {
                        let goal = self.cursors.get(i).goal_col;
                        let target = goal.min(self.line_len(row - 1));
                        (row - 1, target, true)
                    }
                }
                Direction::Down => {
                    if row + 1 >= line_count {
                        (row, col, true)
                    } else {
                        let goal = self.cursors.get(i).goal_col;
                        let target = goal.min(self.line_len(row + 1));
                        (row + 1, target, true)
                    }
                }
            };
            let c = self.cursors.get_mut(i);
            c.move_to(new_row, new_col);
            if !keep_goal {
                c.goal_col = new_col;
            }
        }
    }

    fn cells_for_motion(&self, row: usize) -> Vec<core_text::Cell> {
        let mut cells = self.cells_of(row);
        // Word motion reads the neighbor layer; make sure it is current.
        neighbor::annotate(&mut cells);
        cells
    }

    pub fn move_home(&mut self, select: bool) {
        self.begin_motion(select);
        for c in self.cursors.iter_mut() {
            c.col = 0;
            c.goal_col = 0;
        }
    }

    pub fn move_end(&mut self, select: bool) {
        self.begin_motion(select);
        for i in 0..self.cursors.len() {
            let row = self.cursors.get(i).row;
            let len = self.line_len(row);
            let c = self.cursors.get_mut(i);
            c.col = len;
            c.goal_col = len;
        }
    }

    pub fn move_page(&mut self, dir: Direction, select: bool) {
        self.begin_motion(select);
        let page = self.text_rows();
        let line_count = self.buffer.line_count();
        for i in 0..self.cursors.len() {
            let (row, _) = self.cursors.get(i).pos();
            let new_row = match dir {
                Direction::Up => row.saturating_sub(page),
                _ => (row + page).min(line_count.saturating_sub(1)),
            };
            let target = self.cursors.get(i).goal_col.min(self.line_len(new_row));
            self.cursors.get_mut(i).move_to(new_row, target);
        }
    }

    /// Place the single cursor from a mouse click given a rendered column.
    pub fn click(&mut self, row: usize, rendered_col: usize) {
        self.cursors.collapse();
        let row = row.min(self.buffer.line_count().saturating_sub(1));
        let cells = self.cells_of(row);
        let col = width::col_at_rendered(&cells, rendered_col, self.tab_width);
        let c = self.cursors.primary_mut();
        c.move_to(row, col);
        c.clear_selection();
        c.goal_col = col;
    }

    /// Double-click: select the word under the cell, expanding while the
    /// neighbor class matches.
    pub fn select_word_at(&mut self, row: usize, rendered_col: usize) {
        self.click(row, rendered_col);
        let row = self.cursors.primary().row;
        let mut cells = self.cells_of(row);
        neighbor::annotate(&mut cells);
        let (start, end) = neighbor::word_span(&cells, self.cursors.primary().col);
        let c = self.cursors.primary_mut();
        c.anchor_row = row;
        c.anchor_col = start;
        c.move_to(row, end);
        c.has_selection = start != end;
    }

    pub fn add_cursor_above(&mut self) {
        let (row, col) = self.cursors.primary().pos();
        if row > 0 {
            self.cursors.add(row - 1, col.min(self.line_len(row - 1)));
        }
    }

    pub fn add_cursor_below(&mut self) {
        let (row, col) = self.cursors.primary().pos();
        if row + 1 < self.buffer.line_count() {
            self.cursors.add(row + 1, col.min(self.line_len(row + 1)));
        }
    }

    // ---- edits -------------------------------------------------------------

    fn remap_all(&mut self, f: impl Fn((usize, usize)) -> (usize, usize)) {
        for c in self.cursors.iter_mut() {
            let p = f(c.pos());
            let a = f(c.anchor());
            c.move_to(p.0, p.1);
            c.goal_col = p.1;
            c.anchor_row = a.0;
            c.anchor_col = a.1;
        }
    }

    fn refresh_rows(&mut self, rows: &[usize]) -> Result<()> {
        for &row in rows {
            if row < self.buffer.line_count() {
                core_syntax::refresh_line(&self.buffer, self.highlighter, row)?;
            }
        }
        Ok(())
    }

    fn refresh_structure(&mut self) -> Result<()> {
        core_syntax::refresh_structure(&mut self.buffer, self.highlighter)
    }

    fn snapshot_for_edit(&mut self) -> Result<()> {
        if !self.insert_run {
            self.undo.push_snapshot(&self.buffer, &self.cursors)?;
        }
        Ok(())
    }

    pub fn insert_char(&mut self, ch: char) -> Result<()> {
        self.snapshot_for_edit()?;
        self.insert_run = true;
        self.delete_selections_if_any()?;
        let order = self.cursors.order();
        let mut touched = Vec::new();
        for &i in &order {
            let at = self.cursors.get(i).pos();
            self.buffer.insert_cell(at.0, at.1, ch)?;
            self.remap_all(|p| map_after_insert(p, at, 1));
            touched.push(at.0);
        }
        if shifts_delimiters(ch) {
            self.refresh_structure()?;
        } else {
            self.refresh_rows(&touched)?;
        }
        Ok(())
    }

    pub fn insert_newline(&mut self) -> Result<()> {
        // A newline is a coalescing boundary for undo.
        self.insert_run = false;
        self.snapshot_for_edit()?;
        self.delete_selections_if_any()?;
        let order = self.cursors.order();
        for &i in &order {
            let at = self.cursors.get(i).pos();
            self.buffer.insert_newline(at.0, at.1)?;
            self.remap_all(|p| map_after_newline(p, at));
        }
        self.refresh_structure()
    }

    pub fn backspace(&mut self) -> Result<()> {
        if self.any_selection() {
            return self.delete_selection();
        }
        self.snapshot_for_edit()?;
        self.insert_run = true;
        let order = self.cursors.order();
        let mut joined = false;
        let mut touched = Vec::new();
        for &i in &order {
            let (row, col) = self.cursors.get(i).pos();
            if col > 0 {
                let cells = self.cells_of(row);
                let start = grapheme::prev_boundary(&cells, col);
                self.buffer.delete_range((row, start), (row, col))?;
                self.remap_all(|p| map_after_delete(p, (row, start), (row, col)));
                touched.push(row);
            } else if row > 0 {
                let prev_len = self.line_len(row - 1);
                self.buffer.delete_grapheme(row - 1, prev_len)?;
                self.remap_all(|p| map_after_join(p, row - 1, prev_len));
                joined = true;
                touched.push(row - 1);
            }
        }
        if joined {
            self.refresh_structure()
        } else {
            self.refresh_rows(&touched)
        }
    }

    pub fn delete_forward(&mut self) -> Result<()> {
        if self.any_selection() {
            return self.delete_selection();
        }
        self.snapshot_for_edit()?;
        self.insert_run = false;
        let order = self.cursors.order();
        let mut joined = false;
        let mut touched = Vec::new();
        for &i in &order {
            let (row, col) = self.cursors.get(i).pos();
            let len = self.line_len(row);
            if col < len {
                let cells = self.cells_of(row);
                let end = grapheme::next_boundary(&cells, col);
                self.buffer.delete_range((row, col), (row, end))?;
                self.remap_all(|p| map_after_delete(p, (row, col), (row, end)));
                touched.push(row);
            } else if row + 1 < self.buffer.line_count() {
                self.buffer.delete_grapheme(row, len)?;
                self.remap_all(|p| map_after_join(p, row, len));
                joined = true;
                touched.push(row);
            }
        }
        if joined {
            self.refresh_structure()
        } else {
            self.refresh_rows(&touched)
        }
    }

    fn any_selection(&self) -> bool {
        self.cursors.iter().any(|c| c.selection().is_some())
    }

    fn delete_selections_if_any(&mut self) -> Result<()> {
        if self.any_selection() {
            let _ = self.delete_selections_inner()?;
            self.refresh_structure()?;
        }
        Ok(())
    }

    /// Delete every cursor's selection (selection deletes can shift
    /// delimiters, so the pair scan reruns).
    pub fn delete_selection(&mut self) -> Result<()> {
        self.snapshot_for_edit()?;
        self.insert_run = false;
        if self.delete_selections_inner()? {
            self.refresh_structure()?;
        }
        Ok(())
    }

    fn delete_selections_inner(&mut self) -> Result<bool> {
        let order = self.cursors.order();
        let mut any = false;
        for &i in &order {
            let Some((s, e)) = self.cursors.get(i).selection() else {
                continue;
            };
            self.buffer.delete_range(s, e)?;
            self.remap_all(|p| map_after_delete(p, s, e));
            any = true;
        }
        if any {
            for c in self.cursors.iter_mut() {
                c.clear_selection();
            }
        }
        Ok(any)
    }

    /// Paste `text` at every cursor (multi-line allowed).
    pub fn insert_text(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.insert_run = false;
        self.snapshot_for_edit()?;
        self.delete_selections_if_any()?;
        let parts: Vec<&str> = text.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l)).collect();
        let order = self.cursors.order();
        for &i in &order {
            let at = self.cursors.get(i).pos();
            if parts.len() == 1 {
                let cols = parts[0].chars().count();
                self.buffer.replace_span(at.0, at.1, at.1, parts[0])?;
                self.remap_all(|p| map_after_insert(p, at, cols));
            } else {
                // Split, then extend head, insert middles, prefix the tail.
                self.buffer.insert_newline(at.0, at.1)?;
                self.buffer
                    .replace_span(at.0, at.1, at.1, parts[0])?;
                for (k, part) in parts[1..parts.len() - 1].iter().enumerate() {
                    self.buffer.insert_line_text(at.0 + 1 + k, part)?;
                }
                let last = parts[parts.len() - 1];
                let tail_row = at.0 + parts.len() - 1;
                self.buffer.replace_span(tail_row, 0, 0, last)?;
                let added_rows = parts.len() - 1;
                let last_cols = last.chars().count();
                self.remap_all(|p| {
                    if p.0 == at.0 && p.1 >= at.1 {
                        (at.0 + added_rows, last_cols + (p.1 - at.1))
                    } else if p.0 > at.0 {
                        (p.0 + added_rows, p.1)
                    } else {
                        p
                    }
                });
            }
        }
        self.refresh_structure()
    }

    pub fn undo(&mut self) -> Result<()> {
        self.insert_run = false;
        if self.undo.undo(&mut self.buffer, &mut self.cursors)? {
            self.refresh_structure()?;
            self.clamp_cursors();
        } else {
            self.status.set("Nothing to undo");
        }
        Ok(())
    }

    pub fn redo(&mut self) -> Result<()> {
        self.insert_run = false;
        if self.undo.redo(&mut self.buffer, &mut self.cursors)? {
            self.refresh_structure()?;
            self.clamp_cursors();
        } else {
            self.status.set("Nothing to redo");
        }
        Ok(())
    }

    pub fn clamp_cursors(&mut self) {
        let line_count = self.buffer.line_count();
        for i in 0..self.cursors.len() {
            let (row, col) = self.cursors.get(i).pos();
            let row = row.min(line_count.saturating_sub(1));
            let col = col.min(self.line_len(row));
            self.cursors.get_mut(i).move_to(row, col);
        }
    }

    // ---- replace-all apply -------------------------------------------------

    /// Apply a worker-produced replace plan, re-checking every span still
    /// holds the text the plan was computed against. Returns (applied,
    /// skipped).
    pub fn apply_replacements(&mut self, plan: &ReplacePlan) -> Result<(usize, usize)> {
        self.insert_run = false;
        self.undo.push_snapshot(&self.buffer, &self.cursors)?;
        let mut applied = 0;
        let mut skipped = 0;
        // Descending application keeps earlier coordinates stable.
        for r in plan.replacements.iter().rev() {
            let present = self.buffer.span_text(r.row, r.start_col, r.end_col)?;
            if present != r.expected {
                skipped += 1;
                continue;
            }
            self.buffer
                .replace_span(r.row, r.start_col, r.end_col, &r.text)?;
            applied += 1;
        }
        if applied > 0 {
            self.refresh_structure()?;
        }
        self.clamp_cursors();
        debug!(target: "state", applied, skipped, "replace-all applied");
        Ok((applied, skipped))
    }

    // ---- search navigation -------------------------------------------------

    /// Move the primary cursor to the next (or previous) match relative to
    /// its position, wrapping around.
    pub fn goto_match(&mut self, forward: bool) {
        let Some(results) = self.search.results.clone() else {
            return;
        };
        let Ok(shared) = results.lock() else {
            return;
        };
        if shared.matches.is_empty() {
            return;
        }
        let pos = self.cursors.primary().pos();
        let found = if forward {
            shared
                .matches
                .iter()
                .position(|m| (m.row, m.start_col) > pos)
                .unwrap_or(0)
        } else {
            shared
                .matches
                .iter()
                .rposition(|m| (m.row, m.start_col) < pos)
                .unwrap_or(shared.matches.len() - 1)
        };
        let m = shared.matches[found];
        drop(shared);
        self.search.current = Some(found);
        self.cursors.collapse();
        let c = self.cursors.primary_mut();
        c.move_to(m.row, m.start_col);
        c.clear_selection();
        c.goal_col = m.start_col;
    }

    // ---- scrolling ---------------------------------------------------------

    /// Keep the primary cursor inside the text area.
    pub fn scroll_to_cursor(&mut self) {
        let (row, col) = self.cursors.primary().pos();
        let text_rows = self.text_rows();
        if row < self.row_offset {
            self.row_offset = row;
        } else if row >= self.row_offset + text_rows {
            self.row_offset = row + 1 - text_rows;
        }
        if self.wrap_mode != WrapMode::None {
            self.col_offset = 0;
            return;
        }
        let cells = self.cells_of(row);
        let rendered = width::rendered_col(&cells, col, self.tab_width);
        let text_cols = self.text_cols();
        if rendered < self.col_offset {
            self.col_offset = rendered;
        } else if rendered >= self.col_offset + text_cols {
            self.col_offset = rendered + 1 - text_cols;
        }
    }

    /// Wheel scroll by the adaptive step.
    pub fn wheel_scroll(&mut self, dir: i8, now: Instant) {
        let step = self.wheel.step(dir, now);
        if dir < 0 {
            self.row_offset = self.row_offset.saturating_sub(step);
        } else {
            let max = self.buffer.line_count().saturating_sub(1);
            self.row_offset = (self.row_offset + step).min(max);
        }
    }

    // ---- persistence helpers ----------------------------------------------

    /// Swap path for this buffer (sibling dotfile with a `.swp` suffix).
    pub fn swap_path(&self) -> Option<PathBuf> {
        let path = self.buffer.file_name.as_ref()?;
        let name = path.file_name()?.to_string_lossy();
        Some(path.with_file_name(format!(".{name}.swp")))
    }

    /// Re-read the file from disk, dropping unsaved changes.
    pub fn reload(&mut self) -> Result<()> {
        let Some(path) = self.buffer.file_name.clone() else {
            return Ok(());
        };
        let bytes = match std::fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        let text = String::from_utf8_lossy(&bytes);
        let lines: Vec<String> = if text.is_empty() {
            Vec::new()
        } else {
            text.strip_suffix('\n')
                .unwrap_or(&text)
                .split('\n')
                .map(|l| l.strip_suffix('\r').unwrap_or(l).to_string())
                .collect()
        };
        self.buffer.replace_all_lines(&lines)?;
        self.buffer.modified = false;
        self.cursors.collapse();
        self.clamp_cursors();
        self.refresh_structure()?;
        self.status.set("Reloaded");
        Ok(())
    }
}
