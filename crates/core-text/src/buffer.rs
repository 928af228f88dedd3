//! Buffer: an ordered, dense sequence of lines over an optional mmap
//! backing.
//!
//! The shareable part (lines + backing) lives in `LineStore` behind an
//! `Arc`, so the background worker can warm and read lines while the main
//! thread keeps exclusive `&mut` access to everything else (modification
//! flag, pair-id counter, file name). Structural mutations (inserting or
//! removing lines) take the store's write lock briefly; per-line content is
//! guarded by each line's own lock.

use std::fs::File;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use memmap2::Mmap;
use tracing::debug;

use crate::cell::Cell;
use crate::error::{CoreError, Result};
use crate::grapheme;
use crate::line::{LINES_INITIAL_CAPACITY, Line, Temperature, grown_capacity, reserve_cells};

/// Point-in-time copy of a buffer's contents handed across the thread
/// boundary for autosave.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub lines: Vec<String>,
    pub swap_path: PathBuf,
}

/// Lines plus mmap backing; the part of a buffer shared with the worker.
pub struct LineStore {
    lines: RwLock<Vec<Arc<Line>>>,
    backing: RwLock<Option<Mmap>>,
}

impl LineStore {
    fn new(lines: Vec<Arc<Line>>, backing: Option<Mmap>) -> LineStore {
        LineStore {
            lines: RwLock::new(lines),
            backing: RwLock::new(backing),
        }
    }

    pub fn line_count(&self) -> usize {
        self.lines.read().map(|l| l.len()).unwrap_or(0)
    }

    pub fn line(&self, row: usize) -> Option<Arc<Line>> {
        self.lines.read().ok()?.get(row).cloned()
    }

    /// Promote a COLD line to WARM. Returns `true` if this call did the
    /// promotion, `false` if the line was already materialized.
    pub fn warm_line(&self, row: usize) -> Result<bool> {
        let Some(line) = self.line(row) else {
            return Ok(false);
        };
        if line.temperature() != Temperature::Cold {
            return Ok(false);
        }
        let backing = self
            .backing
            .read()
            .map_err(|_| CoreError::Lock("buffer backing"))?;
        let bytes: &[u8] = backing.as_deref().unwrap_or(&[]);
        line.warm(bytes)
    }

    /// Warm `[start_row, end_row)`, skipping already-warm lines. Returns
    /// `(warmed, skipped)`.
    pub fn warm_range(&self, start_row: usize, end_row: usize) -> Result<(usize, usize)> {
        let end = end_row.min(self.line_count());
        let mut warmed = 0;
        let mut skipped = 0;
        for row in start_row..end {
            if self.warm_line(row)? {
                warmed += 1;
            } else {
                skipped += 1;
            }
        }
        Ok((warmed, skipped))
    }

    /// Decoded text of one row, warming it first.
    pub fn row_text(&self, row: usize) -> Result<Option<String>> {
        if row >= self.line_count() {
            return Ok(None);
        }
        self.warm_line(row)?;
        Ok(self.line(row).map(|l| l.text()))
    }

    fn insert_line(&self, row: usize, line: Line) -> Result<()> {
        let mut lines = self
            .lines
            .write()
            .map_err(|_| CoreError::Lock("buffer lines"))?;
        let needed = lines.len() + 1;
        if needed > lines.capacity() {
            let target = grown_capacity(LINES_INITIAL_CAPACITY.max(lines.capacity()), needed);
            let additional = target - lines.len();
            lines
                .try_reserve_exact(additional)
                .map_err(|_| CoreError::Alloc)?;
        }
        let row = row.min(lines.len());
        lines.insert(row, Arc::new(line));
        Ok(())
    }

    fn remove_line(&self, row: usize) -> Result<Option<Arc<Line>>> {
        let mut lines = self
            .lines
            .write()
            .map_err(|_| CoreError::Lock("buffer lines"))?;
        if row >= lines.len() {
            return Ok(None);
        }
        Ok(Some(lines.remove(row)))
    }

    fn swap(&self, a: usize, b: usize) -> Result<()> {
        let mut lines = self
            .lines
            .write()
            .map_err(|_| CoreError::Lock("buffer lines"))?;
        if a < lines.len() && b < lines.len() {
            lines.swap(a, b);
        }
        Ok(())
    }

    fn replace_lines(&self, fresh: Vec<Arc<Line>>) -> Result<()> {
        let mut lines = self
            .lines
            .write()
            .map_err(|_| CoreError::Lock("buffer lines"))?;
        *lines = fresh;
        Ok(())
    }

    fn release_backing(&self) {
        if let Ok(mut backing) = self.backing.write() {
            *backing = None;
        }
    }
}

/// An open document: lines, optional file backing, modification tracking,
/// and the pair-id allocator for the delimiter scan.
pub struct Buffer {
    store: Arc<LineStore>,
    pub file_name: Option<PathBuf>,
    pub modified: bool,
    next_pair_id: u32,
}

impl Buffer {
    /// An empty buffer with no lines and no file.
    pub fn new() -> Buffer {
        Buffer {
            store: Arc::new(LineStore::new(Vec::new(), None)),
            file_name: None,
            modified: false,
            next_pair_id: 0,
        }
    }

    /// Open `path`, mapping it read-only and indexing its lines COLD. A
    /// missing file yields an empty buffer with the name preset.
    pub fn open(path: impl AsRef<Path>) -> Result<Buffer> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let mut buf = Buffer::new();
                buf.file_name = Some(path.to_path_buf());
                return Ok(buf);
            }
            Err(e) => return Err(e.into()),
        };
        let meta = file.metadata()?;
        if meta.len() == 0 {
            let mut buf = Buffer::new();
            buf.file_name = Some(path.to_path_buf());
            return Ok(buf);
        }
        // Safety: the map is read-only and the file is reopened on save;
        // external truncation mid-session is the usual mmap caveat.
        let mmap = unsafe { Mmap::map(&file)? };
        #[cfg(unix)]
        mmap.advise(memmap2::Advice::Random)?;
        let lines = index_lines(&mmap)?;
        debug!(target: "buffer", lines = lines.len(), bytes = mmap.len(), "mapped file");
        Ok(Buffer {
            store: Arc::new(LineStore::new(lines, Some(mmap))),
            file_name: Some(path.to_path_buf()),
            modified: false,
            next_pair_id: 0,
        })
    }

    /// Build a buffer from an in-memory slice; every line is created HOT
    /// and no mmap backing exists.
    pub fn from_bytes(bytes: &[u8]) -> Result<Buffer> {
        let text = String::from_utf8_lossy(bytes);
        let mut lines: Vec<Arc<Line>> = Vec::new();
        for raw in split_lines(&text) {
            let mut cells = Vec::new();
            reserve_cells(&mut cells, raw.len())?;
            cells.extend(raw.chars().map(Cell::new));
            lines.push(Arc::new(Line::hot(cells)));
        }
        Ok(Buffer {
            store: Arc::new(LineStore::new(lines, None)),
            file_name: None,
            modified: false,
            next_pair_id: 0,
        })
    }

    /// Shared handle for the worker thread.
    pub fn store(&self) -> Arc<LineStore> {
        Arc::clone(&self.store)
    }

    pub fn line_count(&self) -> usize {
        self.store.line_count()
    }

    pub fn line(&self, row: usize) -> Option<Arc<Line>> {
        self.store.line(row)
    }

    /// Cell count of a row, warming it first so the answer is exact.
    pub fn line_len(&self, row: usize) -> usize {
        let _ = self.store.warm_line(row);
        self.line(row).map(|l| l.len()).unwrap_or(0)
    }

    pub fn warm_line(&self, row: usize) -> Result<bool> {
        self.store.warm_line(row)
    }

    pub fn extension(&self) -> Option<String> {
        self.file_name
            .as_ref()
            .and_then(|p| p.extension())
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
    }

    // ---- pair-id allocation ------------------------------------------------

    /// Reset the id space at the start of a pair-recomputation pass.
    pub fn reset_pair_ids(&mut self) {
        self.next_pair_id = 0;
    }

    /// Fresh pair id; ids are 1-based, 0 means "no pair".
    pub fn alloc_pair_id(&mut self) -> u32 {
        self.next_pair_id += 1;
        self.next_pair_id
    }

    // ---- edit operations ---------------------------------------------------
    //
    // Every cell mutation warms the target line first, mutates under the
    // line's write lock, then (guard dropped) marks the line HOT and the
    // buffer modified.

    fn line_for_edit(&mut self, row: usize) -> Result<Arc<Line>> {
        while row >= self.line_count() {
            self.store.insert_line(self.line_count(), Line::hot(Vec::new()))?;
        }
        self.store.warm_line(row)?;
        self.store
            .line(row)
            .ok_or(CoreError::InvalidArgument("row out of range"))
    }

    /// Insert one codepoint at `(row, col)`; a column past the end appends.
    pub fn insert_cell(&mut self, row: usize, col: usize, ch: char) -> Result<()> {
        let line = self.line_for_edit(row)?;
        {
            let mut cells = line.cells_mut()?;
            reserve_cells(&mut cells, 1)?;
            let col = col.min(cells.len());
            cells.insert(col, Cell::new(ch));
        }
        line.mark_hot();
        self.modified = true;
        Ok(())
    }

    pub fn append_cell(&mut self, row: usize, ch: char) -> Result<()> {
        let len = self.line_len(row);
        self.insert_cell(row, len, ch)
    }

    /// Remove the single cell at `(row, col)`; out of range is a no-op.
    pub fn delete_cell(&mut self, row: usize, col: usize) -> Result<()> {
        if row >= self.line_count() {
            return Ok(());
        }
        let line = self.line_for_edit(row)?;
        let removed = {
            let mut cells = line.cells_mut()?;
            if col < cells.len() {
                cells.remove(col);
                true
            } else {
                false
            }
        };
        if removed {
            line.mark_hot();
            self.modified = true;
        }
        Ok(())
    }

    /// Split `row` at `col`: the line truncates to `col` cells and a new
    /// line with the tail appears below.
    pub fn insert_newline(&mut self, row: usize, col: usize) -> Result<()> {
        let line = self.line_for_edit(row)?;
        let tail = {
            let mut cells = line.cells_mut()?;
            let col = col.min(cells.len());
            cells.split_off(col)
        };
        line.mark_hot();
        self.store.insert_line(row + 1, Line::hot(tail))?;
        self.modified = true;
        Ok(())
    }

    /// Delete the grapheme at `(row, col)`. At end-of-line this joins the
    /// following line; at the end of the last line it is a no-op.
    pub fn delete_grapheme(&mut self, row: usize, col: usize) -> Result<()> {
        if row >= self.line_count() {
            return Ok(());
        }
        let line = self.line_for_edit(row)?;
        let len = line.len();
        if col >= len {
            if row + 1 >= self.line_count() {
                return Ok(());
            }
            self.append_cells_from_line(row, row + 1)?;
            self.store.remove_line(row + 1)?;
            self.modified = true;
            return Ok(());
        }
        {
            let mut cells = line.cells_mut()?;
            let end = grapheme::next_boundary(&cells, col);
            cells.drain(col..end);
        }
        line.mark_hot();
        self.modified = true;
        Ok(())
    }

    /// Append every cell of `src_row` onto `row` (the source line is left
    /// in place; callers remove it when joining).
    pub fn append_cells_from_line(&mut self, row: usize, src_row: usize) -> Result<()> {
        if row == src_row || src_row >= self.line_count() {
            return Ok(());
        }
        self.store.warm_line(src_row)?;
        let src = self
            .store
            .line(src_row)
            .ok_or(CoreError::InvalidArgument("row out of range"))?;
        let tail: Vec<Cell> = src.cells()?.clone();
        let line = self.line_for_edit(row)?;
        {
            let mut cells = line.cells_mut()?;
            reserve_cells(&mut cells, tail.len())?;
            cells.extend(tail);
        }
        line.mark_hot();
        self.modified = true;
        Ok(())
    }

    /// Insert a whole new line at `row` with the given content (HOT, no
    /// backing). Rows at and below `row` shift down.
    pub fn insert_line_text(&mut self, row: usize, text: &str) -> Result<()> {
        let mut cells = Vec::new();
        reserve_cells(&mut cells, text.len())?;
        cells.extend(text.chars().map(Cell::new));
        self.store.insert_line(row, Line::hot(cells))?;
        self.modified = true;
        Ok(())
    }

    /// Remove an entire line; the buffer stays dense.
    pub fn remove_line(&mut self, row: usize) -> Result<()> {
        if self.store.remove_line(row)?.is_some() {
            self.modified = true;
        }
        Ok(())
    }

    pub fn swap_lines(&mut self, a: usize, b: usize) -> Result<()> {
        if a == b || a >= self.line_count() || b >= self.line_count() {
            return Ok(());
        }
        self.store.swap(a, b)?;
        self.modified = true;
        Ok(())
    }

    /// Replace cells `[start_col, end_col)` of `row` with `text` (single
    /// line). Used by the replace-all apply phase.
    pub fn replace_span(
        &mut self,
        row: usize,
        start_col: usize,
        end_col: usize,
        text: &str,
    ) -> Result<()> {
        let line = self.line_for_edit(row)?;
        {
            let mut cells = line.cells_mut()?;
            let start = start_col.min(cells.len());
            let end = end_col.min(cells.len()).max(start);
            let new_cells: Vec<Cell> = text.chars().map(Cell::new).collect();
            reserve_cells(&mut cells, new_cells.len().saturating_sub(end - start))?;
            cells.splice(start..end, new_cells);
        }
        line.mark_hot();
        self.modified = true;
        Ok(())
    }

    /// Text of cells `[start_col, end_col)` of `row`, for span revalidation.
    pub fn span_text(&self, row: usize, start_col: usize, end_col: usize) -> Result<String> {
        self.store.warm_line(row)?;
        let Some(line) = self.line(row) else {
            return Ok(String::new());
        };
        let cells = line.cells()?;
        let start = start_col.min(cells.len());
        let end = end_col.min(cells.len()).max(start);
        Ok(cells[start..end].iter().map(|c| c.ch).collect())
    }

    /// Delete the normalized span `[start, end)` expressed as (row, col)
    /// pairs, joining the boundary lines when the span covers several rows.
    pub fn delete_range(
        &mut self,
        start: (usize, usize),
        end: (usize, usize),
    ) -> Result<()> {
        let (start, end) = if end < start { (end, start) } else { (start, end) };
        let (sr, sc) = start;
        let (er, ec) = end;
        if sr >= self.line_count() || start == end {
            return Ok(());
        }
        if sr == er {
            let line = self.line_for_edit(sr)?;
            {
                let mut cells = line.cells_mut()?;
                let s = sc.min(cells.len());
                let e = ec.min(cells.len()).max(s);
                cells.drain(s..e);
            }
            line.mark_hot();
            self.modified = true;
            return Ok(());
        }
        let er = er.min(self.line_count() - 1);
        // Truncate the first row, trim the last row's head, join, then drop
        // the fully-covered middle rows.
        let first = self.line_for_edit(sr)?;
        {
            let mut cells = first.cells_mut()?;
            let s = sc.min(cells.len());
            cells.truncate(s);
        }
        first.mark_hot();
        let last = self.line_for_edit(er)?;
        {
            let mut cells = last.cells_mut()?;
            let e = ec.min(cells.len());
            cells.drain(..e);
        }
        last.mark_hot();
        self.append_cells_from_line(sr, er)?;
        for _ in sr + 1..=er {
            self.store.remove_line(sr + 1)?;
        }
        self.modified = true;
        Ok(())
    }

    // ---- persistence -------------------------------------------------------

    /// Write every line back to the buffer's file as UTF-8 with trailing
    /// newlines, releasing the mmap first. Clears the modification flag.
    pub fn save(&mut self) -> Result<u64> {
        let path = self
            .file_name
            .clone()
            .ok_or(CoreError::InvalidArgument("buffer has no file name"))?;
        let written = self.save_to(&path)?;
        self.modified = false;
        Ok(written)
    }

    pub fn save_as(&mut self, path: impl AsRef<Path>) -> Result<u64> {
        self.file_name = Some(path.as_ref().to_path_buf());
        self.save()
    }

    fn save_to(&self, path: &Path) -> Result<u64> {
        // Warm everything so no line still needs the map, then drop it so
        // the file can be truncated underneath.
        for row in 0..self.line_count() {
            self.store.warm_line(row)?;
        }
        self.store.release_backing();
        let file = File::create(path)?;
        let mut out = BufWriter::new(file);
        let mut written = 0u64;
        for row in 0..self.line_count() {
            if let Some(line) = self.line(row) {
                let text = line.text();
                out.write_all(text.as_bytes())?;
                out.write_all(b"\n")?;
                written += text.len() as u64 + 1;
            }
        }
        out.flush()?;
        debug!(target: "buffer", path = %path.display(), bytes = written, "saved");
        Ok(written)
    }

    /// Decoded contents as one string per line (warming as needed).
    pub fn lines_text(&self) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        lines
            .try_reserve_exact(self.line_count())
            .map_err(|_| CoreError::Alloc)?;
        for row in 0..self.line_count() {
            self.store.warm_line(row)?;
            if let Some(line) = self.line(row) {
                lines.push(line.text());
            }
        }
        Ok(lines)
    }

    /// Replace the whole line sequence with `lines`, keeping the shared
    /// store handle alive (the worker's `Arc` stays valid). Used by undo
    /// restore and reload.
    pub fn replace_all_lines(&mut self, lines: &[String]) -> Result<()> {
        let mut fresh: Vec<Arc<Line>> = Vec::new();
        fresh
            .try_reserve_exact(grown_capacity(LINES_INITIAL_CAPACITY, lines.len()))
            .map_err(|_| CoreError::Alloc)?;
        for text in lines {
            let mut cells = Vec::new();
            reserve_cells(&mut cells, text.len())?;
            cells.extend(text.chars().map(Cell::new));
            fresh.push(Arc::new(Line::hot(cells)));
        }
        self.store.replace_lines(fresh)?;
        self.modified = true;
        Ok(())
    }

    /// Immutable copy of the contents destined for the autosave task.
    pub fn snapshot(&self, swap_path: PathBuf) -> Result<Snapshot> {
        Ok(Snapshot {
            lines: self.lines_text()?,
            swap_path,
        })
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Buffer::new()
    }
}

/// Scan the mapped bytes for newline separators, recording COLD spans and
/// stripping a carriage return that precedes a newline.
fn index_lines(bytes: &[u8]) -> Result<Vec<Arc<Line>>> {
    let newline_count = bytes.iter().filter(|&&b| b == b'\n').count();
    let mut lines: Vec<Arc<Line>> = Vec::new();
    lines
        .try_reserve_exact(grown_capacity(LINES_INITIAL_CAPACITY, newline_count + 1))
        .map_err(|_| CoreError::Alloc)?;
    let mut start = 0usize;
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'\n' {
            let mut end = i;
            if end > start && bytes[end - 1] == b'\r' {
                end -= 1;
            }
            lines.push(Arc::new(Line::cold(start, end - start)));
            start = i + 1;
        }
    }
    if start < bytes.len() {
        lines.push(Arc::new(Line::cold(start, bytes.len() - start)));
    }
    Ok(lines)
}

/// Split decoded text into lines, canonicalising `\r\n` to `\n`. A final
/// newline terminates the last line rather than opening an empty one.
fn split_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    let trimmed = text.strip_suffix('\n').unwrap_or(text);
    trimmed
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect()
}
