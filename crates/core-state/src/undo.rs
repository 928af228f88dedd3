//! Undo history: coarse whole-buffer snapshots with content-hash dedupe.
//!
//! A snapshot captures the line strings and the cursor set. Restoring
//! rewrites the buffer's lines in place so the store handle shared with
//! the worker stays valid.

use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;

use core_text::{Buffer, Result};
use tracing::trace;

use crate::cursor::Cursors;

/// Maximum number of snapshots retained.
pub const UNDO_HISTORY_MAX: usize = 200;

#[derive(Clone)]
pub struct EditSnapshot {
    lines: Vec<String>,
    cursors: Cursors,
    modified: bool,
    hash: u64,
}

#[derive(Default)]
pub struct UndoEngine {
    undo_stack: Vec<EditSnapshot>,
    redo_stack: Vec<EditSnapshot>,
}

impl UndoEngine {
    pub fn new() -> UndoEngine {
        UndoEngine::default()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Capture the pre-edit state. Identical successive states dedupe.
    pub fn push_snapshot(&mut self, buffer: &Buffer, cursors: &Cursors) -> Result<()> {
        let lines = buffer.lines_text()?;
        let hash = lines_hash(&lines);
        if let Some(last) = self.undo_stack.last()
            && last.hash == hash
        {
            trace!(target: "state.undo", depth = self.undo_stack.len(), "snapshot dedupe skip");
            return Ok(());
        }
        self.undo_stack.push(EditSnapshot {
            lines,
            cursors: cursors.clone(),
            modified: buffer.modified,
            hash,
        });
        if self.undo_stack.len() > UNDO_HISTORY_MAX {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
        trace!(target: "state.undo", depth = self.undo_stack.len(), "push snapshot");
        Ok(())
    }

    pub fn undo(&mut self, buffer: &mut Buffer, cursors: &mut Cursors) -> Result<bool> {
        let Some(snap) = self.undo_stack.pop() else {
            return Ok(false);
        };
        let lines = buffer.lines_text()?;
        self.redo_stack.push(EditSnapshot {
            hash: lines_hash(&lines),
            lines,
            cursors: cursors.clone(),
            modified: buffer.modified,
        });
        restore(buffer, cursors, &snap)?;
        trace!(target: "state.undo", depth = self.undo_stack.len(), "undo");
        Ok(true)
    }

    pub fn redo(&mut self, buffer: &mut Buffer, cursors: &mut Cursors) -> Result<bool> {
        let Some(snap) = self.redo_stack.pop() else {
            return Ok(false);
        };
        let lines = buffer.lines_text()?;
        self.undo_stack.push(EditSnapshot {
            hash: lines_hash(&lines),
            lines,
            cursors: cursors.clone(),
            modified: buffer.modified,
        });
        restore(buffer, cursors, &snap)?;
        trace!(target: "state.undo", depth = self.redo_stack.len(), "redo");
        Ok(true)
    }
}

fn restore(buffer: &mut Buffer, cursors: &mut Cursors, snap: &EditSnapshot) -> Result<()> {
    buffer.replace_all_lines(&snap.lines)?;
    buffer.modified = snap.modified;
    *cursors = snap.cursors.clone();
    Ok(())
}

fn lines_hash(lines: &[String]) -> u64 {
    let mut h = DefaultHasher::new();
    for line in lines {
        h.write(line.as_bytes());
        h.write_u8(b'\n');
    }
    h.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_text::Buffer;

    #[test]
    fn undo_redo_roundtrip() {
        let mut buf = Buffer::from_bytes(b"one\n").unwrap();
        let mut cursors = Cursors::new();
        let mut undo = UndoEngine::new();

        undo.push_snapshot(&buf, &cursors).unwrap();
        buf.append_cell(0, '!').unwrap();
        cursors.primary_mut().move_to(0, 4);

        assert!(undo.undo(&mut buf, &mut cursors).unwrap());
        assert_eq!(buf.line(0).unwrap().text(), "one");
        assert_eq!(cursors.primary().pos(), (0, 0));

        assert!(undo.redo(&mut buf, &mut cursors).unwrap());
        assert_eq!(buf.line(0).unwrap().text(), "one!");
        assert_eq!(cursors.primary().pos(), (0, 4));
    }

    #[test]
    fn duplicate_snapshots_dedupe() {
        let buf = Buffer::from_bytes(b"x\n").unwrap();
        let cursors = Cursors::new();
        let mut undo = UndoEngine::new();
        undo.push_snapshot(&buf, &cursors).unwrap();
        undo.push_snapshot(&buf, &cursors).unwrap();
        assert_eq!(undo.undo_depth(), 1);
    }

    #[test]
    fn undo_on_empty_stack_is_noop() {
        let mut buf = Buffer::from_bytes(b"x\n").unwrap();
        let mut cursors = Cursors::new();
        let mut undo = UndoEngine::new();
        assert!(!undo.undo(&mut buf, &mut cursors).unwrap());
    }
}
