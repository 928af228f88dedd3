//! Pair context: buffer-wide delimiter matching written into cell contexts.
//!
//! A single forward pass identifies `/* */` comment pairs and `()[]{}`
//! bracket pairs, assigning each pair a fresh id and stamping opener and
//! closer cells. Pairs are virtual: no registry exists, only the ids in the
//! cells, so partner lookup is a scan and ownership stays acyclic. The id
//! space is reset at the start of every pass.

use std::sync::Arc;

use core_text::line::Line;
use core_text::{Buffer, PairKind, PairRole, Result};
use tracing::trace;

/// Unmatched openers the scan will keep on its stack. Further openers are
/// silently dropped; their closers stay unmatched.
pub const OPENER_STACK_MAX: usize = 256;

struct OpenDelim {
    id: u32,
    kind: PairKind,
}

fn opener_kind(ch: char) -> Option<PairKind> {
    match ch {
        '(' => Some(PairKind::Paren),
        '[' => Some(PairKind::Bracket),
        '{' => Some(PairKind::Brace),
        _ => None,
    }
}

fn closer_kind(ch: char) -> Option<PairKind> {
    match ch {
        ')' => Some(PairKind::Paren),
        ']' => Some(PairKind::Bracket),
        '}' => Some(PairKind::Brace),
        _ => None,
    }
}

/// Rescan the whole buffer, rewriting every cell's pair context. Warms any
/// COLD line it reaches.
pub fn recompute(buf: &mut Buffer) -> Result<()> {
    buf.reset_pair_ids();
    let mut in_comment: Option<u32> = None;
    let mut stack: Vec<OpenDelim> = Vec::new();
    let mut dropped = 0usize;
    for row in 0..buf.line_count() {
        buf.warm_line(row)?;
        let Some(line) = buf.line(row) else { continue };
        // The guard borrows the Arc clone, not the buffer, so id
        // allocation below can still take `&mut buf`.
        let mut cells = line.cells_mut()?;
        for cell in cells.iter_mut() {
            cell.clear_pair();
        }
        let len = cells.len();
        let mut col = 0;
        while col < len {
            let ch = cells[col].ch;
            let next = cells.get(col + 1).map(|c| c.ch);
            if let Some(id) = in_comment {
                if ch == '*' && next == Some('/') {
                    cells[col].set_pair(id, PairKind::Comment, PairRole::Closer);
                    cells[col + 1].set_pair(id, PairKind::Comment, PairRole::Closer);
                    in_comment = None;
                    col += 2;
                    continue;
                }
                col += 1;
                continue;
            }
            if ch == '/' && next == Some('*') {
                let id = buf.alloc_pair_id();
                cells[col].set_pair(id, PairKind::Comment, PairRole::Opener);
                cells[col + 1].set_pair(id, PairKind::Comment, PairRole::Opener);
                in_comment = Some(id);
                col += 2;
                continue;
            }
            if let Some(kind) = opener_kind(ch) {
                let id = buf.alloc_pair_id();
                cells[col].set_pair(id, kind, PairRole::Opener);
                if stack.len() < OPENER_STACK_MAX {
                    stack.push(OpenDelim { id, kind });
                } else {
                    dropped += 1;
                }
                col += 1;
                continue;
            }
            if let Some(kind) = closer_kind(ch) {
                if let Some(pos) = stack.iter().rposition(|o| o.kind == kind) {
                    cells[col].set_pair(stack[pos].id, kind, PairRole::Closer);
                    // Pop down to (exclusive) the matched entry, discarding
                    // intervening unmatched openers.
                    stack.truncate(pos);
                }
                col += 1;
                continue;
            }
            col += 1;
        }
    }
    if dropped > 0 {
        trace!(target: "syntax.pairs", dropped, "opener stack overflow");
    }
    Ok(())
}

fn cell_at(line: &Arc<Line>, col: usize) -> Option<core_text::Cell> {
    line.cells().ok()?.get(col).copied()
}

/// Position of the partner delimiter of the cell at `(row, col)`, or `None`
/// when the pair is unmatched or the cell carries no pair context.
pub fn find_partner(buf: &Buffer, row: usize, col: usize) -> Result<Option<(usize, usize)>> {
    let Some(line) = buf.line(row) else {
        return Ok(None);
    };
    let Some(cell) = cell_at(&line, col) else {
        return Ok(None);
    };
    let id = cell.pair_id();
    if id == 0 {
        return Ok(None);
    }
    match cell.pair_role() {
        PairRole::Opener => scan_for(buf, id, PairRole::Closer, (row, col), true),
        PairRole::Closer => scan_for(buf, id, PairRole::Opener, (row, col), false),
        PairRole::None => Ok(None),
    }
}

fn scan_for(
    buf: &Buffer,
    id: u32,
    role: PairRole,
    from: (usize, usize),
    forward: bool,
) -> Result<Option<(usize, usize)>> {
    if forward {
        let mut row = from.0;
        let mut col = from.1 + 1;
        while row < buf.line_count() {
            buf.warm_line(row)?;
            if let Some(line) = buf.line(row) {
                let cells = line.cells()?;
                for c in col..cells.len() {
                    if cells[c].pair_id() == id && cells[c].pair_role() == role {
                        return Ok(Some((row, c)));
                    }
                }
            }
            row += 1;
            col = 0;
        }
    } else {
        let mut row = from.0;
        let mut col = Some(from.1);
        loop {
            buf.warm_line(row)?;
            if let Some(line) = buf.line(row) {
                let cells = line.cells()?;
                let end = col.unwrap_or(cells.len());
                for c in (0..end).rev() {
                    if cells[c].pair_id() == id && cells[c].pair_role() == role {
                        return Ok(Some((row, c)));
                    }
                }
            }
            if row == 0 {
                break;
            }
            row -= 1;
            col = None;
        }
    }
    Ok(None)
}

/// Whether `(row, col)` falls inside a block comment. The delimiters
/// themselves count as inside. Scans backward to the nearest comment
/// delimiter; an opener means we are inside unless its closer already
/// appeared before us (in which case that closer would have been found
/// first), so the opener's partner is checked only for existence ordering.
pub fn in_block_comment(buf: &Buffer, row: usize, col: usize) -> Result<bool> {
    if let Some(line) = buf.line(row) {
        if let Some(cell) = cell_at(&line, col)
            && cell.pair_kind() == PairKind::Comment
        {
            return Ok(true);
        }
    }
    // Scan backward from just before (row, col) for the nearest
    // comment-context cell.
    let mut nearest: Option<(usize, usize, PairRole)> = None;
    let mut r = row;
    let mut limit = Some(col);
    loop {
        buf.warm_line(r)?;
        if let Some(line) = buf.line(r) {
            let cells = line.cells()?;
            let end = limit.unwrap_or(cells.len()).min(cells.len());
            for c in (0..end).rev() {
                if cells[c].pair_kind() == PairKind::Comment {
                    nearest = Some((r, c, cells[c].pair_role()));
                    break;
                }
            }
        }
        if nearest.is_some() || r == 0 {
            break;
        }
        r -= 1;
        limit = None;
    }
    match nearest {
        Some((fr, fc, PairRole::Opener)) => match find_partner(buf, fr, fc)? {
            None => Ok(true),
            Some(p) => Ok(p >= (row, col)),
        },
        _ => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_text::{Buffer, PairRole};

    fn scanned(text: &str) -> Buffer {
        let mut buf = Buffer::from_bytes(text.as_bytes()).expect("buffer");
        recompute(&mut buf).expect("pair scan");
        buf
    }

    fn cell(buf: &Buffer, row: usize, col: usize) -> core_text::Cell {
        buf.line(row).unwrap().cells().unwrap()[col]
    }

    #[test]
    fn brackets_pair_up() {
        let buf = scanned("a(b[c]d)e");
        let open_paren = cell(&buf, 0, 1);
        let close_paren = cell(&buf, 0, 7);
        assert_eq!(open_paren.pair_role(), PairRole::Opener);
        assert_eq!(close_paren.pair_role(), PairRole::Closer);
        assert_eq!(open_paren.pair_id(), close_paren.pair_id());
        assert_eq!(cell(&buf, 0, 3).pair_id(), cell(&buf, 0, 5).pair_id());
        assert_ne!(open_paren.pair_id(), cell(&buf, 0, 3).pair_id());
    }

    #[test]
    fn mismatched_closer_discards_intervening_openers() {
        // The `)` matches the `(`; the inner `[` is discarded, so the later
        // `]` is unmatched.
        let buf = scanned("([)]");
        assert_eq!(cell(&buf, 0, 2).pair_id(), cell(&buf, 0, 0).pair_id());
        assert_eq!(cell(&buf, 0, 3).pair_id(), 0);
    }

    #[test]
    fn unmatched_closer_has_zero_context() {
        let buf = scanned(")x");
        assert_eq!(cell(&buf, 0, 0).pair_id(), 0);
    }

    #[test]
    fn comment_pair_spans_lines() {
        let buf = scanned("/* a\nb */");
        let open = cell(&buf, 0, 0);
        assert_eq!(open.pair_kind(), PairKind::Comment);
        assert_eq!(open.pair_role(), PairRole::Opener);
        let close = cell(&buf, 1, 2);
        assert_eq!(close.pair_role(), PairRole::Closer);
        assert_eq!(close.pair_id(), open.pair_id());
        assert_eq!(
            find_partner(&buf, 0, 0).unwrap(),
            Some((1, 2)) // first closer cell, the `*`
        );
        assert_eq!(find_partner(&buf, 1, 3).unwrap(), Some((0, 1)));
    }

    #[test]
    fn containment_inside_comment() {
        let buf = scanned("/* a\nb */ c");
        assert!(in_block_comment(&buf, 0, 0).unwrap());
        assert!(in_block_comment(&buf, 0, 3).unwrap());
        assert!(in_block_comment(&buf, 1, 0).unwrap());
        assert!(in_block_comment(&buf, 1, 3).unwrap());
        assert!(!in_block_comment(&buf, 1, 5).unwrap());
    }

    #[test]
    fn containment_with_unclosed_comment() {
        let buf = scanned("x /* y\nz");
        assert!(!in_block_comment(&buf, 0, 0).unwrap());
        assert!(in_block_comment(&buf, 0, 5).unwrap());
        assert!(in_block_comment(&buf, 1, 1).unwrap());
    }

    #[test]
    fn brackets_inside_comment_are_ignored() {
        let buf = scanned("/* ( */ (x)");
        assert_eq!(cell(&buf, 0, 3).pair_id(), 0);
        let open = cell(&buf, 0, 8);
        let close = cell(&buf, 0, 10);
        assert_eq!(open.pair_role(), PairRole::Opener);
        assert_eq!(open.pair_id(), close.pair_id());
    }

    #[test]
    fn stack_overflow_truncates_silently() {
        let mut text = String::new();
        for _ in 0..300 {
            text.push('(');
        }
        for _ in 0..300 {
            text.push(')');
        }
        let buf = scanned(&text);
        let cells = buf.line(0).unwrap().cells().unwrap().clone();
        let matched_closers = cells[300..]
            .iter()
            .filter(|c| c.pair_role() == PairRole::Closer && c.pair_id() != 0)
            .count();
        let unmatched_closers = cells[300..].iter().filter(|c| c.pair_id() == 0).count();
        assert_eq!(matched_closers, 256);
        assert_eq!(unmatched_closers, 44);
        // Every opener still received an id; dropped ones just never match.
        assert!(cells[..300].iter().all(|c| c.pair_id() != 0));
    }

    #[test]
    fn rescan_resets_id_space() {
        let mut buf = Buffer::from_bytes(b"(a)").unwrap();
        recompute(&mut buf).unwrap();
        let first = cell(&buf, 0, 0).pair_id();
        recompute(&mut buf).unwrap();
        assert_eq!(cell(&buf, 0, 0).pair_id(), first);
        assert_eq!(first, 1);
    }
}
