//! Frame composition: project the buffer to the terminal.
//!
//! One frame is one batched write: hide cursor, home, rows (gutter + text
//! with overlays and soft wrap), status bar, message bar, cursor
//! placement, show cursor. The composed escape stream goes out in a single
//! `write_all` + flush, so partially painted frames never reach the
//! terminal.

use std::io::Write;
use std::time::Instant;

use crossterm::Command;
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::terminal::{Clear, ClearType};

use core_state::{EditorState, Mode};
use core_syntax::{element_spans, span_at};
use core_text::{Cell, CellFlags, Result, WrapMode, width};
use core_worker::Match;

use crate::status::{message_line, status_line};
use crate::style::{Attr, Style, write_style};
use crate::theme::Theme;

/// A composed frame: the escape stream plus the final cursor cell
/// (0-based visual row/column).
pub struct Frame {
    pub ansi: String,
    pub cursor: (usize, usize),
}

/// Write a frame to the terminal in one call.
pub fn present(out: &mut impl Write, frame: &Frame) -> Result<()> {
    out.write_all(frame.ansi.as_bytes())?;
    out.flush()?;
    Ok(())
}

struct Overlays {
    selections: Vec<((usize, usize), (usize, usize))>,
    matches: Vec<Match>,
    current_match: Option<Match>,
    extra_cursors: Vec<(usize, usize)>,
}

fn collect_overlays(state: &EditorState) -> Overlays {
    let selections = state.cursors.iter().filter_map(|c| c.selection()).collect();
    let primary = state.cursors.primary().pos();
    let extra_cursors = state
        .cursors
        .iter()
        .map(|c| c.pos())
        .filter(|&p| p != primary)
        .collect();
    let mut matches = Vec::new();
    let mut current_match = None;
    if let Some(results) = &state.search.results
        && let Ok(shared) = results.lock()
        && shared.pattern == state.search.pattern
    {
        let lo = state.row_offset;
        let hi = state.row_offset + state.text_rows();
        matches.extend(
            shared
                .matches
                .iter()
                .filter(|m| m.row >= lo && m.row < hi)
                .copied(),
        );
        current_match = state
            .search
            .current
            .and_then(|i| shared.matches.get(i))
            .copied();
    }
    Overlays {
        selections,
        matches,
        current_match,
        extra_cursors,
    }
}

fn in_span(p: (usize, usize), span: &((usize, usize), (usize, usize))) -> bool {
    p >= span.0 && p < span.1
}

/// Compose the full frame for the current state.
pub fn render_frame(state: &EditorState, theme: &Theme, now: Instant) -> Result<Frame> {
    let text_rows = state.text_rows();
    let text_cols = state.text_cols();
    let gutter_w = state.gutter_width();
    let tab = state.tab_width;
    let overlays = collect_overlays(state);
    let primary = state.cursors.primary().pos();

    let mut ansi = String::new();
    let _ = Hide.write_ansi(&mut ansi);
    let _ = MoveTo(0, 0).write_ansi(&mut ansi);
    let mut cursor_vis = (0usize, gutter_w);

    let mut visual = 0usize;
    let mut row = state.row_offset;
    let line_count = state.buffer.line_count();
    'rows: while visual < text_rows {
        if row >= line_count {
            // Past the buffer: empty gutter, cleared line.
            let style = theme.gutter.on(theme.background);
            write_style(&mut ansi, &style, None);
            for _ in 0..gutter_w {
                ansi.push(' ');
            }
            let _ = Clear(ClearType::UntilNewLine).write_ansi(&mut ansi);
            ansi.push_str("\r\n");
            visual += 1;
            continue;
        }
        state.buffer.warm_line(row)?;
        let Some(line) = state.buffer.line(row) else {
            row += 1;
            continue;
        };
        let cells = line.cells()?.clone();
        let starts = line.wrap_starts(text_cols as u16, state.wrap_mode, tab)?;
        let hide_row = state.hybrid_markdown && primary.0 != row;
        let spans = if state.hybrid_markdown && primary.0 == row {
            element_spans(&cells)
        } else {
            Vec::new()
        };
        for (seg, &seg_start) in starts.iter().enumerate() {
            if visual >= text_rows {
                break 'rows;
            }
            let seg_start = seg_start as usize;
            let seg_end = starts
                .get(seg + 1)
                .map(|&s| s as usize)
                .unwrap_or(cells.len());
            draw_gutter(&mut ansi, theme, row, seg, gutter_w, primary.0 == row);
            let base_bg = if primary.0 == row {
                theme.cursor_line_bg
            } else {
                theme.background
            };
            let mut prev: Option<Style> = None;
            let mut rendered = 0usize; // within this segment
            for (col, cell) in cells
                .iter()
                .enumerate()
                .take(seg_end)
                .skip(seg_start)
            {
                if hidden(state, cell, hide_row, &spans, primary, col) {
                    continue;
                }
                let w = width::cell_width(cell.ch, rendered, tab);
                // Horizontal clipping only applies without wrap.
                if state.wrap_mode == WrapMode::None {
                    if rendered + w <= state.col_offset {
                        rendered += w;
                        continue;
                    }
                    if rendered >= state.col_offset + text_cols {
                        break;
                    }
                } else if rendered + w > text_cols && w > 0 {
                    break;
                }
                if (row, col) == primary {
                    cursor_vis = (
                        visual,
                        gutter_w + rendered - state.col_offset.min(rendered),
                    );
                }
                let style = cell_style(theme, &overlays, row, col, cell, base_bg);
                write_style(&mut ansi, &style, prev.as_ref());
                prev = Some(style);
                push_cell(&mut ansi, cell.ch, w);
                rendered += w;
            }
            if (row, cells.len()) == primary && cells.len() >= seg_start
                && (starts.get(seg + 1).is_none())
            {
                // Cursor sits at end of line: place it one past the text.
                cursor_vis = (
                    visual,
                    gutter_w + rendered.saturating_sub(state.col_offset.min(rendered)),
                );
            }
            let clear = Style::plain(theme.normal.fg).on(base_bg);
            write_style(&mut ansi, &clear, prev.as_ref());
            let _ = Clear(ClearType::UntilNewLine).write_ansi(&mut ansi);
            ansi.push_str("\r\n");
            visual += 1;
        }
        row += 1;
    }

    // Status and message bars.
    write_style(&mut ansi, &theme.status_bar, None);
    ansi.push_str(&status_line(state, state.screen_cols));
    let _ = Clear(ClearType::UntilNewLine).write_ansi(&mut ansi);
    ansi.push_str("\r\n");
    let msg_style = theme.message_bar.on(theme.background);
    write_style(&mut ansi, &msg_style, None);
    let message = message_line(state, now);
    ansi.extend(message.chars().take(state.screen_cols));
    let _ = Clear(ClearType::UntilNewLine).write_ansi(&mut ansi);

    // Prompts keep the terminal cursor in the message bar.
    let cursor = if matches!(state.mode, Mode::Search | Mode::GotoLine | Mode::SaveAs) {
        (state.screen_rows.saturating_sub(1), message.chars().count())
    } else {
        cursor_vis
    };
    let _ = MoveTo(cursor.1 as u16, cursor.0 as u16).write_ansi(&mut ansi);
    let _ = Show.write_ansi(&mut ansi);
    Ok(Frame { ansi, cursor })
}

fn hidden(
    state: &EditorState,
    cell: &Cell,
    hide_row: bool,
    spans: &[core_syntax::ElementSpan],
    primary: (usize, usize),
    col: usize,
) -> bool {
    if !cell.flags.contains(CellFlags::HIDEABLE) || !state.hybrid_markdown {
        return false;
    }
    if hide_row {
        return true;
    }
    // Cursor row: collapse only elements the cursor is outside of.
    match span_at(spans, col) {
        Some(span) => !(span.start <= primary.1 && primary.1 <= span.end),
        None => false,
    }
}

fn cell_style(
    theme: &Theme,
    overlays: &Overlays,
    row: usize,
    col: usize,
    cell: &Cell,
    base_bg: crate::style::Rgb,
) -> Style {
    let mut style = theme.style_for(cell.syntax);
    let pos = (row, col);
    let in_current = overlays
        .current_match
        .is_some_and(|m| m.row == row && col >= m.start_col && col < m.end_col);
    let in_match = overlays
        .matches
        .iter()
        .any(|m| m.row == row && col >= m.start_col && col < m.end_col);
    let in_selection = overlays.selections.iter().any(|s| in_span(pos, s));
    style.bg = Some(if in_current {
        theme.search_current_bg
    } else if in_match {
        theme.search_bg
    } else if in_selection {
        theme.selection_bg
    } else {
        style.bg.unwrap_or(base_bg)
    });
    if overlays.extra_cursors.contains(&pos) {
        style.attr |= Attr::REVERSE;
    }
    style
}

fn push_cell(ansi: &mut String, ch: char, w: usize) {
    match ch {
        '\t' => {
            for _ in 0..w {
                ansi.push(' ');
            }
        }
        c if (c as u32) < 0x20 => ansi.push('?'),
        c => ansi.push(c),
    }
}

fn draw_gutter(
    ansi: &mut String,
    theme: &Theme,
    row: usize,
    seg: usize,
    gutter_w: usize,
    active: bool,
) {
    let style = if active {
        theme.gutter_active.on(theme.background)
    } else {
        theme.gutter.on(theme.background)
    };
    write_style(ansi, &style, None);
    if seg == 0 {
        let number = (row + 1).to_string();
        for _ in 0..gutter_w.saturating_sub(number.len() + 1) {
            ansi.push(' ');
        }
        ansi.push_str(&number);
        ansi.push(' ');
    } else {
        // Continuation rows consume the gutter with the wrap indicator.
        for _ in 0..gutter_w.saturating_sub(2) {
            ansi.push(' ');
        }
        ansi.push_str("\u{21aa} ");
    }
}
