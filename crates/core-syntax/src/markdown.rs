//! Markdown highlight pass with the element cache feeding hybrid
//! rendering.
//!
//! Line classification comes first (fenced code, headers, blockquotes,
//! rules, lists, tables), then an inline parse for emphasis, code spans,
//! links, images, and escapes. Formatting punctuation is flagged hideable
//! so the renderer can collapse it when the cursor sits outside the
//! enclosing element; element boundaries are flagged so that test is O(1)
//! per cell.

use core_text::{Buffer, Cell, CellFlags, Result, Token};

/// One contiguous run of a tracked token on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementSpan {
    pub start: usize,
    pub end: usize,
    pub token: Token,
}

/// Contiguous runs of non-normal tokens; the per-line element cache.
pub fn element_spans(cells: &[Cell]) -> Vec<ElementSpan> {
    let mut spans = Vec::new();
    let mut i = 0;
    while i < cells.len() {
        let token = cells[i].syntax;
        if token == Token::Normal {
            i += 1;
            continue;
        }
        let start = i;
        while i < cells.len() && cells[i].syntax == token {
            i += 1;
        }
        spans.push(ElementSpan {
            start,
            end: i,
            token,
        });
    }
    spans
}

/// The span containing `col`, if any; drives the cursor-inside-element test
/// for hybrid rendering.
pub fn span_at(spans: &[ElementSpan], col: usize) -> Option<ElementSpan> {
    spans.iter().copied().find(|s| s.start <= col && col < s.end)
}

// ---- fence tracking --------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fence {
    ch: char,
    len: usize,
}

/// Parse a fence opener: up to three leading spaces, then three or more
/// backticks or tildes; the rest is an info string.
fn fence_of(text: &str) -> Option<Fence> {
    let trimmed = trim_up_to_three_spaces(text)?;
    let ch = trimmed.chars().next()?;
    if ch != '`' && ch != '~' {
        return None;
    }
    let len = trimmed.chars().take_while(|&c| c == ch).count();
    if len >= 3 { Some(Fence { ch, len }) } else { None }
}

/// A closing fence: same character, equal or greater length, only
/// whitespace after.
fn fence_closes(text: &str, open: Fence) -> bool {
    let Some(trimmed) = trim_up_to_three_spaces(text) else {
        return false;
    };
    let len = trimmed.chars().take_while(|&c| c == open.ch).count();
    len >= open.len && trimmed[len..].chars().all(|c| c == ' ' || c == '\t')
}

fn trim_up_to_three_spaces(text: &str) -> Option<&str> {
    let leading = text.chars().take_while(|&c| c == ' ').count();
    if leading > 3 {
        return None;
    }
    Some(&text[leading..])
}

/// Fence state just before `row`: scan earlier rows for the nearest
/// unclosed fence.
fn open_fence_before(buf: &Buffer, row: usize) -> Result<Option<Fence>> {
    let mut open: Option<Fence> = None;
    for r in 0..row {
        let Some(text) = buf.store().row_text(r)? else {
            continue;
        };
        match open {
            None => open = fence_of(&text),
            Some(f) => {
                if fence_closes(&text, f) {
                    open = None;
                }
            }
        }
    }
    Ok(open)
}

// ---- line classification ---------------------------------------------------

fn paint(cells: &mut [Cell], token: Token) {
    for cell in cells.iter_mut() {
        cell.syntax = token;
    }
}

fn flag(cells: &mut [Cell], flags: CellFlags) {
    for cell in cells.iter_mut() {
        cell.flags |= flags;
    }
}

fn mark_element(cells: &mut [Cell], start: usize, end: usize) {
    if start < end && end <= cells.len() {
        cells[start].flags |= CellFlags::ELEM_START;
        cells[end - 1].flags |= CellFlags::ELEM_END;
    }
}

fn is_separator_row(text: &str) -> bool {
    !text.is_empty()
        && text.contains('-')
        && text
            .chars()
            .all(|c| matches!(c, '|' | '-' | ':' | ' ' | '\t'))
}

/// Highlight one Markdown line. Warms the line; writes syntax tags and
/// hybrid-rendering flags.
pub fn highlight_line(buf: &Buffer, row: usize) -> Result<()> {
    buf.warm_line(row)?;
    let open = open_fence_before(buf, row)?;
    let next_row_text = buf.store().row_text(row + 1)?;
    let Some(line) = buf.line(row) else {
        return Ok(());
    };
    let mut cells = line.cells_mut()?;
    for cell in cells.iter_mut() {
        cell.syntax = Token::Normal;
        cell.flags = CellFlags::empty();
    }
    let text: String = cells.iter().map(|c| c.ch).collect();
    let len = cells.len();

    if let Some(fence) = open {
        if fence_closes(&text, fence) {
            paint(&mut cells, Token::FenceClose);
            // Closing-fence lines collapse entirely in hybrid mode.
            flag(&mut cells, CellFlags::HIDEABLE);
            mark_element(&mut cells, 0, len);
        } else {
            paint(&mut cells, Token::CodeBlock);
            mark_element(&mut cells, 0, len);
        }
        return Ok(());
    }
    if fence_of(&text).is_some() {
        paint(&mut cells, Token::FenceOpen);
        mark_element(&mut cells, 0, len);
        return Ok(());
    }

    let ind = cells
        .iter()
        .position(|c| c.ch != ' ')
        .unwrap_or(len);
    if ind >= len {
        return Ok(());
    }
    let c0 = cells[ind].ch;

    // ATX header: one to six '#' followed by a space.
    if c0 == '#' {
        let n = cells[ind..].iter().take_while(|c| c.ch == '#').count();
        if (1..=6).contains(&n) && cells.get(ind + n).map(|c| c.ch) == Some(' ') {
            paint(&mut cells, Token::header(n));
            for cell in cells[ind..ind + n].iter_mut() {
                cell.flags |= CellFlags::HIDEABLE;
            }
            mark_element(&mut cells, 0, len);
            return Ok(());
        }
    }

    // Blockquote: nestable alternating "> " runs, inline content after.
    if c0 == '>' {
        let mut p = ind;
        while p < len && cells[p].ch == '>' {
            cells[p].syntax = Token::Blockquote;
            p += 1;
            if p < len && cells[p].ch == ' ' {
                cells[p].syntax = Token::Blockquote;
                p += 1;
            }
        }
        inline(&mut cells, p, len);
        return Ok(());
    }

    // Horizontal rule: three or more of the same -, *, _ with only spaces.
    if matches!(c0, '-' | '*' | '_') {
        let run: Vec<char> = cells[ind..].iter().map(|c| c.ch).collect();
        let count = run.iter().filter(|&&c| c == c0).count();
        if count >= 3 && run.iter().all(|&c| c == c0 || c == ' ') {
            paint(&mut cells, Token::HorizontalRule);
            mark_element(&mut cells, 0, len);
            return Ok(());
        }
    }

    // Unordered list marker, optionally with a task checkbox.
    if matches!(c0, '-' | '*' | '+') && cells.get(ind + 1).map(|c| c.ch) == Some(' ') {
        cells[ind].syntax = Token::ListMarker;
        let mut rest = ind + 2;
        if rest + 2 < len
            && cells[rest].ch == '['
            && matches!(cells[rest + 1].ch, ' ' | 'x' | 'X')
            && cells[rest + 2].ch == ']'
        {
            for cell in cells[rest..rest + 3].iter_mut() {
                cell.syntax = Token::TaskMarker;
            }
            rest += 3;
        }
        inline(&mut cells, rest, len);
        return Ok(());
    }

    // Ordered list marker: digits, '.' or ')', space.
    if c0.is_ascii_digit() {
        let digits = cells[ind..].iter().take_while(|c| c.ch.is_ascii_digit()).count();
        let after = ind + digits;
        if digits > 0
            && matches!(cells.get(after).map(|c| c.ch), Some('.') | Some(')'))
            && cells.get(after + 1).map(|c| c.ch) == Some(' ')
        {
            for cell in cells[ind..=after].iter_mut() {
                cell.syntax = Token::ListMarker;
            }
            inline(&mut cells, after + 2, len);
            return Ok(());
        }
    }

    // Tables: separator rows, header rows (sibling separator below), rows.
    if c0 == '|' {
        if is_separator_row(text.trim()) {
            paint(&mut cells, Token::TableSeparator);
        } else if next_row_text.as_deref().is_some_and(|t| is_separator_row(t.trim())) {
            paint(&mut cells, Token::TableHeader);
        } else {
            paint(&mut cells, Token::Table);
        }
        mark_element(&mut cells, 0, len);
        return Ok(());
    }

    inline(&mut cells, 0, len);
    Ok(())
}

// ---- inline parse ----------------------------------------------------------

fn run_len(cells: &[Cell], at: usize, ch: char) -> usize {
    cells[at..].iter().take_while(|c| c.ch == ch).count()
}

/// Closing emphasis run: same character, right-flanking (preceded by
/// non-space), at least `want` long. Returns its start.
fn find_close_run(cells: &[Cell], from: usize, end: usize, ch: char, want: usize) -> Option<usize> {
    let mut j = from;
    while j < end {
        if cells[j].ch == ch {
            let l = run_len(&cells[..end], j, ch);
            let prev_ok = j > 0 && cells[j - 1].ch != ' ' && cells[j - 1].ch != ch;
            if prev_ok && l >= want {
                return Some(j);
            }
            j += l;
        } else {
            j += 1;
        }
    }
    None
}

fn emphasis_token(count: usize) -> Token {
    match count {
        1 => Token::Italic,
        2 => Token::Bold,
        _ => Token::BoldItalic,
    }
}

/// Matching close bracket honoring nesting; `open`/`close` are distinct.
fn match_bracket(cells: &[Cell], at: usize, end: usize, open: char, close: char) -> Option<usize> {
    let mut depth = 0usize;
    for j in at..end {
        let ch = cells[j].ch;
        if ch == open {
            depth += 1;
        } else if ch == close {
            depth -= 1;
            if depth == 0 {
                return Some(j);
            }
        }
    }
    None
}

/// Paint a `[text](url)` starting at `open_bracket`; returns one past the
/// closing paren. `text_token` distinguishes links from images.
fn paint_link(
    cells: &mut [Cell],
    open_bracket: usize,
    end: usize,
    text_token: Token,
) -> Option<usize> {
    let close_bracket = match_bracket(cells, open_bracket, end, '[', ']')?;
    if cells.get(close_bracket + 1).map(|c| c.ch) != Some('(') {
        return None;
    }
    let close_paren = match_bracket(cells, close_bracket + 1, end, '(', ')')?;
    for cell in cells[open_bracket..=close_bracket].iter_mut() {
        cell.syntax = text_token;
    }
    for cell in cells[close_bracket + 1..=close_paren].iter_mut() {
        cell.syntax = Token::LinkUrl;
        // Url regions collapse entirely in hybrid mode.
        cell.flags |= CellFlags::HIDEABLE;
    }
    cells[open_bracket].flags |= CellFlags::HIDEABLE;
    cells[close_bracket].flags |= CellFlags::HIDEABLE;
    Some(close_paren + 1)
}

fn inline(cells: &mut [Cell], start: usize, end: usize) {
    let mut i = start;
    while i < end {
        let ch = cells[i].ch;
        let next = if i + 1 < end { Some(cells[i + 1].ch) } else { None };
        match ch {
            '\\' if next.is_some_and(|c| c.is_ascii_punctuation()) => {
                cells[i].syntax = Token::Escape;
                cells[i + 1].syntax = Token::Escape;
                cells[i].flags |= CellFlags::HIDEABLE;
                i += 2;
            }
            '`' => {
                let n = run_len(&cells[..end], i, '`');
                // A closing run of exactly the same length.
                let mut j = i + n;
                let mut found = None;
                while j < end {
                    if cells[j].ch == '`' {
                        let m = run_len(&cells[..end], j, '`');
                        if m == n {
                            found = Some(j);
                            break;
                        }
                        j += m;
                    } else {
                        j += 1;
                    }
                }
                match found {
                    Some(j) => {
                        for cell in cells[i..j + n].iter_mut() {
                            cell.syntax = Token::CodeSpan;
                        }
                        for cell in cells[i..i + n].iter_mut() {
                            cell.flags |= CellFlags::HIDEABLE;
                        }
                        for cell in cells[j..j + n].iter_mut() {
                            cell.flags |= CellFlags::HIDEABLE;
                        }
                        mark_element(cells, i, j + n);
                        i = j + n;
                    }
                    None => i += n,
                }
            }
            '!' if next == Some('[') => match paint_link(cells, i + 1, end, Token::Image) {
                Some(after) => {
                    cells[i].syntax = Token::Image;
                    cells[i].flags |= CellFlags::HIDEABLE;
                    mark_element(cells, i, after);
                    i = after;
                }
                None => i += 1,
            },
            '[' => match paint_link(cells, i, end, Token::LinkText) {
                Some(after) => {
                    mark_element(cells, i, after);
                    i = after;
                }
                None => i += 1,
            },
            '*' | '_' => {
                let l = run_len(&cells[..end], i, ch);
                // Left-flanking: the run is followed by a non-space.
                let left_ok = i + l < end && cells[i + l].ch != ' ';
                let want = l.min(3);
                if left_ok
                    && let Some(j) = find_close_run(cells, i + l, end, ch, want)
                {
                    let m = run_len(&cells[..end], j, ch).min(want);
                    let token = emphasis_token(want.min(m));
                    for cell in cells[i..j + m].iter_mut() {
                        cell.syntax = token;
                    }
                    for cell in cells[i..i + l].iter_mut() {
                        cell.flags |= CellFlags::HIDEABLE;
                    }
                    for cell in cells[j..j + m].iter_mut() {
                        cell.flags |= CellFlags::HIDEABLE;
                    }
                    mark_element(cells, i, j + m);
                    i = j + m;
                } else {
                    i += l;
                }
            }
            '~' => {
                let l = run_len(&cells[..end], i, '~');
                if l >= 2
                    && let Some(j) = find_close_run(cells, i + l, end, '~', 2)
                {
                    let m = run_len(&cells[..end], j, '~');
                    for cell in cells[i..j + m].iter_mut() {
                        cell.syntax = Token::Strikethrough;
                    }
                    for cell in cells[i..i + l].iter_mut() {
                        cell.flags |= CellFlags::HIDEABLE;
                    }
                    for cell in cells[j..j + m].iter_mut() {
                        cell.flags |= CellFlags::HIDEABLE;
                    }
                    mark_element(cells, i, j + m);
                    i = j + m;
                } else {
                    i += l.max(1);
                }
            }
            _ => i += 1,
        }
    }
}
