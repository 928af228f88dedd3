//! Syntax annotation: pair contexts plus language-dispatched token passes.
//!
//! The highlight contract is small: given a line and its containing buffer,
//! populate the cells' syntax tags. Each language pass is a value
//! satisfying that contract, selected by file extension; unknown extensions
//! get the plain pass, which leaves every cell normal.

use std::path::Path;

use core_text::{Buffer, Result, Token, neighbor};

pub mod c;
pub mod markdown;
pub mod pairs;

pub use markdown::{ElementSpan, element_spans, span_at};

pub trait Highlighter: Sync {
    fn name(&self) -> &'static str;
    /// Rewrite the syntax tags of one line. Warms the line if needed.
    fn highlight_line(&self, buf: &Buffer, row: usize) -> Result<()>;
}

pub struct CHighlighter;
pub struct MarkdownHighlighter;
pub struct PlainHighlighter;

impl Highlighter for CHighlighter {
    fn name(&self) -> &'static str {
        "c"
    }
    fn highlight_line(&self, buf: &Buffer, row: usize) -> Result<()> {
        c::highlight_line(buf, row)
    }
}

impl Highlighter for MarkdownHighlighter {
    fn name(&self) -> &'static str {
        "markdown"
    }
    fn highlight_line(&self, buf: &Buffer, row: usize) -> Result<()> {
        markdown::highlight_line(buf, row)
    }
}

impl Highlighter for PlainHighlighter {
    fn name(&self) -> &'static str {
        "plain"
    }
    fn highlight_line(&self, buf: &Buffer, row: usize) -> Result<()> {
        buf.warm_line(row)?;
        if let Some(line) = buf.line(row) {
            let mut cells = line.cells_mut()?;
            for cell in cells.iter_mut() {
                cell.syntax = Token::Normal;
            }
        }
        Ok(())
    }
}

static C: CHighlighter = CHighlighter;
static MARKDOWN: MarkdownHighlighter = MarkdownHighlighter;
static PLAIN: PlainHighlighter = PlainHighlighter;

/// Language pass for a file extension (lowercase, without the dot).
pub fn for_extension(ext: Option<&str>) -> &'static dyn Highlighter {
    match ext {
        Some("md") | Some("markdown") | Some("mkd") | Some("mdx") => &MARKDOWN,
        Some("c") | Some("h") | Some("cpp") | Some("hpp") | Some("cc") | Some("cxx") => &C,
        _ => &PLAIN,
    }
}

pub fn for_path(path: Option<&Path>) -> &'static dyn Highlighter {
    let ext = path
        .and_then(|p| p.extension())
        .map(|e| e.to_string_lossy().to_ascii_lowercase());
    for_extension(ext.as_deref())
}

/// Re-annotate one edited line: neighbor layer first, then the syntax pass.
pub fn refresh_line(buf: &Buffer, hl: &dyn Highlighter, row: usize) -> Result<()> {
    buf.warm_line(row)?;
    if let Some(line) = buf.line(row) {
        let mut cells = line.cells_mut()?;
        neighbor::annotate(&mut cells);
    }
    hl.highlight_line(buf, row)
}

/// Recompute after an edit that may have shifted delimiter structure:
/// pair contexts buffer-wide, then neighbor + syntax for every line.
pub fn refresh_structure(buf: &mut Buffer, hl: &dyn Highlighter) -> Result<()> {
    pairs::recompute(buf)?;
    for row in 0..buf.line_count() {
        refresh_line(buf, hl, row)?;
    }
    Ok(())
}

/// Full load pipeline: the pair scan (which warms every line), then
/// neighbor and syntax annotation per line.
pub fn annotate_all(buf: &mut Buffer, hl: &dyn Highlighter) -> Result<()> {
    refresh_structure(buf, hl)
}
