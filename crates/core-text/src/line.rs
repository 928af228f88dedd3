//! Lazy line store with three temperatures.
//!
//! A line starts COLD: no cells, only a byte span into the buffer's mmap
//! region. The first reader promotes it to WARM by decoding the backing
//! bytes; an edit promotes it to HOT, after which the backing span is stale
//! and must not be read. Transitions never go backwards within a session.
//!
//! The temperature and the one-shot warming claim are the only fields that
//! tolerate cross-thread access (acquire loads, release stores, an
//! acquire-release compare-exchange for the claim). Cell writes themselves
//! go through the per-line `RwLock`: the claim decides *who* materializes,
//! the lock makes the write itself sound. A second warmer arriving during
//! materialization spins on the temperature; the wait is bounded by line
//! length.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::cell::Cell;
use crate::error::{CoreError, Result};
use crate::wrap::{self, WrapMode};

/// Initial capacity of a cell array; growth doubles from here.
pub const CELLS_INITIAL_CAPACITY: usize = 128;
/// Initial capacity of a buffer's line array; growth doubles from here.
pub const LINES_INITIAL_CAPACITY: usize = 256;

/// Doubling growth target: smallest `base * 2^k` holding `needed`.
pub(crate) fn grown_capacity(base: usize, needed: usize) -> usize {
    let mut cap = base.max(1);
    while cap < needed {
        cap = cap.saturating_mul(2);
    }
    cap
}

/// Reserve room for `additional` more cells under the doubling policy.
pub(crate) fn reserve_cells(cells: &mut Vec<Cell>, additional: usize) -> Result<()> {
    let needed = cells.len().saturating_add(additional);
    if needed > cells.capacity() {
        let target = grown_capacity(CELLS_INITIAL_CAPACITY.max(cells.capacity()), needed);
        cells
            .try_reserve_exact(target - cells.len())
            .map_err(|_| CoreError::Alloc)?;
    }
    Ok(())
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Temperature {
    /// Cells not materialized; the mmap span describes the content.
    Cold = 0,
    /// Cells decoded; content equals the backing bytes.
    Warm = 1,
    /// Cells edited; the backing span is stale.
    Hot = 2,
}

impl Temperature {
    fn from_u8(v: u8) -> Temperature {
        match v {
            0 => Temperature::Cold,
            1 => Temperature::Warm,
            _ => Temperature::Hot,
        }
    }
}

/// Byte range of a line inside the mmap region (carriage return and newline
/// excluded).
#[derive(Debug, Clone, Copy, Default)]
pub struct Span {
    pub offset: usize,
    pub len: usize,
}

/// Memoised soft-wrap segmentation. `width == 0` marks the cache invalid.
#[derive(Debug, Default)]
pub(crate) struct WrapCache {
    width: u16,
    mode: WrapMode,
    starts: Vec<u32>,
}

pub struct Line {
    cells: RwLock<Vec<Cell>>,
    temp: AtomicU8,
    warming: AtomicBool,
    span: Span,
    wrap: Mutex<WrapCache>,
}

impl Line {
    /// A COLD line described only by its backing span.
    pub fn cold(offset: usize, len: usize) -> Line {
        Line {
            cells: RwLock::new(Vec::new()),
            temp: AtomicU8::new(Temperature::Cold as u8),
            warming: AtomicBool::new(false),
            span: Span { offset, len },
            wrap: Mutex::new(WrapCache::default()),
        }
    }

    /// A HOT line with materialized cells and no backing.
    pub fn hot(cells: Vec<Cell>) -> Line {
        Line {
            cells: RwLock::new(cells),
            temp: AtomicU8::new(Temperature::Hot as u8),
            warming: AtomicBool::new(false),
            span: Span::default(),
            wrap: Mutex::new(WrapCache::default()),
        }
    }

    pub fn temperature(&self) -> Temperature {
        Temperature::from_u8(self.temp.load(Ordering::Acquire))
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// Decode the backing bytes into cells, COLD -> WARM. Returns `true` if
    /// this call performed the promotion, `false` if the line was already
    /// warm (or became warm while we waited on a concurrent warmer).
    ///
    /// `backing` is the whole mmap region; the line slices its own span.
    pub fn warm(&self, backing: &[u8]) -> Result<bool> {
        if self.temperature() != Temperature::Cold {
            return Ok(false);
        }
        if self
            .warming
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            // Someone else holds the claim; the work is bounded by line
            // length, so poll rather than queue.
            while self.temperature() == Temperature::Cold {
                std::hint::spin_loop();
            }
            return Ok(false);
        }
        // Claim held. Re-check: the previous holder may have finished
        // between our temperature probe and the exchange.
        if self.temperature() != Temperature::Cold {
            self.warming.store(false, Ordering::Release);
            return Ok(false);
        }
        let result = self.decode(backing);
        if result.is_ok() {
            self.temp.store(Temperature::Warm as u8, Ordering::Release);
        }
        self.warming.store(false, Ordering::Release);
        result.map(|_| true)
    }

    fn decode(&self, backing: &[u8]) -> Result<()> {
        let end = self.span.offset.saturating_add(self.span.len);
        let bytes = backing
            .get(self.span.offset..end.min(backing.len()))
            .unwrap_or(&[]);
        let text = String::from_utf8_lossy(bytes);
        let mut cells = self.cells.write().map_err(|_| CoreError::Lock("line cells"))?;
        reserve_cells(&mut cells, bytes.len())?;
        cells.extend(text.chars().map(Cell::new));
        Ok(())
    }

    /// Stale-backing transition; every cell mutation routes through here.
    pub fn mark_hot(&self) {
        self.temp.store(Temperature::Hot as u8, Ordering::Release);
        self.invalidate_wrap();
    }

    pub fn cells(&self) -> Result<RwLockReadGuard<'_, Vec<Cell>>> {
        self.cells.read().map_err(|_| CoreError::Lock("line cells"))
    }

    pub fn cells_mut(&self) -> Result<RwLockWriteGuard<'_, Vec<Cell>>> {
        self.cells.write().map_err(|_| CoreError::Lock("line cells"))
    }

    /// Cell count; 0 for a COLD line.
    pub fn len(&self) -> usize {
        self.cells.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decoded content as a `String` (empty for a COLD line).
    pub fn text(&self) -> String {
        self.cells
            .read()
            .map(|c| c.iter().map(|cell| cell.ch).collect())
            .unwrap_or_default()
    }

    /// Segment start columns for soft wrap, recomputing only when the cache
    /// was computed for a different width or mode.
    pub fn wrap_starts(&self, width: u16, mode: WrapMode, tab_width: usize) -> Result<Vec<u32>> {
        let mut cache = self.wrap.lock().map_err(|_| CoreError::Lock("wrap cache"))?;
        if cache.width == width && cache.mode == mode && width != 0 {
            return Ok(cache.starts.clone());
        }
        let cells = self.cells()?;
        cache.starts = wrap::compute_segments(&cells, width, mode, tab_width);
        cache.width = width;
        cache.mode = mode;
        Ok(cache.starts.clone())
    }

    /// True iff the cached segments were computed at exactly this width and
    /// mode.
    pub fn wrap_cache_is_valid(&self, width: u16, mode: WrapMode) -> bool {
        self.wrap
            .lock()
            .map(|c| c.width != 0 && c.width == width && c.mode == mode)
            .unwrap_or(false)
    }

    pub fn invalidate_wrap(&self) {
        if let Ok(mut cache) = self.wrap.lock() {
            cache.width = 0;
            cache.starts.clear();
        }
    }
}

impl std::fmt::Debug for Line {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Line")
            .field("temp", &self.temperature())
            .field("len", &self.len())
            .field("span", &self.span)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cold_line_has_no_cells() {
        let l = Line::cold(0, 5);
        assert_eq!(l.temperature(), Temperature::Cold);
        assert_eq!(l.len(), 0);
    }

    #[test]
    fn warm_decodes_backing_span() {
        let backing = b"hello\nworld\n";
        let l = Line::cold(6, 5);
        assert!(l.warm(backing).unwrap());
        assert_eq!(l.temperature(), Temperature::Warm);
        assert_eq!(l.text(), "world");
    }

    #[test]
    fn warm_twice_is_noop() {
        let backing = b"abc";
        let l = Line::cold(0, 3);
        assert!(l.warm(backing).unwrap());
        assert!(!l.warm(backing).unwrap());
        assert_eq!(l.len(), 3);
    }

    #[test]
    fn invalid_utf8_decodes_to_replacement() {
        let backing = &[b'a', 0xff, b'b'][..];
        let l = Line::cold(0, 3);
        l.warm(backing).unwrap();
        assert_eq!(l.text(), "a\u{fffd}b");
    }

    #[test]
    fn mark_hot_invalidates_wrap() {
        let l = Line::hot("a b c".chars().map(Cell::new).collect());
        l.wrap_starts(4, WrapMode::Word, 4).unwrap();
        assert!(l.wrap_cache_is_valid(4, WrapMode::Word));
        l.mark_hot();
        assert!(!l.wrap_cache_is_valid(4, WrapMode::Word));
    }

    #[test]
    fn grown_capacity_doubles() {
        assert_eq!(grown_capacity(128, 1), 128);
        assert_eq!(grown_capacity(128, 129), 256);
        assert_eq!(grown_capacity(128, 700), 1024);
    }
}
