//! Concurrent warming: many threads racing to materialize the same COLD
//! lines must each observe exactly one promotion and identical content.

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use core_text::{Buffer, Temperature};
use tempfile::NamedTempFile;

const LINES: usize = 10_000;

fn big_file() -> NamedTempFile {
    let mut f = NamedTempFile::new().expect("temp file");
    for i in 0..LINES {
        writeln!(f, "line number {i} with some padding text").expect("write");
    }
    f.flush().expect("flush");
    f
}

#[test]
fn worker_and_readers_warm_once() {
    let f = big_file();
    let buf = Buffer::open(f.path()).unwrap();
    assert_eq!(buf.line_count(), LINES);

    let warmed_total = Arc::new(AtomicUsize::new(0));
    let mut handles = Vec::new();
    for _ in 0..4 {
        let store = buf.store();
        let warmed_total = Arc::clone(&warmed_total);
        handles.push(thread::spawn(move || {
            let (warmed, skipped) = store.warm_range(0, LINES).unwrap();
            warmed_total.fetch_add(warmed, Ordering::Relaxed);
            assert_eq!(warmed + skipped, LINES);
        }));
    }
    // Interleave reads from this thread while the warmers run.
    for row in (0..LINES).step_by(97) {
        let text = buf.store().row_text(row).unwrap().unwrap();
        assert!(text.starts_with("line number"), "row {row}: {text}");
    }
    for h in handles {
        h.join().unwrap();
    }
    // Every line warmed exactly once across all participants (the main
    // thread's reads count toward the total too).
    let main_warmed = LINES - warmed_total.load(Ordering::Relaxed);
    assert!(main_warmed <= LINES / 97 + 1);
    for row in 0..LINES {
        let line = buf.line(row).unwrap();
        assert_eq!(line.temperature(), Temperature::Warm);
        assert_eq!(
            line.text(),
            format!("line number {row} with some padding text")
        );
    }
}

#[test]
fn warming_a_warm_line_reports_zero() {
    let f = big_file();
    let buf = Buffer::open(f.path()).unwrap();
    let store = buf.store();
    let (warmed, skipped) = store.warm_range(0, 100).unwrap();
    assert_eq!((warmed, skipped), (100, 0));
    let (warmed, skipped) = store.warm_range(0, 100).unwrap();
    assert_eq!((warmed, skipped), (0, 100));
}
