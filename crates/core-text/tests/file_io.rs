//! File loading and saving over the mmap backing.

use std::io::Write;

use core_text::{Buffer, Temperature};
use tempfile::NamedTempFile;

fn write_file(content: &[u8]) -> NamedTempFile {
    let mut f = NamedTempFile::new().expect("temp file");
    f.write_all(content).expect("write");
    f.flush().expect("flush");
    f
}

#[test]
fn open_indexes_lines_cold() {
    let f = write_file(b"one\ntwo\nthree\n");
    let buf = Buffer::open(f.path()).unwrap();
    assert_eq!(buf.line_count(), 3);
    for row in 0..3 {
        assert_eq!(buf.line(row).unwrap().temperature(), Temperature::Cold);
        assert_eq!(buf.line(row).unwrap().len(), 0);
    }
    assert_eq!(buf.store().row_text(1).unwrap().unwrap(), "two");
    assert_eq!(buf.line(1).unwrap().temperature(), Temperature::Warm);
}

#[test]
fn open_strips_carriage_returns() {
    let f = write_file(b"a\r\nb\r\nc");
    let buf = Buffer::open(f.path()).unwrap();
    assert_eq!(buf.line_count(), 3);
    assert_eq!(buf.store().row_text(0).unwrap().unwrap(), "a");
    assert_eq!(buf.store().row_text(2).unwrap().unwrap(), "c");
}

#[test]
fn open_missing_file_yields_named_empty_buffer() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("does-not-exist.txt");
    let buf = Buffer::open(&path).unwrap();
    assert_eq!(buf.line_count(), 0);
    assert_eq!(buf.file_name.as_deref(), Some(path.as_path()));
}

#[test]
fn empty_file_yields_zero_lines() {
    let f = write_file(b"");
    let buf = Buffer::open(f.path()).unwrap();
    assert_eq!(buf.line_count(), 0);
}

#[test]
fn load_save_load_roundtrips() {
    let f = write_file(b"alpha\nbeta\r\ngamma");
    let mut buf = Buffer::open(f.path()).unwrap();
    buf.save().unwrap();
    let again = Buffer::open(f.path()).unwrap();
    assert_eq!(again.line_count(), 3);
    for row in 0..3 {
        assert_eq!(
            buf.store().row_text(row).unwrap(),
            again.store().row_text(row).unwrap()
        );
    }
    // Saved files always end in a final newline; \r\n was canonicalised.
    let bytes = std::fs::read(f.path()).unwrap();
    assert_eq!(bytes, b"alpha\nbeta\ngamma\n");
}

#[test]
fn save_clears_modified_and_persists_edits() {
    let f = write_file(b"hello\n");
    let mut buf = Buffer::open(f.path()).unwrap();
    buf.append_cell(0, '!').unwrap();
    assert!(buf.modified);
    buf.save().unwrap();
    assert!(!buf.modified);
    assert_eq!(std::fs::read(f.path()).unwrap(), b"hello!\n");
}

#[test]
fn invalid_utf8_loads_as_replacement() {
    let f = write_file(&[b'a', 0xC3, b'\n']);
    let buf = Buffer::open(f.path()).unwrap();
    assert_eq!(buf.store().row_text(0).unwrap().unwrap(), "a\u{fffd}");
}

#[test]
fn snapshot_copies_contents() {
    let f = write_file(b"one\ntwo\n");
    let buf = Buffer::open(f.path()).unwrap();
    let snap = buf.snapshot("swap".into()).unwrap();
    assert_eq!(snap.lines, vec!["one".to_string(), "two".to_string()]);
}

#[test]
fn from_bytes_creates_hot_lines() {
    let buf = Buffer::from_bytes(b"x\ny\n").unwrap();
    assert_eq!(buf.line_count(), 2);
    assert_eq!(buf.line(0).unwrap().temperature(), Temperature::Hot);
    assert_eq!(buf.line(1).unwrap().temperature(), Temperature::Hot);
}
