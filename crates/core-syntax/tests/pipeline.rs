//! End-to-end annotation pipeline: pairs, neighbors, and tokens together.

use core_syntax::{annotate_all, for_extension, pairs};
use core_text::{Buffer, PairRole, Token};

#[test]
fn c_file_highlight_and_pairing() {
    let mut buf = Buffer::from_bytes(b"int main(void) {\n\treturn 0;\n}\n").unwrap();
    annotate_all(&mut buf, for_extension(Some("c"))).unwrap();

    let l0 = buf.line(0).unwrap().cells().unwrap().clone();
    assert!(l0[0..3].iter().all(|c| c.syntax == Token::Type));
    assert!(l0[4..8].iter().all(|c| c.syntax == Token::Function));

    let brace_open = l0[15];
    assert_eq!(brace_open.pair_role(), PairRole::Opener);
    let id = brace_open.pair_id();
    assert_ne!(id, 0);

    let l2 = buf.line(2).unwrap().cells().unwrap().clone();
    let brace_close = l2[0];
    assert_eq!(brace_close.pair_role(), PairRole::Closer);
    assert_eq!(brace_close.pair_id(), id);

    assert_eq!(pairs::find_partner(&buf, 0, 15).unwrap(), Some((2, 0)));
    assert_eq!(pairs::find_partner(&buf, 2, 0).unwrap(), Some((0, 15)));
}

#[test]
fn comment_containment_end_to_end() {
    let mut buf = Buffer::from_bytes(b"/* a\nb */").unwrap();
    annotate_all(&mut buf, for_extension(Some("c"))).unwrap();
    for row in 0..2 {
        let cells = buf.line(row).unwrap().cells().unwrap().clone();
        assert!(
            cells.iter().all(|c| c.syntax == Token::Comment),
            "row {row} not fully comment"
        );
    }
    assert!(pairs::in_block_comment(&buf, 0, 2).unwrap());
    assert!(pairs::in_block_comment(&buf, 1, 0).unwrap());
}

#[test]
fn structural_refresh_after_edit() {
    let mut buf = Buffer::from_bytes(b"(a)\n").unwrap();
    let hl = for_extension(Some("c"));
    annotate_all(&mut buf, hl).unwrap();
    let id_before = buf.line(0).unwrap().cells().unwrap()[0].pair_id();
    assert_ne!(id_before, 0);

    // Deleting the closer leaves the opener unmatched after a rescan.
    buf.delete_cell(0, 2).unwrap();
    core_syntax::refresh_structure(&mut buf, hl).unwrap();
    let open = buf.line(0).unwrap().cells().unwrap()[0];
    assert_eq!(open.pair_role(), PairRole::Opener);
    assert_eq!(pairs::find_partner(&buf, 0, 0).unwrap(), None);
}
