//! Editor state behavior: motion, selection, multi-cursor edits, modes.

use core_state::{Action, Direction, Effect, EditorState, KeyInput, Mode, action::action_for_key};
use core_text::Buffer;

fn state(text: &str) -> EditorState {
    EditorState::new(Buffer::from_bytes(text.as_bytes()).expect("buffer"))
}

fn line(st: &EditorState, row: usize) -> String {
    st.buffer.line(row).map(|l| l.text()).unwrap_or_default()
}

#[test]
fn empty_buffer_cursor_starts_at_origin_and_typing_creates_line() {
    let mut st = state("");
    assert_eq!(st.cursors.primary().pos(), (0, 0));
    st.insert_char('a').unwrap();
    assert_eq!(st.buffer.line_count(), 1);
    assert_eq!(line(&st, 0), "a");
    assert_eq!(st.cursors.primary().pos(), (0, 1));
}

#[test]
fn horizontal_motion_snaps_to_grapheme_boundaries() {
    let mut st = state("xe\u{0301}y");
    st.move_cursors(Direction::Right, false, false);
    assert_eq!(st.cursors.primary().pos(), (0, 1));
    st.move_cursors(Direction::Right, false, false);
    // Skipped the combining mark with its base.
    assert_eq!(st.cursors.primary().pos(), (0, 3));
    st.move_cursors(Direction::Left, false, false);
    assert_eq!(st.cursors.primary().pos(), (0, 1));
}

#[test]
fn vertical_motion_preserves_goal_column() {
    let mut st = state("a long line here\nhi\nanother long line");
    for _ in 0..10 {
        st.move_cursors(Direction::Right, false, false);
    }
    assert_eq!(st.cursors.primary().pos(), (0, 10));
    st.move_cursors(Direction::Down, false, false);
    assert_eq!(st.cursors.primary().pos(), (1, 2)); // clamped
    st.move_cursors(Direction::Down, false, false);
    assert_eq!(st.cursors.primary().pos(), (2, 10)); // goal restored
}

#[test]
fn shift_motion_extends_selection_and_plain_motion_clears() {
    let mut st = state("hello");
    st.move_cursors(Direction::Right, true, false);
    st.move_cursors(Direction::Right, true, false);
    let sel = st.cursors.primary().selection().unwrap();
    assert_eq!(sel, ((0, 0), (0, 2)));
    st.move_cursors(Direction::Left, false, false);
    assert!(st.cursors.primary().selection().is_none());
}

#[test]
fn line_wrapping_motion_across_rows() {
    let mut st = state("ab\ncd");
    st.move_end(false);
    st.move_cursors(Direction::Right, false, false);
    assert_eq!(st.cursors.primary().pos(), (1, 0));
    st.move_cursors(Direction::Left, false, false);
    assert_eq!(st.cursors.primary().pos(), (0, 2));
}

#[test]
fn word_motion_follows_neighbor_layer() {
    let mut st = state("foo bar_baz   qux");
    st.move_cursors(Direction::Right, false, true);
    assert_eq!(st.cursors.primary().pos(), (0, 4));
    st.move_cursors(Direction::Right, false, true);
    assert_eq!(st.cursors.primary().pos(), (0, 14));
    st.move_cursors(Direction::Right, false, true);
    assert_eq!(st.cursors.primary().pos(), (0, 17));
    st.move_cursors(Direction::Left, false, true);
    assert_eq!(st.cursors.primary().pos(), (0, 14));
}

#[test]
fn multi_cursor_insert_applies_at_every_cursor() {
    let mut st = state("one\ntwo\nthree");
    st.add_cursor_below();
    st.add_cursor_below();
    assert_eq!(st.cursors.len(), 3);
    st.insert_char('>').unwrap();
    assert_eq!(line(&st, 0), ">one");
    assert_eq!(line(&st, 1), ">two");
    assert_eq!(line(&st, 2), ">three");
    for c in st.cursors.iter() {
        assert_eq!(c.col, 1);
    }
}

#[test]
fn multi_cursor_same_row_shifts_later_cursor() {
    let mut st = state("abcdef");
    st.cursors.primary_mut().move_to(0, 2);
    st.cursors.add(0, 4);
    st.insert_char('x').unwrap();
    assert_eq!(line(&st, 0), "abxcdxef");
    let mut cols: Vec<usize> = st.cursors.iter().map(|c| c.col).collect();
    cols.sort_unstable();
    assert_eq!(cols, vec![3, 6]);
}

#[test]
fn multi_cursor_newline_splits_every_row() {
    let mut st = state("aaa\nbbb");
    st.cursors.primary_mut().move_to(0, 1);
    st.cursors.add(1, 2);
    st.insert_newline().unwrap();
    assert_eq!(st.buffer.line_count(), 4);
    assert_eq!(line(&st, 0), "a");
    assert_eq!(line(&st, 1), "aa");
    assert_eq!(line(&st, 2), "bb");
    assert_eq!(line(&st, 3), "b");
    let mut poses: Vec<(usize, usize)> = st.cursors.iter().map(|c| c.pos()).collect();
    poses.sort_unstable();
    assert_eq!(poses, vec![(1, 0), (3, 0)]);
}

#[test]
fn backspace_joins_lines() {
    let mut st = state("ab\ncd");
    st.cursors.primary_mut().move_to(1, 0);
    st.backspace().unwrap();
    assert_eq!(st.buffer.line_count(), 1);
    assert_eq!(line(&st, 0), "abcd");
    assert_eq!(st.cursors.primary().pos(), (0, 2));
}

#[test]
fn selection_delete_spans_rows() {
    let mut st = state("alpha\nbeta\ngamma");
    let c = st.cursors.primary_mut();
    c.move_to(0, 2);
    c.start_selection();
    c.move_to(2, 3);
    st.delete_selection().unwrap();
    assert_eq!(st.buffer.line_count(), 1);
    assert_eq!(line(&st, 0), "alma");
    assert_eq!(st.cursors.primary().pos(), (0, 2));
}

#[test]
fn typing_over_selection_replaces_it() {
    let mut st = state("hello");
    let c = st.cursors.primary_mut();
    c.start_selection();
    c.move_to(0, 4);
    st.insert_char('J').unwrap();
    assert_eq!(line(&st, 0), "Jo");
}

#[test]
fn undo_restores_buffer_and_cursors() {
    let mut st = state("word");
    st.move_end(false);
    st.insert_char('!').unwrap();
    assert_eq!(line(&st, 0), "word!");
    st.undo().unwrap();
    assert_eq!(line(&st, 0), "word");
    assert_eq!(st.cursors.primary().pos(), (0, 4));
    st.redo().unwrap();
    assert_eq!(line(&st, 0), "word!");
}

#[test]
fn insert_run_coalesces_undo_snapshots() {
    let mut st = state("");
    for ch in "hello".chars() {
        st.insert_char(ch).unwrap();
    }
    st.undo().unwrap();
    // One undo takes back the whole typing burst.
    assert_eq!(st.buffer.line_count(), 0);
}

#[test]
fn paste_multiline_at_cursor() {
    let mut st = state("xy");
    st.cursors.primary_mut().move_to(0, 1);
    st.insert_text("AA\nBB\nCC").unwrap();
    assert_eq!(st.buffer.line_count(), 3);
    assert_eq!(line(&st, 0), "xAA");
    assert_eq!(line(&st, 1), "BB");
    assert_eq!(line(&st, 2), "CCy");
    assert_eq!(st.cursors.primary().pos(), (2, 2));
}

#[test]
fn page_motion_advances_by_text_rows() {
    let text: String = (0..100).map(|i| format!("l{i}\n")).collect();
    let mut st = state(&text);
    st.screen_rows = 22; // 20 text rows
    st.move_page(Direction::Down, false);
    assert_eq!(st.cursors.primary().row, 20);
    st.move_page(Direction::Up, false);
    assert_eq!(st.cursors.primary().row, 0);
}

#[test]
fn scroll_follows_cursor() {
    let text: String = (0..100).map(|i| format!("line{i}\n")).collect();
    let mut st = state(&text);
    st.screen_rows = 12; // 10 text rows
    st.cursors.primary_mut().move_to(50, 0);
    st.scroll_to_cursor();
    assert_eq!(st.row_offset, 41);
    st.cursors.primary_mut().move_to(5, 0);
    st.scroll_to_cursor();
    assert_eq!(st.row_offset, 5);
}

#[test]
fn quit_with_unsaved_changes_asks_first() {
    let mut st = state("x");
    st.insert_char('y').unwrap();
    let effect = st.apply_action(Action::QuitRequest).unwrap();
    assert_eq!(effect, Effect::None);
    assert_eq!(st.mode, Mode::QuitConfirm);
    let effect = st.apply_action(Action::ConfirmYes).unwrap();
    assert_eq!(effect, Effect::Quit);
}

#[test]
fn goto_line_prompt_moves_cursor() {
    let mut st = state("a\nb\nc\nd\n");
    st.apply_action(Action::GotoLinePrompt).unwrap();
    assert_eq!(st.mode, Mode::GotoLine);
    for c in "3".chars() {
        st.apply_action(Action::PromptChar(c)).unwrap();
    }
    st.apply_action(Action::PromptSubmit).unwrap();
    assert_eq!(st.mode, Mode::Normal);
    assert_eq!(st.cursors.primary().pos(), (2, 0));
}

#[test]
fn leader_mode_unknown_key_stays() {
    let mut st = state("x");
    st.apply_action(Action::LeaderEnter).unwrap();
    assert!(matches!(st.mode, Mode::Leader(_)));
    st.apply_action(Action::LeaderKey('!')).unwrap();
    assert!(matches!(st.mode, Mode::Leader(_)));
    st.apply_action(Action::PromptCancel).unwrap();
    assert_eq!(st.mode, Mode::Normal);
}

#[test]
fn search_prompt_emits_search_changed() {
    let mut st = state("needle haystack");
    st.apply_action(Action::SearchStart {
        forward: true,
        replace: false,
    })
    .unwrap();
    assert_eq!(st.mode, Mode::Search);
    let effect = st.apply_action(Action::PromptChar('n')).unwrap();
    assert_eq!(effect, Effect::SearchChanged);
    assert_eq!(st.search.pattern, "n");
}

#[test]
fn key_dispatch_consults_mode_first() {
    assert_eq!(
        action_for_key(Mode::Normal, KeyInput::Char('y')),
        Action::InsertChar('y')
    );
    assert_eq!(
        action_for_key(Mode::QuitConfirm, KeyInput::Char('y')),
        Action::ConfirmYes
    );
    assert_eq!(
        action_for_key(Mode::Search, KeyInput::Char('y')),
        Action::PromptChar('y')
    );
    assert_eq!(
        action_for_key(Mode::Normal, KeyInput::Ctrl('s')),
        Action::Save
    );
}

#[test]
fn double_click_selects_word() {
    let mut st = state("foo bar_baz qux");
    st.select_word_at(0, 5);
    let sel = st.cursors.primary().selection().unwrap();
    assert_eq!(sel, ((0, 4), (0, 7))); // "bar"
}
