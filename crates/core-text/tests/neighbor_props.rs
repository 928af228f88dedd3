//! Property tests for the neighbor layer: class is a function of the
//! codepoint alone, position a function of the line's codepoints alone.

use core_text::cell::Cell;
use core_text::neighbor;
use proptest::prelude::*;

proptest! {
    #[test]
    fn class_depends_only_on_codepoint(ch in any::<char>(), prefix in ".{0,8}") {
        let alone = neighbor::classify(ch);
        let mut cells: Vec<Cell> = prefix.chars().chain([ch]).map(Cell::new).collect();
        neighbor::annotate(&mut cells);
        let in_context = cells.last().expect("non-empty").class();
        prop_assert_eq!(alone, in_context);
    }

    #[test]
    fn annotate_is_idempotent(s in ".{0,32}") {
        let mut once: Vec<Cell> = s.chars().map(Cell::new).collect();
        neighbor::annotate(&mut once);
        let mut twice = once.clone();
        neighbor::annotate(&mut twice);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn word_starts_are_monotonic(s in "[a-z _.]{0,32}") {
        let mut cells: Vec<Cell> = s.chars().map(Cell::new).collect();
        neighbor::annotate(&mut cells);
        let mut col = 0;
        for _ in 0..cells.len() + 1 {
            let next = neighbor::next_word_start(&cells, col);
            prop_assert!(next >= col);
            prop_assert!(next <= cells.len());
            if next == col {
                prop_assert_eq!(col, cells.len());
                break;
            }
            col = next;
        }
    }
}
