//! Property: contrast repair always reaches the floor or lands on pure
//! white/black.

use core_render::{CONTRAST_MIN, Rgb, contrast_ratio, ensure_contrast};
use proptest::prelude::*;

proptest! {
    #[test]
    fn repaired_foreground_meets_floor_or_is_extreme(
        fr in any::<u8>(), fg_ in any::<u8>(), fb in any::<u8>(),
        br in any::<u8>(), bg_ in any::<u8>(), bb in any::<u8>(),
    ) {
        let fg = Rgb::new(fr, fg_, fb);
        let bg = Rgb::new(br, bg_, bb);
        let fixed = ensure_contrast(fg, bg);
        let ok = contrast_ratio(fixed, bg) >= CONTRAST_MIN
            || fixed == Rgb::WHITE
            || fixed == Rgb::BLACK;
        prop_assert!(ok, "fg {fg:?} on bg {bg:?} -> {fixed:?}");
    }

    #[test]
    fn repair_is_idempotent_on_good_pairs(
        fr in any::<u8>(), fg_ in any::<u8>(), fb in any::<u8>(),
    ) {
        let fg = Rgb::new(fr, fg_, fb);
        let bg = Rgb::BLACK;
        let once = ensure_contrast(fg, bg);
        let twice = ensure_contrast(once, bg);
        prop_assert_eq!(once, twice);
    }
}
