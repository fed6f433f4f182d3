//! Built-in layout of the 142-LED strip mounted above an 88-key piano.
//!
//! LED numbers are the ones printed on the strip, which starts at 2. Keys 74
//! and up would land past the end of the strip and are left dark.

use super::{LayoutEntry, LayoutFile, LAYOUT_VERSION};

pub const BUILTIN_LED_BASE: u16 = 2;

#[rustfmt::skip]
const KEY_TO_LED: [(u8, u16); 73] = [
    (1, 2), (2, 4), (3, 6), (4, 8), (5, 10), (6, 12), (7, 14), (8, 16), (9, 17), (10, 19),
    (11, 21), (12, 23), (13, 25), (14, 27), (15, 29), (16, 31), (17, 33), (18, 35), (19, 37), (20, 38),
    (21, 40), (22, 42), (23, 44), (24, 46), (25, 48), (26, 50), (27, 52), (28, 54), (29, 56), (30, 58),
    (31, 60), (32, 61), (33, 63), (34, 65), (35, 67), (36, 69), (37, 71), (38, 73), (39, 75), (40, 77),
    (41, 79), (42, 81), (43, 83), (44, 84), (45, 86), (46, 88), (47, 90), (48, 92), (49, 94), (50, 96),
    (51, 98), (52, 100), (53, 102), (54, 104), (55, 106), (56, 108), (57, 109), (58, 111), (59, 113), (60, 115),
    (61, 117), (62, 119), (63, 121), (64, 123), (65, 125), (66, 127), (67, 129), (68, 131), (69, 132), (70, 134),
    (71, 136), (72, 140), (73, 142),
];

pub fn builtin_layout_file() -> LayoutFile {
    LayoutFile {
        version: LAYOUT_VERSION,
        name: Some("piano-142".to_string()),
        led_base: BUILTIN_LED_BASE,
        entries: KEY_TO_LED
            .iter()
            .map(|&(key, led)| LayoutEntry::Key { key, led })
            .collect(),
    }
}
