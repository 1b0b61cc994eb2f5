//! Amiga period range and note naming.

/// Smallest playable period (B-3).
pub const PERIOD_MIN: u16 = 113;
/// Largest playable period (C-1).
pub const PERIOD_MAX: u16 = 856;

/// Untuned periods for the three playable octaves, C-1 first.
const PERIODS: [u16; 36] = [
    856, 808, 762, 720, 678, 640, 604, 570, 538, 508, 480, 453, //
    428, 404, 381, 360, 339, 320, 302, 285, 269, 254, 240, 226, //
    214, 202, 190, 180, 170, 160, 151, 143, 135, 127, 120, 113,
];

const NAMES: [&str; 36] = [
    "C-1", "C#1", "D-1", "D#1", "E-1", "F-1", "F#1", "G-1", "G#1", "A-1", "A#1", "B-1", //
    "C-2", "C#2", "D-2", "D#2", "E-2", "F-2", "F#2", "G-2", "G#2", "A-2", "A#2", "B-2", //
    "C-3", "C#3", "D-3", "D#3", "E-3", "F-3", "F#3", "G-3", "G#3", "A-3", "A#3", "B-3",
];

/// Name of the note whose period is closest to `period`.
///
/// Returns `None` for period 0 ("keep current").
pub fn note_name(period: u16) -> Option<&'static str> {
    if period == 0 {
        return None;
    }
    let mut best = 0;
    let mut best_dist = u16::MAX;
    for (i, &p) in PERIODS.iter().enumerate() {
        let dist = p.abs_diff(period);
        if dist < best_dist {
            best = i;
            best_dist = dist;
        }
    }
    Some(NAMES[best])
}
