//! Period-to-frequency conversion for sample playback.
//!
//! Samples are recorded so that playing them at period 428 (C-2) streams
//! 8287 frames per second. Everything else is scaled from that pair.

use mp_ir::{PERIOD_MAX, PERIOD_MIN};

/// Frames per second a sample streams at when played at [`C2_PERIOD`].
pub const C2_SAMPLE_RATE: f64 = 8287.0;

/// Reference period for [`C2_SAMPLE_RATE`].
pub const C2_PERIOD: f64 = 428.0;

/// Source frames to advance per output frame.
///
/// Returns 0.0 for period 0 (nothing to play) or a zero output rate.
pub fn period_to_increment(period: u16, finetune: f64, sample_rate: u32) -> f64 {
    if period == 0 || sample_rate == 0 {
        return 0.0;
    }
    C2_SAMPLE_RATE / sample_rate as f64 * (C2_PERIOD / period as f64) * finetune
}

/// Frequency ratio for a pitch offset in (possibly fractional) semitones.
pub fn semitone_ratio(semitones: f64) -> f64 {
    libm::pow(2.0, semitones / 12.0)
}

/// Clamp a period to the playable range.
pub fn clamp_period(period: i32) -> u16 {
    period.clamp(PERIOD_MIN as i32, PERIOD_MAX as i32) as u16
}
