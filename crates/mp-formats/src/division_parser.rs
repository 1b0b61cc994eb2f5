//! Packed division decoding.
//!
//! Each division is four bytes:
//!
//! ```text
//! byte 0: ssss pppp   sample high nibble, period bits 8..11
//! byte 1: pppp pppp   period bits 0..7
//! byte 2: ssss eeee   sample low nibble, effect opcode
//! byte 3: xxxx yyyy   effect parameters
//! ```

use mp_ir::{Division, Effect};

/// Encoded size of one division.
pub const DIVISION_BYTES: usize = 4;

/// Decode one packed division.
///
/// Sample numbers are 1-based in the file; 0 means "no trigger". Numbers
/// above `sample_count` cannot be played and are dropped; the second
/// return value reports that case.
pub fn parse_division(bytes: [u8; DIVISION_BYTES], sample_count: usize) -> (Division, bool) {
    let number = (bytes[0] & 0xF0) | (bytes[2] >> 4);
    let period = (((bytes[0] & 0x0F) as u16) << 8) | bytes[1] as u16;
    let command = (((bytes[2] & 0x0F) as u16) << 8) | bytes[3] as u16;

    let (sample, invalid) = match number {
        0 => (None, false),
        n if (n as usize) <= sample_count => (Some(n - 1), false),
        _ => (None, true),
    };

    let division = Division {
        sample,
        period,
        effect: Effect::from_command(command),
    };
    (division, invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mp_ir::ExtendedEffect;

    #[test]
    fn splits_sample_across_nibbles() {
        // sample 0x1F, period 0x1AC (428), effect C40
        let (d, invalid) = parse_division([0x11, 0xAC, 0xFC, 0x40], 31);
        assert!(!invalid);
        assert_eq!(d.sample, Some(30));
        assert_eq!(d.period, 428);
        assert_eq!(d.effect, Effect::SetVolume(0x40));
    }

    #[test]
    fn zero_sample_is_no_trigger() {
        let (d, invalid) = parse_division([0x00, 0x00, 0x0E, 0xD3], 31);
        assert!(!invalid);
        assert_eq!(d.sample, None);
        assert_eq!(d.effect, Effect::Extended(ExtendedEffect::DelaySample(3)));
    }

    #[test]
    fn out_of_range_sample_is_dropped() {
        // sample 16 in a 15-slot table
        let (d, invalid) = parse_division([0x11, 0xAC, 0x00, 0x00], 15);
        assert!(invalid);
        assert_eq!(d.sample, None);
        assert_eq!(d.period, 428);
    }
}
