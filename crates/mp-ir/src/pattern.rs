//! Pattern and division types for tracker sequences.

use alloc::vec::Vec;
use core::fmt;

use crate::effects::Effect;
use crate::period::note_name;

/// Number of divisions (rows) in every pattern.
pub const DIVISIONS_PER_PATTERN: usize = 64;

/// One channel's slot in a pattern row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Division {
    /// Sample to trigger (0-based index into the song's samples), or `None`
    pub sample: Option<u8>,
    /// Amiga period, 0 = keep current pitch
    pub period: u16,
    /// Effect column command
    pub effect: Effect,
}

impl Division {
    /// Create an empty division.
    pub const fn empty() -> Self {
        Self {
            sample: None,
            period: 0,
            effect: Effect::None,
        }
    }

    /// Returns true if the division carries no trigger, pitch or effect.
    pub fn is_empty(&self) -> bool {
        self.sample.is_none() && self.period == 0 && self.effect == Effect::None
    }
}

/// Tracker notation: `C-2 01 C40`, with `---`, `..` and `...` for blanks.
impl fmt::Display for Division {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match note_name(self.period) {
            Some(name) => f.write_str(name)?,
            None => f.write_str("---")?,
        }
        match self.sample {
            Some(s) => write!(f, " {:02X}", s as u16 + 1)?,
            None => f.write_str(" ..")?,
        }
        match self.effect {
            Effect::None => f.write_str(" ..."),
            effect => write!(f, " {:03X}", effect.command()),
        }
    }
}

/// A pattern: 64 rows of divisions across the song's channels.
#[derive(Clone, Debug)]
pub struct Pattern {
    /// Number of channels
    pub channels: u8,
    /// Pattern data, stored row-major: data[division * channels + channel]
    pub data: Vec<Division>,
}

impl Pattern {
    /// Create a new pattern with empty divisions.
    pub fn new(channels: u8) -> Self {
        Self {
            channels,
            data: alloc::vec![Division::empty(); DIVISIONS_PER_PATTERN * channels as usize],
        }
    }

    /// Get a reference to a division.
    pub fn division(&self, division: usize, channel: u8) -> &Division {
        debug_assert!(division < DIVISIONS_PER_PATTERN);
        debug_assert!(channel < self.channels);
        &self.data[division * self.channels as usize + channel as usize]
    }

    /// Get a mutable reference to a division.
    pub fn division_mut(&mut self, division: usize, channel: u8) -> &mut Division {
        debug_assert!(division < DIVISIONS_PER_PATTERN);
        debug_assert!(channel < self.channels);
        &mut self.data[division * self.channels as usize + channel as usize]
    }

    /// All channels of one row.
    pub fn row(&self, division: usize) -> &[Division] {
        let start = division * self.channels as usize;
        &self.data[start..start + self.channels as usize]
    }
}
