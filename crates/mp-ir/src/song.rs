//! Song structure and sequencing types.

use alloc::vec::Vec;
use arrayvec::ArrayString;

use crate::pattern::Pattern;
use crate::sample::Sample;

/// Maximum number of entries in the sequence table.
pub const MAX_SEQUENCE_LEN: usize = 128;

/// A complete decoded song.
#[derive(Clone, Debug)]
pub struct Song {
    /// Song title
    pub title: ArrayString<20>,
    /// Number of channels (4, 6 or 8 for known layouts)
    pub channels: u8,
    /// Sample table, in file order
    pub samples: Vec<Sample>,
    /// Playback order: indices into `patterns`
    pub sequence: Vec<u8>,
    /// Patterns
    pub patterns: Vec<Pattern>,
    /// Sequence index to loop back to at the end of the song
    pub restart_position: u8,
}

impl Default for Song {
    fn default() -> Self {
        Self {
            title: ArrayString::new(),
            channels: 4,
            samples: Vec::new(),
            sequence: Vec::new(),
            patterns: Vec::new(),
            restart_position: 0,
        }
    }
}

impl Song {
    /// Create a new empty song.
    pub fn new(title: &str) -> Self {
        let mut song = Self::default();
        let _ = song.title.try_push_str(title);
        song
    }

    /// Create an empty song with a given number of channels.
    pub fn with_channels(title: &str, channels: u8) -> Self {
        let mut song = Self::new(title);
        song.channels = channels;
        song
    }

    /// Append a pattern and return its index.
    pub fn add_pattern(&mut self, pattern: Pattern) -> u8 {
        debug_assert_eq!(pattern.channels, self.channels);
        let idx = self.patterns.len() as u8;
        self.patterns.push(pattern);
        idx
    }

    /// Append an entry to the sequence. Entries past the table size are dropped.
    pub fn push_sequence(&mut self, pattern: u8) {
        if self.sequence.len() < MAX_SEQUENCE_LEN {
            self.sequence.push(pattern);
        }
    }

    /// Pattern played at the given sequence position, if both exist.
    pub fn pattern_at(&self, sequence_index: usize) -> Option<&Pattern> {
        let idx = *self.sequence.get(sequence_index)?;
        self.patterns.get(idx as usize)
    }

    /// Look up a sample by a division's trigger index.
    pub fn sample(&self, index: u8) -> Option<&Sample> {
        self.samples.get(index as usize)
    }
}
