//! Sample data types.

use alloc::vec::Vec;
use arrayvec::ArrayString;

/// Finetune steps per semitone (eight per semitone, twelve semitones per octave).
const FINETUNE_STEPS_PER_OCTAVE: f64 = 12.0 * 8.0;

/// Convert a signed 4-bit finetune nibble to a playback-rate ratio.
///
/// Only the low nibble is read. Values 8..=15 are two's-complement negatives
/// (8 = -8, 15 = -1), so the ratio spans `2^(-8/96)..=2^(7/96)`.
pub fn nibble_to_finetune(nibble: u8) -> f64 {
    let n = (nibble & 0x0F) as i8;
    let steps = if n > 7 { n - 16 } else { n };
    libm::pow(2.0, steps as f64 / FINETUNE_STEPS_PER_OCTAVE)
}

/// A sample definition.
#[derive(Clone, Debug)]
pub struct Sample {
    /// Sample name
    pub name: ArrayString<22>,
    /// PCM frames normalized to [-1, 1]
    pub data: Vec<f32>,
    /// Loop-back offset (in frames)
    pub loop_start: u32,
    /// Loop length (in frames). 0 = no loop.
    pub loop_length: u32,
    /// Raw finetune nibble as stored in the file
    pub finetune_nibble: u8,
    /// Finetune as a playback-rate ratio
    pub finetune: f64,
    /// Default volume (0-64)
    pub default_volume: u8,
}

impl Default for Sample {
    fn default() -> Self {
        Self {
            name: ArrayString::new(),
            data: Vec::new(),
            loop_start: 0,
            loop_length: 0,
            finetune_nibble: 0,
            finetune: 1.0,
            default_volume: 64,
        }
    }
}

impl Sample {
    /// Create a new empty sample.
    pub fn new(name: &str) -> Self {
        let mut sample = Self::default();
        let _ = sample.name.try_push_str(name);
        sample
    }

    /// Create a sample holding the given PCM frames at full volume.
    pub fn from_pcm(name: &str, data: Vec<f32>) -> Self {
        let mut sample = Self::new(name);
        sample.data = data;
        sample
    }

    /// Set the finetune from a file nibble.
    pub fn set_finetune_nibble(&mut self, nibble: u8) {
        self.finetune_nibble = nibble & 0x0F;
        self.finetune = nibble_to_finetune(nibble);
    }

    /// Get the length of the sample in frames.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the sample has no data.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns true if the sample has a loop.
    pub fn has_loop(&self) -> bool {
        self.loop_length > 0
    }

    /// One past the last frame of the loop region.
    pub fn loop_end(&self) -> u32 {
        self.loop_start + self.loop_length
    }

    /// Read a frame, returning silence outside the data.
    pub fn frame(&self, index: usize) -> f32 {
        self.data.get(index).copied().unwrap_or(0.0)
    }
}
