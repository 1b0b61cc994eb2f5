//! Format parser for the modplay tracker player.
//!
//! Decodes ProTracker-family MOD files into the `mp-ir` song model.

mod division_parser;
mod mod_format;

pub use division_parser::{parse_division, DIVISION_BYTES};
pub use mod_format::{load_mod, load_mod_with, read_mod};

use thiserror::Error;

/// Error type for format parsing.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The stream could not be read
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// A fixed-size block (header, pattern) runs past the end of the data
    #[error("unexpected end of file: needed {needed} bytes, {available} available")]
    UnexpectedEof { needed: usize, available: usize },
    /// Sample PCM is shorter than its header declares
    #[error("sample {index} truncated: expected {expected} frames, {available} available")]
    TruncatedSample {
        index: usize,
        expected: usize,
        available: usize,
    },
    /// Header fields could not be decoded
    #[error("malformed header: {0}")]
    Header(#[from] binrw::Error),
}

/// Size of the sample table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleSlots {
    /// Original 15-slot layout, no format tag
    Legacy15,
    /// 31-slot layout with a 4-byte tag at offset 1080
    Extended31,
}

impl SampleSlots {
    /// Number of sample headers in the table.
    pub fn count(self) -> usize {
        match self {
            SampleSlots::Legacy15 => 15,
            SampleSlots::Extended31 => 31,
        }
    }
}

/// Channel count and sample-table size of a MOD file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layout {
    pub channels: u8,
    pub sample_slots: SampleSlots,
}

impl Layout {
    /// Tagged 4-channel layout (`M.K.` and friends).
    pub const STANDARD: Layout = Layout {
        channels: 4,
        sample_slots: SampleSlots::Extended31,
    };

    /// Untagged 15-sample layout.
    pub const LEGACY: Layout = Layout {
        channels: 4,
        sample_slots: SampleSlots::Legacy15,
    };

    /// Layout selected by a recognized format tag.
    pub fn from_tag(tag: &[u8; 4]) -> Option<Layout> {
        let channels = match tag {
            b"M.K." | b"M!K!" | b"FLT4" | b"4CHN" => 4,
            b"6CHN" => 6,
            b"FLT8" | b"8CHN" | b"OCTA" => 8,
            _ => return None,
        };
        Some(Layout {
            channels,
            sample_slots: SampleSlots::Extended31,
        })
    }
}

/// Parser settings.
#[derive(Clone, Copy, Debug)]
pub struct LoadOptions {
    /// Layout used when the tag is not recognized
    pub fallback_layout: Layout,
    /// Zero-pad sample PCM cut short by the end of the file instead of failing
    pub allow_truncated_samples: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            fallback_layout: Layout::STANDARD,
            allow_truncated_samples: false,
        }
    }
}

/// What the parser found (and worked around) while decoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadReport {
    /// Bytes at the tag offset, if the file is long enough to hold one
    pub tag: Option<[u8; 4]>,
    /// Whether the tag matched a known variant
    pub recognized_tag: bool,
    /// Layout actually used
    pub layout: Layout,
    /// Division sample references outside the sample table (dropped)
    pub invalid_sample_refs: usize,
    /// Samples whose PCM was zero-padded
    pub padded_samples: usize,
    /// Samples whose loop was clipped to the sample length
    pub clipped_loops: usize,
}
