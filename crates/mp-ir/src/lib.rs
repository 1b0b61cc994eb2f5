//! Song model types for the modplay tracker player.
//!
//! This crate defines the decoded, immutable representation of a tracker
//! module. The format parser emits it once, and the playback engine reads
//! it for the rest of the session.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod analysis;
mod effects;
mod pattern;
mod period;
mod sample;
mod song;

pub use analysis::{analyze, SongFeatures};
pub use effects::{Effect, ExtendedEffect};
pub use pattern::{Division, Pattern, DIVISIONS_PER_PATTERN};
pub use period::{note_name, PERIOD_MAX, PERIOD_MIN};
pub use sample::{nibble_to_finetune, Sample};
pub use song::{Song, MAX_SEQUENCE_LEN};
