//! Playback engine for the modplay tracker player.
//!
//! A [`Sequencer`] walks the song sequence and hands each division to one
//! [`ChannelVoice`] per channel. Audio is pulled with
//! [`Sequencer::generate`], which fills a mono `f32` buffer.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod channel;
mod frequency;
mod mixer;
mod note_change;
mod oscillator;
mod sequencer;

pub use channel::{ChannelVoice, DivisionClock};
pub use frequency::{clamp_period, period_to_increment, semitone_ratio, C2_PERIOD, C2_SAMPLE_RATE};
pub use mixer::soft_clip;
pub use note_change::NoteChangeEffect;
pub use oscillator::{oscillator_rate, Oscillator, Waveform};
pub use sequencer::{
    samples_per_division, ChannelInfo, EngineError, PlayMode, PlayState, Position, Sequencer,
    DEFAULT_BPM, DEFAULT_SEED, DEFAULT_TICKS_PER_DIVISION, MAX_CHANNELS, MIN_SAMPLE_RATE,
};
