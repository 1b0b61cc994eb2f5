//! Audio output backends for the modplay tracker player.
//!
//! The device pulls: its callback asks a [`PcmSource`] for mono frames and
//! fans them out to however many channels the device has.

mod cpal_backend;
mod traits;

pub use cpal_backend::CpalOutput;
pub use traits::{AudioError, AudioOutput, PcmSource};
