//! Sequencer: global timing, song position and the pull-based render entry.
//!
//! Time is counted in output frames since playback started
//! (`samples_in_song`). Division boundaries are derived from a running
//! division counter and the current frames-per-division, so jumps, breaks
//! and pattern delays never move `samples_in_song` backwards.

use core::fmt;

use heapless::Vec as HVec;
use mp_ir::{Effect, Song, DIVISIONS_PER_PATTERN};
use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::channel::{ChannelVoice, DivisionClock};
use crate::mixer::soft_clip;
use crate::note_change::NoteChangeEffect;

/// Most channels a song may have.
pub const MAX_CHANNELS: usize = 8;

/// Slowest and fastest accepted tempo.
pub const BPM_MIN: f32 = 20.0;
pub const BPM_MAX: f32 = 300.0;
/// Accepted ticks-per-division range.
pub const TPD_MIN: u8 = 1;
pub const TPD_MAX: u8 = 32;

pub const DEFAULT_BPM: f32 = 125.0;
pub const DEFAULT_TICKS_PER_DIVISION: u8 = 6;

/// Lowest output rate; keeps every division at least one frame long.
pub const MIN_SAMPLE_RATE: u32 = 1000;

/// Seed used by [`Sequencer::new`] for the random oscillator waveform.
pub const DEFAULT_SEED: u64 = 0x6d6f_6470_6c61_7900;

/// What happens when the sequence runs out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlayMode {
    /// Stop at the end of the sequence
    PlayOnce,
    /// Loop to the declared restart position, or from the top
    #[default]
    Loop,
    /// Loop only if the file declares a valid restart position
    LoopOnlyIfDeclared,
}

/// Observable play state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayState {
    Stopped,
    PlayOnce,
    Loop,
    LoopOnlyIfDeclared,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineError {
    /// The song declares more channels than the engine can hold
    TooManyChannels(u8),
    /// The output rate is below [`MIN_SAMPLE_RATE`]
    InvalidSampleRate(u32),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::TooManyChannels(n) => {
                write!(f, "song has {} channels, at most {} are supported", n, MAX_CHANNELS)
            }
            EngineError::InvalidSampleRate(rate) => {
                write!(f, "sample rate {} Hz is below {} Hz", rate, MIN_SAMPLE_RATE)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EngineError {}

/// Current song position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Position {
    pub sequence: usize,
    /// Pattern at that sequence entry, if the entry exists
    pub pattern: Option<u8>,
    pub division: usize,
    pub samples_in_song: u64,
}

/// Diagnostic view of one channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelInfo<'a> {
    pub sample: Option<u8>,
    pub sample_name: &'a str,
    pub volume: u8,
    pub period: u16,
    pub active: bool,
    pub effect: Effect,
}

/// Playback context for one song.
pub struct Sequencer {
    song: Song,
    sample_rate: u32,
    bpm: f32,
    ticks_per_division: u8,
    samples_per_division: f64,

    samples_in_song: u64,
    /// Divisions entered since playback started, repeats included
    div_ordinal: u64,
    div_start: u64,
    div_end: u64,

    sequence: usize,
    division: usize,
    pending_break: Option<u8>,
    pending_jump: Option<u8>,
    pattern_delay: u8,

    mode: PlayMode,
    stopped: bool,

    voices: HVec<ChannelVoice, MAX_CHANNELS>,
    rng: Pcg32,
}

impl Sequencer {
    /// Create a context positioned at the first division of the song.
    pub fn new(song: Song, sample_rate: u32, mode: PlayMode, bpm: f32) -> Result<Self, EngineError> {
        Self::with_seed(song, sample_rate, mode, bpm, DEFAULT_SEED)
    }

    /// Like [`Sequencer::new`] with an explicit seed for random oscillator waveforms.
    pub fn with_seed(
        song: Song,
        sample_rate: u32,
        mode: PlayMode,
        bpm: f32,
        seed: u64,
    ) -> Result<Self, EngineError> {
        if sample_rate < MIN_SAMPLE_RATE {
            return Err(EngineError::InvalidSampleRate(sample_rate));
        }
        let mut voices = HVec::new();
        for _ in 0..song.channels {
            voices
                .push(ChannelVoice::new())
                .map_err(|_| EngineError::TooManyChannels(song.channels))?;
        }

        let bpm = bpm.clamp(BPM_MIN, BPM_MAX);
        let ticks_per_division = DEFAULT_TICKS_PER_DIVISION;
        let mut seq = Self {
            song,
            sample_rate,
            bpm,
            ticks_per_division,
            samples_per_division: samples_per_division(sample_rate, ticks_per_division, bpm),
            samples_in_song: 0,
            div_ordinal: 0,
            div_start: 0,
            div_end: 0,
            sequence: 0,
            division: 0,
            pending_break: None,
            pending_jump: None,
            pattern_delay: 0,
            mode,
            stopped: false,
            voices,
            rng: Pcg32::seed_from_u64(seed),
        };
        seq.rewind();
        Ok(seq)
    }

    pub fn song(&self) -> &Song {
        &self.song
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    pub fn ticks_per_division(&self) -> u8 {
        self.ticks_per_division
    }

    pub fn samples_per_division(&self) -> f64 {
        self.samples_per_division
    }

    pub fn play_mode(&self) -> PlayMode {
        self.mode
    }

    pub fn state(&self) -> PlayState {
        if self.stopped {
            return PlayState::Stopped;
        }
        match self.mode {
            PlayMode::PlayOnce => PlayState::PlayOnce,
            PlayMode::Loop => PlayState::Loop,
            PlayMode::LoopOnlyIfDeclared => PlayState::LoopOnlyIfDeclared,
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn position(&self) -> Position {
        Position {
            sequence: self.sequence,
            pattern: self.song.sequence.get(self.sequence).copied(),
            division: self.division,
            samples_in_song: self.samples_in_song,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.voices.len()
    }

    pub fn channel(&self, index: usize) -> Option<ChannelInfo<'_>> {
        let voice = self.voices.get(index)?;
        let sample_name = voice
            .sample()
            .and_then(|s| self.song.sample(s))
            .map(|s| s.name.as_str())
            .unwrap_or("");
        Some(ChannelInfo {
            sample: voice.sample(),
            sample_name,
            volume: voice.volume(),
            period: voice.period(),
            active: voice.is_active(),
            effect: voice.effect(),
        })
    }

    pub fn voice(&self, index: usize) -> Option<&ChannelVoice> {
        self.voices.get(index)
    }

    /// Change tempo and/or ticks per division.
    ///
    /// Elapsed time is rescaled by the change in frames-per-division, so the
    /// song position stays put in musical time.
    pub fn set_tempo(&mut self, bpm: Option<f32>, ticks_per_division: Option<u8>) {
        if bpm.is_none() && ticks_per_division.is_none() {
            return;
        }
        let old = self.samples_per_division;
        if let Some(bpm) = bpm {
            self.bpm = bpm.clamp(BPM_MIN, BPM_MAX);
        }
        if let Some(tpd) = ticks_per_division {
            self.ticks_per_division = tpd.clamp(TPD_MIN, TPD_MAX);
        }
        self.samples_per_division =
            samples_per_division(self.sample_rate, self.ticks_per_division, self.bpm);
        let ratio = self.samples_per_division / old;
        self.samples_in_song = libm::floor(self.samples_in_song as f64 * ratio) as u64;
        self.update_bounds();
    }

    pub fn set_play_mode(&mut self, mode: PlayMode) {
        self.mode = mode;
    }

    /// Rewind to the top of the song and resume playback.
    pub fn restart(&mut self) {
        self.rewind();
    }

    /// Fill `buffer` with the next mono frames, replacing its contents.
    ///
    /// Does not allocate. Once stopped, the remainder is silence.
    pub fn generate(&mut self, buffer: &mut [f32]) {
        buffer.fill(0.0);
        let mut start = 0;
        while start < buffer.len() {
            self.settle();
            if self.stopped {
                return;
            }
            let remaining = buffer.len() - start;
            let write = remaining.min((self.div_end - self.samples_in_song) as usize);
            let span = &mut buffer[start..start + write];

            let clock = self.clock();
            for voice in self.voices.iter_mut() {
                voice.accumulate(&self.song, span, &clock);
            }
            soft_clip(span);

            self.samples_in_song += write as u64;
            start += write;
        }
        self.settle();
    }

    fn clock(&self) -> DivisionClock {
        DivisionClock {
            sample_rate: self.sample_rate,
            ticks_per_division: self.ticks_per_division,
            samples_per_division: self.samples_per_division,
            start: self.div_start,
            end: self.div_end,
            now: self.samples_in_song,
        }
    }

    fn update_bounds(&mut self) {
        let spd = self.samples_per_division;
        self.div_start = libm::floor(self.div_ordinal as f64 * spd) as u64;
        self.div_end = libm::floor((self.div_ordinal + 1) as f64 * spd) as u64;
    }

    /// Advance past every division boundary already reached.
    fn settle(&mut self) {
        while !self.stopped && self.samples_in_song >= self.div_end {
            self.advance_division();
        }
    }

    fn rewind(&mut self) {
        for voice in self.voices.iter_mut() {
            voice.reset();
        }
        self.sequence = 0;
        self.division = 0;
        self.pending_break = None;
        self.pending_jump = None;
        self.pattern_delay = 0;
        self.samples_in_song = 0;
        self.div_ordinal = 0;
        self.update_bounds();
        self.stopped = self.song.sequence.is_empty();
        if !self.stopped {
            // A stop request on the very first division never restarts.
            self.notify_division();
        }
    }

    fn advance_division(&mut self) {
        self.div_ordinal += 1;

        if self.pattern_delay > 0 {
            self.pattern_delay -= 1;
            for voice in self.voices.iter_mut() {
                voice.on_division_repeat();
            }
            self.update_bounds();
            return;
        }

        self.division += 1;
        if self.division >= DIVISIONS_PER_PATTERN
            || self.pending_break.is_some()
            || self.pending_jump.is_some()
        {
            let next = match self.pending_jump.take() {
                Some(entry) => entry as usize,
                None => self.sequence + 1,
            };
            self.division = self
                .pending_break
                .take()
                .map(|d| (d as usize).min(DIVISIONS_PER_PATTERN - 1))
                .unwrap_or(0);
            self.sequence = next;

            if self.sequence >= self.song.sequence.len() {
                let restart = self.song.restart_position as usize;
                match self.mode {
                    PlayMode::PlayOnce => {
                        self.stopped = true;
                        return;
                    }
                    _ if restart < self.song.sequence.len() => self.sequence = restart,
                    PlayMode::Loop => {
                        self.rewind();
                        return;
                    }
                    PlayMode::LoopOnlyIfDeclared => {
                        self.stopped = true;
                        return;
                    }
                }
            }
        }

        self.update_bounds();
        if self.notify_division() {
            self.rewind();
        }
    }

    /// Hand the current division to every voice and apply their requests.
    ///
    /// Requests are applied in channel order, so the last channel wins.
    /// Returns true if a stop request asks for a full restart.
    fn notify_division(&mut self) -> bool {
        let clock = self.clock();
        let pattern = self.song.pattern_at(self.sequence);
        let mut restart = false;
        let mut bpm = None;
        let mut ticks = None;

        for (ch, voice) in self.voices.iter_mut().enumerate() {
            let division = pattern
                .map(|p| *p.division(self.division, ch as u8))
                .unwrap_or_default();
            match voice.on_change_division(&self.song, &division, &clock, &mut self.rng) {
                NoteChangeEffect::Continue => {}
                NoteChangeEffect::Stop => {
                    if self.mode == PlayMode::Loop {
                        restart = !(self.sequence == 0 && self.division == 0);
                    } else {
                        self.stopped = true;
                    }
                }
                NoteChangeEffect::JumpToPattern(entry) => self.pending_jump = Some(entry),
                NoteChangeEffect::BreakPattern(div) => self.pending_break = Some(div),
                NoteChangeEffect::DelayPattern(n) => self.pattern_delay = n,
                NoteChangeEffect::SetBpm(value) => bpm = Some(value as f32),
                NoteChangeEffect::SetTicksPerDivision(value) => ticks = Some(value),
            }
        }

        self.set_tempo(bpm, ticks);
        restart && !self.stopped
    }
}

/// Output frames per division: `rate * tpd * 60 / (24 * bpm)`.
pub fn samples_per_division(sample_rate: u32, ticks_per_division: u8, bpm: f32) -> f64 {
    sample_rate as f64 * ticks_per_division as f64 * 60.0 / (24.0 * bpm as f64)
}

impl fmt::Debug for Sequencer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequencer")
            .field("sample_rate", &self.sample_rate)
            .field("bpm", &self.bpm)
            .field("ticks_per_division", &self.ticks_per_division)
            .field("position", &self.position())
            .field("state", &self.state())
            .finish()
    }
}
