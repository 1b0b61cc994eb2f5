//! Channel voice: per-channel effect state machine and sample resampling.

use mp_ir::{nibble_to_finetune, Division, Effect, ExtendedEffect, Sample, Song};
use rand::Rng;

use crate::frequency::{clamp_period, period_to_increment, semitone_ratio};
use crate::note_change::NoteChangeEffect;
use crate::oscillator::{oscillator_rate, Oscillator};

/// Timing of the division being played, shared by every voice.
#[derive(Clone, Copy, Debug)]
pub struct DivisionClock {
    pub sample_rate: u32,
    pub ticks_per_division: u8,
    pub samples_per_division: f64,
    /// Absolute frame where the division starts
    pub start: u64,
    /// Absolute frame where the division ends (exclusive)
    pub end: u64,
    /// Absolute frame of the first frame handed to `accumulate`
    pub now: u64,
}

impl DivisionClock {
    /// Tick containing `frame`, and the first frame past that tick's window.
    fn tick_at(&self, frame: u64) -> (u32, u64) {
        let span = self.end.saturating_sub(self.start).max(1) as f64;
        let tpd = self.ticks_per_division.max(1) as f64;
        let tick = (frame.saturating_sub(self.start) as f64 * tpd / span) as u32;
        let next = self.start + libm::ceil((tick as f64 + 1.0) * span / tpd) as u64;
        (tick, next)
    }
}

/// Playback state for one channel.
#[derive(Clone, Debug)]
pub struct ChannelVoice {
    /// Last triggered sample, remembered across empty divisions
    sample: Option<u8>,
    streaming: bool,
    /// Fractional frame position in the sample
    position: f64,
    /// Frames advanced per output frame
    increment: f64,
    /// Wrap point: sample length until the first loop, loop end after
    sample_end: u32,

    period: u16,
    /// Period of the last note, the slide-to-note goal
    target_period: u16,
    /// Slide-to-note speed memory
    slide_speed: u8,
    /// Set-finetune override, cleared by the next sample trigger
    finetune: Option<f64>,
    /// Divisions since the last note, drives the arpeggio rotation
    holds: u32,

    effect: Effect,
    cur_tick: u32,
    delayed_start: bool,
    glissando: bool,

    vol64: u8,
    gain: f32,

    vibrato: Oscillator,
    /// Vibrato depth in semitones
    vibrato_depth: f64,
    tremolo: Oscillator,
    /// Tremolo depth as a fraction of full gain
    tremolo_depth: f64,
}

impl Default for ChannelVoice {
    fn default() -> Self {
        Self {
            sample: None,
            streaming: false,
            position: 0.0,
            increment: 0.0,
            sample_end: 0,
            period: 0,
            target_period: 0,
            slide_speed: 0,
            finetune: None,
            holds: 0,
            effect: Effect::None,
            cur_tick: 0,
            delayed_start: false,
            glissando: false,
            vol64: 64,
            gain: 1.0,
            vibrato: Oscillator::default(),
            vibrato_depth: 0.0,
            tremolo: Oscillator::default(),
            tremolo_depth: 0.0,
        }
    }
}

impl ChannelVoice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return to the power-on state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Index of the remembered sample.
    pub fn sample(&self) -> Option<u8> {
        self.sample
    }

    /// Whether the voice is currently producing output.
    pub fn is_active(&self) -> bool {
        self.streaming
    }

    /// Volume (0-64).
    pub fn volume(&self) -> u8 {
        self.vol64
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn period(&self) -> u16 {
        self.period
    }

    pub fn effect(&self) -> Effect {
        self.effect
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn increment(&self) -> f64 {
        self.increment
    }

    pub fn glissando(&self) -> bool {
        self.glissando
    }

    /// Dispatch a new division on this channel.
    pub fn on_change_division<R: Rng>(
        &mut self,
        song: &Song,
        division: &Division,
        clock: &DivisionClock,
        rng: &mut R,
    ) -> NoteChangeEffect {
        self.cur_tick = 0;
        self.delayed_start = false;

        let effect = division.effect;
        let slide = effect.is_slide_to_note();
        let mut triggered = false;

        match division.sample {
            Some(index) => match song.sample(index) {
                Some(sample) => {
                    self.start_note(index, sample);
                    self.vol64 = sample.default_volume.min(64);
                    self.finetune = None;
                    triggered = true;
                }
                None => {
                    self.sample = None;
                    self.streaming = false;
                    self.increment = 0.0;
                }
            },
            None => self.holds += 1,
        }

        // Without a trigger, a period only retargets slide-to-note.
        if division.period != 0 && (triggered || slide) {
            self.target_period = division.period;
            if !slide {
                self.period = division.period;
            }
        }

        if triggered {
            self.vibrato.on_new_note();
            self.tremolo.on_new_note();
        }

        self.effect = effect;
        let mut response = NoteChangeEffect::Continue;
        match effect {
            Effect::SlideToNote(speed) if speed != 0 => self.slide_speed = speed,
            Effect::Vibrato { speed, depth } => {
                if speed != 0 {
                    let rate =
                        oscillator_rate(speed, clock.ticks_per_division, clock.samples_per_division);
                    self.vibrato.set_rate(rate);
                }
                if depth != 0 {
                    self.vibrato_depth = depth as f64 / 16.0;
                }
                self.vibrato.resolve(rng);
            }
            Effect::Tremolo { speed, depth } => {
                if speed != 0 {
                    let rate =
                        oscillator_rate(speed, clock.ticks_per_division, clock.samples_per_division);
                    self.tremolo.set_rate(rate);
                }
                if depth != 0 {
                    self.tremolo_depth = depth as f64 / 16.0;
                }
                self.tremolo.resolve(rng);
            }
            Effect::SampleOffset(param) => self.apply_sample_offset(song, param),
            Effect::PositionJump(entry) => response = NoteChangeEffect::JumpToPattern(entry),
            Effect::SetVolume(v) => self.vol64 = v.min(64),
            Effect::PatternBreak { tens, ones } => {
                response = NoteChangeEffect::BreakPattern(tens * 10 + ones)
            }
            Effect::SetSpeed(v) => response = NoteChangeEffect::from_speed(v),
            Effect::Extended(ext) => match ext {
                ExtendedEffect::FineSlideUp(x) if self.period != 0 => {
                    self.period = clamp_period(self.period as i32 - x as i32);
                }
                ExtendedEffect::FineSlideDown(x) if self.period != 0 => {
                    self.period = clamp_period(self.period as i32 + x as i32);
                }
                ExtendedEffect::SetGlissando(x) => self.glissando = x != 0,
                ExtendedEffect::SetVibratoWaveform(p) => self.vibrato.set_waveform(p),
                ExtendedEffect::SetTremoloWaveform(p) => self.tremolo.set_waveform(p),
                ExtendedEffect::SetFinetune(x) => self.finetune = Some(nibble_to_finetune(x)),
                ExtendedEffect::FineVolumeUp(x) => self.vol64 = (self.vol64 + x).min(64),
                ExtendedEffect::FineVolumeDown(x) => self.vol64 = self.vol64.saturating_sub(x),
                ExtendedEffect::CutSample(0) => self.vol64 = 0,
                ExtendedEffect::DelaySample(x) if x > 0 && triggered => {
                    self.streaming = false;
                    self.delayed_start = true;
                }
                ExtendedEffect::DelayPattern(x) => response = NoteChangeEffect::DelayPattern(x),
                _ => {}
            },
            _ => {}
        }

        self.update_gain();
        self.update_increment(song, clock.sample_rate);
        response
    }

    /// The sequencer is replaying the current division (pattern delay).
    pub fn on_division_repeat(&mut self) {
        self.cur_tick = 0;
    }

    /// Mix this voice's contribution for `out` into it.
    ///
    /// `clock.now` is the absolute frame of `out[0]`.
    pub fn accumulate(&mut self, song: &Song, out: &mut [f32], clock: &DivisionClock) {
        let mut frame = clock.now;
        let mut offset = 0;
        while offset < out.len() {
            let mut write = out.len() - offset;
            if self.effect.is_per_tick() {
                let (tick, next) = clock.tick_at(frame);
                let window = next.saturating_sub(frame).max(1) as usize;
                write = write.min(window);
                if tick != self.cur_tick {
                    self.apply_tick(tick, song, clock.sample_rate);
                    self.cur_tick = tick;
                }
            }
            if self.streaming {
                self.render(song, &mut out[offset..offset + write]);
            }
            offset += write;
            frame += write as u64;
        }
    }

    /// Reapply the running per-tick effect for a new tick.
    fn apply_tick(&mut self, tick: u32, song: &Song, sample_rate: u32) {
        match self.effect {
            Effect::SlideUp(speed) if self.period != 0 => {
                self.period = clamp_period(self.period as i32 - speed as i32);
                self.update_increment(song, sample_rate);
            }
            Effect::SlideDown(speed) if self.period != 0 => {
                self.period = clamp_period(self.period as i32 + speed as i32);
                self.update_increment(song, sample_rate);
            }
            Effect::SlideToNote(_) => {
                self.slide_to_note();
                self.update_increment(song, sample_rate);
            }
            Effect::ContinueSlide { up, down } => {
                self.slide_to_note();
                self.update_increment(song, sample_rate);
                self.volume_slide(up, down);
            }
            Effect::ContinueVibrato { up, down } | Effect::VolumeSlide { up, down } => {
                self.volume_slide(up, down);
            }
            Effect::Extended(ExtendedEffect::CutSample(x)) if tick >= x as u32 => {
                self.vol64 = 0;
                self.update_gain();
            }
            Effect::Extended(ExtendedEffect::DelaySample(x)) if self.delayed_start && tick == x as u32 => {
                self.delayed_start = false;
                self.streaming = self.current(song).is_some_and(|s| !s.is_empty());
            }
            Effect::Extended(ExtendedEffect::Retrigger(x)) if x > 0 && tick % x as u32 == 0 => {
                if let Some(sample) = self.current(song).filter(|s| !s.is_empty()) {
                    self.sample_end = sample.len() as u32;
                    self.position = 0.0;
                    self.streaming = true;
                }
            }
            _ => {}
        }
    }

    fn current<'a>(&self, song: &'a Song) -> Option<&'a Sample> {
        self.sample.and_then(|index| song.sample(index))
    }

    fn start_note(&mut self, index: u8, sample: &Sample) {
        self.sample = Some(index);
        self.streaming = !sample.is_empty();
        self.position = 0.0;
        self.sample_end = sample.len() as u32;
        self.holds = 0;
    }

    fn slide_to_note(&mut self) {
        if self.period == 0 || self.target_period == 0 {
            return;
        }
        let speed = self.slide_speed as u16;
        if self.period > self.target_period {
            self.period = self.period.saturating_sub(speed).max(self.target_period);
        } else if self.period < self.target_period {
            self.period = (self.period + speed).min(self.target_period);
        }
    }

    fn volume_slide(&mut self, up: u8, down: u8) {
        if up != 0 {
            self.vol64 = (self.vol64 + up).min(64);
        } else if down != 0 {
            self.vol64 = self.vol64.saturating_sub(down);
        }
        self.update_gain();
    }

    /// Start playback `param * 256` frames into the current sample.
    fn apply_sample_offset(&mut self, song: &Song, param: u8) {
        let Some(sample) = self.current(song).filter(|s| !s.is_empty()) else {
            return;
        };
        let offset = param as u32 * 256;
        let len = sample.len() as u32;
        if offset < len {
            self.position = offset as f64;
            self.sample_end = len;
            self.streaming = true;
        } else if sample.has_loop() {
            self.position = (sample.loop_start + (offset - len) % sample.loop_length) as f64;
            self.sample_end = sample.loop_end();
            self.streaming = true;
        } else {
            self.streaming = false;
        }
    }

    fn update_gain(&mut self) {
        self.gain = self.vol64 as f32 / 64.0;
        if matches!(self.effect, Effect::Extended(ExtendedEffect::InvertLoop(_))) {
            self.gain = -self.gain;
        }
    }

    fn update_increment(&mut self, song: &Song, sample_rate: u32) {
        let Some(sample) = self.current(song) else {
            self.increment = 0.0;
            return;
        };
        let finetune = self.finetune.unwrap_or(sample.finetune);
        let mut increment = period_to_increment(self.period, finetune, sample_rate);
        if let Effect::Arpeggio { x, y } = self.effect {
            let semitones = match self.holds % 3 {
                1 => x,
                2 => y,
                _ => 0,
            };
            if semitones != 0 {
                increment *= semitone_ratio(semitones as f64);
            }
        }
        self.increment = increment;
    }

    /// Resample and mix into `out`, stopping early if a non-looping sample ends.
    fn render(&mut self, song: &Song, out: &mut [f32]) {
        let Some(sample) = self.current(song) else {
            self.streaming = false;
            return;
        };
        let vibrato = matches!(self.effect, Effect::Vibrato { .. } | Effect::ContinueVibrato { .. });
        let tremolo = matches!(self.effect, Effect::Tremolo { .. });
        let last = sample.len().saturating_sub(1);

        for out_frame in out.iter_mut() {
            let i0 = self.position as usize;
            let mut i1 = i0 + 1;
            if i1 >= self.sample_end as usize {
                i1 = if sample.has_loop() { sample.loop_start as usize } else { last };
            }
            let frac = (self.position - i0 as f64) as f32;
            let s0 = sample.frame(i0);
            let s1 = sample.frame(i1);

            let mut gain = self.gain;
            if tremolo {
                let swing = (self.tremolo.value() * self.tremolo_depth) as f32;
                let magnitude = (libm::fabsf(gain) + swing).clamp(0.0, 1.0);
                gain = if gain < 0.0 { -magnitude } else { magnitude };
                self.tremolo.advance();
            }
            *out_frame += (s0 + (s1 - s0) * frac) * gain;

            let mut step = self.increment;
            if vibrato {
                step *= semitone_ratio(self.vibrato.value() * self.vibrato_depth);
                self.vibrato.advance();
            }
            self.position += step;

            if self.position >= self.sample_end as f64 {
                if sample.has_loop() {
                    let overshoot = self.position - self.sample_end as f64;
                    self.position = sample.loop_start as f64 + overshoot % sample.loop_length as f64;
                    self.sample_end = sample.loop_end();
                } else {
                    self.streaming = false;
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use mp_ir::Pattern;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    const RATE: u32 = 8287;

    fn clock() -> DivisionClock {
        DivisionClock {
            sample_rate: RATE,
            ticks_per_division: 6,
            samples_per_division: 600.0,
            start: 0,
            end: 600,
            now: 0,
        }
    }

    fn song_with(samples: alloc::vec::Vec<Sample>) -> Song {
        let mut song = Song::with_channels("t", 1);
        song.samples = samples;
        let p = song.add_pattern(Pattern::new(1));
        song.push_sequence(p);
        song
    }

    fn ramp_song() -> Song {
        let data = (0..1000).map(|i| (i % 100) as f32 / 100.0).collect();
        let mut sample = Sample::from_pcm("ramp", data);
        sample.default_volume = 48;
        song_with(alloc::vec![sample])
    }

    fn note(sample: Option<u8>, period: u16, effect: Effect) -> Division {
        Division { sample, period, effect }
    }

    fn dispatch(voice: &mut ChannelVoice, song: &Song, d: Division) -> NoteChangeEffect {
        let mut rng = Pcg32::seed_from_u64(0);
        voice.on_change_division(song, &d, &clock(), &mut rng)
    }

    #[test]
    fn trigger_starts_stream_at_default_volume() {
        let song = ramp_song();
        let mut v = ChannelVoice::new();
        dispatch(&mut v, &song, note(Some(0), 428, Effect::None));
        assert!(v.is_active());
        assert_eq!(v.volume(), 48);
        assert_eq!(v.period(), 428);
        assert_eq!(v.increment(), 1.0);
    }

    #[test]
    fn set_volume_overrides_default() {
        let song = ramp_song();
        let mut v = ChannelVoice::new();
        dispatch(&mut v, &song, note(Some(0), 428, Effect::SetVolume(20)));
        assert_eq!(v.volume(), 20);
        assert_relative_eq!(v.gain(), 20.0 / 64.0);

        dispatch(&mut v, &song, note(None, 0, Effect::SetVolume(200)));
        assert_eq!(v.volume(), 64);
    }

    #[test]
    fn empty_division_leaves_state_unchanged() {
        let song = ramp_song();
        let mut v = ChannelVoice::new();
        dispatch(&mut v, &song, note(Some(0), 320, Effect::SetVolume(33)));
        let before = (v.period(), v.volume(), v.is_active());
        for _ in 0..10 {
            dispatch(&mut v, &song, Division::empty());
            assert_eq!((v.period(), v.volume(), v.is_active()), before);
        }
    }

    #[test]
    fn period_without_sample_leaves_state_unchanged() {
        let song = song_with(alloc::vec![Sample::from_pcm("short", alloc::vec![0.5; 8])]);
        let mut v = ChannelVoice::new();
        dispatch(&mut v, &song, note(Some(0), 428, Effect::None));
        let mut out = [0.0f32; 16];
        v.accumulate(&song, &mut out, &clock());
        assert!(!v.is_active());

        let before = (v.period(), v.volume(), v.is_active(), v.position());
        dispatch(&mut v, &song, note(None, 214, Effect::None));
        assert_eq!((v.period(), v.volume(), v.is_active(), v.position()), before);
    }

    #[test]
    fn holds_count_every_division_without_a_trigger() {
        let song = ramp_song();
        let mut v = ChannelVoice::new();
        dispatch(&mut v, &song, note(Some(0), 428, Effect::None));
        let base = v.increment();
        dispatch(&mut v, &song, note(None, 214, Effect::Arpeggio { x: 12, y: 7 }));
        assert_relative_eq!(v.increment(), base * 2.0, epsilon = 1e-9);
        dispatch(&mut v, &song, note(None, 0, Effect::Arpeggio { x: 12, y: 7 }));
        assert_relative_eq!(v.increment(), base * semitone_ratio(7.0), epsilon = 1e-9);
    }

    #[test]
    fn out_of_range_sample_fails_closed() {
        let song = ramp_song();
        let mut v = ChannelVoice::new();
        dispatch(&mut v, &song, note(Some(0), 428, Effect::None));
        dispatch(&mut v, &song, note(Some(9), 428, Effect::None));
        assert!(!v.is_active());
        assert_eq!(v.sample(), None);
        let mut out = [0.0f32; 16];
        v.accumulate(&song, &mut out, &clock());
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn non_looping_sample_stops_at_end() {
        let song = song_with(alloc::vec![Sample::from_pcm("s", alloc::vec![1.0, 0.5, -0.5, -1.0])]);
        let mut v = ChannelVoice::new();
        dispatch(&mut v, &song, note(Some(0), 428, Effect::None));
        let mut out = [0.0f32; 6];
        v.accumulate(&song, &mut out, &clock());
        assert_eq!(out, [1.0, 0.5, -0.5, -1.0, 0.0, 0.0]);
        assert!(!v.is_active());
    }

    #[test]
    fn looping_sample_wraps_into_loop_region() {
        let mut sample = Sample::from_pcm("l", alloc::vec![0.1; 64]);
        sample.loop_start = 16;
        sample.loop_length = 32;
        let song = song_with(alloc::vec![sample]);
        let mut v = ChannelVoice::new();
        dispatch(&mut v, &song, note(Some(0), 113, Effect::None));

        let mut prev = v.position();
        let mut wrapped = false;
        for _ in 0..200 {
            let mut out = [0.0f32; 7];
            v.accumulate(&song, &mut out, &clock());
            assert!(v.is_active());
            let pos = v.position();
            if pos < prev {
                wrapped = true;
            }
            if wrapped {
                assert!((16.0..48.0).contains(&pos), "pos {}", pos);
            }
            prev = pos;
        }
        assert!(wrapped);
    }

    #[test]
    fn volume_slide_stays_in_range() {
        let song = ramp_song();
        let mut v = ChannelVoice::new();
        dispatch(&mut v, &song, note(Some(0), 428, Effect::VolumeSlide { up: 15, down: 0 }));
        for tick in 1..40 {
            v.apply_tick(tick, &song, RATE);
            assert!(v.volume() <= 64);
        }
        assert_eq!(v.volume(), 64);

        dispatch(&mut v, &song, note(None, 0, Effect::VolumeSlide { up: 0, down: 7 }));
        for tick in 1..40 {
            v.apply_tick(tick, &song, RATE);
        }
        assert_eq!(v.volume(), 0);
    }

    #[test]
    fn slides_clamp_to_period_range() {
        let song = ramp_song();
        let mut v = ChannelVoice::new();
        dispatch(&mut v, &song, note(Some(0), 130, Effect::SlideUp(0x20)));
        v.apply_tick(1, &song, RATE);
        assert_eq!(v.period(), 113);

        dispatch(&mut v, &song, note(Some(0), 800, Effect::SlideDown(0x40)));
        v.apply_tick(1, &song, RATE);
        assert_eq!(v.period(), 856);
        v.apply_tick(2, &song, RATE);
        assert_eq!(v.period(), 856);
    }

    #[test]
    fn slide_to_note_approaches_target_with_memory() {
        let song = ramp_song();
        let mut v = ChannelVoice::new();
        dispatch(&mut v, &song, note(Some(0), 428, Effect::None));
        dispatch(&mut v, &song, note(None, 400, Effect::SlideToNote(10)));
        assert_eq!(v.period(), 428);
        v.apply_tick(1, &song, RATE);
        assert_eq!(v.period(), 418);
        v.apply_tick(2, &song, RATE);
        v.apply_tick(3, &song, RATE);
        assert_eq!(v.period(), 400);

        // zero parameter reuses the remembered speed
        dispatch(&mut v, &song, note(None, 420, Effect::SlideToNote(0)));
        v.apply_tick(1, &song, RATE);
        assert_eq!(v.period(), 410);
    }

    #[test]
    fn fine_slides_act_once() {
        let song = ramp_song();
        let mut v = ChannelVoice::new();
        dispatch(&mut v, &song, note(Some(0), 300, Effect::Extended(ExtendedEffect::FineSlideUp(4))));
        assert_eq!(v.period(), 296);
        v.apply_tick(1, &song, RATE);
        assert_eq!(v.period(), 296);
        dispatch(&mut v, &song, note(None, 0, Effect::Extended(ExtendedEffect::FineVolumeDown(8))));
        assert_eq!(v.volume(), 40);
    }

    #[test]
    fn arpeggio_rotates_per_division() {
        let song = ramp_song();
        let mut v = ChannelVoice::new();
        let arp = Effect::Arpeggio { x: 12, y: 7 };
        dispatch(&mut v, &song, note(Some(0), 428, arp));
        assert_relative_eq!(v.increment(), 1.0);
        dispatch(&mut v, &song, note(None, 0, arp));
        assert_relative_eq!(v.increment(), 2.0, epsilon = 1e-12);
        dispatch(&mut v, &song, note(None, 0, arp));
        assert_relative_eq!(v.increment(), semitone_ratio(7.0), epsilon = 1e-12);
        dispatch(&mut v, &song, note(None, 0, arp));
        assert_relative_eq!(v.increment(), 1.0);
    }

    #[test]
    fn sample_offset_inside_and_past_end() {
        let mut looped = Sample::from_pcm("l", alloc::vec![0.0; 600]);
        looped.loop_start = 100;
        looped.loop_length = 200;
        let song = song_with(alloc::vec![Sample::from_pcm("s", alloc::vec![0.0; 600]), looped]);
        let mut v = ChannelVoice::new();

        dispatch(&mut v, &song, note(Some(0), 428, Effect::SampleOffset(2)));
        assert_eq!(v.position(), 512.0);
        assert!(v.is_active());

        dispatch(&mut v, &song, note(Some(0), 428, Effect::SampleOffset(3)));
        assert!(!v.is_active());

        // 768 - 600 = 168 past the end, 168 % 200 into the loop
        dispatch(&mut v, &song, note(Some(1), 428, Effect::SampleOffset(3)));
        assert!(v.is_active());
        assert_eq!(v.position(), 268.0);
    }

    #[test]
    fn cut_silences_from_tick() {
        let song = ramp_song();
        let mut v = ChannelVoice::new();
        dispatch(&mut v, &song, note(Some(0), 428, Effect::Extended(ExtendedEffect::CutSample(3))));
        v.apply_tick(2, &song, RATE);
        assert_eq!(v.volume(), 48);
        v.apply_tick(3, &song, RATE);
        assert_eq!(v.volume(), 0);

        dispatch(&mut v, &song, note(Some(0), 428, Effect::Extended(ExtendedEffect::CutSample(0))));
        assert_eq!(v.volume(), 0);
    }

    #[test]
    fn delay_holds_trigger_until_tick() {
        let song = ramp_song();
        let mut v = ChannelVoice::new();
        dispatch(&mut v, &song, note(Some(0), 428, Effect::Extended(ExtendedEffect::DelaySample(2))));
        assert!(!v.is_active());
        v.apply_tick(1, &song, RATE);
        assert!(!v.is_active());
        v.apply_tick(2, &song, RATE);
        assert!(v.is_active());
    }

    #[test]
    fn retrigger_restarts_on_multiples() {
        let song = ramp_song();
        let mut v = ChannelVoice::new();
        dispatch(&mut v, &song, note(Some(0), 428, Effect::Extended(ExtendedEffect::Retrigger(2))));
        let mut out = [0.0f32; 40];
        v.accumulate(&song, &mut out, &clock());
        v.apply_tick(1, &song, RATE);
        assert!(v.position() > 0.0);
        v.apply_tick(2, &song, RATE);
        assert_eq!(v.position(), 0.0);
    }

    #[test]
    fn tick_windows_split_the_division_evenly() {
        let c = DivisionClock { start: 1000, end: 1600, ..clock() };
        assert_eq!(c.tick_at(1000), (0, 1100));
        assert_eq!(c.tick_at(1099), (0, 1100));
        assert_eq!(c.tick_at(1100), (1, 1200));
        assert_eq!(c.tick_at(1599), (5, 1600));
    }

    #[test]
    fn accumulate_fires_ticks_inside_division() {
        let song = ramp_song();
        let mut v = ChannelVoice::new();
        dispatch(&mut v, &song, note(Some(0), 428, Effect::VolumeSlide { up: 0, down: 2 }));
        let mut out = alloc::vec![0.0f32; 600];
        v.accumulate(&song, &mut out, &clock());
        // ticks 1..=5 fire, tick 0 does not
        assert_eq!(v.volume(), 48 - 10);
    }

    #[test]
    fn flow_control_responses() {
        let song = ramp_song();
        let mut v = ChannelVoice::new();
        assert_eq!(
            dispatch(&mut v, &song, note(None, 0, Effect::PatternBreak { tens: 0, ones: 10 })),
            NoteChangeEffect::BreakPattern(10)
        );
        assert_eq!(
            dispatch(&mut v, &song, note(None, 0, Effect::PatternBreak { tens: 3, ones: 2 })),
            NoteChangeEffect::BreakPattern(32)
        );
        assert_eq!(
            dispatch(&mut v, &song, note(None, 0, Effect::PositionJump(4))),
            NoteChangeEffect::JumpToPattern(4)
        );
        assert_eq!(
            dispatch(&mut v, &song, note(None, 0, Effect::SetSpeed(0))),
            NoteChangeEffect::Stop
        );
        assert_eq!(
            dispatch(&mut v, &song, note(None, 0, Effect::Extended(ExtendedEffect::DelayPattern(2)))),
            NoteChangeEffect::DelayPattern(2)
        );
    }

    #[test]
    fn invert_loop_flips_gain_for_one_division() {
        let song = ramp_song();
        let mut v = ChannelVoice::new();
        dispatch(&mut v, &song, note(Some(0), 428, Effect::Extended(ExtendedEffect::InvertLoop(1))));
        assert!(v.gain() < 0.0);
        dispatch(&mut v, &song, Division::empty());
        assert!(v.gain() > 0.0);
    }

    #[test]
    fn finetune_override_lasts_until_next_trigger() {
        let song = ramp_song();
        let mut v = ChannelVoice::new();
        dispatch(&mut v, &song, note(Some(0), 428, Effect::Extended(ExtendedEffect::SetFinetune(7))));
        assert_relative_eq!(v.increment(), nibble_to_finetune(7), epsilon = 1e-12);
        dispatch(&mut v, &song, Division::empty());
        assert_relative_eq!(v.increment(), nibble_to_finetune(7), epsilon = 1e-12);
        dispatch(&mut v, &song, note(Some(0), 428, Effect::None));
        assert_relative_eq!(v.increment(), 1.0);
    }
}
