//! Effect command types for tracker divisions.
//!
//! The file packs an effect as a 12-bit command: a 4-bit opcode followed by
//! two 4-bit parameters. Opcode 0xE uses its first parameter as a sub-opcode;
//! that group is resolved into [`ExtendedEffect`] here so nothing downstream
//! has to look at nibbles again.

/// Extended effect group (opcode 0xE), keyed by the first parameter nibble.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtendedEffect {
    /// E0x: hardware filter on/off (no audible effect)
    SetFilter(u8),
    /// E1x: lower the period by x, once
    FineSlideUp(u8),
    /// E2x: raise the period by x, once
    FineSlideDown(u8),
    /// E3x: glissando control
    SetGlissando(u8),
    /// E4x: vibrato waveform (0-3), +4 = keep phase on new note
    SetVibratoWaveform(u8),
    /// E5x: finetune nibble for the playing note
    SetFinetune(u8),
    /// E6x: pattern loop (no audible effect)
    LoopPattern(u8),
    /// E7x: tremolo waveform (0-3), +4 = keep phase on new note
    SetTremoloWaveform(u8),
    /// E8x: unassigned
    Unused(u8),
    /// E9x: restart the sample every x ticks
    Retrigger(u8),
    /// EAx: raise the volume by x, once
    FineVolumeUp(u8),
    /// EBx: lower the volume by x, once
    FineVolumeDown(u8),
    /// ECx: silence the channel at tick x
    CutSample(u8),
    /// EDx: start the triggered sample at tick x
    DelaySample(u8),
    /// EEx: repeat the division x more times
    DelayPattern(u8),
    /// EFx: invert loop
    InvertLoop(u8),
}

impl ExtendedEffect {
    fn from_nibbles(sub: u8, val: u8) -> Self {
        match sub & 0x0F {
            0x0 => ExtendedEffect::SetFilter(val),
            0x1 => ExtendedEffect::FineSlideUp(val),
            0x2 => ExtendedEffect::FineSlideDown(val),
            0x3 => ExtendedEffect::SetGlissando(val),
            0x4 => ExtendedEffect::SetVibratoWaveform(val),
            0x5 => ExtendedEffect::SetFinetune(val),
            0x6 => ExtendedEffect::LoopPattern(val),
            0x7 => ExtendedEffect::SetTremoloWaveform(val),
            0x8 => ExtendedEffect::Unused(val),
            0x9 => ExtendedEffect::Retrigger(val),
            0xA => ExtendedEffect::FineVolumeUp(val),
            0xB => ExtendedEffect::FineVolumeDown(val),
            0xC => ExtendedEffect::CutSample(val),
            0xD => ExtendedEffect::DelaySample(val),
            0xE => ExtendedEffect::DelayPattern(val),
            _ => ExtendedEffect::InvertLoop(val),
        }
    }

    /// The (sub-opcode, value) nibble pair.
    fn nibbles(&self) -> (u8, u8) {
        match *self {
            ExtendedEffect::SetFilter(v) => (0x0, v),
            ExtendedEffect::FineSlideUp(v) => (0x1, v),
            ExtendedEffect::FineSlideDown(v) => (0x2, v),
            ExtendedEffect::SetGlissando(v) => (0x3, v),
            ExtendedEffect::SetVibratoWaveform(v) => (0x4, v),
            ExtendedEffect::SetFinetune(v) => (0x5, v),
            ExtendedEffect::LoopPattern(v) => (0x6, v),
            ExtendedEffect::SetTremoloWaveform(v) => (0x7, v),
            ExtendedEffect::Unused(v) => (0x8, v),
            ExtendedEffect::Retrigger(v) => (0x9, v),
            ExtendedEffect::FineVolumeUp(v) => (0xA, v),
            ExtendedEffect::FineVolumeDown(v) => (0xB, v),
            ExtendedEffect::CutSample(v) => (0xC, v),
            ExtendedEffect::DelaySample(v) => (0xD, v),
            ExtendedEffect::DelayPattern(v) => (0xE, v),
            ExtendedEffect::InvertLoop(v) => (0xF, v),
        }
    }

    /// Returns the variant name as a static string (ignoring parameters).
    pub fn name(&self) -> &'static str {
        match self {
            ExtendedEffect::SetFilter(_) => "SetFilter",
            ExtendedEffect::FineSlideUp(_) => "FineSlideUp",
            ExtendedEffect::FineSlideDown(_) => "FineSlideDown",
            ExtendedEffect::SetGlissando(_) => "SetGlissando",
            ExtendedEffect::SetVibratoWaveform(_) => "SetVibratoWaveform",
            ExtendedEffect::SetFinetune(_) => "SetFinetune",
            ExtendedEffect::LoopPattern(_) => "LoopPattern",
            ExtendedEffect::SetTremoloWaveform(_) => "SetTremoloWaveform",
            ExtendedEffect::Unused(_) => "Unused",
            ExtendedEffect::Retrigger(_) => "Retrigger",
            ExtendedEffect::FineVolumeUp(_) => "FineVolumeUp",
            ExtendedEffect::FineVolumeDown(_) => "FineVolumeDown",
            ExtendedEffect::CutSample(_) => "CutSample",
            ExtendedEffect::DelaySample(_) => "DelaySample",
            ExtendedEffect::DelayPattern(_) => "DelayPattern",
            ExtendedEffect::InvertLoop(_) => "InvertLoop",
        }
    }
}

/// Effect column command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Effect {
    #[default]
    None,

    /// 0xy: rotate between the note, +x and +y semitones
    Arpeggio { x: u8, y: u8 },
    /// 1xx: lower the period by xx every tick
    SlideUp(u8),
    /// 2xx: raise the period by xx every tick
    SlideDown(u8),
    /// 3xx: slide toward the division's period by xx every tick
    SlideToNote(u8),
    /// 4xy: pitch oscillation
    Vibrato { speed: u8, depth: u8 },
    /// 5xy: keep sliding to the note while sliding the volume
    ContinueSlide { up: u8, down: u8 },
    /// 6xy: keep the vibrato running while sliding the volume
    ContinueVibrato { up: u8, down: u8 },
    /// 7xy: volume oscillation
    Tremolo { speed: u8, depth: u8 },
    /// 8xx: panning (mono output, ignored)
    SetPan(u8),
    /// 9xy: start the sample at (x*4096 + y*256) frames
    SampleOffset(u8),
    /// Axy: volume up by x or down by y every tick
    VolumeSlide { up: u8, down: u8 },
    /// Bxx: continue at sequence entry xx
    PositionJump(u8),
    /// Cxx: set volume (0-64)
    SetVolume(u8),
    /// Dxy: continue at division x*10+y of the next sequence entry
    PatternBreak { tens: u8, ones: u8 },
    /// Exy: extended group
    Extended(ExtendedEffect),
    /// Fxx: ticks per division (<= 32) or BPM (> 32)
    SetSpeed(u8),
}

impl Effect {
    /// Decode a packed 12-bit effect command.
    pub fn from_command(command: u16) -> Self {
        let opcode = ((command >> 8) & 0x0F) as u8;
        let param = (command & 0xFF) as u8;
        let x = param >> 4;
        let y = param & 0x0F;

        match opcode {
            0x0 if param == 0 => Effect::None,
            0x0 => Effect::Arpeggio { x, y },
            0x1 => Effect::SlideUp(param),
            0x2 => Effect::SlideDown(param),
            0x3 => Effect::SlideToNote(param),
            0x4 => Effect::Vibrato { speed: x, depth: y },
            0x5 => Effect::ContinueSlide { up: x, down: y },
            0x6 => Effect::ContinueVibrato { up: x, down: y },
            0x7 => Effect::Tremolo { speed: x, depth: y },
            0x8 => Effect::SetPan(param),
            0x9 => Effect::SampleOffset(param),
            0xA => Effect::VolumeSlide { up: x, down: y },
            0xB => Effect::PositionJump(param),
            0xC => Effect::SetVolume(param),
            0xD => Effect::PatternBreak { tens: x, ones: y },
            0xE => Effect::Extended(ExtendedEffect::from_nibbles(x, y)),
            _ => Effect::SetSpeed(param),
        }
    }

    /// Pack back into the 12-bit command layout.
    pub fn command(&self) -> u16 {
        let (opcode, param): (u16, u8) = match *self {
            Effect::None => (0x0, 0),
            Effect::Arpeggio { x, y } => (0x0, pack(x, y)),
            Effect::SlideUp(v) => (0x1, v),
            Effect::SlideDown(v) => (0x2, v),
            Effect::SlideToNote(v) => (0x3, v),
            Effect::Vibrato { speed, depth } => (0x4, pack(speed, depth)),
            Effect::ContinueSlide { up, down } => (0x5, pack(up, down)),
            Effect::ContinueVibrato { up, down } => (0x6, pack(up, down)),
            Effect::Tremolo { speed, depth } => (0x7, pack(speed, depth)),
            Effect::SetPan(v) => (0x8, v),
            Effect::SampleOffset(v) => (0x9, v),
            Effect::VolumeSlide { up, down } => (0xA, pack(up, down)),
            Effect::PositionJump(v) => (0xB, v),
            Effect::SetVolume(v) => (0xC, v),
            Effect::PatternBreak { tens, ones } => (0xD, pack(tens, ones)),
            Effect::Extended(ext) => {
                let (sub, val) = ext.nibbles();
                (0xE, pack(sub, val))
            }
            Effect::SetSpeed(v) => (0xF, v),
        };
        (opcode << 8) | param as u16
    }

    /// Returns the variant name as a static string (ignoring parameters).
    pub fn name(&self) -> &'static str {
        match self {
            Effect::None => "None",
            Effect::Arpeggio { .. } => "Arpeggio",
            Effect::SlideUp(_) => "SlideUp",
            Effect::SlideDown(_) => "SlideDown",
            Effect::SlideToNote(_) => "SlideToNote",
            Effect::Vibrato { .. } => "Vibrato",
            Effect::ContinueSlide { .. } => "ContinueSlide",
            Effect::ContinueVibrato { .. } => "ContinueVibrato",
            Effect::Tremolo { .. } => "Tremolo",
            Effect::SetPan(_) => "SetPan",
            Effect::SampleOffset(_) => "SampleOffset",
            Effect::VolumeSlide { .. } => "VolumeSlide",
            Effect::PositionJump(_) => "PositionJump",
            Effect::SetVolume(_) => "SetVolume",
            Effect::PatternBreak { .. } => "PatternBreak",
            Effect::Extended(ext) => ext.name(),
            Effect::SetSpeed(_) => "SetSpeed",
        }
    }

    /// Returns true if this effect is re-evaluated on tick boundaries
    /// inside the division rather than only at its start.
    pub fn is_per_tick(&self) -> bool {
        matches!(
            self,
            Effect::SlideUp(_)
                | Effect::SlideDown(_)
                | Effect::SlideToNote(_)
                | Effect::Vibrato { .. }
                | Effect::ContinueSlide { .. }
                | Effect::ContinueVibrato { .. }
                | Effect::Tremolo { .. }
                | Effect::VolumeSlide { .. }
                | Effect::Extended(
                    ExtendedEffect::Retrigger(_)
                        | ExtendedEffect::CutSample(_)
                        | ExtendedEffect::DelaySample(_)
                )
        )
    }

    /// Returns true for the slide-to-note family, which must not snap the
    /// period to the division's note.
    pub fn is_slide_to_note(&self) -> bool {
        matches!(self, Effect::SlideToNote(_) | Effect::ContinueSlide { .. })
    }
}

fn pack(hi: u8, lo: u8) -> u8 {
    ((hi & 0x0F) << 4) | (lo & 0x0F)
}
