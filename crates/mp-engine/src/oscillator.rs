//! Low-frequency oscillators for vibrato and tremolo.

use rand::Rng;

const TAU: f64 = core::f64::consts::PI * 2.0;

/// Waveform selected by the set-waveform effects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Waveform {
    #[default]
    Sine,
    RampDown,
    Square,
    /// One of the other three, drawn when the effect starts
    Random,
}

impl Waveform {
    /// Decode a set-waveform parameter.
    ///
    /// The low two bits pick the shape; bit 2 set means the phase is kept
    /// when a new note starts.
    pub fn from_param(param: u8) -> (Waveform, bool) {
        let form = match param & 0x03 {
            0 => Waveform::Sine,
            1 => Waveform::RampDown,
            2 => Waveform::Square,
            _ => Waveform::Random,
        };
        (form, param & 0x04 == 0)
    }
}

/// Oscillator state: selected waveform, the concrete shape in use,
/// phase (in cycles) and rate (cycles per output frame).
#[derive(Clone, Debug)]
pub struct Oscillator {
    waveform: Waveform,
    shape: Waveform,
    retrigger: bool,
    phase: f64,
    rate: f64,
}

impl Default for Oscillator {
    fn default() -> Self {
        Self {
            waveform: Waveform::Sine,
            shape: Waveform::Sine,
            retrigger: true,
            phase: 0.0,
            rate: 0.0,
        }
    }
}

impl Oscillator {
    /// Apply a set-waveform parameter.
    pub fn set_waveform(&mut self, param: u8) {
        let (form, retrigger) = Waveform::from_param(param);
        self.waveform = form;
        self.retrigger = retrigger;
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Concrete shape used for output. Never `Random`.
    pub fn shape(&self) -> Waveform {
        self.shape
    }

    pub fn set_rate(&mut self, rate: f64) {
        self.rate = rate;
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Fix the shape for the coming division, drawing one if `Random`.
    pub fn resolve<R: Rng>(&mut self, rng: &mut R) {
        self.shape = match self.waveform {
            Waveform::Random => match rng.gen_range(0..3) {
                0 => Waveform::Sine,
                1 => Waveform::Square,
                _ => Waveform::RampDown,
            },
            form => form,
        };
    }

    /// A new note started on the channel.
    pub fn on_new_note(&mut self) {
        if self.retrigger {
            self.phase = 0.0;
        }
    }

    /// Current output in [-1, 1].
    pub fn value(&self) -> f64 {
        let frac = self.phase - libm::floor(self.phase);
        match self.shape {
            Waveform::Sine => libm::sin(self.phase * TAU),
            Waveform::RampDown => 1.0 - frac * 2.0,
            Waveform::Square => {
                if frac > 0.5 {
                    -1.0
                } else {
                    1.0
                }
            }
            Waveform::Random => 0.0,
        }
    }

    /// Step one output frame.
    pub fn advance(&mut self) {
        self.phase += self.rate;
        if self.phase >= 1.0 {
            self.phase -= libm::floor(self.phase);
        }
    }
}

/// Oscillator rate in cycles per output frame for an effect speed.
///
/// One full cycle at speed 1 spans 64 ticks.
pub fn oscillator_rate(speed: u8, ticks_per_division: u8, samples_per_division: f64) -> f64 {
    if samples_per_division <= 0.0 {
        return 0.0;
    }
    speed as f64 * ticks_per_division as f64 / 64.0 / samples_per_division
}
