//! Real-time side of playback: the control queue, published telemetry and
//! the source the audio callback pulls from.

use mp_engine::{PlayMode, Sequencer};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Pending control requests the queue can hold.
pub(crate) const CONTROL_QUEUE_LEN: usize = 64;

/// A request from the controller thread, applied before the next render.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Control {
    SetTempo {
        bpm: Option<f32>,
        ticks_per_division: Option<u8>,
    },
    SetPlayMode(PlayMode),
    Restart,
}

pub(crate) fn control_queue() -> (HeapProd<Control>, HeapCons<Control>) {
    HeapRb::<Control>::new(CONTROL_QUEUE_LEN).split()
}

/// Push a request, reporting whether the queue had room.
pub(crate) fn send(producer: &mut HeapProd<Control>, control: Control) -> bool {
    producer.try_push(control).is_ok()
}

/// Playback state written by the audio thread and read by anyone.
#[derive(Debug, Default)]
pub(crate) struct Telemetry {
    pub samples_in_song: AtomicU64,
    pub sequence: AtomicUsize,
    pub division: AtomicUsize,
    /// BPM as `f32` bits
    pub bpm: AtomicU32,
    pub ticks_per_division: AtomicU32,
    pub stopped: AtomicBool,
}

impl Telemetry {
    fn publish(&self, seq: &Sequencer) {
        let pos = seq.position();
        self.samples_in_song.store(pos.samples_in_song, Ordering::Relaxed);
        self.sequence.store(pos.sequence, Ordering::Relaxed);
        self.division.store(pos.division, Ordering::Relaxed);
        self.bpm.store(seq.bpm().to_bits(), Ordering::Relaxed);
        self.ticks_per_division
            .store(seq.ticks_per_division() as u32, Ordering::Relaxed);
        self.stopped.store(seq.is_stopped(), Ordering::Relaxed);
    }

    pub fn bpm(&self) -> f32 {
        f32::from_bits(self.bpm.load(Ordering::Relaxed))
    }
}

/// Owns the sequencer on the audio thread.
pub(crate) struct PlaybackSource {
    sequencer: Sequencer,
    controls: HeapCons<Control>,
    telemetry: Arc<Telemetry>,
}

impl PlaybackSource {
    pub fn new(sequencer: Sequencer, controls: HeapCons<Control>, telemetry: Arc<Telemetry>) -> Self {
        telemetry.publish(&sequencer);
        Self {
            sequencer,
            controls,
            telemetry,
        }
    }

    /// Apply queued requests, then fill `out`.
    pub fn render(&mut self, out: &mut [f32]) {
        #[cfg(feature = "alloc_check")]
        assert_no_alloc::assert_no_alloc(|| self.render_inner(out));
        #[cfg(not(feature = "alloc_check"))]
        self.render_inner(out);
    }

    fn render_inner(&mut self, out: &mut [f32]) {
        while let Some(control) = self.controls.try_pop() {
            match control {
                Control::SetTempo {
                    bpm,
                    ticks_per_division,
                } => self.sequencer.set_tempo(bpm, ticks_per_division),
                Control::SetPlayMode(mode) => self.sequencer.set_play_mode(mode),
                Control::Restart => self.sequencer.restart(),
            }
        }
        self.sequencer.generate(out);
        self.telemetry.publish(&self.sequencer);
    }
}
