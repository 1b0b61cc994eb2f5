//! Headless controller for the modplay tracker player.
//!
//! Owns a loaded song and offers real-time playback through the default
//! audio device, offline rendering and WAV export.

mod control;
mod wav;

use control::{Control, PlaybackSource, Telemetry};
use mp_audio::{AudioError, AudioOutput, CpalOutput};
use ringbuf::HeapProd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

// Re-export common types so callers don't need mp-ir/mp-engine directly.
pub use mp_engine::{EngineError, PlayMode, Position, Sequencer, DEFAULT_BPM, DEFAULT_SEED};
pub use mp_formats::{FormatError, Layout, LoadOptions, LoadReport};
pub use mp_ir::Song;

pub use wav::{samples_to_wav, to_i16, write_wav};

/// Rate used for offline rendering when none is given.
pub const DEFAULT_RENDER_RATE: u32 = 44100;

/// How a song should be played.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaybackConfig {
    /// Output rate; `None` uses the device rate (or 44100 Hz offline)
    pub sample_rate: Option<u32>,
    pub mode: PlayMode,
    pub bpm: f32,
    /// Seed for the random oscillator waveform
    pub seed: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            sample_rate: None,
            mode: PlayMode::Loop,
            bpm: DEFAULT_BPM,
            seed: DEFAULT_SEED,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlayError {
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("audio thread exited before playback started")]
    ThreadExited,
}

/// Headless tracker controller: owns a song and manages playback.
pub struct Controller {
    song: Song,
    report: Option<LoadReport>,
    playback: Option<PlaybackHandle>,
}

struct PlaybackHandle {
    stop_signal: Arc<AtomicBool>,
    telemetry: Arc<Telemetry>,
    controls: HeapProd<Control>,
    sample_rate: u32,
    thread: Option<JoinHandle<()>>,
}

impl Controller {
    pub fn new() -> Self {
        Self {
            song: Song::with_channels("Untitled", 4),
            report: None,
            playback: None,
        }
    }

    // --- Song management ---

    pub fn song(&self) -> &Song {
        &self.song
    }

    /// Diagnostics from the last successful load.
    pub fn load_report(&self) -> Option<&LoadReport> {
        self.report.as_ref()
    }

    pub fn load_mod(&mut self, data: &[u8]) -> Result<(), FormatError> {
        self.load_mod_with(data, &LoadOptions::default())
    }

    pub fn load_mod_with(&mut self, data: &[u8], options: &LoadOptions) -> Result<(), FormatError> {
        self.stop();
        let (song, report) = mp_formats::load_mod_with(data, options)?;
        tracing::info!(
            title = %song.title,
            channels = song.channels,
            patterns = song.patterns.len(),
            sequence = song.sequence.len(),
            "loaded module"
        );
        self.song = song;
        self.report = Some(report);
        Ok(())
    }

    // --- Real-time playback ---

    /// Start playing the song on the default output device.
    ///
    /// Returns once the stream is running. Any previous playback is stopped.
    pub fn play(&mut self, config: PlaybackConfig) -> Result<(), PlayError> {
        self.stop();

        let song = self.song.clone();
        let stop_signal = Arc::new(AtomicBool::new(false));
        let telemetry = Arc::new(Telemetry::default());
        let (producer, consumer) = control::control_queue();
        let (ready_tx, ready_rx) = mpsc::channel();

        let stop = stop_signal.clone();
        let shared = telemetry.clone();
        let thread = std::thread::spawn(move || {
            audio_thread(song, config, consumer, shared, stop, ready_tx);
        });

        let sample_rate = match ready_rx.recv() {
            Ok(Ok(rate)) => rate,
            Ok(Err(err)) => {
                let _ = thread.join();
                return Err(err);
            }
            Err(_) => {
                let _ = thread.join();
                return Err(PlayError::ThreadExited);
            }
        };
        tracing::info!(sample_rate, mode = ?config.mode, "playback started");

        self.playback = Some(PlaybackHandle {
            stop_signal,
            telemetry,
            controls: producer,
            sample_rate,
            thread: Some(thread),
        });
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(mut pb) = self.playback.take() {
            pb.stop_signal.store(true, Ordering::Relaxed);
            if let Some(handle) = pb.thread.take() {
                let _ = handle.join();
            }
            tracing::info!("playback stopped");
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playback
            .as_ref()
            .is_some_and(|p| !p.telemetry.stopped.load(Ordering::Relaxed))
    }

    /// True once the song has reached its end (or a stop effect).
    pub fn is_finished(&self) -> bool {
        self.playback
            .as_ref()
            .is_some_and(|p| p.telemetry.stopped.load(Ordering::Relaxed))
    }

    /// Device rate of the running playback.
    pub fn sample_rate(&self) -> Option<u32> {
        self.playback.as_ref().map(|p| p.sample_rate)
    }

    /// Position last published by the audio thread.
    pub fn position(&self) -> Option<Position> {
        let t = &self.playback.as_ref()?.telemetry;
        let sequence = t.sequence.load(Ordering::Relaxed);
        Some(Position {
            sequence,
            pattern: self.song.sequence.get(sequence).copied(),
            division: t.division.load(Ordering::Relaxed),
            samples_in_song: t.samples_in_song.load(Ordering::Relaxed),
        })
    }

    /// Current tempo as (BPM, ticks per division).
    pub fn tempo(&self) -> Option<(f32, u8)> {
        let t = &self.playback.as_ref()?.telemetry;
        Some((t.bpm(), t.ticks_per_division.load(Ordering::Relaxed) as u8))
    }

    /// Queue a tempo change. Returns false if nothing is playing or the
    /// queue is full.
    pub fn set_tempo(&mut self, bpm: Option<f32>, ticks_per_division: Option<u8>) -> bool {
        self.send(Control::SetTempo {
            bpm,
            ticks_per_division,
        })
    }

    pub fn set_play_mode(&mut self, mode: PlayMode) -> bool {
        self.send(Control::SetPlayMode(mode))
    }

    /// Rewind to the top of the song, resuming if it had stopped.
    pub fn restart(&mut self) -> bool {
        self.send(Control::Restart)
    }

    fn send(&mut self, request: Control) -> bool {
        match self.playback.as_mut() {
            Some(pb) => control::send(&mut pb.controls, request),
            None => false,
        }
    }

    // --- Offline rendering ---

    /// Render mono frames until the song stops or `max_frames` is reached.
    pub fn render_frames(
        &self,
        config: &PlaybackConfig,
        max_frames: usize,
    ) -> Result<Vec<f32>, EngineError> {
        let rate = config.sample_rate.unwrap_or(DEFAULT_RENDER_RATE);
        let mut seq = Sequencer::with_seed(self.song.clone(), rate, config.mode, config.bpm, config.seed)?;
        Ok(render_sequencer(&mut seq, max_frames))
    }

    pub fn render_to_wav(&self, config: &PlaybackConfig, max_seconds: u32) -> Result<Vec<u8>, EngineError> {
        let rate = config.sample_rate.unwrap_or(DEFAULT_RENDER_RATE);
        let max_frames = rate as usize * max_seconds as usize;
        let samples = self.render_frames(config, max_frames)?;
        Ok(wav::samples_to_wav(&samples, rate))
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop();
    }
}

const RENDER_BLOCK: usize = 1024;

/// Pull blocks from `seq`, cutting the output where the song stopped.
fn render_sequencer(seq: &mut Sequencer, max_frames: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; max_frames];
    let mut written = 0;
    while written < max_frames && !seq.is_stopped() {
        let end = (written + RENDER_BLOCK).min(max_frames);
        let before = seq.position().samples_in_song;
        seq.generate(&mut out[written..end]);
        if seq.is_stopped() {
            let played = seq.position().samples_in_song.saturating_sub(before) as usize;
            written += played.min(end - written);
            break;
        }
        written = end;
    }
    out.truncate(written);
    out
}

fn audio_thread(
    song: Song,
    config: PlaybackConfig,
    controls: ringbuf::HeapCons<Control>,
    telemetry: Arc<Telemetry>,
    stop_signal: Arc<AtomicBool>,
    ready: mpsc::Sender<Result<u32, PlayError>>,
) {
    let started = (|| -> Result<CpalOutput, PlayError> {
        let mut output = CpalOutput::open(config.sample_rate)?;
        let rate = output.sample_rate();
        let seq = Sequencer::with_seed(song, rate, config.mode, config.bpm, config.seed)?;
        let mut source = PlaybackSource::new(seq, controls, telemetry);
        output.build_stream(move |out: &mut [f32]| source.render(out))?;
        output.start()?;
        Ok(output)
    })();

    let mut output = match started {
        Ok(output) => output,
        Err(err) => {
            tracing::error!(%err, "could not start playback");
            let _ = ready.send(Err(err));
            return;
        }
    };
    let _ = ready.send(Ok(output.sample_rate()));

    while !stop_signal.load(Ordering::Relaxed) {
        std::thread::sleep(Duration::from_millis(10));
    }

    if let Err(err) = output.stop() {
        tracing::warn!(%err, "failed to pause stream");
    }
}
