//! CPAL-based audio output backend.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::traits::{AudioError, AudioOutput, PcmSource};

/// Mono frames rendered per pass inside the device callback.
const SCRATCH_FRAMES: usize = 4096;

/// CPAL-based audio output.
pub struct CpalOutput {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    running: Arc<AtomicBool>,
}

impl CpalOutput {
    /// Open the default output device at its default configuration.
    pub fn new() -> Result<Self, AudioError> {
        Self::open(None)
    }

    /// Open the default output device, asking for `sample_rate` if given.
    pub fn open(sample_rate: Option<u32>) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        let config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?;

        let mut config: StreamConfig = config.into();
        if let Some(rate) = sample_rate {
            config.sample_rate = cpal::SampleRate(rate);
        }
        tracing::debug!(
            device = %device.name().unwrap_or_default(),
            rate = config.sample_rate.0,
            channels = config.channels,
            "opened output device"
        );

        Ok(Self {
            device,
            config,
            stream: None,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Device channel count. The mono source is copied to each.
    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    /// Build the stream, pulling audio from `source` in the device callback.
    pub fn build_stream<S: PcmSource>(&mut self, mut source: S) -> Result<(), AudioError> {
        let running = self.running.clone();
        let channels = self.config.channels.max(1) as usize;
        let mut scratch = vec![0.0f32; SCRATCH_FRAMES];

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if !running.load(Ordering::Relaxed) {
                        data.fill(0.0);
                        return;
                    }

                    for block in data.chunks_mut(SCRATCH_FRAMES * channels) {
                        let frames = block.len() / channels;
                        let mono = &mut scratch[..frames];
                        source.render(mono);
                        for (chunk, &sample) in block.chunks_mut(channels).zip(mono.iter()) {
                            chunk.fill(sample);
                        }
                    }
                },
                |err| tracing::error!(%err, "audio stream error"),
                None,
            )
            .map_err(|e| AudioError::StreamCreate(e.to_string()))?;

        self.stream = Some(stream);
        Ok(())
    }
}

impl AudioOutput for CpalOutput {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    fn start(&mut self) -> Result<(), AudioError> {
        let stream = self.stream.as_ref().ok_or(AudioError::NoStream)?;
        self.running.store(true, Ordering::Relaxed);
        stream.play().map_err(|e| AudioError::Playback(e.to_string()))
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.running.store(false, Ordering::Relaxed);
        if let Some(ref stream) = self.stream {
            stream.pause().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }
}
