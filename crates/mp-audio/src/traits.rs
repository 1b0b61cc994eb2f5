//! Audio output traits and error types.

/// Error type for audio operations.
#[derive(Debug)]
pub enum AudioError {
    /// Failed to initialize audio device
    DeviceInit(String),
    /// Failed to create audio stream
    StreamCreate(String),
    /// Playback error
    Playback(String),
    /// No audio device available
    NoDevice,
    /// `start` called before a stream was built
    NoStream,
}

impl std::fmt::Display for AudioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioError::DeviceInit(msg) => write!(f, "Device init error: {}", msg),
            AudioError::StreamCreate(msg) => write!(f, "Stream create error: {}", msg),
            AudioError::Playback(msg) => write!(f, "Playback error: {}", msg),
            AudioError::NoDevice => write!(f, "No audio device available"),
            AudioError::NoStream => write!(f, "No audio stream has been built"),
        }
    }
}

impl std::error::Error for AudioError {}

/// Something that produces mono PCM on demand.
///
/// `render` runs on the device's real-time thread: it must fill `out`
/// completely and must not block or allocate.
pub trait PcmSource: Send + 'static {
    fn render(&mut self, out: &mut [f32]);
}

impl<F> PcmSource for F
where
    F: FnMut(&mut [f32]) + Send + 'static,
{
    fn render(&mut self, out: &mut [f32]) {
        self(out)
    }
}

/// Trait for audio output backends.
pub trait AudioOutput {
    /// Get the sample rate.
    fn sample_rate(&self) -> u32;

    /// Start playback.
    fn start(&mut self) -> Result<(), AudioError>;

    /// Stop playback. The stream outputs silence until started again.
    fn stop(&mut self) -> Result<(), AudioError>;
}
