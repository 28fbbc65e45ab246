//! Hardware audio input boundary
//!
//! The capture loop only talks to audio hardware through these two traits,
//! so the loop can be driven by cpal in the application and by a scripted
//! backend in tests.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that end a capture attempt
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("Buffer error: no valid capture buffer size at {sample_rate} Hz")]
    BufferSizingUnsupported { sample_rate: u32 },

    #[error("Initialization error: {0}")]
    HandleInitializationFailed(String),

    #[error("Stream fault: {0}")]
    StreamFault(String),

    #[error("Failed to spawn capture thread: {0}")]
    ThreadSpawn(String),
}

impl CaptureError {
    /// Whether the UI should interrupt the user with a modal alert
    pub fn is_alert(&self) -> bool {
        !matches!(self, Self::StreamFault(_))
    }
}

/// Which input device to capture from
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InputSource {
    #[default]
    Default,
    Named(String),
}

impl InputSource {
    pub fn name(&self) -> &str {
        match self {
            Self::Default => "Default",
            Self::Named(name) => name,
        }
    }
}

/// Initialization state reported by a freshly acquired handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Uninitialized,
    Initialized,
}

/// Platform audio input.
///
/// Shared with the capture thread, hence `Send + Sync`.
pub trait AudioBackend: Send + Sync {
    /// Preferred sample rate of the default output device, reused for input
    fn preferred_sample_rate(&self) -> u32;

    /// Minimum capture buffer size in bytes for 16-bit mono at `sample_rate`.
    ///
    /// `None` means the platform cannot capture at that rate.
    fn min_buffer_size(&self, source: &InputSource, sample_rate: u32) -> Option<usize>;

    /// Open the exclusive input handle.
    ///
    /// Called on the capture thread; the handle never leaves it.
    fn acquire(
        &self,
        source: &InputSource,
        sample_rate: u32,
        buffer_size: usize,
    ) -> Result<Box<dyn InputHandle>, CaptureError>;

    /// Names of the available input devices
    fn input_devices(&self) -> Vec<String>;
}

/// An open hardware input handle
pub trait InputHandle {
    fn state(&self) -> HandleState;

    fn is_recording(&self) -> bool;

    fn start(&mut self) -> Result<(), CaptureError>;

    /// Block until samples are available and copy up to `buf.len()` of them.
    ///
    /// `Ok(0)` or an error is a terminal fault for the stream.
    fn read(&mut self, buf: &mut [i16]) -> Result<usize, CaptureError>;

    fn stop(&mut self);

    /// Release the handle. Must be safe to call more than once.
    fn release(&mut self);
}
