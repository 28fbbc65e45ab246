//! Audio module - handles audio capture and sample buffering
//!
//! This module provides:
//! - The hardware input boundary and its cpal implementation
//! - The capture loop that owns the input handle
//! - The sample ring shared with the display

mod buffer;
mod capture;
mod cpal_input;
mod device;

pub use buffer::{SampleRing, RING_CAPACITY};
pub use capture::CaptureLoop;
pub use cpal_input::CpalBackend;
pub use device::{CaptureError, InputSource};
