//! cpal implementation of the hardware input boundary
//!
//! cpal delivers audio through a callback on its own thread. The callback
//! folds each frame down to one 16-bit channel and pushes it into a lock-free
//! SPSC ring; `read` drains that ring from the capture thread, blocking until
//! a full request has arrived.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use ringbuf::{
    traits::{Consumer, Producer, Split},
    HeapRb,
};

use super::buffer::FRAME_SIZE;
use super::device::{AudioBackend, CaptureError, HandleState, InputHandle, InputSource};

/// Used when no output device reports a rate
const FALLBACK_SAMPLE_RATE: u32 = 44_100;

/// A device that delivers nothing for this long is treated as faulted
const STALL_TIMEOUT: Duration = Duration::from_secs(2);

const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Bytes per 16-bit sample
const SAMPLE_BYTES: usize = 2;

/// Capture through the platform's default cpal host
#[derive(Debug, Default)]
pub struct CpalBackend;

impl CpalBackend {
    pub fn new() -> Self {
        Self
    }

    fn find_device(source: &InputSource) -> Option<cpal::Device> {
        let host = cpal::default_host();
        match source {
            InputSource::Default => host.default_input_device(),
            InputSource::Named(name) => host
                .input_devices()
                .ok()?
                .find(|d| d.name().map(|n| &n == name).unwrap_or(false)),
        }
    }

    /// A supported input config that can run at `sample_rate`
    fn find_config(
        device: &cpal::Device,
        sample_rate: u32,
    ) -> Option<cpal::SupportedStreamConfig> {
        let rate = cpal::SampleRate(sample_rate);
        let mut configs: Vec<_> = device
            .supported_input_configs()
            .ok()?
            .filter(|c| c.min_sample_rate() <= rate && rate <= c.max_sample_rate())
            .filter(|c| {
                matches!(
                    c.sample_format(),
                    cpal::SampleFormat::I16 | cpal::SampleFormat::F32 | cpal::SampleFormat::U16
                )
            })
            .collect();

        // Fewest channels first, mono is ideal
        configs.sort_by_key(|c| c.channels());
        configs.into_iter().next().map(|c| c.with_sample_rate(rate))
    }
}

impl AudioBackend for CpalBackend {
    fn preferred_sample_rate(&self) -> u32 {
        let host = cpal::default_host();
        match host
            .default_output_device()
            .and_then(|d| d.default_output_config().ok())
        {
            Some(config) => config.sample_rate().0,
            None => {
                log::warn!(
                    "No output config available, assuming {} Hz",
                    FALLBACK_SAMPLE_RATE
                );
                FALLBACK_SAMPLE_RATE
            }
        }
    }

    fn min_buffer_size(&self, source: &InputSource, sample_rate: u32) -> Option<usize> {
        let support = match Self::find_device(source) {
            None => DeviceSupport::Missing,
            Some(device) => match Self::find_config(&device, sample_rate) {
                None => DeviceSupport::Unsupported,
                Some(config) => DeviceSupport::Supported(match config.buffer_size() {
                    cpal::SupportedBufferSize::Range { min, .. } => Some(*min),
                    cpal::SupportedBufferSize::Unknown => None,
                }),
            },
        };
        min_buffer_bytes(support, sample_rate)
    }

    fn acquire(
        &self,
        source: &InputSource,
        sample_rate: u32,
        buffer_size: usize,
    ) -> Result<Box<dyn InputHandle>, CaptureError> {
        let device = Self::find_device(source).ok_or_else(|| {
            CaptureError::HandleInitializationFailed(format!(
                "input device not found: {}",
                source.name()
            ))
        })?;
        let config = Self::find_config(&device, sample_rate).ok_or_else(|| {
            CaptureError::HandleInitializationFailed(format!(
                "{} Hz not supported by {}",
                sample_rate,
                source.name()
            ))
        })?;

        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        log::info!("Using input device: {}", device_name);
        log::info!("Audio config: {:?}", config);

        // Room for the platform buffer plus a few frames of slack
        let capacity = (buffer_size / SAMPLE_BYTES).max(FRAME_SIZE) * 4;
        let (producer, consumer) = HeapRb::<i16>::new(capacity).split();
        let fault = Arc::new(AtomicBool::new(false));

        let channels = config.channels() as usize;
        let format = config.sample_format();
        let stream_config: cpal::StreamConfig = config.into();

        let stream = match format {
            cpal::SampleFormat::I16 => build_stream::<i16>(
                &device,
                &stream_config,
                channels,
                producer,
                Arc::clone(&fault),
            ),
            cpal::SampleFormat::F32 => build_stream::<f32>(
                &device,
                &stream_config,
                channels,
                producer,
                Arc::clone(&fault),
            ),
            cpal::SampleFormat::U16 => build_stream::<u16>(
                &device,
                &stream_config,
                channels,
                producer,
                Arc::clone(&fault),
            ),
            format => {
                return Err(CaptureError::HandleInitializationFailed(format!(
                    "unsupported sample format: {:?}",
                    format
                )))
            }
        }
        .map_err(|e| CaptureError::HandleInitializationFailed(e.to_string()))?;

        Ok(Box::new(CpalInputHandle {
            stream: Some(stream),
            consumer,
            fault,
            recording: false,
            stall_timeout: STALL_TIMEOUT,
        }))
    }

    fn input_devices(&self) -> Vec<String> {
        let host = cpal::default_host();
        host.input_devices()
            .map(|devices| devices.filter_map(|d| d.name().ok()).collect())
            .unwrap_or_default()
    }
}

/// What the input device can do at the requested rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeviceSupport {
    /// No such device; `acquire` reports it
    Missing,
    /// The device cannot run at the rate
    Unsupported,
    /// Runs at the rate, with the platform's minimum buffer in frames if known
    Supported(Option<u32>),
}

/// Minimum 16-bit mono capture buffer in bytes, `None` when the rate is unusable
fn min_buffer_bytes(support: DeviceSupport, sample_rate: u32) -> Option<usize> {
    // Unknown or missing: assume 20 ms of audio
    let fallback = (sample_rate / 50).max(1) as usize;
    let frames = match support {
        DeviceSupport::Unsupported => return None,
        DeviceSupport::Supported(Some(min)) if min > 0 => min as usize,
        DeviceSupport::Supported(_) | DeviceSupport::Missing => fallback,
    };
    Some(frames * SAMPLE_BYTES)
}

/// Build an input stream that keeps the first channel of each frame
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    mut producer: ringbuf::HeapProd<i16>,
    fault: Arc<AtomicBool>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample,
    i16: FromSample<T>,
{
    let mut mono: Vec<i16> = Vec::with_capacity(FRAME_SIZE);

    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            mono.clear();
            mono.extend(data.chunks(channels).map(|frame| frame[0].to_sample::<i16>()));
            // Dropped when the reader falls behind; the scope only needs recent audio
            let _ = producer.push_slice(&mono);
        },
        move |err| {
            log::error!("Audio error: {}", err);
            fault.store(true, Ordering::Relaxed);
        },
        None,
    )
}

/// An open cpal input stream
struct CpalInputHandle {
    stream: Option<cpal::Stream>,
    consumer: ringbuf::HeapCons<i16>,
    fault: Arc<AtomicBool>,
    recording: bool,
    stall_timeout: Duration,
}

impl InputHandle for CpalInputHandle {
    fn state(&self) -> HandleState {
        if self.stream.is_some() {
            HandleState::Initialized
        } else {
            HandleState::Uninitialized
        }
    }

    fn is_recording(&self) -> bool {
        self.recording
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        let stream = self.stream.as_ref().ok_or_else(|| {
            CaptureError::HandleInitializationFailed("handle already released".to_string())
        })?;
        stream
            .play()
            .map_err(|e| CaptureError::HandleInitializationFailed(e.to_string()))?;
        self.recording = true;
        Ok(())
    }

    fn read(&mut self, buf: &mut [i16]) -> Result<usize, CaptureError> {
        let mut filled = 0;
        let mut last_data = Instant::now();

        while filled < buf.len() {
            if self.fault.load(Ordering::Relaxed) {
                return Err(CaptureError::StreamFault("device reported an error".to_string()));
            }
            if !self.recording {
                return Ok(0);
            }

            let n = self.consumer.pop_slice(&mut buf[filled..]);
            if n > 0 {
                filled += n;
                last_data = Instant::now();
            } else if last_data.elapsed() >= self.stall_timeout {
                return Err(CaptureError::StreamFault(format!(
                    "no data for {} ms",
                    self.stall_timeout.as_millis()
                )));
            } else {
                thread::sleep(POLL_INTERVAL);
            }
        }

        Ok(filled)
    }

    fn stop(&mut self) {
        if !self.recording {
            return;
        }
        self.recording = false;
        if let Some(stream) = &self.stream {
            if let Err(e) = stream.pause() {
                log::warn!("Failed to pause input stream: {}", e);
            }
        }
    }

    fn release(&mut self) {
        self.recording = false;
        // Dropping the stream closes the device
        if self.stream.take().is_some() {
            log::debug!("Input stream released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(capacity: usize) -> (CpalInputHandle, ringbuf::HeapProd<i16>) {
        let (producer, consumer) = HeapRb::<i16>::new(capacity).split();
        let handle = CpalInputHandle {
            stream: None,
            consumer,
            fault: Arc::new(AtomicBool::new(false)),
            recording: true,
            stall_timeout: Duration::from_millis(50),
        };
        (handle, producer)
    }

    #[test]
    fn test_read_fills_request() {
        let (mut handle, mut producer) = handle(16);
        producer.push_slice(&[1, 2, 3, 4, 5]);

        let mut buf = [0i16; 4];
        assert_eq!(handle.read(&mut buf).unwrap(), 4);
        assert_eq!(buf, [1, 2, 3, 4]);
    }

    #[test]
    fn test_read_waits_for_late_samples() {
        let (mut handle, mut producer) = handle(16);
        producer.push_slice(&[1, 2]);

        let feeder = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            producer.push_slice(&[3, 4]);
            producer
        });

        let mut buf = [0i16; 4];
        assert_eq!(handle.read(&mut buf).unwrap(), 4);
        assert_eq!(buf, [1, 2, 3, 4]);
        feeder.join().unwrap();
    }

    #[test]
    fn test_device_error_is_stream_fault() {
        let (mut handle, mut producer) = handle(16);
        producer.push_slice(&[1, 2, 3, 4]);
        handle.fault.store(true, Ordering::Relaxed);

        let mut buf = [0i16; 4];
        assert!(matches!(handle.read(&mut buf), Err(CaptureError::StreamFault(_))));
    }

    #[test]
    fn test_read_after_stop_returns_zero() {
        let (mut handle, mut producer) = handle(16);
        producer.push_slice(&[1, 2, 3, 4]);
        handle.stop();

        assert!(!handle.is_recording());
        let mut buf = [0i16; 4];
        assert_eq!(handle.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_stall_is_stream_fault() {
        let (mut handle, _producer) = handle(16);

        let started = Instant::now();
        let mut buf = [0i16; 4];
        let result = handle.read(&mut buf);

        assert!(matches!(result, Err(CaptureError::StreamFault(_))));
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_release_is_idempotent() {
        let (mut handle, _producer) = handle(16);

        handle.release();
        handle.release();

        assert_eq!(handle.state(), HandleState::Uninitialized);
        assert!(!handle.is_recording());
        assert!(handle.start().is_err());
    }

    #[test]
    fn test_min_buffer_bytes() {
        assert_eq!(min_buffer_bytes(DeviceSupport::Supported(Some(512)), 48_000), Some(1024));
        // Unknown or zero minimum falls back to 20 ms
        assert_eq!(min_buffer_bytes(DeviceSupport::Supported(None), 48_000), Some(1920));
        assert_eq!(min_buffer_bytes(DeviceSupport::Supported(Some(0)), 44_100), Some(1764));
        assert_eq!(min_buffer_bytes(DeviceSupport::Unsupported, 44_100), None);
    }

    #[test]
    fn test_missing_device_is_left_to_acquire() {
        // Sized from the rate so the failure is reported as a missing device
        assert_eq!(min_buffer_bytes(DeviceSupport::Missing, 44_100), Some(1764));
    }
}
