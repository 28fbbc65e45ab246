//! Audio capture loop
//!
//! One dedicated thread owns the exclusive input handle for the lifetime of
//! a capture session. It reads fixed-size frames, appends them to the shared
//! [`SampleRing`] and pokes the display after each one.
//!
//! Cancellation is cooperative: [`CaptureLoop::stop`] clears the running flag
//! and joins the thread. The flag is checked once per frame, so an in-flight
//! read always completes (or fails) before the loop exits.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;

use super::buffer::{SampleFrame, SampleRing};
use super::device::{AudioBackend, CaptureError, HandleState, InputHandle, InputSource};

/// Receives a signal after every captured frame.
///
/// Must not block; the display re-reads the ring on its own schedule and is
/// expected to coalesce redundant notifications.
pub trait DisplayNotifier: Send + Sync {
    fn notify_frame_ready(&self);
}

impl DisplayNotifier for eframe::egui::Context {
    fn notify_frame_ready(&self) {
        self.request_repaint();
    }
}

/// Lifecycle of the capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum CaptureState {
    #[default]
    Stopped = 0,
    Acquiring = 1,
    Recording = 2,
}

impl CaptureState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Acquiring,
            2 => Self::Recording,
            _ => Self::Stopped,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Stopped => "Stopped",
            Self::Acquiring => "Acquiring",
            Self::Recording => "Recording",
        }
    }
}

/// State shared between the owner and the capture thread
struct Shared {
    running: AtomicBool,
    state: AtomicU8,
    sample_rate: AtomicU32,
    frames: AtomicU64,
}

impl Shared {
    fn set_state(&self, state: CaptureState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Audio capture engine
pub struct CaptureLoop {
    backend: Arc<dyn AudioBackend>,
    ring: SampleRing,
    notifier: Arc<dyn DisplayNotifier>,
    failures: Sender<CaptureError>,
    shared: Arc<Shared>,
    thread: Option<thread::JoinHandle<()>>,

    /// Device to open on the next start
    pub source: InputSource,
}

impl CaptureLoop {
    pub fn new(
        backend: Arc<dyn AudioBackend>,
        ring: SampleRing,
        notifier: Arc<dyn DisplayNotifier>,
        failures: Sender<CaptureError>,
    ) -> Self {
        Self {
            backend,
            ring,
            notifier,
            failures,
            shared: Arc::new(Shared {
                running: AtomicBool::new(false),
                state: AtomicU8::new(CaptureState::Stopped as u8),
                sample_rate: AtomicU32::new(0),
                frames: AtomicU64::new(0),
            }),
            thread: None,
            source: InputSource::default(),
        }
    }

    pub fn state(&self) -> CaptureState {
        CaptureState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    /// Whether a capture thread is alive
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Sample rate of the current or last session, 0 before the first
    pub fn sample_rate(&self) -> u32 {
        self.shared.sample_rate.load(Ordering::Relaxed)
    }

    /// Frames captured by the current or last session
    pub fn frames_captured(&self) -> u64 {
        self.shared.frames.load(Ordering::Relaxed)
    }

    pub fn backend(&self) -> &Arc<dyn AudioBackend> {
        &self.backend
    }

    /// Spawn the capture thread. Returns immediately; failures arrive on the
    /// failure channel.
    pub fn start(&mut self) {
        if self.is_running() {
            log::warn!("Capture already running");
            return;
        }

        // Reap a session that ended on its own so its handle is gone for good
        self.join();

        log::info!("Starting audio capture...");

        self.shared.frames.store(0, Ordering::Relaxed);
        self.shared.running.store(true, Ordering::Release);
        self.shared.set_state(CaptureState::Acquiring);

        let session = Session {
            backend: Arc::clone(&self.backend),
            ring: self.ring.clone(),
            notifier: Arc::clone(&self.notifier),
            shared: Arc::clone(&self.shared),
            source: self.source.clone(),
        };
        let failures = self.failures.clone();
        let shared = Arc::clone(&self.shared);

        let spawned = thread::Builder::new()
            .name("tdr-capture".into())
            .spawn(move || {
                if let Err(e) = session.run() {
                    log::error!("Capture error: {}", e);
                    let _ = failures.send(e);
                }
                shared.running.store(false, Ordering::Release);
                shared.set_state(CaptureState::Stopped);
            });

        match spawned {
            Ok(handle) => self.thread = Some(handle),
            Err(e) => {
                self.shared.running.store(false, Ordering::Release);
                self.shared.set_state(CaptureState::Stopped);
                let _ = self.failures.send(CaptureError::ThreadSpawn(e.to_string()));
            }
        }
    }

    /// Signal the capture thread and wait until it has released the handle.
    ///
    /// A no-op when nothing is running.
    pub fn stop(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        if self.thread.is_some() {
            self.join();
            log::info!("Capture stopped");
        }
    }

    pub fn toggle(&mut self) {
        if self.is_running() {
            self.stop();
        } else {
            self.start();
        }
    }

    fn join(&mut self) {
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                log::error!("Capture thread panicked");
            }
        }
        self.shared.set_state(CaptureState::Stopped);
    }
}

impl Drop for CaptureLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Everything the capture thread needs, moved onto it
struct Session {
    backend: Arc<dyn AudioBackend>,
    ring: SampleRing,
    notifier: Arc<dyn DisplayNotifier>,
    shared: Arc<Shared>,
    source: InputSource,
}

impl Session {
    fn run(self) -> Result<(), CaptureError> {
        let sample_rate = self.backend.preferred_sample_rate();
        self.shared.sample_rate.store(sample_rate, Ordering::Relaxed);

        let size = self
            .backend
            .min_buffer_size(&self.source, sample_rate)
            .filter(|&size| size > 0)
            .ok_or(CaptureError::BufferSizingUnsupported { sample_rate })?;

        log::info!(
            "Capture at {} Hz, minimum buffer {} bytes",
            sample_rate,
            size
        );

        let handle = self.backend.acquire(&self.source, sample_rate, size)?;
        let mut handle = HandleGuard(handle);

        if handle.0.state() != HandleState::Initialized {
            return Err(CaptureError::HandleInitializationFailed(
                "handle not initialized".to_string(),
            ));
        }

        handle.0.start()?;
        self.shared.set_state(CaptureState::Recording);
        log::info!("Capture started");

        let mut frame = SampleFrame::new();
        while self.shared.running.load(Ordering::Acquire) {
            read_frame(handle.0.as_mut(), &mut frame)?;

            self.ring.append(frame.as_slice());
            self.shared.frames.fetch_add(1, Ordering::Relaxed);
            self.notifier.notify_frame_ready();
        }

        Ok(())
    }
}

/// Fill the whole frame; any non-positive read fails it
fn read_frame(handle: &mut dyn InputHandle, frame: &mut SampleFrame) -> Result<(), CaptureError> {
    let buf = frame.as_mut_slice();
    let mut filled = 0;

    while filled < buf.len() {
        match handle.read(&mut buf[filled..])? {
            0 => {
                return Err(CaptureError::StreamFault(
                    "read returned no data".to_string(),
                ))
            }
            n => filled += n.min(buf.len() - filled),
        }
    }

    Ok(())
}

/// Stops and releases the handle however the session ends
struct HandleGuard(Box<dyn InputHandle>);

impl Drop for HandleGuard {
    fn drop(&mut self) {
        if self.0.is_recording() {
            self.0.stop();
        }
        self.0.release();
    }
}
