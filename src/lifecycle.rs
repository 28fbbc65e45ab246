//! Foreground / background tracking for the main window
//!
//! Capture runs only while the window is in the foreground. The app feeds
//! the window's visibility in once per frame and acts on the transitions.

/// A change the app must act on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Reload settings, start capture
    Resumed,
    /// Save settings, stop capture
    Paused,
}

#[derive(Debug, Default)]
pub struct Lifecycle {
    foreground: bool,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_foreground(&self) -> bool {
        self.foreground
    }

    /// Record the current visibility and report a transition if it changed
    pub fn observe(&mut self, foreground: bool) -> Option<Transition> {
        if foreground == self.foreground {
            return None;
        }
        self.foreground = foreground;
        log::info!("Window {}", if foreground { "resumed" } else { "paused" });
        Some(if foreground {
            Transition::Resumed
        } else {
            Transition::Paused
        })
    }
}
