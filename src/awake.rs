//! Keep-screen-on control
//!
//! Holds an OS display inhibit while the setting is on and the window is in
//! the foreground. Dropping the held guard lets the display sleep again.

use std::any::Any;

/// Takes an inhibit from the platform; the returned value holds it until dropped
type Acquire = Box<dyn FnMut() -> Result<Box<dyn Any>, String>>;

pub struct KeepScreen {
    acquire: Acquire,
    guard: Option<Box<dyn Any>>,
}

impl KeepScreen {
    /// Inhibit display sleep through the `keepawake` platform backends
    pub fn new() -> Self {
        Self::with_acquire(Box::new(|| {
            keepawake::Builder::default()
                .display(true)
                .reason("Scope display")
                .app_name("tdr-scope")
                .app_reverse_domain("io.github.tdr-scope")
                .create()
                .map(|guard| Box::new(guard) as Box<dyn Any>)
                .map_err(|e| e.to_string())
        }))
    }

    fn with_acquire(acquire: Acquire) -> Self {
        Self {
            acquire,
            guard: None,
        }
    }

    /// Hold or release the inhibit. Repeated calls with the same value are no-ops.
    pub fn apply(&mut self, wanted: bool) {
        match (wanted, self.guard.is_some()) {
            (true, false) => match (self.acquire)() {
                Ok(guard) => {
                    log::info!("Keeping screen on");
                    self.guard = Some(guard);
                }
                Err(e) => log::warn!("Failed to keep screen on: {}", e),
            },
            (false, true) => {
                log::info!("Allowing screen to sleep");
                self.guard = None;
            }
            _ => {}
        }
    }

    pub fn is_held(&self) -> bool {
        self.guard.is_some()
    }
}

impl Default for KeepScreen {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Guard(Rc<Cell<u32>>);

    impl Drop for Guard {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    /// Counts (acquired, released)
    fn counting() -> (KeepScreen, Rc<Cell<u32>>, Rc<Cell<u32>>) {
        let acquired = Rc::new(Cell::new(0));
        let released = Rc::new(Cell::new(0));
        let (a, r) = (Rc::clone(&acquired), Rc::clone(&released));
        let keep = KeepScreen::with_acquire(Box::new(move || {
            a.set(a.get() + 1);
            Ok(Box::new(Guard(Rc::clone(&r))) as Box<dyn Any>)
        }));
        (keep, acquired, released)
    }

    #[test]
    fn test_on_holds_inhibit() {
        let (mut keep, acquired, released) = counting();

        keep.apply(true);
        keep.apply(true);
        assert!(keep.is_held());
        assert_eq!(acquired.get(), 1);
        assert_eq!(released.get(), 0);
    }

    #[test]
    fn test_off_releases_inhibit() {
        let (mut keep, acquired, released) = counting();

        keep.apply(true);
        keep.apply(false);
        keep.apply(false);
        assert!(!keep.is_held());
        assert_eq!(acquired.get(), 1);
        assert_eq!(released.get(), 1);

        // Coming back to the foreground takes it again
        keep.apply(true);
        assert_eq!(acquired.get(), 2);
    }

    #[test]
    fn test_drop_releases_inhibit() {
        let (mut keep, _acquired, released) = counting();
        keep.apply(true);
        drop(keep);
        assert_eq!(released.get(), 1);
    }

    #[test]
    fn test_failed_acquire_is_not_held() {
        let mut keep = KeepScreen::with_acquire(Box::new(|| Err("no session bus".to_string())));
        keep.apply(true);
        assert!(!keep.is_held());
    }
}
