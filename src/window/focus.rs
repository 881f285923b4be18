//! Simplifies the process of changing window focus and waiting until that
//! focus has actually been gained.

use std::thread;
use std::time::{Duration, Instant};

use crate::window::adapter::{Platform, Window};

const FOCUS_WAIT_MS: u64 = 100;
const FOCUS_WAIT_MULTIPLIER: f64 = 1.3;
const FOCUS_TIMEOUT_MS: u64 = 20_000;

/// "Activate and wait": requests a window be focused, then blocks the
/// calling thread until the window manager confirms it, backing off
/// geometrically between polls.
///
/// This blocks rather than scheduling on the reactor because dispatch is
/// itself a blocking, non-reentrant operation on the event thread: there is
/// nothing useful for the thread to do until focus either succeeds or times
/// out. The backoff schedule matches [`crate::condition::ConditionChecker`].
#[derive(Default)]
pub struct FocusControl;

impl FocusControl {
    pub fn new() -> Self {
        FocusControl
    }

    /// Focuses `window`, blocking until the window manager confirms
    /// activation or the timeout elapses. Returns whether focus succeeded.
    pub fn focus_window(&self, platform: &dyn Platform, window: Window) -> bool {
        platform.activate_window(window);
        self.wait_for(|| platform.is_active_window(window))
    }

    fn wait_for(&self, mut condition_met: impl FnMut() -> bool) -> bool {
        if condition_met() {
            return true;
        }
        let mut interval = Duration::from_millis(FOCUS_WAIT_MS);
        let deadline = Instant::now() + Duration::from_millis(FOCUS_TIMEOUT_MS);
        loop {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            thread::sleep(interval.min(deadline - now));
            if condition_met() {
                return true;
            }
            interval = interval.mul_f64(FOCUS_WAIT_MULTIPLIER);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn wait_for_returns_true_immediately_when_already_met() {
        let control = FocusControl::new();
        assert!(control.wait_for(|| true));
    }

    #[test]
    fn wait_for_retries_until_the_condition_becomes_true() {
        let control = FocusControl::new();
        let attempts = Cell::new(0);
        let met = control.wait_for(|| {
            attempts.set(attempts.get() + 1);
            attempts.get() >= 2
        });
        assert!(met);
        assert_eq!(attempts.get(), 2);
    }
}
