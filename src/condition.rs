//! Waits for a condition to be met before running a scheduled action,
//! without blocking or spawning a thread.

use std::time::{Duration, Instant};

/// Default interval between condition checks, in milliseconds.
const DEFAULT_INTERVAL_MS: u64 = 300;
/// Floor under which the check interval is never allowed to shrink.
const MIN_INTERVAL_MS: u64 = 10;

/// Polls a predicate on the reactor's event loop until it becomes true or a
/// timeout elapses, backing off geometrically between attempts.
///
/// This has no thread of its own: [`ConditionChecker::next_deadline`] tells
/// the caller when to next call [`ConditionChecker::poll`].
pub struct ConditionChecker {
    check: Option<Box<dyn FnMut() -> bool>>,
    on_success: Option<Box<dyn FnOnce()>>,
    on_failure: Option<Box<dyn FnOnce()>>,
    interval_ms: u64,
    multiplier: f64,
    next_interval_ms: u64,
    deadline: Option<Instant>,
    next_check_at: Option<Instant>,
}

impl Default for ConditionChecker {
    fn default() -> Self {
        ConditionChecker {
            check: None,
            on_success: None,
            on_failure: None,
            interval_ms: DEFAULT_INTERVAL_MS,
            multiplier: 1.0,
            next_interval_ms: DEFAULT_INTERVAL_MS,
            deadline: None,
            next_check_at: None,
        }
    }
}

impl ConditionChecker {
    pub fn new() -> Self {
        ConditionChecker::default()
    }

    /// Sets how frequently checks run, and how much the interval grows
    /// after each failed check. Both values are floored to stay positive.
    pub fn set_check_interval(&mut self, interval_ms: u64, multiplier: f64) {
        self.interval_ms = interval_ms.max(MIN_INTERVAL_MS);
        self.multiplier = if multiplier > 0.0 { multiplier } else { 1.0 };
    }

    pub fn is_checking(&self) -> bool {
        self.check.is_some()
    }

    /// Starts checking for a condition, unless already checking another
    /// one. `timeout_ms` of `None` means never time out. Returns `false`
    /// (and takes no action) if a check is already in progress.
    pub fn start_check(
        &mut self,
        mut check: impl FnMut() -> bool + 'static,
        on_success: impl FnOnce() + 'static,
        timeout_ms: Option<u64>,
        on_failure: Option<Box<dyn FnOnce()>>,
        now: Instant,
    ) -> bool {
        if self.check.is_some() {
            return false;
        }

        self.deadline = timeout_ms.map(|ms| now + Duration::from_millis(ms));
        self.next_interval_ms = self.interval_ms;

        if check() {
            on_success();
            return true;
        }

        self.check = Some(Box::new(check));
        self.on_success = Some(Box::new(on_success));
        self.on_failure = on_failure;
        self.schedule_next(now);
        true
    }

    /// Cancels any ongoing check. A no-op if nothing is being checked.
    pub fn cancel(&mut self, run_failure_callback: bool, run_final_test: bool, now: Instant) {
        if self.check.is_none() {
            return;
        }
        if run_final_test && self.check_condition(now) {
            self.clear();
            return;
        }
        if run_failure_callback {
            if let Some(on_failure) = self.on_failure.take() {
                on_failure();
            }
        }
        self.clear();
    }

    /// The instant the reactor should next call [`Self::poll`], if a check
    /// is in progress.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.next_check_at
    }

    /// Call once `now` has reached [`Self::next_deadline`]. Re-tests the
    /// condition, fires the matching callback and stops on success or
    /// timeout, or reschedules with a longer interval otherwise.
    pub fn poll(&mut self, now: Instant) {
        if self.check.is_none() {
            return;
        }
        if self.check_condition(now) {
            self.clear();
            return;
        }
        if let Some(deadline) = self.deadline {
            if now >= deadline {
                if let Some(on_failure) = self.on_failure.take() {
                    on_failure();
                }
                self.clear();
                return;
            }
        }
        self.next_interval_ms = ((self.next_interval_ms as f64) * self.multiplier) as u64;
        self.schedule_next(now);
    }

    fn check_condition(&mut self, _now: Instant) -> bool {
        let met = self.check.as_mut().map(|c| c()).unwrap_or(false);
        if met {
            if let Some(on_success) = self.on_success.take() {
                on_success();
            }
        }
        met
    }

    fn schedule_next(&mut self, now: Instant) {
        let mut interval = self.next_interval_ms.max(MIN_INTERVAL_MS);
        if let Some(deadline) = self.deadline {
            let remaining = deadline.saturating_duration_since(now).as_millis() as u64;
            interval = interval.min(remaining);
        }
        self.next_check_at = Some(now + Duration::from_millis(interval));
    }

    fn clear(&mut self) {
        self.check = None;
        self.on_success = None;
        self.on_failure = None;
        self.deadline = None;
        self.next_check_at = None;
    }
}
