//! Time source abstraction for supporting both real and controlled time.
//!
//! The controller compares transition-timer and external-lock deadlines
//! against "now" on every tick, and sleeps once during the bootstrap sensor
//! retry. Both go through this trait so tests can drive the clock by hand
//! instead of waiting for wall time to pass.

use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::Duration;

/// Trait for abstracting time operations
pub trait TimeSource: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Local>;

    /// Sleep for the specified duration (or simulate it)
    fn sleep(&self, duration: Duration);
}

/// Real-time implementation that uses actual system time
pub struct RealTimeSource;

impl TimeSource for RealTimeSource {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Shared real-time source for embeddings that don't inject their own clock.
pub fn real_time() -> Arc<dyn TimeSource> {
    static REAL: Lazy<Arc<RealTimeSource>> = Lazy::new(|| Arc::new(RealTimeSource));
    REAL.clone()
}

/// Manually-advanced time source for tests.
///
/// `now` returns whatever the test last set, and `sleep` advances the
/// simulated clock instead of blocking, so the bootstrap retry and timer
/// expiries run instantly.
#[cfg(any(test, feature = "testing-support"))]
pub struct ManualTimeSource {
    current: std::sync::Mutex<DateTime<Local>>,
}

#[cfg(any(test, feature = "testing-support"))]
impl ManualTimeSource {
    pub fn new(start: DateTime<Local>) -> Arc<Self> {
        Arc::new(Self {
            current: std::sync::Mutex::new(start),
        })
    }

    /// Move the clock forward by `seconds`.
    pub fn advance_secs(&self, seconds: i64) {
        let mut guard = self.current.lock().unwrap();
        *guard += chrono::Duration::seconds(seconds);
    }

    /// Jump the clock to an absolute instant.
    pub fn set(&self, instant: DateTime<Local>) {
        *self.current.lock().unwrap() = instant;
    }
}

#[cfg(any(test, feature = "testing-support"))]
impl TimeSource for ManualTimeSource {
    fn now(&self) -> DateTime<Local> {
        *self.current.lock().unwrap()
    }

    fn sleep(&self, duration: Duration) {
        let mut guard = self.current.lock().unwrap();
        *guard += chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero());
    }
}
