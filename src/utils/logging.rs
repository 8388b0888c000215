use log::{debug, log_enabled, warn, Level};
use std::time::{Duration, Instant};

/// Scoped timer that reports how long a trial or sweep took.
pub struct ScopedTimer {
    label: String,
    start: Instant,
}

impl ScopedTimer {
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        if log_enabled!(Level::Trace) {
            log::trace!("⏱️ start {label}");
        }
        Self {
            label,
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        if log_enabled!(Level::Debug) {
            let elapsed = self.start.elapsed();
            debug!("⏱️ end {} ({:.2} ms)", self.label, elapsed.as_secs_f32() * 1000.0);
        }
    }
}

/// Warns when a paced trial ran noticeably slower than simulated time.
pub fn warn_if_behind_real_time(label: &str, wall: Duration, simulated: Duration) {
    if simulated.is_zero() {
        return;
    }
    let ratio = wall.as_secs_f32() / simulated.as_secs_f32();
    if ratio > 1.5 {
        warn!(
            "{label} ran {:.1}x slower than real time ({:.2} s wall for {:.2} s simulated)",
            ratio,
            wall.as_secs_f32(),
            simulated.as_secs_f32()
        );
    }
}
