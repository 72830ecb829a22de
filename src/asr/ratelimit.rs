use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Maximum calls permitted per window
pub const RATE_LIMIT_CALLS: u32 = 10;

/// Window length in seconds
pub const RATE_LIMIT_PERIOD_SECS: u64 = 60;

#[derive(Debug)]
struct Window {
    started_at: Instant,
    calls: u32,
}

/// Coarse fixed-window call limiter, scoped to one ASR provider instance.
///
/// The window resets when more than one period has elapsed since it started;
/// a saturated window suspends the caller for exactly the remaining window
/// time. Bursts straddling a window boundary are not smoothed - up to twice
/// the call budget can pass across a boundary. That laxity is part of the
/// contract, callers must not rely on stricter pacing.
#[derive(Debug)]
pub struct RateLimiter {
    max_calls: u32,
    period: Duration,
    window: Mutex<Window>,
}

impl RateLimiter {
    pub fn new(max_calls: u32, period: Duration) -> Self {
        Self {
            max_calls,
            period,
            window: Mutex::new(Window {
                started_at: Instant::now(),
                calls: 0,
            }),
        }
    }

    /// Account for one outbound call, sleeping first if the window is full.
    ///
    /// Never fails; at worst the caller is delayed by one window length.
    pub async fn acquire(&self) {
        let mut window = self.window.lock().await;

        let now = Instant::now();
        if now.duration_since(window.started_at) > self.period {
            window.started_at = now;
            window.calls = 0;
        }

        if window.calls >= self.max_calls {
            let elapsed = now.duration_since(window.started_at);
            let wait = self.period.saturating_sub(elapsed);
            if !wait.is_zero() {
                tracing::warn!(
                    wait_secs = wait.as_secs_f64(),
                    "rate limit reached, pausing before next call"
                );
                tokio::time::sleep(wait).await;
                window.started_at = Instant::now();
                window.calls = 0;
            }
        }

        window.calls += 1;
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RATE_LIMIT_CALLS, Duration::from_secs(RATE_LIMIT_PERIOD_SECS))
    }
}
