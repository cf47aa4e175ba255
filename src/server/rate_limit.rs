use dashmap::DashMap;
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::RateLimitConfig;

const MINUTE: Duration = Duration::from_secs(60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitWindow {
    Minute,
    Day,
}

impl fmt::Display for RateLimitWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateLimitWindow::Minute => write!(f, "per-minute"),
            RateLimitWindow::Day => write!(f, "per-day"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{window} quota exhausted")]
pub struct RateLimitExceeded {
    pub window: RateLimitWindow,
}

/// Per-caller admission check. `check` counts the request when it is admitted.
pub trait RateLimit: Send + Sync {
    fn check(&self, caller: IpAddr) -> Result<(), RateLimitExceeded>;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

impl Window {
    fn new(now: Instant) -> Self {
        Self { started: now, count: 0 }
    }

    fn roll(&mut self, now: Instant, length: Duration) {
        if now.duration_since(self.started) >= length {
            *self = Window::new(now);
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CallerWindows {
    minute: Window,
    day: Window,
}

/// Fixed-window counters per caller. A window opens on the caller's first
/// request and resets once its length has elapsed.
pub struct FixedWindowRateLimiter {
    config: RateLimitConfig,
    callers: DashMap<IpAddr, CallerWindows>,
}

impl FixedWindowRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            callers: DashMap::new(),
        }
    }

    /// Drops callers whose day window has closed.
    pub fn retain_recent(&self) {
        let now = Instant::now();
        self.callers.retain(|_, windows| now.duration_since(windows.day.started) < DAY);
    }

    pub fn tracked_callers(&self) -> usize {
        self.callers.len()
    }
}

impl RateLimit for FixedWindowRateLimiter {
    fn check(&self, caller: IpAddr) -> Result<(), RateLimitExceeded> {
        let now = Instant::now();
        // The entry guard holds the shard lock, so the decision and both
        // increments happen as one step for this caller.
        let mut windows = self.callers.entry(caller).or_insert_with(|| CallerWindows {
            minute: Window::new(now),
            day: Window::new(now),
        });
        windows.minute.roll(now, MINUTE);
        windows.day.roll(now, DAY);

        if windows.day.count >= self.config.per_day.get() {
            return Err(RateLimitExceeded { window: RateLimitWindow::Day });
        }
        if windows.minute.count >= self.config.per_minute.get() {
            return Err(RateLimitExceeded { window: RateLimitWindow::Minute });
        }

        windows.minute.count += 1;
        windows.day.count += 1;
        Ok(())
    }
}
