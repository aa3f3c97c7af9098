use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

/// A flag that fires at most once per window.
///
/// `trigger` arms the flag and reports whether this call was the one that
/// armed it. The flag disarms itself once `window` has elapsed since it was
/// armed, or immediately on `reset`.
pub struct DebouncedFlag {
    window: Duration,
    armed_at: Mutex<Option<Instant>>,
}

impl DebouncedFlag {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            armed_at: Mutex::new(None),
        }
    }

    /// Returns `true` if the flag was idle and is now armed.
    pub fn trigger(&self) -> bool {
        let mut armed_at = self.armed_at.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        match *armed_at {
            Some(at) if now.duration_since(at) < self.window => false,
            _ => {
                *armed_at = Some(now);
                true
            }
        }
    }

    pub fn reset(&self) {
        *self.armed_at.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn is_armed(&self) -> bool {
        let armed_at = self.armed_at.lock().unwrap_or_else(|e| e.into_inner());
        matches!(*armed_at, Some(at) if at.elapsed() < self.window)
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fires_once_per_window() {
        let flag = DebouncedFlag::new(Duration::from_secs(2));
        assert!(flag.trigger());
        assert!(!flag.trigger());
        assert!(flag.is_armed());

        tokio::time::advance(Duration::from_millis(1_999)).await;
        assert!(!flag.trigger());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(!flag.is_armed());
        assert!(flag.trigger());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_rearms_immediately() {
        let flag = DebouncedFlag::new(Duration::from_secs(2));
        assert!(flag.trigger());
        flag.reset();
        assert!(!flag.is_armed());
        assert!(flag.trigger());
    }

    #[tokio::test]
    async fn zero_window_never_suppresses() {
        let flag = DebouncedFlag::new(Duration::ZERO);
        assert!(flag.trigger());
        assert!(flag.trigger());
    }
}
