// SPDX-License-Identifier: MIT OR Apache-2.0
//! Cooperative shutdown signalling.

use parking_lot::{Condvar, Mutex};
use std::time::Duration;

/// Shared shutdown flag with a condvar so waiters wake immediately on
/// request. Passed explicitly to everything that needs it; there is no
/// process-global.
#[derive(Default)]
pub struct ShutdownContext {
    requested: Mutex<bool>,
    cv: Condvar,
}

impl ShutdownContext {
    /// Create a context with shutdown not requested.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown, waking all waiters. Idempotent.
    pub fn request(&self) {
        let mut requested = self.requested.lock();
        if !*requested {
            tracing::info!("shutdown requested");
            *requested = true;
            self.cv.notify_all();
        }
    }

    /// Whether shutdown has been requested.
    pub fn is_requested(&self) -> bool {
        *self.requested.lock()
    }

    /// Sleep for at most `timeout`, waking early on a shutdown
    /// request. Returns whether shutdown was requested.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut requested = self.requested.lock();
        if *requested {
            return true;
        }
        let _ = self.cv.wait_for(&mut requested, timeout);
        *requested
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_request_is_idempotent_and_visible() {
        let ctx = ShutdownContext::new();
        assert!(!ctx.is_requested());
        ctx.request();
        ctx.request();
        assert!(ctx.is_requested());
    }

    #[test]
    fn test_wait_returns_immediately_when_already_requested() {
        let ctx = ShutdownContext::new();
        ctx.request();
        assert!(ctx.wait_timeout(Duration::from_secs(10)));
    }

    #[test]
    fn test_wait_wakes_on_request_from_another_thread() {
        let ctx = Arc::new(ShutdownContext::new());
        let waker = Arc::clone(&ctx);
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            waker.request();
        });
        assert!(ctx.wait_timeout(Duration::from_secs(5)));
        handle.join().unwrap();
    }

    #[test]
    fn test_wait_times_out_without_request() {
        let ctx = ShutdownContext::new();
        assert!(!ctx.wait_timeout(Duration::from_millis(5)));
    }
}
