// Copyright 2026 the Headwater Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Countdown latch for synchronous draws.
//!
//! A synchronous draw blocks the owning thread until the compositor has
//! committed the frame and every registered draw listener has finished.
//! Each party holds a clone of the latch and signals it once; the root
//! waits for the count to reach zero, bounded by a timeout.

use alloc::sync::Arc;
use core::fmt;
use core::time::Duration;
use std::sync::{Condvar, Mutex, PoisonError};

/// A cloneable countdown latch.
#[derive(Clone)]
pub struct DrawLatch {
    inner: Arc<(Mutex<usize>, Condvar)>,
}

impl fmt::Debug for DrawLatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawLatch")
            .field("remaining", &self.remaining())
            .finish()
    }
}

impl DrawLatch {
    /// Creates a latch expecting `count` signals.
    #[must_use]
    pub fn new(count: usize) -> Self {
        Self {
            inner: Arc::new((Mutex::new(count), Condvar::new())),
        }
    }

    /// Counts down once. Extra signals are ignored.
    pub fn signal(&self) {
        let (count, cvar) = &*self.inner;
        let mut count = count.lock().unwrap_or_else(PoisonError::into_inner);
        if *count > 0 {
            *count -= 1;
            if *count == 0 {
                cvar.notify_all();
            }
        }
    }

    /// Signals still outstanding.
    #[must_use]
    pub fn remaining(&self) -> usize {
        *self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until the count reaches zero or `timeout` elapses. Returns
    /// `true` if the count reached zero.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (count, cvar) = &*self.inner;
        let guard = count.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = cvar
            .wait_timeout_while(guard, timeout, |c| *c > 0)
            .unwrap_or_else(PoisonError::into_inner);
        *guard == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_count_does_not_block() {
        assert!(DrawLatch::new(0).wait_timeout(Duration::ZERO));
    }

    #[test]
    fn signals_from_other_threads_release_the_wait() {
        let latch = DrawLatch::new(2);
        let handles: alloc::vec::Vec<_> = (0..2)
            .map(|_| {
                let latch = latch.clone();
                std::thread::spawn(move || latch.signal())
            })
            .collect();
        assert!(latch.wait_timeout(Duration::from_secs(5)));
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(latch.remaining(), 0);
    }

    #[test]
    fn missing_signal_times_out() {
        let latch = DrawLatch::new(2);
        latch.signal();
        assert!(!latch.wait_timeout(Duration::from_millis(10)));
        assert_eq!(latch.remaining(), 1);
    }
}
