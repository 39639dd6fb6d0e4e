// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Wall-clock time for the scheduler.

use std::time::Instant;

/// Monotonic milliseconds since an arbitrary origin.
pub trait TimeSource {
    fn now_ms(&self) -> f64;
}

/// Real time, measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicTime {
    origin: Instant,
}

impl MonotonicTime {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicTime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicTime {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Hand-driven time shared between a clock and the code advancing it.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct ManualTime(std::rc::Rc<std::cell::Cell<f64>>);

#[cfg(test)]
impl ManualTime {
    pub fn advance(&self, ms: f64) {
        self.0.set(self.0.get() + ms);
    }

    pub fn set(&self, ms: f64) {
        self.0.set(ms);
    }
}

#[cfg(test)]
impl TimeSource for ManualTime {
    fn now_ms(&self) -> f64 {
        self.0.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_time_never_goes_back() {
        let time = MonotonicTime::new();
        let a = time.now_ms();
        let b = time.now_ms();
        assert!(b >= a && a >= 0.0);
    }

    #[test]
    fn test_manual_time_is_shared() {
        let time = ManualTime::default();
        let handle = time.clone();
        handle.advance(40.0);
        handle.advance(2.5);
        assert_eq!(time.now_ms(), 42.5);
        handle.set(10.0);
        assert_eq!(time.now_ms(), 10.0);
    }
}
