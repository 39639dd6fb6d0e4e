// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Freeze-on-draw.
//!
//! Starting to draw pauses playback and lights a "frozen" indicator for a
//! fixed time. When the indicator expires playback stays paused.

use super::clock::PlaybackClock;

#[derive(Debug, Clone, PartialEq)]
pub struct FreezeCoordinator {
    duration_ms: f64,
    deadline_ms: Option<f64>,
}

impl FreezeCoordinator {
    pub fn new(duration_secs: f64) -> Self {
        Self {
            duration_ms: duration_secs.max(0.0) * 1000.0,
            deadline_ms: None,
        }
    }

    pub fn set_duration(&mut self, duration_secs: f64) {
        self.duration_ms = duration_secs.max(0.0) * 1000.0;
    }

    /// A drawing gesture began: pause and arm the indicator.
    pub fn drawing_started(&mut self, clock: &mut PlaybackClock) {
        if clock.is_playing() {
            log::info!("Freezing playback at {:.0} ms for drawing", clock.position_ms());
        }
        clock.pause();
        self.deadline_ms = Some(clock.now_ms() + self.duration_ms);
    }

    /// Whether the indicator is lit at `now_ms`.
    pub fn is_active(&self, now_ms: f64) -> bool {
        self.deadline_ms.is_some_and(|d| now_ms < d)
    }

    /// Remaining indicator time, for scheduling a repaint.
    pub fn remaining_ms(&self, now_ms: f64) -> Option<f64> {
        self.deadline_ms.map(|d| (d - now_ms).max(0.0))
    }

    /// Clear an expired indicator. Returns `true` on the expiring call.
    pub fn poll(&mut self, now_ms: f64) -> bool {
        match self.deadline_ms {
            Some(deadline) if now_ms >= deadline => {
                self.deadline_ms = None;
                log::debug!("Freeze indicator expired");
                true
            }
            _ => false,
        }
    }
}
