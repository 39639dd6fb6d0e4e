// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Video playback: pacing, display and freeze-on-draw.

pub mod clock;
pub mod freeze;
pub mod sink;
pub mod time;

pub use clock::{PlaybackClock, PlaybackError, PlaybackEvent};
pub use freeze::FreezeCoordinator;
pub use sink::{FrameSink, ZoomState};
