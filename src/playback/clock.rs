// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Playback clock: paced frame decoding against a monotonic clock.
//!
//! The clock never free-runs. While playing it holds a single deadline for
//! the next tick; the host polls it and, once the deadline passes, one frame
//! is decoded and the next deadline is computed from the frame interval
//! minus the time the tick took. When the position falls more than half a
//! frame behind where the wall clock says it should be, the next delay is
//! halved to catch up.
//!
//! Positions follow the frame just decoded: after reading the frame stamped
//! `t` the position is `t + frame_interval`, so stepping from `p` lands on
//! `p + frame_interval`.

use std::time::Duration;

use egui::{Pos2, Rect};
use thiserror::Error;

use super::sink::ZoomState;
use super::time::{MonotonicTime, TimeSource};
use crate::io::media::{Frame, FrameSource, MediaInfo, FALLBACK_FPS};

/// Shortest delay between two ticks.
pub const MIN_TICK_DELAY_MS: f64 = 1.0;

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("failed to open {path}: {reason}")]
    Open { path: String, reason: String },
    #[error("failed to decode frame: {0}")]
    Decode(String),
    #[error("no media loaded")]
    NoMedia,
}

/// Notifications for the host, in the order they happened.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    Loaded { duration_ms: f64, fps: f64 },
    StateChanged { playing: bool },
    PositionChanged(f64),
    EndOfStream,
}

/// Wall time and video position captured when playback (re)starts.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Anchor {
    wall_ms: f64,
    position_ms: f64,
}

pub struct PlaybackClock {
    time: Box<dyn TimeSource>,
    source: Option<Box<dyn FrameSource>>,
    info: MediaInfo,
    position_ms: f64,
    duration_ms: f64,
    fps: f64,
    rate: f64,
    playing: bool,
    anchor: Option<Anchor>,
    next_tick_ms: Option<f64>,
    zoom: ZoomState,
    frame: Option<Frame>,
    events: Vec<PlaybackEvent>,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new(Box::new(MonotonicTime::new()))
    }
}

impl PlaybackClock {
    pub fn new(time: Box<dyn TimeSource>) -> Self {
        Self {
            time,
            source: None,
            info: MediaInfo::default(),
            position_ms: 0.0,
            duration_ms: 0.0,
            fps: FALLBACK_FPS,
            rate: 1.0,
            playing: false,
            anchor: None,
            next_tick_ms: None,
            zoom: ZoomState::default(),
            frame: None,
            events: Vec::new(),
        }
    }

    pub fn now_ms(&self) -> f64 {
        self.time.now_ms()
    }

    pub fn is_loaded(&self) -> bool {
        self.source.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn position_ms(&self) -> f64 {
        self.position_ms
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn info(&self) -> MediaInfo {
        self.info
    }

    pub fn zoom(&self) -> &ZoomState {
        &self.zoom
    }

    /// Video time covered by one frame.
    pub fn frame_interval_ms(&self) -> f64 {
        1000.0 / self.fps
    }

    /// Frame most recently decoded and not yet taken by the sink.
    pub fn take_frame(&mut self) -> Option<Frame> {
        self.frame.take()
    }

    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut self.events)
    }

    /// Take ownership of an opened source. The first frame is decoded for
    /// preview and the source rewound. On failure nothing changes.
    pub fn load(&mut self, mut source: Box<dyn FrameSource>) -> Result<(f64, f64), PlaybackError> {
        let info = source.info();
        let first = source
            .read_frame()?
            .ok_or_else(|| PlaybackError::Decode("stream has no frames".into()))?;
        source.seek(0.0)?;

        let fps = if info.fps > 0.0 { info.fps } else { FALLBACK_FPS };
        let duration_ms = info
            .duration_ms
            .filter(|d| *d > 0.0)
            .or_else(|| info.frame_count.map(|n| n as f64 * 1000.0 / fps))
            .unwrap_or(0.0);

        self.pause();
        self.source = Some(source);
        self.info = info;
        self.fps = fps;
        self.duration_ms = duration_ms;
        self.position_ms = 0.0;
        self.zoom.reset();
        self.frame = Some(first);
        log::info!("Loaded media: {:.2} fps, {:.0} ms", fps, duration_ms);
        self.events.push(PlaybackEvent::Loaded { duration_ms, fps });
        self.events.push(PlaybackEvent::PositionChanged(0.0));
        Ok((duration_ms, fps))
    }

    /// Start paced playback. In frame-step mode this performs one step.
    pub fn play(&mut self) -> Result<(), PlaybackError> {
        if self.source.is_none() {
            return Err(PlaybackError::NoMedia);
        }
        if self.rate <= 0.0 {
            return self.step_forward();
        }
        if self.playing {
            return Ok(());
        }
        if self.duration_ms > 0.0 && self.position_ms >= self.duration_ms {
            self.seek(0.0)?;
        }
        let now = self.now_ms();
        self.playing = true;
        self.anchor = Some(Anchor {
            wall_ms: now,
            position_ms: self.position_ms,
        });
        self.next_tick_ms = Some(now);
        log::debug!("Playing from {:.0} ms at {}x", self.position_ms, self.rate);
        self.events.push(PlaybackEvent::StateChanged { playing: true });
        Ok(())
    }

    /// Pause and cancel any pending tick.
    pub fn pause(&mut self) {
        self.next_tick_ms = None;
        self.anchor = None;
        if self.playing {
            self.playing = false;
            log::debug!("Paused at {:.0} ms", self.position_ms);
            self.events.push(PlaybackEvent::StateChanged { playing: false });
        }
    }

    pub fn toggle(&mut self) -> Result<(), PlaybackError> {
        if self.playing {
            self.pause();
            Ok(())
        } else {
            self.play()
        }
    }

    /// Pause and go back to the start.
    pub fn stop(&mut self) -> Result<(), PlaybackError> {
        self.pause();
        if self.source.is_some() {
            self.seek(0.0)?;
        }
        Ok(())
    }

    /// Jump to `ms`. The frame there is shown and the source rewound to it.
    pub fn seek(&mut self, ms: f64) -> Result<(), PlaybackError> {
        let upper = if self.duration_ms > 0.0 { self.duration_ms } else { f64::MAX };
        let target = ms.clamp(0.0, upper);
        let source = self.source.as_mut().ok_or(PlaybackError::NoMedia)?;
        source.seek(target)?;
        if let Some(frame) = source.read_frame()? {
            self.frame = Some(frame);
        }
        source.seek(target)?;

        self.position_ms = target;
        if self.playing {
            let now = self.now_ms();
            self.anchor = Some(Anchor {
                wall_ms: now,
                position_ms: target,
            });
            self.next_tick_ms = Some(now);
        }
        log::debug!("Seek to {:.0} ms", target);
        self.events.push(PlaybackEvent::PositionChanged(target));
        Ok(())
    }

    /// Decode exactly one frame and leave playback paused.
    pub fn step_forward(&mut self) -> Result<(), PlaybackError> {
        if self.source.is_none() {
            return Err(PlaybackError::NoMedia);
        }
        self.pause();
        self.decode_next()?;
        Ok(())
    }

    /// Set the rate. Zero switches to frame-step mode and pauses.
    pub fn set_rate(&mut self, rate: f64) {
        if rate <= 0.0 {
            self.rate = 0.0;
            self.pause();
        } else {
            self.rate = rate;
            if self.playing {
                let now = self.now_ms();
                self.anchor = Some(Anchor {
                    wall_ms: now,
                    position_ms: self.position_ms,
                });
            }
        }
        log::info!("Playback rate {}", self.rate);
    }

    /// Zoom to `level` keeping the point under `anchor` fixed on screen.
    pub fn set_zoom(&mut self, level: f32, anchor: Pos2, fitted: Rect) {
        self.zoom.zoom_to(level, anchor, fitted);
    }

    pub fn zoom_by_wheel(&mut self, delta: f32, anchor: Pos2, fitted: Rect) {
        self.zoom.zoom_by_wheel(delta, anchor, fitted);
    }

    pub fn reset_zoom(&mut self) {
        self.zoom.reset();
    }

    /// Wall time until the next tick is due, `None` when paused.
    pub fn time_until_next_tick(&self) -> Option<Duration> {
        let due = self.next_tick_ms?;
        let wait = (due - self.now_ms()).max(0.0);
        Some(Duration::from_secs_f64(wait / 1000.0))
    }

    /// Run a tick if one is due. Returns `true` when a frame was decoded.
    pub fn poll(&mut self) -> Result<bool, PlaybackError> {
        match self.next_tick_ms {
            Some(due) if self.playing && self.now_ms() >= due => self.tick(),
            _ => Ok(false),
        }
    }

    fn tick(&mut self) -> Result<bool, PlaybackError> {
        let started = self.now_ms();
        let decoded = match self.decode_next() {
            Ok(decoded) => decoded,
            Err(e) => {
                self.pause();
                return Err(e);
            }
        };
        if !decoded {
            return Ok(false);
        }

        let now = self.now_ms();
        let processing = now - started;
        let frame_interval = self.frame_interval_ms();
        let mut delay = (frame_interval / self.rate - processing).max(MIN_TICK_DELAY_MS);

        if let Some(anchor) = self.anchor {
            let mut target = anchor.position_ms + (now - anchor.wall_ms) * self.rate;
            if self.duration_ms > 0.0 {
                target = target.min(self.duration_ms);
            }
            if target - self.position_ms > frame_interval / 2.0 {
                delay = (delay / 2.0).max(MIN_TICK_DELAY_MS);
            }
        }
        self.next_tick_ms = Some(now + delay);
        Ok(true)
    }

    /// Read one frame and advance the position. End of stream pauses.
    fn decode_next(&mut self) -> Result<bool, PlaybackError> {
        let interval = self.frame_interval_ms();
        let source = self.source.as_mut().ok_or(PlaybackError::NoMedia)?;
        match source.read_frame()? {
            Some(frame) => {
                let mut position = frame.timestamp_ms + interval;
                if self.duration_ms > 0.0 {
                    position = position.min(self.duration_ms);
                }
                self.position_ms = position;
                self.frame = Some(frame);
                self.events.push(PlaybackEvent::PositionChanged(position));
                Ok(true)
            }
            None => {
                log::info!("End of stream at {:.0} ms", self.position_ms);
                self.pause();
                self.events.push(PlaybackEvent::EndOfStream);
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::time::ManualTime;

    /// Synthetic stream: frames every `1000 / fps` ms, each costing
    /// `decode_cost` ms of wall time.
    struct SyntheticSource {
        time: ManualTime,
        fps: f64,
        frames: u64,
        next: u64,
        decode_cost: f64,
        fail: bool,
    }

    impl SyntheticSource {
        fn new(time: &ManualTime, fps: f64, frames: u64, decode_cost: f64) -> Self {
            Self {
                time: time.clone(),
                fps,
                frames,
                next: 0,
                decode_cost,
                fail: false,
            }
        }
    }

    impl FrameSource for SyntheticSource {
        fn info(&self) -> MediaInfo {
            MediaInfo {
                fps: self.fps,
                frame_count: Some(self.frames),
                duration_ms: None,
                width: 2,
                height: 2,
            }
        }

        fn read_frame(&mut self) -> Result<Option<Frame>, PlaybackError> {
            if self.fail {
                return Err(PlaybackError::Decode("unsupported codec".into()));
            }
            self.time.advance(self.decode_cost);
            if self.next >= self.frames {
                return Ok(None);
            }
            let fps = if self.fps > 0.0 { self.fps } else { FALLBACK_FPS };
            let frame = Frame {
                width: 2,
                height: 2,
                rgba: vec![0; 16],
                timestamp_ms: self.next as f64 * 1000.0 / fps,
            };
            self.next += 1;
            Ok(Some(frame))
        }

        fn seek(&mut self, ms: f64) -> Result<(), PlaybackError> {
            let fps = if self.fps > 0.0 { self.fps } else { FALLBACK_FPS };
            self.next = (ms * fps / 1000.0).round() as u64;
            Ok(())
        }
    }

    fn clock_with(time: &ManualTime, source: SyntheticSource) -> PlaybackClock {
        let mut clock = PlaybackClock::new(Box::new(time.clone()));
        clock.load(Box::new(source)).unwrap();
        clock
    }

    /// Advance time to the next deadline and poll.
    fn run_tick(clock: &mut PlaybackClock, time: &ManualTime) -> bool {
        if let Some(due) = clock.next_tick_ms {
            if due > time.now_ms() {
                time.set(due);
            }
        }
        clock.poll().unwrap()
    }

    #[test]
    fn test_load_reports_duration_and_rewinds() {
        let time = ManualTime::default();
        let mut clock = clock_with(&time, SyntheticSource::new(&time, 25.0, 15000, 0.0));
        assert_eq!(clock.duration_ms(), 600000.0);
        assert_eq!(clock.position_ms(), 0.0);
        assert!(clock.take_frame().is_some());
        assert_eq!(
            clock.drain_events()[0],
            PlaybackEvent::Loaded {
                duration_ms: 600000.0,
                fps: 25.0
            }
        );
        // Rewound: the first step shows frame zero again.
        clock.step_forward().unwrap();
        assert_eq!(clock.position_ms(), 40.0);
    }

    #[test]
    fn test_zero_fps_falls_back() {
        let time = ManualTime::default();
        let clock = clock_with(&time, SyntheticSource::new(&time, 0.0, 250, 0.0));
        assert_eq!(clock.fps(), FALLBACK_FPS);
        assert_eq!(clock.duration_ms(), 10000.0);
    }

    #[test]
    fn test_failed_load_leaves_state_untouched() {
        let time = ManualTime::default();
        let mut clock = clock_with(&time, SyntheticSource::new(&time, 25.0, 15000, 0.0));
        clock.seek(15000.0).unwrap();

        let mut broken = SyntheticSource::new(&time, 30.0, 10, 0.0);
        broken.fail = true;
        assert!(clock.load(Box::new(broken)).is_err());
        assert_eq!(clock.position_ms(), 15000.0);
        assert_eq!(clock.duration_ms(), 600000.0);
        assert_eq!(clock.fps(), 25.0);
        assert!(clock.is_loaded());
    }

    #[test]
    fn test_frame_step_three_times() {
        let time = ManualTime::default();
        let mut clock = clock_with(&time, SyntheticSource::new(&time, 25.0, 15000, 5.0));
        clock.seek(15000.0).unwrap();
        clock.set_rate(0.0);
        for _ in 0..3 {
            clock.play().unwrap();
            assert!(!clock.is_playing());
        }
        assert_eq!(clock.position_ms(), 15120.0);
        assert!(clock.time_until_next_tick().is_none());
    }

    #[test]
    fn test_step_forces_pause() {
        let time = ManualTime::default();
        let mut clock = clock_with(&time, SyntheticSource::new(&time, 25.0, 100, 0.0));
        clock.play().unwrap();
        assert!(clock.is_playing());
        clock.step_forward().unwrap();
        assert!(!clock.is_playing());
        assert!(clock.time_until_next_tick().is_none());
    }

    #[test]
    fn test_drift_stays_within_one_frame() {
        for rate in [1.0, 0.5, 2.0] {
            let time = ManualTime::default();
            let mut clock = clock_with(&time, SyntheticSource::new(&time, 25.0, 15000, 10.0));
            let interval = clock.frame_interval_ms();
            clock.set_rate(rate);
            clock.play().unwrap();
            let wall_start = time.now_ms();

            for n in 1..=500u32 {
                assert!(run_tick(&mut clock, &time));
                let ideal = n as f64 * interval;
                assert!((clock.position_ms() - ideal).abs() < interval);
                // The wall clock agrees with the video position within a frame.
                let wall_video = (time.now_ms() - wall_start) * rate;
                assert!(
                    (clock.position_ms() - wall_video).abs() < interval,
                    "rate {} tick {}: position {} wall {}",
                    rate,
                    n,
                    clock.position_ms(),
                    wall_video
                );
            }
        }
    }

    #[test]
    fn test_slow_host_catches_up() {
        let time = ManualTime::default();
        let mut clock = clock_with(&time, SyntheticSource::new(&time, 25.0, 15000, 10.0));
        clock.play().unwrap();
        run_tick(&mut clock, &time);
        // The host stalls for several frames.
        time.advance(200.0);
        clock.poll().unwrap();
        let wait = clock.next_tick_ms.unwrap() - time.now_ms();
        assert!(wait <= 15.0 + 1e-9, "delay {} should be halved", wait);
    }

    #[test]
    fn test_end_of_stream_pauses_without_error() {
        let time = ManualTime::default();
        let mut clock = clock_with(&time, SyntheticSource::new(&time, 25.0, 3, 1.0));
        clock.play().unwrap();
        for _ in 0..3 {
            assert!(run_tick(&mut clock, &time));
        }
        assert!(!run_tick(&mut clock, &time));
        assert!(!clock.is_playing());
        assert!(clock.drain_events().contains(&PlaybackEvent::EndOfStream));
        assert!(clock.time_until_next_tick().is_none());
    }

    #[test]
    fn test_pause_cancels_pending_tick() {
        let time = ManualTime::default();
        let mut clock = clock_with(&time, SyntheticSource::new(&time, 25.0, 100, 0.0));
        clock.play().unwrap();
        run_tick(&mut clock, &time);
        let position = clock.position_ms();
        clock.pause();
        time.advance(1000.0);
        assert!(!clock.poll().unwrap());
        assert_eq!(clock.position_ms(), position);
    }

    #[test]
    fn test_stop_rewinds_and_cancels_tick() {
        let time = ManualTime::default();
        let mut clock = clock_with(&time, SyntheticSource::new(&time, 25.0, 15000, 0.0));
        clock.play().unwrap();
        for _ in 0..5 {
            run_tick(&mut clock, &time);
        }
        assert!(clock.position_ms() > 0.0);
        clock.drain_events();

        clock.stop().unwrap();
        assert!(!clock.is_playing());
        assert_eq!(clock.position_ms(), 0.0);
        assert!(clock.time_until_next_tick().is_none());
        assert!(clock.drain_events().contains(&PlaybackEvent::StateChanged { playing: false }));

        time.advance(1000.0);
        assert!(!clock.poll().unwrap());
        assert_eq!(clock.position_ms(), 0.0);
    }

    #[test]
    fn test_seek_while_playing_reanchors() {
        let time = ManualTime::default();
        let mut clock = clock_with(&time, SyntheticSource::new(&time, 25.0, 15000, 0.0));
        clock.play().unwrap();
        for _ in 0..10 {
            run_tick(&mut clock, &time);
        }
        clock.seek(60000.0).unwrap();
        assert_eq!(clock.position_ms(), 60000.0);
        assert!(run_tick(&mut clock, &time));
        assert_eq!(clock.position_ms(), 60040.0);
        assert!(clock.is_playing());
    }

    #[test]
    fn test_play_without_media() {
        let mut clock = PlaybackClock::new(Box::new(ManualTime::default()));
        assert!(matches!(clock.play(), Err(PlaybackError::NoMedia)));
        assert!(matches!(clock.seek(10.0), Err(PlaybackError::NoMedia)));
    }
}
