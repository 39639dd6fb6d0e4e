// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Frame sink: puts decoded frames on screen, fitted and zoomed.
//!
//! A frame is first aspect-fitted into the viewport (zoom level 1). Zooming
//! scales that fitted rectangle about an anchor and the result is clipped
//! to the fitted rectangle, so the zoomed image always covers it.

use egui::{Color32, Pos2, Rect, TextureHandle, TextureOptions, Vec2};

use crate::io::media::Frame;

pub const MIN_ZOOM: f32 = 1.0;
pub const MAX_ZOOM: f32 = 5.0;

/// Wheel delta that corresponds to one zoom step.
pub const WHEEL_STEP: f32 = 1200.0;

/// Zoom level plus the offset of the zoomed image from the fitted one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomState {
    level: f32,
    offset: Vec2,
}

impl Default for ZoomState {
    fn default() -> Self {
        Self {
            level: MIN_ZOOM,
            offset: Vec2::ZERO,
        }
    }
}

impl ZoomState {
    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Where the whole zoomed image lands, given the fitted rectangle.
    pub fn image_rect(&self, fitted: Rect) -> Rect {
        Rect::from_min_size(fitted.min + self.offset, fitted.size() * self.level)
    }

    /// Change the level, keeping the image point under `anchor` fixed.
    pub fn zoom_to(&mut self, level: f32, anchor: Pos2, fitted: Rect) {
        let level = level.clamp(MIN_ZOOM, MAX_ZOOM);
        let current = self.image_rect(fitted);
        if current.width() <= 0.0 || current.height() <= 0.0 {
            return;
        }
        let anchor = fitted.clamp(anchor);
        let u = (anchor - current.min) / current.size();
        let new_min = anchor - u * fitted.size() * level;

        self.level = level;
        self.offset = new_min - fitted.min;
        self.clamp_offset(fitted);
    }

    /// Apply a wheel delta: the level is multiplied by `1 + delta / 1200`.
    pub fn zoom_by_wheel(&mut self, delta: f32, anchor: Pos2, fitted: Rect) {
        let factor = 1.0 + delta / WHEEL_STEP;
        self.zoom_to(self.level * factor, anchor, fitted);
    }

    fn clamp_offset(&mut self, fitted: Rect) {
        let slack = fitted.size() * (1.0 - self.level);
        self.offset.x = self.offset.x.clamp(slack.x.min(0.0), 0.0);
        self.offset.y = self.offset.y.clamp(slack.y.min(0.0), 0.0);
    }
}

/// Largest rectangle with the frame's aspect ratio centred in `viewport`.
pub fn fit_rect(frame_size: Vec2, viewport: Rect) -> Rect {
    if frame_size.x <= 0.0 || frame_size.y <= 0.0 {
        return viewport;
    }
    let scale = (viewport.width() / frame_size.x).min(viewport.height() / frame_size.y);
    Rect::from_center_size(viewport.center(), frame_size * scale)
}

/// Screen placement of a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameLayout {
    /// The visible area (clip rectangle).
    pub fitted: Rect,
    /// The whole zoomed image, possibly larger than `fitted`.
    pub image: Rect,
}

pub fn compute_layout(frame_size: Vec2, viewport: Rect, zoom: &ZoomState) -> FrameLayout {
    let fitted = fit_rect(frame_size, viewport);
    FrameLayout {
        fitted,
        image: zoom.image_rect(fitted),
    }
}

/// Owns the GPU texture of the current frame.
#[derive(Default)]
pub struct FrameSink {
    texture: Option<TextureHandle>,
    size: Vec2,
}

impl FrameSink {
    pub fn has_frame(&self) -> bool {
        self.texture.is_some()
    }

    pub fn frame_size(&self) -> Vec2 {
        self.size
    }

    /// Upload a decoded frame, reusing the texture when there is one.
    pub fn update(&mut self, ctx: &egui::Context, frame: &Frame) {
        let image = frame.to_color_image();
        self.size = Vec2::new(frame.width as f32, frame.height as f32);
        match &mut self.texture {
            Some(texture) => texture.set(image, TextureOptions::LINEAR),
            None => self.texture = Some(ctx.load_texture("video_frame", image, TextureOptions::LINEAR)),
        }
    }

    /// Paint the frame into `viewport`. Returns the layout used, or `None`
    /// when there is nothing to show.
    pub fn paint(&self, painter: &egui::Painter, viewport: Rect, zoom: &ZoomState) -> Option<FrameLayout> {
        let texture = self.texture.as_ref()?;
        let layout = compute_layout(self.size, viewport, zoom);
        let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
        painter
            .with_clip_rect(layout.fitted)
            .image(texture.id(), layout.image, uv, Color32::WHITE);
        Some(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Rect {
        Rect::from_min_size(Pos2::ZERO, Vec2::new(800.0, 600.0))
    }

    #[test]
    fn test_fit_letterboxes_wide_frame() {
        let fitted = fit_rect(Vec2::new(1920.0, 1080.0), viewport());
        assert_eq!(fitted.width(), 800.0);
        assert_eq!(fitted.height(), 450.0);
        assert_eq!(fitted.min.y, 75.0);
    }

    #[test]
    fn test_zoom_keeps_anchor_fixed() {
        let fitted = Rect::from_min_size(Pos2::ZERO, Vec2::new(800.0, 450.0));
        let mut zoom = ZoomState::default();
        let anchor = Pos2::new(200.0, 100.0);
        zoom.zoom_to(2.0, anchor, fitted);

        let image = zoom.image_rect(fitted);
        assert_eq!(image.size(), Vec2::new(1600.0, 900.0));
        // The frame point that was under the anchor is still there.
        let u = (anchor - image.min) / image.size();
        assert!((u.x - 0.25).abs() < 1e-5);
        assert!((u.y - 100.0 / 450.0).abs() < 1e-5);
    }

    #[test]
    fn test_zoom_is_clamped_and_covers_view() {
        let fitted = Rect::from_min_size(Pos2::new(0.0, 75.0), Vec2::new(800.0, 450.0));
        let mut zoom = ZoomState::default();
        zoom.zoom_to(9.0, Pos2::new(790.0, 500.0), fitted);
        assert_eq!(zoom.level(), MAX_ZOOM);
        let image = zoom.image_rect(fitted);
        assert!(image.contains_rect(fitted));

        zoom.zoom_by_wheel(-1200.0, Pos2::new(10.0, 80.0), fitted);
        assert_eq!(zoom.level(), MIN_ZOOM);
        assert_eq!(zoom.image_rect(fitted), fitted);
    }

    #[test]
    fn test_wheel_factor() {
        let fitted = viewport();
        let mut zoom = ZoomState::default();
        zoom.zoom_by_wheel(120.0, fitted.center(), fitted);
        assert!((zoom.level() - 1.1).abs() < 1e-5);
        zoom.zoom_by_wheel(120.0, fitted.center(), fitted);
        assert!((zoom.level() - 1.21).abs() < 1e-5);
    }
}
