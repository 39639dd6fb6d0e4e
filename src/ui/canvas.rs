// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Video canvas with the annotation overlay on top.
//!
//! Overlay coordinates are relative to the top-left of the canvas, so
//! drawings keep their place regardless of where the panel sits in the
//! window. Pointer input is translated and forwarded to the scene.

use egui::{Color32, CursorIcon, Pos2, Rect, Sense, Stroke, Vec2};

use crate::playback::sink::{fit_rect, FrameLayout};
use crate::playback::{FrameSink, ZoomState};
use crate::scene::render::Surface;
use crate::scene::{AnnotationScene, Interaction, Tool};

/// egui reports wheel movement in points; the zoom curve expects the
/// classic 120-per-notch units.
const WHEEL_POINTS_TO_DELTA: f32 = 120.0 / 50.0;

/// Smallest width of the inline text editor.
const MIN_EDITOR_WIDTH: f32 = 160.0;

/// Placement of the canvas for the frame just shown.
#[derive(Debug, Clone, Copy)]
pub struct CanvasOutput {
    /// Screen position of overlay coordinate (0, 0).
    pub origin: Pos2,
    /// Aspect-fitted frame rectangle on screen.
    pub fitted: Rect,
    pub layout: Option<FrameLayout>,
}

/// Display the canvas and feed pointer input to the scene.
pub fn show(
    ui: &mut egui::Ui,
    sink: &FrameSink,
    zoom: &ZoomState,
    scene: &mut AnnotationScene,
    frozen: bool,
) -> CanvasOutput {
    let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
    let origin = rect.min;
    let painter = ui.painter_at(rect);
    painter.rect_filled(rect, 0.0, Color32::from_gray(20));

    let layout = sink.paint(&painter, rect, zoom);
    if !sink.has_frame() {
        painter.text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            "Open a match video to begin (File → Open Video...)",
            egui::FontId::proportional(16.0),
            Color32::from_gray(160),
        );
    }

    handle_pointer(ui, &response, rect, scene);

    let mut surface = Surface::new(Some(ui.ctx()));
    scene.paint(&mut surface);
    let mut shapes = surface.into_shapes();
    for shape in &mut shapes {
        shape.translate(origin.to_vec2());
    }
    painter.extend(shapes);

    text_editor(ui, origin, scene);

    if frozen {
        painter.rect_stroke(rect.shrink(2.0), 0.0, Stroke::new(3.0, Color32::from_rgb(0, 170, 255)));
        painter.text(
            rect.left_top() + Vec2::new(12.0, 10.0),
            egui::Align2::LEFT_TOP,
            "❄ FROZEN",
            egui::FontId::proportional(14.0),
            Color32::from_rgb(0, 170, 255),
        );
    }

    if response.hovered() && scene.tool().creates_shapes() {
        ui.ctx().set_cursor_icon(CursorIcon::Crosshair);
    }

    CanvasOutput {
        origin,
        fitted: fit_rect(sink.frame_size(), rect),
        layout,
    }
}

fn handle_pointer(ui: &egui::Ui, response: &egui::Response, rect: Rect, scene: &mut AnnotationScene) {
    let to_scene = |p: Pos2| Pos2::new(p.x - rect.min.x, p.y - rect.min.y);
    let (pressed, released, moved, hover, scroll) = ui.input(|i| {
        (
            i.pointer.primary_pressed(),
            i.pointer.primary_released(),
            i.pointer.delta() != Vec2::ZERO,
            i.pointer.hover_pos(),
            i.raw_scroll_delta.y,
        )
    });
    let inside = hover.filter(|p| rect.contains(*p));

    if response.double_clicked() {
        if let Some(pos) = inside {
            scene.double_click(to_scene(pos));
        }
    } else if pressed && response.hovered() {
        if let Some(pos) = inside {
            scene.pointer_down(to_scene(pos));
        }
    }

    let tracking = !matches!(scene.interaction(), Interaction::Idle);
    if moved && tracking {
        if let Some(pos) = hover {
            scene.pointer_move(to_scene(rect.clamp(pos)));
        }
    }

    if released && tracking {
        let pos = hover.map(|p| rect.clamp(p)).unwrap_or(rect.center());
        scene.pointer_up(to_scene(pos));
    }

    if scroll != 0.0 && scene.tool() == Tool::Zoom {
        if let Some(pos) = inside {
            scene.scroll(scroll * WHEEL_POINTS_TO_DELTA, to_scene(pos));
        }
    }
}

/// Inline editor over the text being edited. Losing focus ends the edit.
fn text_editor(ui: &mut egui::Ui, origin: Pos2, scene: &mut AnnotationScene) {
    let Some(bounds) = scene.editing_text_rect() else {
        return;
    };
    let Some(color) = scene.selected_item().map(|item| item.shape.color) else {
        return;
    };
    let rect = Rect::from_min_size(
        bounds.min + origin.to_vec2(),
        Vec2::new(bounds.width().max(MIN_EDITOR_WIDTH), bounds.height().max(28.0)),
    );
    let Some(text) = scene.editing_text_mut() else {
        return;
    };
    let size = text.font.point_size;
    let response = ui.put(
        rect,
        egui::TextEdit::multiline(&mut text.content)
            .font(egui::FontId::proportional(size))
            .text_color(color)
            .frame(false)
            .hint_text("Type, then click elsewhere"),
    );
    if !response.has_focus() && !response.lost_focus() {
        response.request_focus();
    }
    if response.lost_focus() {
        scene.finish_text_edit();
    }
}
