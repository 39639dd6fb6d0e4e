// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Transport controls and the scrubber, with event markers.

use egui::{Color32, Pos2, Sense, Stroke, Vec2};

use crate::models::event::EventManager;
use crate::util::color::parse_hex_or;

#[derive(Debug, Clone, PartialEq)]
pub enum TimelineAction {
    TogglePlay,
    Stop,
    Step,
    Seek(f64),
    PreviousEvent,
    NextEvent,
}

/// Playback state shown by the timeline.
pub struct TimelineState<'a> {
    pub position_ms: f64,
    pub duration_ms: f64,
    pub playing: bool,
    pub frame_step: bool,
    pub loaded: bool,
    pub events: &'a EventManager,
}

/// `mm:ss.mmm`, with hours when needed.
pub fn format_time(ms: f64) -> String {
    let total = ms.max(0.0).round() as u64;
    let (hours, rest) = (total / 3_600_000, total % 3_600_000);
    let (minutes, rest) = (rest / 60_000, rest % 60_000);
    let (seconds, millis) = (rest / 1000, rest % 1000);
    if hours > 0 {
        format!("{}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
    } else {
        format!("{:02}:{:02}.{:03}", minutes, seconds, millis)
    }
}

pub fn show(ui: &mut egui::Ui, state: &TimelineState) -> Vec<TimelineAction> {
    let mut actions = Vec::new();

    ui.add_enabled_ui(state.loaded, |ui| {
        ui.horizontal(|ui| {
            if ui.button("⏮").on_hover_text("Previous event").clicked() {
                actions.push(TimelineAction::PreviousEvent);
            }
            let play_label = if state.playing {
                "⏸ Pause"
            } else if state.frame_step {
                "⏵ Step"
            } else {
                "▶ Play"
            };
            if ui.button(play_label).on_hover_text("Space").clicked() {
                actions.push(TimelineAction::TogglePlay);
            }
            if ui.button("⏹").on_hover_text("Stop").clicked() {
                actions.push(TimelineAction::Stop);
            }
            if ui.button("⏭ Frame").on_hover_text("Next frame (→)").clicked() {
                actions.push(TimelineAction::Step);
            }
            if ui.button("⏭").on_hover_text("Next event").clicked() {
                actions.push(TimelineAction::NextEvent);
            }
            ui.separator();
            ui.monospace(format!(
                "{} / {}",
                format_time(state.position_ms),
                format_time(state.duration_ms)
            ));
        });

        if let Some(seek) = scrubber(ui, state) {
            actions.push(TimelineAction::Seek(seek));
        }
    });

    actions
}

/// A bar with a playhead and one tick per event. Click or drag to seek.
fn scrubber(ui: &mut egui::Ui, state: &TimelineState) -> Option<f64> {
    let width = ui.available_width();
    let (rect, response) = ui.allocate_exact_size(Vec2::new(width, 22.0), Sense::click_and_drag());
    let painter = ui.painter_at(rect);
    painter.rect_filled(rect, 3.0, Color32::from_gray(45));

    let duration = state.duration_ms.max(1.0);
    let x_of = |ms: f64| rect.left() + (ms / duration).clamp(0.0, 1.0) as f32 * rect.width();

    for event in &state.events.events {
        let color = state
            .events
            .event_type(&event.event_type_id)
            .map(|t| parse_hex_or(&t.color, Color32::WHITE))
            .unwrap_or(Color32::WHITE);
        let x = x_of(event.timestamp_ms as f64);
        painter.line_segment(
            [Pos2::new(x, rect.top() + 3.0), Pos2::new(x, rect.bottom() - 3.0)],
            Stroke::new(2.0, color),
        );
    }

    let head = x_of(state.position_ms);
    painter.rect_filled(
        egui::Rect::from_min_max(rect.left_top(), Pos2::new(head, rect.bottom())),
        3.0,
        Color32::from_rgba_unmultiplied(80, 140, 255, 60),
    );
    painter.line_segment(
        [Pos2::new(head, rect.top()), Pos2::new(head, rect.bottom())],
        Stroke::new(2.0, Color32::WHITE),
    );

    if response.clicked() || response.dragged() {
        let pointer = response.interact_pointer_pos()?;
        let fraction = ((pointer.x - rect.left()) / rect.width()).clamp(0.0, 1.0) as f64;
        return Some(fraction * state.duration_ms);
    }
    None
}
