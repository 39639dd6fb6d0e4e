// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Side panel: event list, selected-drawing properties and clip export.
//!
//! The panel never mutates the project or the scene itself. It reports what
//! the user asked for and the app applies it.

use egui::{Color32, RichText};

use crate::models::annotation::{TextAlign, BOLD_WEIGHT, NORMAL_WEIGHT};
use crate::models::event::{EventManager, ANNOTATION_EVENT_TYPE};
use crate::scene::shape::{Shape, TextShape};
use crate::ui::timeline::format_time;
use crate::util::color::parse_hex_or;

const DEFAULT_OUTLINE_WIDTH: f32 = 2.0;

/// A single change to the selected text.
#[derive(Debug, Clone, PartialEq)]
pub enum TextStyle {
    Size(f32),
    Bold(bool),
    Italic(bool),
    Underline(bool),
    Align(TextAlign),
    Fill(Option<Color32>),
    Outline(Option<(Color32, f32)>),
}

impl TextStyle {
    pub fn apply(&self, text: &mut TextShape) {
        match *self {
            TextStyle::Size(size) => text.font.point_size = size.clamp(6.0, 200.0),
            TextStyle::Bold(bold) => text.font.weight = if bold { BOLD_WEIGHT } else { NORMAL_WEIGHT },
            TextStyle::Italic(italic) => text.font.italic = italic,
            TextStyle::Underline(underline) => text.font.underline = underline,
            TextStyle::Align(align) => text.align = align,
            TextStyle::Fill(fill) => text.fill = fill,
            TextStyle::Outline(outline) => text.outline = outline,
        }
    }
}

/// Result of properties panel interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertiesAction {
    AddEvent(String),
    SelectEvent(String),
    DeleteEvent(String),
    RenameEvent(String, String),
    RecolorSelected(Color32),
    SetSelectedWidth(f32),
    StyleText(TextStyle),
    DeleteSelected,
    DuplicateSelected,
    CopySelected,
    Paste,
    ClipEvent(String),
    MarkRangeStart,
    ClipRange,
    ExportHighlights,
}

/// What the panel displays.
pub struct PropertiesState<'a> {
    pub events: &'a EventManager,
    pub selected_event: Option<&'a str>,
    pub selected_shape: Option<&'a Shape>,
    pub has_clipboard: bool,
    pub position_ms: f64,
    pub range_start: Option<u64>,
    pub loaded: bool,
    /// A clip job is running.
    pub clip_busy: bool,
    /// Label being typed for the selected event.
    pub label_draft: &'a mut String,
}

pub fn show(ui: &mut egui::Ui, state: &mut PropertiesState) -> Vec<PropertiesAction> {
    let mut actions = Vec::new();

    ui.heading("Events");
    ui.add_enabled_ui(state.loaded, |ui| {
        ui.horizontal_wrapped(|ui| {
            for event_type in &state.events.event_types {
                if event_type.id == ANNOTATION_EVENT_TYPE {
                    continue;
                }
                let text = RichText::new(format!("{} {}", event_type.icon, event_type.name))
                    .color(parse_hex_or(&event_type.color, Color32::WHITE));
                if ui.button(text).on_hover_text("Add at current time").clicked() {
                    actions.push(PropertiesAction::AddEvent(event_type.id.clone()));
                }
            }
        });
    });
    ui.separator();

    event_list(ui, state, &mut actions);
    ui.separator();

    selection(ui, state, &mut actions);
    ui.separator();

    clips(ui, state, &mut actions);

    actions
}

fn event_list(ui: &mut egui::Ui, state: &mut PropertiesState, actions: &mut Vec<PropertiesAction>) {
    if state.events.events.is_empty() {
        ui.label(RichText::new("No events yet").weak());
        return;
    }

    egui::ScrollArea::vertical()
        .id_source("event_list")
        .max_height(260.0)
        .show(ui, |ui| {
            for event in &state.events.events {
                let selected = state.selected_event == Some(event.id.as_str());
                let icon = state
                    .events
                    .event_type(&event.event_type_id)
                    .map(|t| t.icon.as_str())
                    .unwrap_or("•");
                ui.horizontal(|ui| {
                    let label = format!(
                        "{} {}  {}",
                        icon,
                        format_time(event.timestamp_ms as f64),
                        state.events.display_label(event)
                    );
                    if ui.selectable_label(selected, label).clicked() {
                        actions.push(PropertiesAction::SelectEvent(event.id.clone()));
                    }
                    if !event.annotations.is_empty() {
                        ui.label(RichText::new(format!("✏{}", event.annotations.len())).weak());
                    }
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.small_button("🗑").on_hover_text("Delete event").clicked() {
                            actions.push(PropertiesAction::DeleteEvent(event.id.clone()));
                        }
                    });
                });
            }
        });

    let Some(event_id) = state.selected_event else {
        return;
    };
    ui.horizontal(|ui| {
        ui.label("Label:");
        let response = ui.text_edit_singleline(&mut *state.label_draft);
        let enter = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
        if ui.button("Rename").clicked() || enter {
            actions.push(PropertiesAction::RenameEvent(event_id.to_string(), state.label_draft.clone()));
        }
    });
}

fn selection(ui: &mut egui::Ui, state: &PropertiesState, actions: &mut Vec<PropertiesAction>) {
    ui.heading("Drawing");
    let Some(shape) = state.selected_shape else {
        ui.label(RichText::new("Nothing selected").weak());
        if state.has_clipboard && ui.button("📋 Paste").clicked() {
            actions.push(PropertiesAction::Paste);
        }
        return;
    };

    ui.label(shape.kind.name());
    ui.horizontal(|ui| {
        let mut color = shape.color;
        ui.label("Colour");
        if ui.color_edit_button_srgba(&mut color).changed() {
            actions.push(PropertiesAction::RecolorSelected(color));
        }
    });

    match shape.as_text() {
        Some(text) => text_properties(ui, text, actions),
        None => {
            let mut width = shape.width;
            if ui
                .add(egui::Slider::new(&mut width, 1.0..=20.0).step_by(1.0).text("Width"))
                .changed()
            {
                actions.push(PropertiesAction::SetSelectedWidth(width));
            }
        }
    }

    ui.horizontal(|ui| {
        if ui.button("Duplicate").on_hover_text("Ctrl+D").clicked() {
            actions.push(PropertiesAction::DuplicateSelected);
        }
        if ui.button("Copy").on_hover_text("Ctrl+C").clicked() {
            actions.push(PropertiesAction::CopySelected);
        }
        if ui.add_enabled(state.has_clipboard, egui::Button::new("Paste")).clicked() {
            actions.push(PropertiesAction::Paste);
        }
        if ui.button("🗑 Delete").on_hover_text("Del").clicked() {
            actions.push(PropertiesAction::DeleteSelected);
        }
    });
}

fn text_properties(ui: &mut egui::Ui, text: &TextShape, actions: &mut Vec<PropertiesAction>) {
    let mut size = text.font.point_size;
    if ui.add(egui::Slider::new(&mut size, 6.0..=120.0).text("Size")).changed() {
        actions.push(PropertiesAction::StyleText(TextStyle::Size(size)));
    }

    ui.horizontal(|ui| {
        let mut bold = text.font.is_bold();
        if ui.toggle_value(&mut bold, RichText::new("B").strong()).changed() {
            actions.push(PropertiesAction::StyleText(TextStyle::Bold(bold)));
        }
        let mut italic = text.font.italic;
        if ui.toggle_value(&mut italic, RichText::new("I").italics()).changed() {
            actions.push(PropertiesAction::StyleText(TextStyle::Italic(italic)));
        }
        let mut underline = text.font.underline;
        if ui.toggle_value(&mut underline, RichText::new("U").underline()).changed() {
            actions.push(PropertiesAction::StyleText(TextStyle::Underline(underline)));
        }
        ui.separator();
        let mut align = text.align;
        ui.selectable_value(&mut align, TextAlign::Left, "⬅");
        ui.selectable_value(&mut align, TextAlign::Center, "↔");
        ui.selectable_value(&mut align, TextAlign::Right, "➡");
        if align != text.align {
            actions.push(PropertiesAction::StyleText(TextStyle::Align(align)));
        }
    });

    ui.horizontal(|ui| {
        let mut has_fill = text.fill.is_some();
        let mut fill = text.fill.unwrap_or(Color32::from_black_alpha(160));
        let toggled = ui.checkbox(&mut has_fill, "Background").changed();
        let picked = has_fill && ui.color_edit_button_srgba(&mut fill).changed();
        if toggled || picked {
            actions.push(PropertiesAction::StyleText(TextStyle::Fill(has_fill.then_some(fill))));
        }
    });

    ui.horizontal(|ui| {
        let (mut color, mut width) = text.outline.unwrap_or((Color32::BLACK, DEFAULT_OUTLINE_WIDTH));
        let mut has_outline = text.outline.is_some();
        let mut changed = ui.checkbox(&mut has_outline, "Outline").changed();
        if has_outline {
            changed |= ui.color_edit_button_srgba(&mut color).changed();
            changed |= ui.add(egui::DragValue::new(&mut width).clamp_range(1.0..=10.0)).changed();
        }
        if changed {
            actions.push(PropertiesAction::StyleText(TextStyle::Outline(
                has_outline.then_some((color, width)),
            )));
        }
    });
}

fn clips(ui: &mut egui::Ui, state: &PropertiesState, actions: &mut Vec<PropertiesAction>) {
    ui.heading("Highlights");
    let enabled = state.loaded && !state.clip_busy;
    ui.add_enabled_ui(enabled, |ui| {
        ui.horizontal_wrapped(|ui| {
            let event = state.selected_event;
            if ui
                .add_enabled(event.is_some(), egui::Button::new("✂ Clip event"))
                .clicked()
            {
                if let Some(id) = event {
                    actions.push(PropertiesAction::ClipEvent(id.to_string()));
                }
            }
            if ui.button("⏺ Mark start").clicked() {
                actions.push(PropertiesAction::MarkRangeStart);
            }
            let can_clip_range = state
                .range_start
                .is_some_and(|start| (start as f64) < state.position_ms);
            if ui
                .add_enabled(can_clip_range, egui::Button::new("✂ Clip to here"))
                .clicked()
            {
                actions.push(PropertiesAction::ClipRange);
            }
            if ui
                .add_enabled(!state.events.events.is_empty(), egui::Button::new("🎬 Export all"))
                .clicked()
            {
                actions.push(PropertiesAction::ExportHighlights);
            }
        });
    });
    if let Some(start) = state.range_start {
        ui.label(RichText::new(format!("Range start {}", format_time(start as f64))).weak());
    }
    if state.clip_busy {
        ui.horizontal(|ui| {
            ui.spinner();
            ui.label("Cutting clips...");
        });
    }
}
