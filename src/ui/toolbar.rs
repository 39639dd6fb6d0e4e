// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Toolbar: drawing tools, colour, stroke and playback rate.

use egui::Color32;

use crate::models::annotation::{LineStyle, PolygonFill};
use crate::scene::Tool;

/// Result of toolbar interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolbarAction {
    SetTool(Tool),
    SetColor(Color32),
    SetWidth(f32),
    SetLineStyle(LineStyle),
    SetPolygonFill(PolygonFill, f32),
    SetRate(f64),
    ResetZoom,
}

/// What the toolbar displays.
pub struct ToolbarState<'a> {
    pub tool: Tool,
    pub color: Color32,
    pub width: f32,
    pub line_style: LineStyle,
    pub polygon_fill: PolygonFill,
    pub polygon_opacity: f32,
    pub rate: f64,
    pub zoom: f32,
    pub palette: &'a [Color32],
    pub rates: &'a [f64],
}

/// Label for a playback rate; zero is frame-by-frame.
pub fn rate_label(rate: f64) -> String {
    if rate <= 0.0 {
        "Frame by frame".to_string()
    } else {
        format!("{}x", rate)
    }
}

/// Display the toolbar with tool selection buttons.
pub fn show(ui: &mut egui::Ui, state: &ToolbarState) -> Vec<ToolbarAction> {
    let mut actions = Vec::new();

    ui.horizontal_wrapped(|ui| {
        ui.spacing_mut().item_spacing.x = 6.0;
        ui.label("Tools:");
        ui.separator();
        for tool in Tool::ALL {
            if ui.selectable_label(state.tool == tool, tool.label()).clicked() && state.tool != tool {
                actions.push(ToolbarAction::SetTool(tool));
            }
        }
    });

    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        for &swatch in state.palette {
            let (rect, response) = ui.allocate_exact_size(egui::vec2(18.0, 18.0), egui::Sense::click());
            ui.painter().rect_filled(rect, 2.0, swatch);
            if swatch == state.color {
                ui.painter()
                    .rect_stroke(rect.expand(2.0), 2.0, egui::Stroke::new(2.0, Color32::WHITE));
            }
            if response.clicked() {
                actions.push(ToolbarAction::SetColor(swatch));
            }
        }
        let mut custom = state.color;
        if ui.color_edit_button_srgba(&mut custom).changed() {
            actions.push(ToolbarAction::SetColor(custom));
        }

        ui.separator();

        let mut width = state.width;
        if ui
            .add(egui::Slider::new(&mut width, 1.0..=20.0).step_by(1.0).text("Width"))
            .changed()
        {
            actions.push(ToolbarAction::SetWidth(width));
        }

        let mut style = state.line_style;
        egui::ComboBox::from_id_source("line_style")
            .selected_text(style.label())
            .show_ui(ui, |ui| {
                for option in LineStyle::ALL {
                    ui.selectable_value(&mut style, option, option.label());
                }
            });
        if style != state.line_style {
            actions.push(ToolbarAction::SetLineStyle(style));
        }

        if state.tool == Tool::Polygon {
            let mut fill = state.polygon_fill;
            let mut opacity = state.polygon_opacity;
            ui.selectable_value(&mut fill, PolygonFill::Solid, "Solid");
            ui.selectable_value(&mut fill, PolygonFill::Stripes, "Stripes");
            let slider = ui.add(egui::Slider::new(&mut opacity, 0.2..=0.6).text("Opacity"));
            if fill != state.polygon_fill || slider.changed() {
                actions.push(ToolbarAction::SetPolygonFill(fill, opacity));
            }
        }

        ui.separator();

        let mut rate = state.rate;
        egui::ComboBox::from_id_source("playback_rate")
            .selected_text(rate_label(rate))
            .show_ui(ui, |ui| {
                for &option in state.rates {
                    ui.selectable_value(&mut rate, option, rate_label(option));
                }
            });
        if rate != state.rate {
            actions.push(ToolbarAction::SetRate(rate));
        }

        if state.zoom > 1.0 {
            ui.label(format!("Zoom {:.1}x", state.zoom));
            if ui.small_button("Reset").clicked() {
                actions.push(ToolbarAction::ResetZoom);
            }
        }

        ui.separator();
        ui.label(egui::RichText::new(state.tool.hint()).italics().weak());
    });

    actions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_labels() {
        assert_eq!(rate_label(0.0), "Frame by frame");
        assert_eq!(rate_label(0.25), "0.25x");
        assert_eq!(rate_label(2.0), "2x");
    }
}
