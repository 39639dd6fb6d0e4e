// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Overlay tools.

use crate::models::annotation::LineStyle;

/// Current overlay tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    /// Select, move and resize; clicks on empty video create events.
    #[default]
    None,
    Circle,
    Rectangle,
    Arrow,
    Line,
    DashedArrow,
    ZigzagArrow,
    DoubleArrow,
    DashedLine,
    CurvedLine,
    CurvedArrow,
    ParabolaArrow,
    Pencil,
    Cone,
    Polygon,
    Text,
    Zoom,
}

/// How an arrow/line tool draws: stroke style, head, second head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrokeParams {
    pub style: LineStyle,
    pub is_arrow: bool,
    pub double_head: bool,
}

impl Tool {
    pub const ALL: [Tool; 17] = [
        Tool::None,
        Tool::Circle,
        Tool::Rectangle,
        Tool::Arrow,
        Tool::Line,
        Tool::DashedArrow,
        Tool::ZigzagArrow,
        Tool::DoubleArrow,
        Tool::DashedLine,
        Tool::CurvedLine,
        Tool::CurvedArrow,
        Tool::ParabolaArrow,
        Tool::Pencil,
        Tool::Cone,
        Tool::Polygon,
        Tool::Text,
        Tool::Zoom,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Tool::None => "⬆ Select",
            Tool::Circle => "◯ Circle",
            Tool::Rectangle => "▭ Rectangle",
            Tool::Arrow => "➡ Arrow",
            Tool::Line => "⟋ Line",
            Tool::DashedArrow => "⇢ Dashed arrow",
            Tool::ZigzagArrow => "↯ Zigzag arrow",
            Tool::DoubleArrow => "↔ Double arrow",
            Tool::DashedLine => "┅ Dashed line",
            Tool::CurvedLine => "⌒ Curve",
            Tool::CurvedArrow => "↷ Curved arrow",
            Tool::ParabolaArrow => "⤴ Lob arrow",
            Tool::Pencil => "✏ Pencil",
            Tool::Cone => "◭ Cone",
            Tool::Polygon => "▱ Zone",
            Tool::Text => "T Text",
            Tool::Zoom => "🔍 Zoom",
        }
    }

    pub fn hint(self) -> &'static str {
        match self {
            Tool::None => "Click a drawing to select it, drag to move, drag handles to resize. Click the video to add an event",
            Tool::Polygon => "Click to add vertices, click the first vertex or double-click to close",
            Tool::Text => "Click to place text, double-click existing text to edit",
            Tool::Zoom => "Scroll over the video to zoom towards the cursor",
            Tool::Pencil => "Drag to draw freehand",
            Tool::ParabolaArrow => "Drag from passer to receiver for a lofted ball",
            _ => "Drag on the video to draw",
        }
    }

    /// Tools that create shapes by press-drag-release.
    pub fn is_drag_tool(self) -> bool {
        !matches!(self, Tool::None | Tool::Zoom | Tool::Polygon | Tool::Text)
    }

    /// Tools that put something on the overlay.
    pub fn creates_shapes(self) -> bool {
        !matches!(self, Tool::None | Tool::Zoom)
    }

    /// Stroke parameters for the arrow/line family. Plain `Arrow` and `Line`
    /// use `current` (the style picked in the toolbar).
    pub fn stroke_params(self, current: LineStyle) -> Option<StrokeParams> {
        let params = |style, is_arrow, double_head| {
            Some(StrokeParams {
                style,
                is_arrow,
                double_head,
            })
        };
        match self {
            Tool::Arrow => params(current, true, false),
            Tool::Line => params(current, false, false),
            Tool::DashedArrow => params(LineStyle::Dashed, true, false),
            Tool::ZigzagArrow => params(LineStyle::Zigzag, true, false),
            Tool::DoubleArrow => params(LineStyle::Straight, true, true),
            Tool::DashedLine => params(LineStyle::Dashed, false, false),
            _ => None,
        }
    }
}
