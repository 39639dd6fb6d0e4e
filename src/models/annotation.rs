// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation record data structures.
//!
//! This module defines the durable, behaviour-free form of a drawing as it
//! is stored inside an event's annotation list. Records use absolute frame
//! coordinates, hex colour strings and plain enums so they survive a JSON
//! round-trip. Older files are still readable: legacy field names and the
//! single-letter path encoding are accepted as aliases.

use serde::{Deserialize, Serialize};

/// Stroke width used when a record does not carry one.
pub const DEFAULT_STROKE_WIDTH: f32 = 8.0;

/// Colour used when a record does not carry one.
pub const DEFAULT_COLOR: &str = "#FFFF00";

pub const DEFAULT_FONT_FAMILY: &str = "Segoe UI";
pub const DEFAULT_FONT_SIZE: f32 = 24.0;
pub const BOLD_WEIGHT: u16 = 700;
pub const NORMAL_WEIGHT: u16 = 400;

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

fn default_width() -> f32 {
    DEFAULT_STROKE_WIDTH
}

/// A 2D point in frame (scene) pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<egui::Pos2> for Point {
    fn from(p: egui::Pos2) -> Self {
        Self { x: p.x, y: p.y }
    }
}

impl From<Point> for egui::Pos2 {
    fn from(p: Point) -> Self {
        egui::pos2(p.x, p.y)
    }
}

/// Axis-aligned rectangle as `{x, y, w, h}`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RectData {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub w: f32,
    #[serde(default)]
    pub h: f32,
}

/// Stroke style shared by arrows and lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LineStyle {
    #[default]
    #[serde(rename = "straight", alias = "Freccia/Linea")]
    Straight,
    #[serde(rename = "dashed", alias = "Freccia/Linea - Trattino")]
    Dashed,
    #[serde(rename = "zigzag", alias = "Freccia/Linea - A zig zag")]
    Zigzag,
}

impl LineStyle {
    pub const ALL: [LineStyle; 3] = [LineStyle::Straight, LineStyle::Dashed, LineStyle::Zigzag];

    pub fn label(self) -> &'static str {
        match self {
            LineStyle::Straight => "Straight",
            LineStyle::Dashed => "Dashed",
            LineStyle::Zigzag => "Zigzag",
        }
    }
}

/// In-memory path command in scene or shape-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo(egui::Pos2),
    LineTo(egui::Pos2),
    CubicTo(egui::Pos2, egui::Pos2, egui::Pos2),
}

/// Verb of a serialized path point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathVerb {
    #[serde(rename = "move", alias = "M")]
    Move,
    #[serde(rename = "line", alias = "L")]
    Line,
    /// Three consecutive curve points make one cubic segment.
    #[serde(rename = "curve", alias = "C", alias = "D")]
    Curve,
}

/// One serialized path point: `{cmd, x, y}` (legacy: `{t, x, y}`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    #[serde(alias = "t")]
    pub cmd: PathVerb,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
}

/// Font description for text annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontData {
    #[serde(default = "default_font_family")]
    pub family: String,
    #[serde(rename = "pointSize", alias = "point_size", default = "default_font_size")]
    pub point_size: f32,
    #[serde(default = "default_font_weight")]
    pub weight: u16,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
}

fn default_font_family() -> String {
    DEFAULT_FONT_FAMILY.to_string()
}

fn default_font_size() -> f32 {
    DEFAULT_FONT_SIZE
}

fn default_font_weight() -> u16 {
    BOLD_WEIGHT
}

impl Default for FontData {
    fn default() -> Self {
        Self {
            family: default_font_family(),
            point_size: DEFAULT_FONT_SIZE,
            weight: BOLD_WEIGHT,
            italic: false,
            underline: false,
        }
    }
}

impl FontData {
    /// Bold test that also understands the old 0..99 weight scale.
    pub fn is_bold(&self) -> bool {
        if self.weight < 100 {
            self.weight >= 63
        } else {
            self.weight >= 600
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolygonFill {
    #[default]
    Solid,
    Stripes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineData {
    pub color: String,
    #[serde(default = "default_outline_width")]
    pub width: f32,
}

fn default_outline_width() -> f32 {
    2.0
}

/// Circle or rectangle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxRecord {
    pub rect: RectData,
    /// Legacy offset folded into `rect` when read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<Point>,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_width", alias = "pen_width")]
    pub width: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrowRecord {
    pub p1: Point,
    pub p2: Point,
    #[serde(default)]
    pub style: LineStyle,
    /// Second head at `p1`.
    #[serde(default, alias = "head_start")]
    pub double_head: bool,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_width", alias = "pen_width")]
    pub width: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineRecord {
    pub p1: Point,
    pub p2: Point,
    #[serde(default)]
    pub style: LineStyle,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_width", alias = "pen_width")]
    pub width: f32,
}

/// Quadratic curve: curved line, curved arrow or parabola arrow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveRecord {
    pub p1: Point,
    pub ctrl: Point,
    pub p2: Point,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_width", alias = "pen_width")]
    pub width: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreehandRecord {
    pub path: Vec<PathPoint>,
    /// Legacy offset folded into `path` when read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<Point>,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_width", alias = "pen_width")]
    pub width: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConeRecord {
    pub points: Vec<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<Point>,
    #[serde(default = "default_color")]
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonRecord {
    pub points: Vec<Point>,
    #[serde(default)]
    pub fill: PolygonFill,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_width", alias = "pen_width")]
    pub width: f32,
}

fn default_opacity() -> f32 {
    0.35
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRecord {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub pos: Point,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub font: FontData,
    #[serde(default)]
    pub align: TextAlign,
    #[serde(default = "default_line_spacing")]
    pub line_spacing: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline: Option<OutlineData>,
}

fn default_line_spacing() -> f32 {
    1.0
}

/// A stored annotation, tagged by its `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnnotationRecord {
    Circle(BoxRecord),
    Rectangle(BoxRecord),
    Arrow(ArrowRecord),
    Line(LineRecord),
    CurvedLine(CurveRecord),
    CurvedArrow(CurveRecord),
    ParabolaArrow(CurveRecord),
    Freehand(FreehandRecord),
    Cone(ConeRecord),
    Polygon(PolygonRecord),
    Text(TextRecord),
}

impl AnnotationRecord {
    /// The `type` tag as written to disk.
    pub fn type_name(&self) -> &'static str {
        match self {
            AnnotationRecord::Circle(_) => "circle",
            AnnotationRecord::Rectangle(_) => "rectangle",
            AnnotationRecord::Arrow(_) => "arrow",
            AnnotationRecord::Line(_) => "line",
            AnnotationRecord::CurvedLine(_) => "curved_line",
            AnnotationRecord::CurvedArrow(_) => "curved_arrow",
            AnnotationRecord::ParabolaArrow(_) => "parabola_arrow",
            AnnotationRecord::Freehand(_) => "freehand",
            AnnotationRecord::Cone(_) => "cone",
            AnnotationRecord::Polygon(_) => "polygon",
            AnnotationRecord::Text(_) => "text",
        }
    }
}
