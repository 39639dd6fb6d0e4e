// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Drawable shapes.
//!
//! A [`Shape`] is one interactively editable drawing on the video overlay:
//! its geometry (a [`ShapeKind`] variant), stroke colour and stroke width.
//! Every variant answers the same questions: where it is ([`Shape::bounds`]),
//! whether a point touches it ([`Shape::hit_test`]), where its resize
//! handles are, and how a handle drag changes it. Painting lives in
//! `scene::render`.
//!
//! All coordinates are overlay (scene) pixels.

use egui::{Color32, Pos2, Rect, Vec2};

use crate::models::annotation::{
    FontData, LineStyle, PathCommand, PolygonFill, TextAlign, DEFAULT_STROKE_WIDTH,
};
use crate::util::geometry;

/// Side of the square resize handle, in pixels.
pub const HANDLE_SIZE: f32 = 20.0;

/// Minimum width and height a circle or rectangle may be resized to.
pub const MIN_BOX_EXTENT: f32 = 15.0;

/// Minimum width and height a freehand stroke may be resized to.
pub const MIN_FREEHAND_EXTENT: f32 = 5.0;

/// Polygon fill opacity limits.
pub const MIN_FILL_OPACITY: f32 = 0.2;
pub const MAX_FILL_OPACITY: f32 = 0.6;

/// Arrow head base width as a multiple of the body width.
pub const HEAD_WIDTH_FACTOR: f32 = 2.5;

/// Sampling of ellipse outlines for hit testing and painting.
pub const ELLIPSE_SEGMENTS: usize = 72;

/// Quadratic curve through a control point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Curve {
    pub p1: Pos2,
    pub ctrl: Pos2,
    pub p2: Pos2,
}

impl Curve {
    pub fn points(&self) -> [Pos2; 3] {
        [self.p1, self.ctrl, self.p2]
    }

    fn point_mut(&mut self, index: usize) -> Option<&mut Pos2> {
        match index {
            0 => Some(&mut self.p1),
            1 => Some(&mut self.ctrl),
            2 => Some(&mut self.p2),
            _ => None,
        }
    }
}

/// Freehand stroke stored relative to the top-left of its bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct Freehand {
    pub origin: Pos2,
    pub path: Vec<PathCommand>,
}

impl Freehand {
    /// Build from a path in scene coordinates, normalising it so that the
    /// top-left of its control-point bounds becomes the local origin.
    pub fn from_scene_path(path: &[PathCommand]) -> Self {
        let origin = geometry::bounds_of(geometry::path_control_points(path))
            .map(|r| r.min)
            .unwrap_or(Pos2::ZERO);
        let local = geometry::map_path(path, |p| p - origin.to_vec2());
        Self {
            origin,
            path: local,
        }
    }

    /// The path in scene coordinates.
    pub fn scene_path(&self) -> Vec<PathCommand> {
        let offset = self.origin.to_vec2();
        geometry::map_path(&self.path, |p| p + offset)
    }

    pub fn bounds(&self) -> Rect {
        let local = geometry::bounds_of(geometry::path_control_points(&self.path))
            .unwrap_or(Rect::from_min_size(Pos2::ZERO, Vec2::ZERO));
        local.translate(self.origin.to_vec2())
    }

    /// Refit the path into `target`, scaling from `source` (both scene rects).
    fn rescaled(&self, source: Rect, target: Rect) -> Freehand {
        let sx = if source.width() > 0.01 { target.width() / source.width() } else { 1.0 };
        let sy = if source.height() > 0.01 { target.height() / source.height() } else { 1.0 };
        let scene = geometry::map_path(&self.scene_path(), |p| {
            Pos2::new(
                target.min.x + (p.x - source.min.x) * sx,
                target.min.y + (p.y - source.min.y) * sy,
            )
        });
        Freehand::from_scene_path(&scene)
    }
}

/// Text annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct TextShape {
    pub pos: Pos2,
    pub content: String,
    pub font: FontData,
    pub align: TextAlign,
    pub line_spacing: f32,
    /// Background box colour.
    pub fill: Option<Color32>,
    /// Outline colour and thickness, drawn by offset redraws.
    pub outline: Option<(Color32, f32)>,
    pub editing: bool,
}

impl TextShape {
    pub fn new(pos: Pos2, content: String) -> Self {
        Self {
            pos,
            content,
            font: FontData::default(),
            align: TextAlign::Left,
            line_spacing: 1.0,
            fill: None,
            outline: None,
            editing: false,
        }
    }

    /// Estimated extent of the laid-out text. Painting uses the real galley;
    /// this is for bounds and hit testing without a font context.
    pub fn extent(&self) -> Vec2 {
        let size = self.font.point_size.max(1.0);
        let advance = if self.font.is_bold() { 0.62 } else { 0.56 };
        let lines: Vec<&str> = self.content.split('\n').collect();
        let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0).max(1);
        let line_height = size * 1.3 * self.line_spacing.max(0.5);
        Vec2::new(longest as f32 * size * advance, lines.len() as f32 * line_height)
            + Vec2::splat(TEXT_PADDING * 2.0)
    }
}

pub const TEXT_PADDING: f32 = 4.0;

/// Geometry of a drawable shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    Circle { rect: Rect },
    Rectangle { rect: Rect },
    Arrow {
        p1: Pos2,
        p2: Pos2,
        style: LineStyle,
        double_head: bool,
    },
    Line { p1: Pos2, p2: Pos2, style: LineStyle },
    CurvedLine(Curve),
    CurvedArrow(Curve),
    ParabolaArrow(Curve),
    Freehand(Freehand),
    Cone { points: [Pos2; 3] },
    Polygon {
        vertices: Vec<Pos2>,
        fill: PolygonFill,
        opacity: f32,
    },
    Text(TextShape),
}

impl ShapeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::Circle { .. } => "circle",
            ShapeKind::Rectangle { .. } => "rectangle",
            ShapeKind::Arrow { .. } => "arrow",
            ShapeKind::Line { .. } => "line",
            ShapeKind::CurvedLine(_) => "curved_line",
            ShapeKind::CurvedArrow(_) => "curved_arrow",
            ShapeKind::ParabolaArrow(_) => "parabola_arrow",
            ShapeKind::Freehand(_) => "freehand",
            ShapeKind::Cone { .. } => "cone",
            ShapeKind::Polygon { .. } => "polygon",
            ShapeKind::Text(_) => "text",
        }
    }
}

/// A drawable shape with its stroke.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub kind: ShapeKind,
    pub color: Color32,
    pub width: f32,
}

impl Shape {
    pub fn new(kind: ShapeKind, color: Color32, width: f32) -> Self {
        let kind = match kind {
            ShapeKind::Polygon {
                vertices,
                fill,
                opacity,
            } => ShapeKind::Polygon {
                vertices,
                fill,
                opacity: opacity.clamp(MIN_FILL_OPACITY, MAX_FILL_OPACITY),
            },
            other => other,
        };
        Self { kind, color, width }
    }

    /// Body width of volumetric arrows.
    pub fn arrow_body_width(&self) -> f32 {
        self.width.max(2.0)
    }

    /// Length of a volumetric arrow head.
    pub fn arrow_head_length(&self) -> f32 {
        (self.arrow_body_width() * 3.0).max(12.0)
    }

    /// Scene-space bounding box.
    pub fn bounds(&self) -> Rect {
        match &self.kind {
            ShapeKind::Circle { rect } | ShapeKind::Rectangle { rect } => *rect,
            ShapeKind::Arrow { p1, p2, .. } | ShapeKind::Line { p1, p2, .. } => {
                Rect::from_two_pos(*p1, *p2)
            }
            ShapeKind::CurvedLine(c) | ShapeKind::CurvedArrow(c) | ShapeKind::ParabolaArrow(c) => {
                geometry::bounds_of(c.points()).unwrap_or(Rect::NOTHING)
            }
            ShapeKind::Freehand(f) => f.bounds(),
            ShapeKind::Cone { points } => geometry::bounds_of(*points).unwrap_or(Rect::NOTHING),
            ShapeKind::Polygon { vertices, .. } => {
                geometry::bounds_of(vertices.iter().copied()).unwrap_or(Rect::NOTHING)
            }
            ShapeKind::Text(t) => Rect::from_min_size(t.pos, t.extent()),
        }
    }

    /// Half-width of the band around the outline that counts as a hit.
    fn hit_band(&self) -> f32 {
        let w = self.width;
        let full = match &self.kind {
            ShapeKind::Circle { .. } | ShapeKind::Rectangle { .. } | ShapeKind::Polygon { .. } => {
                (w + 8.0).max(12.0)
            }
            ShapeKind::Arrow { .. } | ShapeKind::CurvedArrow(_) | ShapeKind::ParabolaArrow(_) => {
                (self.arrow_body_width() + 6.0).max(8.0) + self.arrow_body_width()
            }
            ShapeKind::Line { .. } | ShapeKind::CurvedLine(_) => (w + 12.0).max(20.0),
            ShapeKind::Freehand(_) => (w + 10.0).max(16.0),
            ShapeKind::Cone { .. } => 16.0,
            ShapeKind::Text(_) => 0.0,
        };
        full / 2.0
    }

    /// Border-only hit test. Clicking inside a closed outline does not hit,
    /// except for text which is hit anywhere in its box.
    pub fn hit_test(&self, point: Pos2) -> bool {
        let band = self.hit_band();
        match &self.kind {
            ShapeKind::Circle { rect } => {
                let outline = geometry::ellipse_points(*rect, ELLIPSE_SEGMENTS);
                geometry::distance_to_polyline(point, &outline, true) <= band
            }
            ShapeKind::Rectangle { rect } => {
                geometry::distance_to_polyline(point, &geometry::rect_corners(*rect), true) <= band
            }
            ShapeKind::Arrow {
                p1,
                p2,
                double_head,
                ..
            } => {
                if geometry::distance_to_segment(point, *p1, *p2) <= band {
                    return true;
                }
                let angle = geometry::direction_angle(*p1, *p2);
                let mut heads = vec![self.head_polygon(*p2, angle)];
                if *double_head {
                    heads.push(self.head_polygon(*p1, angle + std::f32::consts::PI));
                }
                heads.iter().any(|h| geometry::point_in_polygon(point, h))
            }
            ShapeKind::Line { p1, p2, .. } => geometry::distance_to_segment(point, *p1, *p2) <= band,
            ShapeKind::CurvedLine(c) | ShapeKind::CurvedArrow(c) | ShapeKind::ParabolaArrow(c) => {
                let polyline = geometry::quadratic_bezier(c.p1, c.ctrl, c.p2);
                geometry::distance_to_polyline(point, &polyline, false) <= band
            }
            ShapeKind::Freehand(f) => geometry::flatten_path(&f.scene_path())
                .iter()
                .any(|sub| geometry::distance_to_polyline(point, sub, false) <= band),
            ShapeKind::Cone { points } => geometry::distance_to_polyline(point, points, true) <= band,
            ShapeKind::Polygon { vertices, .. } => {
                geometry::distance_to_polyline(point, vertices, true) <= band
            }
            ShapeKind::Text(_) => self.bounds().contains(point),
        }
    }

    pub(crate) fn head_polygon(&self, tip: Pos2, angle: f32) -> [Pos2; 3] {
        geometry::arrow_head_polygon(
            tip,
            angle,
            self.arrow_head_length(),
            self.arrow_body_width() * HEAD_WIDTH_FACTOR,
        )
    }

    pub fn translate(&mut self, delta: Vec2) {
        match &mut self.kind {
            ShapeKind::Circle { rect } | ShapeKind::Rectangle { rect } => {
                *rect = rect.translate(delta);
            }
            ShapeKind::Arrow { p1, p2, .. } | ShapeKind::Line { p1, p2, .. } => {
                *p1 += delta;
                *p2 += delta;
            }
            ShapeKind::CurvedLine(c) | ShapeKind::CurvedArrow(c) | ShapeKind::ParabolaArrow(c) => {
                c.p1 += delta;
                c.ctrl += delta;
                c.p2 += delta;
            }
            ShapeKind::Freehand(f) => f.origin += delta,
            ShapeKind::Cone { points } => points.iter_mut().for_each(|p| *p += delta),
            ShapeKind::Polygon { vertices, .. } => vertices.iter_mut().for_each(|p| *p += delta),
            ShapeKind::Text(t) => t.pos += delta,
        }
    }

    pub fn set_color(&mut self, color: Color32) {
        self.color = color;
    }

    pub fn set_width(&mut self, width: f32) {
        self.width = width.clamp(1.0, 20.0);
    }

    pub fn as_text(&self) -> Option<&TextShape> {
        match &self.kind {
            ShapeKind::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut TextShape> {
        match &mut self.kind {
            ShapeKind::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Resize handle centres.
    ///
    /// Box shapes get eight (corners and edge midpoints, clockwise from the
    /// top-left), lines and arrows get their two endpoints, curves their
    /// three points and polygons one per vertex. Text is move-only.
    pub fn handles(&self) -> Vec<Pos2> {
        match &self.kind {
            ShapeKind::Circle { .. } | ShapeKind::Rectangle { .. } | ShapeKind::Freehand(_) => {
                box_handles(self.bounds()).to_vec()
            }
            ShapeKind::Arrow { p1, p2, .. } | ShapeKind::Line { p1, p2, .. } => vec![*p1, *p2],
            ShapeKind::CurvedLine(c) | ShapeKind::CurvedArrow(c) | ShapeKind::ParabolaArrow(c) => {
                c.points().to_vec()
            }
            ShapeKind::Cone { points } => points.to_vec(),
            ShapeKind::Polygon { vertices, .. } => vertices.clone(),
            ShapeKind::Text(_) => Vec::new(),
        }
    }

    /// Index of the handle under `point`, if any.
    pub fn handle_at(&self, point: Pos2) -> Option<usize> {
        let half = HANDLE_SIZE / 2.0;
        self.handles()
            .iter()
            .position(|h| (h.x - point.x).abs() <= half && (h.y - point.y).abs() <= half)
    }

    /// Apply a drag of handle `handle` to `pos`, computed against `original`
    /// (the shape as it was when the drag started), never against the live
    /// geometry. Returns `false` and leaves `self` unchanged when the result
    /// would be degenerate.
    pub fn apply_handle_drag(&mut self, handle: usize, pos: Pos2, original: &Shape) -> bool {
        match (&mut self.kind, &original.kind) {
            (ShapeKind::Circle { rect }, ShapeKind::Circle { rect: start })
            | (ShapeKind::Rectangle { rect }, ShapeKind::Rectangle { rect: start }) => {
                match anchored_resize(*start, handle, pos, MIN_BOX_EXTENT) {
                    Some(resized) => {
                        *rect = resized;
                        true
                    }
                    None => false,
                }
            }
            (ShapeKind::Freehand(live), ShapeKind::Freehand(start)) => {
                let source = start.bounds();
                match anchored_resize(source, handle, pos, MIN_FREEHAND_EXTENT) {
                    Some(target) => {
                        *live = start.rescaled(source, target);
                        true
                    }
                    None => false,
                }
            }
            (ShapeKind::Arrow { p1, p2, .. }, _) | (ShapeKind::Line { p1, p2, .. }, _) => {
                match handle {
                    0 => *p1 = pos,
                    1 => *p2 = pos,
                    _ => return false,
                }
                true
            }
            (ShapeKind::CurvedLine(c), _)
            | (ShapeKind::CurvedArrow(c), _)
            | (ShapeKind::ParabolaArrow(c), _) => match c.point_mut(handle) {
                Some(p) => {
                    *p = pos;
                    true
                }
                None => false,
            },
            (ShapeKind::Cone { points }, _) => match points.get_mut(handle) {
                Some(p) => {
                    *p = pos;
                    true
                }
                None => false,
            },
            (ShapeKind::Polygon { vertices, .. }, _) => match vertices.get_mut(handle) {
                Some(p) => {
                    *p = pos;
                    true
                }
                None => false,
            },
            _ => false,
        }
    }
}

impl Default for Shape {
    fn default() -> Self {
        Self::new(
            ShapeKind::Rectangle {
                rect: Rect::from_min_size(Pos2::ZERO, Vec2::splat(MIN_BOX_EXTENT * 2.0)),
            },
            Color32::YELLOW,
            DEFAULT_STROKE_WIDTH,
        )
    }
}

/// Handle centres of a box, clockwise from the top-left:
/// TL, T, TR, R, BR, B, BL, L.
pub fn box_handles(rect: Rect) -> [Pos2; 8] {
    [
        rect.left_top(),
        rect.center_top(),
        rect.right_top(),
        rect.right_center(),
        rect.right_bottom(),
        rect.center_bottom(),
        rect.left_bottom(),
        rect.left_center(),
    ]
}

/// Move the edges touched by box handle `handle` to `pos`, keeping the
/// opposite corner or edge of `start` fixed. `None` when a side the handle
/// moves would not exceed `min_extent` (this also rejects dragging past the
/// anchor). An axis the handle leaves alone is kept as is, even when flat.
pub fn anchored_resize(start: Rect, handle: usize, pos: Pos2, min_extent: f32) -> Option<Rect> {
    let (mut left, mut top, mut right, mut bottom) = (start.min.x, start.min.y, start.max.x, start.max.y);
    match handle {
        0 => {
            left = pos.x;
            top = pos.y;
        }
        1 => top = pos.y,
        2 => {
            right = pos.x;
            top = pos.y;
        }
        3 => right = pos.x,
        4 => {
            right = pos.x;
            bottom = pos.y;
        }
        5 => bottom = pos.y,
        6 => {
            left = pos.x;
            bottom = pos.y;
        }
        7 => left = pos.x,
        _ => return None,
    }
    let moves_x = !matches!(handle, 1 | 5);
    let moves_y = !matches!(handle, 3 | 7);
    let wide_enough = !moves_x || right - left > min_extent;
    let tall_enough = !moves_y || bottom - top > min_extent;
    if wide_enough && tall_enough {
        Some(Rect::from_min_max(Pos2::new(left, top), Pos2::new(right, bottom)))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect_shape() -> Shape {
        Shape::new(
            ShapeKind::Rectangle {
                rect: Rect::from_min_max(Pos2::new(0.0, 0.0), Pos2::new(100.0, 100.0)),
            },
            Color32::RED,
            4.0,
        )
    }

    fn wiggle() -> Vec<PathCommand> {
        vec![
            PathCommand::MoveTo(Pos2::new(50.0, 60.0)),
            PathCommand::LineTo(Pos2::new(80.0, 90.0)),
            PathCommand::CubicTo(
                Pos2::new(100.0, 95.0),
                Pos2::new(120.0, 70.0),
                Pos2::new(150.0, 110.0),
            ),
            PathCommand::LineTo(Pos2::new(170.0, 160.0)),
        ]
    }

    #[test]
    fn test_resize_top_left_keeps_bottom_right() {
        let original = rect_shape();
        let mut live = original.clone();
        assert!(live.apply_handle_drag(0, Pos2::new(20.0, 20.0), &original));
        assert_eq!(
            live.bounds(),
            Rect::from_min_max(Pos2::new(20.0, 20.0), Pos2::new(100.0, 100.0))
        );
    }

    #[test]
    fn test_edge_handle_moves_one_side() {
        let original = rect_shape();
        let mut live = original.clone();
        assert!(live.apply_handle_drag(3, Pos2::new(140.0, 999.0), &original));
        assert_eq!(
            live.bounds(),
            Rect::from_min_max(Pos2::new(0.0, 0.0), Pos2::new(140.0, 100.0))
        );
    }

    #[test]
    fn test_degenerate_resize_is_rejected() {
        let original = rect_shape();
        let mut live = original.clone();
        assert!(!live.apply_handle_drag(0, Pos2::new(90.0, 10.0), &original));
        assert_eq!(live, original);
        // Dragging past the anchor is also rejected.
        assert!(!live.apply_handle_drag(4, Pos2::new(-50.0, -50.0), &original));
        assert_eq!(live, original);
    }

    #[test]
    fn test_flat_freehand_stretches_along_its_length() {
        let stroke = [
            PathCommand::MoveTo(Pos2::new(10.0, 50.0)),
            PathCommand::LineTo(Pos2::new(110.0, 50.0)),
        ];
        let original = Shape::new(
            ShapeKind::Freehand(Freehand::from_scene_path(&stroke)),
            Color32::WHITE,
            3.0,
        );
        let mut live = original.clone();
        assert!(live.apply_handle_drag(3, Pos2::new(200.0, 50.0), &original));
        let ShapeKind::Freehand(f) = &live.kind else {
            panic!("expected a freehand shape");
        };
        let bounds = f.bounds();
        assert!((bounds.min.x - 10.0).abs() < 1e-3);
        assert!((bounds.max.x - 200.0).abs() < 1e-3);
        assert_eq!(bounds.height(), 0.0);

        // A corner handle still needs room on both axes.
        let mut corner = original.clone();
        assert!(!corner.apply_handle_drag(4, Pos2::new(200.0, 52.0), &original));
        assert_eq!(corner, original);
    }

    #[test]
    fn test_freehand_is_normalised_to_local_origin() {
        let f = Freehand::from_scene_path(&wiggle());
        assert_eq!(f.origin, Pos2::new(50.0, 60.0));
        assert_eq!(f.path[0], PathCommand::MoveTo(Pos2::new(0.0, 0.0)));
        assert_eq!(f.scene_path(), wiggle());
    }

    #[test]
    fn test_freehand_rescale_round_trip() {
        let captured = Shape::new(
            ShapeKind::Freehand(Freehand::from_scene_path(&wiggle())),
            Color32::GREEN,
            6.0,
        );
        let start = captured.bounds();
        assert_eq!(start, Rect::from_min_max(Pos2::new(50.0, 60.0), Pos2::new(170.0, 160.0)));

        // Right edge to half width, then a new drag back to full width.
        let mut half = captured.clone();
        assert!(half.apply_handle_drag(3, Pos2::new(110.0, 0.0), &captured));
        assert!((half.bounds().width() - 60.0).abs() < 1e-3);
        assert_eq!(half.bounds().min, start.min);

        let mut restored = half.clone();
        assert!(restored.apply_handle_drag(3, Pos2::new(170.0, 0.0), &half));

        let (ShapeKind::Freehand(a), ShapeKind::Freehand(b)) = (&captured.kind, &restored.kind) else {
            panic!("expected freehand shapes");
        };
        let pts_a: Vec<Pos2> = geometry::path_control_points(&a.scene_path()).collect();
        let pts_b: Vec<Pos2> = geometry::path_control_points(&b.scene_path()).collect();
        assert_eq!(pts_a.len(), pts_b.len());
        for (p, q) in pts_a.iter().zip(&pts_b) {
            assert!((*p - *q).length() < 1e-3, "{p:?} vs {q:?}");
        }
    }

    #[test]
    fn test_repeated_drags_use_original_not_live() {
        let captured = Shape::new(
            ShapeKind::Freehand(Freehand::from_scene_path(&wiggle())),
            Color32::GREEN,
            6.0,
        );
        let mut live = captured.clone();
        for x in [160.0, 140.0, 120.0, 150.0] {
            assert!(live.apply_handle_drag(3, Pos2::new(x, 0.0), &captured));
        }
        let mut direct = captured.clone();
        assert!(direct.apply_handle_drag(3, Pos2::new(150.0, 0.0), &captured));
        assert_eq!(live, direct);
    }

    #[test]
    fn test_circle_hit_is_border_only() {
        let circle = Shape::new(
            ShapeKind::Circle {
                rect: Rect::from_min_max(Pos2::new(0.0, 0.0), Pos2::new(200.0, 100.0)),
            },
            Color32::RED,
            4.0,
        );
        assert!(circle.hit_test(Pos2::new(100.0, 2.0)));
        assert!(circle.hit_test(Pos2::new(203.0, 50.0)));
        assert!(!circle.hit_test(Pos2::new(100.0, 50.0)));
        assert!(!circle.hit_test(Pos2::new(250.0, 50.0)));
    }

    #[test]
    fn test_arrow_hit_includes_head() {
        let arrow = Shape::new(
            ShapeKind::Arrow {
                p1: Pos2::new(0.0, 0.0),
                p2: Pos2::new(100.0, 0.0),
                style: LineStyle::Straight,
                double_head: false,
            },
            Color32::RED,
            8.0,
        );
        // Head is 24 long and 20 wide at its base.
        assert!(arrow.hit_test(Pos2::new(80.0, 9.0)));
        assert!(arrow.hit_test(Pos2::new(40.0, 5.0)));
        assert!(!arrow.hit_test(Pos2::new(40.0, 30.0)));
    }

    #[test]
    fn test_polygon_opacity_is_clamped() {
        let shape = Shape::new(
            ShapeKind::Polygon {
                vertices: vec![Pos2::ZERO, Pos2::new(10.0, 0.0), Pos2::new(0.0, 10.0)],
                fill: PolygonFill::Solid,
                opacity: 0.95,
            },
            Color32::RED,
            2.0,
        );
        match shape.kind {
            ShapeKind::Polygon { opacity, .. } => assert_eq!(opacity, MAX_FILL_OPACITY),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_handles_per_kind() {
        assert_eq!(rect_shape().handles().len(), 8);
        assert_eq!(rect_shape().handle_at(Pos2::new(95.0, 55.0)), Some(3));
        let curve = Shape::new(
            ShapeKind::CurvedArrow(Curve {
                p1: Pos2::new(0.0, 0.0),
                ctrl: Pos2::new(50.0, -40.0),
                p2: Pos2::new(100.0, 0.0),
            }),
            Color32::RED,
            4.0,
        );
        assert_eq!(curve.handles().len(), 3);
        let mut bent = curve.clone();
        assert!(bent.apply_handle_drag(1, Pos2::new(50.0, -80.0), &curve));
        assert_eq!(bent.handles()[1], Pos2::new(50.0, -80.0));
        let text = Shape::new(ShapeKind::Text(TextShape::new(Pos2::ZERO, "x".into())), Color32::WHITE, 1.0);
        assert!(text.handles().is_empty());
    }

    #[test]
    fn test_translate_moves_every_point() {
        let mut shape = Shape::new(
            ShapeKind::Cone {
                points: [Pos2::new(0.0, 0.0), Pos2::new(10.0, 40.0), Pos2::new(-10.0, 40.0)],
            },
            Color32::YELLOW,
            8.0,
        );
        shape.translate(Vec2::new(5.0, -5.0));
        assert_eq!(
            shape.handles(),
            vec![Pos2::new(5.0, -5.0), Pos2::new(15.0, 35.0), Pos2::new(-5.0, 35.0)]
        );
    }
}
