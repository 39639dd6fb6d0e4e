// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Painting drawable shapes into egui primitives.
//!
//! Shapes are turned into a list of [`egui::Shape`]s in scene coordinates;
//! the canvas translates the list to screen space. Arrows are built as
//! vertex-coloured meshes so the bevel gradient can be sampled per vertex.

use std::sync::Arc;

use egui::epaint::{Mesh, TextShape as EpaintText};
use egui::text::{LayoutJob, TextFormat};
use egui::{Align, Color32, FontFamily, FontId, Pos2, Rect, Stroke, Vec2};

use super::shape::{Curve, Shape, ShapeKind, TextShape, ELLIPSE_SEGMENTS, HANDLE_SIZE, TEXT_PADDING};
use crate::models::annotation::{LineStyle, PolygonFill, TextAlign};
use crate::util::color::with_alpha;
use crate::util::geometry::{self, BevelGradient};

const SHADOW_OFFSET: Vec2 = Vec2::new(3.0, 3.0);
const SHADOW_ALPHA: u8 = 100;
const HIGHLIGHT_OPACITY: f32 = 0.2;
const SHADOW_LINE_OPACITY: f32 = 0.35;
const SELECTION_WIDTH: f32 = 3.0;
const STRIPE_SPACING: f32 = 10.0;

/// Destination for painted shapes.
pub struct Surface<'a> {
    pub shapes: Vec<egui::Shape>,
    ctx: Option<&'a egui::Context>,
}

impl<'a> Surface<'a> {
    /// Text needs a context for font layout; without one it is skipped.
    pub fn new(ctx: Option<&'a egui::Context>) -> Self {
        Self {
            shapes: Vec::new(),
            ctx,
        }
    }

    fn push(&mut self, shape: egui::Shape) {
        self.shapes.push(shape);
    }

    fn extend(&mut self, shapes: impl IntoIterator<Item = egui::Shape>) {
        self.shapes.extend(shapes);
    }

    pub fn into_shapes(self) -> Vec<egui::Shape> {
        self.shapes
    }
}

/// Paint one shape, with the dashed white selection outline if selected.
pub fn render_shape(shape: &Shape, selected: bool, surface: &mut Surface<'_>) {
    let stroke = Stroke::new(shape.width, shape.color);
    match &shape.kind {
        ShapeKind::Circle { rect } => {
            surface.push(egui::Shape::closed_line(
                geometry::ellipse_points(*rect, ELLIPSE_SEGMENTS),
                stroke,
            ));
        }
        ShapeKind::Rectangle { rect } => {
            surface.push(egui::Shape::rect_stroke(*rect, 0.0, stroke));
        }
        ShapeKind::Arrow {
            p1,
            p2,
            style,
            double_head,
        } => render_straight_arrow(shape, *p1, *p2, *style, *double_head, surface),
        ShapeKind::Line { p1, p2, style } => {
            let path = geometry::build_stroke_path(*style, *p1, *p2, 0.0, 0.0);
            stroke_polyline(&path.points, stroke, path.dashed, surface);
        }
        ShapeKind::CurvedLine(c) => {
            surface.push(egui::Shape::line(
                geometry::quadratic_bezier(c.p1, c.ctrl, c.p2),
                stroke,
            ));
        }
        ShapeKind::CurvedArrow(c) => render_curved_arrow(shape, c, false, surface),
        ShapeKind::ParabolaArrow(c) => render_curved_arrow(shape, c, true, surface),
        ShapeKind::Freehand(f) => {
            for points in geometry::flatten_path(&f.scene_path()) {
                surface.push(egui::Shape::line(points, stroke));
            }
        }
        ShapeKind::Cone { points } => render_cone(points, shape.color, surface),
        ShapeKind::Polygon {
            vertices,
            fill,
            opacity,
        } => render_polygon(vertices, *fill, *opacity, stroke, surface),
        ShapeKind::Text(text) => render_text(shape, text, surface),
    }

    if selected {
        render_selection(shape, surface);
    }
}

/// Paint resize handles as white squares.
pub fn render_handles(handles: &[Pos2], surface: &mut Surface<'_>) {
    for &h in handles {
        let rect = Rect::from_center_size(h, Vec2::splat(HANDLE_SIZE));
        surface.push(egui::Shape::rect_filled(rect, 0.0, Color32::WHITE));
        surface.push(egui::Shape::rect_stroke(rect, 0.0, Stroke::new(1.0, Color32::from_gray(80))));
    }
}

/// Paint a polygon that is still being built, with a rubber band to the cursor.
pub fn render_polygon_preview(
    vertices: &[Pos2],
    cursor: Option<Pos2>,
    color: Color32,
    width: f32,
    surface: &mut Surface<'_>,
) {
    let Some(&first) = vertices.first() else {
        return;
    };
    let stroke = Stroke::new(width.max(2.0), color);
    let mut points = vertices.to_vec();
    if let Some(c) = cursor {
        points.push(c);
    }
    surface.push(egui::Shape::line(points, stroke));
    for &v in vertices {
        surface.push(egui::Shape::circle_filled(v, 4.0, Color32::WHITE));
    }
    surface.push(egui::Shape::circle_stroke(
        first,
        super::scene::POLYGON_CLOSE_DISTANCE,
        Stroke::new(1.0, with_alpha(Color32::WHITE, 0.6)),
    ));
}

fn stroke_polyline(points: &[Pos2], stroke: Stroke, dashed: bool, surface: &mut Surface<'_>) {
    if dashed {
        let w = stroke.width.max(1.0);
        surface.extend(egui::Shape::dashed_line(points, stroke, 4.0 * w, 2.0 * w));
    } else {
        surface.push(egui::Shape::line(points.to_vec(), stroke));
    }
}

/// Bevel gradient whose axis is perpendicular to `angle`, centred between
/// the endpoints and as long as the shape.
fn arrow_gradient(p1: Pos2, p2: Pos2, angle: f32, color: Color32) -> BevelGradient {
    let perp = Vec2::new(-angle.sin(), angle.cos());
    let center = p1 + (p2 - p1) * 0.5;
    let half_len = {
        let h = (p2 - p1).length() / 2.0;
        if h <= f32::EPSILON {
            1.0
        } else {
            h
        }
    };
    geometry::bevel_gradient(center - perp * half_len, center + perp * half_len, color)
}

fn render_straight_arrow(
    shape: &Shape,
    p1: Pos2,
    p2: Pos2,
    style: LineStyle,
    double_head: bool,
    surface: &mut Surface<'_>,
) {
    let width = shape.arrow_body_width();
    let head_len = shape.arrow_head_length();
    let trim_start = if double_head { head_len } else { 0.0 };
    let body = geometry::build_stroke_path(style, p1, p2, trim_start, head_len);
    let angle = geometry::direction_angle(p1, p2);

    let mut heads = vec![shape.head_polygon(p2, angle)];
    if double_head {
        heads.push(shape.head_polygon(p1, angle + std::f32::consts::PI));
    }
    let gradient = arrow_gradient(p1, p2, angle, shape.color);
    render_volumetric(&body.points, body.dashed, width, angle, &heads, &gradient, surface);
}

fn render_curved_arrow(shape: &Shape, c: &Curve, parabola: bool, surface: &mut Surface<'_>) {
    let width = shape.arrow_body_width();
    let head_len = shape.arrow_head_length();
    let body = geometry::trimmed_quadratic_bezier(c.p1, c.ctrl, c.p2, head_len);
    let angle = geometry::bezier_end_angle(c.ctrl, c.p2);

    if parabola {
        // Straight ground line under the lob.
        let gray = Color32::from_rgba_unmultiplied(50, 50, 50, (255.0 * SHADOW_LINE_OPACITY) as u8);
        surface.push(egui::Shape::line_segment(
            [c.p1 + SHADOW_OFFSET, c.p2 + SHADOW_OFFSET],
            Stroke::new(width, gray),
        ));
    }

    let heads = [shape.head_polygon(c.p2, angle)];
    let gradient = arrow_gradient(c.p1, c.p2, angle, shape.color);
    render_volumetric(&body, false, width, angle, &heads, &gradient, surface);
}

/// Shadow under the body, gradient body and heads, then the highlight stripe.
fn render_volumetric(
    centre: &[Pos2],
    dashed: bool,
    width: f32,
    angle: f32,
    heads: &[[Pos2; 3]],
    gradient: &BevelGradient,
    surface: &mut Surface<'_>,
) {
    let pieces = if dashed {
        dash_polyline(centre, 4.0 * width, 2.0 * width)
    } else {
        vec![centre.to_vec()]
    };

    let shadow_color = Color32::from_black_alpha(SHADOW_ALPHA);
    let mut shadow = Mesh::default();
    let mut body = Mesh::default();
    for piece in &pieces {
        let moved: Vec<Pos2> = piece.iter().map(|p| *p + SHADOW_OFFSET).collect();
        add_strip(&mut shadow, &moved, width, |_| shadow_color);
        add_strip(&mut body, piece, width, |p| gradient.sample(p));
    }
    for head in heads {
        let base = body.vertices.len() as u32;
        for &p in head {
            body.colored_vertex(p, gradient.sample(p));
        }
        body.add_triangle(base, base + 1, base + 2);
    }
    surface.push(egui::Shape::mesh(shadow));
    surface.push(egui::Shape::mesh(body));

    let lift = Vec2::new(-angle.sin(), angle.cos()) * (width * 0.3);
    let highlight = Stroke::new(
        (width * 0.35).floor().max(1.0),
        with_alpha(Color32::WHITE, HIGHLIGHT_OPACITY),
    );
    for piece in &pieces {
        let lifted: Vec<Pos2> = piece.iter().map(|p| *p + lift).collect();
        surface.push(egui::Shape::line(lifted, highlight));
    }
}

/// Flat-capped triangle strip along a polyline.
fn add_strip(mesh: &mut Mesh, points: &[Pos2], width: f32, color: impl Fn(Pos2) -> Color32) {
    let offsets = geometry::offset_polyline(points, width / 2.0);
    if offsets.len() < 2 {
        return;
    }
    let base = mesh.vertices.len() as u32;
    for (left, right) in &offsets {
        mesh.colored_vertex(*left, color(*left));
        mesh.colored_vertex(*right, color(*right));
    }
    for i in 0..(offsets.len() as u32 - 1) {
        let a = base + i * 2;
        mesh.add_triangle(a, a + 1, a + 2);
        mesh.add_triangle(a + 1, a + 3, a + 2);
    }
}

/// Split a polyline into dashes of `dash` length separated by `gap`.
fn dash_polyline(points: &[Pos2], dash: f32, gap: f32) -> Vec<Vec<Pos2>> {
    let mut out = Vec::new();
    let mut current: Vec<Pos2> = Vec::new();
    let mut drawing = true;
    let mut left = dash;

    for w in points.windows(2) {
        let (mut a, b) = (w[0], w[1]);
        let mut seg = (b - a).length();
        while seg > 0.0 {
            let step = left.min(seg);
            let next = a + (b - a).normalized() * step;
            if drawing {
                if current.is_empty() {
                    current.push(a);
                }
                current.push(next);
            }
            seg -= step;
            left -= step;
            a = next;
            if left <= 0.0 {
                if drawing && current.len() > 1 {
                    out.push(std::mem::take(&mut current));
                }
                current.clear();
                drawing = !drawing;
                left = if drawing { dash } else { gap };
            }
        }
    }
    if drawing && current.len() > 1 {
        out.push(current);
    }
    out
}

fn render_cone(points: &[Pos2; 3], color: Color32, surface: &mut Surface<'_>) {
    let [r, g, b, _] = color.to_srgba_unmultiplied();
    let start = points[0];
    let axis = points[1].lerp(points[2], 0.5) - start;
    let len_sq = axis.length_sq().max(f32::EPSILON);
    let mut mesh = Mesh::default();
    for &p in points {
        let t = ((p - start).dot(axis) / len_sq).clamp(0.0, 1.0);
        let alpha = (180.0 + (30.0 - 180.0) * t).round() as u8;
        mesh.colored_vertex(p, Color32::from_rgba_unmultiplied(r, g, b, alpha));
    }
    mesh.add_triangle(0, 1, 2);
    surface.push(egui::Shape::mesh(mesh));
}

fn render_polygon(
    vertices: &[Pos2],
    fill: PolygonFill,
    opacity: f32,
    stroke: Stroke,
    surface: &mut Surface<'_>,
) {
    if vertices.len() < 3 {
        return;
    }
    let fill_color = with_alpha(stroke.color, opacity);
    match fill {
        PolygonFill::Solid => {
            let mut mesh = Mesh::default();
            for &v in vertices {
                mesh.colored_vertex(v, fill_color);
            }
            for [a, b, c] in geometry::triangulate_polygon(vertices) {
                mesh.add_triangle(a as u32, b as u32, c as u32);
            }
            surface.push(egui::Shape::mesh(mesh));
        }
        PolygonFill::Stripes => {
            let stripe = Stroke::new(2.0, fill_color);
            for segment in geometry::hatch_segments(vertices, STRIPE_SPACING) {
                surface.push(egui::Shape::line_segment(segment, stripe));
            }
        }
    }
    surface.push(egui::Shape::closed_line(vertices.to_vec(), stroke));
}

fn font_id(text: &TextShape) -> FontId {
    let family = text.font.family.to_lowercase();
    let family = if family.contains("mono") || family.contains("courier") || family.contains("consol") {
        FontFamily::Monospace
    } else {
        FontFamily::Proportional
    };
    FontId::new(text.font.point_size.max(1.0), family)
}

/// Lay out the text with the shape's style.
pub fn text_job(text: &TextShape, color: Color32) -> LayoutJob {
    let size = text.font.point_size.max(1.0);
    let format = TextFormat {
        font_id: font_id(text),
        color,
        italics: text.font.italic,
        underline: if text.font.underline {
            Stroke::new((size / 14.0).max(1.0), color)
        } else {
            Stroke::NONE
        },
        line_height: Some(size * 1.3 * text.line_spacing.max(0.5)),
        ..Default::default()
    };
    let mut job = LayoutJob::single_section(text.content.clone(), format);
    job.halign = match text.align {
        TextAlign::Left => Align::LEFT,
        TextAlign::Center => Align::Center,
        TextAlign::Right => Align::RIGHT,
    };
    job
}

fn render_text(shape: &Shape, text: &TextShape, surface: &mut Surface<'_>) {
    let bounds = shape.bounds();
    if let Some(fill) = text.fill {
        surface.push(egui::Shape::rect_filled(bounds, 4.0, fill));
    }
    if text.editing {
        surface.extend(egui::Shape::dashed_line(
            &geometry::rect_corners(bounds)
                .iter()
                .copied()
                .chain(std::iter::once(bounds.left_top()))
                .collect::<Vec<_>>(),
            Stroke::new(1.0, Color32::WHITE),
            4.0,
            3.0,
        ));
        // The inline editor draws the glyphs while editing.
        return;
    }
    let Some(ctx) = surface.ctx else {
        return;
    };

    let galley = ctx.fonts(|fonts| fonts.layout_job(text_job(text, shape.color)));
    let inner = bounds.width() - TEXT_PADDING * 2.0;
    let anchor_x = match text.align {
        TextAlign::Left => 0.0,
        TextAlign::Center => inner / 2.0,
        TextAlign::Right => inner,
    };
    let anchor = text.pos + Vec2::new(TEXT_PADDING + anchor_x, TEXT_PADDING);

    if let Some((outline_color, thickness)) = text.outline {
        let o = thickness.max(1.0);
        for (dx, dy) in [
            (-o, 0.0),
            (o, 0.0),
            (0.0, -o),
            (0.0, o),
            (-o, -o),
            (o, -o),
            (-o, o),
            (o, o),
        ] {
            let mut outline = EpaintText::new(anchor + Vec2::new(dx, dy), Arc::clone(&galley), outline_color);
            outline.override_text_color = Some(outline_color);
            surface.push(egui::Shape::Text(outline));
        }
    }
    if text.font.is_bold() {
        // Faux bold: one extra pass nudged right.
        surface.push(egui::Shape::galley(anchor + Vec2::new(0.8, 0.0), Arc::clone(&galley), shape.color));
    }
    surface.push(egui::Shape::galley(anchor, galley, shape.color));
}

fn render_selection(shape: &Shape, surface: &mut Surface<'_>) {
    let stroke = Stroke::new(SELECTION_WIDTH, Color32::WHITE);
    let closed = |mut pts: Vec<Pos2>| {
        if let Some(&first) = pts.first() {
            pts.push(first);
        }
        pts
    };
    let outlines: Vec<Vec<Pos2>> = match &shape.kind {
        ShapeKind::Circle { rect } => vec![closed(geometry::ellipse_points(*rect, ELLIPSE_SEGMENTS))],
        ShapeKind::Rectangle { rect } => vec![closed(geometry::rect_corners(*rect).to_vec())],
        ShapeKind::Arrow { p1, p2, .. } | ShapeKind::Line { p1, p2, .. } => vec![vec![*p1, *p2]],
        ShapeKind::CurvedLine(c) | ShapeKind::CurvedArrow(c) | ShapeKind::ParabolaArrow(c) => {
            vec![geometry::quadratic_bezier(c.p1, c.ctrl, c.p2)]
        }
        ShapeKind::Freehand(f) => geometry::flatten_path(&f.scene_path()),
        ShapeKind::Cone { points } => vec![closed(points.to_vec())],
        ShapeKind::Polygon { vertices, .. } => vec![closed(vertices.clone())],
        ShapeKind::Text(_) => vec![closed(geometry::rect_corners(shape.bounds()).to_vec())],
    };
    for outline in outlines {
        surface.extend(egui::Shape::dashed_line(&outline, stroke, 9.0, 6.0));
    }
}
