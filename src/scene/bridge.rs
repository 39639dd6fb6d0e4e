// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Conversion between drawable shapes and stored annotation records.
//!
//! Stateless and pure: records carry absolute coordinates, colours as hex
//! strings and paths as `{cmd, x, y}` lists, so a shape converted to a
//! record and back is identical.

use egui::{Color32, Pos2, Rect, Vec2};
use serde_json::Value;

use super::shape::{Curve, Freehand, Shape, ShapeKind, TextShape};
use crate::models::annotation::{
    AnnotationRecord, ArrowRecord, BoxRecord, ConeRecord, CurveRecord, FreehandRecord, LineRecord,
    OutlineData, PathCommand, PathPoint, PathVerb, Point, PolygonRecord, RectData, TextRecord,
    DEFAULT_STROKE_WIDTH,
};
use crate::util::color::{parse_hex_or, to_hex};

const FALLBACK_COLOR: Color32 = Color32::YELLOW;

fn pos(p: Point) -> Pos2 {
    p.into()
}

fn point(p: Pos2) -> Point {
    p.into()
}

fn offset(pos: Option<Point>) -> Vec2 {
    pos.map(|p| Vec2::new(p.x, p.y)).unwrap_or(Vec2::ZERO)
}

fn rect_data(r: Rect) -> RectData {
    RectData {
        x: r.min.x,
        y: r.min.y,
        w: r.width(),
        h: r.height(),
    }
}

fn rect(r: RectData) -> Rect {
    Rect::from_min_size(Pos2::new(r.x, r.y), Vec2::new(r.w, r.h))
}

/// Flatten path commands into `{cmd, x, y}` points; a cubic becomes three
/// consecutive curve points.
pub fn path_to_points(commands: &[PathCommand]) -> Vec<PathPoint> {
    let at = |cmd, p: Pos2| PathPoint { cmd, x: p.x, y: p.y };
    let mut out = Vec::with_capacity(commands.len());
    for command in commands {
        match *command {
            PathCommand::MoveTo(p) => out.push(at(PathVerb::Move, p)),
            PathCommand::LineTo(p) => out.push(at(PathVerb::Line, p)),
            PathCommand::CubicTo(c1, c2, p) => {
                out.push(at(PathVerb::Curve, c1));
                out.push(at(PathVerb::Curve, c2));
                out.push(at(PathVerb::Curve, p));
            }
        }
    }
    out
}

/// Rebuild path commands. Curve points are grouped in threes; a dangling
/// incomplete group is dropped.
pub fn points_to_path(points: &[PathPoint]) -> Vec<PathCommand> {
    let mut out = Vec::with_capacity(points.len());
    let mut pending: Vec<Pos2> = Vec::with_capacity(3);
    for p in points {
        let at = Pos2::new(p.x, p.y);
        match p.cmd {
            PathVerb::Move => {
                pending.clear();
                out.push(PathCommand::MoveTo(at));
            }
            PathVerb::Line => {
                pending.clear();
                out.push(PathCommand::LineTo(at));
            }
            PathVerb::Curve => {
                pending.push(at);
                if pending.len() == 3 {
                    out.push(PathCommand::CubicTo(pending[0], pending[1], pending[2]));
                    pending.clear();
                }
            }
        }
    }
    out
}

/// Convert a shape to its stored record.
pub fn shape_to_record(shape: &Shape) -> AnnotationRecord {
    let color = to_hex(shape.color);
    let width = shape.width;
    let curve = |c: &Curve, color: String| CurveRecord {
        p1: point(c.p1),
        ctrl: point(c.ctrl),
        p2: point(c.p2),
        color,
        width,
    };

    match &shape.kind {
        ShapeKind::Circle { rect } => AnnotationRecord::Circle(BoxRecord {
            rect: rect_data(*rect),
            pos: None,
            color,
            width,
        }),
        ShapeKind::Rectangle { rect } => AnnotationRecord::Rectangle(BoxRecord {
            rect: rect_data(*rect),
            pos: None,
            color,
            width,
        }),
        ShapeKind::Arrow {
            p1,
            p2,
            style,
            double_head,
        } => AnnotationRecord::Arrow(ArrowRecord {
            p1: point(*p1),
            p2: point(*p2),
            style: *style,
            double_head: *double_head,
            color,
            width,
        }),
        ShapeKind::Line { p1, p2, style } => AnnotationRecord::Line(LineRecord {
            p1: point(*p1),
            p2: point(*p2),
            style: *style,
            color,
            width,
        }),
        ShapeKind::CurvedLine(c) => AnnotationRecord::CurvedLine(curve(c, color)),
        ShapeKind::CurvedArrow(c) => AnnotationRecord::CurvedArrow(curve(c, color)),
        ShapeKind::ParabolaArrow(c) => AnnotationRecord::ParabolaArrow(curve(c, color)),
        ShapeKind::Freehand(f) => AnnotationRecord::Freehand(FreehandRecord {
            path: path_to_points(&f.scene_path()),
            pos: None,
            color,
            width,
        }),
        ShapeKind::Cone { points } => AnnotationRecord::Cone(ConeRecord {
            points: points.iter().copied().map(point).collect(),
            pos: None,
            color,
        }),
        ShapeKind::Polygon {
            vertices,
            fill,
            opacity,
        } => AnnotationRecord::Polygon(PolygonRecord {
            points: vertices.iter().copied().map(point).collect(),
            fill: *fill,
            opacity: *opacity,
            color,
            width,
        }),
        ShapeKind::Text(t) => AnnotationRecord::Text(TextRecord {
            text: t.content.clone(),
            pos: point(t.pos),
            color,
            font: t.font.clone(),
            align: t.align,
            line_spacing: t.line_spacing,
            fill: t.fill.map(to_hex),
            outline: t.outline.map(|(c, w)| OutlineData {
                color: to_hex(c),
                width: w,
            }),
        }),
    }
}

/// Rebuild a shape from a record. Legacy `pos` offsets are folded into the
/// geometry. Returns `None` for records that cannot describe a shape (a
/// cone without three points, a polygon with fewer than three).
pub fn record_to_shape(record: &AnnotationRecord) -> Option<Shape> {
    let curve = |r: &CurveRecord| {
        let c = Curve {
            p1: pos(r.p1),
            ctrl: pos(r.ctrl),
            p2: pos(r.p2),
        };
        (c, parse_hex_or(&r.color, FALLBACK_COLOR), r.width)
    };

    let (kind, color, width) = match record {
        AnnotationRecord::Circle(b) | AnnotationRecord::Rectangle(b) => {
            let r = rect(b.rect).translate(offset(b.pos));
            let kind = if matches!(record, AnnotationRecord::Circle(_)) {
                ShapeKind::Circle { rect: r }
            } else {
                ShapeKind::Rectangle { rect: r }
            };
            (kind, parse_hex_or(&b.color, FALLBACK_COLOR), b.width)
        }
        AnnotationRecord::Arrow(a) => (
            ShapeKind::Arrow {
                p1: pos(a.p1),
                p2: pos(a.p2),
                style: a.style,
                double_head: a.double_head,
            },
            parse_hex_or(&a.color, FALLBACK_COLOR),
            a.width,
        ),
        AnnotationRecord::Line(l) => (
            ShapeKind::Line {
                p1: pos(l.p1),
                p2: pos(l.p2),
                style: l.style,
            },
            parse_hex_or(&l.color, FALLBACK_COLOR),
            l.width,
        ),
        AnnotationRecord::CurvedLine(r) => {
            let (c, color, width) = curve(r);
            (ShapeKind::CurvedLine(c), color, width)
        }
        AnnotationRecord::CurvedArrow(r) => {
            let (c, color, width) = curve(r);
            (ShapeKind::CurvedArrow(c), color, width)
        }
        AnnotationRecord::ParabolaArrow(r) => {
            let (c, color, width) = curve(r);
            (ShapeKind::ParabolaArrow(c), color, width)
        }
        AnnotationRecord::Freehand(f) => {
            let shift = offset(f.pos);
            let path: Vec<PathCommand> = points_to_path(&f.path)
                .into_iter()
                .map(|c| match c {
                    PathCommand::MoveTo(p) => PathCommand::MoveTo(p + shift),
                    PathCommand::LineTo(p) => PathCommand::LineTo(p + shift),
                    PathCommand::CubicTo(a, b, p) => PathCommand::CubicTo(a + shift, b + shift, p + shift),
                })
                .collect();
            if path.is_empty() {
                return None;
            }
            (
                ShapeKind::Freehand(Freehand::from_scene_path(&path)),
                parse_hex_or(&f.color, FALLBACK_COLOR),
                f.width,
            )
        }
        AnnotationRecord::Cone(c) => {
            let shift = offset(c.pos);
            let [a, b, d] = match c.points.as_slice() {
                [a, b, d, ..] => [pos(*a) + shift, pos(*b) + shift, pos(*d) + shift],
                _ => return None,
            };
            (
                ShapeKind::Cone { points: [a, b, d] },
                parse_hex_or(&c.color, FALLBACK_COLOR),
                DEFAULT_STROKE_WIDTH,
            )
        }
        AnnotationRecord::Polygon(p) => {
            if p.points.len() < 3 {
                return None;
            }
            (
                ShapeKind::Polygon {
                    vertices: p.points.iter().copied().map(pos).collect(),
                    fill: p.fill,
                    opacity: p.opacity,
                },
                parse_hex_or(&p.color, FALLBACK_COLOR),
                p.width,
            )
        }
        AnnotationRecord::Text(t) => {
            let text = TextShape {
                pos: pos(t.pos),
                content: t.text.clone(),
                font: t.font.clone(),
                align: t.align,
                line_spacing: t.line_spacing,
                fill: t.fill.as_deref().map(|s| parse_hex_or(s, Color32::BLACK)),
                outline: t
                    .outline
                    .as_ref()
                    .map(|o| (parse_hex_or(&o.color, Color32::BLACK), o.width)),
                editing: false,
            };
            (
                ShapeKind::Text(text),
                parse_hex_or(&t.color, Color32::WHITE),
                DEFAULT_STROKE_WIDTH,
            )
        }
    };
    Some(Shape::new(kind, color, width))
}

/// Serialize a shape into the JSON value stored in an event.
pub fn shape_to_value(shape: &Shape) -> serde_json::Result<Value> {
    serde_json::to_value(shape_to_record(shape))
}

/// Parse a stored JSON value into a shape. Unreadable records (unknown
/// `type`, malformed geometry) are skipped with a warning.
pub fn value_to_shape(value: &Value) -> Option<Shape> {
    let record: AnnotationRecord = match serde_json::from_value(value.clone()) {
        Ok(record) => record,
        Err(e) => {
            let tag = value.get("type").and_then(Value::as_str).unwrap_or("<none>");
            log::warn!("Skipping unreadable annotation record (type {}): {}", tag, e);
            return None;
        }
    };
    let shape = record_to_shape(&record);
    if shape.is_none() {
        log::warn!("Skipping degenerate {} record", record.type_name());
    }
    shape
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::annotation::{FontData, LineStyle, PolygonFill, TextAlign};
    use serde_json::json;

    fn p(x: f32, y: f32) -> Pos2 {
        Pos2::new(x, y)
    }

    fn every_kind() -> Vec<Shape> {
        let red = Color32::from_rgb(255, 0, 0);
        let curve = Curve {
            p1: p(10.0, 200.0),
            ctrl: p(110.0, 40.0),
            p2: p(210.0, 200.0),
        };
        let mut text = TextShape::new(p(40.0, 40.0), "Press high\nNo 8 steps in".into());
        text.font = FontData {
            family: "DejaVu Sans Mono".into(),
            point_size: 30.0,
            weight: 400,
            italic: true,
            underline: true,
        };
        text.align = TextAlign::Right;
        text.line_spacing = 1.5;
        text.fill = Some(Color32::from_rgb(0, 0, 0));
        text.outline = Some((Color32::from_rgb(255, 255, 255), 2.0));

        vec![
            Shape::new(
                ShapeKind::Circle {
                    rect: Rect::from_min_max(p(10.0, 20.0), p(90.0, 60.0)),
                },
                red,
                6.0,
            ),
            Shape::new(
                ShapeKind::Rectangle {
                    rect: Rect::from_min_max(p(0.0, 0.0), p(100.0, 100.0)),
                },
                Color32::from_rgb(0, 0, 255),
                3.0,
            ),
            Shape::new(
                ShapeKind::Arrow {
                    p1: p(100.0, 100.0),
                    p2: p(200.0, 150.0),
                    style: LineStyle::Zigzag,
                    double_head: true,
                },
                red,
                8.0,
            ),
            Shape::new(
                ShapeKind::Line {
                    p1: p(5.0, 5.0),
                    p2: p(50.0, 80.0),
                    style: LineStyle::Dashed,
                },
                Color32::from_rgb(255, 165, 0),
                4.0,
            ),
            Shape::new(ShapeKind::CurvedLine(curve), red, 5.0),
            Shape::new(ShapeKind::CurvedArrow(curve), red, 7.0),
            Shape::new(ShapeKind::ParabolaArrow(curve), red, 9.0),
            Shape::new(
                ShapeKind::Freehand(Freehand::from_scene_path(&[
                    PathCommand::MoveTo(p(30.0, 30.0)),
                    PathCommand::LineTo(p(60.0, 45.0)),
                    PathCommand::CubicTo(p(70.0, 50.0), p(80.0, 20.0), p(95.0, 35.0)),
                    PathCommand::MoveTo(p(100.0, 100.0)),
                    PathCommand::LineTo(p(120.0, 110.0)),
                ])),
                Color32::from_rgb(0, 255, 0),
                8.0,
            ),
            Shape::new(
                ShapeKind::Cone {
                    points: [p(300.0, 300.0), p(360.0, 200.0), p(380.0, 230.0)],
                },
                Color32::from_rgb(255, 255, 0),
                DEFAULT_STROKE_WIDTH,
            ),
            Shape::new(
                ShapeKind::Polygon {
                    vertices: vec![p(0.0, 0.0), p(50.0, 0.0), p(60.0, 40.0), p(5.0, 30.0)],
                    fill: PolygonFill::Stripes,
                    opacity: 0.5,
                },
                Color32::from_rgb(128, 0, 128),
                2.0,
            ),
            Shape::new(ShapeKind::Text(text), Color32::from_rgb(255, 255, 0), DEFAULT_STROKE_WIDTH),
        ]
    }

    #[test]
    fn test_round_trip_every_kind() {
        for shape in every_kind() {
            let record = shape_to_record(&shape);
            let back = record_to_shape(&record).unwrap();
            assert_eq!(back, shape, "round trip of {}", shape.kind.name());
            assert_eq!(shape_to_record(&back), record);
        }
    }

    #[test]
    fn test_round_trip_through_json() {
        for shape in every_kind() {
            let value = shape_to_value(&shape).unwrap();
            let text = serde_json::to_string(&value).unwrap();
            let parsed: Value = serde_json::from_str(&text).unwrap();
            assert_eq!(value_to_shape(&parsed).unwrap(), shape);
        }
    }

    #[test]
    fn test_arrow_record_shape() {
        let shape = &every_kind()[2];
        let value = shape_to_value(shape).unwrap();
        assert_eq!(value["type"], "arrow");
        assert_eq!(value["p1"], json!({"x": 100.0, "y": 100.0}));
        assert_eq!(value["p2"], json!({"x": 200.0, "y": 150.0}));
        assert_eq!(value["style"], "zigzag");
        assert_eq!(value["color"], "#ff0000");
    }

    #[test]
    fn test_cubic_is_three_curve_points() {
        let points = path_to_points(&[
            PathCommand::MoveTo(p(0.0, 0.0)),
            PathCommand::CubicTo(p(1.0, 1.0), p(2.0, 2.0), p(3.0, 3.0)),
        ]);
        assert_eq!(points.len(), 4);
        assert!(points[1..].iter().all(|pt| pt.cmd == PathVerb::Curve));
        assert_eq!(points_to_path(&points).len(), 2);
    }

    #[test]
    fn test_legacy_pos_offset_is_folded_in() {
        let shape = value_to_shape(&json!({
            "type": "rectangle",
            "rect": {"x": 0, "y": 0, "w": 40, "h": 20},
            "pos": {"x": 100, "y": 50},
            "color": "#00ff00",
            "pen_width": 3
        }))
        .unwrap();
        assert_eq!(shape.bounds(), Rect::from_min_max(p(100.0, 50.0), p(140.0, 70.0)));
        assert_eq!(shape.width, 3.0);

        let freehand = value_to_shape(&json!({
            "type": "freehand",
            "path": [{"t": "M", "x": 0, "y": 0}, {"t": "L", "x": 10, "y": 10}],
            "pos": {"x": 5, "y": 5}
        }))
        .unwrap();
        assert_eq!(freehand.bounds(), Rect::from_min_max(p(5.0, 5.0), p(15.0, 15.0)));
        assert_eq!(freehand.width, DEFAULT_STROKE_WIDTH);
    }

    #[test]
    fn test_unknown_and_degenerate_records_are_skipped() {
        assert!(value_to_shape(&json!({"type": "player_tracker", "id": 7})).is_none());
        assert!(value_to_shape(&json!({"no_type": true})).is_none());
        assert!(value_to_shape(&json!({
            "type": "polygon",
            "points": [{"x": 0, "y": 0}, {"x": 1, "y": 1}]
        }))
        .is_none());
    }
}
