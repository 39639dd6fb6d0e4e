// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Geometric kernel for annotation rendering.
//!
//! Pure functions that build the 2D paths and polygons the drawable shapes
//! are made of: straight/dashed/zigzag strokes, arrow heads, the bevel
//! gradient used for volumetric arrows, quadratic Bezier curves (plain and
//! trimmed), polygon triangulation and stripe hatching. Nothing in here
//! keeps state; all angles are radians from `atan2`.

use egui::{Color32, Pos2, Rect, Vec2};

use crate::models::annotation::{LineStyle, PathCommand};

/// Lower/upper clamp for the zigzag amplitude in pixels.
pub const ZIGZAG_MIN_AMPLITUDE: f32 = 4.0;
pub const ZIGZAG_MAX_AMPLITUDE: f32 = 8.0;

/// Segments used when sampling a quadratic/cubic Bezier into a polyline.
pub const CURVE_SEGMENTS: usize = 32;

/// A polyline plus the flag telling the renderer to dash it.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokePath {
    pub points: Vec<Pos2>,
    pub dashed: bool,
}

/// Build the centre line for a straight, dashed or zigzag stroke from `p1`
/// to `p2`, shortened by `trim_start`/`trim_end` pixels at each end so an
/// arrow head can sit there without overlapping the body.
pub fn build_stroke_path(
    style: LineStyle,
    p1: Pos2,
    p2: Pos2,
    trim_start: f32,
    trim_end: f32,
) -> StrokePath {
    let dir = p2 - p1;
    let length = non_zero(dir.length());
    let unit = dir / length;

    let start = if trim_start > 0.0 { p1 + unit * trim_start } else { p1 };
    let end = if trim_end > 0.0 { p2 - unit * trim_end } else { p2 };

    let mut points = vec![start];
    match style {
        LineStyle::Straight | LineStyle::Dashed => points.push(end),
        LineStyle::Zigzag => {
            let effective = non_zero((end - start).length());
            let amplitude = (effective * 0.04).clamp(ZIGZAG_MIN_AMPLITUDE, ZIGZAG_MAX_AMPLITUDE);
            zigzag_points(&mut points, start, end, amplitude);
        }
    }

    StrokePath {
        points,
        dashed: style == LineStyle::Dashed,
    }
}

/// Append a sine wave from `a` towards `b`. The wave ends on the baseline
/// (sin = 0) and a short straight run finishes at `b`, so the direction of
/// travel stays readable right before the arrow head.
fn zigzag_points(out: &mut Vec<Pos2>, a: Pos2, b: Pos2, amplitude: f32) {
    let d = b - a;
    let length = non_zero(d.length());
    let perp = Vec2::new(-d.y / length, d.x / length);

    let straight_len = (length * 0.06).max(10.0);
    let cycles = (((length - straight_len) / 28.0) as i32).max(4) as f32;
    let k_end = (((1.0 - straight_len / length) * cycles) as i32).max(1) as f32;
    let t_wave_end = k_end / cycles;
    let n_points = ((cycles as usize) * 10).max(30);

    for i in 1..=n_points {
        let t = (i as f32 / n_points as f32) * t_wave_end;
        let offset = amplitude * (t * cycles * std::f32::consts::TAU).sin();
        out.push(a + d * t + perp * offset);
    }
    out.push(b);
}

/// Direction from `p1` towards `p2`.
pub fn direction_angle(p1: Pos2, p2: Pos2) -> f32 {
    (p2.y - p1.y).atan2(p2.x - p1.x)
}

/// Isosceles arrow head: apex at `tip`, base perpendicular to `angle`,
/// `length` back from the tip, `base_width` wide. Returned as `[a, tip, b]`.
pub fn arrow_head_polygon(tip: Pos2, angle: f32, length: f32, base_width: f32) -> [Pos2; 3] {
    let half = base_width / 2.0;
    let (sin, cos) = angle.sin_cos();
    let base = Pos2::new(tip.x - length * cos, tip.y - length * sin);
    let perp = Vec2::new(-sin, cos);
    [base - perp * half, tip, base + perp * half]
}

/// Five-stop linear gradient faking an extruded, bevelled surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BevelGradient {
    pub start: Pos2,
    pub end: Pos2,
    pub stops: [(f32, Color32); 5],
}

impl BevelGradient {
    /// Colour at `pos`, projected onto the gradient axis.
    pub fn sample(&self, pos: Pos2) -> Color32 {
        let axis = self.end - self.start;
        let len_sq = axis.length_sq();
        let t = if len_sq <= f32::EPSILON {
            0.5
        } else {
            ((pos - self.start).dot(axis) / len_sq).clamp(0.0, 1.0)
        };

        for pair in self.stops.windows(2) {
            let (t0, c0) = pair[0];
            let (t1, c1) = pair[1];
            if t <= t1 {
                let local = if t1 > t0 { (t - t0) / (t1 - t0) } else { 0.0 };
                return lerp_color(c0, c1, local);
            }
        }
        self.stops[4].1
    }
}

/// Gradient from a light edge to a dark edge around `base`: +80 / +35 /
/// base / -35 / -80 per channel at stops 0, 0.25, 0.5, 0.75 and 1.
pub fn bevel_gradient(light: Pos2, dark: Pos2, base: Color32) -> BevelGradient {
    BevelGradient {
        start: light,
        end: dark,
        stops: [
            (0.0, shift_luminance(base, 80)),
            (0.25, shift_luminance(base, 35)),
            (0.5, base),
            (0.75, shift_luminance(base, -35)),
            (1.0, shift_luminance(base, -80)),
        ],
    }
}

/// Add `delta` to each RGB channel, saturating. Alpha is kept.
pub fn shift_luminance(color: Color32, delta: i16) -> Color32 {
    let shift = |c: u8| (c as i16 + delta).clamp(0, 255) as u8;
    Color32::from_rgba_unmultiplied(shift(color.r()), shift(color.g()), shift(color.b()), color.a())
}

fn lerp_color(a: Color32, b: Color32, t: f32) -> Color32 {
    let mix = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t).round() as u8;
    Color32::from_rgba_unmultiplied(
        mix(a.r(), b.r()),
        mix(a.g(), b.g()),
        mix(a.b(), b.b()),
        mix(a.a(), b.a()),
    )
}

pub fn quadratic_point(p1: Pos2, ctrl: Pos2, p2: Pos2, t: f32) -> Pos2 {
    let u = 1.0 - t;
    Pos2::new(
        u * u * p1.x + 2.0 * u * t * ctrl.x + t * t * p2.x,
        u * u * p1.y + 2.0 * u * t * ctrl.y + t * t * p2.y,
    )
}

/// Quadratic Bezier from `p1` to `p2` sampled into a polyline.
pub fn quadratic_bezier(p1: Pos2, ctrl: Pos2, p2: Pos2) -> Vec<Pos2> {
    (0..=CURVE_SEGMENTS)
        .map(|i| quadratic_point(p1, ctrl, p2, i as f32 / CURVE_SEGMENTS as f32))
        .collect()
}

/// Parameter at which a quadratic curve should stop so that roughly
/// `trim_from_end` pixels are left before `p2`. Uses a linear
/// distance-to-t estimate against the last control leg, which is close
/// enough for arrow-head sized trims.
pub fn trim_parameter(ctrl: Pos2, p2: Pos2, trim_from_end: f32) -> f32 {
    if trim_from_end <= 0.0 {
        return 1.0;
    }
    let leg = non_zero((p2 - ctrl).length());
    (1.0 - trim_from_end / (2.0 * leg)).max(0.0)
}

/// Quadratic Bezier shortened by `trim_from_end` pixels at the `p2` end.
/// The returned polyline follows the original curve up to the trim point.
pub fn trimmed_quadratic_bezier(p1: Pos2, ctrl: Pos2, p2: Pos2, trim_from_end: f32) -> Vec<Pos2> {
    let t_end = trim_parameter(ctrl, p2, trim_from_end);
    if t_end >= 1.0 {
        return quadratic_bezier(p1, ctrl, p2);
    }
    // de Casteljau split at t_end keeps the first half on the same curve.
    let sub_ctrl = p1 + (ctrl - p1) * t_end;
    let sub_end = quadratic_point(p1, ctrl, p2, t_end);
    quadratic_bezier(p1, sub_ctrl, sub_end)
}

/// Tangent direction of a quadratic Bezier at `t = 1`.
pub fn bezier_end_angle(ctrl: Pos2, p2: Pos2) -> f32 {
    direction_angle(ctrl, p2)
}

pub fn cubic_point(p0: Pos2, c1: Pos2, c2: Pos2, p3: Pos2, t: f32) -> Pos2 {
    let u = 1.0 - t;
    let a = u * u * u;
    let b = 3.0 * u * u * t;
    let c = 3.0 * u * t * t;
    let d = t * t * t;
    Pos2::new(
        a * p0.x + b * c1.x + c * c2.x + d * p3.x,
        a * p0.y + b * c1.y + c * c2.y + d * p3.y,
    )
}

/// Flatten a command path into its sub-polylines (one per `MoveTo`).
pub fn flatten_path(commands: &[PathCommand]) -> Vec<Vec<Pos2>> {
    let mut subpaths: Vec<Vec<Pos2>> = Vec::new();
    let mut current: Vec<Pos2> = Vec::new();

    for command in commands {
        match *command {
            PathCommand::MoveTo(p) => {
                if current.len() > 1 {
                    subpaths.push(std::mem::take(&mut current));
                }
                current.clear();
                current.push(p);
            }
            PathCommand::LineTo(p) => current.push(p),
            PathCommand::CubicTo(c1, c2, p) => {
                let start = current.last().copied().unwrap_or(c1);
                for i in 1..=CURVE_SEGMENTS {
                    current.push(cubic_point(start, c1, c2, p, i as f32 / CURVE_SEGMENTS as f32));
                }
            }
        }
    }
    if !current.is_empty() {
        subpaths.push(current);
    }
    subpaths
}

/// Every point a command path mentions, control points included.
pub fn path_control_points(commands: &[PathCommand]) -> impl Iterator<Item = Pos2> + '_ {
    commands.iter().flat_map(|command| {
        let points: Vec<Pos2> = match *command {
            PathCommand::MoveTo(p) | PathCommand::LineTo(p) => vec![p],
            PathCommand::CubicTo(c1, c2, p) => vec![c1, c2, p],
        };
        points
    })
}

/// Map every point of a command path through `f`.
pub fn map_path(commands: &[PathCommand], f: impl Fn(Pos2) -> Pos2) -> Vec<PathCommand> {
    commands
        .iter()
        .map(|command| match *command {
            PathCommand::MoveTo(p) => PathCommand::MoveTo(f(p)),
            PathCommand::LineTo(p) => PathCommand::LineTo(f(p)),
            PathCommand::CubicTo(c1, c2, p) => PathCommand::CubicTo(f(c1), f(c2), f(p)),
        })
        .collect()
}

/// Axis-aligned bounds of a point set.
pub fn bounds_of(points: impl IntoIterator<Item = Pos2>) -> Option<Rect> {
    let mut iter = points.into_iter();
    let first = iter.next()?;
    let mut rect = Rect::from_min_max(first, first);
    for p in iter {
        rect.extend_with(p);
    }
    Some(rect)
}

pub fn distance_to_segment(point: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ab = b - a;
    let ap = point - a;
    let len_sq = ab.length_sq();
    if len_sq <= f32::EPSILON {
        return ap.length();
    }
    let t = (ap.dot(ab) / len_sq).clamp(0.0, 1.0);
    (point - (a + ab * t)).length()
}

/// Distance from `point` to a polyline, optionally closed.
pub fn distance_to_polyline(point: Pos2, points: &[Pos2], closed: bool) -> f32 {
    match points.len() {
        0 => f32::INFINITY,
        1 => (point - points[0]).length(),
        n => {
            let mut best = f32::INFINITY;
            for w in points.windows(2) {
                best = best.min(distance_to_segment(point, w[0], w[1]));
            }
            if closed {
                best = best.min(distance_to_segment(point, points[n - 1], points[0]));
            }
            best
        }
    }
}

/// Ellipse inscribed in `rect` as a closed polyline (first point not repeated).
pub fn ellipse_points(rect: Rect, segments: usize) -> Vec<Pos2> {
    let center = rect.center();
    let radii = rect.size() * 0.5;
    (0..segments)
        .map(|i| {
            let angle = i as f32 / segments as f32 * std::f32::consts::TAU;
            Pos2::new(center.x + radii.x * angle.cos(), center.y + radii.y * angle.sin())
        })
        .collect()
}

pub fn rect_corners(rect: Rect) -> [Pos2; 4] {
    [
        rect.left_top(),
        rect.right_top(),
        rect.right_bottom(),
        rect.left_bottom(),
    ]
}

/// Even-odd point in polygon test.
pub fn point_in_polygon(point: Pos2, polygon: &[Pos2]) -> bool {
    let mut inside = false;
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let (pi, pj) = (polygon[i], polygon[j]);
        if (pi.y > point.y) != (pj.y > point.y)
            && point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn signed_area(polygon: &[Pos2]) -> f32 {
    let n = polygon.len();
    (0..n)
        .map(|i| {
            let (a, b) = (polygon[i], polygon[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum::<f32>()
        * 0.5
}

fn cross(o: Pos2, a: Pos2, b: Pos2) -> f32 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

fn point_in_triangle(p: Pos2, a: Pos2, b: Pos2, c: Pos2) -> bool {
    let d1 = cross(a, b, p);
    let d2 = cross(b, c, p);
    let d3 = cross(c, a, p);
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}

/// Ear-clipping triangulation of a simple polygon. Returns index triples.
pub fn triangulate_polygon(polygon: &[Pos2]) -> Vec<[usize; 3]> {
    let n = polygon.len();
    if n < 3 {
        return Vec::new();
    }

    let mut indices: Vec<usize> = (0..n).collect();
    if signed_area(polygon) < 0.0 {
        indices.reverse();
    }

    let mut triangles = Vec::with_capacity(n - 2);
    let mut guard = 0;
    while indices.len() > 3 && guard < n * n {
        guard += 1;
        let m = indices.len();
        let mut clipped = false;
        for i in 0..m {
            let (ia, ib, ic) = (indices[(i + m - 1) % m], indices[i], indices[(i + 1) % m]);
            let (a, b, c) = (polygon[ia], polygon[ib], polygon[ic]);
            if cross(a, b, c) <= 0.0 {
                continue;
            }
            let blocked = indices
                .iter()
                .filter(|&&k| k != ia && k != ib && k != ic)
                .any(|&k| point_in_triangle(polygon[k], a, b, c));
            if blocked {
                continue;
            }
            triangles.push([ia, ib, ic]);
            indices.remove(i);
            clipped = true;
            break;
        }
        if !clipped {
            // Degenerate or self-intersecting input: fan the rest.
            break;
        }
    }
    if indices.len() >= 3 {
        for k in 1..indices.len() - 1 {
            triangles.push([indices[0], indices[k], indices[k + 1]]);
        }
    }
    triangles
}

/// 45-degree stripe hatch of `polygon`, clipped to its interior. Stripes are
/// `spacing` pixels apart measured along the x axis.
pub fn hatch_segments(polygon: &[Pos2], spacing: f32) -> Vec<[Pos2; 2]> {
    let Some(bounds) = bounds_of(polygon.iter().copied()) else {
        return Vec::new();
    };
    if polygon.len() < 3 || spacing <= 0.0 {
        return Vec::new();
    }

    // Lines x - y = c sweep across the bounding box.
    let c_min = bounds.min.x - bounds.max.y;
    let c_max = bounds.max.x - bounds.min.y;
    let n = polygon.len();
    let mut segments = Vec::new();

    let mut c = c_min + spacing * 0.5;
    while c < c_max {
        let mut hits: Vec<f32> = Vec::new();
        for i in 0..n {
            let (a, b) = (polygon[i], polygon[(i + 1) % n]);
            let fa = a.x - a.y - c;
            let fb = b.x - b.y - c;
            if (fa > 0.0) != (fb > 0.0) {
                let t = fa / (fa - fb);
                hits.push(a.y + (b.y - a.y) * t);
            }
        }
        hits.sort_by(|a, b| a.total_cmp(b));
        for pair in hits.chunks_exact(2) {
            let (y0, y1) = (pair[0], pair[1]);
            segments.push([Pos2::new(c + y0, y0), Pos2::new(c + y1, y1)]);
        }
        c += spacing;
    }
    segments
}

/// Left/right offsets of a polyline at `half_width`, used to build flat-cap
/// stroke bodies. Interior joints use the averaged normal.
pub fn offset_polyline(points: &[Pos2], half_width: f32) -> Vec<(Pos2, Pos2)> {
    let n = points.len();
    if n < 2 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let before = if i > 0 { Some(points[i] - points[i - 1]) } else { None };
            let after = if i + 1 < n { Some(points[i + 1] - points[i]) } else { None };
            let dir = match (before, after) {
                (Some(b), Some(a)) => normalized_or_zero(b) + normalized_or_zero(a),
                (Some(b), None) => b,
                (None, Some(a)) => a,
                (None, None) => Vec2::X,
            };
            let normal = normalized_or_zero(dir).rot90();
            (points[i] - normal * half_width, points[i] + normal * half_width)
        })
        .collect()
}

fn normalized_or_zero(v: Vec2) -> Vec2 {
    let len = v.length();
    if len <= f32::EPSILON {
        Vec2::ZERO
    } else {
        v / len
    }
}

fn non_zero(length: f32) -> f32 {
    if length <= f32::EPSILON {
        1.0
    } else {
        length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Pos2, b: Pos2) -> bool {
        (a - b).length() < 1e-3
    }

    #[test]
    fn test_straight_stroke_is_trimmed_at_both_ends() {
        let path = build_stroke_path(
            LineStyle::Straight,
            Pos2::new(0.0, 0.0),
            Pos2::new(100.0, 0.0),
            10.0,
            24.0,
        );
        assert_eq!(path.points.len(), 2);
        assert!(close(path.points[0], Pos2::new(10.0, 0.0)));
        assert!(close(path.points[1], Pos2::new(76.0, 0.0)));
        assert!(!path.dashed);
    }

    #[test]
    fn test_dashed_stroke_only_sets_flag() {
        let path = build_stroke_path(
            LineStyle::Dashed,
            Pos2::new(0.0, 0.0),
            Pos2::new(0.0, 50.0),
            0.0,
            0.0,
        );
        assert!(path.dashed);
        assert_eq!(path.points, vec![Pos2::new(0.0, 0.0), Pos2::new(0.0, 50.0)]);
    }

    #[test]
    fn test_zigzag_stays_within_amplitude_and_ends_on_axis() {
        let p1 = Pos2::new(0.0, 0.0);
        let p2 = Pos2::new(400.0, 0.0);
        let path = build_stroke_path(LineStyle::Zigzag, p1, p2, 0.0, 0.0);

        assert!(path.points.len() > 30);
        for p in &path.points {
            assert!(p.y.abs() <= ZIGZAG_MAX_AMPLITUDE + 1e-3);
        }
        // Wave closes on the baseline before the straight run to the tip.
        let before_tip = path.points[path.points.len() - 2];
        assert!(before_tip.y.abs() < 1e-2);
        assert!(before_tip.x < 400.0 - 10.0 + 1e-3);
        assert_eq!(*path.points.last().unwrap(), p2);
    }

    #[test]
    fn test_zigzag_amplitude_is_clamped_for_short_strokes() {
        let path = build_stroke_path(
            LineStyle::Zigzag,
            Pos2::new(0.0, 0.0),
            Pos2::new(40.0, 0.0),
            0.0,
            0.0,
        );
        let peak = path.points.iter().map(|p| p.y.abs()).fold(0.0, f32::max);
        assert!(peak > ZIGZAG_MIN_AMPLITUDE * 0.8);
        assert!(peak <= ZIGZAG_MIN_AMPLITUDE + 1e-3);
    }

    #[test]
    fn test_arrow_head_is_isosceles() {
        let tip = Pos2::new(100.0, 50.0);
        let [a, apex, b] = arrow_head_polygon(tip, 0.0, 24.0, 20.0);
        assert_eq!(apex, tip);
        assert!(close(a, Pos2::new(76.0, 40.0)));
        assert!(close(b, Pos2::new(76.0, 60.0)));
        assert!(((a - tip).length() - (b - tip).length()).abs() < 1e-4);
    }

    #[test]
    fn test_bevel_gradient_stops() {
        let base = Color32::from_rgb(100, 100, 100);
        let gradient = bevel_gradient(Pos2::new(0.0, 0.0), Pos2::new(0.0, 100.0), base);
        assert_eq!(gradient.sample(Pos2::new(0.0, 0.0)), Color32::from_rgb(180, 180, 180));
        assert_eq!(gradient.sample(Pos2::new(0.0, 25.0)), Color32::from_rgb(135, 135, 135));
        assert_eq!(gradient.sample(Pos2::new(5.0, 50.0)), base);
        assert_eq!(gradient.sample(Pos2::new(0.0, 75.0)), Color32::from_rgb(65, 65, 65));
        assert_eq!(gradient.sample(Pos2::new(0.0, 140.0)), Color32::from_rgb(20, 20, 20));
    }

    #[test]
    fn test_shift_luminance_saturates() {
        let c = shift_luminance(Color32::from_rgb(250, 10, 128), 80);
        assert_eq!((c.r(), c.g(), c.b()), (255, 90, 208));
        let d = shift_luminance(Color32::from_rgb(250, 10, 128), -80);
        assert_eq!((d.r(), d.g(), d.b()), (170, 0, 48));
    }

    #[test]
    fn test_trimmed_bezier_stops_short_of_end() {
        let p1 = Pos2::new(0.0, 0.0);
        let ctrl = Pos2::new(50.0, -80.0);
        let p2 = Pos2::new(100.0, 0.0);
        let full = quadratic_bezier(p1, ctrl, p2);
        let trimmed = trimmed_quadratic_bezier(p1, ctrl, p2, 20.0);

        assert_eq!(full.first(), trimmed.first());
        let gap = (p2 - *trimmed.last().unwrap()).length();
        // Linear approximation: close to the requested trim, not exact.
        assert!(gap > 10.0 && gap < 30.0, "gap {gap}");
        // Trimmed end lies on the original curve.
        let t = trim_parameter(ctrl, p2, 20.0);
        assert!(close(*trimmed.last().unwrap(), quadratic_point(p1, ctrl, p2, t)));
    }

    #[test]
    fn test_zero_trim_returns_full_curve() {
        let p1 = Pos2::new(0.0, 0.0);
        let ctrl = Pos2::new(10.0, 10.0);
        let p2 = Pos2::new(20.0, 0.0);
        assert_eq!(
            trimmed_quadratic_bezier(p1, ctrl, p2, 0.0),
            quadratic_bezier(p1, ctrl, p2)
        );
    }

    #[test]
    fn test_flatten_path_groups_cubic_segments() {
        let commands = vec![
            PathCommand::MoveTo(Pos2::new(0.0, 0.0)),
            PathCommand::LineTo(Pos2::new(10.0, 0.0)),
            PathCommand::CubicTo(Pos2::new(15.0, 0.0), Pos2::new(20.0, 5.0), Pos2::new(20.0, 10.0)),
        ];
        let subpaths = flatten_path(&commands);
        assert_eq!(subpaths.len(), 1);
        assert_eq!(subpaths[0].len(), 2 + CURVE_SEGMENTS);
        assert!(close(*subpaths[0].last().unwrap(), Pos2::new(20.0, 10.0)));
    }

    #[test]
    fn test_distance_to_polyline_closed() {
        let square = [
            Pos2::new(0.0, 0.0),
            Pos2::new(10.0, 0.0),
            Pos2::new(10.0, 10.0),
            Pos2::new(0.0, 10.0),
        ];
        assert!((distance_to_polyline(Pos2::new(-2.0, 5.0), &square, true) - 2.0).abs() < 1e-5);
        assert!(distance_to_polyline(Pos2::new(-2.0, 5.0), &square, false) > 1.9);
        assert!((distance_to_polyline(Pos2::new(5.0, 5.0), &square, true) - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_triangulate_concave_polygon() {
        // "L" shape, area 300.
        let polygon = [
            Pos2::new(0.0, 0.0),
            Pos2::new(20.0, 0.0),
            Pos2::new(20.0, 10.0),
            Pos2::new(10.0, 10.0),
            Pos2::new(10.0, 20.0),
            Pos2::new(0.0, 20.0),
        ];
        let triangles = triangulate_polygon(&polygon);
        assert_eq!(triangles.len(), 4);
        let area: f32 = triangles
            .iter()
            .map(|t| cross(polygon[t[0]], polygon[t[1]], polygon[t[2]]).abs() * 0.5)
            .sum();
        assert!((area - 300.0).abs() < 1e-3);
    }

    #[test]
    fn test_hatch_segments_stay_inside() {
        let square = [
            Pos2::new(0.0, 0.0),
            Pos2::new(100.0, 0.0),
            Pos2::new(100.0, 100.0),
            Pos2::new(0.0, 100.0),
        ];
        let stripes = hatch_segments(&square, 10.0);
        assert!(stripes.len() >= 15);
        for [a, b] in stripes {
            let mid = a + (b - a) * 0.5;
            assert!(point_in_polygon(mid, &square));
            // 45 degrees: dx == dy.
            assert!(((b.x - a.x) - (b.y - a.y)).abs() < 1e-3);
        }
    }

    #[test]
    fn test_offset_polyline_flat_caps() {
        let offsets = offset_polyline(&[Pos2::new(0.0, 0.0), Pos2::new(10.0, 0.0)], 2.0);
        assert_eq!(offsets.len(), 2);
        assert!(close(offsets[0].0, Pos2::new(0.0, -2.0)));
        assert!(close(offsets[0].1, Pos2::new(0.0, 2.0)));
        assert!(close(offsets[1].1, Pos2::new(10.0, 2.0)));
    }
}
