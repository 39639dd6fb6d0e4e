// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! The annotation scene: live shapes plus the pointer state machine.
//!
//! The scene owns every shape on the overlay in an arena keyed by
//! [`ShapeId`]; ids grow monotonically so the map order is also the paint
//! order. Shapes either were drawn in this session or were loaded from a
//! stored record, in which case they remember the record's address.
//!
//! Pointer input drives a single [`Interaction`], so drawing, moving,
//! resizing and polygon building can never overlap. The scene never touches
//! the event store; it queues [`SceneEvent`]s that the host drains.

use std::collections::BTreeMap;

use egui::{Color32, Pos2, Rect, Vec2};
use serde_json::Value;

use super::bridge;
use super::render::{self, Surface};
use super::shape::{Curve, Freehand, Shape, ShapeKind, TextShape};
use super::tool::Tool;
use crate::models::annotation::{
    AnnotationRecord, FontData, LineStyle, PathCommand, PolygonFill, DEFAULT_STROKE_WIDTH,
};
use crate::models::event::{RecordRef, StoredRecord};

/// Clicking this close to the first vertex closes a polygon.
pub const POLYGON_CLOSE_DISTANCE: f32 = 15.0;

/// A new polygon vertex this close to the previous one is ignored.
pub const POLYGON_VERTEX_DEDUP: f32 = 2.0;

/// Offset applied to pasted and duplicated shapes.
pub const PASTE_OFFSET: Vec2 = Vec2::new(15.0, 15.0);

/// Drags shorter than this create nothing.
pub const MIN_DRAG_DISTANCE: f32 = 3.0;

/// Half the width of the open end of a light cone.
pub const CONE_HALF_WIDTH: f32 = 40.0;

/// Height of a lob arc as a fraction of the pass length.
pub const PARABOLA_LIFT: f32 = 0.45;

pub type ShapeId = u64;

/// Where a shape came from.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeOrigin {
    /// Drawn in this session and not yet tied to a stored record.
    Drawn,
    /// Materialised from (or bound to) a stored record.
    Loaded(RecordRef),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneItem {
    pub shape: Shape,
    pub origin: ShapeOrigin,
    /// A confirmation has been emitted for this shape.
    confirmed: bool,
}

/// The one pointer interaction in progress.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Interaction {
    #[default]
    Idle,
    Drawing {
        tool: Tool,
        start: Pos2,
        current: Pos2,
        /// Pencil samples in scene coordinates.
        path: Vec<PathCommand>,
    },
    Moving {
        target: ShapeId,
        last: Pos2,
        moved: bool,
    },
    Resizing {
        target: ShapeId,
        handle: usize,
        original: Shape,
        changed: bool,
    },
    BuildingPolygon {
        vertices: Vec<Pos2>,
        cursor: Option<Pos2>,
    },
}

/// Notifications for the host.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    /// A draw gesture began; playback should freeze.
    DrawingStarted,
    /// A shape was added to the scene.
    DrawingAdded(ShapeId),
    /// A shape is finished and should be persisted at the current time.
    DrawingConfirmed { id: ShapeId, record: Value },
    /// A loaded shape was deleted; remove its record.
    AnnotationDeleted(RecordRef),
    /// A loaded shape changed; replace its record.
    AnnotationModified { location: RecordRef, record: Value },
    /// Click on empty video with no tool active.
    EmptyClick(Pos2),
    /// Wheel over the video with the zoom tool.
    ZoomRequested { delta: f32, anchor: Pos2 },
}

/// Interactive annotation overlay.
#[derive(Debug, Clone)]
pub struct AnnotationScene {
    items: BTreeMap<ShapeId, SceneItem>,
    next_id: ShapeId,
    tool: Tool,
    color: Color32,
    width: f32,
    line_style: LineStyle,
    polygon_fill: PolygonFill,
    polygon_opacity: f32,
    font: FontData,
    selected: Option<ShapeId>,
    editing_text: Option<ShapeId>,
    interaction: Interaction,
    clipboard: Option<AnnotationRecord>,
    visible: bool,
    events: Vec<SceneEvent>,
}

impl Default for AnnotationScene {
    fn default() -> Self {
        Self::new(Color32::YELLOW, DEFAULT_STROKE_WIDTH)
    }
}

impl AnnotationScene {
    pub fn new(color: Color32, width: f32) -> Self {
        Self {
            items: BTreeMap::new(),
            next_id: 1,
            tool: Tool::None,
            color,
            width,
            line_style: LineStyle::Straight,
            polygon_fill: PolygonFill::Solid,
            polygon_opacity: 0.35,
            font: FontData::default(),
            selected: None,
            editing_text: None,
            interaction: Interaction::Idle,
            clipboard: None,
            visible: true,
            events: Vec::new(),
        }
    }

    // ----- state accessors -----

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn color(&self) -> Color32 {
        self.color
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn line_style(&self) -> LineStyle {
        self.line_style
    }

    pub fn polygon_fill(&self) -> (PolygonFill, f32) {
        (self.polygon_fill, self.polygon_opacity)
    }

    pub fn font(&self) -> &FontData {
        &self.font
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn selected(&self) -> Option<ShapeId> {
        self.selected
    }

    pub fn selected_item(&self) -> Option<&SceneItem> {
        self.selected.and_then(|id| self.items.get(&id))
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn item(&self, id: ShapeId) -> Option<&SceneItem> {
        self.items.get(&id)
    }

    /// Items in paint order.
    pub fn items(&self) -> impl Iterator<Item = (ShapeId, &SceneItem)> {
        self.items.iter().map(|(id, item)| (*id, item))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Take all pending notifications.
    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }

    // ----- tool state -----

    /// Switch tool. Any in-progress drawing and the selection are dropped.
    pub fn set_tool(&mut self, tool: Tool) {
        self.finish_text_edit();
        if matches!(
            self.interaction,
            Interaction::Drawing { .. } | Interaction::BuildingPolygon { .. }
        ) {
            log::debug!("Tool switch discards in-progress drawing");
        }
        self.interaction = Interaction::Idle;
        self.selected = None;
        self.tool = tool;
    }

    pub fn set_color(&mut self, color: Color32) {
        self.color = color;
    }

    pub fn set_width(&mut self, width: f32) {
        self.width = width.clamp(1.0, 20.0);
    }

    pub fn set_line_style(&mut self, style: LineStyle) {
        self.line_style = style;
    }

    pub fn set_polygon_fill(&mut self, fill: PolygonFill, opacity: f32) {
        self.polygon_fill = fill;
        self.polygon_opacity = opacity;
    }

    pub fn set_font(&mut self, font: FontData) {
        self.font = font;
    }

    /// Show or hide every shape. Hidden shapes cannot be hit.
    pub fn set_visible(&mut self, visible: bool) {
        if !visible {
            self.selected = None;
            if matches!(
                self.interaction,
                Interaction::Moving { .. } | Interaction::Resizing { .. }
            ) {
                self.interaction = Interaction::Idle;
            }
        }
        self.visible = visible;
    }

    // ----- record binding -----

    /// Replace the scene contents with the shapes of `records`. A text still
    /// being typed is dropped unless it already has a record, in which case
    /// the edit is finished against that record. A drawing gesture in
    /// progress survives; unreadable records are skipped.
    pub fn load_records(&mut self, records: &[StoredRecord]) {
        if let Some(id) = self.editing_text {
            let unconfirmed = self
                .items
                .get(&id)
                .is_some_and(|item| !item.confirmed && item.origin == ShapeOrigin::Drawn);
            if unconfirmed {
                self.editing_text = None;
                self.items.remove(&id);
                log::debug!("Dropped unconfirmed text on reload");
            } else {
                self.finish_text_edit();
            }
        }
        self.items.clear();
        self.selected = None;
        if matches!(
            self.interaction,
            Interaction::Moving { .. } | Interaction::Resizing { .. }
        ) {
            self.interaction = Interaction::Idle;
        }

        let mut loaded = 0;
        for stored in records {
            if let Some(shape) = bridge::value_to_shape(&stored.data) {
                self.insert(shape, ShapeOrigin::Loaded(stored.location.clone()), true);
                loaded += 1;
            }
        }
        log::debug!("Loaded {} of {} annotation records", loaded, records.len());
    }

    /// Tie a drawn shape to the record the host stored for it.
    pub fn bind_record(&mut self, id: ShapeId, location: RecordRef) -> bool {
        match self.items.get_mut(&id) {
            Some(item) => {
                item.origin = ShapeOrigin::Loaded(location);
                true
            }
            None => false,
        }
    }

    /// Remove every shape and reset interaction.
    pub fn clear(&mut self) {
        self.items.clear();
        self.selected = None;
        self.editing_text = None;
        self.interaction = Interaction::Idle;
    }

    fn insert(&mut self, shape: Shape, origin: ShapeOrigin, confirmed: bool) -> ShapeId {
        let id = self.next_id;
        self.next_id += 1;
        self.items.insert(
            id,
            SceneItem {
                shape,
                origin,
                confirmed,
            },
        );
        id
    }

    /// Add a finished shape, announce it and ask for it to be stored.
    fn commit(&mut self, shape: Shape) -> ShapeId {
        log::info!("Confirmed {} annotation", shape.kind.name());
        let record = bridge::shape_to_value(&shape);
        let id = self.insert(shape, ShapeOrigin::Drawn, true);
        self.events.push(SceneEvent::DrawingAdded(id));
        match record {
            Ok(record) => self.events.push(SceneEvent::DrawingConfirmed { id, record }),
            Err(e) => log::error!("Failed to serialize annotation: {}", e),
        }
        id
    }

    /// Notify the host that a loaded shape changed.
    fn notify_modified(&mut self, id: ShapeId) {
        let Some(item) = self.items.get(&id) else {
            return;
        };
        let ShapeOrigin::Loaded(location) = &item.origin else {
            return;
        };
        match bridge::shape_to_value(&item.shape) {
            Ok(record) => self.events.push(SceneEvent::AnnotationModified {
                location: location.clone(),
                record,
            }),
            Err(e) => log::error!("Failed to serialize annotation: {}", e),
        }
    }

    // ----- hit testing -----

    /// Topmost visible shape whose border is under `pos`.
    pub fn shape_at(&self, pos: Pos2) -> Option<ShapeId> {
        if !self.visible {
            return None;
        }
        self.items
            .iter()
            .rev()
            .find(|(_, item)| item.shape.hit_test(pos))
            .map(|(id, _)| *id)
    }

    fn selected_handle_at(&self, pos: Pos2) -> Option<usize> {
        if !self.visible {
            return None;
        }
        self.selected_item().and_then(|item| item.shape.handle_at(pos))
    }

    // ----- pointer input -----

    /// Primary button pressed at `pos` (scene coordinates).
    pub fn pointer_down(&mut self, pos: Pos2) {
        if let Interaction::BuildingPolygon { vertices, .. } = &mut self.interaction {
            let close = vertices
                .first()
                .is_some_and(|first| (pos - *first).length() <= POLYGON_CLOSE_DISTANCE);
            if close {
                self.close_polygon();
            } else if vertices
                .last()
                .map_or(true, |last| (pos - *last).length() > POLYGON_VERTEX_DEDUP)
            {
                vertices.push(pos);
            }
            return;
        }

        if let Some(editing) = self.editing_text {
            let inside = self
                .items
                .get(&editing)
                .is_some_and(|item| item.shape.bounds().contains(pos));
            if inside {
                return;
            }
            self.finish_text_edit();
        }

        if let (Some(target), Some(handle)) = (self.selected, self.selected_handle_at(pos)) {
            if let Some(item) = self.items.get(&target) {
                self.interaction = Interaction::Resizing {
                    target,
                    handle,
                    original: item.shape.clone(),
                    changed: false,
                };
                return;
            }
        }

        if let Some(hit) = self.shape_at(pos) {
            if self.selected == Some(hit) {
                self.interaction = Interaction::Moving {
                    target: hit,
                    last: pos,
                    moved: false,
                };
            } else {
                self.selected = Some(hit);
                self.interaction = Interaction::Idle;
            }
            return;
        }

        self.selected = None;
        match self.tool {
            Tool::None => self.events.push(SceneEvent::EmptyClick(pos)),
            Tool::Zoom => {}
            Tool::Polygon => {
                self.events.push(SceneEvent::DrawingStarted);
                self.interaction = Interaction::BuildingPolygon {
                    vertices: vec![pos],
                    cursor: None,
                };
            }
            Tool::Text => {
                self.events.push(SceneEvent::DrawingStarted);
                let mut text = TextShape::new(pos, String::new());
                text.font = self.font.clone();
                text.editing = true;
                let shape = Shape::new(ShapeKind::Text(text), self.color, self.width);
                let id = self.insert(shape, ShapeOrigin::Drawn, false);
                self.events.push(SceneEvent::DrawingAdded(id));
                self.editing_text = Some(id);
                self.selected = Some(id);
            }
            tool => {
                self.events.push(SceneEvent::DrawingStarted);
                self.interaction = Interaction::Drawing {
                    tool,
                    start: pos,
                    current: pos,
                    path: vec![PathCommand::MoveTo(pos)],
                };
            }
        }
    }

    /// Pointer moved to `pos` (with or without the button held).
    pub fn pointer_move(&mut self, pos: Pos2) {
        match &mut self.interaction {
            Interaction::Idle => {}
            Interaction::Drawing {
                tool,
                current,
                path,
                ..
            } => {
                *current = pos;
                if *tool == Tool::Pencil {
                    let last = path.last().map(|c| match *c {
                        PathCommand::MoveTo(p) | PathCommand::LineTo(p) => p,
                        PathCommand::CubicTo(_, _, p) => p,
                    });
                    if last.map_or(true, |l| (pos - l).length() >= 1.0) {
                        path.push(PathCommand::LineTo(pos));
                    }
                }
            }
            Interaction::Moving { target, last, moved } => {
                let delta = pos - *last;
                if delta != Vec2::ZERO {
                    if let Some(item) = self.items.get_mut(target) {
                        item.shape.translate(delta);
                        *moved = true;
                    }
                    *last = pos;
                }
            }
            Interaction::Resizing {
                target,
                handle,
                original,
                changed,
            } => {
                // A rejected step keeps the last accepted geometry.
                if let Some(item) = self.items.get_mut(target) {
                    if item.shape.apply_handle_drag(*handle, pos, original) {
                        *changed = true;
                    }
                }
            }
            Interaction::BuildingPolygon { cursor, .. } => *cursor = Some(pos),
        }
    }

    /// Primary button released at `pos`.
    pub fn pointer_up(&mut self, pos: Pos2) {
        match std::mem::take(&mut self.interaction) {
            Interaction::Drawing {
                tool,
                start,
                mut path,
                ..
            } => {
                if tool == Tool::Pencil {
                    path.push(PathCommand::LineTo(pos));
                }
                match self.gesture_shape(tool, start, pos, &path) {
                    Some(shape) => {
                        self.commit(shape);
                    }
                    None => log::debug!("Discarded too small {:?} gesture", tool),
                }
            }
            Interaction::Moving { target, moved, .. } => {
                if moved {
                    self.notify_modified(target);
                }
            }
            Interaction::Resizing { target, changed, .. } => {
                if changed {
                    self.notify_modified(target);
                }
            }
            building @ Interaction::BuildingPolygon { .. } => self.interaction = building,
            Interaction::Idle => {}
        }
    }

    /// Double click: closes a polygon in progress, or opens a text for editing.
    pub fn double_click(&mut self, pos: Pos2) {
        if matches!(self.interaction, Interaction::BuildingPolygon { .. }) {
            self.close_polygon();
            return;
        }
        let Some(id) = self.shape_at(pos) else {
            return;
        };
        if let Some(item) = self.items.get_mut(&id) {
            if let Some(text) = item.shape.as_text_mut() {
                text.editing = true;
                self.editing_text = Some(id);
                self.selected = Some(id);
                self.interaction = Interaction::Idle;
            }
        }
    }

    /// Mouse wheel over the overlay. Returns `true` when consumed.
    pub fn scroll(&mut self, delta: f32, pos: Pos2) -> bool {
        if self.tool == Tool::Zoom {
            self.events.push(SceneEvent::ZoomRequested { delta, anchor: pos });
            true
        } else {
            false
        }
    }

    /// Escape: abandon any gesture, stop editing, drop the selection.
    pub fn cancel(&mut self) {
        self.finish_text_edit();
        self.interaction = Interaction::Idle;
        self.selected = None;
    }

    fn close_polygon(&mut self) {
        let Interaction::BuildingPolygon { vertices, .. } = std::mem::take(&mut self.interaction) else {
            return;
        };
        if vertices.len() < 3 {
            log::debug!("Discarded polygon with {} vertices", vertices.len());
            return;
        }
        let shape = Shape::new(
            ShapeKind::Polygon {
                vertices,
                fill: self.polygon_fill,
                opacity: self.polygon_opacity,
            },
            self.color,
            self.width,
        );
        self.commit(shape);
    }

    /// Build the shape a press-drag-release gesture describes.
    fn gesture_shape(&self, tool: Tool, start: Pos2, end: Pos2, path: &[PathCommand]) -> Option<Shape> {
        if tool == Tool::Pencil {
            if path.len() <= 2 {
                return None;
            }
            let kind = ShapeKind::Freehand(Freehand::from_scene_path(path));
            return Some(Shape::new(kind, self.color, self.width));
        }
        if (end - start).length() < MIN_DRAG_DISTANCE {
            return None;
        }
        gesture_kind(tool, start, end, self.line_style).map(|kind| Shape::new(kind, self.color, self.width))
    }

    // ----- text editing -----

    pub fn editing_text(&self) -> Option<ShapeId> {
        self.editing_text
    }

    /// Mutable access to the text being edited.
    pub fn editing_text_mut(&mut self) -> Option<&mut TextShape> {
        let id = self.editing_text?;
        self.items.get_mut(&id).and_then(|item| item.shape.as_text_mut())
    }

    /// Leave text edit mode. A new text is confirmed exactly once (or
    /// dropped if empty); an edited loaded text reports a modification.
    pub fn finish_text_edit(&mut self) {
        let Some(id) = self.editing_text.take() else {
            return;
        };
        let Some(item) = self.items.get_mut(&id) else {
            return;
        };
        let empty = match item.shape.as_text_mut() {
            Some(text) => {
                text.editing = false;
                text.content.trim().is_empty()
            }
            None => false,
        };

        match (&item.origin, item.confirmed) {
            (ShapeOrigin::Drawn, false) if empty => {
                self.items.remove(&id);
                if self.selected == Some(id) {
                    self.selected = None;
                }
            }
            (ShapeOrigin::Drawn, false) => {
                item.confirmed = true;
                let shape = item.shape.clone();
                log::info!("Confirmed text annotation");
                match bridge::shape_to_value(&shape) {
                    Ok(record) => self.events.push(SceneEvent::DrawingConfirmed { id, record }),
                    Err(e) => log::error!("Failed to serialize annotation: {}", e),
                }
            }
            (ShapeOrigin::Loaded(_), _) => self.notify_modified(id),
            (ShapeOrigin::Drawn, true) => {}
        }
    }

    // ----- context operations on the selection -----

    /// Delete the selected shape. A loaded shape also asks the host to drop
    /// its record; sibling records of the same event shift down one index.
    pub fn delete_selected(&mut self) -> bool {
        let Some(id) = self.selected.take() else {
            return false;
        };
        if self.editing_text == Some(id) {
            self.editing_text = None;
        }
        self.interaction = Interaction::Idle;
        let Some(item) = self.items.remove(&id) else {
            return false;
        };
        log::info!("Deleted {} annotation", item.shape.kind.name());

        if let ShapeOrigin::Loaded(removed) = item.origin {
            for other in self.items.values_mut() {
                if let ShapeOrigin::Loaded(location) = &mut other.origin {
                    if location.event_id == removed.event_id && location.index > removed.index {
                        location.index -= 1;
                    }
                }
            }
            self.events.push(SceneEvent::AnnotationDeleted(removed));
        }
        true
    }

    /// Copy the selected shape to the internal clipboard.
    pub fn copy_selected(&mut self) -> bool {
        match self.selected_item() {
            Some(item) => {
                self.clipboard = Some(bridge::shape_to_record(&item.shape));
                true
            }
            None => false,
        }
    }

    pub fn has_clipboard(&self) -> bool {
        self.clipboard.is_some()
    }

    /// Paste the clipboard shape offset by [`PASTE_OFFSET`] and select it.
    pub fn paste(&mut self) -> Option<ShapeId> {
        let record = self.clipboard.clone()?;
        self.paste_record(&record)
    }

    /// Copy and paste in one step, leaving the clipboard alone.
    pub fn duplicate_selected(&mut self) -> Option<ShapeId> {
        let record = bridge::shape_to_record(&self.selected_item()?.shape);
        self.paste_record(&record)
    }

    fn paste_record(&mut self, record: &AnnotationRecord) -> Option<ShapeId> {
        let mut shape = bridge::record_to_shape(record)?;
        shape.translate(PASTE_OFFSET);
        if let Some(text) = shape.as_text_mut() {
            text.editing = false;
        }
        let id = self.commit(shape);
        self.selected = Some(id);
        Some(id)
    }

    /// Recolour the selected shape.
    pub fn recolor_selected(&mut self, color: Color32) -> bool {
        self.edit_selected(|shape| shape.set_color(color))
    }

    /// Change the stroke width of the selected shape (clamped to 1..=20).
    pub fn set_selected_width(&mut self, width: f32) -> bool {
        self.edit_selected(|shape| shape.set_width(width))
    }

    /// Change font of the selected text.
    pub fn set_selected_font(&mut self, font: FontData) -> bool {
        self.edit_selected(|shape| {
            if let Some(text) = shape.as_text_mut() {
                text.font = font.clone();
            }
        })
    }

    /// Apply any text styling to the selected text.
    pub fn style_selected_text(&mut self, apply: impl FnOnce(&mut TextShape)) -> bool {
        let Some(id) = self.selected else {
            return false;
        };
        let Some(text) = self.items.get_mut(&id).and_then(|i| i.shape.as_text_mut()) else {
            return false;
        };
        apply(text);
        if self.editing_text != Some(id) {
            self.notify_modified(id);
        }
        true
    }

    fn edit_selected(&mut self, apply: impl FnOnce(&mut Shape)) -> bool {
        let Some(id) = self.selected else {
            return false;
        };
        let Some(item) = self.items.get_mut(&id) else {
            return false;
        };
        apply(&mut item.shape);
        if self.editing_text != Some(id) {
            self.notify_modified(id);
        }
        true
    }

    // ----- painting -----

    /// Paint the scene in scene coordinates.
    pub fn paint(&self, surface: &mut Surface<'_>) {
        if self.visible {
            for (id, item) in &self.items {
                render::render_shape(&item.shape, self.selected == Some(*id), surface);
            }
            if let Some(item) = self.selected_item() {
                render::render_handles(&item.shape.handles(), surface);
            }
        }

        match &self.interaction {
            Interaction::Drawing {
                tool,
                start,
                current,
                path,
            } => {
                if let Some(preview) = self.gesture_shape(*tool, *start, *current, path) {
                    render::render_shape(&preview, false, surface);
                }
            }
            Interaction::BuildingPolygon { vertices, cursor } => {
                render::render_polygon_preview(vertices, *cursor, self.color, self.width, surface);
            }
            _ => {}
        }
    }

    /// Bounding box of the text being edited, for placing an editor widget.
    pub fn editing_text_rect(&self) -> Option<Rect> {
        let id = self.editing_text?;
        self.items.get(&id).map(|item| item.shape.bounds())
    }
}

/// Geometry for a drag from `start` to `end` with `tool`.
pub fn gesture_kind(tool: Tool, start: Pos2, end: Pos2, current_style: LineStyle) -> Option<ShapeKind> {
    if let Some(params) = tool.stroke_params(current_style) {
        return Some(if params.is_arrow {
            ShapeKind::Arrow {
                p1: start,
                p2: end,
                style: params.style,
                double_head: params.double_head,
            }
        } else {
            ShapeKind::Line {
                p1: start,
                p2: end,
                style: params.style,
            }
        });
    }

    let mid = start + (end - start) * 0.5;
    match tool {
        Tool::Circle => Some(ShapeKind::Circle {
            rect: Rect::from_two_pos(start, end),
        }),
        Tool::Rectangle => Some(ShapeKind::Rectangle {
            rect: Rect::from_two_pos(start, end),
        }),
        Tool::CurvedLine => Some(ShapeKind::CurvedLine(Curve {
            p1: start,
            ctrl: mid,
            p2: end,
        })),
        Tool::CurvedArrow => Some(ShapeKind::CurvedArrow(Curve {
            p1: start,
            ctrl: mid,
            p2: end,
        })),
        Tool::ParabolaArrow => {
            let lift = (end - start).length() * PARABOLA_LIFT;
            Some(ShapeKind::ParabolaArrow(Curve {
                p1: start,
                ctrl: Pos2::new(mid.x, start.y.min(end.y) - lift),
                p2: end,
            }))
        }
        Tool::Cone => {
            let dir = (end - start).normalized();
            let perp = Vec2::new(-dir.y, dir.x) * CONE_HALF_WIDTH;
            Some(ShapeKind::Cone {
                points: [start, end + perp, end - perp],
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::geometry;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use serde_json::json;

    fn p(x: f32, y: f32) -> Pos2 {
        Pos2::new(x, y)
    }

    fn drag(scene: &mut AnnotationScene, from: Pos2, to: Pos2) {
        scene.pointer_down(from);
        scene.pointer_move(from + (to - from) * 0.5);
        scene.pointer_move(to);
        scene.pointer_up(to);
    }

    fn stored(event: &str, index: usize, data: Value) -> StoredRecord {
        StoredRecord {
            location: RecordRef {
                event_id: event.into(),
                index,
            },
            data,
        }
    }

    fn rect_record(x: f32, y: f32) -> Value {
        json!({"type": "rectangle", "rect": {"x": x, "y": y, "w": 100, "h": 100}, "color": "#ff0000"})
    }

    #[test]
    fn test_draw_arrow_confirms_record() {
        let mut scene = AnnotationScene::default();
        scene.set_tool(Tool::Arrow);
        drag(&mut scene, p(100.0, 100.0), p(200.0, 150.0));

        let events = scene.drain_events();
        assert_eq!(events[0], SceneEvent::DrawingStarted);
        assert!(matches!(events[1], SceneEvent::DrawingAdded(_)));
        let SceneEvent::DrawingConfirmed { record, .. } = &events[2] else {
            panic!("expected confirmation, got {:?}", events);
        };
        assert_eq!(record["type"], "arrow");
        assert_eq!(record["p1"], json!({"x": 100.0, "y": 100.0}));
        assert_eq!(record["p2"], json!({"x": 200.0, "y": 150.0}));
        assert_eq!(scene.len(), 1);
        assert_eq!(*scene.interaction(), Interaction::Idle);
    }

    #[test]
    fn test_click_without_drag_draws_nothing() {
        let mut scene = AnnotationScene::default();
        scene.set_tool(Tool::Circle);
        scene.pointer_down(p(10.0, 10.0));
        scene.pointer_up(p(11.0, 10.0));
        assert!(scene.is_empty());
        assert_eq!(scene.drain_events(), vec![SceneEvent::DrawingStarted]);
    }

    #[test]
    fn test_empty_click_without_tool() {
        let mut scene = AnnotationScene::default();
        scene.pointer_down(p(40.0, 50.0));
        scene.pointer_up(p(40.0, 50.0));
        assert_eq!(scene.drain_events(), vec![SceneEvent::EmptyClick(p(40.0, 50.0))]);
    }

    #[test]
    fn test_pencil_needs_more_than_two_points() {
        let mut scene = AnnotationScene::default();
        scene.set_tool(Tool::Pencil);
        scene.pointer_down(p(0.0, 0.0));
        scene.pointer_up(p(50.0, 50.0));
        assert!(scene.is_empty());

        scene.pointer_down(p(0.0, 0.0));
        for i in 1..10 {
            scene.pointer_move(p(i as f32 * 5.0, (i as f32).sin() * 10.0));
        }
        scene.pointer_up(p(50.0, 0.0));
        assert_eq!(scene.len(), 1);
        let (_, item) = scene.items().next().unwrap();
        assert!(matches!(item.shape.kind, ShapeKind::Freehand(_)));
    }

    #[test]
    fn test_select_then_move_loaded_shape_reports_modification() {
        let mut scene = AnnotationScene::default();
        scene.load_records(&[stored("evt_1", 0, rect_record(0.0, 0.0))]);

        // First press on the border selects, second starts moving.
        scene.pointer_down(p(0.0, 25.0));
        scene.pointer_up(p(0.0, 25.0));
        assert!(scene.selected().is_some());
        scene.pointer_down(p(0.0, 25.0));
        assert!(matches!(scene.interaction(), Interaction::Moving { .. }));
        scene.pointer_move(p(10.0, 35.0));
        scene.pointer_up(p(10.0, 35.0));

        let events = scene.drain_events();
        assert_eq!(events.len(), 1);
        let SceneEvent::AnnotationModified { location, record } = &events[0] else {
            panic!("expected modification, got {:?}", events);
        };
        assert_eq!(location.event_id, "evt_1");
        assert_eq!(record["rect"]["x"], 10.0);
        assert_eq!(record["rect"]["y"], 10.0);
    }

    #[test]
    fn test_interior_click_does_not_select() {
        let mut scene = AnnotationScene::default();
        scene.load_records(&[stored("evt_1", 0, rect_record(0.0, 0.0))]);
        scene.pointer_down(p(50.0, 50.0));
        scene.pointer_up(p(50.0, 50.0));
        assert_eq!(scene.selected(), None);
        assert_eq!(scene.drain_events(), vec![SceneEvent::EmptyClick(p(50.0, 50.0))]);
    }

    #[test]
    fn test_resize_through_handle() {
        let mut scene = AnnotationScene::default();
        scene.load_records(&[stored("evt_1", 0, rect_record(0.0, 0.0))]);
        scene.pointer_down(p(100.0, 50.0));
        scene.pointer_up(p(100.0, 50.0));

        // Top-left handle.
        scene.pointer_down(p(1.0, 1.0));
        assert!(matches!(scene.interaction(), Interaction::Resizing { handle: 0, .. }));
        scene.pointer_move(p(20.0, 20.0));
        // Degenerate step is ignored, last good geometry stays.
        scene.pointer_move(p(95.0, 95.0));
        scene.pointer_up(p(95.0, 95.0));

        let id = scene.selected().unwrap();
        assert_eq!(
            scene.item(id).unwrap().shape.bounds(),
            Rect::from_min_max(p(20.0, 20.0), p(100.0, 100.0))
        );
        assert_eq!(scene.drain_events().len(), 1);
    }

    #[test]
    fn test_delete_loaded_shape_emits_one_removal() {
        let mut scene = AnnotationScene::default();
        scene.load_records(&[
            stored("evt_4", 0, rect_record(0.0, 0.0)),
            stored("evt_4", 1, rect_record(300.0, 0.0)),
            stored("evt_4", 2, rect_record(600.0, 0.0)),
        ]);
        scene.pointer_down(p(300.0, 50.0));
        scene.pointer_up(p(300.0, 50.0));
        assert!(scene.delete_selected());

        let events = scene.drain_events();
        assert_eq!(
            events,
            vec![SceneEvent::AnnotationDeleted(RecordRef {
                event_id: "evt_4".into(),
                index: 1
            })]
        );
        assert_eq!(scene.len(), 2);
        // The shape after the removed one now points at index 1.
        let indices: Vec<usize> = scene
            .items()
            .filter_map(|(_, item)| match &item.origin {
                ShapeOrigin::Loaded(r) => Some(r.index),
                ShapeOrigin::Drawn => None,
            })
            .collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn test_delete_drawn_shape_is_silent() {
        let mut scene = AnnotationScene::default();
        scene.set_tool(Tool::Rectangle);
        drag(&mut scene, p(0.0, 0.0), p(80.0, 80.0));
        scene.drain_events();
        scene.set_tool(Tool::None);
        scene.pointer_down(p(0.0, 40.0));
        assert!(scene.delete_selected());
        assert!(scene.drain_events().is_empty());
    }

    #[test]
    fn test_polygon_closes_near_first_vertex() {
        let mut scene = AnnotationScene::default();
        scene.set_tool(Tool::Polygon);
        for v in [p(0.0, 0.0), p(100.0, 0.0), p(100.0, 1.0), p(100.0, 80.0)] {
            scene.pointer_down(v);
            scene.pointer_up(v);
        }
        assert!(matches!(
            scene.interaction(),
            Interaction::BuildingPolygon { vertices, .. } if vertices.len() == 3
        ));
        scene.pointer_down(p(8.0, 6.0));
        scene.pointer_up(p(8.0, 6.0));

        assert_eq!(*scene.interaction(), Interaction::Idle);
        let (_, item) = scene.items().next().unwrap();
        assert_eq!(item.shape.handles().len(), 3);
        let events = scene.drain_events();
        assert_eq!(events[0], SceneEvent::DrawingStarted);
        assert!(matches!(events.last(), Some(SceneEvent::DrawingConfirmed { .. })));
    }

    #[test]
    fn test_polygon_with_two_vertices_is_discarded() {
        let mut scene = AnnotationScene::default();
        scene.set_tool(Tool::Polygon);
        scene.pointer_down(p(0.0, 0.0));
        scene.pointer_down(p(100.0, 0.0));
        scene.double_click(p(100.0, 0.0));
        assert!(scene.is_empty());
        assert_eq!(*scene.interaction(), Interaction::Idle);
    }

    #[test]
    fn test_copy_paste_offsets_and_confirms() {
        let mut scene = AnnotationScene::default();
        scene.load_records(&[stored("evt_1", 0, rect_record(0.0, 0.0))]);
        scene.pointer_down(p(0.0, 50.0));
        assert!(scene.copy_selected());
        let pasted = scene.paste().unwrap();

        assert_eq!(scene.selected(), Some(pasted));
        let item = scene.item(pasted).unwrap();
        assert_eq!(item.origin, ShapeOrigin::Drawn);
        assert_eq!(item.shape.bounds().min, p(15.0, 15.0));
        assert!(scene
            .drain_events()
            .iter()
            .any(|e| matches!(e, SceneEvent::DrawingConfirmed { id, .. } if *id == pasted)));
    }

    #[test]
    fn test_text_confirms_once_on_focus_loss() {
        let mut scene = AnnotationScene::default();
        scene.set_tool(Tool::Text);
        scene.pointer_down(p(50.0, 50.0));
        scene.editing_text_mut().unwrap().content = "Overload".into();

        // Clicking elsewhere ends the edit.
        scene.pointer_down(p(400.0, 400.0));
        scene.finish_text_edit();
        scene.set_tool(Tool::None);

        let confirmations = scene
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, SceneEvent::DrawingConfirmed { .. }))
            .count();
        assert_eq!(confirmations, 1);
        assert_eq!(scene.editing_text(), None);
    }

    #[test]
    fn test_reload_drops_text_still_being_typed() {
        let mut scene = AnnotationScene::default();
        scene.set_tool(Tool::Text);
        scene.pointer_down(p(50.0, 50.0));
        scene.editing_text_mut().unwrap().content = "Half a".into();

        scene.load_records(&[stored("evt_2", 0, rect_record(0.0, 0.0))]);
        assert_eq!(scene.editing_text(), None);
        assert_eq!(scene.len(), 1);
        assert!(scene.shape_at(p(0.0, 50.0)).is_some());
        assert!(!scene
            .drain_events()
            .iter()
            .any(|e| matches!(e, SceneEvent::DrawingConfirmed { .. })));
    }

    #[test]
    fn test_empty_text_is_dropped() {
        let mut scene = AnnotationScene::default();
        scene.set_tool(Tool::Text);
        scene.pointer_down(p(50.0, 50.0));
        scene.cancel();
        assert!(scene.is_empty());
    }

    #[test]
    fn test_tool_switch_clears_gesture_and_selection() {
        let mut scene = AnnotationScene::default();
        scene.load_records(&[stored("evt_1", 0, rect_record(0.0, 0.0))]);
        scene.pointer_down(p(0.0, 50.0));
        assert!(scene.selected().is_some());
        scene.set_tool(Tool::Polygon);
        assert_eq!(scene.selected(), None);
        scene.pointer_down(p(300.0, 300.0));
        scene.set_tool(Tool::Circle);
        assert_eq!(*scene.interaction(), Interaction::Idle);
    }

    #[test]
    fn test_load_skips_unknown_records_and_hidden_shapes_are_not_hit() {
        let mut scene = AnnotationScene::default();
        scene.load_records(&[
            stored("evt_1", 0, json!({"type": "hologram"})),
            stored("evt_1", 1, rect_record(0.0, 0.0)),
        ]);
        assert_eq!(scene.len(), 1);
        assert!(scene.shape_at(p(0.0, 50.0)).is_some());
        scene.set_visible(false);
        assert!(scene.shape_at(p(0.0, 50.0)).is_none());
    }

    #[test]
    fn test_zoom_tool_consumes_wheel() {
        let mut scene = AnnotationScene::default();
        assert!(!scene.scroll(120.0, p(5.0, 5.0)));
        scene.set_tool(Tool::Zoom);
        assert!(scene.scroll(120.0, p(5.0, 5.0)));
        assert_eq!(
            scene.drain_events(),
            vec![SceneEvent::ZoomRequested {
                delta: 120.0,
                anchor: p(5.0, 5.0)
            }]
        );
    }

    #[test]
    fn test_gesture_geometry() {
        let Some(ShapeKind::ParabolaArrow(c)) =
            gesture_kind(Tool::ParabolaArrow, p(0.0, 100.0), p(200.0, 100.0), LineStyle::Straight)
        else {
            panic!("expected parabola");
        };
        assert_eq!(c.ctrl, p(100.0, 100.0 - 90.0));

        let Some(ShapeKind::Cone { points }) =
            gesture_kind(Tool::Cone, p(0.0, 0.0), p(100.0, 0.0), LineStyle::Straight)
        else {
            panic!("expected cone");
        };
        assert_eq!(points, [p(0.0, 0.0), p(100.0, 40.0), p(100.0, -40.0)]);
    }

    #[test]
    fn test_recolor_loaded_reports_modification() {
        let mut scene = AnnotationScene::default();
        scene.load_records(&[stored("evt_2", 0, rect_record(0.0, 0.0))]);
        scene.pointer_down(p(0.0, 50.0));
        assert!(scene.recolor_selected(Color32::from_rgb(0, 0, 255)));
        assert!(scene.set_selected_width(40.0));
        let events = scene.drain_events();
        assert_eq!(events.len(), 2);
        let SceneEvent::AnnotationModified { record, .. } = &events[1] else {
            panic!("expected modification");
        };
        assert_eq!(record["color"], "#0000ff");
        assert_eq!(record["width"], 20.0);
    }

    fn exclusive(scene: &AnnotationScene) -> bool {
        let flags = [
            matches!(scene.interaction(), Interaction::Drawing { .. }),
            matches!(scene.interaction(), Interaction::Moving { .. }),
            matches!(scene.interaction(), Interaction::Resizing { .. }),
            matches!(scene.interaction(), Interaction::BuildingPolygon { .. }),
        ];
        flags.iter().filter(|f| **f).count() <= 1
    }

    #[test]
    fn test_random_pointer_sequences_keep_one_interaction() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut scene = AnnotationScene::default();
        scene.load_records(&[
            stored("evt_1", 0, rect_record(50.0, 50.0)),
            stored("evt_1", 1, rect_record(200.0, 120.0)),
        ]);

        for _ in 0..5000 {
            let pos = p(rng.gen_range(0.0..400.0), rng.gen_range(0.0..300.0));
            match rng.gen_range(0..10) {
                0 => scene.set_tool(Tool::ALL[rng.gen_range(0..Tool::ALL.len())]),
                1 | 2 => scene.pointer_down(pos),
                3 | 4 | 5 => scene.pointer_move(pos),
                6 | 7 => scene.pointer_up(pos),
                8 => scene.double_click(pos),
                _ => {
                    if rng.gen_bool(0.5) {
                        scene.delete_selected();
                    } else {
                        scene.cancel();
                    }
                }
            }
            assert!(exclusive(&scene));
            if let Interaction::Resizing { target, .. } | Interaction::Moving { target, .. } =
                scene.interaction()
            {
                assert!(scene.item(*target).is_some());
            }
            scene.drain_events();
        }
        // Every surviving shape still has finite bounds.
        for (_, item) in scene.items() {
            let b = item.shape.bounds();
            assert!(b.min.x.is_finite() && b.max.y.is_finite());
            assert!(geometry::bounds_of(item.shape.handles()).map_or(true, |r| r.is_finite()));
        }
    }
}
