// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Timestamped match events and their annotation lists.
//!
//! An event owns an ordered list of annotation records. Records are kept as
//! raw JSON values so that anything we cannot display (an unknown `type`,
//! say) is still written back untouched on save.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Type id of events created to hold drawings.
pub const ANNOTATION_EVENT_TYPE: &str = "annotation";

/// Type id of events created by clicking on the video with no tool.
pub const GENERIC_EVENT_TYPE: &str = "event";

/// A kind of event, shown as a button in the event panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventType {
    pub id: String,
    pub name: String,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default = "default_type_color")]
    pub color: String,
}

fn default_icon() -> String {
    "•".to_string()
}

fn default_type_color() -> String {
    "#FFFFFF".to_string()
}

impl EventType {
    fn new(id: &str, name: &str, icon: &str, color: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            icon: icon.to_string(),
            color: color.to_string(),
        }
    }
}

/// Built-in event types.
pub fn default_event_types() -> Vec<EventType> {
    vec![
        EventType::new("goal", "Goal", "⚽", "#22C55E"),
        EventType::new("shot_on", "Shot on target", "🎯", "#3B82F6"),
        EventType::new("shot_off", "Shot off target", "🚫", "#EF4444"),
        EventType::new("corner", "Corner", "🟨", "#F59E0B"),
        EventType::new("pass", "Pass", "↔", "#8B5CF6"),
        EventType::new(GENERIC_EVENT_TYPE, "Event", "📌", "#9CA3AF"),
        EventType::new(ANNOTATION_EVENT_TYPE, "Annotation", "✏", "#FACC15"),
    ]
}

/// A single annotated moment in the video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub event_type_id: String,
    pub timestamp_ms: u64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub annotations: Vec<Value>,
}

/// Address of one record: owning event plus position in its list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordRef {
    pub event_id: String,
    pub index: usize,
}

/// A record found at a timestamp, with its address.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub location: RecordRef,
    pub data: Value,
}

/// What the annotation engine needs from whoever keeps the events.
pub trait EventStore {
    /// Records attached to events at exactly `timestamp_ms`, in event then
    /// list order.
    fn records_at(&self, timestamp_ms: u64) -> Vec<StoredRecord>;

    /// Append to the event at exactly `timestamp_ms`, creating an annotation
    /// event when there is none.
    fn append_record(&mut self, timestamp_ms: u64, record: Value) -> RecordRef;

    fn update_record(&mut self, location: &RecordRef, record: Value) -> bool;

    /// Remove a record. An event left without records is removed as well.
    fn remove_record(&mut self, location: &RecordRef) -> bool;
}

/// In-memory event list, kept sorted by timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventManager {
    #[serde(default = "default_event_types")]
    pub event_types: Vec<EventType>,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub counter: u64,
}

impl EventManager {
    pub fn new() -> Self {
        Self {
            event_types: default_event_types(),
            events: Vec::new(),
            counter: 0,
        }
    }

    pub fn event_type(&self, type_id: &str) -> Option<&EventType> {
        self.event_types.iter().find(|t| t.id == type_id)
    }

    /// Add an event and return its id. Unknown type ids are refused.
    pub fn add_event(
        &mut self,
        event_type_id: &str,
        timestamp_ms: u64,
        label: Option<String>,
        annotations: Vec<Value>,
    ) -> Option<String> {
        if self.event_type(event_type_id).is_none() {
            log::warn!("Refusing event with unknown type '{}'", event_type_id);
            return None;
        }

        self.counter += 1;
        let id = format!("evt_{}", self.counter);
        self.events.push(Event {
            id: id.clone(),
            event_type_id: event_type_id.to_string(),
            timestamp_ms,
            description: String::new(),
            team: None,
            label,
            annotations,
        });
        // Stable sort keeps insertion order among equal timestamps.
        self.events.sort_by_key(|e| e.timestamp_ms);
        log::info!("Added event {} ({}) at {} ms", id, event_type_id, timestamp_ms);
        Some(id)
    }

    pub fn remove_event(&mut self, event_id: &str) -> bool {
        let before = self.events.len();
        self.events.retain(|e| e.id != event_id);
        let removed = self.events.len() != before;
        if removed {
            log::info!("Removed event {}", event_id);
        }
        removed
    }

    pub fn event(&self, event_id: &str) -> Option<&Event> {
        self.events.iter().find(|e| e.id == event_id)
    }

    fn event_mut(&mut self, event_id: &str) -> Option<&mut Event> {
        self.events.iter_mut().find(|e| e.id == event_id)
    }

    pub fn set_label(&mut self, event_id: &str, label: &str) -> bool {
        match self.event_mut(event_id) {
            Some(event) => {
                let trimmed = label.trim();
                event.label = (!trimmed.is_empty()).then(|| trimmed.to_string());
                true
            }
            None => false,
        }
    }

    /// Event just before `timestamp_ms`, for keyboard navigation.
    pub fn previous_event(&self, timestamp_ms: u64) -> Option<&Event> {
        self.events.iter().rev().find(|e| e.timestamp_ms < timestamp_ms)
    }

    /// Event just after `timestamp_ms`.
    pub fn next_event(&self, timestamp_ms: u64) -> Option<&Event> {
        self.events.iter().find(|e| e.timestamp_ms > timestamp_ms)
    }

    /// Display label: custom label, else the type name.
    pub fn display_label(&self, event: &Event) -> String {
        event.label.clone().unwrap_or_else(|| {
            self.event_type(&event.event_type_id)
                .map(|t| t.name.clone())
                .unwrap_or_else(|| event.event_type_id.clone())
        })
    }
}

impl EventStore for EventManager {
    fn records_at(&self, timestamp_ms: u64) -> Vec<StoredRecord> {
        self.events
            .iter()
            .filter(|e| e.timestamp_ms == timestamp_ms)
            .flat_map(|e| {
                e.annotations.iter().enumerate().map(|(index, data)| StoredRecord {
                    location: RecordRef {
                        event_id: e.id.clone(),
                        index,
                    },
                    data: data.clone(),
                })
            })
            .collect()
    }

    fn append_record(&mut self, timestamp_ms: u64, record: Value) -> RecordRef {
        if let Some(event) = self.events.iter_mut().find(|e| e.timestamp_ms == timestamp_ms) {
            event.annotations.push(record);
            let location = RecordRef {
                event_id: event.id.clone(),
                index: event.annotations.len() - 1,
            };
            log::info!("Appended annotation to {} at index {}", location.event_id, location.index);
            return location;
        }

        let label = format!("Annotation {}s", timestamp_ms / 1000);
        self.counter += 1;
        let id = format!("evt_{}", self.counter);
        self.events.push(Event {
            id: id.clone(),
            event_type_id: ANNOTATION_EVENT_TYPE.to_string(),
            timestamp_ms,
            description: String::new(),
            team: None,
            label: Some(label),
            annotations: vec![record],
        });
        self.events.sort_by_key(|e| e.timestamp_ms);
        log::info!("Created annotation event {} at {} ms", id, timestamp_ms);
        RecordRef { event_id: id, index: 0 }
    }

    fn update_record(&mut self, location: &RecordRef, record: Value) -> bool {
        match self
            .event_mut(&location.event_id)
            .and_then(|e| e.annotations.get_mut(location.index))
        {
            Some(slot) => {
                *slot = record;
                log::debug!("Updated annotation {}[{}]", location.event_id, location.index);
                true
            }
            None => false,
        }
    }

    fn remove_record(&mut self, location: &RecordRef) -> bool {
        let Some(event) = self.event_mut(&location.event_id) else {
            return false;
        };
        if location.index >= event.annotations.len() {
            return false;
        }
        event.annotations.remove(location.index);
        let now_empty = event.annotations.is_empty();
        log::info!("Removed annotation {}[{}]", location.event_id, location.index);
        if now_empty {
            self.remove_event(&location.event_id);
        }
        true
    }
}
