// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Project state management.
//!
//! A project ties the analysed video to its event list (and through the
//! events, to every stored drawing).

use super::event::EventManager;
use serde::{Deserialize, Serialize};

/// Complete project data for serialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectData {
    #[serde(default)]
    pub video_path: Option<String>,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(flatten)]
    pub events: EventManager,
}

impl ProjectData {
    /// Create a new project for the given video.
    pub fn new(video_path: String, duration_ms: u64) -> Self {
        Self {
            video_path: Some(video_path),
            duration_ms,
            events: EventManager::new(),
        }
    }
}
