// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

pub mod bridge;
pub mod render;
#[allow(clippy::module_inception)]
pub mod scene;
pub mod shape;
pub mod tool;

pub use scene::{AnnotationScene, Interaction, SceneEvent, ShapeId, ShapeOrigin};
pub use tool::Tool;
