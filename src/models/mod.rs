// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Data model: annotation records, events and the project file.

pub mod annotation;
pub mod event;
pub mod project;
