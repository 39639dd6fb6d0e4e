// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! I/O: media decoding, highlight clips and project files.

pub mod clip;
pub mod media;
pub mod serialization;
