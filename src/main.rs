// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Pitchmark - match video analysis
//!
//! A desktop tool for marking timestamped match events, drawing tactical
//! annotations on paused frames and cutting highlight clips.

mod app;
mod config;
mod io;
mod models;
mod playback;
mod scene;
mod ui;
mod util;

use anyhow::Result;
use app::AnalyzerApp;

fn main() -> Result<()> {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1440.0, 900.0])
            .with_min_inner_size([960.0, 640.0])
            .with_title("Pitchmark - Match Analysis"),
        ..Default::default()
    };

    eframe::run_native(
        "Pitchmark",
        options,
        Box::new(|_cc| Ok(Box::new(AnalyzerApp::new()))),
    )
    .map_err(|e| anyhow::anyhow!("Application error: {}", e))?;

    Ok(())
}
