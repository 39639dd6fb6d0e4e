// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Main application state and egui App implementation.
//!
//! `AnalyzerApp` owns the playback clock, the annotation scene and the
//! project. Every frame it polls the clock, routes scene notifications to
//! the event store and keeps the overlay in step with playback: hidden while
//! playing, reloaded from the store whenever playback stops on a new time.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::time::Duration;

use crate::config::Settings;
use crate::io::clip::{event_clip_name, ClipCutter, ClipError};
use crate::io::media::{self, FrameSource, IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};
use crate::io::serialization::{self, PROJECT_EXTENSIONS};
use crate::models::event::{EventStore, GENERIC_EVENT_TYPE};
use crate::models::project::ProjectData;
use crate::playback::time::MonotonicTime;
use crate::playback::{FreezeCoordinator, FrameSink, PlaybackClock, PlaybackEvent};
use crate::scene::{AnnotationScene, SceneEvent};
use crate::ui::canvas::{self, CanvasOutput};
use crate::ui::properties::{self, PropertiesAction, PropertiesState, TextStyle};
use crate::ui::timeline::{self, TimelineAction, TimelineState};
use crate::ui::toolbar::{self, ToolbarAction, ToolbarState};
use crate::util::color::{parse_hex_or, to_hex};

/// Name of the assembled highlights reel.
const HIGHLIGHTS_NAME: &str = "highlights";

/// Result of background media loading.
struct LoadedMedia {
    path: PathBuf,
    source: Box<dyn FrameSource + Send>,
    project: Option<(ProjectData, PathBuf)>,
}

/// Work for the clip cutter thread.
#[derive(Debug, Clone)]
enum ClipJob {
    Event { timestamp_ms: u64, name: String },
    Range { start_ms: u64, end_ms: u64 },
    Highlights { events: Vec<(u64, String)> },
}

fn run_clip_job(cutter: &ClipCutter, source: &Path, job: ClipJob, pre: f64, post: f64) -> Result<PathBuf, ClipError> {
    match job {
        ClipJob::Event { timestamp_ms, name } => cutter.clip_around(source, timestamp_ms, pre, post, Some(&name)),
        ClipJob::Range { start_ms, end_ms } => cutter.clip_range(source, start_ms, end_ms, None),
        ClipJob::Highlights { events } => {
            let clips = cutter.clips_for_events(source, &events, pre, post);
            cutter.concat(&clips, HIGHLIGHTS_NAME)
        }
    }
}

/// Main application state.
pub struct AnalyzerApp {
    settings: Settings,
    clock: PlaybackClock,
    sink: FrameSink,
    scene: AnnotationScene,
    freeze: FreezeCoordinator,
    project: ProjectData,

    video_path: Option<PathBuf>,
    project_path: Option<PathBuf>,

    /// Timestamp whose records the scene currently shows.
    shown_at: Option<u64>,
    selected_event: Option<String>,
    label_draft: String,
    range_start: Option<u64>,
    /// Canvas placement from the last frame, for zoom anchoring.
    canvas: Option<CanvasOutput>,

    media_loader: Option<Receiver<Result<LoadedMedia, String>>>,
    clip_job: Option<Receiver<Result<PathBuf, ClipError>>>,
    loading_message: Option<String>,
    status: Option<String>,
    show_settings: bool,
}

impl Default for AnalyzerApp {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyzerApp {
    pub fn new() -> Self {
        Self::with_clock(
            Settings::load_or_default(),
            PlaybackClock::new(Box::new(MonotonicTime::new())),
        )
    }

    /// Build around an existing clock.
    pub fn with_clock(settings: Settings, clock: PlaybackClock) -> Self {
        let color = parse_hex_or(&settings.default_color, egui::Color32::YELLOW);
        let scene = AnnotationScene::new(color, settings.default_stroke_width);
        let freeze = FreezeCoordinator::new(settings.freeze_duration_secs);
        Self {
            settings,
            clock,
            sink: FrameSink::default(),
            scene,
            freeze,
            project: ProjectData::new(String::new(), 0),
            video_path: None,
            project_path: None,
            shown_at: None,
            selected_event: None,
            label_draft: String::new(),
            range_start: None,
            canvas: None,
            media_loader: None,
            clip_job: None,
            loading_message: None,
            status: None,
            show_settings: false,
        }
    }

    /// Current position as a store timestamp.
    fn current_timestamp(&self) -> u64 {
        self.clock.position_ms().max(0.0).round() as u64
    }

    fn report(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::info!("{}", message);
        self.status = Some(message);
    }

    // ----- media and project loading -----

    /// Open a video or still image in the background.
    fn open_media(&mut self, path: PathBuf) {
        let (sender, receiver) = channel();
        self.media_loader = Some(receiver);
        self.loading_message = Some(format!("Opening {}...", path.display()));
        let ffmpeg = self.settings.ffmpeg_program.clone();

        std::thread::spawn(move || {
            let result = media::open_source(&path, &ffmpeg)
                .map(|source| LoadedMedia {
                    path: path.clone(),
                    source,
                    project: None,
                })
                .map_err(|e| e.to_string());
            let _ = sender.send(result);
        });
    }

    /// Load a project file and the video it refers to, in the background.
    fn open_project(&mut self, path: PathBuf) {
        let (sender, receiver) = channel();
        self.media_loader = Some(receiver);
        self.loading_message = Some("Loading project and video...".to_string());
        let ffmpeg = self.settings.ffmpeg_program.clone();

        std::thread::spawn(move || {
            let result = (|| -> Result<LoadedMedia, String> {
                let project = serialization::load_project(&path).map_err(|e| format!("{:#}", e))?;
                let video = project
                    .video_path
                    .clone()
                    .map(PathBuf::from)
                    .ok_or_else(|| "Project does not name a video".to_string())?;
                if !video.exists() {
                    return Err(format!("Referenced video not found: {}", video.display()));
                }
                let source = media::open_source(&video, &ffmpeg).map_err(|e| e.to_string())?;
                Ok(LoadedMedia {
                    path: video,
                    source,
                    project: Some((project, path)),
                })
            })();
            let _ = sender.send(result);
        });
    }

    /// Hand a freshly opened source to the clock and reset per-video state.
    fn attach_media(&mut self, loaded: LoadedMedia) {
        let LoadedMedia { path, source, project } = loaded;
        match self.clock.load(source) {
            Ok((duration_ms, fps)) => {
                log::info!("Opened {} ({:.2} fps, {:.0} ms)", path.display(), fps, duration_ms);
                match project {
                    Some((mut project, project_path)) => {
                        project.duration_ms = duration_ms as u64;
                        self.project = project;
                        self.project_path = Some(project_path);
                    }
                    None => {
                        self.project = ProjectData::new(path.to_string_lossy().to_string(), duration_ms as u64);
                        self.project_path = None;
                    }
                }
                self.video_path = Some(path);
                self.scene.clear();
                self.shown_at = None;
                self.selected_event = None;
                self.range_start = None;
                self.status = None;
            }
            Err(e) => {
                log::error!("Failed to open {}: {}", path.display(), e);
                self.status = Some(format!("Could not open video: {}", e));
            }
        }
    }

    fn save_project_to(&mut self, path: PathBuf) {
        match serialization::save_project(&self.project, &path) {
            Ok(()) => {
                self.report(format!("Saved project to {}", path.display()));
                self.project_path = Some(path);
            }
            Err(e) => {
                log::error!("Failed to save project: {:#}", e);
                self.status = Some(format!("Save failed: {:#}", e));
            }
        }
    }

    fn save_project(&mut self) {
        let path = match self.project_path.clone() {
            Some(path) => Some(path),
            None => rfd::FileDialog::new()
                .add_filter("Project", PROJECT_EXTENSIONS)
                .set_file_name("match.json")
                .save_file(),
        };
        if let Some(path) = path {
            self.save_project_to(path);
        }
    }

    // ----- store and overlay synchronisation -----

    /// Apply scene notifications to the clock and the event store.
    fn handle_scene_events(&mut self) {
        for event in self.scene.drain_events() {
            match event {
                SceneEvent::DrawingStarted => self.freeze.drawing_started(&mut self.clock),
                SceneEvent::DrawingAdded(_) => {}
                SceneEvent::DrawingConfirmed { id, record } => {
                    if !self.clock.is_loaded() {
                        self.status = Some("Open a video to keep drawings".to_string());
                        continue;
                    }
                    let timestamp = self.current_timestamp();
                    let location = self.project.events.append_record(timestamp, record);
                    self.scene.bind_record(id, location.clone());
                    self.shown_at = Some(timestamp);
                    self.selected_event = Some(location.event_id);
                }
                SceneEvent::AnnotationDeleted(location) => {
                    self.project.events.remove_record(&location);
                    if self.project.events.event(&location.event_id).is_none()
                        && self.selected_event.as_deref() == Some(location.event_id.as_str())
                    {
                        self.selected_event = None;
                    }
                }
                SceneEvent::AnnotationModified { location, record } => {
                    if !self.project.events.update_record(&location, record) {
                        log::warn!("No record at {}[{}] to update", location.event_id, location.index);
                    }
                }
                SceneEvent::EmptyClick(_) => self.add_event(GENERIC_EVENT_TYPE),
                SceneEvent::ZoomRequested { delta, anchor } => {
                    if let Some(canvas) = self.canvas {
                        self.clock
                            .zoom_by_wheel(delta, canvas.origin + anchor.to_vec2(), canvas.fitted);
                    }
                }
            }
        }
    }

    fn handle_playback_events(&mut self) {
        for event in self.clock.drain_events() {
            match event {
                PlaybackEvent::EndOfStream => self.report("End of video"),
                PlaybackEvent::StateChanged { playing: true } => self.shown_at = None,
                PlaybackEvent::Loaded { .. }
                | PlaybackEvent::StateChanged { .. }
                | PlaybackEvent::PositionChanged(_) => {}
            }
        }
        self.refresh_visibility();
    }

    /// Hide the overlay while playing; when stopped, show the records stored
    /// at the current time.
    fn refresh_visibility(&mut self) {
        if self.clock.is_playing() {
            if self.scene.is_visible() {
                self.scene.set_visible(false);
            }
            return;
        }
        if self.clock.is_loaded() {
            let timestamp = self.current_timestamp();
            if self.shown_at != Some(timestamp) {
                let records = self.project.events.records_at(timestamp);
                self.scene.load_records(&records);
                self.shown_at = Some(timestamp);
            }
        }
        if !self.scene.is_visible() {
            self.scene.set_visible(true);
        }
    }

    fn add_event(&mut self, type_id: &str) {
        if !self.clock.is_loaded() {
            return;
        }
        let timestamp = self.current_timestamp();
        if let Some(id) = self.project.events.add_event(type_id, timestamp, None, Vec::new()) {
            self.label_draft.clear();
            self.selected_event = Some(id);
        }
    }

    fn seek(&mut self, ms: f64) {
        if let Err(e) = self.clock.seek(ms) {
            log::error!("Seek failed: {}", e);
            self.status = Some(e.to_string());
        }
    }

    fn select_event(&mut self, event_id: &str) {
        let Some(event) = self.project.events.event(event_id) else {
            return;
        };
        let timestamp = event.timestamp_ms;
        self.label_draft = event.label.clone().unwrap_or_default();
        self.selected_event = Some(event_id.to_string());
        self.clock.pause();
        self.seek(timestamp as f64);
    }

    fn jump_to_neighbour(&mut self, forward: bool) {
        let now = self.current_timestamp();
        let target = if forward {
            self.project.events.next_event(now)
        } else {
            self.project.events.previous_event(now)
        };
        if let Some(id) = target.map(|e| e.id.clone()) {
            self.select_event(&id);
        }
    }

    // ----- clip export -----

    fn start_clip_job(&mut self, job: ClipJob) {
        if self.clip_job.is_some() {
            return;
        }
        let Some(video) = self.video_path.clone() else {
            return;
        };
        let output_dir = video
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(&self.settings.highlights_folder);
        let cutter = ClipCutter::new(self.settings.ffmpeg_program.clone(), output_dir).with_timeouts(
            Duration::from_secs(self.settings.clip_timeout_secs),
            Duration::from_secs(self.settings.concat_timeout_secs),
        );
        let (pre, post) = (self.settings.clip_pre_seconds, self.settings.clip_post_seconds);

        let (sender, receiver) = channel();
        self.clip_job = Some(receiver);
        std::thread::spawn(move || {
            let _ = sender.send(run_clip_job(&cutter, &video, job, pre, post));
        });
    }

    fn clip_event(&mut self, event_id: &str) {
        let events = &self.project.events;
        let Some((index, event)) = events.events.iter().enumerate().find(|(_, e)| e.id == event_id) else {
            return;
        };
        let name = event_clip_name(index + 1, &events.display_label(event), event.timestamp_ms);
        let timestamp_ms = event.timestamp_ms;
        self.start_clip_job(ClipJob::Event { timestamp_ms, name });
    }

    fn clip_range(&mut self) {
        let end_ms = self.current_timestamp();
        match self.range_start {
            Some(start_ms) if start_ms < end_ms => {
                self.range_start = None;
                self.start_clip_job(ClipJob::Range { start_ms, end_ms });
            }
            _ => self.status = Some("Range end must be after its start".to_string()),
        }
    }

    fn export_highlights(&mut self) {
        let events: Vec<(u64, String)> = self
            .project
            .events
            .events
            .iter()
            .map(|e| (e.timestamp_ms, self.project.events.display_label(e)))
            .collect();
        self.start_clip_job(ClipJob::Highlights { events });
    }

    // ----- UI action dispatch -----

    fn apply_toolbar(&mut self, action: ToolbarAction) {
        match action {
            ToolbarAction::SetTool(tool) => self.scene.set_tool(tool),
            ToolbarAction::SetColor(color) => {
                self.scene.set_color(color);
                self.settings.default_color = to_hex(color);
            }
            ToolbarAction::SetWidth(width) => {
                self.scene.set_width(width);
                self.settings.default_stroke_width = self.scene.width();
            }
            ToolbarAction::SetLineStyle(style) => self.scene.set_line_style(style),
            ToolbarAction::SetPolygonFill(fill, opacity) => self.scene.set_polygon_fill(fill, opacity),
            ToolbarAction::SetRate(rate) => self.clock.set_rate(rate),
            ToolbarAction::ResetZoom => self.clock.reset_zoom(),
        }
    }

    fn apply_timeline(&mut self, action: TimelineAction) {
        let result = match action {
            TimelineAction::TogglePlay => self.clock.toggle(),
            TimelineAction::Stop => self.clock.stop(),
            TimelineAction::Step => self.clock.step_forward(),
            TimelineAction::Seek(ms) => self.clock.seek(ms),
            TimelineAction::PreviousEvent => {
                self.jump_to_neighbour(false);
                Ok(())
            }
            TimelineAction::NextEvent => {
                self.jump_to_neighbour(true);
                Ok(())
            }
        };
        if let Err(e) = result {
            log::error!("Playback error: {}", e);
            self.status = Some(e.to_string());
        }
    }

    fn apply_properties(&mut self, action: PropertiesAction) {
        match action {
            PropertiesAction::AddEvent(type_id) => self.add_event(&type_id),
            PropertiesAction::SelectEvent(id) => self.select_event(&id),
            PropertiesAction::DeleteEvent(id) => {
                if self.project.events.remove_event(&id) {
                    self.shown_at = None;
                    if self.selected_event.as_deref() == Some(id.as_str()) {
                        self.selected_event = None;
                    }
                }
            }
            PropertiesAction::RenameEvent(id, label) => {
                self.project.events.set_label(&id, &label);
            }
            PropertiesAction::RecolorSelected(color) => {
                self.scene.recolor_selected(color);
            }
            PropertiesAction::SetSelectedWidth(width) => {
                self.scene.set_selected_width(width);
            }
            PropertiesAction::StyleText(TextStyle::Size(size)) => {
                let font = self
                    .scene
                    .selected_item()
                    .and_then(|item| item.shape.as_text())
                    .map(|text| text.font.clone());
                if let Some(mut font) = font {
                    font.point_size = size;
                    self.scene.set_selected_font(font);
                }
            }
            PropertiesAction::StyleText(style) => {
                self.scene.style_selected_text(|text| style.apply(text));
            }
            PropertiesAction::DeleteSelected => {
                self.scene.delete_selected();
            }
            PropertiesAction::DuplicateSelected => {
                self.scene.duplicate_selected();
            }
            PropertiesAction::CopySelected => {
                self.scene.copy_selected();
            }
            PropertiesAction::Paste => {
                self.scene.paste();
            }
            PropertiesAction::ClipEvent(id) => self.clip_event(&id),
            PropertiesAction::MarkRangeStart => self.range_start = Some(self.current_timestamp()),
            PropertiesAction::ClipRange => self.clip_range(),
            PropertiesAction::ExportHighlights => self.export_highlights(),
        }
    }

    fn handle_keyboard(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let (delete, copy, paste, duplicate, escape, space, right) = ctx.input(|i| {
            let command = i.modifiers.command;
            (
                i.key_pressed(egui::Key::Delete),
                command && i.key_pressed(egui::Key::C),
                command && i.key_pressed(egui::Key::V),
                command && i.key_pressed(egui::Key::D),
                i.key_pressed(egui::Key::Escape),
                i.key_pressed(egui::Key::Space),
                i.key_pressed(egui::Key::ArrowRight),
            )
        });

        if delete {
            self.scene.delete_selected();
        }
        if copy {
            self.scene.copy_selected();
        }
        if paste {
            self.scene.paste();
        }
        if duplicate {
            self.scene.duplicate_selected();
        }
        if escape {
            self.scene.cancel();
        }
        if space {
            self.apply_timeline(TimelineAction::TogglePlay);
        }
        if right {
            self.apply_timeline(TimelineAction::Step);
        }
    }

    // ----- background work -----

    fn poll_background(&mut self) {
        if let Some(ref receiver) = self.media_loader {
            if let Ok(result) = receiver.try_recv() {
                self.media_loader = None;
                self.loading_message = None;
                match result {
                    Ok(loaded) => self.attach_media(loaded),
                    Err(e) => {
                        log::error!("Failed to load media: {}", e);
                        self.status = Some(e);
                    }
                }
            }
        }

        if let Some(ref receiver) = self.clip_job {
            if let Ok(result) = receiver.try_recv() {
                self.clip_job = None;
                match result {
                    Ok(path) => self.report(format!("Clip saved to {}", path.display())),
                    Err(e) => {
                        log::error!("Clip export failed: {}", e);
                        self.status = Some(format!("Clip export failed: {}", e));
                    }
                }
            }
        }
    }

    fn advance_playback(&mut self, ctx: &egui::Context) {
        if let Err(e) = self.clock.poll() {
            log::error!("Playback stopped: {}", e);
            self.status = Some(e.to_string());
        }
        self.freeze.poll(self.clock.now_ms());
        if let Some(frame) = self.clock.take_frame() {
            self.sink.update(ctx, &frame);
        }
        self.handle_playback_events();
    }

    fn schedule_repaint(&self, ctx: &egui::Context) {
        if self.loading_message.is_some() || self.clip_job.is_some() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
        if let Some(wait) = self.clock.time_until_next_tick() {
            ctx.request_repaint_after(wait);
        }
        if let Some(remaining) = self.freeze.remaining_ms(self.clock.now_ms()) {
            ctx.request_repaint_after(Duration::from_secs_f64(remaining / 1000.0));
        }
    }

    // ----- panels -----

    fn menu_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open Video...").clicked() {
                        let mut extensions = VIDEO_EXTENSIONS.to_vec();
                        extensions.extend_from_slice(IMAGE_EXTENSIONS);
                        if let Some(path) = rfd::FileDialog::new().add_filter("Media", &extensions).pick_file() {
                            self.open_media(path);
                        }
                        ui.close_menu();
                    }
                    if ui.button("Open Project...").clicked() {
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter("Project", PROJECT_EXTENSIONS)
                            .pick_file()
                        {
                            self.open_project(path);
                        }
                        ui.close_menu();
                    }
                    ui.separator();
                    let loaded = self.clock.is_loaded();
                    if ui.add_enabled(loaded, egui::Button::new("Save Project")).clicked() {
                        self.save_project();
                        ui.close_menu();
                    }
                    if ui.add_enabled(loaded, egui::Button::new("Save Project As...")).clicked() {
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter("JSON", &["json"])
                            .add_filter("YAML", &["yaml", "yml"])
                            .set_file_name("match.json")
                            .save_file()
                        {
                            self.save_project_to(path);
                        }
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("Settings...").clicked() {
                        self.show_settings = true;
                        ui.close_menu();
                    }
                    if ui.button("Quit").clicked() {
                        self.settings.save();
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });

                ui.menu_button("Edit", |ui| {
                    let selected = self.scene.selected().is_some();
                    if ui.add_enabled(selected, egui::Button::new("Copy (Ctrl+C)")).clicked() {
                        self.scene.copy_selected();
                        ui.close_menu();
                    }
                    if ui
                        .add_enabled(self.scene.has_clipboard(), egui::Button::new("Paste (Ctrl+V)"))
                        .clicked()
                    {
                        self.scene.paste();
                        ui.close_menu();
                    }
                    if ui.add_enabled(selected, egui::Button::new("Duplicate (Ctrl+D)")).clicked() {
                        self.scene.duplicate_selected();
                        ui.close_menu();
                    }
                    if ui.add_enabled(selected, egui::Button::new("Delete (Del)")).clicked() {
                        self.scene.delete_selected();
                        ui.close_menu();
                    }
                });

                ui.menu_button("View", |ui| {
                    if ui.button("Reset Zoom").clicked() {
                        self.clock.reset_zoom();
                        ui.close_menu();
                    }
                });

                if let Some(status) = &self.status {
                    ui.separator();
                    ui.label(egui::RichText::new(status).weak());
                }
            });
        });
    }

    fn settings_window(&mut self, ctx: &egui::Context) {
        if !self.show_settings {
            return;
        }
        let mut open = true;
        egui::Window::new("Settings").open(&mut open).resizable(false).show(ctx, |ui| {
            let s = &mut self.settings;
            egui::Grid::new("settings_grid").num_columns(2).show(ui, |ui| {
                ui.label("Freeze indicator (s)");
                ui.add(egui::DragValue::new(&mut s.freeze_duration_secs).clamp_range(0.0..=30.0).speed(0.1));
                ui.end_row();
                ui.label("Clip before event (s)");
                ui.add(egui::DragValue::new(&mut s.clip_pre_seconds).clamp_range(0.0..=120.0).speed(0.5));
                ui.end_row();
                ui.label("Clip after event (s)");
                ui.add(egui::DragValue::new(&mut s.clip_post_seconds).clamp_range(0.0..=120.0).speed(0.5));
                ui.end_row();
                ui.label("Highlights folder");
                ui.text_edit_singleline(&mut s.highlights_folder);
                ui.end_row();
                ui.label("ffmpeg program");
                ui.text_edit_singleline(&mut s.ffmpeg_program);
                ui.end_row();
            });
        });
        if !open {
            self.show_settings = false;
            self.freeze.set_duration(self.settings.freeze_duration_secs);
            self.settings.save();
        }
    }
}

impl eframe::App for AnalyzerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_background();
        self.advance_playback(ctx);

        self.menu_bar(ctx);
        self.settings_window(ctx);

        let toolbar_actions = egui::TopBottomPanel::top("toolbar")
            .show(ctx, |ui| {
                let (fill, opacity) = self.scene.polygon_fill();
                let palette: Vec<egui::Color32> = self
                    .settings
                    .palette
                    .iter()
                    .map(|c| parse_hex_or(c, egui::Color32::WHITE))
                    .collect();
                toolbar::show(
                    ui,
                    &ToolbarState {
                        tool: self.scene.tool(),
                        color: self.scene.color(),
                        width: self.scene.width(),
                        line_style: self.scene.line_style(),
                        polygon_fill: fill,
                        polygon_opacity: opacity,
                        rate: self.clock.rate(),
                        zoom: self.clock.zoom().level(),
                        palette: &palette,
                        rates: &self.settings.playback_rates,
                    },
                )
            })
            .inner;

        let timeline_actions = egui::TopBottomPanel::bottom("timeline")
            .show(ctx, |ui| {
                timeline::show(
                    ui,
                    &TimelineState {
                        position_ms: self.clock.position_ms(),
                        duration_ms: self.clock.duration_ms(),
                        playing: self.clock.is_playing(),
                        frame_step: self.clock.rate() <= 0.0,
                        loaded: self.clock.is_loaded(),
                        events: &self.project.events,
                    },
                )
            })
            .inner;

        let properties_actions = egui::SidePanel::right("properties")
            .default_width(280.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    properties::show(
                        ui,
                        &mut PropertiesState {
                            events: &self.project.events,
                            selected_event: self.selected_event.as_deref(),
                            selected_shape: self.scene.selected_item().map(|item| &item.shape),
                            has_clipboard: self.scene.has_clipboard(),
                            position_ms: self.clock.position_ms(),
                            range_start: self.range_start,
                            loaded: self.clock.is_loaded(),
                            clip_busy: self.clip_job.is_some(),
                            label_draft: &mut self.label_draft,
                        },
                    )
                })
                .inner
            })
            .inner;

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(ref message) = self.loading_message {
                ui.centered_and_justified(|ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(20.0);
                        ui.spinner();
                        ui.add_space(10.0);
                        ui.label(egui::RichText::new(message).size(16.0).color(egui::Color32::from_gray(200)));
                    });
                });
            } else {
                let frozen = self.freeze.is_active(self.clock.now_ms());
                let zoom = *self.clock.zoom();
                self.canvas = Some(canvas::show(ui, &self.sink, &zoom, &mut self.scene, frozen));
            }
        });

        for action in toolbar_actions {
            self.apply_toolbar(action);
        }
        for action in timeline_actions {
            self.apply_timeline(action);
        }
        for action in properties_actions {
            self.apply_properties(action);
        }
        self.handle_keyboard(ctx);

        self.handle_scene_events();
        self.handle_playback_events();
        self.schedule_repaint(ctx);

        if ctx.input(|i| i.viewport().close_requested()) {
            self.settings.save();
        }
    }

}
