// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Media file loading (images and videos).
//!
//! A [`FrameSource`] is the black-box decoder behind the playback clock:
//! it reports basic stream information, hands out RGBA frames one at a
//! time and can be repositioned. Still images are decoded with the `image`
//! crate. Videos are decoded by piping raw frames out of an `ffmpeg`
//! process, or through OpenCV when the `video-opencv` feature is enabled.

use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::playback::PlaybackError;

/// Extensions opened as a single still frame.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif"];

/// Extensions offered in the open dialog for videos.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "m4v", "wmv", "webm", "mts"];

/// Assumed frame rate when a source reports none.
pub const FALLBACK_FPS: f64 = 25.0;

/// One decoded RGBA frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: usize,
    pub height: usize,
    pub rgba: Vec<u8>,
    /// Presentation time of the frame in the stream.
    pub timestamp_ms: f64,
}

impl Frame {
    pub fn size(&self) -> [usize; 2] {
        [self.width, self.height]
    }

    pub fn to_color_image(&self) -> egui::ColorImage {
        egui::ColorImage::from_rgba_unmultiplied(self.size(), &self.rgba)
    }
}

/// What a source knows about its stream. Any field may be missing.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MediaInfo {
    /// Frames per second, `0` when not reported.
    pub fps: f64,
    pub frame_count: Option<u64>,
    pub duration_ms: Option<f64>,
    pub width: u32,
    pub height: u32,
}

/// A decoder owned exclusively by the playback clock.
pub trait FrameSource {
    fn info(&self) -> MediaInfo;

    /// Decode the next frame. `Ok(None)` is the end of the stream.
    fn read_frame(&mut self) -> Result<Option<Frame>, PlaybackError>;

    /// Reposition so the next frame read is the one at `ms`.
    fn seek(&mut self, ms: f64) -> Result<(), PlaybackError>;
}

/// Open `path` with the decoder suited to its extension.
pub fn open_source(path: &Path, ffmpeg: &str) -> Result<Box<dyn FrameSource + Send>, PlaybackError> {
    if !path.exists() {
        return Err(PlaybackError::Open {
            path: path.display().to_string(),
            reason: "file not found".into(),
        });
    }
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        return Ok(Box::new(StillImageSource::open(path)?));
    }

    #[cfg(feature = "video-opencv")]
    {
        let _ = ffmpeg;
        Ok(Box::new(opencv_source::OpenCvSource::open(path)?))
    }
    #[cfg(not(feature = "video-opencv"))]
    {
        Ok(Box::new(FfmpegSource::open(path, ffmpeg)?))
    }
}

/// Decoded still image.
pub struct LoadedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Load an image file as RGBA8.
pub fn load_image(path: &Path) -> Result<LoadedImage> {
    let img = image::open(path)
        .with_context(|| format!("Failed to open image {}", path.display()))?
        .to_rgba8();
    let (width, height) = img.dimensions();
    Ok(LoadedImage {
        width,
        height,
        pixels: img.into_raw(),
    })
}

/// A still image played as a one-frame stream.
pub struct StillImageSource {
    frame: Frame,
    delivered: bool,
}

impl StillImageSource {
    pub fn open(path: &Path) -> Result<Self, PlaybackError> {
        let loaded = load_image(path).map_err(|e| PlaybackError::Open {
            path: path.display().to_string(),
            reason: format!("{:#}", e),
        })?;
        Ok(Self::from_image(loaded))
    }

    pub fn from_image(image: LoadedImage) -> Self {
        Self {
            frame: Frame {
                width: image.width as usize,
                height: image.height as usize,
                rgba: image.pixels,
                timestamp_ms: 0.0,
            },
            delivered: false,
        }
    }
}

impl FrameSource for StillImageSource {
    fn info(&self) -> MediaInfo {
        MediaInfo {
            fps: FALLBACK_FPS,
            frame_count: Some(1),
            duration_ms: None,
            width: self.frame.width as u32,
            height: self.frame.height as u32,
        }
    }

    fn read_frame(&mut self) -> Result<Option<Frame>, PlaybackError> {
        if self.delivered {
            return Ok(None);
        }
        self.delivered = true;
        Ok(Some(self.frame.clone()))
    }

    fn seek(&mut self, ms: f64) -> Result<(), PlaybackError> {
        self.delivered = ms >= 1000.0 / FALLBACK_FPS;
        Ok(())
    }
}

/// Video decoded by an `ffmpeg` child process writing raw RGBA frames to
/// its stdout. Seeking restarts the process at the new position.
pub struct FfmpegSource {
    program: String,
    path: PathBuf,
    info: MediaInfo,
    child: Option<Child>,
    start_ms: f64,
    frames_read: u64,
}

impl FfmpegSource {
    pub fn open(path: &Path, ffmpeg: &str) -> Result<Self, PlaybackError> {
        let info = probe(path, &probe_program(ffmpeg))?;
        if info.width == 0 || info.height == 0 {
            return Err(PlaybackError::Open {
                path: path.display().to_string(),
                reason: "no video stream".into(),
            });
        }
        Ok(Self {
            program: ffmpeg.to_string(),
            path: path.to_path_buf(),
            info,
            child: None,
            start_ms: 0.0,
            frames_read: 0,
        })
    }

    fn frame_interval(&self) -> f64 {
        let fps = if self.info.fps > 0.0 { self.info.fps } else { FALLBACK_FPS };
        1000.0 / fps
    }

    fn spawn(&self) -> Result<Child, PlaybackError> {
        log::debug!("Starting decoder for {} at {:.0} ms", self.path.display(), self.start_ms);
        Command::new(&self.program)
            .args(["-v", "error", "-ss"])
            .arg(format!("{:.3}", self.start_ms / 1000.0))
            .arg("-i")
            .arg(&self.path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgba", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| PlaybackError::Decode(format!("cannot start {}: {}", self.program, e)))
    }

    fn stop_child(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl FrameSource for FfmpegSource {
    fn info(&self) -> MediaInfo {
        self.info
    }

    fn read_frame(&mut self) -> Result<Option<Frame>, PlaybackError> {
        if self.child.is_none() {
            self.child = Some(self.spawn()?);
        }
        let (width, height) = (self.info.width as usize, self.info.height as usize);
        let mut rgba = vec![0u8; width * height * 4];

        let stdout = self
            .child
            .as_mut()
            .and_then(|c| c.stdout.as_mut())
            .ok_or_else(|| PlaybackError::Decode("decoder has no output".into()))?;
        match stdout.read_exact(&mut rgba) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                self.stop_child();
                return Ok(None);
            }
            Err(e) => return Err(PlaybackError::Decode(e.to_string())),
        }

        let timestamp_ms = self.start_ms + self.frames_read as f64 * self.frame_interval();
        self.frames_read += 1;
        Ok(Some(Frame {
            width,
            height,
            rgba,
            timestamp_ms,
        }))
    }

    fn seek(&mut self, ms: f64) -> Result<(), PlaybackError> {
        self.stop_child();
        self.start_ms = ms.max(0.0);
        self.frames_read = 0;
        Ok(())
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        self.stop_child();
    }
}

/// `ffprobe` next to the configured `ffmpeg`.
pub fn probe_program(ffmpeg: &str) -> String {
    let path = Path::new(ffmpeg);
    match path.file_name().and_then(|n| n.to_str()) {
        Some("ffmpeg") => path.with_file_name("ffprobe").display().to_string(),
        Some("ffmpeg.exe") => path.with_file_name("ffprobe.exe").display().to_string(),
        _ => "ffprobe".to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

fn probe(path: &Path, ffprobe: &str) -> Result<MediaInfo, PlaybackError> {
    let open_error = |reason: String| PlaybackError::Open {
        path: path.display().to_string(),
        reason,
    };
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,avg_frame_rate,r_frame_rate,nb_frames:format=duration",
            "-of",
            "json",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| open_error(format!("cannot run {}: {}", ffprobe, e)))?;
    if !output.status.success() {
        return Err(open_error(String::from_utf8_lossy(&output.stderr).trim().to_string()));
    }
    parse_probe(&String::from_utf8_lossy(&output.stdout))
        .ok_or_else(|| open_error("unreadable stream information".into()))
}

/// Stream information from `ffprobe -of json` output.
pub fn parse_probe(json: &str) -> Option<MediaInfo> {
    let parsed: ProbeOutput = serde_json::from_str(json).ok()?;
    let stream = parsed.streams.first()?;
    let fps = stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_rate)
        .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_rate))
        .unwrap_or(0.0);
    let duration_ms = parsed
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.parse::<f64>().ok())
        .map(|s| s * 1000.0);
    Some(MediaInfo {
        fps,
        frame_count: stream.nb_frames.as_deref().and_then(|n| n.parse().ok()),
        duration_ms,
        width: stream.width,
        height: stream.height,
    })
}

/// Parse an ffprobe rational such as `30000/1001`.
fn parse_rate(rate: &str) -> Option<f64> {
    let (num, den) = rate.split_once('/').unwrap_or((rate, "1"));
    let num: f64 = num.trim().parse().ok()?;
    let den: f64 = den.trim().parse().ok()?;
    if den == 0.0 || num <= 0.0 {
        None
    } else {
        Some(num / den)
    }
}

#[cfg(feature = "video-opencv")]
mod opencv_source {
    use std::path::Path;

    use opencv::{core::Mat, imgproc, prelude::*, videoio};

    use super::{Frame, FrameSource, MediaInfo};
    use crate::playback::PlaybackError;

    pub struct OpenCvSource {
        capture: videoio::VideoCapture,
        info: MediaInfo,
    }

    fn decode_error(e: opencv::Error) -> PlaybackError {
        PlaybackError::Decode(e.to_string())
    }

    impl OpenCvSource {
        pub fn open(path: &Path) -> Result<Self, PlaybackError> {
            let open_error = |reason: String| PlaybackError::Open {
                path: path.display().to_string(),
                reason,
            };
            let name = path.to_string_lossy();
            let capture = videoio::VideoCapture::from_file(&name, videoio::CAP_ANY)
                .map_err(|e| open_error(e.to_string()))?;
            if !capture.is_opened().map_err(|e| open_error(e.to_string()))? {
                return Err(open_error("unsupported file or codec".into()));
            }
            let fps = capture.get(videoio::CAP_PROP_FPS).unwrap_or(0.0);
            let count = capture.get(videoio::CAP_PROP_FRAME_COUNT).unwrap_or(0.0);
            let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH).unwrap_or(0.0);
            let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT).unwrap_or(0.0);
            Ok(Self {
                capture,
                info: MediaInfo {
                    fps,
                    frame_count: (count > 0.0).then_some(count as u64),
                    duration_ms: None,
                    width: width as u32,
                    height: height as u32,
                },
            })
        }
    }

    impl FrameSource for OpenCvSource {
        fn info(&self) -> MediaInfo {
            self.info
        }

        fn read_frame(&mut self) -> Result<Option<Frame>, PlaybackError> {
            let timestamp_ms = self.capture.get(videoio::CAP_PROP_POS_MSEC).map_err(decode_error)?;
            let mut bgr = Mat::default();
            if !self.capture.read(&mut bgr).map_err(decode_error)? || bgr.empty() {
                return Ok(None);
            }
            let mut rgba = Mat::default();
            imgproc::cvt_color(&bgr, &mut rgba, imgproc::COLOR_BGR2RGBA, 0).map_err(decode_error)?;
            Ok(Some(Frame {
                width: rgba.cols() as usize,
                height: rgba.rows() as usize,
                rgba: rgba.data_bytes().map_err(decode_error)?.to_vec(),
                timestamp_ms,
            }))
        }

        fn seek(&mut self, ms: f64) -> Result<(), PlaybackError> {
            self.capture
                .set(videoio::CAP_PROP_POS_MSEC, ms.max(0.0))
                .map_err(decode_error)?;
            Ok(())
        }
    }
}
