// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Highlight clips cut and joined by an external `ffmpeg`.
//!
//! The tool is a black box: a cut or join succeeded if and only if the
//! output file exists afterwards, whatever the exit status says.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use thiserror::Error;
use wait_timeout::ChildExt;

/// Shortest custom-range clip, in seconds.
pub const MIN_CLIP_SECONDS: f64 = 0.1;

/// Longest label fragment kept in clip file names.
pub const MAX_LABEL_CHARS: usize = 30;

#[derive(Debug, Error)]
pub enum ClipError {
    #[error("cannot run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} timed out after {secs}s")]
    Timeout { program: String, secs: u64 },
    #[error("no clip was written to {}", .0.display())]
    MissingOutput(PathBuf),
    #[error("source video not found: {}", .0.display())]
    MissingSource(PathBuf),
    #[error("no clips to assemble")]
    NoClips,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub struct ClipCutter {
    program: String,
    output_dir: PathBuf,
    clip_timeout: Duration,
    concat_timeout: Duration,
}

impl ClipCutter {
    pub fn new(program: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            output_dir: output_dir.into(),
            clip_timeout: Duration::from_secs(60),
            concat_timeout: Duration::from_secs(300),
        }
    }

    pub fn with_timeouts(mut self, clip: Duration, concat: Duration) -> Self {
        self.clip_timeout = clip;
        self.concat_timeout = concat;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Cut `duration_sec` seconds starting at `start_sec` into `output`.
    pub fn cut(&self, source: &Path, start_sec: f64, duration_sec: f64, output: &Path) -> Result<PathBuf, ClipError> {
        if !source.exists() {
            return Err(ClipError::MissingSource(source.to_path_buf()));
        }
        let mut cmd = Command::new(&self.program);
        cmd.args(["-y", "-loglevel", "error", "-ss"])
            .arg(format!("{:.3}", start_sec))
            .arg("-i")
            .arg(source)
            .arg("-t")
            .arg(format!("{:.3}", duration_sec))
            .args(["-c", "copy", "-avoid_negative_ts", "1"])
            .arg(output);
        log::info!(
            "Cutting {:.3}s from {:.3}s of {} into {}",
            duration_sec,
            start_sec,
            source.display(),
            output.display()
        );
        self.run(cmd, output, self.clip_timeout)
    }

    /// Clip around an event: `pre` seconds before to `post` seconds after.
    pub fn clip_around(
        &self,
        source: &Path,
        timestamp_ms: u64,
        pre_sec: f64,
        post_sec: f64,
        name: Option<&str>,
    ) -> Result<PathBuf, ClipError> {
        let (start, duration) = event_window(timestamp_ms, pre_sec, post_sec);
        let name = name.map_or_else(|| format!("clip_{}", timestamp_ms), str::to_string);
        let output = self.output_path(&name);
        self.cut(source, start, duration, &output)
    }

    /// Clip between two positions.
    pub fn clip_range(&self, source: &Path, start_ms: u64, end_ms: u64, name: Option<&str>) -> Result<PathBuf, ClipError> {
        let (start, duration) = range_window(start_ms, end_ms);
        let name = name.map_or_else(|| format!("clip_{}_{}", start_ms, end_ms), str::to_string);
        let output = self.output_path(&name);
        self.cut(source, start, duration, &output)
    }

    /// One clip per `(timestamp, label)`. Failures are logged and skipped.
    pub fn clips_for_events(&self, source: &Path, events: &[(u64, String)], pre_sec: f64, post_sec: f64) -> Vec<PathBuf> {
        events
            .iter()
            .enumerate()
            .filter_map(|(i, (ts, label))| {
                let name = event_clip_name(i + 1, label, *ts);
                match self.clip_around(source, *ts, pre_sec, post_sec, Some(&name)) {
                    Ok(path) => Some(path),
                    Err(e) => {
                        log::warn!("Clip {} failed: {}", name, e);
                        None
                    }
                }
            })
            .collect()
    }

    /// Join clips in order with the concat demuxer.
    pub fn concat(&self, clips: &[PathBuf], name: &str) -> Result<PathBuf, ClipError> {
        if clips.is_empty() {
            return Err(ClipError::NoClips);
        }
        fs::create_dir_all(&self.output_dir)?;
        let list_path = self.output_dir.join(format!(".{}_list.txt", name));
        fs::write(&list_path, concat_list(clips))?;

        let output = self.output_path(name);
        let mut cmd = Command::new(&self.program);
        cmd.args(["-y", "-loglevel", "error", "-f", "concat", "-safe", "0", "-i"])
            .arg(&list_path)
            .args(["-c", "copy"])
            .arg(&output);
        log::info!("Assembling {} clips into {}", clips.len(), output.display());
        let result = self.run(cmd, &output, self.concat_timeout);

        if let Err(e) = fs::remove_file(&list_path) {
            log::debug!("Could not remove {}: {}", list_path.display(), e);
        }
        result
    }

    fn output_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(format!("{}.mp4", name))
    }

    fn run(&self, mut cmd: Command, output: &Path, timeout: Duration) -> Result<PathBuf, ClipError> {
        if let Some(dir) = output.parent() {
            fs::create_dir_all(dir)?;
        }
        // A stale file would look like success.
        if output.exists() {
            fs::remove_file(output)?;
        }

        let mut child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ClipError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let status = child.wait_timeout(timeout)?;
        let Some(status) = status else {
            let _ = child.kill();
            let _ = child.wait();
            log::error!("{} timed out after {:?}", self.program, timeout);
            return Err(ClipError::Timeout {
                program: self.program.clone(),
                secs: timeout.as_secs(),
            });
        };

        let mut stderr = String::new();
        if let Some(mut pipe) = child.stderr.take() {
            let _ = pipe.read_to_string(&mut stderr);
        }
        if output.exists() {
            Ok(output.to_path_buf())
        } else {
            log::error!("{} exited with {} and wrote nothing: {}", self.program, status, stderr.trim());
            Err(ClipError::MissingOutput(output.to_path_buf()))
        }
    }
}

/// Start and duration in seconds of a clip around an event.
pub fn event_window(timestamp_ms: u64, pre_sec: f64, post_sec: f64) -> (f64, f64) {
    let start = (timestamp_ms as f64 / 1000.0 - pre_sec).max(0.0);
    (start, pre_sec + post_sec)
}

/// Start and duration in seconds of a custom range.
pub fn range_window(start_ms: u64, end_ms: u64) -> (f64, f64) {
    let start = start_ms as f64 / 1000.0;
    let duration = (end_ms as f64 - start_ms as f64) / 1000.0;
    (start, duration.max(MIN_CLIP_SECONDS))
}

/// Keep `[A-Za-z0-9_-]`, replace everything else with `_`, cap the length.
pub fn sanitize_label(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .take(MAX_LABEL_CHARS)
        .collect()
}

/// `clip_<NNN>_<label>_<ms>`.
pub fn event_clip_name(index: usize, label: &str, timestamp_ms: u64) -> String {
    format!("clip_{:03}_{}_{}", index, sanitize_label(label), timestamp_ms)
}

fn concat_list(clips: &[PathBuf]) -> String {
    clips
        .iter()
        .map(|p| {
            let absolute = fs::canonicalize(p).unwrap_or_else(|_| p.clone());
            let escaped = absolute.display().to_string().replace('\\', "/").replace('\'', "'\\''");
            format!("file '{}'\n", escaped)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_window_clamps_at_start() {
        assert_eq!(event_window(15000, 5.0, 5.0), (10.0, 10.0));
        assert_eq!(event_window(2000, 5.0, 3.0), (0.0, 8.0));
    }

    #[test]
    fn test_range_window_minimum() {
        assert_eq!(range_window(1000, 4500), (1.0, 3.5));
        assert_eq!(range_window(1000, 1000).1, MIN_CLIP_SECONDS);
        assert_eq!(range_window(5000, 1000).1, MIN_CLIP_SECONDS);
    }

    #[test]
    fn test_clip_names() {
        assert_eq!(sanitize_label("Goal! (Rossi) 1-0"), "Goal___Rossi__1-0");
        assert_eq!(sanitize_label(&"x".repeat(50)).len(), MAX_LABEL_CHARS);
        assert_eq!(event_clip_name(7, "Corner kick", 61250), "clip_007_Corner_kick_61250");
    }

    #[test]
    fn test_concat_list_quotes_paths() {
        let list = concat_list(&[PathBuf::from("/nonexistent/a.mp4"), PathBuf::from("/nonexistent/it's.mp4")]);
        assert_eq!(list, "file '/nonexistent/a.mp4'\nfile '/nonexistent/it'\\''s.mp4'\n");
    }

    #[test]
    fn test_missing_source_and_program() {
        let dir = tempfile::tempdir().unwrap();
        let cutter = ClipCutter::new("definitely-not-ffmpeg-here", dir.path());
        let missing = cutter.clip_around(&dir.path().join("nope.mp4"), 0, 1.0, 1.0, None);
        assert!(matches!(missing, Err(ClipError::MissingSource(_))));

        let source = dir.path().join("match.mp4");
        fs::write(&source, b"video").unwrap();
        let spawn = cutter.clip_around(&source, 0, 1.0, 1.0, None);
        assert!(matches!(spawn, Err(ClipError::Spawn { .. })));
        assert!(matches!(cutter.concat(&[], "all"), Err(ClipError::NoClips)));
    }

    #[cfg(unix)]
    mod stub_tool {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn stub(dir: &Path, body: &str) -> String {
            let path = dir.join("fake-ffmpeg");
            fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path.display().to_string()
        }

        /// Writes its last argument as a file, then fails anyway.
        const WRITES_OUTPUT: &str = "for last; do :; done\necho clip > \"$last\"\nexit 1";

        #[test]
        fn test_output_file_decides_success() {
            let dir = tempfile::tempdir().unwrap();
            let source = dir.path().join("match.mp4");
            fs::write(&source, b"video").unwrap();
            let out_dir = dir.path().join("Highlights");

            let cutter = ClipCutter::new(stub(dir.path(), WRITES_OUTPUT), &out_dir);
            let clip = cutter.clip_around(&source, 15000, 5.0, 5.0, None).unwrap();
            assert_eq!(clip, out_dir.join("clip_15000.mp4"));

            let silent = ClipCutter::new(stub(dir.path(), "exit 0"), &out_dir);
            let result = silent.clip_range(&source, 0, 1000, Some("range"));
            assert!(matches!(result, Err(ClipError::MissingOutput(_))));
        }

        #[test]
        fn test_stale_output_is_not_success() {
            let dir = tempfile::tempdir().unwrap();
            let source = dir.path().join("match.mp4");
            fs::write(&source, b"video").unwrap();
            fs::write(dir.path().join("clip_1000.mp4"), b"old").unwrap();

            let cutter = ClipCutter::new(stub(dir.path(), "exit 0"), dir.path());
            assert!(cutter.clip_around(&source, 1000, 1.0, 1.0, None).is_err());
        }

        #[test]
        fn test_batch_and_concat() {
            let dir = tempfile::tempdir().unwrap();
            let source = dir.path().join("match.mp4");
            fs::write(&source, b"video").unwrap();
            let cutter = ClipCutter::new(stub(dir.path(), WRITES_OUTPUT), dir.path().join("out"));

            let events = vec![(5000, "Goal".to_string()), (9000, "Shot on target".to_string())];
            let clips = cutter.clips_for_events(&source, &events, 2.0, 2.0);
            assert_eq!(clips.len(), 2);
            assert!(clips[1].ends_with("clip_002_Shot_on_target_9000.mp4"));

            let joined = cutter.concat(&clips, "highlights_assembled").unwrap();
            assert!(joined.exists());
            assert!(!dir.path().join("out/.highlights_assembled_list.txt").exists());
        }

        #[test]
        fn test_timeout_kills_tool() {
            let dir = tempfile::tempdir().unwrap();
            let source = dir.path().join("match.mp4");
            fs::write(&source, b"video").unwrap();
            let cutter = ClipCutter::new(stub(dir.path(), "sleep 5"), dir.path())
                .with_timeouts(Duration::from_millis(200), Duration::from_millis(200));
            let result = cutter.clip_around(&source, 0, 1.0, 1.0, None);
            assert!(matches!(result, Err(ClipError::Timeout { .. })));
        }
    }
}
