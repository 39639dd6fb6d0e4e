// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Project file serialization and deserialization.
//!
//! Projects are written as YAML or JSON, picked by file extension.

use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::models::project::ProjectData;

/// Project file extensions offered in dialogs.
pub const PROJECT_EXTENSIONS: &[&str] = &["json", "yaml", "yml"];

/// Export project data to YAML format.
pub fn export_yaml(data: &ProjectData, path: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(data)?;
    std::fs::write(path, yaml).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Export project data to JSON format.
pub fn export_json(data: &ProjectData, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Import project data from YAML format.
pub fn import_yaml(path: &Path) -> Result<ProjectData> {
    let yaml = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let data = serde_yaml::from_str(&yaml).with_context(|| format!("Invalid YAML project {}", path.display()))?;
    Ok(data)
}

/// Import project data from JSON format.
pub fn import_json(path: &Path) -> Result<ProjectData> {
    let json = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let data = serde_json::from_str(&json).with_context(|| format!("Invalid JSON project {}", path.display()))?;
    Ok(data)
}

fn extension(path: &Path) -> Option<String> {
    path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase())
}

/// Save in the format named by the extension.
pub fn save_project(data: &ProjectData, path: &Path) -> Result<()> {
    match extension(path).as_deref() {
        Some("yaml") | Some("yml") => export_yaml(data, path)?,
        Some("json") => export_json(data, path)?,
        other => bail!("Unsupported project extension: {:?}", other),
    }
    log::info!("Saved project with {} events to {}", data.events.events.len(), path.display());
    Ok(())
}

/// Load in the format named by the extension.
pub fn load_project(path: &Path) -> Result<ProjectData> {
    let data = match extension(path).as_deref() {
        Some("yaml") | Some("yml") => import_yaml(path)?,
        Some("json") => import_json(path)?,
        other => bail!("Unsupported project extension: {:?}", other),
    };
    log::info!("Loaded project with {} events from {}", data.events.events.len(), path.display());
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::EventStore;
    use serde_json::json;

    fn sample_project() -> ProjectData {
        let mut project = ProjectData::new("match.mp4".into(), 600_000);
        project.events.add_event("goal", 15_000, Some("Header".into()), Vec::new());
        project.events.append_record(
            15_000,
            json!({"type": "arrow", "p1": {"x": 10, "y": 20}, "p2": {"x": 200, "y": 150}, "color": "#FFFF00", "width": 8}),
        );
        // Unknown record types are carried through untouched.
        project.events.append_record(30_000, json!({"type": "hologram", "beam": [1, 2, 3]}));
        project
    }

    #[test]
    fn test_json_project_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("match.json");
        let project = sample_project();
        save_project(&project, &path).unwrap();

        let loaded = load_project(&path).unwrap();
        assert_eq!(loaded, project);
        assert_eq!(loaded.events.records_at(30_000)[0].data["type"], "hologram");
    }

    #[test]
    fn test_yaml_project_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("match.YML");
        let project = sample_project();
        save_project(&project, &path).unwrap();
        assert_eq!(load_project(&path).unwrap(), project);
    }

    #[test]
    fn test_project_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("match.json");
        save_project(&sample_project(), &path).unwrap();
        let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["video_path"], "match.mp4");
        assert_eq!(raw["duration_ms"], 600_000);
        assert_eq!(raw["counter"], 2);
        assert_eq!(raw["events"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("match.txt");
        assert!(save_project(&sample_project(), &path).is_err());
        assert!(load_project(&path).is_err());
    }
}
