// Loaded once on startup from <project_dir>/.huegrid/config.json.
// A missing file means defaults (and one gets written so there's something
// to edit); a broken file is logged and ignored.
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::params::ParameterSnapshot;
use crate::vision::DetectionSettings;

const HUEGRID_DIR: &str = ".huegrid";
const CONFIG_FILE: &str = "config.json";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// WAV directory; the project dir when unset
    pub samples_dir: Option<PathBuf>,
    /// image directory played back as the camera; no camera when unset
    pub camera_dir: Option<PathBuf>,
    pub camera_fps: f32,
    pub camera_grace_ms: u64,
    pub analysis_width: usize,
    pub min_coverage: f32,
    /// initial slider positions
    pub params: ParameterSnapshot,
}

impl Default for AppConfig {
    fn default() -> Self {
        let detection = DetectionSettings::default();
        Self {
            samples_dir: None,
            camera_dir: None,
            camera_fps: 15.0,
            camera_grace_ms: detection.grace.as_millis() as u64,
            analysis_width: detection.analysis_width,
            min_coverage: detection.min_coverage,
            params: ParameterSnapshot::default(),
        }
    }
}

impl AppConfig {
    pub fn detection_settings(&self) -> DetectionSettings {
        let d = DetectionSettings::default();
        DetectionSettings {
            analysis_width: if self.analysis_width == 0 { d.analysis_width } else { self.analysis_width },
            min_coverage: if self.min_coverage.is_finite() { self.min_coverage.clamp(0.0, 1.0) } else { d.min_coverage },
            grace: Duration::from_millis(self.camera_grace_ms),
        }
    }
}

// <project_dir>/.huegrid/config.json
pub fn config_file_path(project_dir: &Path) -> PathBuf {
    project_dir.join(HUEGRID_DIR).join(CONFIG_FILE)
}

pub fn load_config(project_dir: &Path) -> AppConfig {
    let path = config_file_path(project_dir);
    let data = match std::fs::read_to_string(&path) {
        Ok(d) => d,
        Err(_) => {
            log::info!("no config at {}, using defaults", path.display());
            return AppConfig::default();
        }
    };
    match serde_json::from_str::<AppConfig>(&data) {
        Ok(mut cfg) => {
            cfg.params = cfg.params.sanitized();
            cfg
        }
        Err(e) => {
            log::warn!("ignoring invalid config {}: {e}", path.display());
            AppConfig::default()
        }
    }
}

// Write the config, making .huegrid/ if needed
pub fn save_config(project_dir: &Path, cfg: &AppConfig) -> anyhow::Result<()> {
    let path = config_file_path(project_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(cfg)?;
    std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
