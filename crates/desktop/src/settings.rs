use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use facekey_core::matching::MatchPolicy;
use facekey_core::shared::constants::{
    DEFAULT_CAMERA_DEVICE, DEFAULT_ENROLL_DIR, DEFAULT_THRESHOLD,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    First,
    Closest,
}

impl Policy {
    pub fn to_match_policy(self) -> MatchPolicy {
        match self {
            Policy::First => MatchPolicy::FirstUnderThreshold,
            Policy::Closest => MatchPolicy::Closest,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory of enrolled reference photos.
    pub enroll_dir: PathBuf,
    /// V4L2 camera device path.
    pub camera_device: String,
    /// Maximum Euclidean distance for a positive match.
    pub threshold: f32,
    /// First-under-threshold or closest match.
    pub match_policy: Policy,
    /// Program launched on a granted verification; the platform text
    /// editor when unset.
    pub unlock_program: Option<String>,
    /// Directory with pre-placed ONNX models, bypassing the download cache.
    pub model_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enroll_dir: PathBuf::from(DEFAULT_ENROLL_DIR),
            camera_device: DEFAULT_CAMERA_DEVICE.to_string(),
            threshold: DEFAULT_THRESHOLD,
            match_policy: Policy::First,
            unlock_program: None,
            model_dir: None,
        }
    }
}

impl Settings {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("FaceKey").join("settings.json"))
    }

    fn read_from(path: &Path) -> Option<Self> {
        let json = fs::read_to_string(path).ok()?;
        serde_json::from_str(&json).ok()
    }

    fn write_to(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Ok(json) = serde_json::to_string_pretty(self) {
            let _ = fs::write(path, json);
        }
    }

    fn write_if_absent(&self, path: &Path) {
        if !path.exists() {
            self.write_to(path);
        }
    }

    pub fn load() -> Self {
        Self::config_path()
            .and_then(|path| Self::read_from(&path))
            .unwrap_or_default()
    }

    /// Materialize the settings file on first run only; an existing file
    /// is left untouched so startup has no side effects after that.
    pub fn save_if_absent(&self) {
        if let Some(path) = Self::config_path() {
            self.write_if_absent(&path);
        }
    }
}
