use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use facial_keypoints_core::shared::config::PipelineConfig;

const ENV_PREFIX: &str = "FACIAL_KEYPOINTS_";

/// Persistent CLI defaults: everything a pipeline needs plus how the CLI
/// itself runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(flatten)]
    pub pipeline: PipelineConfig,
    pub workers: usize,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            workers: 1,
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("FacialKeypoints").join("settings.json"))
    }

    /// Reads `explicit` if given, which must exist and parse. Otherwise the
    /// per-user settings file is used when present and valid, and built-in
    /// defaults when not.
    pub fn load(explicit: Option<&Path>) -> Result<Self, Box<dyn std::error::Error>> {
        match explicit {
            Some(path) => {
                let json = fs::read_to_string(path)
                    .map_err(|e| format!("cannot read config {}: {e}", path.display()))?;
                let settings = serde_json::from_str(&json)
                    .map_err(|e| format!("invalid config {}: {e}", path.display()))?;
                Ok(settings)
            }
            None => Ok(Self::config_path()
                .and_then(|path| fs::read_to_string(path).ok())
                .and_then(|json| serde_json::from_str(&json).ok())
                .unwrap_or_default()),
        }
    }

    /// Applies `FACIAL_KEYPOINTS_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), String> {
        self.apply_overrides(|name| std::env::var(format!("{ENV_PREFIX}{name}")).ok())
    }

    /// Applies overrides looked up by unprefixed name (`MODEL`, `WORKERS`, …).
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), String> {
        if let Some(v) = lookup("CASCADE") {
            self.pipeline.cascade_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("MODEL") {
            self.pipeline.model_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("SCALE_FACTOR") {
            self.pipeline.scale_factor = parse_var("SCALE_FACTOR", &v)?;
        }
        if let Some(v) = lookup("MIN_NEIGHBORS") {
            self.pipeline.min_neighbors = parse_var("MIN_NEIGHBORS", &v)?;
        }
        if let Some(v) = lookup("MIN_FACE_SIZE") {
            self.pipeline.min_face_size = parse_var("MIN_FACE_SIZE", &v)?;
        }
        if let Some(v) = lookup("IMAGE_SIZE") {
            self.pipeline.image_size = parse_var("IMAGE_SIZE", &v)?;
        }
        if let Some(v) = lookup("NUM_KEYPOINTS") {
            self.pipeline.num_keypoints = parse_var("NUM_KEYPOINTS", &v)?;
        }
        if let Some(v) = lookup("WORKERS") {
            self.workers = parse_var("WORKERS", &v)?;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            self.log_level = v;
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| format!("{ENV_PREFIX}{name}={value:?}: {e}"))
}
